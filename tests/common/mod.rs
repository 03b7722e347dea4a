#![allow(dead_code)]

use std::collections::BTreeSet;

use querydag::dag::{GraphStore, NodeId};

pub use querydag_test_utils::builders;
pub use querydag_test_utils::{init_tracing, with_timeout};

/// Names of `ids`, sorted.
pub fn names<I, O>(store: &GraphStore<I, O>, ids: &BTreeSet<NodeId>) -> BTreeSet<String> {
    ids.iter()
        .filter_map(|id| store.node(*id))
        .map(|node| node.name().to_string())
        .collect()
}

/// Build a name set from string literals.
pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}
