// tests/export.rs

mod common;
use crate::common::builders::root_fanout;
use crate::common::with_timeout;

use querydag::engine::Driver;
use querydag_test_utils::fake_executor::ScriptedExecutor;

#[test]
fn dot_export_lists_every_node_and_edge() {
    let (g, f) = root_fanout();
    let dot = g.snapshot().to_dot();

    assert!(dot.starts_with("digraph QueryGraph {"));
    assert!(dot.trim_end().ends_with('}'));
    for name in ["root", "a", "b", "end"] {
        assert!(dot.contains(&format!("label=\"{name}\\n(pending)\"")), "{dot}");
    }
    assert!(dot.contains(&format!("\"{}\" -> \"{}\";", f.root, f.a)));
    assert!(dot.contains(&format!("\"{}\" -> \"{}\";", f.b, f.end)));
    assert_eq!(dot.matches("->").count(), 4);
    // Root kind fill, pending border.
    assert!(dot.contains("fillcolor=\"#FF6B6B\", color=\"#FFA500\""));
}

#[tokio::test]
async fn dot_export_reflects_final_statuses() {
    let (g, _) = root_fanout();
    let report = with_timeout(Driver::new(g, ScriptedExecutor::new().failing(&["a"])).run())
        .await
        .unwrap();

    let dot = report.graph.snapshot().to_dot();
    assert!(dot.contains("label=\"a\\n(failed)\""));
    assert!(dot.contains("label=\"b\\n(completed)\""));
    assert!(dot.contains("#DC143C"));
    assert!(dot.contains("#32CD32"));
}

#[test]
fn quotes_in_names_are_escaped() {
    let mut g = querydag_test_utils::builders::TestGraph::new();
    g.add_node("say \"hi\"", querydag::types::NodeKind::Task, String::new());
    let dot = g.snapshot().to_dot();
    assert!(dot.contains("say \\\"hi\\\""), "{dot}");
}

#[tokio::test]
async fn json_export_carries_structure_and_payloads() {
    let (g, f) = root_fanout();
    let report = with_timeout(Driver::new(g, ScriptedExecutor::new()).run())
        .await
        .unwrap();

    let bare: serde_json::Value =
        serde_json::from_str(&report.graph.snapshot().to_json().unwrap()).unwrap();
    assert_eq!(bare["nodes"].as_array().unwrap().len(), 4);
    assert_eq!(bare["edges"].as_array().unwrap().len(), 4);
    assert!(bare["nodes"][0].get("output").is_none());

    let full: serde_json::Value =
        serde_json::from_str(&report.graph.snapshot_with_payloads().to_json().unwrap()).unwrap();
    let a = full["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == f.a.as_u64())
        .unwrap();
    assert_eq!(a["kind"], "task");
    assert_eq!(a["status"], "completed");
    assert_eq!(a["input"], "a");
    assert_eq!(a["output"], "a(root())");
}
