//! Integration tests for callgraph
//!
//! Exercises the full pipeline (link → cycle marking → propagation) on
//! graphs shaped like real binaries: deep chains, shared subtrees, recursion
//! nests and mixed-quality bounds.

use callgraph::{CallGraph, Diagnostic, Frame, SymbolMap};

fn frame(address: u64, name: &str, own_stack: u64, call_targets: &[u64]) -> Frame {
    Frame {
        own_stack,
        call_targets: call_targets.to_vec(),
        ..Frame::new(address, name)
    }
}

fn analyze(frames: Vec<Frame>) -> (CallGraph, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let graph = CallGraph::analyze(frames, &SymbolMap::new(), &mut diagnostics);
    (graph, diagnostics)
}

fn total(graph: &CallGraph, name: &str) -> u64 {
    graph[graph.by_name(name).unwrap()].total_stack
}

fn lower_bound(graph: &CallGraph, name: &str) -> bool {
    graph[graph.by_name(name).unwrap()].total_is_lower_bound
}

#[test]
fn test_deep_chain_does_not_overflow_the_machine_stack() {
    // Propagation and cycle detection must survive chains of hundreds of
    // frames without machine recursion.
    let depth = 2_000u64;
    let mut frames = Vec::new();
    for level in 0..depth {
        let targets = if level + 1 < depth {
            vec![0x1000 + level + 1]
        } else {
            vec![]
        };
        frames.push(frame(0x1000 + level, &format!("f{level}"), 8, &targets));
    }

    let (graph, diagnostics) = analyze(frames);
    assert_eq!(total(&graph, "f0"), 8 * depth);
    assert!(!lower_bound(&graph, "f0"));
    assert!(diagnostics.is_empty());
}

#[test]
fn test_shared_subtree_counted_once_per_path() {
    // a → b → d, a → c → d: d's total flows through both arms, the max wins.
    let (graph, _) = analyze(vec![
        frame(0x10, "a", 8, &[0x20, 0x30]),
        frame(0x20, "b", 16, &[0x40]),
        frame(0x30, "c", 48, &[0x40]),
        frame(0x40, "d", 32, &[]),
    ]);
    assert_eq!(total(&graph, "d"), 32);
    assert_eq!(total(&graph, "b"), 48);
    assert_eq!(total(&graph, "c"), 80);
    assert_eq!(total(&graph, "a"), 88);
}

#[test]
fn test_recursion_nest_with_exit() {
    // main → rec_psi → rec_chi → rec_phi → rec_psi (3-cycle), plus
    // rec_phi → helper(100) leaving the cycle.
    let (graph, diagnostics) = analyze(vec![
        frame(0x10, "main", 24, &[0x20]),
        frame(0x20, "rec_psi", 16, &[0x30]),
        frame(0x30, "rec_chi", 16, &[0x40]),
        frame(0x40, "rec_phi", 16, &[0x20, 0x50]),
        frame(0x50, "helper", 100, &[]),
    ]);

    for name in ["rec_psi", "rec_chi", "rec_phi"] {
        assert!(graph[graph.by_name(name).unwrap()].in_cycle, "{name}");
        assert!(lower_bound(&graph, name), "{name}");
    }
    assert!(!graph[graph.by_name("main").unwrap()].in_cycle);
    assert!(lower_bound(&graph, "main"), "caller of a cycle is imprecise");

    // rec_phi sees the exit; the others only the cycle.
    assert_eq!(total(&graph, "rec_phi"), 116);
    assert_eq!(total(&graph, "rec_psi"), 16);
    assert_eq!(total(&graph, "main"), 40);

    let cycles: Vec<_> = diagnostics
        .iter()
        .filter(|diag| matches!(diag, Diagnostic::CycleEntry { .. }))
        .collect();
    assert_eq!(cycles.len(), 1);
}

#[test]
fn test_mixed_quality_bounds() {
    // main calls a clean chain and a dynamic-stack function; only the paths
    // through the dynamic function are lower bounds.
    let mut vla = frame(0x40, "vla", 8, &[]);
    vla.dynamic_stack = true;

    let (graph, diagnostics) = analyze(vec![
        frame(0x10, "main", 8, &[0x20, 0x30]),
        frame(0x20, "clean", 64, &[]),
        frame(0x30, "wrapper", 8, &[0x40]),
        vla,
    ]);

    assert!(!lower_bound(&graph, "clean"));
    assert!(lower_bound(&graph, "vla"));
    assert!(lower_bound(&graph, "wrapper"));
    assert!(lower_bound(&graph, "main"));
    assert_eq!(total(&graph, "main"), 72);

    assert!(diagnostics.is_empty(), "flags alone produce no graph diagnostics");
}

#[test]
fn test_limit_is_the_largest_total() {
    let (graph, _) = analyze(vec![
        frame(0x10, "main", 8, &[0x20]),
        frame(0x20, "mid", 16, &[]),
        frame(0x30, "huge_leaf", 512, &[]),
    ]);
    assert_eq!(graph.limit(), 512);
}

#[test]
fn test_roots_are_uncalled_functions() {
    let (graph, _) = analyze(vec![
        frame(0x10, "main", 8, &[0x20]),
        frame(0x20, "helper", 8, &[]),
        frame(0x30, "_start", 8, &[0x10]),
    ]);
    let roots: Vec<&str> = graph
        .roots()
        .into_iter()
        .map(|node| graph[node].frame.name.as_str())
        .collect();
    assert_eq!(roots, vec!["_start"]);
}
