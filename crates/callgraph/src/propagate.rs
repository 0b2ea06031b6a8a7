//! Bottom-up stack accumulation
//!
//! Assigns every node its cumulative bound
//! `total = own_stack + max(total of callees)` together with the quality
//! flag that records whether the bound is exact or only a lower bound.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::CallGraph;

/// Fill `total_stack` and `total_is_lower_bound` for every node.
///
/// `sccs` must come from [`mark_cycles`](crate::mark_cycles): Tarjan yields
/// components in reverse topological order, so every callee outside the
/// current component is already final when the component is processed.
/// Edges that stay inside a component (the cycle itself) contribute nothing;
/// a cyclic function's total is its own frame plus the tallest path leaving
/// the cycle through its own out-edges, and is marked as a lower bound.
///
/// The pass is iterative, deterministic and idempotent.
pub fn propagate(graph: &mut CallGraph, sccs: &[Vec<NodeIndex>]) {
    let mut component = HashMap::new();
    for (id, scc) in sccs.iter().enumerate() {
        for &member in scc {
            component.insert(member, id);
        }
    }

    for (id, scc) in sccs.iter().enumerate() {
        for &node in scc {
            let mut deepest = 0;
            let mut lower_bound = false;

            for callee in graph.callees(node).collect::<Vec<_>>() {
                if component[&callee] == id {
                    continue;
                }
                let callee = &graph.graph[callee];
                deepest = deepest.max(callee.total_stack);
                lower_bound |= callee.total_is_lower_bound;
            }

            let node = &mut graph.graph[node];
            node.total_stack = node.frame.own_stack + deepest;
            node.total_is_lower_bound = lower_bound
                || node.in_cycle
                || node.frame.dynamic_stack
                || node.frame.has_indirect_call;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mark_cycles, Diagnostic, Frame, SymbolMap};

    fn frame(address: u64, name: &str, own_stack: u64, call_targets: &[u64]) -> Frame {
        Frame {
            own_stack,
            call_targets: call_targets.to_vec(),
            ..Frame::new(address, name)
        }
    }

    fn analyze(frames: Vec<Frame>) -> CallGraph {
        let mut diagnostics = Vec::new();
        CallGraph::analyze(frames, &SymbolMap::new(), &mut diagnostics)
    }

    fn total(graph: &CallGraph, address: u64) -> u64 {
        graph[graph.by_address(address).unwrap()].total_stack
    }

    fn lower_bound(graph: &CallGraph, address: u64) -> bool {
        graph[graph.by_address(address).unwrap()].total_is_lower_bound
    }

    #[test]
    fn test_leaf_total_is_own() {
        let graph = analyze(vec![frame(0x10, "leaf", 16, &[])]);
        assert_eq!(total(&graph, 0x10), 16);
        assert!(!lower_bound(&graph, 0x10));
    }

    #[test]
    fn test_linear_chain_is_additive() {
        let graph = analyze(vec![
            frame(0x10, "a", 8, &[0x20]),
            frame(0x20, "b", 16, &[0x30]),
            frame(0x30, "c", 32, &[]),
        ]);
        assert_eq!(total(&graph, 0x30), 32);
        assert_eq!(total(&graph, 0x20), 48);
        assert_eq!(total(&graph, 0x10), 56);
        assert!(!lower_bound(&graph, 0x10));
    }

    #[test]
    fn test_max_over_siblings() {
        let graph = analyze(vec![
            frame(0x10, "a", 8, &[0x20, 0x30]),
            frame(0x20, "small", 16, &[]),
            frame(0x30, "large", 64, &[]),
        ]);
        assert_eq!(total(&graph, 0x10), 72);
    }

    #[test]
    fn test_sibling_order_does_not_matter() {
        let forward = analyze(vec![
            frame(0x10, "a", 8, &[0x20, 0x30]),
            frame(0x20, "b", 16, &[]),
            frame(0x30, "c", 64, &[]),
        ]);
        let backward = analyze(vec![
            frame(0x10, "a", 8, &[0x30, 0x20]),
            frame(0x20, "b", 16, &[]),
            frame(0x30, "c", 64, &[]),
        ]);
        assert_eq!(total(&forward, 0x10), total(&backward, 0x10));
    }

    #[test]
    fn test_self_loop_counts_one_pass() {
        let graph = analyze(vec![frame(0x10, "rec", 24, &[0x10])]);
        assert_eq!(total(&graph, 0x10), 24);
        assert!(lower_bound(&graph, 0x10));
    }

    #[test]
    fn test_mutual_recursion_is_lower_bound() {
        let graph = analyze(vec![
            frame(0x10, "a", 8, &[0x20]),
            frame(0x20, "b", 16, &[0x10]),
        ]);
        assert_eq!(total(&graph, 0x10), 8);
        assert_eq!(total(&graph, 0x20), 16);
        assert!(lower_bound(&graph, 0x10));
        assert!(lower_bound(&graph, 0x20));
    }

    #[test]
    fn test_cycle_exit_contributes() {
        // a ↔ b, b → leaf(64): b sees the exit, a only its intra-cycle edge.
        let graph = analyze(vec![
            frame(0x10, "a", 8, &[0x20]),
            frame(0x20, "b", 16, &[0x10, 0x30]),
            frame(0x30, "leaf", 64, &[]),
        ]);
        assert_eq!(total(&graph, 0x20), 80);
        assert_eq!(total(&graph, 0x10), 8);
        assert!(!lower_bound(&graph, 0x30));
    }

    #[test]
    fn test_dynamic_stack_marks_ancestors() {
        let mut dynamic = frame(0x30, "alloca", 16, &[]);
        dynamic.dynamic_stack = true;
        let graph = analyze(vec![
            frame(0x10, "a", 8, &[0x20]),
            frame(0x20, "b", 8, &[0x30]),
            dynamic,
        ]);
        assert!(lower_bound(&graph, 0x30));
        assert!(lower_bound(&graph, 0x20));
        assert!(lower_bound(&graph, 0x10));
    }

    #[test]
    fn test_indirect_call_marks_ancestors() {
        let mut indirect = frame(0x20, "dispatch", 8, &[]);
        indirect.has_indirect_call = true;
        let graph = analyze(vec![frame(0x10, "a", 8, &[0x20]), indirect]);
        assert!(lower_bound(&graph, 0x20));
        assert!(lower_bound(&graph, 0x10));
    }

    #[test]
    fn test_lower_bound_does_not_leak_to_siblings() {
        let mut indirect = frame(0x20, "dispatch", 8, &[]);
        indirect.has_indirect_call = true;
        let graph = analyze(vec![
            frame(0x10, "a", 8, &[0x20]),
            indirect,
            frame(0x30, "clean", 8, &[]),
        ]);
        assert!(!lower_bound(&graph, 0x30));
    }

    #[test]
    fn test_propagation_is_idempotent() {
        let frames = vec![
            frame(0x10, "a", 8, &[0x20, 0x30]),
            frame(0x20, "b", 16, &[0x30]),
            frame(0x30, "c", 32, &[0x20]),
        ];
        let mut diagnostics = Vec::new();
        let mut graph = CallGraph::link(frames, &SymbolMap::new(), &mut diagnostics);
        let sccs = mark_cycles(&mut graph, &mut diagnostics);

        propagate(&mut graph, &sccs);
        let first: Vec<(u64, bool)> = graph
            .nodes()
            .map(|node| (graph[node].total_stack, graph[node].total_is_lower_bound))
            .collect();

        propagate(&mut graph, &sccs);
        let second: Vec<(u64, bool)> = graph
            .nodes()
            .map(|node| (graph[node].total_stack, graph[node].total_is_lower_bound))
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_monotonicity_over_callees() {
        let graph = analyze(vec![
            frame(0x10, "a", 8, &[0x20, 0x30]),
            frame(0x20, "b", 16, &[]),
            frame(0x30, "c", 64, &[]),
        ]);
        let a = graph.by_address(0x10).unwrap();
        let deepest_callee = graph
            .callees(a)
            .map(|callee| graph[callee].total_stack)
            .max()
            .unwrap();
        assert!(graph[a].total_stack > deepest_callee);
    }

    #[test]
    fn test_unresolved_callee_contributes_zero() {
        let mut diagnostics = Vec::new();
        let graph = CallGraph::analyze(
            vec![frame(0x10, "a", 8, &[0xdead])],
            &SymbolMap::new(),
            &mut diagnostics,
        );
        assert_eq!(total(&graph, 0x10), 8);
        assert!(matches!(
            diagnostics[0],
            Diagnostic::UnresolvedCallee { target: 0xdead, .. }
        ));
    }
}
