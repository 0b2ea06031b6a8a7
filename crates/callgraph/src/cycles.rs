//! Cycle detection over the call graph
//!
//! Recursion makes a static stack bound impossible: the best the analysis
//! can do is one pass through the cycle. This pass finds every strongly
//! connected component of size ≥ 2 plus every self-loop, marks the members,
//! and reports each cycle once.

use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;

use crate::{CallGraph, Diagnostic};

/// Mark every node participating in a call cycle and report each cycle once.
///
/// Returns the strongly connected components in the order Tarjan yields
/// them: postorder, i.e. reverse topological, so every component is listed
/// before the components that call into it. The propagation pass relies on
/// that order.
pub fn mark_cycles(
    graph: &mut CallGraph,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Vec<NodeIndex>> {
    let sccs = tarjan_scc(&graph.graph);

    for scc in &sccs {
        let cyclic = scc.len() > 1 || graph.graph.find_edge(scc[0], scc[0]).is_some();
        if !cyclic {
            continue;
        }

        for &member in scc {
            graph.graph[member].in_cycle = true;
        }

        // Report the member with the smallest address so the message is
        // deterministic regardless of traversal order.
        let entry = scc
            .iter()
            .copied()
            .min_by_key(|&member| graph.graph[member].frame.address)
            .expect("SCC is never empty");
        diagnostics.push(Diagnostic::CycleEntry {
            function: graph.graph[entry].frame.name.clone(),
        });
    }

    sccs
}
