//! Call-graph construction from per-function frames

use std::collections::{HashMap, HashSet};
use std::ops::Index;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::{cycles, propagate, Diagnostic, Frame, SymbolMap};

/// A function in the call graph, owning its [`Frame`].
#[derive(Debug)]
pub struct Node {
    pub frame: Frame,
    /// The node participates in a call cycle (SCC of size ≥ 2 or self-loop).
    pub in_cycle: bool,
    /// Worst-case stack while execution is inside this function, inclusive
    /// of the deepest callee. Filled by the propagation pass.
    pub total_stack: u64,
    /// `total_stack` is known to underestimate: a cyclic, dynamic-stack or
    /// indirect-call effect sits on or below this node.
    pub total_is_lower_bound: bool,
}

impl Node {
    fn new(frame: Frame) -> Self {
        Self {
            frame,
            in_cycle: false,
            total_stack: 0,
            total_is_lower_bound: false,
        }
    }
}

/// The linked call graph: one node per analyzed function, edges from caller
/// to callee. Backed by a petgraph arena so back-references need no shared
/// ownership; callers are simply the incoming neighbors.
pub struct CallGraph {
    pub(crate) graph: DiGraph<Node, ()>,
    by_address: HashMap<u64, NodeIndex>,
}

impl CallGraph {
    /// Wire frames into a graph.
    ///
    /// Every frame becomes a node keyed by its address (the first frame wins
    /// on duplicates). Each call target resolving to a node adds one
    /// caller → callee edge; duplicates within one caller collapse. Targets
    /// without an analyzed body are dropped with an
    /// [`UnresolvedCallee`](Diagnostic::UnresolvedCallee) diagnostic and
    /// contribute zero. Linking itself cannot fail.
    pub fn link(
        frames: Vec<Frame>,
        symbols: &SymbolMap,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut graph = DiGraph::new();
        let mut by_address = HashMap::new();

        for mut frame in frames {
            if frame.section.is_none() {
                frame.section = symbols
                    .get(frame.address)
                    .and_then(|symbol| symbol.section.clone());
            }
            let address = frame.address;
            let node = graph.add_node(Node::new(frame));
            by_address.entry(address).or_insert(node);
        }

        for caller in graph.node_indices().collect::<Vec<_>>() {
            let targets = graph[caller].frame.call_targets.clone();
            let mut seen = HashSet::new();
            for target in targets {
                if !seen.insert(target) {
                    continue;
                }
                match by_address.get(&target) {
                    Some(&callee) => {
                        graph.update_edge(caller, callee, ());
                    }
                    None => {
                        if let Some(symbol) = symbols.get(target) {
                            log::debug!(
                                "dropping call from '{}' to '{}' ({target:#x}): no body in listing",
                                graph[caller].frame.name,
                                symbol.name,
                            );
                        }
                        diagnostics.push(Diagnostic::UnresolvedCallee {
                            caller: graph[caller].frame.name.clone(),
                            target,
                        });
                    }
                }
            }
        }

        Self { graph, by_address }
    }

    /// Run the full pipeline: link, mark cycles, propagate totals.
    pub fn analyze(
        frames: Vec<Frame>,
        symbols: &SymbolMap,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Self {
        let mut graph = Self::link(frames, symbols, diagnostics);
        let sccs = cycles::mark_cycles(&mut graph, diagnostics);
        propagate::propagate(&mut graph, &sccs);
        graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Iterate over all node indices.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Look up a node by function entry address.
    pub fn by_address(&self, address: u64) -> Option<NodeIndex> {
        self.by_address.get(&address).copied()
    }

    /// Look up a node by symbol name (first match).
    pub fn by_name(&self, name: &str) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&node| self.graph[node].frame.name == name)
    }

    /// Iterate over the functions this node calls.
    pub fn callees(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(node, Direction::Outgoing)
    }

    /// Iterate over the functions calling this node.
    pub fn callers(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(node, Direction::Incoming)
    }

    /// Nodes without callers: the entry points of the binary.
    ///
    /// A self-recursive entry point still has an incoming edge, so nodes
    /// whose only caller is themselves count as roots too.
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&node| self.callers(node).all(|caller| caller == node))
            .collect()
    }

    /// The largest total over all functions: the stack limit of the binary.
    pub fn limit(&self) -> u64 {
        self.graph
            .node_indices()
            .map(|node| self.graph[node].total_stack)
            .max()
            .unwrap_or(0)
    }

    /// Node indices sorted for display: total descending, then address
    /// ascending as a stable tiebreak.
    pub fn sorted_by_total(&self) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        nodes.sort_by_key(|&node| {
            let node = &self.graph[node];
            (std::cmp::Reverse(node.total_stack), node.frame.address)
        });
        nodes
    }
}

impl Index<NodeIndex> for CallGraph {
    type Output = Node;

    fn index(&self, index: NodeIndex) -> &Node {
        &self.graph[index]
    }
}
