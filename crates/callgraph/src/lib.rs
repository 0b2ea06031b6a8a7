//! Call-graph analysis for stack-usage bounds
//!
//! This crate owns the data model shared across the analyzer:
//!
//! - [`Frame`]: the per-function record the disassembly parser emits
//!   (address, name, own stack bytes, call targets, quality flags)
//! - [`CallGraph`] / [`Node`]: frames wired into a directed graph
//! - [`Diagnostic`]: non-fatal findings surfaced while linking and walking
//!   the graph
//!
//! and the two passes that run over the linked graph:
//!
//! - [`mark_cycles`]: SCC-based detection of recursion (including
//!   self-loops), which makes the affected bounds lower bounds
//! - [`propagate()`]: bottom-up accumulation of `total = own + max(children)`
//!
//! The whole pipeline is available as [`CallGraph::analyze`].

pub mod cycles;
pub mod diagnostics;
pub mod frame;
pub mod graph;
pub mod propagate;

pub use cycles::mark_cycles;
pub use diagnostics::{Diagnostic, Severity};
pub use frame::{Frame, Symbol, SymbolMap};
pub use graph::{CallGraph, Node};
pub use petgraph::graph::NodeIndex;
pub use propagate::propagate;
