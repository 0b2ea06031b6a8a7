//! Disassembly parsing for stack-usage analysis
//!
//! Consumes the textual output of `objdump -d` and produces one
//! [`Frame`](callgraph::Frame) per function: the stack bytes the function
//! itself takes, the functions it calls, and quality flags for effects the
//! analysis cannot bound (dynamic allocations, calls through pointers).
//!
//! # Modules
//!
//! - [`arch`]: the four supported instruction sets and recognizer dispatch
//! - [`line`]: zero-copy classification of listing lines
//! - [`recognize`]: the [`StackEffect`] classification contract
//! - [`x86`], [`arm`]: the per-architecture recognizers
//! - [`extract()`]: the listing → frames state machine
//! - [`stats`]: per-instruction statistics of one analysis pass

pub mod arch;
pub mod arm;
pub mod extract;
pub mod line;
pub mod recognize;
pub mod stats;
pub mod x86;

pub use arch::{Arch, UnsupportedArchitecture};
pub use extract::{extract, Extraction};
pub use recognize::{Recognizer, StackEffect, StackImpact};
pub use stats::Statistics;
