//! stackbound: static stack-usage analysis of ELF binaries
//!
//! Parses the `objdump -d` listing of an executable or shared object and
//! computes, for every function, the stack bytes the function itself takes
//! and an upper bound for the deepest call path through it. Recursion,
//! dynamic allocations and calls through pointers cannot be bounded
//! statically; the affected results are marked as lower bounds instead.
//!
//! The analysis itself lives in the `disasm` and `callgraph` crates; this
//! crate supplies the collaborators around it: ELF inspection, objdump
//! invocation, rendering and the CLI.

pub mod elf;
pub mod objdump;
pub mod render;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use callgraph::{CallGraph, Diagnostic, SymbolMap};
use disasm::{Arch, Statistics};

/// Functions emitted by compiler and libc scaffolding. They are analyzed
/// like everything else but hidden from the output unless requested.
pub const OS_FUNCTIONS: &[&str] = &[
    "register_tm_clones",
    "deregister_tm_clones",
    "frame_dummy",
    "call_weak_fn",
    "abort@plt",
    ".plt",
    "_init",
    "_start",
    "_fini",
    "__libc_csu_init",
    "__libc_csu_fini",
    "__init_array_start",
    "__init_array_end",
    "__do_global_dtors_aux",
    "__do_global_dtors_aux_fini_array_entry",
    "__frame_dummy_init_array_entry",
    "__libc_start_main@plt",
    "__gmon_start__@plt",
];

pub fn is_os_function(name: &str) -> bool {
    OS_FUNCTIONS.contains(&name)
}

/// Analysis options supplied by the CLI.
#[derive(Debug, Default)]
pub struct Options {
    /// Architecture override; detected from the ELF header if unset.
    pub arch: Option<Arch>,
    /// Explicit objdump to use; discovered on `PATH` if unset.
    pub objdump: Option<PathBuf>,
}

/// Finished analysis of one binary.
pub struct Report {
    pub arch: Arch,
    pub graph: CallGraph,
    pub diagnostics: Vec<Diagnostic>,
    pub statistics: Statistics,
}

impl Report {
    /// The maximum stack size any analyzed call path may use.
    pub fn limit(&self) -> u64 {
        self.graph.limit()
    }

    /// False when some entry point's bound is only a lower bound, i.e. the
    /// binary's true limit may exceed every number in the report.
    pub fn is_precise(&self) -> bool {
        self.graph
            .roots()
            .into_iter()
            .all(|root| !self.graph[root].total_is_lower_bound)
    }
}

/// Analyze a binary on disk: read the ELF header and symbols, run objdump,
/// and feed the listing through the core pipeline.
pub fn analyze(binary: &Path, options: &Options) -> Result<Report> {
    let data = fs::read(binary)
        .with_context(|| format!("failed to read '{}'", binary.display()))?;
    let file = object::File::parse(&*data)
        .with_context(|| format!("failed to parse '{}'", binary.display()))?;

    let arch = match options.arch {
        Some(arch) => arch,
        None => elf::detect_arch(&file)?,
    };
    log::debug!("using architecture {arch}");

    let symbols = elf::symbol_map(&file);
    let objdump = objdump::find_objdump(options.objdump.as_deref(), binary)?;
    let lines = objdump::disassemble(&objdump, binary)?;

    Ok(analyze_lines(arch, &lines, &symbols))
}

/// The pure core pipeline on an already-materialized listing.
pub fn analyze_lines<S: AsRef<str>>(arch: Arch, lines: &[S], symbols: &SymbolMap) -> Report {
    let extraction = disasm::extract(arch, lines.iter().map(AsRef::as_ref));
    let mut diagnostics = extraction.diagnostics;
    let graph = CallGraph::analyze(extraction.frames, symbols, &mut diagnostics);
    Report {
        arch,
        graph,
        diagnostics,
        statistics: extraction.statistics,
    }
}
