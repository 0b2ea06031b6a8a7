//! stackbound CLI
//!
//! Parses the disassembly of an ELF binary and prints the stack usage of
//! every function together with the worst case over its call paths.
//!
//! Exit codes: 0 success, 1 input error, 2 no limit could be computed,
//! 10 the result is only a lower bound, 130 interrupted.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use disasm::Arch;
use stackbound::render::{self, RenderConfig};
use stackbound::Options;

/// Determine the maximum stack size of an ELF binary.
///
/// The analysis parses the objdump listing, notes every stack-decreasing
/// instruction, builds the call graph and accumulates the deepest call path
/// per function. Recursion, function pointers and dynamic stack operations
/// are reported but cannot be bounded; the affected totals are marked `>`.
#[derive(Debug, Parser)]
#[command(name = "stackbound", version, about, verbatim_doc_comment)]
struct Args {
    /// The binary to analyze.
    #[arg(value_name = "BINARY")]
    binary: PathBuf,

    /// The architecture of the target platform (detected from the binary
    /// if omitted).
    #[arg(short, long)]
    arch: Option<String>,

    /// Path to or name of the objdump to use.
    #[arg(short, long)]
    objdump: Option<PathBuf>,

    /// Only print the maximum stack size.
    #[arg(short, long)]
    summary: bool,

    /// Show the function call tree instead of the table.
    #[arg(short, long)]
    tree: bool,

    /// Regard initialization and termination code.
    #[arg(short, long)]
    regard_all: bool,

    /// Show table header lines.
    #[arg(long)]
    show_header: bool,

    /// Show the section column.
    #[arg(long)]
    show_section: bool,

    /// Show the per-instruction statistic.
    #[arg(long)]
    show_operation_statistic: bool,

    /// Suppress color.
    #[arg(short = 'c', long)]
    no_color: bool,

    /// Suppress duplicated warnings.
    #[arg(short = 'w', long)]
    no_duplicated_warnings: bool,

    /// Suppress warnings.
    #[arg(short = 'W', long)]
    no_warnings: bool,

    /// Show debug messages.
    #[arg(short, long)]
    debug: bool,

    /// Only print warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    ctrlc::set_handler(|| {
        eprintln!();
        process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let args = Args::parse();
    init_logger(&args);

    let arch = match args.arch.as_deref().map(str::parse::<Arch>) {
        Some(Ok(arch)) => Some(arch),
        Some(Err(error)) => {
            log::error!("{error}");
            process::exit(1);
        }
        None => None,
    };

    let options = Options {
        arch,
        objdump: args.objdump.clone(),
    };
    let report = match stackbound::analyze(&args.binary, &options) {
        Ok(report) => report,
        Err(error) => {
            log::error!("{error:#}");
            process::exit(1);
        }
    };

    render::report_diagnostics(&report.diagnostics, !args.no_duplicated_warnings);

    let config = RenderConfig {
        color: !args.no_color,
        show_header: args.show_header,
        show_section: args.show_section,
        regard_all: args.regard_all,
    };

    if args.summary {
        println!("{}", report.limit());
    } else if !args.quiet {
        if args.tree {
            render::print_call_tree(&report, &config);
        } else {
            render::print_stack_table(&report, &config);
        }
        println!();
        render::print_statistics(&report.statistics, &config, args.show_operation_statistic);
    }

    if report.limit() == 0 {
        process::exit(2);
    }
    if !report.is_precise() {
        process::exit(10);
    }
}

fn init_logger(args: &Args) {
    let level = if args.debug {
        log::LevelFilter::Debug
    } else if args.no_warnings {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();
}
