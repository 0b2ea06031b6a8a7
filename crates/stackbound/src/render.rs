//! Rendering of analysis results
//!
//! Everything here is presentation only: tables, the call tree and warning
//! output. All settings travel through an explicit [`RenderConfig`]; there
//! is no process-wide state.

use std::collections::HashSet;
use std::mem;

use comfy_table::{presets, CellAlignment, ContentArrangement, Table};

use callgraph::{Diagnostic, Node, Severity};
use disasm::{StackImpact, Statistics};

use crate::{is_os_function, Report};

/// ANSI codes, matching the classic 16-color palette.
mod color {
    pub const BOLD: &str = "\x1b[1m";
    pub const CYAN: &str = "\x1b[96m";
    pub const DARK: &str = "\x1b[90m";
    pub const GREEN: &str = "\x1b[92m";
    pub const RED: &str = "\x1b[91m";
    pub const YELLOW: &str = "\x1b[93m";
    pub const END: &str = "\x1b[0m";
}

/// Output settings, threaded through every renderer.
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    pub color: bool,
    pub show_header: bool,
    pub show_section: bool,
    /// Also show initialization/termination functions.
    pub regard_all: bool,
}

impl RenderConfig {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{}", color::END)
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(color::BOLD, text)
    }

    fn func(&self, text: &str) -> String {
        self.paint(color::CYAN, text)
    }

    fn dark(&self, text: &str) -> String {
        self.paint(color::DARK, text)
    }

    fn alert(&self, text: &str) -> String {
        self.paint(color::RED, text)
    }

    /// Functions shown in the output. Scaffolding outside `.text` and the
    /// known initialization/termination helpers are hidden by default; they
    /// still participate in the analysis either way.
    fn visible(&self, node: &Node) -> bool {
        if self.regard_all {
            return true;
        }
        node.frame.section.as_deref() == Some(".text") && !is_os_function(&node.frame.name)
    }
}

/// Forward diagnostics to the logger. With `multiple` unset, each kind is
/// reported only once.
pub fn report_diagnostics(diagnostics: &[Diagnostic], multiple: bool) {
    let mut seen = HashSet::new();
    for diagnostic in diagnostics {
        if !multiple && !seen.insert(mem::discriminant(diagnostic)) {
            continue;
        }
        match diagnostic.severity() {
            Severity::Warning => log::warn!("{diagnostic}"),
            Severity::Info => log::debug!("{diagnostic}"),
        }
    }
}

/// The per-function stack table, largest total first.
pub fn stack_table(report: &Report, config: &RenderConfig) -> Table {
    let mut headers = vec![
        ("address", CellAlignment::Right),
        ("function", CellAlignment::Left),
    ];
    if config.show_section {
        headers.push(("section", CellAlignment::Left));
    }
    headers.push(("file", CellAlignment::Left));
    headers.push(("fsize", CellAlignment::Right));
    headers.push(("tsize", CellAlignment::Right));

    let mut table = new_table(&headers, config.show_header);

    for index in report.graph.sorted_by_total() {
        let node = &report.graph[index];
        if !config.visible(node) {
            continue;
        }
        let frame = &node.frame;

        let mut row = vec![
            config.bold(&format!("{:#x}", frame.address)),
            config.func(&frame.name),
        ];
        if config.show_section {
            row.push(config.dark(frame.section.as_deref().unwrap_or("")));
        }
        row.push(config.dark(frame.object_file.as_deref().unwrap_or("")));
        row.push(frame.own_stack.to_string());
        row.push(format_total(node, config));

        table.add_row(row);
    }

    align(&mut table, &headers);
    table
}

pub fn print_stack_table(report: &Report, config: &RenderConfig) {
    println!();
    println!("{}", stack_table(report, config));
}

/// The call tree, one branch per entry point. Repeated subtrees are cut at
/// the point of re-entry.
pub fn call_tree_lines(report: &Report, config: &RenderConfig) -> Vec<String> {
    let graph = &report.graph;

    let mut roots = graph.roots();
    roots.retain(|&root| config.visible(&graph[root]));
    roots.sort_by_key(|&root| graph[root].frame.address);

    let mut lines = Vec::new();
    // Explicit work stack; `path` mirrors the ancestors of the current node
    // so re-entered functions can be cut off.
    let mut stack: Vec<(_, usize)> = roots.into_iter().rev().map(|root| (root, 0)).collect();
    let mut path = Vec::new();

    while let Some((index, depth)) = stack.pop() {
        path.truncate(depth);
        let repeated = path.contains(&index);
        lines.push(tree_line(&report.graph[index], depth, repeated, config));

        if repeated {
            continue;
        }
        path.push(index);

        let mut callees: Vec<_> = graph.callees(index).collect();
        callees.sort_by_key(|&callee| graph[callee].frame.address);
        for callee in callees.into_iter().rev() {
            stack.push((callee, depth + 1));
        }
    }

    lines
}

pub fn print_call_tree(report: &Report, config: &RenderConfig) {
    for line in call_tree_lines(report, config) {
        println!("{line}");
    }
}

fn tree_line(node: &Node, depth: usize, repeated: bool, config: &RenderConfig) -> String {
    let frame = &node.frame;

    let mut arrow = if depth > 0 { "-> " } else { "" }.to_string();
    let mut suffix = String::new();
    if node.in_cycle && repeated {
        suffix.push_str(" CIRCLE");
    }
    if frame.dynamic_stack {
        suffix.push_str(" DYNAMIC");
    }
    if config.color && !suffix.is_empty() {
        suffix = config.alert(&suffix);
        arrow = config.alert(&arrow);
    }

    let mut info = format!(
        "{} {} {}",
        config.bold(&format!("{:#x}", frame.address)),
        config.func(&frame.name),
        format_total(node, config),
    );
    if !repeated && !frame.dynamic_stack {
        info.push(' ');
        info.push_str(&config.dark(&format!("({})", frame.own_stack)));
    }

    format!("{:indent$}{arrow}{info}{suffix}", "", indent = 3 * depth)
}

/// Totals marked `>` are lower bounds: the true usage may be larger.
fn format_total(node: &Node, config: &RenderConfig) -> String {
    let total = config.bold(&node.total_stack.to_string());
    if node.total_is_lower_bound {
        format!(">{total}")
    } else {
        format!(" {total}")
    }
}

/// The stack-impact summary: how much of the instruction stream the
/// analysis understood.
pub fn impact_table(statistics: &Statistics, config: &RenderConfig) -> Table {
    let total = statistics.total();
    let clear = statistics.count(StackImpact::Clear);
    let weak = statistics.count(StackImpact::Weak);
    let potential = statistics.count(StackImpact::Potential);
    let unexpected = statistics.count(StackImpact::No);
    let skipped = potential + unexpected;

    let headers = [
        ("", CellAlignment::Left),
        ("count", CellAlignment::Right),
        ("%", CellAlignment::Right),
    ];
    let mut table = new_table(&headers, config.show_header);

    for (title, count) in [
        ("total", total),
        ("clear", clear),
        ("weak (unknown stack impact)", weak),
        ("skipped", skipped),
        ("  potential stack instructions", potential),
        ("  unexpected stack impact", unexpected),
    ] {
        table.add_row(vec![
            title.to_string(),
            count.to_string(),
            format!("{}%", config.bold(&percent(count, total).to_string())),
        ]);
    }

    align(&mut table, &headers);
    table
}

/// The per-mnemonic table, most frequent first.
pub fn operation_table(statistics: &Statistics, config: &RenderConfig) -> Table {
    let total = statistics.total();

    let headers = [
        ("operation", CellAlignment::Left),
        ("count", CellAlignment::Right),
        ("%", CellAlignment::Right),
        ("stack impact", CellAlignment::Left),
    ];
    let mut table = new_table(&headers, config.show_header);

    let mut operations: Vec<_> = statistics.operations().collect();
    operations.sort_by(|a, b| b.1.executions.cmp(&a.1.executions).then(a.0.cmp(b.0)));

    for (operation, count) in operations {
        table.add_row(vec![
            operation.to_string(),
            count.executions.to_string(),
            format!("{}%", config.bold(&percent(count.executions, total).to_string())),
            impact_label(count.impact, config),
        ]);
    }

    align(&mut table, &headers);
    table
}

pub fn print_statistics(statistics: &Statistics, config: &RenderConfig, show_operations: bool) {
    if statistics.total() == 0 {
        return;
    }
    if show_operations {
        println!("{}", operation_table(statistics, config));
        println!();
    }
    println!("{}", impact_table(statistics, config));
}

fn impact_label(impact: StackImpact, config: &RenderConfig) -> String {
    match impact {
        StackImpact::Clear => config.paint(color::GREEN, "clear"),
        StackImpact::Potential => config.paint(color::YELLOW, "pot."),
        StackImpact::Weak => config.paint(color::RED, "weak"),
        StackImpact::No => String::new(),
    }
}

fn percent(count: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (100.0 * count as f64 / total as f64).round() as u64
}

fn new_table(headers: &[(&str, CellAlignment)], show_header: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if show_header {
        table.set_header(headers.iter().map(|(name, _)| *name).collect::<Vec<_>>());
    }

    table
}

/// Columns exist only after content was added, so alignment is applied last.
fn align(table: &mut Table, headers: &[(&str, CellAlignment)]) {
    let last = headers.len().saturating_sub(1);
    for (i, (_, alignment)) in headers.iter().enumerate() {
        if let Some(column) = table.column_mut(i) {
            column.set_cell_alignment(*alignment);
            let pad_left = if i == 0 { 0 } else { 1 };
            let pad_right = if i == last { 0 } else { 1 };
            column.set_padding((pad_left, pad_right));
        }
    }
}
