//! Non-fatal findings surfaced during analysis

use thiserror::Error;

/// A finding produced while parsing the listing or walking the graph.
///
/// Diagnostics never abort the analysis; they qualify its result. The
/// consumer decides how to render them and which exit code they map to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// A call cycle (mutual recursion or a self-call). The stack bound of
    /// every participant is only a lower bound.
    #[error("found cycle in call graph entering with '{function}'")]
    CycleEntry { function: String },

    /// A call through a register or memory operand; the callee is unknown.
    #[error("function '{function}' calls a function pointer")]
    IndirectCall { function: String },

    /// A stack-pointer adjustment whose magnitude is not in the instruction.
    #[error("dynamic stack operation in function '{function}'")]
    DynamicStack { function: String },

    /// A direct call whose target has no analyzed body. The edge is dropped
    /// and the callee contributes zero.
    #[error("call in '{caller}' to unresolved target {target:#x}")]
    UnresolvedCallee { caller: String, target: u64 },

    /// Instruction lines in the function matched the listing shape but their
    /// fields did not parse; they were skipped.
    #[error("unparseable instruction lines in function '{function}'")]
    MalformedLine { function: String },
}

/// Recommended rendering severity for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Qualifies the result; worth a warning.
    Warning,
    /// Expected noise (e.g. calls into libraries outside the listing).
    Info,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::CycleEntry { .. }
            | Diagnostic::IndirectCall { .. }
            | Diagnostic::DynamicStack { .. }
            | Diagnostic::MalformedLine { .. } => Severity::Warning,
            Diagnostic::UnresolvedCallee { .. } => Severity::Info,
        }
    }
}
