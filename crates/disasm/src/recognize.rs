//! Instruction classification shared by all architectures

use thiserror::Error;

use crate::line::Insn;

/// Effect of one instruction on the stack analysis.
///
/// The recognizer is pure and context-free: classification depends only on
/// the instruction text, never on what came before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEffect {
    /// No effect on the analysis.
    None,
    /// Statically reduces the stack pointer by the given number of bytes.
    Decrease(u64),
    /// Reduces the stack pointer by an amount not in the instruction text
    /// (register-computed or loaded from memory).
    DecreaseDynamic,
    /// Transfers control to a statically known function address.
    DirectCall(u64),
    /// Calls through a register or memory operand.
    IndirectCall,
    /// Flow leaves the function.
    Return,
    /// Recognizably stack-related, deliberately not counted (the matching
    /// decrease is tracked instead). Feeds the statistics only.
    Potential,
}

/// How an instruction was treated by the analysis, for the statistics.
///
/// Ordered by "how much this instruction threatens the bound" so that a
/// mnemonic seen with several effects keeps the strongest classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StackImpact {
    /// No stack relevance detected or expected.
    No,
    /// Stack operation recognized and counted exactly.
    Clear,
    /// Potential stack operation recognized, not counted.
    Potential,
    /// Stack operation recognized, but its size cannot be determined.
    Weak,
}

impl StackEffect {
    pub fn impact(&self) -> StackImpact {
        match self {
            StackEffect::Decrease(_) | StackEffect::DirectCall(_) => StackImpact::Clear,
            StackEffect::DecreaseDynamic | StackEffect::IndirectCall => StackImpact::Weak,
            StackEffect::Potential => StackImpact::Potential,
            StackEffect::None | StackEffect::Return => StackImpact::No,
        }
    }
}

/// A line whose shape was recognized but whose fields did not parse.
///
/// The extractor downgrades this to a once-per-function diagnostic and
/// treats the line as irrelevant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse operands of '{mnemonic}': {operands}")]
pub struct MalformedOperands {
    pub mnemonic: String,
    pub operands: String,
}

impl MalformedOperands {
    pub fn new(insn: &Insn<'_>) -> Self {
        Self {
            mnemonic: insn.mnemonic.to_string(),
            operands: insn.operands.to_string(),
        }
    }
}

/// Architecture-specific classifier mapping one instruction line to its
/// effect on the analysis.
pub trait Recognizer: Sync {
    /// Classify a single instruction.
    fn classify(&self, insn: &Insn<'_>) -> Result<StackEffect, MalformedOperands>;

    /// Bytes the caller's stack grows per direct call it makes.
    ///
    /// `call` pushes the return address on x86; on ARM it stays in the link
    /// register and costs nothing at the call site.
    fn call_cost(&self) -> u64;
}
