//! Stack-effect classification for the x86 and x86_64 instruction sets
//!
//! AT&T syntax as emitted by GNU objdump: `sub    $0x10,%rsp`,
//! `push   %rbp`, `callq  4005e9 <function_e>`, `callq  *%rax`.
//!
//! The two instruction sets share everything but the pointer width, which
//! decides the size of a return-address slot and of a pushed immediate.

use crate::line::{call_target, Insn};
use crate::recognize::{MalformedOperands, Recognizer, StackEffect};

/// Recognizer for IA-32 (width 4) and x86-64 (width 8).
pub struct X86 {
    ptr_width: u64,
}

impl X86 {
    pub const fn x86() -> Self {
        Self { ptr_width: 4 }
    }

    pub const fn x86_64() -> Self {
        Self { ptr_width: 8 }
    }

    fn classify_sub(&self, insn: &Insn<'_>) -> Result<StackEffect, MalformedOperands> {
        let Some((source, destination)) = insn.operands.rsplit_once(',') else {
            return Ok(StackEffect::None);
        };
        if !is_stack_pointer(destination.trim()) {
            return Ok(StackEffect::None);
        }

        let Some(immediate) = source.trim().strip_prefix('$') else {
            // Register or memory source: the decrement is runtime-computed.
            return Ok(StackEffect::DecreaseDynamic);
        };

        let value = parse_immediate(immediate).ok_or_else(|| MalformedOperands::new(insn))?;
        let value = self.as_signed(value);

        // Subtracting a non-positive immediate grows nothing, and absurd
        // magnitudes are encoding artifacts; both are skipped.
        if value <= 0 || value > 0x1000_0000 {
            return Ok(StackEffect::None);
        }
        Ok(StackEffect::Decrease(value as u64))
    }

    fn classify_push(&self, insn: &Insn<'_>) -> Result<StackEffect, MalformedOperands> {
        if insn.operands.is_empty() {
            return Err(MalformedOperands::new(insn));
        }
        let width = match insn.operands.strip_prefix('%') {
            Some(register) => register_width(register).unwrap_or(self.ptr_width),
            // Immediates and memory operands occupy one pointer width.
            None => self.ptr_width,
        };
        Ok(StackEffect::Decrease(width))
    }

    fn classify_call(&self, insn: &Insn<'_>) -> Result<StackEffect, MalformedOperands> {
        if insn.operands.starts_with('*') {
            return Ok(StackEffect::IndirectCall);
        }
        match call_target(insn.operands) {
            Some(target) => Ok(StackEffect::DirectCall(target.address)),
            None => Err(MalformedOperands::new(insn)),
        }
    }

    fn as_signed(&self, value: u64) -> i64 {
        match self.ptr_width {
            4 => value as u32 as i32 as i64,
            _ => value as i64,
        }
    }
}

impl Recognizer for X86 {
    fn classify(&self, insn: &Insn<'_>) -> Result<StackEffect, MalformedOperands> {
        match insn.mnemonic {
            "sub" | "subl" | "subq" | "subw" => self.classify_sub(insn),
            "push" | "pushl" | "pushq" | "pushw" => self.classify_push(insn),
            "call" | "callq" | "calll" => self.classify_call(insn),
            "ret" | "retq" | "retl" => Ok(StackEffect::Return),
            "repz" if insn.operands.starts_with("ret") => Ok(StackEffect::Return),
            "enter" | "fdecstp" => Ok(StackEffect::Potential),
            mnemonic if mnemonic.starts_with("pusha") || mnemonic.starts_with("pushf") => {
                Ok(StackEffect::Potential)
            }
            "pop" | "popl" | "popq" if is_stack_pointer(insn.operands) => {
                Ok(StackEffect::Potential)
            }
            _ => Ok(StackEffect::None),
        }
    }

    fn call_cost(&self) -> u64 {
        self.ptr_width
    }
}

fn is_stack_pointer(operand: &str) -> bool {
    matches!(operand, "%rsp" | "%esp" | "%sp")
}

fn parse_immediate(text: &str) -> Option<u64> {
    match text.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Bytes a `push` of the given register occupies.
fn register_width(register: &str) -> Option<u64> {
    match register {
        "rax" | "rbx" | "rcx" | "rdx" | "rbp" | "rsi" | "rdi" | "rsp" => Some(8),
        "eax" | "ebx" | "ecx" | "edx" | "ebp" | "esi" | "edi" | "esp" => Some(4),
        "ax" | "bx" | "cx" | "dx" | "bp" | "si" | "di" | "sp" => Some(2),
        "ah" | "al" | "bh" | "bl" | "ch" | "cl" | "dh" | "dl" | "bpl" | "sil" | "dil"
        | "spl" => Some(1),
        _ => numbered_register_width(register),
    }
}

/// Widths of the x86-64 numbered registers r8–r15 and their sub-registers.
fn numbered_register_width(register: &str) -> Option<u64> {
    let rest = register.strip_prefix('r')?;
    let (number, width) = if let Some(number) = rest.strip_suffix('b') {
        (number, 1)
    } else if let Some(number) = rest.strip_suffix('w') {
        (number, 2)
    } else if let Some(number) = rest.strip_suffix('d') {
        (number, 4)
    } else {
        (rest, 8)
    };
    matches!(number.parse::<u8>(), Ok(8..=15)).then_some(width)
}
