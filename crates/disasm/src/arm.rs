//! Stack-effect classification for the ARM instruction sets
//!
//! Covers AArch32 (A32 and T32 as objdump prints them) and AArch64 (A64).
//! The sets share the `sub sp, sp, #imm` family and the `bl` call forms;
//! A32 adds `push {…}` / `stm*` register lists, A64 the `stp`/`str`
//! pre-index stores. Calls keep the return address in the link register, so
//! a call site costs the caller nothing.

use crate::line::{call_target, Insn};
use crate::recognize::{MalformedOperands, Recognizer, StackEffect};

/// A32/T32 condition codes that can suffix a mnemonic.
const CONDITIONS: [&str; 17] = [
    "eq", "ne", "cs", "cc", "hs", "lo", "mi", "pl", "vs", "vc", "hi", "ls", "ge", "lt", "gt",
    "le", "al",
];

/// Recognizer for arm (AArch32) and aarch64 (A64).
pub struct Arm {
    a64: bool,
}

impl Arm {
    pub const fn arm() -> Self {
        Self { a64: false }
    }

    pub const fn aarch64() -> Self {
        Self { a64: true }
    }

    /// `sub sp, sp, #N` and friends. `negate` is set for `add`, where only
    /// negative immediates grow the stack.
    fn sp_arith(&self, insn: &Insn<'_>, negate: bool) -> Result<StackEffect, MalformedOperands> {
        let parts: Vec<&str> = insn.operands.split(',').map(str::trim).collect();
        if parts.first() != Some(&"sp") || parts.len() < 2 {
            return Ok(StackEffect::None);
        }
        // `sub sp, rN, #x` computes sp from another register.
        if parts.len() >= 3 && parts[1] != "sp" {
            return Ok(StackEffect::DecreaseDynamic);
        }

        let operand = parts[parts.len() - 1];
        let Some(immediate) = operand.strip_prefix('#') else {
            // Register operand: the adjustment is runtime-computed.
            return Ok(StackEffect::DecreaseDynamic);
        };

        let value = parse_immediate(immediate).ok_or_else(|| MalformedOperands::new(insn))?;
        let value = if negate { -value } else { value };
        if value > 0 {
            Ok(StackEffect::Decrease(value as u64))
        } else {
            Ok(StackEffect::None)
        }
    }

    /// `stp x29, x30, [sp, #-64]!` / `str x30, [sp, #-48]!`: only the
    /// pre-index writeback forms with a negative offset move sp down.
    fn sp_store(&self, insn: &Insn<'_>) -> Result<StackEffect, MalformedOperands> {
        let Some(at) = insn.operands.find('[') else {
            return Ok(StackEffect::None);
        };
        let memory = &insn.operands[at..];
        if !memory.ends_with('!') {
            return Ok(StackEffect::None);
        }
        let Some(inside) = memory
            .strip_suffix('!')
            .and_then(|m| m.strip_prefix('['))
            .and_then(|m| m.strip_suffix(']'))
        else {
            return Err(MalformedOperands::new(insn));
        };
        let Some((base, offset)) = inside.split_once(',') else {
            return Ok(StackEffect::None);
        };
        if base.trim() != "sp" {
            return Ok(StackEffect::None);
        }
        let offset = offset.trim().strip_prefix('#').unwrap_or(offset.trim());
        let value = parse_immediate(offset).ok_or_else(|| MalformedOperands::new(insn))?;
        if value < 0 {
            Ok(StackEffect::Decrease(-value as u64))
        } else {
            Ok(StackEffect::None)
        }
    }

    /// `push {r4, r5, lr}` and the decrementing `stm` forms: one word per
    /// register in the list.
    fn register_list(&self, insn: &Insn<'_>) -> Result<StackEffect, MalformedOperands> {
        let count = register_list_count(insn.operands)
            .ok_or_else(|| MalformedOperands::new(insn))?;
        Ok(StackEffect::Decrease(4 * count))
    }

    /// Direct branches can be tail calls. Only targets at a function entry
    /// count; `<sym+0x...>` annotations point inside the current function.
    fn tail_branch(&self, insn: &Insn<'_>) -> StackEffect {
        let candidate = insn.operands.rsplit(',').next().unwrap_or(insn.operands);
        match call_target(candidate) {
            Some(target) if target.is_function_entry() => StackEffect::DirectCall(target.address),
            _ => StackEffect::None,
        }
    }
}

impl Recognizer for Arm {
    fn classify(&self, insn: &Insn<'_>) -> Result<StackEffect, MalformedOperands> {
        let base = strip_width_suffix(insn.mnemonic);

        match base {
            "sub" | "subs" | "subw" => return self.sp_arith(insn, false),
            "add" | "adds" | "addw" => return self.sp_arith(insn, true),
            "mov" | "movs" => {
                if insn.operands.split(',').next().map(str::trim) == Some("sp") {
                    return Ok(StackEffect::DecreaseDynamic);
                }
                return Ok(StackEffect::None);
            }
            "stp" => return self.sp_store(insn),
            "ret" | "retaa" | "retab" => return Ok(StackEffect::Return),
            "blr" | "br" => return Ok(StackEffect::IndirectCall),
            "bxj" => return Ok(StackEffect::IndirectCall),
            "cbz" | "cbnz" | "tbz" | "tbnz" => return Ok(self.tail_branch(insn)),
            _ => {}
        }

        if base.starts_with("str") {
            return self.sp_store(insn);
        }

        if !self.a64 {
            if matches_stem(base, "push") {
                return self.register_list(insn);
            }
            if matches_stem(base, "pop") {
                return Ok(StackEffect::Potential);
            }
            if let Some(mode) = base.strip_prefix("stm") {
                if insn.operands.split(',').next().map(str::trim) == Some("sp!") {
                    return match &mode[..mode.len().min(2)] {
                        "db" | "fd" => self.register_list(insn),
                        _ => Ok(StackEffect::Potential),
                    };
                }
                return Ok(StackEffect::None);
            }
            if base.starts_with("ldm")
                && insn.operands.split(',').next().map(str::trim) == Some("sp!")
            {
                return Ok(StackEffect::Potential);
            }
        }

        // Pointer-authenticated branches always go through a register.
        if base.starts_with("blra") || base.starts_with("bra") {
            return Ok(StackEffect::IndirectCall);
        }

        // Branch family, most specific stem first.
        if matches_stem(base, "blx") {
            return Ok(match call_target(insn.operands) {
                Some(target) => StackEffect::DirectCall(target.address),
                None => StackEffect::IndirectCall,
            });
        }
        if matches_stem(base, "bl") {
            return match call_target(insn.operands) {
                Some(target) => Ok(StackEffect::DirectCall(target.address)),
                None => Err(MalformedOperands::new(insn)),
            };
        }
        if matches_stem(base, "bx") {
            return Ok(if insn.operands == "lr" {
                StackEffect::Return
            } else {
                StackEffect::IndirectCall
            });
        }
        if matches_stem(base, "b") || base.starts_with("b.") {
            return Ok(self.tail_branch(insn));
        }

        Ok(StackEffect::None)
    }

    fn call_cost(&self) -> u64 {
        // The return address stays in the link register.
        0
    }
}

/// Strip the T32 width suffixes (`sub.w`, `b.n`). A64 condition suffixes
/// like `b.ne` are left alone.
fn strip_width_suffix(mnemonic: &str) -> &str {
    mnemonic
        .strip_suffix(".w")
        .or_else(|| mnemonic.strip_suffix(".n"))
        .unwrap_or(mnemonic)
}

/// True when `mnemonic` is `stem` or `stem` plus a condition code.
fn matches_stem(mnemonic: &str, stem: &str) -> bool {
    mnemonic
        .strip_prefix(stem)
        .is_some_and(|suffix| suffix.is_empty() || CONDITIONS.contains(&suffix))
}

fn parse_immediate(text: &str) -> Option<i64> {
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match text.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => text.parse().ok()?,
    };
    Some(if negative { -value } else { value })
}

/// Count the registers in a `{r4, r5, lr}` list, expanding `r4-r7` ranges.
fn register_list_count(operands: &str) -> Option<u64> {
    let start = operands.find('{')?;
    let end = operands.find('}')?;
    let inside = operands.get(start + 1..end)?;

    let mut count = 0;
    for entry in inside.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        match entry.split_once('-') {
            Some((low, high)) => {
                let low = register_index(low.trim())?;
                let high = register_index(high.trim())?;
                if high < low {
                    return None;
                }
                count += high - low + 1;
            }
            None => count += 1,
        }
    }
    Some(count)
}

fn register_index(register: &str) -> Option<u64> {
    match register {
        "sb" => Some(9),
        "sl" => Some(10),
        "fp" => Some(11),
        "ip" => Some(12),
        "sp" => Some(13),
        "lr" => Some(14),
        "pc" => Some(15),
        _ => register.strip_prefix('r')?.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insn<'a>(mnemonic: &'a str, operands: &'a str) -> Insn<'a> {
        Insn {
            address: 0x104a4,
            mnemonic,
            operands,
        }
    }

    fn a32(mnemonic: &str, operands: &str) -> StackEffect {
        Arm::arm().classify(&insn(mnemonic, operands)).unwrap()
    }

    fn a64(mnemonic: &str, operands: &str) -> StackEffect {
        Arm::aarch64().classify(&insn(mnemonic, operands)).unwrap()
    }

    #[test]
    fn test_sub_sp_immediate() {
        assert_eq!(a32("sub", "sp, sp, #28"), StackEffect::Decrease(28));
        assert_eq!(a64("sub", "sp, sp, #0x1b0"), StackEffect::Decrease(432));
        // T32 wide encoding and the two-operand short form.
        assert_eq!(a32("sub.w", "sp, sp, #644"), StackEffect::Decrease(644));
        assert_eq!(a32("sub", "sp, #480"), StackEffect::Decrease(480));
    }

    #[test]
    fn test_add_negative_immediate_is_a_decrease() {
        assert_eq!(a32("add", "sp, sp, #-28"), StackEffect::Decrease(28));
        assert_eq!(a32("add", "sp, sp, #28"), StackEffect::None);
    }

    #[test]
    fn test_sub_register_is_dynamic() {
        assert_eq!(a64("sub", "sp, sp, x0"), StackEffect::DecreaseDynamic);
        assert_eq!(a64("sub", "sp, x29, #16"), StackEffect::DecreaseDynamic);
        assert_eq!(a64("mov", "sp, x29"), StackEffect::DecreaseDynamic);
    }

    #[test]
    fn test_sub_other_destination_is_ignored() {
        assert_eq!(a64("sub", "x0, x1, #4"), StackEffect::None);
        assert_eq!(a64("sub", "x0, sp, #4"), StackEffect::None);
        assert_eq!(a64("mov", "x29, sp"), StackEffect::None);
    }

    #[test]
    fn test_stp_preindex() {
        assert_eq!(
            a64("stp", "x29, x30, [sp, #-64]!"),
            StackEffect::Decrease(64)
        );
        // No writeback, no sp movement.
        assert_eq!(a64("stp", "x29, x30, [sp, #-64]"), StackEffect::None);
        // Positive pre-index and post-index forms do not grow the stack.
        assert_eq!(a64("stp", "x29, x30, [sp, #16]!"), StackEffect::None);
        assert_eq!(a64("stp", "x29, x30, [sp], #16"), StackEffect::None);
    }

    #[test]
    fn test_str_preindex() {
        assert_eq!(a64("str", "x30, [sp, #-48]!"), StackEffect::Decrease(48));
        assert_eq!(a32("str", "lr, [sp, #-4]!"), StackEffect::Decrease(4));
        assert_eq!(a64("str", "x0, [sp, #16]"), StackEffect::None);
        assert_eq!(a64("str", "x0, [x1, #-16]!"), StackEffect::None);
    }

    #[test]
    fn test_ldr_postindex_is_ignored() {
        assert_eq!(a64("ldr", "x0, [sp], #16"), StackEffect::None);
        assert_eq!(a64("ldp", "x29, x30, [sp], #48"), StackEffect::None);
    }

    #[test]
    fn test_push_register_list() {
        assert_eq!(a32("push", "{r4, r5, lr}"), StackEffect::Decrease(12));
        assert_eq!(a32("push", "{r4-r7}"), StackEffect::Decrease(16));
        assert_eq!(a32("push", "{r4-r7, lr}"), StackEffect::Decrease(20));
        assert_eq!(a32("pushlt", "{r0}"), StackEffect::Decrease(4));
    }

    #[test]
    fn test_push_malformed_list() {
        assert!(Arm::arm().classify(&insn("push", "{r7-r4}")).is_err());
        assert!(Arm::arm().classify(&insn("push", "r4, r5")).is_err());
    }

    #[test]
    fn test_stm_forms() {
        assert_eq!(a32("stmdb", "sp!, {r4, r5}"), StackEffect::Decrease(8));
        assert_eq!(a32("stmfd", "sp!, {r4-r6, lr}"), StackEffect::Decrease(16));
        // Incrementing forms are recognized but not counted.
        assert_eq!(a32("stmia", "sp!, {r0}"), StackEffect::Potential);
        // Register lists stored elsewhere do not touch the stack.
        assert_eq!(a32("stmdb", "r0!, {r4, r5}"), StackEffect::None);
    }

    #[test]
    fn test_pop_and_ldm_are_potential() {
        assert_eq!(a32("pop", "{r4, pc}"), StackEffect::Potential);
        assert_eq!(a32("ldmia", "sp!, {r4, pc}"), StackEffect::Potential);
    }

    #[test]
    fn test_direct_calls() {
        assert_eq!(
            a32("bl", "104a4 <func_alpha>"),
            StackEffect::DirectCall(0x104a4)
        );
        assert_eq!(
            a64("bl", "4005c4 <func_beta>"),
            StackEffect::DirectCall(0x4005c4)
        );
        assert_eq!(
            a32("blx", "10918 <func_thumb>"),
            StackEffect::DirectCall(0x10918)
        );
    }

    #[test]
    fn test_indirect_calls() {
        assert_eq!(a32("blx", "r3"), StackEffect::IndirectCall);
        assert_eq!(a32("bx", "r3"), StackEffect::IndirectCall);
        assert_eq!(a32("bxeq", "r2"), StackEffect::IndirectCall);
        assert_eq!(a64("blr", "x3"), StackEffect::IndirectCall);
        assert_eq!(a64("br", "x2"), StackEffect::IndirectCall);
        assert_eq!(a64("braaz", "x0"), StackEffect::IndirectCall);
        assert_eq!(a64("blraa", "x1, x2"), StackEffect::IndirectCall);
    }

    #[test]
    fn test_returns() {
        assert_eq!(a32("bx", "lr"), StackEffect::Return);
        assert_eq!(a64("ret", ""), StackEffect::Return);
    }

    #[test]
    fn test_tail_branches_to_function_entries() {
        assert_eq!(
            a32("b", "104a4 <func_alpha>"),
            StackEffect::DirectCall(0x104a4)
        );
        assert_eq!(
            a32("beq", "104a4 <func_alpha>"),
            StackEffect::DirectCall(0x104a4)
        );
        assert_eq!(
            a64("b.ne", "4005c4 <func_beta>"),
            StackEffect::DirectCall(0x4005c4)
        );
        assert_eq!(
            a64("cbz", "x0, 4005c4 <func_beta>"),
            StackEffect::DirectCall(0x4005c4)
        );
        assert_eq!(
            a64("tbz", "x23, #63, 4005c4 <func_beta>"),
            StackEffect::DirectCall(0x4005c4)
        );
    }

    #[test]
    fn test_intra_function_branches_are_ignored() {
        assert_eq!(a64("b.ne", "4005f2 <main+0x26>"), StackEffect::None);
        assert_eq!(a32("bne", "104b0 <func_alpha+0xc>"), StackEffect::None);
        assert_eq!(a64("cbnz", "w5, 400644 <main+0x44>"), StackEffect::None);
    }

    #[test]
    fn test_call_cost_is_zero() {
        assert_eq!(Arm::arm().call_cost(), 0);
        assert_eq!(Arm::aarch64().call_cost(), 0);
    }

    #[test]
    fn test_unrelated_instructions() {
        assert_eq!(a64("add", "x0, x0, #1"), StackEffect::None);
        assert_eq!(a32("cmp", "r0, #10"), StackEffect::None);
        assert_eq!(a64("nop", ""), StackEffect::None);
        assert_eq!(a64(".word", "0x00010350"), StackEffect::None);
    }
}
