//! Architecture tags and recognizer dispatch

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::arm::Arm;
use crate::recognize::Recognizer;
use crate::x86::X86;

/// An instruction-set architecture the analyzer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Arch {
    /// 32-bit ARM (A32/T32).
    Arm,
    /// 64-bit ARM (A64).
    Aarch64,
    /// 32-bit x86 (IA-32).
    X86,
    /// 64-bit x86.
    X86_64,
}

/// The architecture tag is outside the supported set. Fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported architecture '{0}'; supported are arm, aarch64, x86 and x86_64")]
pub struct UnsupportedArchitecture(pub String);

static ARM: Arm = Arm::arm();
static AARCH64: Arm = Arm::aarch64();
static X86_32: X86 = X86::x86();
static X86_64_BIT: X86 = X86::x86_64();

impl Arch {
    pub const ALL: [Arch; 4] = [Arch::Arm, Arch::Aarch64, Arch::X86, Arch::X86_64];

    /// Width of a pointer, and of a return-address slot, in bytes.
    pub fn pointer_width(&self) -> u64 {
        match self {
            Arch::Arm | Arch::X86 => 4,
            Arch::Aarch64 | Arch::X86_64 => 8,
        }
    }

    /// The instruction recognizer for this architecture.
    pub fn recognizer(&self) -> &'static dyn Recognizer {
        match self {
            Arch::Arm => &ARM,
            Arch::Aarch64 => &AARCH64,
            Arch::X86 => &X86_32,
            Arch::X86_64 => &X86_64_BIT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Arch::Arm => "arm",
            Arch::Aarch64 => "aarch64",
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Arch {
    type Err = UnsupportedArchitecture;

    /// Accepts the canonical tags plus the spellings ELF headers and
    /// toolchains use (`x86-64`, `i386`, `80386`, …).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.to_ascii_lowercase().replace('-', "_");
        match tag.as_str() {
            "arm" => Ok(Arch::Arm),
            "aarch64" => Ok(Arch::Aarch64),
            "x86" | "i386" | "i486" | "i586" | "i686" | "80386" => Ok(Arch::X86),
            "x86_64" | "amd64" => Ok(Arch::X86_64),
            _ => Err(UnsupportedArchitecture(s.to_string())),
        }
    }
}
