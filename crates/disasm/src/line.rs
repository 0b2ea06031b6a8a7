//! Zero-copy parsing of GNU objdump disassembly listings
//!
//! A listing is a sequence of file-format lines, section headers, function
//! headers and instruction lines:
//!
//! ```text
//! tests/dep-x86_64:     file format elf64-x86-64
//!
//! Disassembly of section .text:
//!
//! 00000000004004a6 <func_omega2>:
//!   4004a6:	55                   	push   %rbp
//! ```
//!
//! The parser only splits lines into their parts; what an instruction means
//! is the recognizer's business.

/// One classified line of a disassembly listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// `path/to/bin:     file format elf64-x86-64`; carries the basename.
    FileFormat { object_file: &'a str },
    /// `Disassembly of section .text:`
    Section { name: &'a str },
    /// `00000000004004a6 <func_omega2>:`
    Function { address: u64, name: &'a str },
    /// An instruction line.
    Insn(Insn<'a>),
    /// Blank lines, ellipses and anything else without analytical content.
    Other,
}

/// An instruction line split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insn<'a> {
    pub address: u64,
    pub mnemonic: &'a str,
    /// Operand text with trailing `;` / `//` comments removed.
    pub operands: &'a str,
}

/// A direct-transfer target as objdump prints it: `4005e9 <function_e>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTarget<'a> {
    pub address: u64,
    /// The symbol annotation, if present. Intra-function targets carry a
    /// `+0x...` offset inside the brackets.
    pub symbol: Option<&'a str>,
}

impl CallTarget<'_> {
    /// True when the annotation points at a function entry rather than into
    /// a function body.
    pub fn is_function_entry(&self) -> bool {
        self.symbol.map_or(true, |symbol| !symbol.contains('+'))
    }
}

/// Parse a `ADDR <symbol>` operand into its target.
pub fn call_target(text: &str) -> Option<CallTarget<'_>> {
    let text = text.trim();
    let (addr_text, rest) = match text.split_once(char::is_whitespace) {
        Some((addr_text, rest)) => (addr_text, rest.trim()),
        None => (text, ""),
    };
    let address = u64::from_str_radix(addr_text, 16).ok()?;
    let symbol = rest.strip_prefix('<').and_then(|rest| rest.strip_suffix('>'));
    Some(CallTarget { address, symbol })
}

/// Classify one listing line.
pub fn parse(line: &str) -> Line<'_> {
    if line.trim().is_empty() {
        return Line::Other;
    }

    if let Some(rest) = line.strip_prefix("Disassembly of section ") {
        if let Some(name) = rest.trim_end().strip_suffix(':') {
            return Line::Section { name };
        }
    }

    if line.starts_with(|c: char| c.is_whitespace()) {
        return parse_insn(line).unwrap_or(Line::Other);
    }

    parse_file_format(line)
        .or_else(|| parse_function(line))
        .unwrap_or(Line::Other)
}

fn parse_file_format(line: &str) -> Option<Line<'_>> {
    let at = line.find("file format")?;
    let path = line[..at].trim_end().strip_suffix(':')?;
    let object_file = path.rsplit('/').next().unwrap_or(path);
    Some(Line::FileFormat { object_file })
}

fn parse_function(line: &str) -> Option<Line<'_>> {
    let (addr_text, rest) = line.split_once(' ')?;
    let address = u64::from_str_radix(addr_text, 16).ok()?;
    let name = rest.trim_end().strip_prefix('<')?.strip_suffix(">:")?;
    Some(Line::Function { address, name })
}

fn parse_insn(line: &str) -> Option<Line<'_>> {
    let (addr_text, rest) = line.trim_start().split_once(':')?;
    let address = u64::from_str_radix(addr_text, 16).ok()?;

    // Skip the opcode-bytes column if present. Mnemonics never consist of
    // hex digits and spaces alone, so the test is unambiguous in practice.
    let rest = rest.strip_prefix('\t').unwrap_or(rest);
    let text = match rest.split_once('\t') {
        Some((first, tail)) if is_opcode_bytes(first) => tail,
        _ if is_opcode_bytes(rest) => return Some(Line::Other),
        _ => rest,
    };

    let text = text.trim();
    if text.is_empty() {
        return Some(Line::Other);
    }

    let (mnemonic, operands) = match text.split_once(|c: char| c.is_whitespace()) {
        Some((mnemonic, operands)) => (mnemonic, operands.trim()),
        None => (text, ""),
    };

    Some(Line::Insn(Insn {
        address,
        mnemonic,
        operands: cut_comment(operands),
    }))
}

fn is_opcode_bytes(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.chars().all(|c| c.is_ascii_hexdigit() || c == ' ')
}

/// Remove trailing `; ...` and `// ...` comments objdump appends to some
/// operands. `#` stays: it prefixes ARM immediates.
fn cut_comment(operands: &str) -> &str {
    let mut end = operands.len();
    for marker in [" ;", "\t;", " //", "\t//"] {
        if let Some(at) = operands.find(marker) {
            end = end.min(at);
        }
    }
    operands[..end].trim_end()
}
