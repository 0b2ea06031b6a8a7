//! ELF inspection: architecture detection and the function symbol map

use anyhow::{bail, Result};
use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};

use callgraph::SymbolMap;
use disasm::{Arch, UnsupportedArchitecture};

/// Map the ELF machine to an [`Arch`] tag.
pub fn detect_arch(file: &object::File<'_>) -> Result<Arch> {
    use object::Architecture;

    match file.architecture() {
        Architecture::Arm => Ok(Arch::Arm),
        Architecture::Aarch64 => Ok(Arch::Aarch64),
        Architecture::I386 => Ok(Arch::X86),
        Architecture::X86_64 => Ok(Arch::X86_64),
        other => bail!(UnsupportedArchitecture(format!("{other:?}"))),
    }
}

/// Collect every function symbol of the binary.
pub fn symbol_map(file: &object::File<'_>) -> SymbolMap {
    let mut map = SymbolMap::new();

    for symbol in file.symbols() {
        if symbol.kind() != SymbolKind::Text {
            continue;
        }
        let Ok(name) = symbol.name() else { continue };
        if name.is_empty() {
            continue;
        }
        let section = symbol
            .section_index()
            .and_then(|index| file.section_by_index(index).ok())
            .and_then(|section| section.name().ok().map(str::to_string));
        map.insert(symbol.address(), name, section);
    }

    log::debug!("collected {} function symbols", map.len());
    map
}
