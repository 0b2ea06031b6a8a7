//! Locating and driving the external disassembler

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

/// Find a GNU objdump able to disassemble the given binary.
///
/// An explicit path is probed and used as-is; otherwise every `*objdump`
/// found in the working directory and on `PATH` is tried in order.
pub fn find_objdump(explicit: Option<&Path>, binary: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !supports(path, binary) {
            bail!(
                "'{}' does not support the architecture of '{}'",
                path.display(),
                binary.display()
            );
        }
        return Ok(path.to_path_buf());
    }

    log::debug!("searching for a compatible objdump");
    for candidate in candidates() {
        if is_gnu(&candidate) && supports(&candidate, binary) {
            log::debug!("using '{}'", candidate.display());
            return Ok(candidate);
        }
    }

    bail!("no objdump supporting this binary found on PATH; use --objdump to name one")
}

/// Every `*objdump` in the working directory and the `PATH` directories.
fn candidates() -> Vec<PathBuf> {
    let mut directories = vec![PathBuf::from(".")];
    if let Some(path) = env::var_os("PATH") {
        directories.extend(env::split_paths(&path));
    }

    let mut found = Vec::new();
    for directory in directories {
        let Ok(entries) = fs::read_dir(&directory) else {
            continue;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().ends_with("objdump") {
                found.push(entry.path());
            }
        }
    }
    found
}

/// `--version` of a GNU binutils objdump starts with "GNU".
fn is_gnu(objdump: &Path) -> bool {
    Command::new(objdump)
        .arg("--version")
        .output()
        .map(|output| String::from_utf8_lossy(&output.stdout).starts_with("GNU"))
        .unwrap_or(false)
}

/// Probe whether the objdump accepts the binary's architecture without
/// producing any actual output.
fn supports(objdump: &Path, binary: &Path) -> bool {
    Command::new(objdump)
        .args(["-d", "--stop-address=0"])
        .arg(binary)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run `objdump -d` and collect the listing lines.
pub fn disassemble(objdump: &Path, binary: &Path) -> Result<Vec<String>> {
    let output = Command::new(objdump)
        .arg("-d")
        .arg(binary)
        .output()
        .with_context(|| format!("failed to run '{}'", objdump.display()))?;

    if !output.status.success() {
        bail!(
            "objdump failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect())
}
