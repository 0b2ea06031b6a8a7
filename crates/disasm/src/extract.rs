//! Turns a disassembly listing into per-function frames
//!
//! The extractor walks the listing once: function headers open a new frame,
//! instruction lines feed the architecture's recognizer, and the effects
//! accumulate into the frame until the next header seals it.

use callgraph::{Diagnostic, Frame};

use crate::arch::Arch;
use crate::line::{self, Line};
use crate::recognize::{Recognizer, StackEffect, StackImpact};
use crate::stats::Statistics;

/// Result of scanning one disassembly listing.
#[derive(Debug, Default)]
pub struct Extraction {
    pub frames: Vec<Frame>,
    pub statistics: Statistics,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scan listing lines and build one frame per function section.
///
/// Empty input produces an empty extraction. Lines outside any function
/// section are skipped.
pub fn extract<I, S>(arch: Arch, lines: I) -> Extraction
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut extractor = Extractor::new(arch);
    for line in lines {
        extractor.step(line.as_ref());
    }
    extractor.finish()
}

struct Extractor {
    recognizer: &'static dyn Recognizer,
    call_cost: u64,
    object_file: Option<String>,
    section: Option<String>,
    current: Option<Current>,
    out: Extraction,
}

/// The frame being built, with its once-per-function report state.
struct Current {
    frame: Frame,
    reported_malformed: bool,
}

impl Extractor {
    fn new(arch: Arch) -> Self {
        Self {
            recognizer: arch.recognizer(),
            call_cost: arch.recognizer().call_cost(),
            object_file: None,
            section: None,
            current: None,
            out: Extraction::default(),
        }
    }

    fn step(&mut self, line: &str) {
        match line::parse(line) {
            Line::FileFormat { object_file } => {
                self.object_file = Some(object_file.to_string());
            }
            Line::Section { name } => {
                log::debug!("disassembly of section {name}");
                self.section = Some(name.to_string());
            }
            Line::Function { address, name } => {
                self.seal();
                log::debug!("{name}:");
                let mut frame = Frame::new(address, name);
                frame.section = self.section.clone();
                frame.object_file = self.object_file.clone();
                self.current = Some(Current {
                    frame,
                    reported_malformed: false,
                });
            }
            Line::Insn(insn) => {
                let Some(current) = self.current.as_mut() else {
                    log::debug!("instruction outside any function section: {line}");
                    return;
                };

                match self.recognizer.classify(&insn) {
                    Ok(effect) => {
                        self.out.statistics.record(insn.mnemonic, effect.impact());
                        apply(
                            effect,
                            self.call_cost,
                            &mut current.frame,
                            &mut self.out.diagnostics,
                        );
                    }
                    Err(error) => {
                        self.out.statistics.record(insn.mnemonic, StackImpact::No);
                        log::debug!("{}: {error}", current.frame.name);
                        if !current.reported_malformed {
                            current.reported_malformed = true;
                            self.out.diagnostics.push(Diagnostic::MalformedLine {
                                function: current.frame.name.clone(),
                            });
                        }
                    }
                }
            }
            Line::Other => {}
        }
    }

    fn seal(&mut self) {
        if let Some(current) = self.current.take() {
            self.out.frames.push(current.frame);
        }
    }

    fn finish(mut self) -> Extraction {
        self.seal();
        self.out
    }
}

fn apply(effect: StackEffect, call_cost: u64, frame: &mut Frame, diagnostics: &mut Vec<Diagnostic>) {
    match effect {
        StackEffect::Decrease(bytes) => {
            log::trace!("{}: +{bytes}B", frame.name);
            frame.own_stack += bytes;
        }
        StackEffect::DecreaseDynamic => {
            if !frame.dynamic_stack {
                frame.dynamic_stack = true;
                diagnostics.push(Diagnostic::DynamicStack {
                    function: frame.name.clone(),
                });
            }
        }
        StackEffect::DirectCall(target) => {
            frame.call_targets.push(target);
            frame.own_stack += call_cost;
        }
        StackEffect::IndirectCall => {
            if !frame.has_indirect_call {
                frame.has_indirect_call = true;
                diagnostics.push(Diagnostic::IndirectCall {
                    function: frame.name.clone(),
                });
            }
        }
        StackEffect::Return | StackEffect::Potential | StackEffect::None => {}
    }
}
