//! The frame-walking state machine.

use std::io::Write;

use log::{debug, warn};

use crate::arch::WORD_SIZE;
use crate::error::Result;
use crate::format::format_args;
use crate::memory::Memory;
use crate::symbols::{FuncSpec, SymbolTable};

/// Upper bound on walked frames.
const MAX_FRAMES: usize = 50;

/// Emitted when the frame chain cannot be followed any further.
const FATAL_LINE: &str = "FATAL: Stack Wrong!";

// The exit heuristic decodes the stack-adjustment instruction that follows a
// call site: a 32-bit operand at this offset past the return address, and a
// fixed skip over the instruction encoding itself.
const EXIT_OPERAND_OFFSET: usize = 4;
const EXIT_SKIP_BYTES: usize = 8;

/// Knobs for one traversal.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Most frames walked before the traversal gives up.
    pub max_frames: usize,
    /// Function marking the bottom of the call chain.
    pub start_symbol: String,
    /// The runtime's termination function, matched by the exit heuristic.
    pub exit_symbol: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_frames: MAX_FRAMES,
            start_symbol: "_start".into(),
            exit_symbol: "exit".into(),
        }
    }
}

/// One step of the traversal; owned by the walker and discarded after use.
#[derive(Debug, Clone, Copy)]
struct StackFrame {
    frame_pointer: usize,
    saved_frame_pointer: usize,
    return_address: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    Initial,
    Walking,
    Done,
    Faulted,
}

/// Traverses a saved-frame-pointer chain, emitting one line per frame.
pub struct Walker<'a> {
    table: &'a SymbolTable,
    mem: &'a dyn Memory,
    config: &'a TraceConfig,
}

impl<'a> Walker<'a> {
    pub fn new(table: &'a SymbolTable, mem: &'a dyn Memory, config: &'a TraceConfig) -> Self {
        Self { table, mem, config }
    }

    /// Walk the chain rooted at `start_fp`, writing one line per frame.
    ///
    /// Only the output sink can fail here; everything the walk itself runs
    /// into is reported in the stream and the walk ends in `Done`.
    pub fn walk<W: Write>(&self, start_fp: usize, out: &mut W) -> Result<()> {
        let mut state = WalkState::Initial;
        let mut fp = start_fp;
        let mut emitted = 0usize;

        loop {
            state = match state {
                WalkState::Initial => WalkState::Walking,
                WalkState::Walking => {
                    if fp == 0 {
                        WalkState::Done
                    } else if emitted >= self.config.max_frames {
                        warn!("frame limit ({}) reached, stopping", self.config.max_frames);
                        WalkState::Done
                    } else {
                        match self.read_frame(fp) {
                            Some(frame) => self.step(frame, out, &mut fp, &mut emitted)?,
                            None => {
                                warn!("frame record at {fp:#x} is unreadable");
                                WalkState::Faulted
                            }
                        }
                    }
                }
                WalkState::Faulted => {
                    writeln!(out, "{FATAL_LINE}")?;
                    WalkState::Done
                }
                WalkState::Done => break,
            };
        }
        Ok(())
    }

    // Reads the frame record at `fp`. Both words go through the validated
    // memory view, so a corrupt frame pointer is refused here instead of
    // faulting the process.
    fn read_frame(&self, fp: usize) -> Option<StackFrame> {
        let saved_frame_pointer = self.mem.read_word(fp)?;
        let return_address = self.mem.read_word(fp.wrapping_add(WORD_SIZE))?;
        Some(StackFrame {
            frame_pointer: fp,
            saved_frame_pointer,
            return_address,
        })
    }

    fn step<W: Write>(
        &self,
        frame: StackFrame,
        out: &mut W,
        fp: &mut usize,
        emitted: &mut usize,
    ) -> Result<WalkState> {
        // a null saved frame pointer is the clean bottom of the chain
        if frame.saved_frame_pointer == 0 {
            return Ok(WalkState::Done);
        }

        // the caller's frame must sit strictly above ours on a
        // downward-growing stack; anything else means the chain is broken
        if frame.saved_frame_pointer <= frame.frame_pointer {
            warn!(
                "frame chain corrupt: saved fp {:#x} not above fp {:#x}",
                frame.saved_frame_pointer, frame.frame_pointer
            );
            writeln!(out, "{FATAL_LINE}")?;
            return Ok(WalkState::Done);
        }

        match self.table.resolve(frame.return_address) {
            None => {
                // keep walking; one unknown return site does not end the chain
                debug!("no symbol for return address {:#x}", frame.return_address);
                writeln!(out, "Function {:#x}(...), in", frame.return_address)?;
            }
            Some(f) => {
                if self.at_chain_bottom(f, frame.return_address) {
                    return Ok(WalkState::Done);
                }
                let args = format_args(f, frame.saved_frame_pointer, self.mem);
                debug!("frame at {:#x}: {}", frame.frame_pointer, f.name);
                writeln!(out, "Function {}({}), in", f.name, args)?;
            }
        }

        *emitted += 1;
        *fp = frame.saved_frame_pointer;
        Ok(WalkState::Walking)
    }

    /// Whether this frame marks the bottom of the user call chain: the
    /// resolved function is the designated startup function, or the
    /// instruction bytes just past the return site point the next return
    /// into the runtime's termination function.
    fn at_chain_bottom(&self, f: &FuncSpec, ret: usize) -> bool {
        if f.name == self.config.start_symbol {
            return true;
        }
        // the operand read is as unverified as any other address; skip the
        // heuristic rather than fault when the code bytes are unreadable
        let Some(operand) = self.mem.read_i32(ret.wrapping_add(EXIT_OPERAND_OFFSET)) else {
            return false;
        };
        let exit = ret
            .wrapping_add_signed(operand as isize)
            .wrapping_add(EXIT_SKIP_BYTES);
        self.table
            .resolve(exit)
            .is_some_and(|g| g.name == self.config.exit_symbol)
    }
}
