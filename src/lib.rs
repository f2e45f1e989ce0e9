//! In-process stack traceback with typed argument rendering.
//!
//! Walks the saved-frame-pointer chain of the calling thread, resolves each
//! return address against a caller-supplied [`SymbolTable`], and writes one
//! line per frame with the resolved function's arguments read from the live
//! stack:
//!
//! ```text
//! Function b(int x=5, char *s="hi"), in
//! Function a(void), in
//! Function main(int argc=1, char **argv={"demo"}), in
//! ```
//!
//! Every suspect dereference goes through a side-effect probe ([`Prober`]),
//! so an invalid address degrades the output instead of faulting the
//! process. Frames that do not follow the saved-frame-pointer convention are
//! not supported; the build forces frame pointers for exactly that reason.
//!
//! ```no_run
//! use traceback::SymbolTable;
//!
//! fn report(table: &SymbolTable) {
//!     let mut out = Vec::new();
//!     traceback::trace(table, &mut out).unwrap();
//!     print!("{}", String::from_utf8_lossy(&out));
//! }
//! ```

mod arch;
mod error;
mod format;
mod memory;
mod probe;
mod symbols;
mod walker;

pub use error::{Result, TraceError};
pub use format::{MAX_ARRAY_LEN, MAX_STRING_LEN, format_args};
pub use memory::{LiveMemory, Memory, slot_addr};
pub use probe::Prober;
pub use symbols::{ARGS_MAX, ArgSpec, ArgType, DEFAULT_SIZE_HINT, FUNCS_MAX, FuncSpec, SymbolTable};
pub use walker::TraceConfig;

use std::io::Write;

use walker::Walker;

/// Print the caller's stack traceback to `out`.
///
/// Never inlined: the frame pointer captured here must belong to this fixed
/// entry point, so the first emitted frame is the caller's. The call site
/// itself must sit in a frame built with the saved-frame-pointer convention.
#[inline(never)]
pub fn trace<W: Write>(table: &SymbolTable, out: &mut W) -> Result<()> {
    trace_from(arch::current_frame_pointer(), table, out)
}

/// [`trace`] with explicit traversal knobs.
#[inline(never)]
pub fn trace_with_config<W: Write>(
    table: &SymbolTable,
    config: &TraceConfig,
    out: &mut W,
) -> Result<()> {
    trace_from_with_config(arch::current_frame_pointer(), table, config, out)
}

/// Walk the chain rooted at an explicit frame pointer through the process's
/// own memory.
pub fn trace_from<W: Write>(fp: usize, table: &SymbolTable, out: &mut W) -> Result<()> {
    trace_from_with_config(fp, table, &TraceConfig::default(), out)
}

/// [`trace_from`] with explicit traversal knobs.
pub fn trace_from_with_config<W: Write>(
    fp: usize,
    table: &SymbolTable,
    config: &TraceConfig,
    out: &mut W,
) -> Result<()> {
    // the probe scope must exist before the first frame read; dropping it at
    // any return below closes the sink
    let prober = Prober::new().inspect_err(|e| log::error!("traceback setup failed: {e}"))?;
    let mem = LiveMemory::new(&prober);
    Walker::new(table, &mem, config).walk(fp, out)
}

/// Walk a chain over an arbitrary [`Memory`] implementation.
///
/// Live tracing is this walk over [`LiveMemory`]; other backings, such as a
/// captured stack image, plug in the same way.
pub fn trace_memory<W: Write>(
    fp: usize,
    table: &SymbolTable,
    config: &TraceConfig,
    mem: &dyn Memory,
    out: &mut W,
) -> Result<()> {
    Walker::new(table, mem, config).walk(fp, out)
}
