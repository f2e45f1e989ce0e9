//! Address validation via a side-effect probe.

use std::fs::File;
use std::os::fd::AsRawFd;

use nix::libc::{c_void, write};

use crate::error::{Result, TraceError};

/// Answers "is this byte safely readable" for the current process.
///
/// Each query asks the kernel to copy one byte from the candidate address
/// into a disposable sink file. For an unmapped or unreadable source the
/// syscall returns `EFAULT` instead of delivering a fault, so a bad address
/// can never terminate or corrupt the traceback, probing is freely
/// resumable, and the probed program observes no memory writes or
/// control-flow changes. No signal handler is installed, which also leaves
/// the host program's own handlers untouched. The cost is one syscall per
/// probed byte.
///
/// The sink must be a regular file: the null device's write path reports
/// success without ever reading the buffer, so it validates nothing. The
/// file is created already unlinked and vanishes when the prober drops.
///
/// The prober is the validation scope of one traceback call: it must exist
/// before the first unchecked dereference, and dropping it closes the sink
/// on every exit path.
#[derive(Debug)]
pub struct Prober {
    sink: File,
}

impl Prober {
    /// Open the probe sink. Failure aborts the traceback before any frame
    /// is read.
    pub fn new() -> Result<Self> {
        let sink = tempfile::tempfile().map_err(TraceError::ProbeSetup)?;
        Ok(Self { sink })
    }

    /// Whether one byte at `addr` can be read without faulting.
    pub fn is_readable(&self, addr: usize) -> bool {
        // copies out of the probed address only; nothing observable happens
        // to the traced memory
        let n = unsafe { write(self.sink.as_raw_fd(), addr as *const c_void, 1) };
        n >= 0
    }

    /// Count of leading readable bytes in `[addr, addr + max_bytes)`.
    pub fn is_readable_run(&self, addr: usize, max_bytes: usize) -> usize {
        (0..max_bytes)
            .take_while(|i| self.is_readable(addr.wrapping_add(*i)))
            .count()
    }
}
