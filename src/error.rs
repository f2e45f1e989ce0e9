//! Error types for traceback operations.

use thiserror::Error;

/// Failures that abort a traceback call or reject a symbol table.
///
/// Everything else (unresolved return addresses, unreadable memory, a broken
/// frame chain) is reported in the output stream and never surfaces here.
#[derive(Error, Debug)]
pub enum TraceError {
    /// The probe sink could not be opened. Nothing was traced.
    #[error("failed to open probe sink: {0}")]
    ProbeSetup(std::io::Error),

    #[error("duplicate function start address {addr:#x} ({name})")]
    DuplicateSymbol { name: String, addr: usize },

    #[error("symbol table holds more than {max} functions")]
    TableOverflow { max: usize },

    #[error("function {name} declares more than {max} arguments")]
    ArgListOverflow { name: String, max: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for traceback operations.
pub type Result<T> = std::result::Result<T, TraceError>;
