//! Error types for compilation and execution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised before any instruction runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The source contains no bytes at all.
    #[error("empty source")]
    EmptySource,

    /// The source is larger than the accepted ceiling.
    #[error("source is {len} bytes, limit is {limit}")]
    SourceTooLarge { len: usize, limit: usize },

    /// A `[` or `]` has no partner. `at` is the instruction index.
    #[error("unmatched '{bracket}' at instruction {at}")]
    UnbalancedLoop { at: usize, bracket: char },
}

/// Errors that abort a run. Every variant carries the instruction pointer
/// of the offending instruction and the data pointer at that moment.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("tape address {addr} out of bounds at instruction {ip} (dp {dp})")]
    TapeOutOfBounds { ip: usize, dp: usize, addr: usize },

    /// Only raised under `Eof::Fail`.
    #[error("input exhausted at instruction {ip} (dp {dp})")]
    InputExhausted { ip: usize, dp: usize },

    #[error("i/o failure at instruction {ip} (dp {dp})")]
    Io {
        ip: usize,
        dp: usize,
        #[source]
        source: io::Error,
    },
}

/// Anything the command-line wrapper can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write dump to {}", path.display())]
    Dump {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
