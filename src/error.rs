// Crate-wide error taxonomy.
//
// Every fallible operation in the crate surfaces one of these variants to
// its immediate caller; there is no silent recovery. Equality and hashing
// of sources never produce errors (mismatches compare as not-equal).

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by virtual sources, the concurrency proxy, and the
/// difference engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A required input was null-like or empty (empty buffer, empty
    /// segment list, zero-length segment, self-referencing composition).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A position or count fell outside `[0, length)`.
    #[error("position {position} out of range for source of length {length}")]
    OutOfRange { position: i64, length: i64 },

    /// A byte read was attempted past the end of the data.
    #[error("end of data reached")]
    EndOfData,

    /// The operation is not valid for the source's current state, e.g.
    /// reading from the empty strategy.
    #[error("invalid source state: {0}")]
    InvalidState(&'static str),

    /// Cooperative cancellation was observed at a loop boundary or while
    /// waiting for a shared-source lock.
    #[error("operation cancelled")]
    Cancelled,

    /// A segment descriptor references a source unknown to the current
    /// calculation. Indicates a construction bug, not a data condition.
    #[error("segment references a source unknown to this calculation")]
    InconsistentSegment,

    /// I/O failure from a file-backed strategy.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> std::io::Error {
        match e {
            Error::Io(io) => io,
            other => std::io::Error::other(other),
        }
    }
}
