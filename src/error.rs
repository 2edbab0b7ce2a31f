//! Error types for process pipes
//!
//! A small taxonomy following Rust idioms with the `thiserror` crate:
//! construction failures are distinguished from OS spawn refusals and from
//! descriptor I/O failures after the child exists.

use thiserror::Error;

/// Result type alias for operations that can fail with a [`PipeError`].
pub type Result<T> = std::result::Result<T, PipeError>;

/// Errors that can occur when spawning or driving a process pipe.
///
/// A child's non-zero exit code or terminating signal is deliberately *not*
/// represented here: the pipe completes on output end-of-stream, and callers
/// that care about exit status inspect it separately via
/// [`ProcessPipe::try_exit_status`](crate::ProcessPipe::try_exit_status) or
/// [`ProcessPipe::wait`](crate::ProcessPipe::wait).
#[derive(Debug, Error)]
pub enum PipeError {
    /// The command string was missing or empty. Nothing was spawned.
    #[error("missing or empty command")]
    InvalidCommand,

    /// The OS refused to create the process (missing executable,
    /// permission denied). No partial process exists.
    #[error("failed to spawn child process: {0}")]
    Spawn(#[source] std::io::Error),

    /// A read or write on one of the child's descriptors failed after
    /// spawn. The pipe is no longer usable.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
