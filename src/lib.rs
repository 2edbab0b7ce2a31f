//! Duplex byte-stream wrapper for external processes
//!
//! Spawns a single child process and exposes it as a duplex stream: bytes
//! written to the pipe are fed to the child's stdin, bytes the child emits
//! on stdout are re-emitted on the pipe's read side, and stderr is a
//! separate, independently consumable channel.
//!
//! # Architecture
//!
//! - **[`ProcessPipe`]**: the duplex adapter, implementing Tokio's
//!   `AsyncWrite` (caller → child stdin) and `AsyncRead` (child stdout →
//!   caller)
//! - **[`SpawnConfig`]**: working directory, environment, and drop policy
//!   for the spawned child
//! - **[`StderrStream`]**: verbatim stderr passthrough
//! - **Error handling**: unified [`PipeError`] taxonomy
//!
//! Backpressure propagates symmetrically with no internal buffering: writes
//! complete only when the child's stdin accepts the bytes, and the child's
//! stdout is only pulled as fast as the caller reads. Shutting down the
//! write side closes the child's stdin and completes only once all output
//! has been drained.
//!
//! # Usage
//!
//! ```ignore
//! use procpipe::{ProcessPipe, SpawnConfig};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! let pipe = ProcessPipe::spawn("sort", ["-u"], SpawnConfig::default())?;
//! let (mut out, mut input) = tokio::io::split(pipe);
//!
//! input.write_all(b"b\na\nb\n").await?;
//! tokio::spawn(async move { input.shutdown().await });
//!
//! let mut sorted = Vec::new();
//! out.read_to_end(&mut sorted).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod pipe;

// Re-export commonly used types
pub use config::SpawnConfig;
pub use error::{PipeError, Result};
pub use pipe::{PipeState, ProcessPipe, StderrStream};
