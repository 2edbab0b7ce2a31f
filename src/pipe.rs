//! The duplex process pipe
//!
//! [`ProcessPipe`] spawns one child process and implements [`AsyncWrite`]
//! over its stdin and [`AsyncRead`] over its stdout. Backpressure is never
//! buffered away: a write completes only when the child's stdin pipe accepts
//! the bytes, and the child's stdout is pulled only when the caller reads,
//! so pressure propagates symmetrically in both directions.
//!
//! Shutdown of the write side closes the child's stdin and then holds the
//! caller until the read side has drained stdout to end-of-stream, mirroring
//! the flush-then-drain lifecycle of a transform stream.

use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::task::{Context, Poll, Waker, ready};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, trace};

use crate::config::SpawnConfig;
use crate::error::{PipeError, Result};

/// Lifecycle state of a [`ProcessPipe`].
///
/// `Running → Flushing → Ended` is the graceful path; any descriptor or
/// process failure moves to `Errored` from either non-terminal state. Both
/// `Ended` and `Errored` are terminal: a pipe is single-use and cannot be
/// restarted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipeState {
    /// Child spawned; both directions open.
    Running,
    /// Caller signalled end-of-input; stdin is closed, output still draining.
    Flushing,
    /// Output reached end-of-stream after input was flushed.
    Ended,
    /// A fatal I/O error occurred on the process or one of its descriptors.
    Errored,
}

/// A duplex byte stream over a spawned child process.
///
/// Bytes written to the pipe go to the child's stdin; bytes the child emits
/// on stdout come back out of the pipe's read side. Stderr is a separate
/// channel obtained once via [`ProcessPipe::take_stderr`]. The pipe is
/// byte-transparent: no framing, no interpretation.
///
/// Child exit status is *not* part of the stream contract. A child that
/// exits non-zero still yields a clean end-of-stream once its stdout closes;
/// use [`ProcessPipe::wait`] or [`ProcessPipe::try_exit_status`] to observe
/// the status separately.
///
/// # Example
///
/// ```ignore
/// use procpipe::{ProcessPipe, SpawnConfig};
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// let mut pipe = ProcessPipe::spawn("cat", ["-"], SpawnConfig::default())?;
/// let (mut out, mut input) = tokio::io::split(pipe);
///
/// tokio::spawn(async move {
///     input.write_all(b"hello").await?;
///     input.shutdown().await
/// });
///
/// let mut echoed = Vec::new();
/// out.read_to_end(&mut echoed).await?;
/// assert_eq!(echoed, b"hello");
/// ```
#[derive(Debug)]
pub struct ProcessPipe {
    command: String,
    args: Vec<String>,
    config: SpawnConfig,

    child: Child,
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
    stderr: Option<ChildStderr>,

    state: PipeState,
    output_ended: bool,
    // Shutdown caller parked until the read side observes stdout EOF.
    flush_waker: Option<Waker>,
}

impl ProcessPipe {
    /// Spawn `command` with `args` and wrap it in a duplex pipe.
    ///
    /// The child is started immediately with all three standard descriptors
    /// piped. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`PipeError::InvalidCommand`] if `command` is empty; nothing is
    ///   spawned.
    /// - [`PipeError::Spawn`] if the OS refuses to create the process
    ///   (missing executable, permission denied).
    pub fn spawn<C, I, S>(command: C, args: I, config: SpawnConfig) -> Result<Self>
    where
        C: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(PipeError::InvalidCommand);
        }
        let args: Vec<String> = args.into_iter().map(Into::into).collect();

        let mut cmd = Command::new(&command);
        cmd.args(&args);

        if config.clears_env() {
            // Only explicitly configured variables reach the child.
            cmd.env_clear();
        }
        for (key, value) in config.env() {
            cmd.env(key, value);
        }
        if let Some(dir) = config.current_dir() {
            cmd.current_dir(dir);
        }
        cmd.kill_on_drop(config.kills_on_drop());

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(PipeError::Spawn)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PipeError::Spawn(io::Error::other("child stdin not captured")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipeError::Spawn(io::Error::other("child stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PipeError::Spawn(io::Error::other("child stderr not captured")))?;

        debug!(
            command = %command,
            args = ?args,
            pid = ?child.id(),
            "spawned child process"
        );

        Ok(Self {
            command,
            args,
            config,
            child,
            stdin: Some(stdin),
            stdout,
            stderr: Some(stderr),
            state: PipeState::Running,
            output_ended: false,
            flush_waker: None,
        })
    }

    /// The command this pipe runs.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The arguments passed to the command.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The spawn configuration used at construction.
    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipeState {
        self.state
    }

    /// OS process id of the child, while it is still running.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Take the child's stderr channel.
    ///
    /// Yields the channel on the first call and `None` afterwards. Stderr
    /// bytes are passed through verbatim and never interpreted by the pipe;
    /// a child writing to stderr is not an error condition.
    pub fn take_stderr(&mut self) -> Option<StderrStream> {
        self.stderr.take().map(|inner| StderrStream { inner })
    }

    /// Non-blocking check of the child's exit status.
    ///
    /// Returns `Ok(None)` while the child is still running. A non-zero exit
    /// or signal termination is diagnostic information, not a stream error.
    pub fn try_exit_status(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Wait for the child to exit and return its status.
    ///
    /// Callers normally invoke this after the stream has ended; awaiting it
    /// while the write side is still open can stall on a child that is
    /// blocked reading its stdin.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait().await?;
        log_exit(&status);
        Ok(status)
    }

    fn fail(&mut self, err: &io::Error) {
        debug!(error = %err, "process pipe error");
        self.state = PipeState::Errored;
        if let Some(waker) = self.flush_waker.take() {
            waker.wake();
        }
    }

    fn on_output_ended(&mut self) {
        debug!("child stdout ended");
        self.output_ended = true;
        if self.state == PipeState::Flushing {
            self.state = PipeState::Ended;
        }
        if let Ok(Some(status)) = self.child.try_wait() {
            log_exit(&status);
        }
        if let Some(waker) = self.flush_waker.take() {
            waker.wake();
        }
    }
}

fn log_exit(status: &ExitStatus) {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        debug!(code = ?status.code(), signal = ?status.signal(), "child exited");
    }
    #[cfg(not(unix))]
    debug!(code = ?status.code(), "child exited");
}

fn terminal_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "process pipe failed")
}

impl AsyncWrite for ProcessPipe {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.state == PipeState::Errored {
            return Poll::Ready(Err(terminal_error()));
        }
        let Some(stdin) = this.stdin.as_mut() else {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "input side already closed",
            )));
        };

        match Pin::new(stdin).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                trace!(bytes = n, "forwarded chunk to child stdin");
                Poll::Ready(Ok(n))
            }
            Poll::Ready(Err(err)) => {
                this.fail(&err);
                Poll::Ready(Err(err))
            }
            Poll::Pending => {
                // The child's input pipe is full; intake stays suspended
                // until the kernel signals drain and wakes us.
                trace!("child stdin full; intake suspended");
                Poll::Pending
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.state == PipeState::Errored {
            return Poll::Ready(Err(terminal_error()));
        }
        match this.stdin.as_mut() {
            Some(stdin) => match ready!(Pin::new(stdin).poll_flush(cx)) {
                Ok(()) => Poll::Ready(Ok(())),
                Err(err) => {
                    this.fail(&err);
                    Poll::Ready(Err(err))
                }
            },
            // Nothing left to flush once stdin is closed.
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            match this.state {
                PipeState::Running => {
                    if let Some(stdin) = this.stdin.as_mut() {
                        match Pin::new(stdin).poll_shutdown(cx) {
                            Poll::Ready(Ok(())) => {}
                            Poll::Ready(Err(err)) => {
                                this.fail(&err);
                                return Poll::Ready(Err(err));
                            }
                            Poll::Pending => return Poll::Pending,
                        }
                    }
                    // Dropping the handle closes the descriptor, signalling
                    // EOF to the child.
                    this.stdin = None;
                    debug!("child stdin closed");
                    this.state = PipeState::Flushing;
                }
                PipeState::Flushing => {
                    if this.output_ended {
                        this.state = PipeState::Ended;
                        continue;
                    }
                    // Completion is deferred until the read side has drained
                    // stdout to end-of-stream.
                    this.flush_waker = Some(cx.waker().clone());
                    return Poll::Pending;
                }
                PipeState::Ended => return Poll::Ready(Ok(())),
                PipeState::Errored => return Poll::Ready(Err(terminal_error())),
            }
        }
    }
}

impl AsyncRead for ProcessPipe {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.output_ended {
            // End-of-stream is sticky.
            return Poll::Ready(Ok(()));
        }
        if this.state == PipeState::Errored {
            return Poll::Ready(Err(terminal_error()));
        }

        let before = buf.filled().len();
        match ready!(Pin::new(&mut this.stdout).poll_read(cx, buf)) {
            Ok(()) => {
                let n = buf.filled().len() - before;
                if n == 0 {
                    this.on_output_ended();
                } else {
                    trace!(bytes = n, "pushed chunk from child stdout");
                }
                Poll::Ready(Ok(()))
            }
            Err(err) => {
                this.fail(&err);
                Poll::Ready(Err(err))
            }
        }
    }
}

/// The child's stderr as an independent readable byte stream.
///
/// Obtained once from [`ProcessPipe::take_stderr`]. Consuming (or ignoring)
/// it has no effect on the main output stream beyond the usual OS pipe
/// capacity: a child that writes large amounts to stderr will block if
/// nobody drains this channel.
#[derive(Debug)]
pub struct StderrStream {
    inner: ChildStderr,
}

impl AsyncRead for StderrStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}
