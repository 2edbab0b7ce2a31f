//! Integration tests for the duplex process pipe against real executables.
//!
//! These tests shell out to `cat` and `sh`, which are assumed present on
//! the test machine (Unix).

use std::io::Write as _;
use std::time::Duration;

use procpipe::{PipeError, PipeState, ProcessPipe, SpawnConfig};
use rstest::rstest;
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_test::{assert_pending, assert_ready_ok, task};

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[rstest]
#[case("")]
#[case("   ")]
fn empty_command_is_rejected(#[case] command: &str) {
    let err = ProcessPipe::spawn(command, Vec::<String>::new(), SpawnConfig::default())
        .unwrap_err();
    assert!(matches!(err, PipeError::InvalidCommand));
}

#[tokio::test]
async fn nonexistent_command_fails_to_spawn() {
    let err = ProcessPipe::spawn(
        "definitely-not-a-real-binary-2719",
        Vec::<String>::new(),
        SpawnConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PipeError::Spawn(_)));
}

#[tokio::test]
async fn spawn_yields_running_duplex() {
    let mut pipe = ProcessPipe::spawn("cat", ["-"], SpawnConfig::default()).unwrap();
    assert_eq!(pipe.command(), "cat");
    assert_eq!(pipe.args(), ["-"]);
    assert_eq!(pipe.state(), PipeState::Running);
    assert!(pipe.pid().is_some());
    assert!(pipe.try_exit_status().unwrap().is_none());

    pipe.write_all(b"ping").await.unwrap();
    pipe.flush().await.unwrap();

    let mut echoed = [0u8; 4];
    pipe.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"ping");
}

#[tokio::test]
async fn identity_passthrough_preserves_bytes() {
    let payload = patterned(64 * 1024);
    let pipe = ProcessPipe::spawn("cat", ["-"], SpawnConfig::default()).unwrap();
    let (mut output, mut input) = tokio::io::split(pipe);

    let to_send = payload.clone();
    let writer = tokio::spawn(async move {
        input.write_all(&to_send).await?;
        input.shutdown().await
    });

    let mut echoed = Vec::new();
    output.read_to_end(&mut echoed).await.unwrap();
    writer.await.unwrap().unwrap();

    assert_eq!(echoed, payload);
}

/// Writing faster than the child drains suspends intake; nothing is lost.
#[tokio::test]
async fn intake_throttles_until_child_drains() {
    let payload = patterned(2 * 1024 * 1024);
    let pipe = ProcessPipe::spawn("cat", ["-"], SpawnConfig::default()).unwrap();
    let (mut output, mut input) = tokio::io::split(pipe);

    let to_send = payload.clone();
    let mut writer = tokio::spawn(async move {
        input.write_all(&to_send).await?;
        input.shutdown().await
    });

    // With nobody reading, the child's pipes fill and the write stalls.
    let throttled = tokio::time::timeout(Duration::from_millis(250), &mut writer).await;
    assert!(
        throttled.is_err(),
        "write completed although the child could not drain"
    );

    // Resuming the consumer releases the writer; every byte arrives in order.
    let mut echoed = Vec::new();
    output.read_to_end(&mut echoed).await.unwrap();
    writer.await.unwrap().unwrap();

    assert_eq!(echoed, payload);
}

/// Shutdown of the input side completes only after all output is drained.
#[tokio::test]
async fn end_fires_only_after_output_drained() {
    let pipe = ProcessPipe::spawn("cat", ["-"], SpawnConfig::default()).unwrap();
    let (mut output, mut input) = tokio::io::split(pipe);

    input.write_all(b"buffered").await.unwrap();

    let mut shutdown = task::spawn(async move { input.shutdown().await });
    assert_pending!(shutdown.poll(), "shutdown completed before output was drained");

    let mut echoed = Vec::new();
    output.read_to_end(&mut echoed).await.unwrap();
    assert_eq!(echoed, b"buffered");

    assert!(shutdown.is_woken());
    assert_ready_ok!(shutdown.poll());
}

/// A paused consumer stops the child-stdout pull; resuming continues
/// byte-exact with no gaps or repeats.
#[tokio::test]
async fn paused_consumer_resumes_without_gaps() {
    let payload = patterned(256 * 1024);
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&payload).unwrap();
    file.flush().unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let mut pipe = ProcessPipe::spawn("cat", [path], SpawnConfig::default()).unwrap();

    let mut head = vec![0u8; 10];
    pipe.read_exact(&mut head).await.unwrap();

    // Downstream pause: no reads for a while; the child blocks on its full
    // stdout pipe instead of anything buffering in the adapter.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut rest = Vec::new();
    pipe.read_to_end(&mut rest).await.unwrap();

    let mut all = head;
    all.extend(rest);
    assert_eq!(all, payload);

    pipe.shutdown().await.unwrap();
    assert_eq!(pipe.state(), PipeState::Ended);
}

#[tokio::test]
async fn file_through_cat_accounts_every_byte() {
    let payload = patterned(200_000);
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&payload).unwrap();
    file.flush().unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let mut pipe = ProcessPipe::spawn("cat", [path], SpawnConfig::default()).unwrap();

    let mut total = 0usize;
    let mut buf = vec![0u8; 4096];
    loop {
        let n = pipe.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        total += n;
    }
    assert_eq!(total, payload.len());

    // End-of-stream is sticky; it is reported once and stays reported.
    assert_eq!(pipe.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn stderr_is_a_separate_verbatim_channel() {
    let mut pipe = ProcessPipe::spawn(
        "sh",
        ["-c", "echo out; echo oops >&2"],
        SpawnConfig::default(),
    )
    .unwrap();

    let mut stderr = pipe.take_stderr().expect("first take yields the channel");
    assert!(pipe.take_stderr().is_none());

    let mut err_bytes = Vec::new();
    stderr.read_to_end(&mut err_bytes).await.unwrap();
    assert_eq!(err_bytes, b"oops\n");

    let mut out_bytes = Vec::new();
    pipe.read_to_end(&mut out_bytes).await.unwrap();
    assert_eq!(out_bytes, b"out\n");

    pipe.shutdown().await.unwrap();
}

/// Exit status is diagnostic information, never a stream error.
#[tokio::test]
async fn nonzero_exit_is_not_a_stream_error() {
    let mut pipe = ProcessPipe::spawn("sh", ["-c", "exit 3"], SpawnConfig::default()).unwrap();

    let mut out = Vec::new();
    pipe.read_to_end(&mut out).await.unwrap();
    assert!(out.is_empty());

    pipe.shutdown().await.unwrap();
    assert_eq!(pipe.state(), PipeState::Ended);

    let status = pipe.wait().await.unwrap();
    assert_eq!(status.code(), Some(3));
}

/// A post-spawn descriptor failure is fatal: the pipe moves to `Errored`
/// and neither side is usable afterwards.
#[tokio::test]
async fn stdin_failure_moves_pipe_to_errored() {
    let mut pipe = ProcessPipe::spawn("sh", ["-c", "exit 0"], SpawnConfig::default()).unwrap();
    pipe.wait().await.unwrap();

    // The read end of the child's stdin pipe is gone; writing must fail
    // with a broken pipe once the kernel notices.
    let chunk = vec![0u8; 64 * 1024];
    let mut write_err = None;
    for _ in 0..64 {
        match pipe.write_all(&chunk).await {
            Ok(()) => continue,
            Err(err) => {
                write_err = Some(err);
                break;
            }
        }
    }
    let err = write_err.expect("write to an exited child must fail");
    assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    assert_eq!(pipe.state(), PipeState::Errored);

    // Errored is terminal: the read side is poisoned as well.
    let mut buf = [0u8; 8];
    assert!(pipe.read(&mut buf).await.is_err());
}

#[tokio::test]
async fn write_after_end_of_input_is_rejected() {
    let mut pipe = ProcessPipe::spawn("sh", ["-c", "exit 0"], SpawnConfig::default()).unwrap();

    let mut out = Vec::new();
    pipe.read_to_end(&mut out).await.unwrap();
    pipe.shutdown().await.unwrap();

    let err = pipe.write(b"late").await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
}

#[tokio::test]
async fn spawn_config_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let config = SpawnConfig::new()
        .with_current_dir(dir.path())
        .with_env("PIPE_PROBE", "42")
        .clear_env(true);

    let mut pipe = ProcessPipe::spawn("sh", ["-c", "pwd; echo $PIPE_PROBE"], config).unwrap();

    let mut out = String::new();
    pipe.read_to_string(&mut out).await.unwrap();
    pipe.shutdown().await.unwrap();

    let mut lines = out.lines();
    let cwd = lines.next().unwrap();
    assert_eq!(
        std::fs::canonicalize(cwd).unwrap(),
        std::fs::canonicalize(dir.path()).unwrap()
    );
    assert_eq!(lines.next(), Some("42"));
}
