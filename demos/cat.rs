//! A ProcessPipe reimplementation of the UNIX cat(1) command.
//!
//! With no arguments, the process's own stdin is piped through `cat -`;
//! file arguments are passed straight to `cat`. Child stderr is relayed to
//! this process's stderr. Run with:
//!
//! ```sh
//! RUST_LOG=procpipe=trace cargo run --example cat --features trace -- Cargo.toml
//! ```

use std::env;

use procpipe::{ProcessPipe, SpawnConfig};
use tokio::io::{self, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let files: Vec<String> = env::args().skip(1).collect();
    let use_stdin = files.is_empty();
    let args = if use_stdin {
        vec!["-".to_string()]
    } else {
        files
    };

    let mut pipe = ProcessPipe::spawn("cat", args, SpawnConfig::default())?;

    let mut stderr = pipe.take_stderr().expect("stderr taken once");
    let stderr_task =
        tokio::spawn(async move { io::copy(&mut stderr, &mut io::stderr()).await });

    let (mut output, mut input) = io::split(pipe);
    let input_task = tokio::spawn(async move {
        if use_stdin {
            io::copy(&mut io::stdin(), &mut input).await?;
        }
        input.shutdown().await
    });

    io::copy(&mut output, &mut io::stdout()).await?;
    input_task.await??;
    stderr_task.await??;

    Ok(())
}
