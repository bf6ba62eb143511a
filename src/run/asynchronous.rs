//! Tokio runner. Behaves like the blocking runner but every pipe operation
//! is a suspension point.

use chrono::Local;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::{
    AsyncProgressCallback, ChunkDecoder, CommandOutput, CommandRequest, exit_code,
    log_completion, select_output, stdout_callback, timeout_error, wrap_sync_callback,
};
use crate::constants::{END_OF_STREAM, PROGRESS_CHUNK_SIZE};
use crate::core::{Result, VcsError};

/// Async counterpart of [`run`](super::run).
///
/// Stdout is drained while stderr is streamed to the callback, so a chatty
/// child cannot stall on a full pipe. When the timeout elapses the child is
/// killed and reaped before [`VcsError::CommandTimeout`] is returned.
///
/// # Examples
///
/// ```rust,no_run
/// use vcsync::run::{async_run, CommandRequest};
///
/// # async fn example() -> vcsync::core::Result<()> {
/// let version = async_run(&CommandRequest::new("git").arg("--version"), None).await?;
/// assert!(version.starts_with("git version"));
/// # Ok(())
/// # }
/// ```
pub async fn async_run(
    request: &CommandRequest,
    callback: Option<&AsyncProgressCallback>,
) -> Result<String> {
    async_run_with_output(request, callback).await?.into_result(request.check_returncode)
}

/// Async counterpart of [`run_with_output`](super::run_with_output).
pub async fn async_run_with_output(
    request: &CommandRequest,
    callback: Option<&AsyncProgressCallback>,
) -> Result<CommandOutput> {
    let started = Instant::now();
    let cmd = request.render();
    tracing::debug!(target: "run", "Executing command: {}", cmd);

    let mut command = Command::new(&request.program);
    command.args(&request.args);
    if let Some(dir) = &request.cwd {
        command.current_dir(dir);
    }
    for (key, value) in &request.env {
        tracing::trace!(target: "run", "Setting env var: {}={}", key, value);
        command.env(key, value);
    }
    command
        .stdin(if request.input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let callback = callback
        .cloned()
        .or_else(|| request.log_in_real_time.then(|| wrap_sync_callback(stdout_callback())));

    let completion = async {
        let write_input = async {
            if let (Some(mut stdin), Some(input)) = (stdin, request.input.as_deref()) {
                // Closing stdin happens when `stdin` drops at the end of this block
                if let Err(e) = stdin.write_all(input).await {
                    tracing::debug!(target: "run", "Failed to write stdin: {}", e);
                }
            }
        };
        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(mut stdout) = stdout {
                stdout.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        };
        let read_stderr = stream_stderr(stderr, callback.as_ref());

        let ((), stdout, stderr) = tokio::join!(write_input, read_stdout, read_stderr);
        let status = child.wait().await?;
        Ok::<_, VcsError>((status, stdout?, stderr?))
    };

    let finished = match request.timeout {
        Some(timeout) => tokio::time::timeout(timeout, completion).await.ok(),
        None => Some(completion.await),
    };

    let Some(finished) = finished else {
        let timeout = request.timeout.unwrap_or_default();
        tracing::warn!(target: "run", "Command timed out after {:?}: {}", timeout, cmd);
        if let Err(e) = child.kill().await {
            tracing::debug!(target: "run", "Failed to kill child: {}", e);
        }
        return Err(timeout_error(cmd, timeout));
    };
    let (status, stdout, stderr) = finished?;

    if let Some(callback) = &callback {
        callback(END_OF_STREAM.to_string(), Local::now()).await;
    }

    let returncode = exit_code(status);
    let output = CommandOutput {
        returncode,
        output: select_output(returncode, &stdout, &stderr),
        cmd,
    };
    log_completion(&output, started);
    Ok(output)
}

/// Read stderr to EOF, awaiting the callback for each fixed-size chunk.
async fn stream_stderr<R: AsyncRead + Unpin>(
    stderr: Option<R>,
    callback: Option<&AsyncProgressCallback>,
) -> std::io::Result<Vec<u8>> {
    let mut all = Vec::new();
    let Some(mut stderr) = stderr else {
        return Ok(all);
    };
    let Some(callback) = callback else {
        stderr.read_to_end(&mut all).await?;
        return Ok(all);
    };

    let mut decoder = ChunkDecoder::default();
    let mut buf = [0u8; PROGRESS_CHUNK_SIZE];
    loop {
        let n = read_chunk(&mut stderr, &mut buf).await?;
        if n == 0 {
            break;
        }
        all.extend_from_slice(&buf[..n]);
        let text = decoder.decode(&buf[..n]);
        if !text.is_empty() {
            callback(text, Local::now()).await;
        }
    }
    let rest = decoder.finish();
    if !rest.is_empty() {
        callback(rest, Local::now()).await;
    }
    Ok(all)
}

async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
