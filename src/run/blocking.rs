//! Thread-based runner that blocks the calling thread.

use chrono::Local;
use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;

use super::{
    ChunkDecoder, CommandOutput, CommandRequest, ProgressCallback, exit_code, log_completion,
    select_output, stdout_callback, timeout_error,
};
use crate::constants::{END_OF_STREAM, POLL_INTERVAL, PROGRESS_CHUNK_SIZE};
use crate::core::Result;

/// Run a command to completion and return its normalized output.
///
/// Fails with [`VcsError::CommandFailed`](crate::core::VcsError::CommandFailed)
/// on a nonzero exit when the request checks the return code, with
/// [`VcsError::CommandTimeout`](crate::core::VcsError::CommandTimeout) when
/// the timeout elapses, and with [`VcsError::Io`](crate::core::VcsError::Io)
/// when the program cannot be spawned.
///
/// The callback, if any, is always invoked on the calling thread.
///
/// # Examples
///
/// ```rust,no_run
/// use vcsync::run::{run, CommandRequest};
///
/// let head = run(&CommandRequest::new("git").args(["rev-parse", "HEAD"]), None)?;
/// println!("HEAD is {head}");
/// # Ok::<(), vcsync::core::VcsError>(())
/// ```
pub fn run(request: &CommandRequest, callback: Option<&ProgressCallback>) -> Result<String> {
    run_with_output(request, callback)?.into_result(request.check_returncode)
}

/// Run a command and return exit code and output without applying
/// `check_returncode`. Timeouts and spawn failures are still errors.
pub fn run_with_output(
    request: &CommandRequest,
    callback: Option<&ProgressCallback>,
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
        .stderr(Stdio::piped());

    let mut child = command.spawn()?;

    if let (Some(input), Some(mut stdin)) = (request.input.clone(), child.stdin.take()) {
        // Dropping stdin at the end of the thread closes the pipe
        thread::spawn(move || {
            let _ = stdin.write_all(&input);
        });
    }

    let callback =
        callback.cloned().or_else(|| request.log_in_real_time.then(stdout_callback));

    let (tx, rx) = mpsc::channel::<PipeEvent>();
    let mut stdout = None;
    match child.stdout.take() {
        Some(mut pipe) => {
            let tx = tx.clone();
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = tx.send(PipeEvent::StdoutDone(pipe.read_to_end(&mut buf).map(|_| buf)));
            });
        }
        None => stdout = Some(Vec::new()),
    }
    let mut stderr = None;
    match child.stderr.take() {
        Some(pipe) => {
            let forward = callback.is_some();
            let tx = tx.clone();
            thread::spawn(move || {
                let result = pump_stderr(pipe, forward.then_some(&tx));
                let _ = tx.send(PipeEvent::StderrDone(result));
            });
        }
        None => stderr = Some(Vec::new()),
    }
    drop(tx);

    let deadline = request.timeout.map(|timeout| started + timeout);
    let mut decoder = ChunkDecoder::default();
    let mut status = None;

    // Pipes inherited by grandchildren can outlive the child, so the
    // deadline covers both readers as well as the exit
    let (status, stdout, stderr) = loop {
        if status.is_none() {
            status = child.try_wait()?;
        }
        if let (Some(code), Some(out), Some(err)) = (status, stdout.as_mut(), stderr.as_mut()) {
            break (code, std::mem::take(out), std::mem::take(err));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            kill_and_reap(&mut child);
            let timeout = request.timeout.unwrap_or_default();
            tracing::warn!(target: "run", "Command timed out after {:?}: {}", timeout, cmd);
            return Err(timeout_error(cmd, timeout));
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(PipeEvent::Chunk(chunk)) => emit(callback.as_ref(), &mut decoder, &chunk),
            Ok(PipeEvent::StdoutDone(bytes)) => stdout = Some(bytes?),
            Ok(PipeEvent::StderrDone(bytes)) => stderr = Some(bytes?),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if stdout.is_none() || stderr.is_none() {
                    kill_and_reap(&mut child);
                    return Err(io::Error::other("pipe reader thread panicked").into());
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };

    if let Some(callback) = &callback {
        let rest = decoder.finish();
        if !rest.is_empty() {
            callback(&rest, Local::now());
        }
        callback(END_OF_STREAM, Local::now());
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

/// What the pipe reader threads report back to the polling loop.
enum PipeEvent {
    Chunk(Vec<u8>),
    StdoutDone(io::Result<Vec<u8>>),
    StderrDone(io::Result<Vec<u8>>),
}

/// Read stderr to EOF, forwarding fixed-size chunks when a sender is given.
fn pump_stderr(mut stderr: impl Read, sender: Option<&Sender<PipeEvent>>) -> io::Result<Vec<u8>> {
    let mut all = Vec::new();
    let Some(sender) = sender else {
        stderr.read_to_end(&mut all)?;
        return Ok(all);
    };

    let mut buf = [0u8; PROGRESS_CHUNK_SIZE];
    loop {
        let n = read_chunk(&mut stderr, &mut buf)?;
        if n == 0 {
            break;
        }
        all.extend_from_slice(&buf[..n]);
        // Receiver is gone only after a timeout; keep draining the pipe
        let _ = sender.send(PipeEvent::Chunk(buf[..n].to_vec()));
    }
    Ok(all)
}

/// Fill `buf` completely unless EOF comes first.
fn read_chunk(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn emit(callback: Option<&ProgressCallback>, decoder: &mut ChunkDecoder, chunk: &[u8]) {
    if let Some(callback) = callback {
        let text = decoder.decode(chunk);
        if !text.is_empty() {
            callback(&text, Local::now());
        }
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!(target: "run", "Failed to kill child {}: {}", child.id(), e);
    }
    let _ = child.wait();
}
