//! Child processes with a wall-clock limit.

use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// What a finished (or killed) child produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, if the child exited normally.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub const fn success(&self) -> bool {
        !self.timed_out && matches!(self.code, Some(0))
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn collect<R: Read + Send + 'static>(
    stream: Option<R>,
    kind: Stream,
    sender: &Sender<(Stream, Vec<u8>)>,
) {
    if let Some(mut stream) = stream {
        let sender = sender.clone();
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = stream.read_to_end(&mut buffer);
            let _ = sender.send((kind, buffer));
        });
    }
}

/// Runs `command`, feeding it `stdin`, and kills it after `timeout`.
///
/// The limit covers reading the output too: a child that exits but leaves
/// a background process holding its pipes is reported as timed out once
/// the deadline passes. Only a failure to spawn or wait is an error; a
/// non-zero exit or a timeout is reported in the output.
pub fn run_with_timeout(
    command: &mut Command,
    stdin: &[u8],
    timeout: Duration,
) -> io::Result<ProcessOutput> {
    let deadline = Instant::now() + timeout;
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Never joined: a reader that inherited the pipe may keep it blocked.
    if let Some(mut pipe) = child.stdin.take() {
        let data = stdin.to_vec();
        thread::spawn(move || {
            let _ = pipe.write_all(&data);
        });
    }
    let (sender, receiver) = mpsc::channel();
    collect(child.stdout.take(), Stream::Stdout, &sender);
    collect(child.stderr.take(), Stream::Stderr, &sender);
    drop(sender);

    let (code, timed_out) = wait(&mut child, deadline)?;
    let mut output = ProcessOutput {
        code,
        stdout: String::new(),
        stderr: String::new(),
        timed_out,
    };
    if timed_out {
        return Ok(output);
    }

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok((stream, bytes)) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                match stream {
                    Stream::Stdout => output.stdout = text,
                    Stream::Stderr => output.stderr = text,
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                tracing::debug!(?timeout, "output pipes still open at the deadline");
                output.timed_out = true;
                break;
            }
        }
    }
    Ok(output)
}

fn wait(child: &mut Child, deadline: Instant) -> io::Result<(Option<i32>, bool)> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status.code(), false));
        }
        if Instant::now() >= deadline {
            tracing::debug!(pid = child.id(), "killing child after timeout");
            let _ = child.kill();
            let status = child.wait()?;
            return Ok((status.code(), true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
