use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use mcp_protocol::ToolCallRequest;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace, warn};

#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::error::HarnessError;

/// Default bound on a single case, request write included
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long the output readers may keep going after the child is gone.
/// A grandchild that inherited the pipes can keep them open forever.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// Everything a child wrote during one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// false when the child had to be killed at the deadline
    pub exited_within_timeout: bool,
    /// None when killed, or terminated by a signal
    pub exit_code: Option<i32>,
    pub pid: Option<u32>,
    pub elapsed: Duration,
}

impl CapturedOutput {
    /// Output of a child that exited cleanly after writing `stdout`
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exited_within_timeout: true,
            exit_code: Some(0),
            ..Default::default()
        }
    }
}

/// Launches the server once per request: write one line, close stdin,
/// collect everything until exit or deadline.
#[derive(Debug, Clone)]
pub struct ProcessDriver {
    timeout: Duration,
    env: HashMap<String, String>,
}

impl ProcessDriver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            env: HashMap::new(),
        }
    }

    /// Extra environment variables for the child, on top of ours
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run(&self, executable: &Path, request: &ToolCallRequest) -> Result<CapturedOutput, HarnessError> {
        // Serialize first so a bad request never spawns anything
        let line = request.to_line()?;

        let mut command = Command::new(executable);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .envs(&self.env)
            .kill_on_drop(true);
        // Own process group, so a timeout can take down anything the server forked
        #[cfg(unix)]
        command.process_group(0);

        debug!("Spawning {:?} for {} (id {})", executable, request.operation(), request.id);
        let started = Instant::now();
        let deadline = started + self.timeout;

        let mut child = command.spawn().map_err(|source| HarnessError::Launch {
            path: executable.to_path_buf(),
            source,
        })?;
        let pid = child.id();
        info!("Started {:?} with PID {:?}", executable, pid);

        let stdin = child.stdin.take().ok_or(HarnessError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(HarnessError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(HarnessError::MissingPipe("stderr"))?;

        // Readers start before the write so a chatty child can never fill a pipe and stall
        let stdout_buf = SharedBuffer::default();
        let stderr_buf = SharedBuffer::default();
        let mut stdout_task = tokio::spawn(drain(stdout, stdout_buf.clone()));
        let mut stderr_task = tokio::spawn(drain(stderr, stderr_buf.clone()));

        match timeout_at(deadline, send_request(stdin, &line)).await {
            Ok(Ok(())) => trace!("Request written and stdin closed: {}", line.trim_end()),
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                warn!("{:?} closed stdin before reading the request", executable)
            }
            Ok(Err(e)) => warn!("Failed to write request to {:?}: {}", executable, e),
            Err(_) => warn!("Timed out writing request to {:?}", executable),
        }

        let (exited_within_timeout, exit_code) = match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => {
                debug!("{:?} exited with {}", executable, status);
                (true, status.code())
            }
            Ok(Err(e)) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(HarnessError::Wait(e));
            }
            Err(_) => {
                warn!(
                    "{:?} still running after {:?}, killing PID {:?}",
                    executable, self.timeout, pid
                );
                #[cfg(unix)]
                kill_process_group(pid);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill PID {:?}: {}", pid, e);
                }
                (false, None)
            }
        };

        let grace = Instant::now() + DRAIN_GRACE;
        finish_drain("stdout", &mut stdout_task, grace).await;
        finish_drain("stderr", &mut stderr_task, grace).await;

        let captured = CapturedOutput {
            stdout: take_text(&stdout_buf).await,
            stderr: take_text(&stderr_buf).await,
            exited_within_timeout,
            exit_code,
            pid,
            elapsed: started.elapsed(),
        };
        debug!(
            "Captured {} stdout bytes, {} stderr bytes in {:?}",
            captured.stdout.len(),
            captured.stderr.len(),
            captured.elapsed
        );
        Ok(captured)
    }
}

impl Default for ProcessDriver {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// SIGKILL every process in the child's group. The child leads the group.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        warn!("Failed to kill process group {}: {}", pid, e);
    }
}

/// Write the request line, then close our end of stdin to signal end of request
async fn send_request(mut stdin: ChildStdin, line: &str) -> std::io::Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.flush().await?;
    stdin.shutdown().await?;
    Ok(())
}

async fn drain<R>(mut reader: R, sink: SharedBuffer) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        sink.lock().await.extend_from_slice(&chunk[..n]);
    }
}

async fn finish_drain(stream: &str, task: &mut JoinHandle<std::io::Result<()>>, grace: Instant) {
    match timeout_at(grace, &mut *task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!("Error reading child {}: {}", stream, e),
        Ok(Err(e)) => warn!("Child {} reader task failed: {}", stream, e),
        Err(_) => {
            warn!("Child {} still open after exit, keeping what was read", stream);
            task.abort();
        }
    }
}

async fn take_text(buffer: &SharedBuffer) -> String {
    let bytes = std::mem::take(&mut *buffer.lock().await);
    String::from_utf8_lossy(&bytes).into_owned()
}
