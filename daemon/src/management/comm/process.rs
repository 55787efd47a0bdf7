use crate::management::config::ProcessStartInfo;
use log::{debug, warn};
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::select;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub type ExitCode = Option<i32>;

/// Exit of a child as published by its waiter task.
#[derive(Clone)]
pub struct ExitWatch {
    rx: watch::Receiver<Option<ExitCode>>,
}

impl ExitWatch {
    /// Resolves once the process is gone; `None` when it died from a signal.
    pub async fn wait(&mut self) -> ExitCode {
        match self.rx.wait_for(Option::is_some).await {
            Ok(exit) => (*exit).flatten(),
            // waiter is gone, and with it the child
            Err(_) => None,
        }
    }
}

/// Receives what one server process prints.
#[async_trait::async_trait]
pub trait OutputSink: Send + Sync {
    async fn on_line(&self, run_id: u64, line: String);

    /// Both streams hit end of file and the process has exited.
    async fn on_closed(&self, run_id: u64, exit_code: ExitCode);
}

pub struct ProcessOutput {
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

// 实例进程
pub struct InstanceProcess {
    pub pid: u32,
    pub stdin: ChildStdin,
    pub exit: ExitWatch,
}

fn missing_pipe(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, format!("child {} was not piped", name))
}

impl InstanceProcess {
    /// Spawns the server with piped stdio. The child itself is handed to a waiter
    /// task which reaps it and publishes the exit.
    pub fn spawn(start_info: &ProcessStartInfo) -> io::Result<(Self, ProcessOutput)> {
        let mut cmd = Command::new(&start_info.target);
        cmd.args(&start_info.args)
            .current_dir(&start_info.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("process exited before it could be tracked"))?;
        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(err) => {
                    warn!("could not wait for server process (pid={}): {}", pid, err);
                    None
                }
            };
            debug!("server process (pid={}) exited with {:?}", pid, code);
            let _ = exit_tx.send(Some(code));
        });

        Ok((
            Self {
                pid,
                stdin,
                exit: ExitWatch { rx: exit_rx },
            },
            ProcessOutput { stdout, stderr },
        ))
    }
}

fn decode_line(raw: Vec<u8>) -> String {
    let mut line = String::from_utf8_lossy(&raw).into_owned();
    if line.ends_with('\r') {
        line.pop();
    }
    line
}

/// Pumps stdout and stderr of one process into a sink until both close, then
/// reports the exit. One relay per process; it is never restarted.
pub struct OutputRelay;

impl OutputRelay {
    pub fn spawn(
        sink: Arc<dyn OutputSink>,
        run_id: u64,
        output: ProcessOutput,
        mut exit: ExitWatch,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut stdout = BufReader::new(output.stdout).split(b'\n');
            let mut stderr = BufReader::new(output.stderr).split(b'\n');
            let (mut stdout_open, mut stderr_open) = (true, true);

            while stdout_open || stderr_open {
                select! {
                    segment = stdout.next_segment(), if stdout_open => match segment {
                        Ok(Some(raw)) => sink.on_line(run_id, decode_line(raw)).await,
                        Ok(None) => stdout_open = false,
                        Err(err) => {
                            warn!("stdout of run {} became unreadable: {}", run_id, err);
                            stdout_open = false;
                        }
                    },
                    segment = stderr.next_segment(), if stderr_open => match segment {
                        Ok(Some(raw)) => {
                            sink.on_line(run_id, format!("[STDERR] {}", decode_line(raw))).await
                        }
                        Ok(None) => stderr_open = false,
                        Err(err) => {
                            warn!("stderr of run {} became unreadable: {}", run_id, err);
                            stderr_open = false;
                        }
                    },
                }
            }

            let code = exit.wait().await;
            sink.on_closed(run_id, code).await;
        })
    }
}
