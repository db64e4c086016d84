//! Supervision of one child agent process

use super::protocol::{is_sentinel, RequestFrame, ResponseFrame};
use super::{Framing, RouterError};
use crate::config::AgentSpec;
use serde::Serialize;
use std::process::Stdio;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Stdout lines buffered per child before the reader waits
const LINE_BUFFER: usize = 256;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    NotStarted,
    Running,
    Exited,
}

/// Point-in-time view of a supervised agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    pub chain_id: u64,
    pub label: String,
    pub state: ProcessState,
    pub pid: Option<u32>,
    pub restarts: u32,
    pub last_exit: Option<String>,
}

struct Running {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: mpsc::Receiver<String>,
}

#[derive(Default)]
struct Slot {
    running: Option<Running>,
    /// Start failures and crashes since the last good exchange
    failures: u32,
}

pub struct AgentProcess {
    spec: AgentSpec,
    slot: Mutex<Slot>,
    status: StdMutex<ProcessStatus>,
    /// Flipped once by `shutdown`; aborts any exchange holding the slot
    stopping: watch::Sender<bool>,
}

impl AgentProcess {
    pub fn new(spec: AgentSpec) -> Self {
        let status = ProcessStatus {
            chain_id: spec.chain_id,
            label: spec.label.clone(),
            state: ProcessState::NotStarted,
            pid: None,
            restarts: 0,
            last_exit: None,
        };
        Self {
            spec,
            slot: Mutex::new(Slot::default()),
            status: StdMutex::new(status),
            stopping: watch::Sender::new(false),
        }
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    pub fn status(&self) -> ProcessStatus {
        // Refresh only when idle; an exchange in flight owns the child
        if let Ok(mut slot) = self.slot.try_lock() {
            self.reap(&mut slot);
        }
        self.with_status(|s| s.clone())
    }

    /// Send one instruction and collect the answer, starting the child if needed.
    /// Fails with `ShuttingDown` once `shutdown` has been called, even mid-exchange.
    pub async fn execute(
        &self,
        instruction: &str,
        timeout: Duration,
    ) -> Result<String, RouterError> {
        let mut stopping = self.stopping.subscribe();
        tokio::select! {
            biased;
            _ = stopping.wait_for(|stop| *stop) => Err(RouterError::ShuttingDown {
                label: self.spec.label.clone(),
            }),
            result = self.exchange(instruction, timeout) => result,
        }
    }

    async fn exchange(&self, instruction: &str, timeout: Duration) -> Result<String, RouterError> {
        let mut slot = self.slot.lock().await;
        self.ensure_running(&mut slot).await?;

        let deadline = Instant::now() + timeout;
        let result = match slot.running.as_mut() {
            Some(running) => match self.spec.framing {
                Framing::Json => {
                    self.exchange_json(running, instruction, deadline, timeout)
                        .await
                }
                Framing::Sentinel => {
                    self.exchange_sentinel(running, instruction, deadline, timeout)
                        .await
                }
            },
            None => Err(RouterError::Closed {
                label: self.spec.label.clone(),
            }),
        };

        match &result {
            Ok(_) => slot.failures = 0,
            // The child is still healthy after these
            Err(RouterError::AgentError(_)) | Err(RouterError::Timeout { .. }) => {}
            Err(e) => {
                slot.failures += 1;
                warn!(
                    agent = %self.spec.label,
                    error = %e,
                    failures = slot.failures,
                    "Agent exchange failed"
                );
                self.discard(&mut slot);
            }
        }
        result
    }

    /// Close stdin, give the child a moment to exit, then kill it.
    /// An exchange in flight is abandoned rather than awaited.
    pub async fn shutdown(&self) {
        self.stopping.send_replace(true);
        let mut slot = self.slot.lock().await;
        let Some(mut running) = slot.running.take() else {
            return;
        };
        drop(running.stdin.take());

        let exit = match tokio::time::timeout(SHUTDOWN_GRACE, running.child.wait()).await {
            Ok(Ok(status)) => status.to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => {
                if let Err(e) = running.child.kill().await {
                    warn!(agent = %self.spec.label, error = %e, "Failed to kill agent");
                }
                "killed".to_string()
            }
        };
        info!(agent = %self.spec.label, exit = %exit, "Agent shut down");
        self.with_status(|s| {
            s.state = ProcessState::Exited;
            s.pid = None;
            s.last_exit = Some(exit);
        });
    }

    fn with_status<T>(&self, f: impl FnOnce(&mut ProcessStatus) -> T) -> T {
        let mut guard = match self.status.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Drop the child if it has exited, recording how
    fn reap(&self, slot: &mut Slot) {
        let Some(running) = slot.running.as_mut() else {
            return;
        };
        let exit = match running.child.try_wait() {
            Ok(None) => return,
            Ok(Some(status)) => status.to_string(),
            Err(e) => e.to_string(),
        };
        info!(agent = %self.spec.label, exit = %exit, "Agent exited");
        slot.running = None;
        self.with_status(|s| {
            s.state = ProcessState::Exited;
            s.pid = None;
            s.last_exit = Some(exit);
        });
    }

    /// Drop a child whose pipes broke, killing it if it is somehow still alive
    fn discard(&self, slot: &mut Slot) {
        let Some(mut running) = slot.running.take() else {
            return;
        };
        let exit = match running.child.try_wait() {
            Ok(Some(status)) => status.to_string(),
            _ => {
                if let Err(e) = running.child.start_kill() {
                    debug!(agent = %self.spec.label, error = %e, "Kill failed");
                }
                "killed after its pipes closed".to_string()
            }
        };
        info!(agent = %self.spec.label, exit = %exit, "Agent exited");
        self.with_status(|s| {
            s.state = ProcessState::Exited;
            s.pid = None;
            s.last_exit = Some(exit);
        });
    }

    async fn ensure_running(&self, slot: &mut Slot) -> Result<(), RouterError> {
        self.reap(slot);
        if slot.running.is_some() {
            return Ok(());
        }
        if slot.failures >= self.spec.max_restarts.max(1) {
            return Err(RouterError::RestartLimit {
                label: self.spec.label.clone(),
                failures: slot.failures,
            });
        }

        let restarting = self.with_status(|s| s.state != ProcessState::NotStarted);
        match self.start().await {
            Ok(running) => {
                let pid = running.child.id();
                slot.running = Some(running);
                self.with_status(|s| {
                    s.state = ProcessState::Running;
                    s.pid = pid;
                    if restarting {
                        s.restarts += 1;
                    }
                });
                Ok(())
            }
            Err(e) => {
                slot.failures += 1;
                warn!(
                    agent = %self.spec.label,
                    error = %e,
                    failures = slot.failures,
                    "Agent failed to start"
                );
                self.with_status(|s| {
                    s.state = ProcessState::Exited;
                    s.pid = None;
                    s.last_exit = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    async fn start(&self) -> Result<Running, RouterError> {
        let spec = &self.spec;
        info!(agent = %spec.label, command = %spec.command, "Starting agent");

        let mut command = Command::new(&spec.command);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| RouterError::Spawn {
            command: spec.command.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.not_ready("stdout unavailable"))?;
        if let Some(stderr) = child.stderr.take() {
            let label = spec.label.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(agent = %label, "{}", line);
                }
            });
        }

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        let mut running = Running {
            child,
            stdin,
            lines: rx,
        };
        match spec.framing {
            Framing::Json => self.await_ready(&mut running).await?,
            Framing::Sentinel => {
                tokio::time::sleep(Duration::from_secs(spec.startup_grace_secs)).await;
            }
        }
        info!(agent = %spec.label, pid = ?running.child.id(), "Agent started");
        Ok(running)
    }

    async fn await_ready(&self, running: &mut Running) -> Result<(), RouterError> {
        let deadline = Instant::now() + Duration::from_secs(self.spec.startup_timeout_secs);
        loop {
            match timeout_at(deadline, running.lines.recv()).await {
                Err(_) => return Err(self.not_ready("timed out waiting for ready frame")),
                Ok(None) => return Err(self.not_ready("exited before becoming ready")),
                Ok(Some(line)) => match ResponseFrame::parse(&line) {
                    Some(ResponseFrame::Ready) => return Ok(()),
                    _ => debug!(agent = %self.spec.label, line = %line, "Startup output"),
                },
            }
        }
    }

    fn not_ready(&self, reason: &str) -> RouterError {
        RouterError::NotReady {
            label: self.spec.label.clone(),
            reason: reason.to_string(),
        }
    }

    async fn send_line(&self, running: &mut Running, line: &str) -> Result<(), RouterError> {
        let closed = || RouterError::Closed {
            label: self.spec.label.clone(),
        };
        let stdin = running.stdin.as_mut().ok_or_else(closed)?;
        let write = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        };
        write.await.map_err(|e| {
            debug!(agent = %self.spec.label, error = %e, "Write to agent failed");
            closed()
        })
    }

    async fn exchange_json(
        &self,
        running: &mut Running,
        instruction: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<String, RouterError> {
        let id = Uuid::new_v4().to_string();
        let request = RequestFrame {
            id: id.clone(),
            instruction: instruction.to_string(),
        };
        self.send_line(running, &request.encode()?).await?;
        debug!(agent = %self.spec.label, id = %id, "Sent instruction");

        let mut texts = Vec::new();
        loop {
            let line = self.next_line(running, deadline, timeout).await?;
            let Some(frame) = ResponseFrame::parse(&line) else {
                debug!(agent = %self.spec.label, line = %line, "Ignoring non-frame output");
                continue;
            };
            if frame.id() != Some(id.as_str()) {
                debug!(agent = %self.spec.label, frame = ?frame, "Discarding stale frame");
                continue;
            }
            match frame {
                ResponseFrame::Message { text, .. } => texts.push(text),
                ResponseFrame::Done { .. } => return Ok(texts.join("\n")),
                ResponseFrame::Error { message, .. } => {
                    return Err(RouterError::AgentError(message))
                }
                ResponseFrame::Ready => {}
            }
        }
    }

    async fn exchange_sentinel(
        &self,
        running: &mut Running,
        instruction: &str,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<String, RouterError> {
        while let Ok(stale) = running.lines.try_recv() {
            debug!(agent = %self.spec.label, line = %stale, "Dropping stale output");
        }
        self.send_line(running, instruction).await?;

        let mut lines = Vec::new();
        loop {
            let line = self.next_line(running, deadline, timeout).await?;
            let done = is_sentinel(&line);
            lines.push(line);
            if done {
                return Ok(lines.join("\n"));
            }
        }
    }

    async fn next_line(
        &self,
        running: &mut Running,
        deadline: Instant,
        timeout: Duration,
    ) -> Result<String, RouterError> {
        match timeout_at(deadline, running.lines.recv()).await {
            Err(_) => Err(RouterError::Timeout {
                chain_id: self.spec.chain_id,
                secs: timeout.as_secs(),
            }),
            Ok(None) => Err(RouterError::Closed {
                label: self.spec.label.clone(),
            }),
            Ok(Some(line)) => Ok(line),
        }
    }
}

impl std::fmt::Debug for AgentProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentProcess")
            .field("chain_id", &self.spec.chain_id)
            .field("label", &self.spec.label)
            .field("command", &self.spec.command)
            .finish()
    }
}
