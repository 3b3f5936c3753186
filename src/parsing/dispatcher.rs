//! The parser dispatcher: owns a worker process, multiplexes requests
//! over its duplex channel, and respawns it on crash.
//!
//! The pending-request map is a single-owner structure guarded by the
//! dispatcher's own actor task rather than a shared lock (§9 design
//! notes: "async pending-map with timeouts... a single-owner map guarded
//! by the event loop"). Callers talk to the actor through an mpsc
//! channel; the actor races each request's deadline against the
//! worker's response stream internally.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::config::DispatcherConfig;
use crate::error::ParseError;
use crate::parsing::worker::{write_frame, CstTree, WorkerRequest, WorkerResponse};
use crate::{debug_event, log_event};

/// Observable state of the worker link (§4.4 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Spawning,
    Ready,
    Degraded,
    Dead,
}

struct PendingRequest {
    respond_to: oneshot::Sender<Result<CstTree, ParseError>>,
    deadline: Instant,
}

enum ActorCommand {
    Dispatch {
        language: String,
        file_path: Option<String>,
        source: String,
        respond_to: oneshot::Sender<Result<CstTree, ParseError>>,
    },
    Shutdown,
}

/// A handle to a running dispatcher actor. Cloning shares the same
/// worker process and pending map.
#[derive(Clone)]
pub struct Dispatcher {
    cmd_tx: mpsc::Sender<ActorCommand>,
    state_rx: watch::Receiver<WorkerState>,
}

impl Dispatcher {
    /// Spawn the dispatcher actor, which in turn spawns its first worker
    /// process by re-invoking `worker_exe` with `worker_args`.
    pub fn spawn(config: DispatcherConfig, worker_exe: std::path::PathBuf, worker_args: Vec<String>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.pending_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(WorkerState::Spawning);

        tokio::spawn(run_actor(config, worker_exe, worker_args, cmd_rx, state_tx));

        Self { cmd_tx, state_rx }
    }

    /// Current worker-link state, for a health probe exposed to the
    /// dispatcher's owner.
    pub fn state(&self) -> WorkerState {
        *self.state_rx.borrow()
    }

    /// Parse one file through the worker, awaiting its response or
    /// failing on timeout/backpressure/worker death.
    pub async fn parse(&self, language: &str, file_path: Option<&str>, source: &str) -> Result<CstTree, ParseError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(ActorCommand::Dispatch {
                language: language.to_string(),
                file_path: file_path.map(|s| s.to_string()),
                source: source.to_string(),
                respond_to: tx,
            })
            .await
            .map_err(|_| ParseError::WorkerGone)?;
        rx.await.map_err(|_| ParseError::WorkerGone)?
    }

    /// Deterministic tear-down (§4.4 Shutdown).
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(ActorCommand::Shutdown).await;
    }
}

fn next_request_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}

use std::io;

fn spawn_worker(exe: &std::path::Path, args: &[String]) -> io::Result<Child> {
    Command::new(exe)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
}

async fn run_actor(
    config: DispatcherConfig,
    worker_exe: std::path::PathBuf,
    worker_args: Vec<String>,
    mut cmd_rx: mpsc::Receiver<ActorCommand>,
    state_tx: watch::Sender<WorkerState>,
) {
    let mut pending: HashMap<String, PendingRequest> = HashMap::new();
    let mut consecutive_timeouts: u32 = 0;
    let mut shutting_down = false;

    let mut link: Option<Child> = None;
    let mut stdin_half: Option<tokio::process::ChildStdin> = None;
    let (resp_tx, mut resp_rx) = mpsc::channel::<WorkerResponse>(64);
    let (exited_tx, mut exited_rx) = mpsc::channel::<()>(1);

    spawn_or_respawn(
        &worker_exe,
        &worker_args,
        &mut link,
        &mut stdin_half,
        resp_tx.clone(),
        exited_tx.clone(),
        &state_tx,
    );

    let mut tick = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    None => break,
                    Some(ActorCommand::Shutdown) => {
                        shutting_down = true;
                        fail_all_pending(&mut pending, ParseError::WorkerGone);
                        if let Some(stdin) = stdin_half.take() {
                            drop(stdin);
                        }
                        let grace = Duration::from_secs(config.shutdown_grace_secs);
                        if let Some(mut child) = link.take() {
                            let _ = tokio::time::timeout(grace, child.wait()).await;
                            let _ = child.start_kill();
                        }
                        let _ = state_tx.send(WorkerState::Dead);
                        break;
                    }
                    Some(ActorCommand::Dispatch { language, file_path, source, respond_to }) => {
                        if pending.len() >= config.pending_capacity {
                            let _ = respond_to.send(Err(ParseError::DispatcherBusy));
                            continue;
                        }
                        let request_id = next_request_id();
                        let request = WorkerRequest { request_id: request_id.clone(), language, file_path, source };
                        let Some(stdin) = stdin_half.as_mut() else {
                            let _ = respond_to.send(Err(ParseError::WorkerGone));
                            continue;
                        };
                        let mut buf = Vec::new();
                        if write_frame(&mut buf, &request).is_err() {
                            let _ = respond_to.send(Err(ParseError::WorkerGone));
                            continue;
                        }
                        if stdin.write_all(&buf).await.is_err() {
                            let _ = respond_to.send(Err(ParseError::WorkerGone));
                            let _ = state_tx.send(WorkerState::Degraded);
                            continue;
                        }
                        let deadline = Instant::now() + Duration::from_secs(config.request_timeout_secs);
                        pending.insert(request_id, PendingRequest { respond_to, deadline });
                    }
                }
            }
            Some(response) = resp_rx.recv() => {
                if let Some(req) = pending.remove(&response.request_id) {
                    consecutive_timeouts = 0;
                    let result = if response.ok {
                        response.root.ok_or(ParseError::ParseFailure {
                            path: Default::default(),
                            reason: "missing root in ok response".to_string(),
                        })
                    } else {
                        Err(ParseError::ParseFailure {
                            path: Default::default(),
                            reason: response.error.unwrap_or_default(),
                        })
                    };
                    let _ = req.respond_to.send(result);
                } else {
                    debug_event!("dispatcher", "unknown response id dropped", "{}", response.request_id);
                }
            }
            Some(()) = exited_rx.recv() => {
                if shutting_down {
                    continue;
                }
                log_event!("dispatcher", "worker exited, failing pending requests", "count={}", pending.len());
                fail_all_pending(&mut pending, ParseError::WorkerGone);
                let _ = state_tx.send(WorkerState::Dead);
                tokio::time::sleep(Duration::from_secs(config.respawn_backoff_secs)).await;
                spawn_or_respawn(&worker_exe, &worker_args, &mut link, &mut stdin_half, resp_tx.clone(), exited_tx.clone(), &state_tx);
            }
            _ = tick.tick() => {
                let now = Instant::now();
                let expired: Vec<String> = pending.iter().filter(|(_, p)| p.deadline <= now).map(|(id, _)| id.clone()).collect();
                if !expired.is_empty() {
                    consecutive_timeouts += expired.len() as u32;
                }
                for id in expired {
                    if let Some(req) = pending.remove(&id) {
                        let _ = req.respond_to.send(Err(ParseError::ParseTimeout { request_id: id }));
                    }
                }
                if consecutive_timeouts >= 2 {
                    consecutive_timeouts = 0;
                    if let Some(mut child) = link.take() {
                        let _ = child.start_kill();
                    }
                }
            }
        }
    }
}

fn fail_all_pending(pending: &mut HashMap<String, PendingRequest>, err: ParseError) {
    for (_, req) in pending.drain() {
        let reason = err.to_string();
        let _ = req.respond_to.send(Err(match &err {
            ParseError::WorkerGone => ParseError::WorkerGone,
            _ => ParseError::ParseFailure {
                path: Default::default(),
                reason,
            },
        }));
    }
}

fn spawn_or_respawn(
    exe: &std::path::Path,
    args: &[String],
    link: &mut Option<Child>,
    stdin_half: &mut Option<tokio::process::ChildStdin>,
    resp_tx: mpsc::Sender<WorkerResponse>,
    exited_tx: mpsc::Sender<()>,
    state_tx: &watch::Sender<WorkerState>,
) {
    let _ = state_tx.send(WorkerState::Spawning);
    match spawn_worker(exe, args) {
        Ok(mut child) => {
            let stdout = child.stdout.take();
            *stdin_half = child.stdin.take();
            *link = Some(child);
            let _ = state_tx.send(WorkerState::Ready);
            if let Some(stdout) = stdout {
                tokio::spawn(read_responses(stdout, resp_tx, exited_tx));
            }
        }
        Err(e) => {
            log_event!("dispatcher", "failed to spawn worker", "{}", e);
            let _ = state_tx.send(WorkerState::Dead);
            let _ = exited_tx.try_send(());
        }
    }
}

async fn read_responses(
    mut stdout: tokio::process::ChildStdout,
    resp_tx: mpsc::Sender<WorkerResponse>,
    exited_tx: mpsc::Sender<()>,
) {
    loop {
        let mut len_buf = [0u8; 4];
        if stdout.read_exact(&mut len_buf).await.is_err() {
            let _ = exited_tx.send(()).await;
            return;
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0u8; len];
        if stdout.read_exact(&mut payload).await.is_err() {
            let _ = exited_tx.send(()).await;
            return;
        }
        match serde_json::from_slice::<WorkerResponse>(&payload) {
            Ok(response) => {
                if resp_tx.send(response).await.is_err() {
                    return;
                }
            }
            Err(_) => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_against_a_dead_exe_fails_with_worker_gone() {
        let config = DispatcherConfig {
            worker_count: 1,
            request_timeout_secs: 1,
            respawn_backoff_secs: 1,
            pending_capacity: 4,
            shutdown_grace_secs: 1,
        };
        let dispatcher = Dispatcher::spawn(config, std::path::PathBuf::from("/nonexistent/binary"), vec![]);
        let result = dispatcher.parse("python", None, "x = 1").await;
        assert!(result.is_err());
    }
}
