//! Loop ⇄ worker boundary.
//!
//! ```text
//!   control loop                          worker task
//!   ────────────                          ───────────
//!   WorkerHandle ── mpsc<WorkerCommand> ──▶ WorkerEndpoint
//!   WorkerHandle ◀── watch<WorkerStatus> ── WorkerEndpoint
//!   WorkerHandle ── JoinHandle ───────────── (task exit)
//! ```
//!
//! Status has a single writer (the worker) and commands have a single writer
//! (the loop).  The loop must `join()` a handle before it starts the next
//! worker.

use std::future::Future;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::status::{PlayerMode, WorkerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    SetPause(bool),
    Stop,
}

/// Starts one worker per track.
pub trait WorkerLauncher: Send + Sync {
    fn start(&self, locator: String) -> WorkerHandle;
}

/// Worker side of the boundary.
pub struct WorkerEndpoint {
    status_tx: watch::Sender<WorkerStatus>,
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
}

impl WorkerEndpoint {
    pub fn status(&self) -> WorkerStatus {
        *self.status_tx.borrow()
    }

    pub fn update(&self, f: impl FnOnce(&mut WorkerStatus)) {
        self.status_tx.send_modify(f);
    }

    pub fn set_mode(&self, mode: PlayerMode) {
        self.update(|s| s.mode = mode);
    }

    /// Next command from the loop.  `None` once the loop dropped its handle.
    pub async fn next_command(&mut self) -> Option<WorkerCommand> {
        self.commands.recv().await
    }
}

/// Loop side of the boundary.
pub struct WorkerHandle {
    status: watch::Receiver<WorkerStatus>,
    commands: mpsc::UnboundedSender<WorkerCommand>,
    join: JoinHandle<()>,
    pause_requested: bool,
    stop_requested: bool,
    closed: bool,
    /// Mode as of the last time `changed` resolved.
    seen_mode: PlayerMode,
}

/// Spawn `body` as a worker task and return the loop's handle to it.
pub fn spawn_worker<F, Fut>(body: F) -> WorkerHandle
where
    F: FnOnce(WorkerEndpoint) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (status_tx, status_rx) = watch::channel(WorkerStatus::default());
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let endpoint = WorkerEndpoint {
        status_tx,
        commands: cmd_rx,
    };
    let join = tokio::spawn(body(endpoint));
    WorkerHandle {
        status: status_rx,
        commands: cmd_tx,
        join,
        pause_requested: false,
        stop_requested: false,
        closed: false,
        seen_mode: WorkerStatus::default().mode,
    }
}

impl WorkerHandle {
    pub fn status(&self) -> WorkerStatus {
        *self.status.borrow()
    }

    /// Mode as the loop should treat it.  A worker that went away without
    /// reporting a terminal mode counts as stopped with an error.
    pub fn mode(&self) -> PlayerMode {
        let mode = self.status.borrow().mode;
        if !mode.is_terminal() && (self.closed || self.join.is_finished()) {
            PlayerMode::StoppedWithError
        } else {
            mode
        }
    }

    pub fn is_done(&self) -> bool {
        self.mode().is_terminal()
    }

    pub fn pause_requested(&self) -> bool {
        self.pause_requested
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Flip the pause request and forward it.  Returns the new value.
    pub fn toggle_pause(&mut self) -> bool {
        self.pause_requested = !self.pause_requested;
        self.send(WorkerCommand::SetPause(self.pause_requested));
        self.pause_requested
    }

    pub fn request_stop(&mut self) {
        if !self.stop_requested {
            self.stop_requested = true;
            self.send(WorkerCommand::Stop);
        }
    }

    fn send(&self, cmd: WorkerCommand) {
        // A worker that already exited has nothing left to control.
        let _ = self.commands.send(cmd);
    }

    /// Resolves when the worker's mode changes or the worker goes away.
    /// Position-only updates are skipped.  Once the worker is gone this never
    /// resolves again, so it is safe inside `select!`.
    pub async fn changed(&mut self) {
        if self.closed {
            return std::future::pending().await;
        }
        loop {
            if self.status.changed().await.is_err() {
                self.closed = true;
                return;
            }
            let mode = self.mode();
            if mode != self.seen_mode {
                self.seen_mode = mode;
                return;
            }
        }
    }

    /// Wait for the worker task to end and return its last status.
    pub async fn join(self) -> WorkerStatus {
        let WorkerHandle {
            status,
            commands,
            join,
            ..
        } = self;
        drop(commands);
        if let Err(e) = join.await {
            warn!("playback worker ended abnormally: {}", e);
        }
        let last = *status.borrow();
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_worker_sees_pause_toggles_and_stop() {
        let mut handle = spawn_worker(|mut ep| async move {
            ep.set_mode(PlayerMode::Playing);
            while let Some(cmd) = ep.next_command().await {
                match cmd {
                    WorkerCommand::SetPause(true) => ep.set_mode(PlayerMode::Paused),
                    WorkerCommand::SetPause(false) => ep.set_mode(PlayerMode::Playing),
                    WorkerCommand::Stop => break,
                }
            }
            ep.set_mode(PlayerMode::Finished);
        });

        assert!(handle.toggle_pause());
        assert!(!handle.toggle_pause());
        handle.request_stop();
        assert!(handle.stop_requested());

        let last = handle.join().await;
        assert_eq!(last.mode, PlayerMode::Finished);
    }

    #[tokio::test]
    async fn test_vanished_worker_counts_as_error() {
        let mut handle = spawn_worker(|ep| async move {
            ep.set_mode(PlayerMode::Playing);
        });
        // Wait until the endpoint is dropped.
        loop {
            handle.changed().await;
            if handle.is_done() {
                break;
            }
        }
        assert_eq!(handle.mode(), PlayerMode::StoppedWithError);
        handle.join().await;
    }

    #[tokio::test]
    async fn test_stop_is_sent_once() {
        let mut handle = spawn_worker(|mut ep| async move {
            let mut stops = 0;
            while let Some(cmd) = ep.next_command().await {
                if cmd == WorkerCommand::Stop {
                    stops += 1;
                }
            }
            ep.update(|s| s.samples_consumed = stops);
            ep.set_mode(PlayerMode::Finished);
        });
        handle.request_stop();
        handle.request_stop();
        let last = handle.join().await;
        assert_eq!(last.samples_consumed, 1);
    }

    #[tokio::test]
    async fn test_position_updates_do_not_wake() {
        let (go_tx, go_rx) = tokio::sync::oneshot::channel::<()>();
        let mut handle = spawn_worker(|ep| async move {
            ep.set_mode(PlayerMode::Playing);
            let _ = go_rx.await;
            for pos in 1..=50 {
                ep.update(|s| s.samples_consumed = pos);
            }
            ep.set_mode(PlayerMode::Finished);
        });

        handle.changed().await;
        assert_eq!(handle.mode(), PlayerMode::Playing);

        let _ = go_tx.send(());
        handle.changed().await;
        // The next wake is the mode change, with every position update behind it.
        assert_eq!(handle.mode(), PlayerMode::Finished);
        assert_eq!(handle.status().samples_consumed, 50);
        handle.join().await;
    }
}
