//! The control loop: reap, advance, wait for input, show progress.
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};
use tunebar_player::{WorkerHandle, WorkerStatus};

use crate::session::Session;

/// Longest the loop waits for a key before it looks at the worker again.
pub const TICK: Duration = Duration::from_secs(1);

enum Wake {
    Key(char),
    InputClosed,
    WorkerChanged,
    Tick,
}

/// `-MM:SS/MM:SS` (remaining/total) followed by a carriage return.
pub fn format_progress(status: &WorkerStatus) -> String {
    let length = status.length_secs() as i64;
    let remaining = status.remaining_secs() as i64;
    format!(
        "-{:02}:{:02}/{:02}:{:02}\r",
        remaining / 60,
        remaining % 60,
        length / 60,
        length % 60
    )
}

async fn worker_changed(worker: &mut Option<WorkerHandle>) {
    match worker {
        Some(worker) => worker.changed().await,
        None => std::future::pending().await,
    }
}

async fn wait(session: &mut Session) -> Wake {
    tokio::select! {
        key = session.term.keys.next() => match key {
            Some(key) => Wake::Key(key),
            None => Wake::InputClosed,
        },
        _ = worker_changed(&mut session.worker) => Wake::WorkerChanged,
        _ = sleep(TICK) => Wake::Tick,
    }
}

fn render_progress(session: &mut Session) {
    let Some(worker) = session.worker.as_ref() else {
        return;
    };
    if !worker.mode().is_displayable() {
        return;
    }
    let line = format_progress(&worker.status());
    session.term.msg(&line);
}

/// Run until the user quits, then retire the last worker.
pub async fn run(session: &mut Session) {
    info!("Control loop: starting");
    while !session.quit {
        session.reap().await;
        session.advance().await;

        match wait(session).await {
            Wake::Key(key) => session.dispatch(key).await,
            Wake::InputClosed => {
                info!("Control loop: input closed");
                session.stop_worker();
                session.quit = true;
            }
            Wake::WorkerChanged | Wake::Tick => {}
        }

        render_progress(session);
    }
    debug!("Control loop: quit requested");
    session.shutdown().await;
}
