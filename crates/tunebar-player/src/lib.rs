pub mod mpv;
pub mod status;
pub mod worker;

pub use status::{samples_to_seconds, PlayerMode, WorkerStatus};
pub use worker::{spawn_worker, WorkerCommand, WorkerEndpoint, WorkerHandle, WorkerLauncher};
