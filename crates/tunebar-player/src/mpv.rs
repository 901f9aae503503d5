/// mpv-backed playback worker.
///
/// Architecture:
///
/// ```text
///   MpvLauncher::start(locator)
///         │
///         └── worker task (one per track)
///                ├── MpvDriver   ← owns the mpv child process + IPC socket
///                ├── writer_task ← receives PendingRequest via mpsc, serialises → socket
///                └── reader_task ← reads JSON lines from socket
///                                     ├── response (has request_id) → matched oneshot::Sender
///                                     └── event / property-change   → event channel
/// ```
///
/// The worker task translates property changes into `WorkerStatus` snapshots
/// and executes pause/stop commands from the control loop.  The mpv process is
/// killed and reaped before the task returns, so joining the task guarantees
/// nothing of the track is left running.
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

use crate::status::{seconds_to_samples, PlayerMode, WorkerStatus};
use crate::worker::{spawn_worker, WorkerCommand, WorkerEndpoint, WorkerHandle, WorkerLauncher};

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

// ── observation property IDs ──────────────────────────────────────────────────

pub const OBS_PAUSE: u64 = 1;
pub const OBS_TIME_POS: u64 = 2;
pub const OBS_DURATION: u64 = 3;
pub const OBS_SAMPLERATE: u64 = 4;
pub const OBS_CHANNELS: u64 = 5;

const OBSERVED: [(u64, &str); 5] = [
    (OBS_PAUSE, "pause"),
    (OBS_TIME_POS, "time-pos"),
    (OBS_DURATION, "duration"),
    (OBS_SAMPLERATE, "audio-params/samplerate"),
    (OBS_CHANNELS, "audio-params/channel-count"),
];

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String,
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// An unsolicited mpv event (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    pub fn as_property_change(&self) -> Option<(u64, &Value)> {
        if self.event_name()? == "property-change" {
            let id = self.raw.get("id")?.as_u64()?;
            Some((id, self.raw.get("data").unwrap_or(&Value::Null)))
        } else {
            None
        }
    }

    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    /// `reason` of an `end-file` event.
    pub fn end_file_reason(&self) -> Option<&str> {
        if self.event_name()? == "end-file" {
            self.raw.get("reason")?.as_str()
        } else {
            None
        }
    }
}

// ── IPC handle ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let mut payload = serde_json::to_string(&json!({ "command": command, "request_id": req_id }))?;
        payload.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    pub async fn observe_properties(&self) {
        for (id, name) in OBSERVED {
            match self.send(json!(["observe_property", id, name])).await {
                Ok(_) => debug!("mpv: observe_property id={} name={}", id, name),
                Err(e) => warn!("mpv: observe_property {} failed: {}", name, e),
            }
        }
    }

    pub async fn load(&self, locator: &str) -> anyhow::Result<()> {
        self.send(json!(["loadfile", locator])).await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    pub async fn quit(&self) {
        let _ = self.send(json!(["quit"])).await;
    }
}

// ── driver ────────────────────────────────────────────────────────────────────

/// Owns one mpv child process.
pub struct MpvDriver {
    socket_name: String,
    binary: PathBuf,
    volume: f32,
    process: Option<tokio::process::Child>,
}

impl MpvDriver {
    pub fn new(socket_name: String, binary: PathBuf, volume: f32) -> Self {
        Self {
            socket_name,
            binary,
            volume,
            process: None,
        }
    }

    fn spawn_process(&mut self) -> anyhow::Result<()> {
        let vol_arg = format!(
            "--volume={}",
            (self.volume * 100.0).clamp(0.0, 100.0).round() as i64
        );
        let child = tokio::process::Command::new(&self.binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg(tunebar_proto::platform::mpv_socket_arg(&self.socket_name))
            .arg(vol_arg)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        debug!("mpv: spawned process with pid {:?}", child.id());
        self.process = Some(child);
        Ok(())
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        let socket_path = PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;
        self.spawn_process()?;

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
            if !self.process_alive() {
                anyhow::bail!("mpv exited during startup");
            }
        }
        let stream = UnixStream::connect(&socket_path).await?;
        debug!("mpv: connected to {}", self.socket_name);

        let (read_half, write_half) = stream.into_split();
        Ok(start_io_tasks(BufReader::new(read_half), write_half, event_tx))
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.spawn_process()?;

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                debug!("mpv: connected to {}", pipe_path);
                let (read_half, write_half) = tokio::io::split(client);
                return Ok(start_io_tasks(BufReader::new(read_half), write_half, event_tx));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }

    fn process_alive(&mut self) -> bool {
        match self.process.as_mut().map(|child| child.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                warn!("mpv process exited with {}", status);
                false
            }
            Some(Err(e)) => {
                warn!("mpv process_alive check failed: {}", e);
                false
            }
            None => false,
        }
    }

    /// Kill the process (if still running) and wait for it to be reaped.
    pub async fn shutdown(&mut self) {
        if let Some(mut child) = self.process.take() {
            let _ = child.kill().await;
        }
        #[cfg(unix)]
        {
            let _ = tokio::fs::remove_file(&self.socket_name).await;
        }
    }
}

fn start_io_tasks<R, W>(
    reader: BufReader<R>,
    writer: W,
    event_tx: mpsc::Sender<MpvEvent>,
) -> MpvHandle
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

    tokio::spawn(writer_task(writer, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(reader, pending, event_tx));

    MpvHandle { tx: cmd_tx }
}

async fn fail_all(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap, event_tx: mpsc::Sender<MpvEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_all(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    let reply = pending.lock().await.remove(&req_id);
                    if let Some(tx) = reply {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error").to_string();
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    }
                } else if event_tx.send(MpvEvent { raw: val }).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_all(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register the reply channel before writing so the reader can match it.
        pending.lock().await.insert(req.req_id, req.reply);
        debug!("mpv writer: send req={} payload={}", req.req_id, req.payload.trim());
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
}

// ── property tracking ─────────────────────────────────────────────────────────

/// Last known values of the observed properties.
#[derive(Debug, Default)]
pub(crate) struct Observed {
    sample_rate: Option<u32>,
    channels: Option<u32>,
    duration: Option<f64>,
    paused: bool,
}

impl Observed {
    /// Fold one mpv event into `status`.  Returns true once the track ended.
    pub(crate) fn apply(&mut self, evt: &MpvEvent, status: &mut WorkerStatus) -> bool {
        if let Some(reason) = evt.end_file_reason() {
            return match reason {
                "error" => {
                    status.mode = PlayerMode::StoppedWithError;
                    true
                }
                "eof" | "stop" | "quit" => {
                    status.mode = PlayerMode::Finished;
                    true
                }
                _ => false,
            };
        }

        let Some((id, data)) = evt.as_property_change() else {
            return false;
        };
        match id {
            OBS_SAMPLERATE => self.sample_rate = data.as_u64().map(|v| v as u32),
            OBS_CHANNELS => self.channels = data.as_u64().map(|v| v as u32),
            OBS_DURATION => self.duration = data.as_f64(),
            OBS_PAUSE => {
                self.paused = data.as_bool().unwrap_or(false);
                match status.mode {
                    PlayerMode::MetadataReady | PlayerMode::Playing if self.paused => {
                        status.mode = PlayerMode::Paused
                    }
                    PlayerMode::Paused if !self.paused => status.mode = PlayerMode::Playing,
                    _ => {}
                }
            }
            OBS_TIME_POS => {
                if let (Some(rate), Some(channels), Some(pos)) =
                    (self.sample_rate, self.channels, data.as_f64())
                {
                    let consumed = seconds_to_samples(rate, channels, pos);
                    status.samples_consumed = status.samples_consumed.max(consumed);
                    if status.mode == PlayerMode::MetadataReady && pos > 0.0 && !self.paused {
                        status.mode = PlayerMode::Playing;
                    }
                }
            }
            _ => {}
        }

        if let (Some(rate), Some(channels), Some(duration)) =
            (self.sample_rate, self.channels, self.duration)
        {
            status.sample_rate = rate;
            status.channels = channels;
            status.total_samples = seconds_to_samples(rate, channels, duration);
            if status.mode < PlayerMode::MetadataReady {
                status.mode = PlayerMode::MetadataReady;
            }
        }
        false
    }
}

// ── launcher ──────────────────────────────────────────────────────────────────

pub struct MpvLauncher {
    binary: PathBuf,
    volume: f32,
    next_worker_id: AtomicU64,
}

impl MpvLauncher {
    pub fn new(binary: PathBuf, volume: f32) -> Self {
        Self {
            binary,
            volume,
            next_worker_id: AtomicU64::new(1),
        }
    }
}

impl WorkerLauncher for MpvLauncher {
    fn start(&self, locator: String) -> WorkerHandle {
        let worker_id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let driver = MpvDriver::new(
            tunebar_proto::platform::mpv_socket_name(worker_id),
            self.binary.clone(),
            self.volume,
        );
        spawn_worker(move |endpoint| run_worker(driver, locator, endpoint))
    }
}

async fn run_worker(mut driver: MpvDriver, locator: String, mut endpoint: WorkerEndpoint) {
    let (event_tx, mut event_rx) = mpsc::channel::<MpvEvent>(256);

    let handle = match driver.spawn_and_connect(event_tx).await {
        Ok(handle) => handle,
        Err(e) => {
            warn!("mpv worker: startup failed: {}", e);
            endpoint.set_mode(PlayerMode::StoppedWithError);
            driver.shutdown().await;
            return;
        }
    };
    handle.observe_properties().await;
    if let Err(e) = handle.load(&locator).await {
        warn!("mpv worker: loadfile failed: {}", e);
        endpoint.set_mode(PlayerMode::StoppedWithError);
        driver.shutdown().await;
        return;
    }
    endpoint.set_mode(PlayerMode::DecodingMetadataPending);
    info!("mpv worker: loading {}", locator);

    let mut observed = Observed::default();
    loop {
        tokio::select! {
            cmd = endpoint.next_command() => match cmd {
                Some(WorkerCommand::SetPause(paused)) => {
                    if let Err(e) = handle.set_pause(paused).await {
                        warn!("mpv worker: pause failed: {}", e);
                    }
                }
                Some(WorkerCommand::Stop) | None => {
                    debug!("mpv worker: stop requested");
                    handle.quit().await;
                    endpoint.set_mode(PlayerMode::Finished);
                    break;
                }
            },
            evt = event_rx.recv() => match evt {
                Some(evt) => {
                    let mut status = endpoint.status();
                    let done = observed.apply(&evt, &mut status);
                    if status != endpoint.status() {
                        endpoint.update(|s| *s = status);
                    }
                    if done {
                        debug!("mpv worker: track ended ({:?})", status.mode);
                        break;
                    }
                }
                None => {
                    warn!("mpv worker: lost IPC connection");
                    endpoint.set_mode(PlayerMode::StoppedWithError);
                    break;
                }
            },
        }
    }

    driver.shutdown().await;
}
