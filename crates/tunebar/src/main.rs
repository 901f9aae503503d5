mod control;
mod directory;
mod dispatch;
mod picker;
mod playlist;
mod scrobble;
mod session;
mod term;


use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tunebar_player::mpv::MpvLauncher;
use tunebar_player::WorkerLauncher;
use tunebar_proto::client::HttpRadioService;
use tunebar_proto::config::Config;
use tunebar_proto::scrobbler::LastFmScrobbler;
use tunebar_proto::service::{HistoryService, RadioService};

use crate::directory::Directory;
use crate::scrobble::ScrobbleCoordinator;
use crate::session::Session;
use crate::term::{Console, Keys, Term};

/// File logging; stdout belongs to the console.
fn init_logging() -> anyhow::Result<PathBuf> {
    let data_dir = tunebar_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("tunebar.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tunebar=debug")),
        )
        .init();

    Ok(log_path)
}

/// Configured value, or ask for it.
async fn credential(
    term: &mut Term,
    configured: Option<&String>,
    prompt: &str,
    echo: bool,
) -> Option<String> {
    match configured {
        Some(value) if !value.is_empty() => Some(value.clone()),
        _ => term.read_line(prompt, echo).await,
    }
}

/// Log in and load the station list.  Either failing is fatal and no
/// session is built.
async fn start_session(
    mut term: Term,
    service: Arc<dyn RadioService>,
    launcher: Arc<dyn WorkerLauncher>,
    scrobbler: ScrobbleCoordinator,
    username: &str,
    password: &str,
) -> anyhow::Result<Session> {
    term.msg("Login... ");
    if let Err(e) = service.login(username, password).await {
        term.msg("Error.\n");
        return Err(e).context("login failed");
    }
    term.msg("Ok.\n");

    term.msg("Get stations... ");
    let stations = match service.fetch_stations().await {
        Ok(stations) => {
            term.msg("Ok.\n");
            stations
        }
        Err(e) => {
            term.msg("Error.\n");
            return Err(e).context("could not fetch stations");
        }
    };
    info!("Logged in as {:?}, {} stations", username, stations.len());

    Ok(Session::new(
        term,
        service,
        launcher,
        scrobbler,
        Directory::new(stations),
    ))
}

async fn run(config: Config, mpv_binary: PathBuf, mut term: Term) -> anyhow::Result<()> {
    term.msg(&format!(
        "Welcome to tunebar {}! Press ? for help.\n",
        env!("CARGO_PKG_VERSION")
    ));

    let username = credential(&mut term, config.account.username.as_ref(), "Username: ", true)
        .await
        .context("no username given")?;
    let password = credential(&mut term, config.account.password.as_ref(), "Password: ", false)
        .await
        .context("no password given")?;

    let service = Arc::new(HttpRadioService::new(&config.service)?);
    let history: Option<Arc<dyn HistoryService>> = if config.scrobbling_enabled() {
        match LastFmScrobbler::new(&config.scrobble) {
            Ok(scrobbler) => Some(Arc::new(scrobbler) as Arc<dyn HistoryService>),
            Err(e) => {
                warn!("Scrobbling disabled: {}", e);
                None
            }
        }
    } else {
        None
    };
    let launcher = Arc::new(MpvLauncher::new(mpv_binary, config.player.volume));

    let mut session = start_session(
        term,
        service,
        launcher,
        ScrobbleCoordinator::new(history, config.scrobble.scrobble_percent),
        &username,
        &password,
    )
    .await?;

    if let Some(station) = session.choose_station("Select station: ").await {
        session
            .term
            .msg(&format!("Playing station \"{}\"\n", station.name));
    }

    control::run(&mut session).await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_path = init_logging()?;
    eprintln!("Logging to {}", log_path.display());

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    let mpv_binary = config
        .player
        .mpv_path
        .clone()
        .or_else(tunebar_proto::platform::find_mpv_binary)
        .context("mpv not found; set [player] mpv_path in the config")?;
    info!("Using mpv at {:?}", mpv_binary);

    crossterm::terminal::enable_raw_mode()?;
    let term = Term::new(Console::stdout(true), Keys::spawn_terminal_reader());
    let result = run(config, mpv_binary, term).await;
    if let Err(e) = crossterm::terminal::disable_raw_mode() {
        warn!("Could not restore terminal: {}", e);
    }

    info!("Exiting");
    result
}
