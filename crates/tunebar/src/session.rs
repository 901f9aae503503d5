//! Session: single owner of all mutable listening state.
//!
//! The control loop and the command dispatcher both work on one `Session`.
//! It owns the station directory, the playlist, the current station (by id),
//! the live worker handle and the scrobble coordinator.  Nothing else touches
//! them.
//!
//! Worker lifecycle, as driven from here:
//!
//! ```text
//!   advance(): no worker ──▶ next track (refetch if exhausted) ──▶ launcher.start()
//!   reap():    worker terminal ──▶ join ──▶ scrobble ──▶ handle cleared
//! ```
//!
//! `advance` never starts a worker while `self.worker` is set, and `reap` is
//! the only place that clears it, always after `join`.  So at most one
//! worker is ever live.
use std::sync::Arc;

use tracing::{debug, info, warn};
use tunebar_player::{WorkerHandle, WorkerLauncher};
use tunebar_proto::model::{Rating, Station, Track};
use tunebar_proto::service::RadioService;

use crate::directory::Directory;
use crate::picker;
use crate::playlist::Playlist;
use crate::scrobble::ScrobbleCoordinator;
use crate::term::Term;

pub struct Session {
    pub term: Term,
    pub service: Arc<dyn RadioService>,
    pub launcher: Arc<dyn WorkerLauncher>,
    pub scrobbler: ScrobbleCoordinator,
    pub directory: Directory,
    pub playlist: Playlist,
    /// Id of the selected station; `None` while nothing is selected.
    pub station_id: Option<String>,
    pub worker: Option<WorkerHandle>,
    pub quit: bool,
}

impl Session {
    pub fn new(
        term: Term,
        service: Arc<dyn RadioService>,
        launcher: Arc<dyn WorkerLauncher>,
        scrobbler: ScrobbleCoordinator,
        directory: Directory,
    ) -> Self {
        Self {
            term,
            service,
            launcher,
            scrobbler,
            directory,
            playlist: Playlist::default(),
            station_id: None,
            worker: None,
            quit: false,
        }
    }

    pub fn current_station(&self) -> Option<&Station> {
        self.station_id
            .as_deref()
            .and_then(|id| self.directory.find(id))
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.current()
    }

    /// Ask the worker to end the current track.  The next `reap` picks it up.
    pub fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.as_mut() {
            worker.request_stop();
        }
    }

    /// Let the user pick a station.  Declining leaves no station selected.
    pub async fn choose_station(&mut self, prompt: &str) -> Option<Station> {
        let choice = picker::select_station(&mut self.term, &self.directory.stations, prompt).await;
        let station = choice.and_then(|i| self.directory.stations.get(i)).cloned();
        self.station_id = station.as_ref().map(|s| s.id.clone());
        if let Some(station) = &station {
            info!("Session: station selected: {:?}", station.name);
        }
        station
    }

    /// Reload the station list after the service changed it.
    pub async fn refresh_stations(&mut self) {
        match self.service.fetch_stations().await {
            Ok(stations) => {
                debug!("Session: {} stations after refresh", stations.len());
                self.directory.stations = stations;
            }
            Err(e) => warn!("Session: station refresh failed: {}", e),
        }
    }

    pub fn set_current_rating(&mut self, rating: Rating) {
        if let Some(track) = self.playlist.current_mut() {
            track.rating = rating;
        }
    }

    // ── lifecycle ─────────────────────────────────────────────────────────────

    /// Retire a worker that reached a terminal mode: join it, then settle the
    /// scrobble for its track.
    pub async fn reap(&mut self) {
        if !self.worker.as_ref().is_some_and(|w| w.is_done()) {
            return;
        }
        let Some(worker) = self.worker.take() else {
            return;
        };
        let mode = worker.mode();
        let last = worker.join().await;
        debug!(
            "Session: reaped worker ({:?}, {:.0}s of {:.0}s)",
            mode,
            last.elapsed_secs(),
            last.length_secs()
        );
        self.scrobbler.finalize(&last, &mut self.term).await;
    }

    /// Move to the next track and start a worker for it.  Fetches a new
    /// playlist when the current one is used up.  Does nothing while a worker
    /// is live or no station is selected.
    pub async fn advance(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let Some(station) = self.current_station().cloned() else {
            return;
        };

        if !self.playlist.is_exhausted() {
            self.playlist.advance();
        }
        if self.playlist.is_exhausted() && !self.fetch_playlist(&station).await {
            return;
        }

        let Some(track) = self.playlist.current() else {
            return;
        };
        self.term.msg(&announcement(track, &station, &self.directory.stations));
        self.scrobbler.begin(track);
        info!("Session: starting {:?} by {:?}", track.title, track.artist);
        self.worker = Some(self.launcher.start(track.audio_url.clone()));
    }

    /// Replace the playlist with a fresh one.  On failure or an empty result
    /// the station is deselected and `false` is returned.
    async fn fetch_playlist(&mut self, station: &Station) -> bool {
        self.term.msg("Receiving new playlist... ");
        self.playlist.clear();
        match self.service.fetch_playlist(&station.id).await {
            Err(e) => {
                warn!("Session: playlist for {:?} failed: {}", station.name, e);
                self.term.msg("Error.\n");
                self.station_id = None;
                false
            }
            Ok(tracks) if tracks.is_empty() => {
                self.term.msg("No tracks left.\n");
                self.station_id = None;
                false
            }
            Ok(tracks) => {
                debug!("Session: {} tracks for {:?}", tracks.len(), station.name);
                self.term.msg("Ok.\n");
                self.playlist.replace(tracks);
                true
            }
        }
    }

    /// Stop and join any live worker.  The track it was playing is not
    /// scrobbled.
    pub async fn shutdown(&mut self) {
        self.stop_worker();
        if let Some(worker) = self.worker.take() {
            let last = worker.join().await;
            debug!("Session: joined last worker at {:.0}s", last.elapsed_secs());
        }
        self.scrobbler.discard();
        info!("Session: shut down");
    }
}

/// `"title" by "artist" on "album"`, flagged when loved and, on a quickmix
/// station, followed by the station the track came from.
pub fn announcement(track: &Track, station: &Station, stations: &[Station]) -> String {
    let loved = if track.rating == Rating::Loved { " (Loved)" } else { "" };
    let origin = if station.is_quickmix {
        stations
            .iter()
            .find(|s| s.id == track.station_id)
            .map(|s| format!(" @ {}", s.name))
            .unwrap_or_default()
    } else {
        String::new()
    };
    format!(
        "\"{}\" by \"{}\" on \"{}\"{}{}\n",
        track.title, track.artist, track.album, loved, origin
    )
}
