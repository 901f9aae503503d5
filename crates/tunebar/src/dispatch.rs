//! Single-keystroke commands.
//!
//! Every command runs to completion inside the loop iteration that read its
//! key, service calls and prompts included.  Failures are reported on the
//! console as `Error.` and leave the session as it was.

use tracing::{info, warn};
use tunebar_proto::model::{Rating, Station, StationKind, Track};

use crate::picker;
use crate::session::Session;
use crate::term::KEY_INTERRUPT;

pub const HELP: &str = "\n\
a\tadd music to current station\n\
b\tban current song\n\
c\tcreate new station\n\
d\tdelete current station\n\
g\tadd genre station\n\
l\tlove current song\n\
m\tmove song to different station\n\
n\tnext song\n\
p\tpause/continue\n\
q\tquit\n\
r\trename current station\n\
s\tchange station\n\
t\ttired (ban song for 1 month)\n\
u\tupcoming songs\n\
x\tselect quickmix stations\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    AddMusic,
    Ban,
    CreateStation,
    DeleteStation,
    GenreStation,
    Love,
    MoveTrack,
    Next,
    Pause,
    Quit,
    RenameStation,
    ChangeStation,
    Tired,
    Upcoming,
    Quickmix,
}

impl Command {
    pub fn from_key(key: char) -> Option<Self> {
        let cmd = match key {
            '?' => Command::Help,
            'a' => Command::AddMusic,
            'b' => Command::Ban,
            'c' => Command::CreateStation,
            'd' => Command::DeleteStation,
            'g' => Command::GenreStation,
            'l' => Command::Love,
            'm' => Command::MoveTrack,
            'n' => Command::Next,
            'p' => Command::Pause,
            'q' | KEY_INTERRUPT => Command::Quit,
            'r' => Command::RenameStation,
            's' => Command::ChangeStation,
            't' => Command::Tired,
            'u' => Command::Upcoming,
            'x' => Command::Quickmix,
            _ => return None,
        };
        Some(cmd)
    }
}

/// Print `Ok.` or `Error.` after an action line and log failures.
macro_rules! outcome {
    ($session:expr, $what:expr, $result:expr) => {{
        match $result {
            Ok(v) => {
                $session.term.msg("Ok.\n");
                Some(v)
            }
            Err(e) => {
                warn!("{} failed: {}", $what, e);
                $session.term.msg("Error.\n");
                None
            }
        }
    }};
}

impl Session {
    /// Handle one key.  Keys without a command are ignored.
    pub async fn dispatch(&mut self, key: char) {
        let Some(cmd) = Command::from_key(key) else {
            return;
        };
        info!("Dispatch: {:?}", cmd);
        match cmd {
            Command::Help => self.term.msg(HELP),
            Command::AddMusic => self.add_music().await,
            Command::Ban => self.ban().await,
            Command::CreateStation => self.create_station().await,
            Command::DeleteStation => self.delete_station().await,
            Command::GenreStation => self.genre_station().await,
            Command::Love => self.love().await,
            Command::MoveTrack => self.move_track().await,
            Command::Next => self.stop_worker(),
            Command::Pause => {
                if let Some(worker) = self.worker.as_mut() {
                    worker.toggle_pause();
                }
            }
            Command::Quit => {
                self.stop_worker();
                self.quit = true;
            }
            Command::RenameStation => self.rename_station().await,
            Command::ChangeStation => self.change_station().await,
            Command::Tired => self.tired().await,
            Command::Upcoming => self.upcoming(),
            Command::Quickmix => self.quickmix().await,
        }
    }

    fn require_station(&mut self) -> Option<Station> {
        let station = self.current_station().cloned();
        if station.is_none() {
            self.term.msg("No station selected.\n");
        }
        station
    }

    fn require_playing(&mut self) -> Option<(Station, Track)> {
        let playing = self
            .current_station()
            .cloned()
            .zip(self.current_track().cloned());
        if playing.is_none() {
            self.term.msg("No song playing.\n");
        }
        playing
    }

    /// Rating needs an owned station; convert a shared one first.
    async fn ensure_owned(&mut self, station: &Station) -> bool {
        if station.is_creator {
            return true;
        }
        self.term.msg("Transforming station... ");
        let result = self.service.transform_to_owned(station).await;
        if outcome!(self, "transform", result).is_none() {
            return false;
        }
        if let Some(s) = self.directory.find_mut(&station.id) {
            s.is_creator = true;
        }
        true
    }

    async fn add_music(&mut self) {
        let Some(station) = self.require_station() else {
            return;
        };
        let Some(music_id) = picker::select_music_id(&mut self.term, &*self.service).await
        else {
            return;
        };
        self.term.msg("Adding music to station... ");
        let result = self.service.add_music(&station, &music_id).await;
        outcome!(self, "add music", result);
    }

    async fn ban(&mut self) {
        let Some((station, track)) = self.require_playing() else {
            return;
        };
        if !self.ensure_owned(&station).await {
            return;
        }
        self.term.msg("Banning song... ");
        let result = self.service.rate_track(&track, Rating::Banned).await;
        if outcome!(self, "ban", result).is_some() {
            self.set_current_rating(Rating::Banned);
            self.stop_worker();
        }
    }

    async fn create_station(&mut self) {
        let Some(music_id) = picker::select_music_id(&mut self.term, &*self.service).await
        else {
            return;
        };
        self.term.msg("Creating station... ");
        let result = self.service.create_station(StationKind::MusicId, &music_id).await;
        if outcome!(self, "create station", result).is_some() {
            self.refresh_stations().await;
        }
    }

    async fn delete_station(&mut self) {
        let Some(station) = self.require_station() else {
            return;
        };
        self.term
            .msg(&format!("Really delete \"{}\"? [yn]\n", station.name));
        if self.term.read_key().await != Some('y') {
            return;
        }
        self.term.msg("Deleting station... ");
        let result = self.service.delete_station(&station).await;
        if outcome!(self, "delete station", result).is_some() {
            self.stop_worker();
            self.playlist.clear();
            self.station_id = None;
            self.refresh_stations().await;
        }
    }

    async fn genre_station(&mut self) {
        if self.directory.genres.is_none() {
            self.term.msg("Receiving genre stations... ");
            let result = self.service.fetch_genre_stations().await;
            match outcome!(self, "genre stations", result) {
                Some(genres) => self.directory.genres = Some(genres),
                None => return,
            }
        }
        let Some(genres) = self.directory.genres.as_ref() else {
            return;
        };

        let category = picker::select_name(&mut self.term, genres.iter().map(|c| c.name.as_str()))
            .await
            .and_then(|i| genres.get(i));
        let Some(category) = category else {
            self.term.msg("Aborted.\n");
            return;
        };
        let shared = picker::select_name(
            &mut self.term,
            category.stations.iter().map(|s| s.name.as_str()),
        )
        .await
        .and_then(|i| category.stations.get(i))
        .cloned();
        let Some(shared) = shared else {
            self.term.msg("Aborted.\n");
            return;
        };

        self.term
            .msg(&format!("Adding shared station \"{}\"... ", shared.name));
        let result = self.service.create_station(StationKind::Shared, &shared.id).await;
        if outcome!(self, "add shared station", result).is_some() {
            self.refresh_stations().await;
        }
    }

    async fn love(&mut self) {
        let Some((station, track)) = self.require_playing() else {
            return;
        };
        if track.rating == Rating::Loved {
            self.term.msg("Already loved. No need to do this twice.\n");
            return;
        }
        if !self.ensure_owned(&station).await {
            return;
        }
        self.term.msg("Loving song... ");
        let result = self.service.rate_track(&track, Rating::Loved).await;
        if outcome!(self, "love", result).is_some() {
            self.set_current_rating(Rating::Loved);
        }
    }

    async fn move_track(&mut self) {
        let Some((station, track)) = self.require_playing() else {
            return;
        };
        let dest = picker::select_station(
            &mut self.term,
            &self.directory.stations,
            "Move song to station: ",
        )
        .await
        .and_then(|i| self.directory.stations.get(i))
        .cloned();
        let Some(dest) = dest else {
            return;
        };
        self.term
            .msg(&format!("Moving song to \"{}\"... ", dest.name));
        let result = self.service.move_track(&track, &station, &dest).await;
        if outcome!(self, "move", result).is_some() {
            self.stop_worker();
        }
    }

    async fn rename_station(&mut self) {
        let Some(station) = self.require_station() else {
            return;
        };
        let name = self.term.read_line("New name?\n", true).await;
        let Some(name) = name.filter(|n| !n.is_empty()) else {
            return;
        };
        self.term.msg("Renaming station... ");
        let result = self.service.rename_station(&station, &name).await;
        if outcome!(self, "rename", result).is_some() {
            if let Some(s) = self.directory.find_mut(&station.id) {
                s.name = name;
            }
        }
    }

    async fn change_station(&mut self) {
        self.stop_worker();
        self.playlist.clear();
        if let Some(station) = self.choose_station("Select station: ").await {
            self.term
                .msg(&format!("Changed station to {}\n", station.name));
        }
    }

    async fn tired(&mut self) {
        let Some((_, track)) = self.require_playing() else {
            return;
        };
        self.term.msg("Putting song on shelf... ");
        let result = self.service.mark_tired(&track).await;
        if outcome!(self, "tired", result).is_some() {
            self.stop_worker();
        }
    }

    fn upcoming(&mut self) {
        if self.require_playing().is_none() {
            return;
        }
        let lines: Vec<String> = self
            .playlist
            .upcoming()
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{:2}) \"{}\" by \"{}\"\n", i, t.title, t.artist))
            .collect();
        if lines.is_empty() {
            self.term.msg("No songs in queue.\n");
            return;
        }
        self.term.msg("Next songs:\n");
        for line in lines {
            self.term.msg(&line);
        }
    }

    async fn quickmix(&mut self) {
        let Some(station) = self.require_station() else {
            return;
        };
        if !station.is_quickmix {
            self.term.msg("Not a QuickMix station.\n");
            return;
        }
        loop {
            let choice = picker::select_station(
                &mut self.term,
                &self.directory.stations,
                "Toggle quickmix for station: ",
            )
            .await;
            let Some(i) = choice else {
                break;
            };
            self.directory.toggle_quickmix(i);
        }
        self.term.msg("Setting quickmix stations... ");
        let result = self.service.set_quickmix(&self.directory.stations).await;
        outcome!(self, "set quickmix", result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_command_key_maps() {
        for key in "?abcdglmnpqrstux".chars() {
            assert!(Command::from_key(key).is_some(), "key {key:?}");
        }
        assert_eq!(Command::from_key(KEY_INTERRUPT), Some(Command::Quit));
        assert_eq!(Command::from_key('z'), None);
        assert_eq!(Command::from_key('P'), None);
    }

    #[test]
    fn test_help_lists_every_command_key() {
        for key in "abcdglmnpqrstux".chars() {
            assert!(HELP.contains(&format!("\n{key}\t")), "key {key:?}");
        }
    }
}
