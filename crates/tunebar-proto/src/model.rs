use serde::{Deserialize, Serialize};

/// A radio station as listed by the service.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Station {
    pub id: String,
    pub name: String,
    /// True when the logged-in listener created (owns) the station.
    #[serde(default)]
    pub is_creator: bool,
    /// True for the quickmix station, which blends the others.
    #[serde(default)]
    pub is_quickmix: bool,
    /// Whether this station takes part in the quickmix blend.
    #[serde(default)]
    pub use_quickmix: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    #[default]
    None,
    Loved,
    Banned,
}

/// One playlist entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Where the worker fetches the audio from.
    pub audio_url: String,
    #[serde(default)]
    pub rating: Rating,
    /// Station the track was drawn from (differs from the playing station on quickmix).
    pub station_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenreCategory {
    pub name: String,
    #[serde(default)]
    pub stations: Vec<Station>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub name: String,
    pub music_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSong {
    pub artist: String,
    pub title: String,
    pub music_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchResult {
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub songs: Vec<SearchSong>,
}

/// How a new station is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationKind {
    /// Seeded from an artist or song music id.
    MusicId,
    /// A shared (genre) station added to the listener's list.
    Shared,
}

impl StationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationKind::MusicId => "mi",
            StationKind::Shared => "sh",
        }
    }
}

/// A completed listen, ready for submission to the play-history service.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenRecord {
    pub artist: String,
    pub title: String,
    pub album: String,
    /// Unix timestamp of the moment playback started.
    pub started_at: i64,
    /// Track length in whole seconds.
    pub length_secs: u32,
}

/// Find a station by id in an ordered station list.
pub fn find_station<'a>(stations: &'a [Station], id: &str) -> Option<&'a Station> {
    stations.iter().find(|s| s.id == id)
}
