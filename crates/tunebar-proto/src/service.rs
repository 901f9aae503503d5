//! Collaborator traits the session core talks to.
//!
//! The control loop awaits these calls inline, so from its point of view they
//! are synchronous: a slow call stalls the loop until the client's own timeout
//! fires.

use async_trait::async_trait;

use crate::error::{HistoryResult, ServiceResult};
use crate::model::{
    GenreCategory, ListenRecord, Rating, SearchResult, Station, StationKind, Track,
};

#[async_trait]
pub trait RadioService: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> ServiceResult<()>;

    async fn fetch_stations(&self) -> ServiceResult<Vec<Station>>;

    /// Next batch of tracks for a station.  An empty batch is not an error.
    async fn fetch_playlist(&self, station_id: &str) -> ServiceResult<Vec<Track>>;

    async fn fetch_genre_stations(&self) -> ServiceResult<Vec<GenreCategory>>;

    async fn create_station(&self, kind: StationKind, seed_id: &str) -> ServiceResult<()>;

    async fn add_music(&self, station: &Station, music_id: &str) -> ServiceResult<()>;

    async fn delete_station(&self, station: &Station) -> ServiceResult<()>;

    async fn rename_station(&self, station: &Station, name: &str) -> ServiceResult<()>;

    /// Turn a shared station into one owned by the listener.
    async fn transform_to_owned(&self, station: &Station) -> ServiceResult<()>;

    async fn rate_track(&self, track: &Track, rating: Rating) -> ServiceResult<()>;

    async fn mark_tired(&self, track: &Track) -> ServiceResult<()>;

    async fn move_track(&self, track: &Track, from: &Station, to: &Station)
        -> ServiceResult<()>;

    /// Persist the `use_quickmix` flags of the given stations.
    async fn set_quickmix(&self, stations: &[Station]) -> ServiceResult<()>;

    async fn search_music(&self, query: &str) -> ServiceResult<SearchResult>;
}

#[async_trait]
pub trait HistoryService: Send + Sync {
    async fn submit(&self, record: &ListenRecord) -> HistoryResult<()>;
}
