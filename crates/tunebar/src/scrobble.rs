//! Per-track play-history submission.
//!
//! A pending record is opened when a track starts and settled exactly once,
//! when its worker is reaped.  Whether it is submitted depends on how much of
//! the track was heard.  A track cut short by quitting is discarded.

use std::sync::Arc;

use tracing::{debug, warn};
use tunebar_player::WorkerStatus;
use tunebar_proto::model::{ListenRecord, Track};
use tunebar_proto::service::HistoryService;

use crate::term::Term;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingScrobble {
    pub artist: String,
    pub title: String,
    pub album: String,
    pub started_at: i64,
}

/// Percentage of the track heard.  `None` when the length is unknown.
pub fn played_percent(status: &WorkerStatus) -> Option<f64> {
    let length = status.length_secs();
    if length <= 0.0 {
        return None;
    }
    Some(status.elapsed_secs() * 100.0 / length)
}

pub struct ScrobbleCoordinator {
    history: Option<Arc<dyn HistoryService>>,
    threshold_percent: u32,
    pending: Option<PendingScrobble>,
}

impl ScrobbleCoordinator {
    /// `history` is `None` when scrobbling is turned off.
    pub fn new(history: Option<Arc<dyn HistoryService>>, threshold_percent: u32) -> Self {
        Self {
            history,
            threshold_percent,
            pending: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.history.is_some()
    }

    pub fn pending(&self) -> Option<&PendingScrobble> {
        self.pending.as_ref()
    }

    /// Open a record for a track that is about to start.  Replaces any record
    /// that was never settled.
    pub fn begin(&mut self, track: &Track) {
        if let Some(stale) = self.pending.take() {
            debug!("dropping unsettled scrobble for {:?}", stale.title);
        }
        self.pending = Some(PendingScrobble {
            artist: track.artist.clone(),
            title: track.title.clone(),
            album: track.album.clone(),
            started_at: chrono::Utc::now().timestamp(),
        });
    }

    /// Drop the pending record without submitting it.
    pub fn discard(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("discarding scrobble for {:?}", pending.title);
        }
    }

    pub fn is_eligible(&self, status: &WorkerStatus) -> bool {
        self.enabled()
            && played_percent(status).is_some_and(|p| p >= self.threshold_percent as f64)
    }

    /// Settle the pending record against the worker's last status.  Returns
    /// whether a submission succeeded.  The record is gone afterwards either way.
    pub async fn finalize(&mut self, status: &WorkerStatus, term: &mut Term) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        if !self.is_eligible(status) {
            debug!(
                "not scrobbling {:?}: {:.0}% heard",
                pending.title,
                played_percent(status).unwrap_or(0.0)
            );
            return false;
        }
        let Some(history) = self.history.as_ref() else {
            return false;
        };

        let record = ListenRecord {
            artist: pending.artist,
            title: pending.title,
            album: pending.album,
            started_at: pending.started_at,
            length_secs: status.length_secs() as u32,
        };
        term.msg("Scrobbling song... ");
        match history.submit(&record).await {
            Ok(()) => {
                term.msg("Ok.\n");
                true
            }
            Err(e) => {
                warn!("scrobble of {:?} failed: {}", record.title, e);
                term.msg("Error.\n");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::testing::scripted_term;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tunebar_player::status::seconds_to_samples;
    use tunebar_player::PlayerMode;
    use tunebar_proto::error::{HistoryError, HistoryResult};

    #[derive(Default)]
    struct RecordingHistory {
        submitted: Mutex<Vec<ListenRecord>>,
        fail: bool,
    }

    #[async_trait]
    impl HistoryService for RecordingHistory {
        async fn submit(&self, record: &ListenRecord) -> HistoryResult<()> {
            if self.fail {
                return Err(HistoryError::Api {
                    code: 9,
                    message: "Invalid session key".into(),
                });
            }
            self.submitted.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn status(total_secs: f64, heard_secs: f64) -> WorkerStatus {
        WorkerStatus {
            mode: PlayerMode::Finished,
            sample_rate: 44_100,
            channels: 2,
            total_samples: seconds_to_samples(44_100, 2, total_secs),
            samples_consumed: seconds_to_samples(44_100, 2, heard_secs),
        }
    }

    fn track() -> Track {
        Track {
            title: "Song".into(),
            artist: "Band".into(),
            album: "Record".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_mostly_heard_track_is_submitted() {
        let history = Arc::new(RecordingHistory::default());
        let mut coordinator = ScrobbleCoordinator::new(Some(history.clone()), 50);
        let (mut term, _tx, buf) = scripted_term();

        coordinator.begin(&track());
        assert!(coordinator.finalize(&status(180.0, 170.0), &mut term).await);

        let submitted = history.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].length_secs, 180);
        assert_eq!(submitted[0].album, "Record");
        assert!(buf.text().contains("Scrobbling song... Ok."));
        assert!(coordinator.pending().is_none());
    }

    #[tokio::test]
    async fn test_briefly_heard_track_is_discarded() {
        let history = Arc::new(RecordingHistory::default());
        let mut coordinator = ScrobbleCoordinator::new(Some(history.clone()), 50);
        let (mut term, _tx, buf) = scripted_term();

        coordinator.begin(&track());
        assert!(!coordinator.finalize(&status(180.0, 10.0), &mut term).await);
        assert!(history.submitted.lock().unwrap().is_empty());
        assert!(buf.text().is_empty());
        assert!(coordinator.pending().is_none());
    }

    #[tokio::test]
    async fn test_disabled_scrobbling_never_submits() {
        let mut coordinator = ScrobbleCoordinator::new(None, 50);
        let (mut term, _tx, _buf) = scripted_term();
        coordinator.begin(&track());
        assert!(!coordinator.finalize(&status(180.0, 180.0), &mut term).await);
        assert!(coordinator.pending().is_none());
    }

    #[tokio::test]
    async fn test_failed_submission_reports_error_and_drops_record() {
        let history = Arc::new(RecordingHistory {
            fail: true,
            ..Default::default()
        });
        let mut coordinator = ScrobbleCoordinator::new(Some(history), 50);
        let (mut term, _tx, buf) = scripted_term();
        coordinator.begin(&track());
        assert!(!coordinator.finalize(&status(200.0, 150.0), &mut term).await);
        assert!(buf.text().contains("Scrobbling song... Error."));
        assert!(coordinator.pending().is_none());
    }

    #[test]
    fn test_zero_length_track_is_never_eligible() {
        let history: Arc<dyn HistoryService> = Arc::new(RecordingHistory::default());
        let coordinator = ScrobbleCoordinator::new(Some(history), 0);
        let empty = WorkerStatus {
            samples_consumed: 500,
            ..Default::default()
        };
        assert!(played_percent(&empty).is_none());
        assert!(!coordinator.is_eligible(&empty));
    }

    #[test]
    fn test_begin_keeps_at_most_one_record() {
        let mut coordinator = ScrobbleCoordinator::new(None, 50);
        coordinator.begin(&track());
        let mut second = track();
        second.title = "Other".into();
        coordinator.begin(&second);
        assert_eq!(coordinator.pending().map(|p| p.title.as_str()), Some("Other"));
    }

    #[tokio::test]
    async fn test_discarded_record_is_never_submitted() {
        let history = Arc::new(RecordingHistory::default());
        let mut coordinator = ScrobbleCoordinator::new(Some(history.clone()), 50);
        let (mut term, _tx, _buf) = scripted_term();
        coordinator.begin(&track());
        coordinator.discard();
        assert!(coordinator.pending().is_none());
        assert!(!coordinator.finalize(&status(180.0, 170.0), &mut term).await);
        assert!(history.submitted.lock().unwrap().is_empty());
    }
}
