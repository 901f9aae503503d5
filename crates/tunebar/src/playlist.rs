use tunebar_proto::model::Track;

/// Forward-only playlist: the fetched tracks plus a cursor on the one playing.
#[derive(Debug, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    cursor: Option<usize>,
}

impl Playlist {
    /// Install a freshly fetched playlist with its first track current.
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.cursor = if tracks.is_empty() { None } else { Some(0) };
        self.tracks = tracks;
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.cursor = None;
    }

    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|i| self.tracks.get(i))
    }

    pub fn current_mut(&mut self) -> Option<&mut Track> {
        self.cursor.and_then(|i| self.tracks.get_mut(i))
    }

    /// Move past the current track.  Running off the end drops the consumed
    /// tracks and leaves the playlist exhausted.
    pub fn advance(&mut self) {
        match self.cursor {
            Some(i) if i + 1 < self.tracks.len() => self.cursor = Some(i + 1),
            _ => self.clear(),
        }
    }

    /// No current track; a new playlist is needed.
    pub fn is_exhausted(&self) -> bool {
        self.current().is_none()
    }

    /// Tracks queued after the current one.
    pub fn upcoming(&self) -> &[Track] {
        match self.cursor {
            Some(i) => &self.tracks[(i + 1).min(self.tracks.len())..],
            None => &[],
        }
    }
}
