use std::collections::VecDeque;

use crate::dto::track::Track;

/// Pending tracks in arrival order.
///
/// The queue holds only fully resolved tracks; resolution happens before a
/// track is handed to the command loop. All access goes through that loop,
/// which serializes mutation against snapshots.
#[derive(Debug, Default)]
pub(crate) struct TrackQueue {
    tracks: VecDeque<Track>,
}

impl TrackQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, track: Track) {
        self.tracks.push_back(track);
    }

    /// Removes and returns the oldest pending track (FIFO: playback order is
    /// arrival order).
    pub(crate) fn take_next(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    pub(crate) fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Owned copy of the pending titles, in play order, for display.
    pub(crate) fn titles(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.title.clone()).collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.tracks.len()
    }
}
