use crate::models::{Playlist, Track};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no track with id '{0}' in the playlist")]
    UnknownTrack(String),

    #[error("track '{track}' has no alternative '{alternative}'")]
    UnknownAlternative { track: String, alternative: String },
}

/// Where the current main track of a slot came from, so swapping back restores the list exactly
#[derive(Debug, Clone, PartialEq, Eq)]
struct SwapRecord {
    demoted_id: String,
    promoted_from: usize,
}

/// The working set of generated tracks and which of them the user keeps
#[derive(Debug, Default)]
pub struct SelectionStore {
    playlist_name: String,
    tracks: Vec<Track>,
    selected: HashSet<String>,
    swaps: Vec<Option<SwapRecord>>, // parallel to `tracks`
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the working set with a freshly generated playlist, every track selected
    pub fn initialize(&mut self, playlist: &Playlist) {
        self.playlist_name = playlist.name.clone();
        self.tracks = playlist.tracks.clone();
        self.selected = self.tracks.iter().map(|track| track.id.clone()).collect();
        self.swaps = vec![None; self.tracks.len()];
        debug!(tracks = self.tracks.len(), name = %self.playlist_name, "selection initialized");
    }

    /// Forget everything (start over)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn playlist_name(&self) -> &str {
        &self.playlist_name
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    fn has_main_track(&self, id: &str) -> bool {
        self.tracks.iter().any(|track| track.id == id)
    }

    /// Flip selection of a main track. Returns the new membership; unknown ids change nothing.
    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.has_main_track(id) {
            debug!(id, "toggle ignored for unknown track");
            return false;
        }

        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    /// Promote `alternative_id` into the slot held by `original_id`.
    ///
    /// The outgoing main track becomes the last alternative of the slot, unless this swap
    /// reverses the previous one on the same slot, in which case it goes back to the index the
    /// promoted track originally had. Selection follows the slot: the new main track is selected
    /// only if the old one was.
    pub fn substitute(
        &mut self,
        original_id: &str,
        alternative_id: &str,
    ) -> Result<(), SelectionError> {
        let position = self
            .tracks
            .iter()
            .position(|track| track.id == original_id)
            .ok_or_else(|| SelectionError::UnknownTrack(original_id.to_string()))?;

        let alt_index = self.tracks[position]
            .alternatives
            .iter()
            .position(|alt| alt.id == alternative_id)
            .ok_or_else(|| SelectionError::UnknownAlternative {
                track: original_id.to_string(),
                alternative: alternative_id.to_string(),
            })?;

        let was_selected = self.selected.contains(original_id);

        let slot = &mut self.tracks[position];
        let mut alternatives = std::mem::take(&mut slot.alternatives);
        let promoted = alternatives.remove(alt_index);
        let demoted = slot.demote();

        let reverting = matches!(
            &self.swaps[position],
            Some(record) if record.demoted_id == promoted.id
        );

        if reverting {
            let index = self.swaps[position]
                .take()
                .map_or(alternatives.len(), |record| record.promoted_from)
                .min(alternatives.len());
            alternatives.insert(index, demoted);
        } else {
            alternatives.push(demoted);
            self.swaps[position] = Some(SwapRecord {
                demoted_id: original_id.to_string(),
                promoted_from: alt_index,
            });
        }

        let promoted_id = promoted.id.clone();
        self.tracks[position] = promoted.promote(alternatives);

        if was_selected {
            self.selected.insert(promoted_id.clone());
        }
        self.retain_present();

        debug!(
            slot = position,
            from = original_id,
            to = %promoted_id,
            selected = was_selected,
            "alternative promoted"
        );
        Ok(())
    }

    // Another slot may still carry the id that just left this one
    fn retain_present(&mut self) {
        let present: HashSet<&str> = self.tracks.iter().map(|track| track.id.as_str()).collect();
        self.selected.retain(|id| present.contains(id.as_str()));
    }

    /// Ids of the selected main tracks, in slot order
    pub fn commit_selection(&self) -> Vec<String> {
        self.tracks
            .iter()
            .filter(|track| self.selected.contains(&track.id))
            .map(|track| track.id.clone())
            .collect()
    }
}
