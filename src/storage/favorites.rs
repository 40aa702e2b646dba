//! Favorite tracks

use std::sync::Arc;

use super::{load_or_default, save_json, KeyValueStore, FAVORITES_KEY};
use crate::error::StorageError;
use crate::tracks::{Track, VideoId};

/// Favorites, newest last, unique by `video_id`. Every change is written
/// through to the store.
pub struct Favorites {
    store: Arc<dyn KeyValueStore>,
    tracks: Vec<Track>,
}

impl Favorites {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let tracks = load_or_default(store.as_ref(), FAVORITES_KEY);
        Self { store, tracks }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn contains(&self, id: &VideoId) -> bool {
        self.tracks.iter().any(|t| &t.video_id == id)
    }

    /// Returns false when the track was already a favorite
    pub fn add(&mut self, track: Track) -> Result<bool, StorageError> {
        if self.contains(&track.video_id) {
            return Ok(false);
        }
        self.tracks.push(track);
        self.save()?;
        Ok(true)
    }

    pub fn remove(&mut self, id: &VideoId) -> Result<bool, StorageError> {
        let before = self.tracks.len();
        self.tracks.retain(|t| &t.video_id != id);
        if self.tracks.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Add or remove; returns whether the track is a favorite afterwards
    pub fn toggle(&mut self, track: &Track) -> Result<bool, StorageError> {
        if self.contains(&track.video_id) {
            self.remove(&track.video_id)?;
            Ok(false)
        } else {
            self.add(track.clone())?;
            Ok(true)
        }
    }

    fn save(&self) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), FAVORITES_KEY, &self.tracks)
    }
}
