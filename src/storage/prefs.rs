//! Volume and playback mode

use super::{load_json, save_json, KeyValueStore, PLAYBACK_MODE_KEY, VOLUME_KEY};
use crate::constants::DEFAULT_VOLUME;
use crate::error::StorageError;
use crate::player::PlaybackMode;

/// Player settings restored on startup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preferences {
    pub volume: f32,
    pub mode: PlaybackMode,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            mode: PlaybackMode::Normal,
        }
    }
}

impl Preferences {
    /// Missing or unreadable values fall back to their defaults individually
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();
        let volume = match load_json::<f32>(store, VOLUME_KEY) {
            Ok(Some(v)) if v.is_finite() => v.clamp(0.0, 1.0),
            Ok(_) => defaults.volume,
            Err(e) => {
                tracing::warn!("Ignoring stored volume: {}", e);
                defaults.volume
            }
        };
        let mode = match store.get(PLAYBACK_MODE_KEY) {
            Ok(Some(raw)) => parse_mode(&raw).unwrap_or_else(|| {
                tracing::warn!("Ignoring stored playback mode {:?}", raw);
                defaults.mode
            }),
            Ok(None) => defaults.mode,
            Err(e) => {
                tracing::warn!("Failed to read playback mode: {}", e);
                defaults.mode
            }
        };
        Self { volume, mode }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StorageError> {
        save_json(store, VOLUME_KEY, &self.volume)?;
        save_json(store, PLAYBACK_MODE_KEY, &self.mode)
    }
}

/// Accepts the JSON string form and the bare name
fn parse_mode(raw: &str) -> Option<PlaybackMode> {
    serde_json::from_str(raw)
        .ok()
        .or_else(|| raw.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults_when_empty() {
        let prefs = Preferences::load(&MemoryStore::new());
        assert_eq!(prefs, Preferences::default());
        assert!((prefs.volume - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let prefs = Preferences {
            volume: 0.25,
            mode: PlaybackMode::RepeatOne,
        };
        prefs.save(&store).unwrap();
        assert_eq!(store.get(PLAYBACK_MODE_KEY).unwrap().as_deref(), Some("\"repeat-one\""));
        assert_eq!(Preferences::load(&store), prefs);
    }

    #[test]
    fn test_lenient_values() {
        let store = MemoryStore::new();
        store.set(VOLUME_KEY, "3.5").unwrap();
        store.set(PLAYBACK_MODE_KEY, "shuffle").unwrap();
        let prefs = Preferences::load(&store);
        assert_eq!(prefs.volume, 1.0);
        assert_eq!(prefs.mode, PlaybackMode::Shuffle);

        store.set(VOLUME_KEY, "loud").unwrap();
        store.set(PLAYBACK_MODE_KEY, "sideways").unwrap();
        assert_eq!(Preferences::load(&store), Preferences::default());
    }
}
