//! Client-side player
//!
//! [`PlayerState`] is a pure reducer: actions in, effects out. [`Session`]
//! drives it, persisting preferences and fetching related tracks in the
//! background.

pub mod session;
pub mod state;

pub use session::{ApiClient, RelatedSource, Session};
pub use state::{Action, Effect, PlayerState};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What happens when a track ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackMode {
    #[default]
    Normal,
    /// Wrap to the start of the queue
    Repeat,
    /// Replay the current track
    RepeatOne,
    /// Random track from the queue, never the current one
    Shuffle,
}

impl PlaybackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackMode::Normal => "normal",
            PlaybackMode::Repeat => "repeat",
            PlaybackMode::RepeatOne => "repeat-one",
            PlaybackMode::Shuffle => "shuffle",
        }
    }
}

impl FromStr for PlaybackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(PlaybackMode::Normal),
            "repeat" => Ok(PlaybackMode::Repeat),
            "repeat-one" => Ok(PlaybackMode::RepeatOne),
            "shuffle" => Ok(PlaybackMode::Shuffle),
            other => Err(format!("unknown playback mode: {other}")),
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
