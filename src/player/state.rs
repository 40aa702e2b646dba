//! Player reducer

use rand::seq::SliceRandom;
use rand::Rng;

use super::PlaybackMode;
use crate::constants::{HISTORY_SIZE, PREFETCH_THRESHOLD};
use crate::storage::Preferences;
use crate::tracks::{Track, VideoId};

pub const NO_MORE_SONGS: &str = "No more songs available";
pub const NEXT_SONG_FAILED: &str = "Failed to find next song";

/// Input to [`PlayerState::dispatch`]: user intents and audio element events
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Play and/or enqueue a track. Tracks already queued are not duplicated.
    Play {
        track: Track,
        enqueue: bool,
        play_now: bool,
    },
    Enqueue(Track),
    Remove(VideoId),
    ClearQueue,
    ShuffleQueue,
    PlayAt(usize),
    Next,
    Previous,
    SetMode(PlaybackMode),
    SetVolume(f32),
    ToggleMute,
    Seek(f64),
    TogglePlay,

    MetadataLoaded { duration: f64 },
    TimeUpdate { position: f64 },
    Started,
    Paused,
    Ended,
    PlaybackFailed(String),

    /// Related tracks arrived. `for_next` marks the fetch that was started
    /// because the queue ran out, as opposed to a background prefetch.
    RelatedLoaded {
        seed: VideoId,
        tracks: Vec<Track>,
        for_next: bool,
    },
    RelatedFailed { seed: VideoId, for_next: bool },
    DismissError,
}

/// Work the reducer asks its driver to perform
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Point the audio element at this track and start it
    Load(Track),
    /// Restart the current track from zero
    Replay,
    Resume,
    Pause,
    Seek(f64),
    ApplyVolume(f32),
    /// Queue exhausted: fetch related tracks and play the first new one
    FetchRelated { seed: VideoId, query: String },
    /// Top up a short queue in the background
    PrefetchRelated { seed: VideoId },
    Persist(Preferences),
}

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub current: Option<Track>,
    /// Position of `current` in `queue`, if it is queued
    pub current_index: Option<usize>,
    pub queue: Vec<Track>,
    /// Recently started tracks, oldest first
    pub history: Vec<Track>,
    pub mode: PlaybackMode,
    pub volume: f32,
    pub muted: bool,
    pub progress: f64,
    pub duration: f64,
    pub playing: bool,
    pub loading: bool,
    pub error: Option<String>,
    /// Seed of the related fetch that will pick the next track
    pub awaiting_next: Option<VideoId>,
    prefetched_for: Option<VideoId>,
}

impl PlayerState {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            current: None,
            current_index: None,
            queue: Vec::new(),
            history: Vec::new(),
            mode: prefs.mode,
            volume: prefs.volume,
            muted: false,
            progress: 0.0,
            duration: 0.0,
            playing: false,
            loading: false,
            error: None,
            awaiting_next: None,
            prefetched_for: None,
        }
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            volume: self.volume,
            mode: self.mode,
        }
    }

    /// Volume the audio element should actually use
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    fn current_id(&self) -> Option<&VideoId> {
        self.current.as_ref().map(|t| &t.video_id)
    }

    fn position(&self, id: &VideoId) -> Option<usize> {
        self.queue.iter().position(|t| &t.video_id == id)
    }

    pub fn dispatch<R: Rng + ?Sized>(&mut self, action: Action, rng: &mut R) -> Vec<Effect> {
        match action {
            Action::Play {
                track,
                enqueue,
                play_now,
            } => {
                let index = match self.position(&track.video_id) {
                    Some(i) => Some(i),
                    None if enqueue => {
                        self.queue.push(track.clone());
                        Some(self.queue.len() - 1)
                    }
                    None => None,
                };
                if play_now {
                    self.load(track, index)
                } else {
                    vec![]
                }
            }
            Action::Enqueue(track) => {
                if self.position(&track.video_id).is_none() {
                    self.queue.push(track);
                }
                vec![]
            }
            Action::Remove(id) => {
                self.queue.retain(|t| t.video_id != id);
                if self.current_id() == Some(&id) {
                    self.current = None;
                    self.current_index = None;
                    self.playing = false;
                    self.loading = false;
                    self.progress = 0.0;
                    self.duration = 0.0;
                    return vec![Effect::Pause];
                }
                self.current_index = self.current_id().cloned().and_then(|id| self.position(&id));
                vec![]
            }
            Action::ClearQueue => {
                self.queue.clear();
                self.current = None;
                self.current_index = None;
                self.playing = false;
                self.loading = false;
                self.awaiting_next = None;
                self.progress = 0.0;
                self.duration = 0.0;
                vec![Effect::Pause]
            }
            Action::ShuffleQueue => {
                let current = self.current.clone();
                let mut rest: Vec<Track> = self
                    .queue
                    .drain(..)
                    .filter(|t| Some(&t.video_id) != current.as_ref().map(|c| &c.video_id))
                    .collect();
                rest.shuffle(rng);
                match current {
                    Some(track) => {
                        self.queue.push(track);
                        self.queue.extend(rest);
                        self.current_index = Some(0);
                    }
                    None => {
                        self.queue = rest;
                        self.current_index = None;
                    }
                }
                vec![]
            }
            Action::PlayAt(index) => match self.queue.get(index).cloned() {
                Some(track) => self.load(track, Some(index)),
                None => vec![],
            },
            Action::Next => self.advance(rng),
            Action::Previous => self.previous(),
            Action::SetMode(mode) => {
                self.mode = mode;
                vec![Effect::Persist(self.preferences())]
            }
            Action::SetVolume(volume) => {
                if !volume.is_finite() {
                    return vec![];
                }
                self.volume = volume.clamp(0.0, 1.0);
                self.muted = false;
                vec![
                    Effect::ApplyVolume(self.volume),
                    Effect::Persist(self.preferences()),
                ]
            }
            Action::ToggleMute => {
                self.muted = !self.muted;
                vec![Effect::ApplyVolume(self.effective_volume())]
            }
            Action::Seek(position) => {
                if self.current.is_none() || !position.is_finite() {
                    return vec![];
                }
                let mut position = position.max(0.0);
                if self.duration > 0.0 {
                    position = position.min(self.duration);
                }
                self.progress = position;
                vec![Effect::Seek(position)]
            }
            Action::TogglePlay => match (&self.current, self.playing) {
                (None, _) => vec![],
                (Some(_), true) => vec![Effect::Pause],
                (Some(_), false) => vec![Effect::Resume],
            },
            Action::MetadataLoaded { duration } => {
                self.duration = if duration.is_finite() && duration > 0.0 {
                    duration
                } else {
                    0.0
                };
                vec![]
            }
            Action::TimeUpdate { position } => {
                if position.is_finite() {
                    self.progress = position.max(0.0);
                }
                vec![]
            }
            Action::Started => self.started(),
            Action::Paused => {
                self.playing = false;
                vec![]
            }
            Action::Ended => {
                self.playing = false;
                self.advance(rng)
            }
            Action::PlaybackFailed(message) => {
                self.playing = false;
                self.loading = false;
                self.error = Some(message);
                vec![Effect::Pause]
            }
            Action::RelatedLoaded {
                seed,
                tracks,
                for_next,
            } => self.related_loaded(seed, tracks, for_next),
            Action::RelatedFailed { seed, for_next } => {
                if for_next && self.awaiting_next.as_ref() == Some(&seed) {
                    self.awaiting_next = None;
                    self.loading = false;
                    self.error = Some(NEXT_SONG_FAILED.to_string());
                }
                vec![]
            }
            Action::DismissError => {
                self.error = None;
                vec![]
            }
        }
    }

    fn load(&mut self, track: Track, index: Option<usize>) -> Vec<Effect> {
        self.current = Some(track.clone());
        self.current_index = index;
        self.loading = true;
        self.error = None;
        self.progress = 0.0;
        self.duration = 0.0;
        self.awaiting_next = None;
        vec![Effect::Load(track)]
    }

    /// Move on after `Ended` or `Next`
    fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<Effect> {
        if self.mode == PlaybackMode::RepeatOne && self.current.is_some() {
            self.progress = 0.0;
            return vec![Effect::Replay];
        }

        if let Some(index) = self.next_index(rng) {
            let track = self.queue[index].clone();
            return self.load(track, Some(index));
        }

        // Queue exhausted
        let Some(current) = self.current.clone() else {
            return vec![];
        };
        if self.awaiting_next.is_some() {
            return vec![];
        }
        self.awaiting_next = Some(current.video_id.clone());
        self.loading = true;
        self.error = None;
        vec![Effect::FetchRelated {
            seed: current.video_id.clone(),
            query: current.related_query(),
        }]
    }

    fn next_index<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let len = self.queue.len();
        if self.mode == PlaybackMode::Shuffle {
            let candidates: Vec<usize> = (0..len).filter(|&i| Some(i) != self.current_index).collect();
            return candidates.choose(rng).copied();
        }
        let next = self.current_index.map_or(0, |i| i + 1);
        if next < len {
            Some(next)
        } else if self.mode == PlaybackMode::Repeat && len > 0 {
            Some(0)
        } else {
            None
        }
    }

    fn previous(&mut self) -> Vec<Effect> {
        if let Some(index) = self.current_index.filter(|&i| i > 0) {
            if let Some(track) = self.queue.get(index - 1).cloned() {
                return self.load(track, Some(index - 1));
            }
        }
        let current = self.current_id().cloned();
        let fallback = self
            .history
            .iter()
            .rev()
            .find(|t| Some(&t.video_id) != current.as_ref())
            .cloned();
        match fallback {
            Some(track) => {
                let index = self.position(&track.video_id);
                self.load(track, index)
            }
            None => vec![],
        }
    }

    fn started(&mut self) -> Vec<Effect> {
        self.playing = true;
        self.loading = false;
        let Some(current) = self.current.clone() else {
            return vec![];
        };

        if !self.history.iter().any(|t| t.video_id == current.video_id) {
            self.history.push(current.clone());
            if self.history.len() > HISTORY_SIZE {
                let excess = self.history.len() - HISTORY_SIZE;
                self.history.drain(..excess);
            }
        }

        if self.queue.len() <= PREFETCH_THRESHOLD
            && self.prefetched_for.as_ref() != Some(&current.video_id)
        {
            self.prefetched_for = Some(current.video_id.clone());
            return vec![Effect::PrefetchRelated {
                seed: current.video_id,
            }];
        }
        vec![]
    }

    fn related_loaded(&mut self, seed: VideoId, tracks: Vec<Track>, for_next: bool) -> Vec<Effect> {
        let first_new = self.queue.len();
        for track in tracks {
            let known = self.position(&track.video_id).is_some()
                || self.history.iter().any(|t| t.video_id == track.video_id)
                || self.current_id() == Some(&track.video_id);
            if !known {
                self.queue.push(track);
            }
        }
        tracing::debug!(
            "Appended {} related tracks for {}",
            self.queue.len() - first_new,
            seed
        );

        // A prefetch landing while the next fetch is in flight only tops up
        if !for_next || self.awaiting_next.as_ref() != Some(&seed) {
            return vec![];
        }
        self.awaiting_next = None;
        match self.queue.get(first_new).cloned() {
            Some(track) => self.load(track, Some(first_new)),
            None => {
                self.loading = false;
                self.error = Some(NO_MORE_SONGS.to_string());
                vec![]
            }
        }
    }
}
