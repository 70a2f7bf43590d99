//! Music collections
//!
//! Keeps track of named tracks and which one is playing. Nothing here decodes
//! or outputs audio; `Music` only holds playback state.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while loading a collection manifest
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("Failed to read playlist: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid playlist manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// Playback state of a track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// A named track
#[derive(Debug, Clone, PartialEq)]
pub struct Music {
    name: String,
    src: String,
    volume: f64,
    muted: bool,
    state: PlaybackState,
}

impl Music {
    pub fn new(name: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            src: src.into(),
            volume: 1.0,
            muted: false,
            state: PlaybackState::Stopped,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source path of the audio file
    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Sets the volume, clamped to `0.0..=1.0`
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// True unless the track is playing
    pub fn paused(&self) -> bool {
        self.state != PlaybackState::Playing
    }

    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Pauses and rewinds to the start
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
    }
}

/// Tracks by name, with at most one current track
#[derive(Debug, Default)]
pub struct MusicCollection {
    tracks: HashMap<String, Music>,
    current: Option<String>,
}

impl MusicCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a track. A name already present is logged and left untouched.
    pub fn add(&mut self, music: Music) -> bool {
        if self.tracks.contains_key(music.name()) {
            warn!("There is already a music with {}", music.name());
            return false;
        }
        self.tracks.insert(music.name.clone(), music);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Music> {
        self.tracks.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Music> {
        self.tracks.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// The current track, if any
    pub fn current(&self) -> Option<&Music> {
        self.current.as_deref().and_then(|name| self.tracks.get(name))
    }

    /// Stops the current track and plays `name`.
    ///
    /// An unknown name leaves no track current.
    pub fn play(&mut self, name: &str) {
        self.stop_current();
        self.current = self.tracks.contains_key(name).then(|| name.to_string());
        if let Some(music) = self.current_mut() {
            debug!(track = %music.name, "Playing");
            music.play();
        }
    }

    pub fn pause(&mut self) {
        if let Some(music) = self.current_mut() {
            music.pause();
        }
    }

    /// Stops the current track and clears it
    pub fn stop(&mut self) {
        self.stop_current();
        self.current = None;
    }

    fn stop_current(&mut self) {
        if let Some(music) = self.current_mut() {
            music.stop();
        }
    }

    fn current_mut(&mut self) -> Option<&mut Music> {
        let name = self.current.as_deref()?;
        self.tracks.get_mut(name)
    }
}

/// Loads a collection from a JSON manifest of `{ "name": "source" }` pairs
pub async fn load_collection(path: impl AsRef<Path>) -> Result<MusicCollection, PlaylistError> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    let manifest: BTreeMap<String, String> = serde_json::from_str(&content)?;

    let mut collection = MusicCollection::new();
    for (name, src) in manifest {
        collection.add(Music::new(name, src));
    }
    Ok(collection)
}
