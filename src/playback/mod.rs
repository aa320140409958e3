// Playback side of the pipeline
// One queue per voice destination, each behind its own lock

pub mod queue;    // FIFO queue + player state machine + auto-play
pub mod sessions; // destination registry and validity handles

pub use queue::{Enqueued, PlaybackQueue, Skipped};
pub use sessions::{VoiceDestination, VoiceSessions};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::PlaybackError;
use crate::mood::MoodLabel;
use crate::search::ResolvedTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// Opaque key for a voice session (guild, channel, room...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DestinationId(String);

impl DestinationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DestinationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DestinationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for DestinationId {
    fn from(id: u64) -> Self {
        Self::new(id.to_string())
    }
}

/// Tracks produced by one trigger. Only found tracks make it in.
#[derive(Debug)]
pub struct Playlist {
    pub id: Uuid,
    pub mood: MoodLabel,
    pub created_at: DateTime<Utc>,
    tracks: Vec<Arc<ResolvedTrack>>,
}

impl Playlist {
    pub fn from_resolved(mood: MoodLabel, resolved: &[ResolvedTrack]) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            mood,
            created_at: Utc::now(),
            tracks: resolved
                .iter()
                .filter(|t| t.is_found())
                .cloned()
                .map(Arc::new)
                .collect(),
        })
    }

    pub fn tracks(&self) -> &[Arc<ResolvedTrack>] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Queue entries in playlist order
    pub fn entries(self: &Arc<Self>) -> Vec<QueueEntry> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(position, track)| QueueEntry {
                track: Arc::clone(track),
                position,
                playlist: Arc::clone(self),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub track: Arc<ResolvedTrack>,
    pub position: usize, // within the owning playlist
    pub playlist: Arc<Playlist>,
}

impl QueueEntry {
    pub fn title(&self) -> &str {
        self.track.title()
    }

    /// Same playlist slot, not just an equal-looking track
    pub fn same_as(&self, other: &QueueEntry) -> bool {
        self.playlist.id == other.playlist.id && self.position == other.position
    }
}

/// The voice transport. Calls are scoped to one destination.
#[async_trait]
pub trait PlaybackCollaborator: Send + Sync {
    async fn play(&self, destination: &DestinationId, track: &ResolvedTrack) -> Result<(), PlaybackError>;
    async fn pause(&self, destination: &DestinationId) -> Result<(), PlaybackError>;
    async fn resume(&self, destination: &DestinationId) -> Result<(), PlaybackError>;
    async fn stop(&self, destination: &DestinationId) -> Result<(), PlaybackError>;
    async fn set_volume(&self, destination: &DestinationId, volume: u8) -> Result<(), PlaybackError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Play(String, String),
        Pause(String),
        Resume(String),
        Stop(String),
        Volume(String, u8),
    }

    /// Records every call; titles listed in `broken` fail to play
    #[derive(Default)]
    pub struct RecordingPlayer {
        calls: Mutex<Vec<Call>>,
        broken: HashSet<String>,
    }

    impl RecordingPlayer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(titles: &[&str]) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                broken: titles.iter().map(|t| t.to_string()).collect(),
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn played(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Play(_, title) => Some(title),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl PlaybackCollaborator for RecordingPlayer {
        async fn play(&self, destination: &DestinationId, track: &ResolvedTrack) -> Result<(), PlaybackError> {
            self.record(Call::Play(destination.to_string(), track.title().to_string()));
            if self.broken.contains(track.title()) {
                return Err(PlaybackError::Source(track.title().to_string()));
            }
            Ok(())
        }

        async fn pause(&self, destination: &DestinationId) -> Result<(), PlaybackError> {
            self.record(Call::Pause(destination.to_string()));
            Ok(())
        }

        async fn resume(&self, destination: &DestinationId) -> Result<(), PlaybackError> {
            self.record(Call::Resume(destination.to_string()));
            Ok(())
        }

        async fn stop(&self, destination: &DestinationId) -> Result<(), PlaybackError> {
            self.record(Call::Stop(destination.to_string()));
            Ok(())
        }

        async fn set_volume(&self, destination: &DestinationId, volume: u8) -> Result<(), PlaybackError> {
            self.record(Call::Volume(destination.to_string(), volume));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::search::{SearchHit, TrackQuery};

    #[test]
    fn test_playlist_keeps_only_found_tracks() {
        let q = |i: usize| TrackQuery::new(format!("q{}", i), MoodLabel::Calm, i);
        let hit = |i: usize| SearchHit {
            id: format!("id{}", i),
            title: format!("t{}", i),
            url: String::new(),
            duration: None,
        };
        let resolved = vec![
            ResolvedTrack::found(&q(0), hit(0)),
            ResolvedTrack::not_found(&q(1)),
            ResolvedTrack::failed(&q(2), SearchError::Timeout),
            ResolvedTrack::found(&q(3), hit(3)),
        ];

        let playlist = Playlist::from_resolved(MoodLabel::Calm, &resolved);
        assert_eq!(playlist.len(), 2);

        let entries = playlist.entries();
        assert_eq!(entries[0].title(), "t0");
        assert_eq!(entries[1].title(), "t3");
        assert_eq!(entries[1].position, 1);
        assert!(entries[0].same_as(&entries[0].clone()));
        assert!(!entries[0].same_as(&entries[1]));
    }

    #[test]
    fn test_destination_id_conversions() {
        assert_eq!(DestinationId::from(42u64).as_str(), "42");
        assert_eq!(DestinationId::from("guild-7").to_string(), "guild-7");
    }
}
