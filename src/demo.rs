// Offline stand-ins for the search provider and the voice transport
// Lets the binary run the whole pipeline without network or audio

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::info;

use crate::error::{PlaybackError, SearchError};
use crate::playback::{DestinationId, PlaybackCollaborator};
use crate::search::{ResolvedTrack, SearchCollaborator, SearchHit, TrackQuery};

/// Treats every "Title - Artist" query as a hit. Anything else finds nothing.
pub struct CatalogSearch {
    pattern: Regex,
    latency: Duration,
}

impl CatalogSearch {
    pub fn new(latency: Duration) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(r"^\s*(.+?)\s+-\s+(.+?)\s*$")?,
            latency,
        })
    }

    fn slug(text: &str) -> String {
        text.to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[async_trait]
impl SearchCollaborator for CatalogSearch {
    async fn search(&self, query: &TrackQuery) -> Result<Option<SearchHit>, SearchError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let Some(captures) = self.pattern.captures(&query.text) else {
            return Ok(None);
        };
        let title = &captures[1];
        let artist = &captures[2];
        let id = Self::slug(&query.text);

        Ok(Some(SearchHit {
            url: format!("https://music.example/watch?v={}", id),
            id,
            title: format!("{} - {}", title, artist),
            duration: Some(Duration::from_secs(180 + (title.len() as u64 * 7) % 120)),
        }))
    }
}

/// Logs what a real voice transport would do
#[derive(Debug, Default)]
pub struct LoggingPlayer;

#[async_trait]
impl PlaybackCollaborator for LoggingPlayer {
    async fn play(&self, destination: &DestinationId, track: &ResolvedTrack) -> Result<(), PlaybackError> {
        info!(%destination, url = track.url(), "▶ {} [{}]", track.title(), track.duration_display());
        Ok(())
    }

    async fn pause(&self, destination: &DestinationId) -> Result<(), PlaybackError> {
        info!(%destination, "⏸ paused");
        Ok(())
    }

    async fn resume(&self, destination: &DestinationId) -> Result<(), PlaybackError> {
        info!(%destination, "▶ resumed");
        Ok(())
    }

    async fn stop(&self, destination: &DestinationId) -> Result<(), PlaybackError> {
        info!(%destination, "⏹ stopped");
        Ok(())
    }

    async fn set_volume(&self, destination: &DestinationId, volume: u8) -> Result<(), PlaybackError> {
        info!(%destination, volume, "volume changed");
        Ok(())
    }
}
