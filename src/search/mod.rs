// Track resolution - turns text queries into playable track references
// The search provider is slow and flaky, so every slot carries its own typed outcome

pub mod resolver; // concurrent, order-preserving batch resolution

#[cfg(test)]
pub(crate) mod testing;

pub use resolver::ParallelResolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SearchError;
use crate::mood::MoodLabel;

/// One search string inside a suggestion batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackQuery {
    pub text: String,
    pub mood: MoodLabel,
    pub position: usize, // ordinal within the batch
}

impl TrackQuery {
    pub fn new(text: impl Into<String>, mood: MoodLabel, position: usize) -> Self {
        Self {
            text: text.into(),
            mood,
            position,
        }
    }
}

/// What a search provider hands back for a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration: Option<Duration>,
}

/// External search capability. Treated as slow and unreliable.
///
/// `Ok(None)` means the provider answered and found nothing, which is different
/// from a failure.
#[async_trait]
pub trait SearchCollaborator: Send + Sync {
    async fn search(&self, query: &TrackQuery) -> Result<Option<SearchHit>, SearchError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ResolutionStatus {
    Found,
    NotFound,
    Error(SearchError),
}

/// Result of resolving one query. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    id: String,
    title: String,
    url: String,
    duration: Option<Duration>,
    query: String,
    position: usize,
    status: ResolutionStatus,
}

impl ResolvedTrack {
    pub fn found(query: &TrackQuery, hit: SearchHit) -> Self {
        Self {
            id: hit.id,
            title: hit.title,
            url: hit.url,
            duration: hit.duration,
            query: query.text.clone(),
            position: query.position,
            status: ResolutionStatus::Found,
        }
    }

    pub fn not_found(query: &TrackQuery) -> Self {
        Self::unresolved(query, ResolutionStatus::NotFound)
    }

    pub fn failed(query: &TrackQuery, error: SearchError) -> Self {
        Self::unresolved(query, ResolutionStatus::Error(error))
    }

    fn unresolved(query: &TrackQuery, status: ResolutionStatus) -> Self {
        Self {
            id: String::new(),
            title: query.text.clone(),
            url: String::new(),
            duration: None,
            query: query.text.clone(),
            position: query.position,
            status,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// The query text this track answers
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn status(&self) -> &ResolutionStatus {
        &self.status
    }

    pub fn is_found(&self) -> bool {
        matches!(self.status, ResolutionStatus::Found)
    }

    /// `m:ss`, `h:mm:ss`, or `?:??` when the length is unknown
    pub fn duration_display(&self) -> String {
        match self.duration.map(|d| d.as_secs()) {
            Some(secs) if secs > 0 => {
                let hours = secs / 3600;
                let minutes = (secs % 3600) / 60;
                let seconds = secs % 60;
                if hours > 0 {
                    format!("{}:{:02}:{:02}", hours, minutes, seconds)
                } else {
                    format!("{}:{:02}", minutes, seconds)
                }
            }
            _ => "?:??".to_string(),
        }
    }
}
