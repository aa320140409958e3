// Error types for the mood pipeline
// Per-slot search failures stay local, queue errors are fatal to one flow only

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::playback::PlayerState;

/// Failure of a single search call. Never escapes the resolver, it ends up
/// recorded in the slot's `ResolutionStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SearchError {
    #[error("search timed out")]
    Timeout,

    #[error("search provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("search failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The destination's playback session is gone (disconnected or poisoned lock)
    #[error("playback queue for '{destination}' is unavailable")]
    Unavailable { destination: String },

    /// Internal queue invariants were observed broken. Points at a locking bug.
    #[error("enqueue race lost on '{destination}': queue state is inconsistent")]
    EnqueueRaceLost { destination: String },

    #[error("cannot {action} while {from:?}")]
    InvalidTransition { from: PlayerState, action: &'static str },

    #[error("no pending entry at position {0}")]
    NoSuchPosition(usize),
}

/// Why a triggered flow produced no playback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("not in voice")]
    NotInVoiceDestination,

    #[error("nothing found")]
    NoTracksResolved,

    #[error("voice session ended")]
    Cancelled,

    #[error("queue unavailable: {0}")]
    Queue(#[from] QueueError),
}

impl FlowError {
    /// Short user-facing reason carried in the outcome
    pub fn reason(&self) -> String {
        match self {
            FlowError::Queue(_) => "queue unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("voice transport rejected the request: {0}")]
    Transport(String),

    #[error("track source could not be streamed: {0}")]
    Source(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_reasons() {
        assert_eq!(FlowError::NotInVoiceDestination.reason(), "not in voice");
        assert_eq!(FlowError::NoTracksResolved.reason(), "nothing found");

        let queue = FlowError::from(QueueError::Unavailable { destination: "guild-1".into() });
        assert_eq!(queue.reason(), "queue unavailable");
    }
}
