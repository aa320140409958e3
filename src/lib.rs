// moodpipe library - mood message -> resolved playlist -> voice queue
// Each stage is its own module so transports and providers can be swapped

pub mod config;       // settings and defaults
pub mod demo;         // offline search + logging transport
pub mod error;        // error taxonomy
pub mod logging;      // tracing setup
pub mod mood;         // classification and suggestions
pub mod orchestrator; // the end-to-end flow
pub mod playback;     // per-destination queues
pub mod search;       // parallel track resolution

// Export the stuff callers actually use
pub use config::Config;
pub use error::{FlowError, PlaybackError, QueueError, SearchError};
pub use mood::{MoodCatalog, MoodClassifier, MoodLabel, PlaylistSuggester};
pub use orchestrator::{FlowSettings, MoodOutcome, OrchestrationController};
pub use playback::{
    DestinationId, PlaybackCollaborator, PlaybackQueue, PlayerState, Playlist, QueueEntry,
    VoiceDestination, VoiceSessions,
};
pub use search::{ParallelResolver, ResolutionStatus, ResolvedTrack, SearchCollaborator, SearchHit, TrackQuery};
