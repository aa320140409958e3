// Orchestration - message in, playlist queued and playing out
// Runs detached from the chat reply; a torn-down voice session cancels it

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{FlowError, PlaybackError, QueueError};
use crate::mood::{MoodCatalog, MoodClassifier, MoodLabel, PlaylistSuggester};
use crate::playback::{PlaybackCollaborator, Playlist, QueueEntry, VoiceDestination};
use crate::search::{ParallelResolver, SearchCollaborator};

#[derive(Debug, Clone, PartialEq)]
pub struct FlowSettings {
    pub tracks_per_trigger: usize,
    pub per_task_timeout: Duration,
    pub overall_timeout: Duration,
    pub max_concurrency: Option<usize>,
}

impl From<&Config> for FlowSettings {
    fn from(config: &Config) -> Self {
        Self {
            tracks_per_trigger: config.playlist.tracks_per_trigger,
            per_task_timeout: config.resolver.per_task_timeout(),
            overall_timeout: config.resolver.overall_timeout(),
            max_concurrency: config.resolver.max_concurrency,
        }
    }
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// What the surrounding app gets back from a mood message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodOutcome {
    pub triggered: bool,
    pub mood: MoodLabel,
    pub enqueued_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<String>,
}

impl MoodOutcome {
    fn no_mood() -> Self {
        Self {
            triggered: false,
            mood: MoodLabel::None,
            enqueued_count: 0,
            reason: None,
            now_playing: None,
        }
    }

    fn rejected(mood: MoodLabel, error: &FlowError) -> Self {
        Self {
            triggered: false,
            mood,
            enqueued_count: 0,
            reason: Some(error.reason()),
            now_playing: None,
        }
    }

    fn failed(mood: MoodLabel, error: &FlowError) -> Self {
        Self {
            triggered: true,
            ..Self::rejected(mood, error)
        }
    }
}

struct FlowReport {
    enqueued: usize,
    now_playing: Option<String>,
}

/// Wires classifier, suggester, resolver and the per-destination queues together.
/// Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct OrchestrationController {
    classifier: Arc<MoodClassifier>,
    suggester: Arc<PlaylistSuggester>,
    resolver: Arc<ParallelResolver>,
    player: Arc<dyn PlaybackCollaborator>,
    settings: FlowSettings,
}

impl OrchestrationController {
    pub fn new(
        catalog: Arc<MoodCatalog>,
        search: Arc<dyn SearchCollaborator>,
        player: Arc<dyn PlaybackCollaborator>,
        settings: FlowSettings,
    ) -> Result<Self> {
        let classifier = MoodClassifier::new(&catalog)?;
        let resolver = ParallelResolver::new(search).with_max_concurrency(settings.max_concurrency);

        Ok(Self {
            classifier: Arc::new(classifier),
            suggester: Arc::new(PlaylistSuggester::new(catalog)),
            resolver: Arc::new(resolver),
            player,
            settings,
        })
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// Fire-and-forget entry point. The caller can drop the handle.
    pub fn spawn(&self, text: impl Into<String>, destination: Option<VoiceDestination>) -> JoinHandle<MoodOutcome> {
        let controller = self.clone();
        let text = text.into();
        tokio::spawn(async move { controller.handle_mood_message(&text, destination).await })
    }

    /// Classify the message and, if it carries a mood and the author is in voice,
    /// resolve a playlist for it and queue it on the destination.
    pub async fn handle_mood_message(&self, text: &str, destination: Option<VoiceDestination>) -> MoodOutcome {
        let mood = self.classifier.classify(text);
        if mood.is_none() {
            return MoodOutcome::no_mood();
        }

        let destination = match destination.filter(|d| d.is_valid()) {
            Some(destination) => destination,
            None => {
                info!(%mood, "Mood detected but author is not in voice");
                return MoodOutcome::rejected(mood, &FlowError::NotInVoiceDestination);
            }
        };

        match self.run_flow(mood, &destination).await {
            Ok(report) => {
                info!(
                    destination = %destination.id(),
                    %mood,
                    enqueued = report.enqueued,
                    "Mood playlist queued"
                );
                MoodOutcome {
                    triggered: true,
                    mood,
                    enqueued_count: report.enqueued,
                    reason: None,
                    now_playing: report.now_playing,
                }
            }
            Err(e) => {
                match &e {
                    FlowError::Queue(queue_error) => {
                        error!(destination = %destination.id(), "Mood flow failed: {}", queue_error)
                    }
                    other => warn!(destination = %destination.id(), %mood, "Mood flow ended: {}", other),
                }
                MoodOutcome::failed(mood, &e)
            }
        }
    }

    async fn run_flow(&self, mood: MoodLabel, destination: &VoiceDestination) -> Result<FlowReport, FlowError> {
        let cancel = destination.cancellation_token();
        let queries = self.suggester.suggest(mood, self.settings.tracks_per_trigger);
        debug!(%mood, queries = queries.len(), "resolving suggestions");

        // Dropping the resolve future aborts its search tasks
        let resolved = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FlowError::Cancelled),
            resolved = self.resolver.resolve(
                &queries,
                self.settings.per_task_timeout,
                self.settings.overall_timeout,
            ) => resolved,
        };

        let playlist = Playlist::from_resolved(mood, &resolved);
        if playlist.is_empty() {
            return Err(FlowError::NoTracksResolved);
        }
        if cancel.is_cancelled() {
            return Err(FlowError::Cancelled);
        }

        // The queue re-checks under its own lock, so a disconnect racing this
        // call either lands before (rejected) or after (queue closed with it)
        let enqueued = destination
            .queue()
            .enqueue(playlist.entries())
            .map_err(|e| match e {
                QueueError::Unavailable { .. } if cancel.is_cancelled() => FlowError::Cancelled,
                other => FlowError::Queue(other),
            })?;

        let now_playing = match enqueued.autoplay {
            Some(entry) => self.start_playback(destination, entry).await,
            None => None,
        };

        Ok(FlowReport {
            enqueued: enqueued.appended,
            now_playing,
        })
    }

    /// Hand `entry` to the transport. Entries that fail to play are skipped
    /// until one plays or the queue runs dry. Returns the title that started.
    async fn start_playback(&self, destination: &VoiceDestination, entry: QueueEntry) -> Option<String> {
        let mut next = Some(entry);

        while let Some(entry) = next.take() {
            if !destination.is_valid() {
                return None;
            }

            match self.player.play(destination.id(), &entry.track).await {
                Ok(()) => {
                    info!(destination = %destination.id(), "Now playing: {} [{}]", entry.title(), entry.track.duration_display());
                    return Some(entry.title().to_string());
                }
                Err(e) => {
                    warn!(destination = %destination.id(), "Failed to play '{}': {}", entry.title(), e);
                    // A user skip/stop may have landed while play() was pending
                    next = match destination.queue().skip_if_current(&entry) {
                        Ok(Some(skipped)) => skipped.next,
                        Ok(None) => {
                            debug!(destination = %destination.id(), "'{}' no longer current, queue left as is", entry.title());
                            None
                        }
                        Err(e) if !destination.is_valid() => {
                            debug!(destination = %destination.id(), "Voice session ended during playback fallback: {}", e);
                            None
                        }
                        Err(e) => {
                            error!(destination = %destination.id(), "Queue unavailable after playback failure: {}", e);
                            None
                        }
                    };
                }
            }
        }
        None
    }

    // Playback controls. Queue state changes first, then the transport is told.

    pub async fn skip(&self, destination: &VoiceDestination) -> Result<Option<QueueEntry>, QueueError> {
        let skipped = destination.queue().skip()?;
        match skipped.next {
            Some(next) => {
                self.start_playback(destination, next).await;
            }
            None => self.notify(destination, "stop", self.player.stop(destination.id()).await),
        }
        Ok(skipped.skipped)
    }

    /// End-of-track signal from the transport
    pub async fn track_finished(&self, destination: &VoiceDestination) -> Result<Option<QueueEntry>, QueueError> {
        let next = destination.queue().finish_current()?;
        match &next {
            Some(entry) => {
                self.start_playback(destination, entry.clone()).await;
            }
            None => debug!(destination = %destination.id(), "queue drained, going idle"),
        }
        Ok(next)
    }

    pub async fn pause(&self, destination: &VoiceDestination) -> Result<(), QueueError> {
        destination.queue().pause()?;
        self.notify(destination, "pause", self.player.pause(destination.id()).await);
        Ok(())
    }

    pub async fn resume(&self, destination: &VoiceDestination) -> Result<(), QueueError> {
        destination.queue().resume()?;
        self.notify(destination, "resume", self.player.resume(destination.id()).await);
        Ok(())
    }

    pub async fn stop(&self, destination: &VoiceDestination) -> Result<Option<QueueEntry>, QueueError> {
        let stopped = destination.queue().stop()?;
        self.notify(destination, "stop", self.player.stop(destination.id()).await);
        Ok(stopped)
    }

    pub async fn set_volume(&self, destination: &VoiceDestination, volume: u8) -> Result<u8, QueueError> {
        let volume = destination.queue().set_volume(volume)?;
        self.notify(destination, "set volume", self.player.set_volume(destination.id(), volume).await);
        Ok(volume)
    }

    fn notify(&self, destination: &VoiceDestination, action: &str, result: Result<(), PlaybackError>) {
        if let Err(e) = result {
            warn!(destination = %destination.id(), "Transport failed to {}: {}", action, e);
        }
    }
}
