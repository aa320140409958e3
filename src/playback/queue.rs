use rand::seq::SliceRandom;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{DestinationId, PlayerState, QueueEntry};
use crate::error::QueueError;

const MAX_VOLUME: u8 = 100;

/// Result of an `enqueue` call
#[derive(Debug, Clone)]
pub struct Enqueued {
    pub appended: usize,
    /// Set when the queue was empty-handed and the first new entry started
    pub autoplay: Option<QueueEntry>,
}

#[derive(Debug, Clone)]
pub struct Skipped {
    pub skipped: Option<QueueEntry>,
    pub next: Option<QueueEntry>,
}

#[derive(Debug)]
struct QueueState {
    state: PlayerState,
    current: Option<QueueEntry>,
    pending: VecDeque<QueueEntry>,
    live_entries: HashMap<Uuid, usize>, // playlist id -> entries still pending or current
    looping: bool,
    volume: u8,
    closed: bool,
}

impl QueueState {
    fn admit(&mut self, entry: &QueueEntry) {
        *self.live_entries.entry(entry.playlist.id).or_insert(0) += 1;
    }

    // Entry left the queue for good (finished, skipped, cleared)
    fn retire(&mut self, entry: &QueueEntry) {
        let id = entry.playlist.id;
        if let Some(count) = self.live_entries.get_mut(&id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.live_entries.remove(&id);
                debug!(playlist = %id, mood = %entry.playlist.mood, "playlist consumed, discarded");
            }
        }
    }

    fn promote_next(&mut self) -> Option<QueueEntry> {
        match self.pending.pop_front() {
            Some(next) => {
                self.current = Some(next.clone());
                self.state = PlayerState::Playing;
                Some(next)
            }
            None => {
                self.current = None;
                self.state = PlayerState::Idle;
                None
            }
        }
    }

    fn advance(&mut self) -> Option<QueueEntry> {
        if let Some(done) = self.current.take() {
            self.retire(&done);
        }
        self.promote_next()
    }

    fn has_no_current(&self) -> bool {
        matches!(self.state, PlayerState::Idle | PlayerState::Stopped)
    }

    fn consistent(&self) -> bool {
        if self.has_no_current() {
            self.current.is_none() && self.pending.is_empty()
        } else {
            self.current.is_some()
        }
    }
}

/// Playback queue for one voice destination.
///
/// Every operation runs inside one critical section, so the auto-play rule
/// (first entry starts when nothing is current) can't interleave with other
/// enqueues, skips or clears on the same destination.
#[derive(Debug)]
pub struct PlaybackQueue {
    destination: DestinationId,
    inner: Mutex<QueueState>,
    cancel: CancellationToken,
}

impl PlaybackQueue {
    pub fn new(destination: DestinationId, volume: u8) -> Self {
        Self {
            destination,
            inner: Mutex::new(QueueState {
                state: PlayerState::Idle,
                current: None,
                pending: VecDeque::new(),
                live_entries: HashMap::new(),
                looping: false,
                volume: volume.min(MAX_VOLUME),
                closed: false,
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn destination(&self) -> &DestinationId {
        &self.destination
    }

    /// Cancelled when the destination is torn down
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn unavailable(&self) -> QueueError {
        QueueError::Unavailable {
            destination: self.destination.to_string(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>, QueueError> {
        let guard = self.inner.lock().map_err(|_| self.unavailable())?;
        if guard.closed {
            return Err(self.unavailable());
        }
        Ok(guard)
    }

    /// Append found entries in order. If nothing is current, the first appended
    /// entry becomes current and the queue switches to `Playing`.
    pub fn enqueue(&self, entries: Vec<QueueEntry>) -> Result<Enqueued, QueueError> {
        let mut inner = self.lock()?;

        if !inner.consistent() {
            warn!(destination = %self.destination, state = ?inner.state, "queue invariants broken before enqueue");
            return Err(QueueError::EnqueueRaceLost {
                destination: self.destination.to_string(),
            });
        }

        let mut appended = 0;
        for entry in entries.into_iter().filter(|e| e.track.is_found()) {
            inner.admit(&entry);
            inner.pending.push_back(entry);
            appended += 1;
        }

        let autoplay = if appended > 0 && inner.has_no_current() {
            inner.promote_next()
        } else {
            None
        };

        if let Some(entry) = &autoplay {
            info!(destination = %self.destination, "Auto-play: {}", entry.title());
        }
        debug!(destination = %self.destination, appended, pending = inner.pending.len(), "enqueued");

        Ok(Enqueued { appended, autoplay })
    }

    /// Retire the current entry and promote the head of the pending queue.
    /// Goes `Idle` when nothing is left.
    pub fn dequeue_next(&self) -> Result<Option<QueueEntry>, QueueError> {
        let mut inner = self.lock()?;
        Ok(inner.advance())
    }

    /// End-of-track signal from the transport. With looping on, the current
    /// entry starts over instead of advancing.
    pub fn finish_current(&self) -> Result<Option<QueueEntry>, QueueError> {
        let mut inner = self.lock()?;
        if inner.looping {
            if let Some(current) = inner.current.clone() {
                inner.state = PlayerState::Playing;
                return Ok(Some(current));
            }
        }
        Ok(inner.advance())
    }

    pub fn skip(&self) -> Result<Skipped, QueueError> {
        let mut inner = self.lock()?;
        let skipped = inner.current.clone();
        let next = inner.advance();

        if let Some(entry) = &skipped {
            info!(destination = %self.destination, "Skipped: {}", entry.title());
        }
        Ok(Skipped { skipped, next })
    }

    /// Skip only if `expected` is still the current entry. Returns `None` and
    /// leaves the queue alone when something else moved it on first.
    pub fn skip_if_current(&self, expected: &QueueEntry) -> Result<Option<Skipped>, QueueError> {
        let mut inner = self.lock()?;
        match &inner.current {
            Some(current) if current.same_as(expected) => {}
            _ => return Ok(None),
        }

        let skipped = inner.current.clone();
        let next = inner.advance();
        info!(destination = %self.destination, "Skipped unplayable: {}", expected.title());
        Ok(Some(Skipped { skipped, next }))
    }

    pub fn current_entry(&self) -> Result<Option<QueueEntry>, QueueError> {
        Ok(self.lock()?.current.clone())
    }

    pub fn state(&self) -> Result<PlayerState, QueueError> {
        Ok(self.lock()?.state)
    }

    /// Drop every pending entry; the current one keeps playing
    pub fn clear(&self) -> Result<usize, QueueError> {
        let mut inner = self.lock()?;
        let removed: Vec<QueueEntry> = inner.pending.drain(..).collect();
        for entry in &removed {
            inner.retire(entry);
        }
        Ok(removed.len())
    }

    pub fn pause(&self) -> Result<(), QueueError> {
        let mut inner = self.lock()?;
        match inner.state {
            PlayerState::Playing => {
                inner.state = PlayerState::Paused;
                Ok(())
            }
            from => Err(QueueError::InvalidTransition { from, action: "pause" }),
        }
    }

    pub fn resume(&self) -> Result<(), QueueError> {
        let mut inner = self.lock()?;
        match inner.state {
            PlayerState::Paused => {
                inner.state = PlayerState::Playing;
                Ok(())
            }
            from => Err(QueueError::InvalidTransition { from, action: "resume" }),
        }
    }

    /// Clear pending, drop the current entry and go `Stopped`. Returns what was playing.
    pub fn stop(&self) -> Result<Option<QueueEntry>, QueueError> {
        let mut inner = self.lock()?;
        let removed: Vec<QueueEntry> = inner.pending.drain(..).collect();
        for entry in &removed {
            inner.retire(entry);
        }
        let stopped = inner.current.take();
        if let Some(entry) = &stopped {
            inner.retire(entry);
        }
        inner.state = PlayerState::Stopped;
        Ok(stopped)
    }

    /// Snapshot of the next `limit` pending entries
    pub fn pending(&self, limit: usize) -> Result<Vec<QueueEntry>, QueueError> {
        Ok(self.lock()?.pending.iter().take(limit).cloned().collect())
    }

    pub fn pending_len(&self) -> Result<usize, QueueError> {
        Ok(self.lock()?.pending.len())
    }

    /// Remove a pending entry by 1-based position
    pub fn remove(&self, position: usize) -> Result<QueueEntry, QueueError> {
        let mut inner = self.lock()?;
        if position == 0 || position > inner.pending.len() {
            return Err(QueueError::NoSuchPosition(position));
        }
        let removed = inner
            .pending
            .remove(position - 1)
            .ok_or(QueueError::NoSuchPosition(position))?;
        inner.retire(&removed);
        Ok(removed)
    }

    pub fn shuffle(&self) -> Result<(), QueueError> {
        let mut inner = self.lock()?;
        inner.pending.make_contiguous().shuffle(&mut rand::thread_rng());
        Ok(())
    }

    pub fn set_looping(&self, looping: bool) -> Result<(), QueueError> {
        self.lock()?.looping = looping;
        Ok(())
    }

    pub fn is_looping(&self) -> Result<bool, QueueError> {
        Ok(self.lock()?.looping)
    }

    /// Volume in percent, clamped to 0..=100. Returns the stored value.
    pub fn set_volume(&self, volume: u8) -> Result<u8, QueueError> {
        let mut inner = self.lock()?;
        inner.volume = volume.min(MAX_VOLUME);
        Ok(inner.volume)
    }

    pub fn volume(&self) -> Result<u8, QueueError> {
        Ok(self.lock()?.volume)
    }

    /// Playlists with at least one entry still pending or current
    pub fn active_playlists(&self) -> Result<usize, QueueError> {
        Ok(self.lock()?.live_entries.len())
    }

    /// Tear down: reject further operations and cancel in-flight flows
    pub fn close(&self) {
        match self.inner.lock() {
            Ok(mut inner) => {
                inner.closed = true;
                inner.pending.clear();
                inner.current = None;
                inner.live_entries.clear();
                inner.state = PlayerState::Stopped;
            }
            Err(_) => warn!(destination = %self.destination, "closing a poisoned queue"),
        }
        self.cancel.cancel();
        info!(destination = %self.destination, "Playback queue closed");
    }
}
