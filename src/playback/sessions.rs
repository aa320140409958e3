use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{DestinationId, PlaybackQueue};

/// Handle to an active voice session. Goes invalid once the session is torn down.
#[derive(Debug, Clone)]
pub struct VoiceDestination {
    id: DestinationId,
    queue: Arc<PlaybackQueue>,
}

impl VoiceDestination {
    pub fn id(&self) -> &DestinationId {
        &self.id
    }

    pub fn queue(&self) -> &Arc<PlaybackQueue> {
        &self.queue
    }

    pub fn is_valid(&self) -> bool {
        !self.queue.is_closed()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.queue.cancellation_token()
    }
}

/// Owns one playback queue per destination.
///
/// The map lock only covers lookups and inserts; queue operations go through
/// each queue's own lock, so destinations never contend.
#[derive(Debug)]
pub struct VoiceSessions {
    queues: RwLock<HashMap<DestinationId, Arc<PlaybackQueue>>>,
    default_volume: u8,
}

impl VoiceSessions {
    pub fn new(default_volume: u8) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            default_volume,
        }
    }

    // A panic elsewhere can't leave the map half-written, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, HashMap<DestinationId, Arc<PlaybackQueue>>> {
        self.queues.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<DestinationId, Arc<PlaybackQueue>>> {
        self.queues.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Join (or re-use) the session for `id`
    pub fn connect(&self, id: impl Into<DestinationId>) -> VoiceDestination {
        let id = id.into();
        let mut queues = self.write();
        let queue = queues
            .entry(id.clone())
            .or_insert_with(|| {
                info!(destination = %id, "Voice session connected");
                Arc::new(PlaybackQueue::new(id.clone(), self.default_volume))
            })
            .clone();
        VoiceDestination { id, queue }
    }

    /// Handle for an already connected destination
    pub fn destination(&self, id: &DestinationId) -> Option<VoiceDestination> {
        self.read().get(id).map(|queue| VoiceDestination {
            id: id.clone(),
            queue: Arc::clone(queue),
        })
    }

    /// Tear the session down. Outstanding handles become invalid and in-flight
    /// flows for this destination are cancelled.
    pub fn disconnect(&self, id: &DestinationId) -> bool {
        let removed = self.write().remove(id);
        match removed {
            Some(queue) => {
                queue.close();
                info!(destination = %id, "Voice session disconnected");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl Default for VoiceSessions {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_reuses_queue() {
        let sessions = VoiceSessions::default();
        let a = sessions.connect("guild-1");
        let b = sessions.connect("guild-1");
        let c = sessions.connect("guild-2");

        assert!(Arc::ptr_eq(a.queue(), b.queue()));
        assert!(!Arc::ptr_eq(a.queue(), c.queue()));
        assert_eq!(sessions.len(), 2);
        assert_eq!(a.queue().volume().unwrap(), 50);
    }

    #[test]
    fn test_disconnect_invalidates_handles() {
        let sessions = VoiceSessions::new(70);
        let handle = sessions.connect("guild-1");
        let token = handle.cancellation_token();
        assert!(handle.is_valid());

        assert!(sessions.disconnect(handle.id()));
        assert!(!handle.is_valid());
        assert!(token.is_cancelled());
        assert!(sessions.destination(handle.id()).is_none());
        assert!(!sessions.disconnect(handle.id()));

        // reconnecting gives a fresh, valid session
        let fresh = sessions.connect("guild-1");
        assert!(fresh.is_valid());
        assert_eq!(fresh.queue().volume().unwrap(), 70);
    }

    #[test]
    fn test_lookup_by_id() {
        let sessions = VoiceSessions::default();
        assert!(sessions.destination(&DestinationId::from("nope")).is_none());
        sessions.connect(DestinationId::from(99u64));
        assert!(sessions.destination(&DestinationId::from("99")).is_some());
        assert!(!sessions.is_empty());
    }
}
