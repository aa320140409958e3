use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use super::{ResolvedTrack, SearchCollaborator, TrackQuery};
use crate::error::SearchError;

/// Resolves a batch of queries concurrently, one task per query.
///
/// `resolve` always returns exactly one `ResolvedTrack` per query, at the
/// query's index, no matter which search finishes first.
pub struct ParallelResolver {
    search: Arc<dyn SearchCollaborator>,
    max_concurrency: Option<usize>, // None = every query in flight at once
}

impl ParallelResolver {
    pub fn new(search: Arc<dyn SearchCollaborator>) -> Self {
        Self {
            search,
            max_concurrency: None,
        }
    }

    /// Cap how many searches may be in flight at once (minimum 1)
    pub fn with_max_concurrency(mut self, cap: Option<usize>) -> Self {
        self.max_concurrency = cap.map(|c| c.max(1));
        self
    }

    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    /// Slot policy:
    /// - search exceeded `per_task_timeout` -> error (timeout)
    /// - provider failure -> error, provider said no match -> not found
    /// - search task panicked -> error
    /// - still outstanding at `overall_timeout` -> task aborted, not found
    ///
    /// Waiting for a concurrency permit only counts against the overall deadline.
    pub async fn resolve(
        &self,
        queries: &[TrackQuery],
        per_task_timeout: Duration,
        overall_timeout: Duration,
    ) -> Vec<ResolvedTrack> {
        if queries.is_empty() {
            return Vec::new();
        }

        let deadline = Instant::now() + overall_timeout;
        let permits = self.max_concurrency.map(|cap| Arc::new(Semaphore::new(cap)));
        let mut slots: Vec<Option<ResolvedTrack>> = vec![None; queries.len()];
        let mut tasks = JoinSet::new();
        let mut task_slots = HashMap::with_capacity(queries.len());

        for (slot, query) in queries.iter().cloned().enumerate() {
            let search = Arc::clone(&self.search);
            let permits = permits.clone();

            let handle = tasks.spawn(async move {
                // Held until the search returns
                let _permit = match permits {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };

                let track = match timeout(per_task_timeout, search.search(&query)).await {
                    Ok(Ok(Some(hit))) => ResolvedTrack::found(&query, hit),
                    Ok(Ok(None)) => ResolvedTrack::not_found(&query),
                    Ok(Err(error)) => {
                        debug!(slot, query = %query.text, %error, "search failed");
                        ResolvedTrack::failed(&query, error)
                    }
                    Err(_) => {
                        debug!(slot, query = %query.text, "search timed out");
                        ResolvedTrack::failed(&query, SearchError::Timeout)
                    }
                };
                (slot, track)
            });
            task_slots.insert(handle.id(), slot);
        }

        let mut deadline_hit = false;
        loop {
            match timeout_at(deadline, tasks.join_next_with_id()).await {
                Ok(Some(Ok((_, (slot, track))))) => slots[slot] = Some(track),
                Ok(Some(Err(join_error))) => {
                    let slot = task_slots.get(&join_error.id()).copied();
                    warn!(?slot, "search task ended abnormally: {}", join_error);
                    if let Some(slot) = slot {
                        slots[slot] = Some(ResolvedTrack::failed(
                            &queries[slot],
                            SearchError::Failed("search task panicked".to_string()),
                        ));
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        outstanding = tasks.len(),
                        "overall search deadline reached, cancelling remaining searches"
                    );
                    tasks.abort_all();
                    deadline_hit = true;
                    break;
                }
            }
        }

        let resolved: Vec<ResolvedTrack> = slots
            .into_iter()
            .zip(queries)
            .map(|(slot, query)| match slot {
                Some(track) => track,
                None => {
                    if !deadline_hit {
                        warn!(query = %query.text, "search task vanished without a result");
                    }
                    ResolvedTrack::not_found(query)
                }
            })
            .collect();

        let found = resolved.iter().filter(|t| t.is_found()).count();
        info!("Resolved {}/{} tracks", found, resolved.len());
        resolved
    }
}
