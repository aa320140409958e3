// Scripted search provider for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{SearchCollaborator, SearchHit, TrackQuery};
use crate::error::SearchError;

#[derive(Debug, Clone)]
pub enum Script {
    Hit(Duration),
    Miss(Duration),
    Fail(SearchError),
    Hang,
    Panic,
}

/// Answers each query text according to its script; unscripted queries hit
/// immediately. Records how many searches were in flight at the peak.
#[derive(Default)]
pub struct ScriptedSearch {
    scripts: HashMap<String, Script>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    completed: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, text: &str, script: Script) -> Self {
        self.scripts.insert(text.to_string(), script);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Query texts in the order their searches finished
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    fn hit_for(query: &TrackQuery) -> SearchHit {
        SearchHit {
            id: format!("id-{}", query.position),
            title: query.text.clone(),
            url: format!("https://music.example/{}", query.position),
            duration: Some(Duration::from_secs(200)),
        }
    }
}

#[async_trait]
impl SearchCollaborator for ScriptedSearch {
    async fn search(&self, query: &TrackQuery) -> Result<Option<SearchHit>, SearchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = match self.scripts.get(&query.text).cloned() {
            None => Ok(Some(Self::hit_for(query))),
            Some(Script::Hit(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Some(Self::hit_for(query)))
            }
            Some(Script::Miss(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(None)
            }
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Panic) => panic!("scripted search panic for '{}'", query.text),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Some(Self::hit_for(query)))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().unwrap().push(query.text.clone());
        result
    }
}
