use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use super::{MoodCatalog, MoodLabel};

// Letters, digits and apostrophes so "i'm" stays one token
pub(crate) const WORD_PATTERN: &str = r"[\p{L}\p{N}']+";

/// Keyword-based mood detection.
///
/// Matching is case-insensitive and whole-word. When several moods match, the one
/// with the most distinct matched keywords wins; ties go to the mood that comes
/// first in `MoodLabel::PRIORITY`.
#[derive(Debug, Clone)]
pub struct MoodClassifier {
    keywords: Vec<(MoodLabel, HashSet<String>)>,
    tokenizer: Regex,
}

impl MoodClassifier {
    pub fn new(catalog: &MoodCatalog) -> Result<Self, regex::Error> {
        let keywords = catalog
            .entries()
            .iter()
            .map(|entry| (entry.mood, entry.keywords.iter().cloned().collect()))
            .collect();

        Ok(Self {
            keywords,
            tokenizer: Regex::new(WORD_PATTERN)?,
        })
    }

    pub fn classify(&self, text: &str) -> MoodLabel {
        let lowered = text.to_lowercase();
        let tokens: HashSet<&str> = self
            .tokenizer
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        let mut best: Option<(MoodLabel, usize)> = None;
        for (mood, keywords) in &self.keywords {
            let hits = keywords.iter().filter(|k| tokens.contains(k.as_str())).count();
            if hits == 0 {
                continue;
            }

            let better = match best {
                None => true,
                Some((current, current_hits)) => {
                    hits > current_hits
                        || (hits == current_hits && mood.priority() < current.priority())
                }
            };
            if better {
                best = Some((*mood, hits));
            }
        }

        match best {
            Some((mood, hits)) => {
                debug!(%mood, hits, "classified message");
                mood
            }
            None => MoodLabel::None,
        }
    }
}
