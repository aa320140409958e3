// Mood detection - the trigger half of the pipeline
// Text goes in, a mood label and a batch of track queries come out

pub mod catalog;    // immutable keyword + track tables
pub mod classifier; // keyword matching with deterministic tie-break
pub mod suggester;  // mood -> ordered track queries

pub use catalog::{MoodCatalog, MoodEntry};
pub use classifier::MoodClassifier;
pub use suggester::PlaylistSuggester;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse mood inferred from a message.
///
/// Declaration order is the tie-break priority: when two moods match the same
/// number of keywords, the one declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Happy,
    Sad,
    Energetic,
    Calm,
    Romantic,
    Party,
    Focus,
    None,
}

impl MoodLabel {
    /// Every real mood, highest priority first
    pub const PRIORITY: [MoodLabel; 7] = [
        MoodLabel::Happy,
        MoodLabel::Sad,
        MoodLabel::Energetic,
        MoodLabel::Calm,
        MoodLabel::Romantic,
        MoodLabel::Party,
        MoodLabel::Focus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Happy => "happy",
            MoodLabel::Sad => "sad",
            MoodLabel::Energetic => "energetic",
            MoodLabel::Calm => "calm",
            MoodLabel::Romantic => "romantic",
            MoodLabel::Party => "party",
            MoodLabel::Focus => "focus",
            MoodLabel::None => "none",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, MoodLabel::None)
    }

    /// Position in the tie-break ordering (lower wins)
    pub fn priority(&self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|m| m == self)
            .unwrap_or(Self::PRIORITY.len())
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_follows_declaration_order() {
        let mut sorted = MoodLabel::PRIORITY.to_vec();
        sorted.sort();
        assert_eq!(sorted, MoodLabel::PRIORITY.to_vec());

        assert_eq!(MoodLabel::Happy.priority(), 0);
        assert_eq!(MoodLabel::Focus.priority(), 6);
        assert!(MoodLabel::None.priority() > MoodLabel::Focus.priority());
    }

    #[test]
    fn test_label_serializes_lowercase() {
        let json = serde_json::to_string(&MoodLabel::Energetic).unwrap();
        assert_eq!(json, "\"energetic\"");
        assert_eq!(MoodLabel::Romantic.to_string(), "romantic");
    }
}
