use std::sync::Arc;

use super::{MoodCatalog, MoodLabel};
use crate::search::TrackQuery;

/// Turns a mood into an ordered batch of search queries from the catalog
#[derive(Debug, Clone)]
pub struct PlaylistSuggester {
    catalog: Arc<MoodCatalog>,
}

impl PlaylistSuggester {
    pub fn new(catalog: Arc<MoodCatalog>) -> Self {
        Self { catalog }
    }

    /// Up to `count` catalog entries in catalog order. Short catalogs return what
    /// they have, no padding. `MoodLabel::None` yields an empty batch.
    pub fn suggest(&self, mood: MoodLabel, count: usize) -> Vec<TrackQuery> {
        if mood.is_none() {
            return Vec::new();
        }

        self.catalog
            .tracks(mood)
            .iter()
            .take(count)
            .enumerate()
            .map(|(position, text)| TrackQuery::new(text.clone(), mood, position))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::MoodEntry;

    fn suggester() -> PlaylistSuggester {
        PlaylistSuggester::new(Arc::new(MoodCatalog::builtin()))
    }

    #[test]
    fn test_takes_catalog_prefix_in_order() {
        let queries = suggester().suggest(MoodLabel::Sad, 3);
        let texts: Vec<&str> = queries.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Someone Like You - Adele", "Fix You - Coldplay", "Hurt - Johnny Cash"]
        );
        for (i, q) in queries.iter().enumerate() {
            assert_eq!(q.position, i);
            assert_eq!(q.mood, MoodLabel::Sad);
        }
    }

    #[test]
    fn test_short_catalog_is_not_padded() {
        let catalog = MoodCatalog::from_entries(vec![MoodEntry {
            mood: MoodLabel::Calm,
            keywords: vec!["calm".into()],
            tracks: vec!["A - X".into(), "B - Y".into(), "A - X".into()],
        }]);
        let s = PlaylistSuggester::new(Arc::new(catalog));

        let queries = s.suggest(MoodLabel::Calm, 5);
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].text, "B - Y");

        assert!(s.suggest(MoodLabel::Happy, 5).is_empty());
    }

    #[test]
    fn test_none_and_zero() {
        let s = suggester();
        assert!(s.suggest(MoodLabel::None, 5).is_empty());
        assert!(s.suggest(MoodLabel::Happy, 0).is_empty());
    }
}
