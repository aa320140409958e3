use anyhow::{bail, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::classifier::WORD_PATTERN;
use super::MoodLabel;

/// Keywords that signal a mood and the track queries it maps to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub mood: MoodLabel,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub tracks: Vec<String>, // "Title - Artist" search strings, in suggestion order
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(rename = "mood", default)]
    moods: Vec<MoodEntry>,
}

/// Immutable mood tables. Built once at startup and shared behind an `Arc`;
/// nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodCatalog {
    entries: Vec<MoodEntry>,
}

impl MoodCatalog {
    /// Normalizes the raw entries: keywords are lowercased and trimmed, duplicate
    /// keywords/tracks are dropped (first one wins), entries for the same mood are
    /// merged and `none` entries are ignored. Entries end up in priority order.
    pub fn from_entries(raw: Vec<MoodEntry>) -> Self {
        let mut entries: Vec<MoodEntry> = Vec::new();

        for entry in raw.into_iter().filter(|e| !e.mood.is_none()) {
            let slot = match entries.iter().position(|e| e.mood == entry.mood) {
                Some(idx) => idx,
                None => {
                    entries.push(MoodEntry {
                        mood: entry.mood,
                        keywords: Vec::new(),
                        tracks: Vec::new(),
                    });
                    entries.len() - 1
                }
            };
            let target = &mut entries[slot];

            for keyword in entry.keywords {
                let keyword = keyword.trim().to_lowercase();
                if !keyword.is_empty() && !target.keywords.contains(&keyword) {
                    target.keywords.push(keyword);
                }
            }
            for track in entry.tracks {
                let track = track.trim().to_string();
                if !track.is_empty() && !target.tracks.contains(&track) {
                    target.tracks.push(track);
                }
            }
        }

        entries.sort_by_key(|e| e.mood);
        Self { entries }
    }

    /// Load a catalog from a TOML file with one `[[mood]]` table per mood
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read catalog {}: {}", path.display(), e))?;
        let file: CatalogFile = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse catalog {}: {}", path.display(), e))?;

        let catalog = Self::from_entries(file.moods);
        catalog
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid catalog {}: {}", path.display(), e))?;

        let mut shared: Vec<&str> = catalog.shared_keywords().into_iter().collect();
        if !shared.is_empty() {
            shared.sort_unstable();
            warn!("Keywords used by more than one mood, ties go by priority: {}", shared.join(", "));
        }
        info!("Loaded mood catalog from {} ({} moods)", path.display(), catalog.entries.len());
        Ok(catalog)
    }

    /// Keywords are matched against single words, so anything with spaces or
    /// punctuation could never fire
    pub fn validate(&self) -> Result<()> {
        let word = Regex::new(&format!("^{}$", WORD_PATTERN))?;
        for entry in &self.entries {
            if let Some(bad) = entry.keywords.iter().find(|k| !word.is_match(k)) {
                bail!("keyword '{}' for mood {} is not a single word", bad, entry.mood);
            }
        }
        Ok(())
    }

    pub fn entries(&self) -> &[MoodEntry] {
        &self.entries
    }

    pub fn keywords(&self, mood: MoodLabel) -> &[String] {
        self.entry(mood).map(|e| e.keywords.as_slice()).unwrap_or(&[])
    }

    pub fn tracks(&self, mood: MoodLabel) -> &[String] {
        self.entry(mood).map(|e| e.tracks.as_slice()).unwrap_or(&[])
    }

    /// Every keyword that belongs to more than one mood
    pub fn shared_keywords(&self) -> HashSet<&str> {
        let mut seen = HashSet::new();
        let mut shared = HashSet::new();
        for keyword in self.entries.iter().flat_map(|e| e.keywords.iter()) {
            if !seen.insert(keyword.as_str()) {
                shared.insert(keyword.as_str());
            }
        }
        shared
    }

    fn entry(&self, mood: MoodLabel) -> Option<&MoodEntry> {
        self.entries.iter().find(|e| e.mood == mood)
    }

    pub fn builtin() -> Self {
        fn entry(mood: MoodLabel, keywords: &[&str], tracks: &[&str]) -> MoodEntry {
            MoodEntry {
                mood,
                keywords: keywords.iter().map(|s| s.to_string()).collect(),
                tracks: tracks.iter().map(|s| s.to_string()).collect(),
            }
        }

        Self::from_entries(vec![
            entry(
                MoodLabel::Happy,
                &["happy", "joyful", "excited", "cheerful", "upbeat", "glad"],
                &[
                    "Happy - Pharrell Williams",
                    "Walking on Sunshine - Katrina and the Waves",
                    "Uptown Funk - Mark Ronson",
                    "Good as Hell - Lizzo",
                    "Shake It Off - Taylor Swift",
                    "Three Little Birds - Bob Marley",
                ],
            ),
            entry(
                MoodLabel::Sad,
                &["sad", "depressed", "melancholy", "blue", "heartbroken", "lonely"],
                &[
                    "Someone Like You - Adele",
                    "Fix You - Coldplay",
                    "Hurt - Johnny Cash",
                    "Skinny Love - Bon Iver",
                    "Moonlight Sonata - Beethoven",
                    "The Night We Met - Lord Huron",
                ],
            ),
            entry(
                MoodLabel::Energetic,
                &["energetic", "hyped", "pumped", "excited", "active", "workout"],
                &[
                    "Lose Yourself - Eminem",
                    "Bohemian Rhapsody - Queen",
                    "Levels - Avicii",
                    "Enter Sandman - Metallica",
                    "Sandstorm - Darude",
                    "Till I Collapse - Eminem",
                ],
            ),
            entry(
                MoodLabel::Calm,
                &["calm", "relaxed", "peaceful", "mellow", "chill"],
                &[
                    "Weightless - Marconi Union",
                    "Clair de Lune - Debussy",
                    "Take Five - Dave Brubeck",
                    "Canon in D - Pachelbel",
                    "Holocene - Bon Iver",
                ],
            ),
            entry(
                MoodLabel::Romantic,
                &["romantic", "love", "loving", "affectionate"],
                &[
                    "Perfect - Ed Sheeran",
                    "At Last - Etta James",
                    "All of Me - John Legend",
                    "Thinking Out Loud - Ed Sheeran",
                    "Let's Stay Together - Al Green",
                ],
            ),
            entry(
                MoodLabel::Party,
                &["party", "dance", "celebrate", "festive"],
                &[
                    "One More Time - Daft Punk",
                    "Blinding Lights - The Weeknd",
                    "Sicko Mode - Travis Scott",
                    "Don't Start Now - Dua Lipa",
                    "Titanium - David Guetta",
                    "Uptown Funk - Mark Ronson",
                ],
            ),
            entry(
                MoodLabel::Focus,
                &["focus", "study", "studying", "concentrate", "productive"],
                &[
                    "Gymnopedie No.1 - Erik Satie",
                    "Experience - Ludovico Einaudi",
                    "Intro - The xx",
                    "An Ending (Ascent) - Brian Eno",
                    "Clair de Lune - Debussy",
                ],
            ),
        ])
    }
}

impl Default for MoodCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_covers_every_mood() {
        let catalog = MoodCatalog::builtin();
        for mood in MoodLabel::PRIORITY {
            assert!(!catalog.keywords(mood).is_empty(), "{} has no keywords", mood);
            assert!(catalog.tracks(mood).len() >= 5, "{} has too few tracks", mood);
        }
        assert!(catalog.tracks(MoodLabel::None).is_empty());
    }

    #[test]
    fn test_normalization_merges_and_dedups() {
        let catalog = MoodCatalog::from_entries(vec![
            MoodEntry {
                mood: MoodLabel::Sad,
                keywords: vec![" Sad ".into(), "blue".into()],
                tracks: vec!["Hurt - Johnny Cash".into()],
            },
            MoodEntry {
                mood: MoodLabel::Happy,
                keywords: vec!["happy".into()],
                tracks: vec![],
            },
            MoodEntry {
                mood: MoodLabel::Sad,
                keywords: vec!["sad".into()],
                tracks: vec!["Hurt - Johnny Cash".into(), "Fix You - Coldplay".into()],
            },
            MoodEntry {
                mood: MoodLabel::None,
                keywords: vec!["whatever".into()],
                tracks: vec![],
            },
        ]);

        assert_eq!(catalog.entries().len(), 2);
        assert_eq!(catalog.entries()[0].mood, MoodLabel::Happy);
        assert_eq!(catalog.keywords(MoodLabel::Sad), &["sad".to_string(), "blue".to_string()]);
        assert_eq!(
            catalog.tracks(MoodLabel::Sad),
            &["Hurt - Johnny Cash".to_string(), "Fix You - Coldplay".to_string()]
        );
        assert!(catalog.keywords(MoodLabel::None).is_empty());
    }

    #[test]
    fn test_shared_keywords() {
        let catalog = MoodCatalog::builtin();
        assert!(catalog.validate().is_ok());
        let shared = catalog.shared_keywords();
        assert!(shared.contains("excited"));
        assert!(!shared.contains("sad"));
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[mood]]
mood = "focus"
keywords = ["deadline"]
tracks = ["Experience - Ludovico Einaudi"]
"#
        )
        .unwrap();

        let catalog = MoodCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.keywords(MoodLabel::Focus), &["deadline".to_string()]);
        assert!(catalog.tracks(MoodLabel::Happy).is_empty());
    }

    #[test]
    fn test_load_rejects_unmatchable_keywords() {
        for keyword in ["in love", "r&b"] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(
                file,
                r#"
[[mood]]
mood = "romantic"
keywords = ["romantic", "{}"]
tracks = ["Perfect - Ed Sheeran"]
"#,
                keyword
            )
            .unwrap();

            let err = MoodCatalog::load(file.path()).unwrap_err().to_string();
            assert!(err.contains(keyword), "unexpected error: {}", err);
        }
    }

    #[test]
    fn test_apostrophes_and_digits_are_single_words() {
        let catalog = MoodCatalog::from_entries(vec![MoodEntry {
            mood: MoodLabel::Party,
            keywords: vec!["let's".into(), "y2k".into(), "Fiesta".into()],
            tracks: vec![],
        }]);
        assert!(catalog.validate().is_ok());
    }
}
