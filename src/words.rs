use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

static WORDS_DIR: Dir = include_dir!("src/words");

/// Upper bound on the number of words in one test
pub const MAX_WORDS: usize = 100;

/// Shown instead of a pool that could not be loaded
pub const FALLBACK_WORDS: [&str; 6] = ["error", "loading", "words", "please", "check", "console"];

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Default,
    ValueEnum,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Hard,
            Difficulty::Medium => Difficulty::Easy,
            Difficulty::Hard => Difficulty::Medium,
        }
    }

    fn file_name(self) -> String {
        format!("{self}.json")
    }
}

#[derive(Debug, Error)]
pub enum WordSourceError {
    #[error("word pool {0} not found")]
    NotFound(String),
    #[error("failed to read word pool {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed word pool {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("word pool {0} is empty")]
    Empty(String),
}

/// On-disk shape of a word pool
#[derive(Deserialize, Clone, Debug)]
pub struct WordPool {
    pub name: String,
    pub words: Vec<String>,
}

impl WordPool {
    fn parse(name: &str, contents: &str) -> Result<Self, WordSourceError> {
        let mut pool: WordPool = serde_json::from_str(contents).map_err(|source| WordSourceError::Parse {
            name: name.to_string(),
            source,
        })?;
        let before = pool.words.len();
        pool.words.retain(|w| is_single_token(w));
        if pool.words.len() < before {
            log::warn!("{name}: dropped {} blank or multi-token words", before - pool.words.len());
        }
        if pool.words.is_empty() {
            return Err(WordSourceError::Empty(name.to_string()));
        }
        Ok(pool)
    }
}

/// A word must be one non-empty token without whitespace
fn is_single_token(word: &str) -> bool {
    !word.is_empty() && !word.chars().any(char::is_whitespace)
}

pub fn fallback_words() -> Vec<String> {
    FALLBACK_WORDS.iter().map(|w| w.to_string()).collect()
}

/// Supplies the word list for a test
pub trait WordSource {
    /// The full candidate pool for a difficulty
    fn fetch(&self, difficulty: Difficulty) -> Result<Vec<String>, WordSourceError>;

    /// A shuffled selection of at most [`MAX_WORDS`] words. Never fails: a
    /// pool that cannot be fetched is replaced by [`FALLBACK_WORDS`].
    fn load(&self, difficulty: Difficulty) -> Vec<String> {
        match self.fetch(difficulty) {
            Ok(mut words) => {
                words.shuffle(&mut rand::thread_rng());
                words.truncate(MAX_WORDS);
                log::debug!("loaded {} {} words", words.len(), difficulty);
                words
            }
            Err(e) => {
                log::warn!("using fallback words: {e}");
                fallback_words()
            }
        }
    }
}

/// Word pools compiled into the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedWords;

impl WordSource for EmbeddedWords {
    fn fetch(&self, difficulty: Difficulty) -> Result<Vec<String>, WordSourceError> {
        let name = difficulty.file_name();
        let file = WORDS_DIR
            .get_file(&name)
            .ok_or_else(|| WordSourceError::NotFound(name.clone()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| WordSourceError::NotFound(name.clone()))?;
        Ok(WordPool::parse(&name, contents)?.words)
    }
}

/// Word pools read from `<dir>/<difficulty>.json`
#[derive(Debug, Clone)]
pub struct DirectoryWords {
    dir: PathBuf,
}

impl DirectoryWords {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl WordSource for DirectoryWords {
    fn fetch(&self, difficulty: Difficulty) -> Result<Vec<String>, WordSourceError> {
        let name = difficulty.file_name();
        let path = self.dir.join(&name);
        let contents = fs::read_to_string(&path).map_err(|source| WordSourceError::Io { path, source })?;
        Ok(WordPool::parse(&name, &contents)?.words)
    }
}

/// A fixed list, used as-is (no shuffling, no cap)
#[derive(Debug, Clone)]
pub struct FixedWords {
    words: Vec<String>,
}

impl FixedWords {
    pub fn new(mut words: Vec<String>) -> Self {
        words.retain(|w| is_single_token(w));
        Self { words }
    }

    pub fn from_prompt(prompt: &str) -> Self {
        Self::new(prompt.split_whitespace().map(str::to_string).collect())
    }
}

impl WordSource for FixedWords {
    fn fetch(&self, _difficulty: Difficulty) -> Result<Vec<String>, WordSourceError> {
        if self.words.is_empty() {
            return Err(WordSourceError::Empty("prompt".to_string()));
        }
        Ok(self.words.clone())
    }

    fn load(&self, difficulty: Difficulty) -> Vec<String> {
        self.fetch(difficulty).unwrap_or_else(|e| {
            log::warn!("using fallback words: {e}");
            fallback_words()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn test_embedded_pools_exist_for_every_difficulty() {
        for difficulty in Difficulty::value_variants() {
            let words = EmbeddedWords.fetch(*difficulty).unwrap();
            assert!(!words.is_empty(), "{difficulty} pool is empty");
        }
    }

    #[test]
    fn test_load_caps_and_shuffles_from_pool() {
        let pool: HashSet<String> = EmbeddedWords.fetch(Difficulty::Medium).unwrap().into_iter().collect();
        let words = EmbeddedWords.load(Difficulty::Medium);

        assert_eq!(words.len(), MAX_WORDS.min(pool.len()));
        assert!(words.iter().all(|w| pool.contains(w)));
    }

    #[test]
    fn test_hard_pool_has_punctuation() {
        let words = EmbeddedWords.fetch(Difficulty::Hard).unwrap();
        assert!(words.iter().any(|w| w.chars().any(|c| c.is_ascii_punctuation())));
    }

    #[test]
    fn test_missing_directory_falls_back() {
        let dir = tempdir().unwrap();
        let source = DirectoryWords::new(dir.path().join("nope"));

        assert!(matches!(source.fetch(Difficulty::Easy), Err(WordSourceError::Io { .. })));
        assert_eq!(source.load(Difficulty::Easy), fallback_words());
    }

    #[test]
    fn test_malformed_pool_falls_back() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("easy.json"), "{ not json").unwrap();
        let source = DirectoryWords::new(dir.path());

        assert!(matches!(source.fetch(Difficulty::Easy), Err(WordSourceError::Parse { .. })));
        assert_eq!(source.load(Difficulty::Easy), fallback_words());
    }

    #[test]
    fn test_empty_pool_falls_back() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("hard.json"), r#"{"name": "hard", "words": []}"#).unwrap();
        let source = DirectoryWords::new(dir.path());

        assert!(matches!(source.fetch(Difficulty::Hard), Err(WordSourceError::Empty(_))));
        assert_eq!(source.load(Difficulty::Hard), fallback_words());
    }

    #[test]
    fn test_blank_and_spaced_words_are_dropped() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("easy.json"),
            r#"{"name": "easy", "words": ["", "two words", "ok", "tab\there", " "]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("hard.json"), r#"{"name": "hard", "words": ["", "a b"]}"#).unwrap();
        let source = DirectoryWords::new(dir.path());

        assert_eq!(source.fetch(Difficulty::Easy).unwrap(), vec!["ok"]);
        assert_eq!(source.load(Difficulty::Easy), vec!["ok"]);

        assert!(matches!(source.fetch(Difficulty::Hard), Err(WordSourceError::Empty(_))));
        assert_eq!(source.load(Difficulty::Hard), fallback_words());
    }

    #[test]
    fn test_directory_pool_loads() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("medium.json"),
            r#"{"name": "medium", "words": ["alpha", "beta", "gamma"]}"#,
        )
        .unwrap();
        let source = DirectoryWords::new(dir.path());

        let mut words = source.load(Difficulty::Medium);
        words.sort();
        assert_eq!(words, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_fixed_words_keep_order() {
        let source = FixedWords::from_prompt("  the quick   brown fox ");
        assert_eq!(source.load(Difficulty::Hard), vec!["the", "quick", "brown", "fox"]);

        let empty = FixedWords::from_prompt("   ");
        assert_eq!(empty.load(Difficulty::Easy), fallback_words());

        let listed = FixedWords::new(vec!["".into(), "cat".into(), "hot dog".into()]);
        assert_eq!(listed.load(Difficulty::Easy), vec!["cat"]);
    }

    #[test]
    fn test_difficulty_cycle_and_display() {
        assert_eq!(Difficulty::Easy.next(), Difficulty::Medium);
        assert_eq!(Difficulty::Hard.next(), Difficulty::Easy);
        assert_eq!(Difficulty::Easy.prev(), Difficulty::Hard);
        assert_eq!(Difficulty::Medium.to_string(), "medium");
        assert_eq!(Difficulty::default(), Difficulty::Easy);
    }
}
