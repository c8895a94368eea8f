use crate::engine::Verdict;
use std::collections::{HashMap, HashSet};

/// Receiver of engine-driven highlight changes. Implementations only mirror
/// what they are told; the engine never reads state back from them.
pub trait Presenter {
    fn render_words(&mut self, words: &[String]);
    fn highlight(&mut self, word_index: usize, char_index: usize);
    fn set_char_verdict(&mut self, word_index: usize, char_index: usize, verdict: Option<Verdict>);
    fn flag_word_mistyped(&mut self, word_index: usize);
    fn clear_word_flag(&mut self, word_index: usize);
    /// Mirror the typed buffer into an input line, if there is one
    fn sync_input(&mut self, _typed: &str) {}
}

/// Presenter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn render_words(&mut self, _words: &[String]) {}
    fn highlight(&mut self, _word_index: usize, _char_index: usize) {}
    fn set_char_verdict(&mut self, _word_index: usize, _char_index: usize, _verdict: Option<Verdict>) {}
    fn flag_word_mistyped(&mut self, _word_index: usize) {}
    fn clear_word_flag(&mut self, _word_index: usize) {}
}

/// Styling state of the word area as the terminal draws it
#[derive(Debug, Default, Clone)]
pub struct WordBoard {
    words: Vec<Vec<char>>,
    verdicts: HashMap<(usize, usize), Verdict>,
    flagged: HashSet<usize>,
    current: Option<(usize, usize)>,
    input: String,
}

impl WordBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn words(&self) -> &[Vec<char>] {
        &self.words
    }

    pub fn verdict(&self, word_index: usize, char_index: usize) -> Option<Verdict> {
        self.verdicts.get(&(word_index, char_index)).copied()
    }

    pub fn is_flagged(&self, word_index: usize) -> bool {
        self.flagged.contains(&word_index)
    }

    /// Position of the highlighted character, if any
    pub fn current(&self) -> Option<(usize, usize)> {
        self.current
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}

impl Presenter for WordBoard {
    fn render_words(&mut self, words: &[String]) {
        self.words = words.iter().map(|w| w.chars().collect()).collect();
        self.verdicts.clear();
        self.flagged.clear();
        self.input.clear();
        self.current = None;
        self.highlight(0, 0);
    }

    fn highlight(&mut self, word_index: usize, char_index: usize) {
        self.current = match self.words.get(word_index) {
            Some(word) if char_index < word.len() => Some((word_index, char_index)),
            // a fully typed word points at the start of the next one
            Some(_) if word_index + 1 < self.words.len() => Some((word_index + 1, 0)),
            _ => None,
        };
    }

    fn set_char_verdict(&mut self, word_index: usize, char_index: usize, verdict: Option<Verdict>) {
        match verdict {
            Some(v) => {
                self.verdicts.insert((word_index, char_index), v);
            }
            None => {
                self.verdicts.remove(&(word_index, char_index));
            }
        }
    }

    fn flag_word_mistyped(&mut self, word_index: usize) {
        self.flagged.insert(word_index);
    }

    fn clear_word_flag(&mut self, word_index: usize) {
        self.flagged.remove(&word_index);
    }

    fn sync_input(&mut self, typed: &str) {
        self.input.clear();
        self.input.push_str(typed);
    }
}
