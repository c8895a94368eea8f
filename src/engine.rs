use crate::presenter::Presenter;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

/// Characters per "word" when converting keystrokes to wpm
pub const CHARS_PER_WORD: f64 = 5.0;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    Backspace,
    Other,
}

#[derive(Clone, Debug, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// A single key press as the engine sees it
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyStroke {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn char(c: char) -> Self {
        if c == ' ' {
            Self::new(Key::Space)
        } else {
            Self::new(Key::Char(c))
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Something that would be typed: a printable character or space without
    /// ctrl/alt/meta held.
    pub fn is_printable(&self) -> bool {
        matches!(self.key, Key::Char(_) | Key::Space) && !self.modifiers.any()
    }
}

impl From<KeyEvent> for KeyStroke {
    fn from(event: KeyEvent) -> Self {
        let modifiers = Modifiers {
            ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
            alt: event.modifiers.contains(KeyModifiers::ALT),
            meta: event.modifiers.contains(KeyModifiers::META)
                || event.modifiers.contains(KeyModifiers::SUPER),
        };
        let key = match event.code {
            KeyCode::Char(' ') => Key::Space,
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Backspace => Key::Backspace,
            _ => Key::Other,
        };
        Self { key, modifiers }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A character was typed inside the current word
    AdvanceChar,
    /// A character was typed past the end of the current word
    Overflow,
    /// The current word was committed with space, or fully typed and waiting
    /// for one
    AdvanceWord,
    RetreatChar,
    RetreatWord,
    TestComplete,
}

#[derive(Clone, Debug, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub word_index: usize,
    pub char_index: usize,
}

#[derive(Clone, Debug, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub wpm: u32,
    pub accuracy: u32,
    pub total_keystrokes: u32,
    pub mistyped_words: usize,
}

/// Keystroke reducer for one test: tracks the cursor, the buffer for the word
/// being typed, per-character verdicts and the running counters.
#[derive(Debug, Default)]
pub struct TypingEngine {
    words: Vec<String>,
    cursor: Cursor,
    typed: String,
    verdicts: BTreeMap<(usize, usize), Verdict>,
    mistyped: BTreeSet<usize>,
    correct_chars: u32,
    incorrect_chars: u32,
    total_keystrokes: u32,
    running: bool,
    started_at: Option<Instant>,
    duration_secs: u64,
}

impl TypingEngine {
    pub fn new(words: Vec<String>, duration_secs: u64) -> Self {
        let mut engine = Self::default();
        engine.reset(words, duration_secs);
        engine
    }

    pub fn reset(&mut self, words: Vec<String>, duration_secs: u64) {
        *self = Self {
            words,
            duration_secs,
            ..Self::default()
        };
    }

    pub fn start(&mut self, now: Instant) {
        if self.running {
            return;
        }
        self.running = true;
        self.started_at = Some(now);
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn handle_key<P: Presenter + ?Sized>(
        &mut self,
        stroke: KeyStroke,
        presenter: &mut P,
    ) -> Option<EngineEvent> {
        debug_assert!(
            self.cursor.word_index <= self.words.len(),
            "cursor {:?} outside word list of length {}",
            self.cursor,
            self.words.len()
        );
        if !self.running || self.cursor.word_index >= self.words.len() {
            return None;
        }

        let event = match stroke.key {
            Key::Space => self.commit_word(presenter),
            Key::Backspace => self.backspace(presenter),
            Key::Char(c) if !stroke.modifiers.any() => self.type_char(c, presenter),
            Key::Char(_) | Key::Other => None,
        };

        if event.is_some() {
            presenter.sync_input(&self.typed);
        }
        event
    }

    fn commit_word<P: Presenter + ?Sized>(&mut self, presenter: &mut P) -> Option<EngineEvent> {
        if self.typed.is_empty() {
            return None;
        }

        let idx = self.cursor.word_index;
        if self.typed != self.words[idx] {
            self.mistyped.insert(idx);
            presenter.flag_word_mistyped(idx);
        }

        self.cursor = Cursor {
            word_index: idx + 1,
            char_index: 0,
        };
        self.typed.clear();

        if self.cursor.word_index == self.words.len() {
            return Some(EngineEvent::TestComplete);
        }
        presenter.highlight(self.cursor.word_index, 0);
        Some(EngineEvent::AdvanceWord)
    }

    fn backspace<P: Presenter + ?Sized>(&mut self, presenter: &mut P) -> Option<EngineEvent> {
        let event = if self.typed.pop().is_some() {
            let word_len = self.word_len(self.cursor.word_index);
            let typed_len = self.typed.chars().count();
            if typed_len < word_len {
                self.verdicts.remove(&(self.cursor.word_index, typed_len));
                presenter.set_char_verdict(self.cursor.word_index, typed_len, None);
            }
            self.cursor.char_index = typed_len.min(word_len);
            EngineEvent::RetreatChar
        } else if self.cursor.word_index > 0 {
            let idx = self.cursor.word_index - 1;
            let word_len = self.word_len(idx);
            for char_idx in 0..word_len {
                if self.verdicts.remove(&(idx, char_idx)).is_some() {
                    presenter.set_char_verdict(idx, char_idx, None);
                }
            }
            self.typed = self.words[idx].clone();
            self.cursor = Cursor {
                word_index: idx,
                char_index: word_len,
            };
            EngineEvent::RetreatWord
        } else {
            return None;
        };

        // prefix heuristic, stored verdicts are not re-scanned
        let idx = self.cursor.word_index;
        if self.mistyped.contains(&idx) && self.words[idx].starts_with(self.typed.as_str()) {
            self.mistyped.remove(&idx);
            presenter.clear_word_flag(idx);
        }

        presenter.highlight(idx, self.cursor.char_index);
        Some(event)
    }

    fn type_char<P: Presenter + ?Sized>(&mut self, c: char, presenter: &mut P) -> Option<EngineEvent> {
        let idx = self.cursor.word_index;
        let word_len = self.word_len(idx);
        debug_assert!(
            self.cursor.char_index <= word_len,
            "cursor {:?} past word of length {}",
            self.cursor,
            word_len
        );

        self.total_keystrokes += 1;
        self.typed.push(c);

        let expected = self.words[idx].chars().nth(self.cursor.char_index);
        let Some(expected) = expected else {
            self.incorrect_chars += 1;
            self.mistyped.insert(idx);
            presenter.flag_word_mistyped(idx);
            return Some(EngineEvent::Overflow);
        };

        let verdict = if c == expected {
            self.correct_chars += 1;
            Verdict::Correct
        } else {
            self.incorrect_chars += 1;
            self.mistyped.insert(idx);
            presenter.flag_word_mistyped(idx);
            Verdict::Incorrect
        };
        self.verdicts.insert((idx, self.cursor.char_index), verdict);
        presenter.set_char_verdict(idx, self.cursor.char_index, Some(verdict));
        self.cursor.char_index += 1;
        presenter.highlight(idx, self.cursor.char_index);

        if self.cursor.char_index < word_len {
            Some(EngineEvent::AdvanceChar)
        } else if idx + 1 == self.words.len() {
            Some(EngineEvent::TestComplete)
        } else {
            Some(EngineEvent::AdvanceWord)
        }
    }

    fn word_len(&self, idx: usize) -> usize {
        self.words.get(idx).map_or(0, |w| w.chars().count())
    }

    pub fn stats(&self, final_stats: bool) -> Stats {
        self.stats_at(final_stats, Instant::now())
    }

    pub fn stats_at(&self, final_stats: bool, now: Instant) -> Stats {
        let elapsed_secs = if final_stats {
            self.duration_secs
        } else {
            self.elapsed_secs(now)
        };

        let mut stats = Stats {
            total_keystrokes: self.total_keystrokes,
            mistyped_words: self.mistyped.len(),
            ..Stats::default()
        };

        if elapsed_secs == 0 {
            return stats;
        }

        let correct = self.correct_chars as f64;
        stats.wpm = ((correct / CHARS_PER_WORD) / (elapsed_secs as f64 / 60.0)).round() as u32;

        let total_typed = self.correct_chars + self.incorrect_chars;
        if total_typed > 0 {
            stats.accuracy = (correct / total_typed as f64 * 100.0).round() as u32;
        }

        stats
    }

    /// Whole seconds since `start`, zero if the test has not started
    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        self.started_at
            .map(|started| now.saturating_duration_since(started).as_secs())
            .unwrap_or(0)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn verdict(&self, word_index: usize, char_index: usize) -> Option<Verdict> {
        self.verdicts.get(&(word_index, char_index)).copied()
    }

    pub fn is_mistyped(&self, word_index: usize) -> bool {
        self.mistyped.contains(&word_index)
    }

    pub fn mistyped_words(&self) -> &BTreeSet<usize> {
        &self.mistyped
    }

    pub fn correct_chars(&self) -> u32 {
        self.correct_chars
    }

    pub fn incorrect_chars(&self) -> u32 {
        self.incorrect_chars
    }

    pub fn total_keystrokes(&self) -> u32 {
        self.total_keystrokes
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }
}
