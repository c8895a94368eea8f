use crate::config::Config;
use crate::engine::{EngineEvent, KeyStroke, Stats, TypingEngine};
use crate::history::{ResultRecord, ResultStore};
use crate::presenter::{Presenter, WordBoard};
use crate::time_series::Sample;
use crate::util::wpm_consistency;
use crate::words::{Difficulty, WordSource};
use chrono::Utc;
use std::time::{Duration, Instant};

/// Seconds counted down before typing starts
pub const COUNTDOWN_SECS: u32 = 3;
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Countdown,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub difficulty: Difficulty,
    pub duration_secs: u64,
}

impl From<&Config> for SessionSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            difficulty: cfg.difficulty,
            duration_secs: cfg.duration_secs,
        }
    }
}

/// Fixed-period timer polled from the event loop. Missed periods are
/// skipped, not replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period: Duration,
    next_due: Instant,
}

impl Interval {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    /// True if at least one period elapsed since the last firing
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        while self.next_due <= now {
            self.next_due += self.period;
        }
        true
    }
}

/// At most one interval per role; arming a role replaces its interval
#[derive(Debug, Default, Clone)]
pub struct Timers {
    countdown: Option<Interval>,
    sampler: Option<Interval>,
}

impl Timers {
    fn arm_countdown(&mut self, now: Instant) {
        self.countdown = Some(Interval::new(COUNTDOWN_TICK, now));
    }

    fn arm_sampler(&mut self, now: Instant) {
        self.sampler = Some(Interval::new(SAMPLE_INTERVAL, now));
    }

    fn cancel_all(&mut self) {
        self.countdown = None;
        self.sampler = None;
    }

    pub fn countdown_active(&self) -> bool {
        self.countdown.is_some()
    }

    pub fn sampler_active(&self) -> bool {
        self.sampler.is_some()
    }
}

/// Everything the results screen shows about a finished test
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub stats: Stats,
    pub record: ResultRecord,
    pub saved: bool,
    pub consistency: f64,
}

/// Drives one test at a time through countdown, typing and results.
pub struct SessionController<P: Presenter = WordBoard> {
    settings: SessionSettings,
    engine: TypingEngine,
    presenter: P,
    source: Box<dyn WordSource>,
    store: Option<Box<dyn ResultStore>>,
    phase: Phase,
    timers: Timers,
    countdown_value: u32,
    samples: Vec<Sample>,
    outcome: Option<TestOutcome>,
    history: Vec<ResultRecord>,
}

impl<P: Presenter> SessionController<P> {
    pub fn new(
        settings: SessionSettings,
        source: Box<dyn WordSource>,
        store: Option<Box<dyn ResultStore>>,
        presenter: P,
    ) -> Self {
        let mut controller = Self {
            settings,
            engine: TypingEngine::default(),
            presenter,
            source,
            store,
            phase: Phase::Idle,
            timers: Timers::default(),
            countdown_value: COUNTDOWN_SECS,
            samples: Vec::new(),
            outcome: None,
            history: Vec::new(),
        };
        controller.refresh_history();
        controller.load_test();
        controller
    }

    /// Fresh words for the current settings; discards any test in progress
    pub fn load_test(&mut self) {
        let words = self.source.load(self.settings.difficulty);
        self.install(words);
    }

    pub fn restart(&mut self) {
        self.load_test();
    }

    /// Same words again
    pub fn retry(&mut self) {
        let words = self.engine.words().to_vec();
        self.install(words);
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.settings.difficulty = difficulty;
        self.load_test();
    }

    pub fn set_duration(&mut self, duration_secs: u64) {
        self.settings.duration_secs = duration_secs;
        self.load_test();
    }

    fn install(&mut self, words: Vec<String>) {
        self.timers.cancel_all();
        self.engine.reset(words, self.settings.duration_secs);
        self.presenter.render_words(self.engine.words());
        self.presenter.sync_input("");
        self.phase = Phase::Idle;
        self.countdown_value = COUNTDOWN_SECS;
        self.samples.clear();
        self.outcome = None;
        log::info!(
            "loaded {} {} words for a {}s test",
            self.engine.words().len(),
            self.settings.difficulty,
            self.settings.duration_secs
        );
    }

    pub fn on_key(&mut self, stroke: KeyStroke, now: Instant) -> Option<EngineEvent> {
        match self.phase {
            Phase::Idle => {
                // the key that starts the countdown is not typed
                if stroke.is_printable() {
                    self.begin_countdown(now);
                }
                None
            }
            Phase::Running => {
                // a key landing past the deadline closes the test unscored
                if self.engine.elapsed_secs(now) >= self.settings.duration_secs {
                    self.finish();
                    return None;
                }
                let event = self.engine.handle_key(stroke, &mut self.presenter);
                if event == Some(EngineEvent::TestComplete) {
                    self.finish();
                }
                event
            }
            Phase::Countdown | Phase::Finished => None,
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        match self.phase {
            Phase::Countdown => {
                let fired = self.timers.countdown.as_mut().is_some_and(|t| t.poll(now));
                if fired {
                    self.countdown_value = self.countdown_value.saturating_sub(1);
                    if self.countdown_value == 0 {
                        self.start_running(now);
                    }
                }
            }
            Phase::Running => {
                if self.engine.elapsed_secs(now) >= self.settings.duration_secs {
                    self.finish();
                    return;
                }
                let fired = self.timers.sampler.as_mut().is_some_and(|t| t.poll(now));
                if fired {
                    let stats = self.engine.stats_at(false, now);
                    self.samples
                        .push(Sample::new(self.engine.elapsed_secs(now), &stats));
                }
            }
            Phase::Idle | Phase::Finished => {}
        }
    }

    fn begin_countdown(&mut self, now: Instant) {
        self.phase = Phase::Countdown;
        self.countdown_value = COUNTDOWN_SECS;
        self.timers.arm_countdown(now);
        log::debug!("countdown started");
    }

    fn start_running(&mut self, now: Instant) {
        self.timers.countdown = None;
        self.engine.start(now);
        self.samples.clear();
        self.timers.arm_sampler(now);
        self.phase = Phase::Running;
        log::debug!("test running");
    }

    fn finish(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.timers.cancel_all();
        self.engine.stop();
        self.phase = Phase::Finished;

        let stats = self.engine.stats(true);
        let record = ResultRecord {
            wpm: stats.wpm,
            accuracy: stats.accuracy,
            difficulty: self.settings.difficulty,
            duration_secs: self.settings.duration_secs,
            timestamp: Utc::now(),
        };

        let saved = match self.store.as_mut() {
            Some(store) => match store.save(&record) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("result not saved: {e}");
                    false
                }
            },
            None => false,
        };
        if saved {
            self.refresh_history();
        }

        log::info!(
            "test finished: {} wpm, {}% accuracy, {} keystrokes",
            stats.wpm,
            stats.accuracy,
            stats.total_keystrokes
        );

        self.outcome = Some(TestOutcome {
            stats,
            record,
            saved,
            consistency: wpm_consistency(&self.samples),
        });
    }

    fn refresh_history(&mut self) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        match store.load_all() {
            Ok(records) => self.history = records,
            Err(e) => log::warn!("could not read past results: {e}"),
        }
    }

    pub fn seconds_left(&self, now: Instant) -> u64 {
        match self.phase {
            Phase::Running => self
                .settings
                .duration_secs
                .saturating_sub(self.engine.elapsed_secs(now)),
            Phase::Finished => 0,
            Phase::Idle | Phase::Countdown => self.settings.duration_secs,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn engine(&self) -> &TypingEngine {
        &self.engine
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn countdown_value(&self) -> u32 {
        self.countdown_value
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn outcome(&self) -> Option<&TestOutcome> {
        self.outcome.as_ref()
    }

    /// Past results in insertion order
    pub fn history(&self) -> &[ResultRecord] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Key;
    use crate::history::{HistoryError, SqliteResultStore};
    use crate::presenter::NullPresenter;
    use crate::words::FixedWords;
    use assert_matches::assert_matches;

    struct BrokenStore;

    impl ResultStore for BrokenStore {
        fn save(&mut self, _record: &ResultRecord) -> Result<(), HistoryError> {
            Err(HistoryError::Io(std::io::Error::other("disk gone")))
        }

        fn load_all(&self) -> Result<Vec<ResultRecord>, HistoryError> {
            Err(HistoryError::Io(std::io::Error::other("disk gone")))
        }
    }

    fn settings(duration_secs: u64) -> SessionSettings {
        SessionSettings {
            difficulty: Difficulty::Easy,
            duration_secs,
        }
    }

    fn controller_with(
        prompt: &str,
        store: Option<Box<dyn ResultStore>>,
    ) -> SessionController<WordBoard> {
        SessionController::new(
            settings(15),
            Box::new(FixedWords::from_prompt(prompt)),
            store,
            WordBoard::new(),
        )
    }

    fn controller(prompt: &str) -> SessionController<WordBoard> {
        controller_with(prompt, Some(Box::new(SqliteResultStore::in_memory().unwrap())))
    }

    /// Trigger and run the countdown; returns the instant typing started
    fn start_running<P: Presenter>(ctl: &mut SessionController<P>, t0: Instant) -> Instant {
        ctl.on_key(KeyStroke::char('x'), t0);
        for i in 1..=COUNTDOWN_SECS as u64 {
            ctl.on_tick(t0 + Duration::from_secs(i));
        }
        assert_eq!(ctl.phase(), Phase::Running);
        t0 + Duration::from_secs(COUNTDOWN_SECS as u64)
    }

    fn type_str<P: Presenter>(ctl: &mut SessionController<P>, text: &str, now: Instant) {
        for c in text.chars() {
            ctl.on_key(KeyStroke::char(c), now);
        }
    }

    #[test]
    fn new_controller_is_idle_with_words_rendered() {
        let ctl = controller("cat dog");

        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.engine().words(), &["cat".to_string(), "dog".to_string()]);
        assert_eq!(ctl.presenter().words().len(), 2);
        assert_eq!(ctl.presenter().current(), Some((0, 0)));
        assert_eq!(ctl.countdown_value(), COUNTDOWN_SECS);
        assert_eq!(ctl.seconds_left(Instant::now()), 15);
    }

    #[test]
    fn only_printable_keys_start_the_countdown() {
        let mut ctl = controller("cat");
        let now = Instant::now();

        ctl.on_key(KeyStroke::new(Key::Other), now);
        ctl.on_key(KeyStroke::new(Key::Backspace), now);
        let ctrl = crate::engine::Modifiers {
            ctrl: true,
            ..Default::default()
        };
        ctl.on_key(KeyStroke::char('c').with_modifiers(ctrl), now);
        assert_eq!(ctl.phase(), Phase::Idle);

        ctl.on_key(KeyStroke::char('c'), now);
        assert_eq!(ctl.phase(), Phase::Countdown);
        assert!(ctl.timers().countdown_active());
        // the starting key is consumed
        assert_eq!(ctl.engine().typed(), "");
        assert_eq!(ctl.engine().total_keystrokes(), 0);
    }

    #[test]
    fn countdown_runs_three_ticks_and_ignores_keys() {
        let mut ctl = controller("cat");
        let t0 = Instant::now();
        ctl.on_key(KeyStroke::char('a'), t0);

        ctl.on_tick(t0 + Duration::from_millis(500));
        assert_eq!(ctl.countdown_value(), 3);
        ctl.on_tick(t0 + Duration::from_secs(1));
        assert_eq!(ctl.countdown_value(), 2);

        assert_eq!(ctl.on_key(KeyStroke::char('c'), t0 + Duration::from_secs(1)), None);
        assert_eq!(ctl.engine().total_keystrokes(), 0);

        ctl.on_tick(t0 + Duration::from_secs(2));
        assert_eq!(ctl.phase(), Phase::Countdown);
        ctl.on_tick(t0 + Duration::from_secs(3));

        assert_eq!(ctl.phase(), Phase::Running);
        assert!(ctl.engine().is_running());
        assert!(!ctl.timers().countdown_active());
        assert!(ctl.timers().sampler_active());
    }

    #[test]
    fn finishing_last_word_completes_and_saves() {
        let mut ctl = controller("cat dog");
        let t_run = start_running(&mut ctl, Instant::now());

        type_str(&mut ctl, "cat do", t_run);
        assert_eq!(ctl.phase(), Phase::Running);
        assert_matches!(
            ctl.on_key(KeyStroke::char('g'), t_run),
            Some(EngineEvent::TestComplete)
        );

        assert_eq!(ctl.phase(), Phase::Finished);
        assert!(!ctl.engine().is_running());
        assert!(!ctl.timers().countdown_active());
        assert!(!ctl.timers().sampler_active());

        let outcome = ctl.outcome().unwrap();
        assert!(outcome.saved);
        // final stats use the configured duration: (6 / 5) / (15 / 60) = 4.8
        assert_eq!(outcome.stats.wpm, 5);
        assert_eq!(outcome.stats.accuracy, 100);
        assert_eq!(outcome.record.duration_secs, 15);
        assert_eq!(outcome.record.difficulty, Difficulty::Easy);
        assert_eq!(ctl.history().len(), 1);
        assert_eq!(ctl.history()[0], outcome.record);
    }

    #[test]
    fn keys_after_finish_are_ignored() {
        let mut ctl = controller("hi");
        let t_run = start_running(&mut ctl, Instant::now());
        type_str(&mut ctl, "hi", t_run);
        assert_eq!(ctl.phase(), Phase::Finished);

        assert_eq!(ctl.on_key(KeyStroke::new(Key::Backspace), t_run), None);
        assert_eq!(ctl.engine().cursor().char_index, 2);
    }

    #[test]
    fn key_after_deadline_finishes_without_scoring() {
        let mut ctl = controller("a long list of words");
        let t_run = start_running(&mut ctl, Instant::now());

        ctl.on_tick(t_run + Duration::from_millis(14_950));
        assert_eq!(ctl.phase(), Phase::Running);

        let late = ctl.on_key(KeyStroke::char('a'), t_run + Duration::from_millis(15_050));

        assert_eq!(late, None);
        assert_eq!(ctl.phase(), Phase::Finished);
        assert_eq!(ctl.engine().correct_chars(), 0);
        assert_eq!(ctl.engine().total_keystrokes(), 0);
        assert!(!ctl.timers().sampler_active());
        assert_eq!(ctl.history().len(), 1);
    }

    #[test]
    fn timeout_finishes_with_one_record() {
        let mut ctl = controller("a long list of words");
        let t_run = start_running(&mut ctl, Instant::now());
        type_str(&mut ctl, "a lo", t_run);

        ctl.on_tick(t_run + Duration::from_secs(14));
        assert_eq!(ctl.phase(), Phase::Running);
        assert_eq!(ctl.seconds_left(t_run + Duration::from_secs(14)), 1);

        ctl.on_tick(t_run + Duration::from_secs(15));
        assert_eq!(ctl.phase(), Phase::Finished);
        ctl.on_tick(t_run + Duration::from_secs(16));

        assert_eq!(ctl.history().len(), 1);
        assert_eq!(ctl.outcome().unwrap().stats.total_keystrokes, 3);
    }

    #[test]
    fn samples_follow_ticks_not_keys() {
        let mut ctl = controller("the quick brown fox");
        let t_run = start_running(&mut ctl, Instant::now());

        type_str(&mut ctl, "the ", t_run);
        assert!(ctl.samples().is_empty());

        ctl.on_tick(t_run + Duration::from_millis(400));
        assert!(ctl.samples().is_empty());

        ctl.on_tick(t_run + Duration::from_secs(1));
        type_str(&mut ctl, "qu", t_run + Duration::from_millis(1500));
        ctl.on_tick(t_run + Duration::from_secs(2));

        let samples = ctl.samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].t, 1);
        // 3 correct chars after one second: (3 / 5) * 60 = 36
        assert_eq!(samples[0].wpm, 36);
        assert_eq!(samples[0].accuracy, 100);
        assert_eq!(samples[1].t, 2);
        assert_eq!(samples[1].wpm, 30);
    }

    #[test]
    fn restart_mid_test_clears_timers_and_state() {
        let mut ctl = controller("cat dog");
        let t_run = start_running(&mut ctl, Instant::now());
        type_str(&mut ctl, "ca", t_run);
        ctl.on_tick(t_run + Duration::from_secs(1));

        ctl.restart();

        assert_eq!(ctl.phase(), Phase::Idle);
        assert!(!ctl.timers().countdown_active());
        assert!(!ctl.timers().sampler_active());
        assert!(ctl.samples().is_empty());
        assert!(ctl.outcome().is_none());
        assert_eq!(ctl.engine().correct_chars(), 0);
        assert!(!ctl.engine().is_running());
        assert_eq!(ctl.presenter().input(), "");
        assert!(ctl.history().is_empty());
    }

    #[test]
    fn restart_during_countdown_cancels_it() {
        let mut ctl = controller("cat");
        let t0 = Instant::now();
        ctl.on_key(KeyStroke::char('c'), t0);

        ctl.restart();
        ctl.on_tick(t0 + Duration::from_secs(5));

        assert_eq!(ctl.phase(), Phase::Idle);
        assert!(!ctl.timers().countdown_active());
    }

    #[test]
    fn retry_keeps_the_same_words() {
        let mut ctl = controller("one two three");
        let t_run = start_running(&mut ctl, Instant::now());
        type_str(&mut ctl, "one two three", t_run);
        assert_eq!(ctl.phase(), Phase::Finished);

        ctl.retry();

        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.engine().words().len(), 3);
        assert_eq!(ctl.engine().words()[0], "one");
        assert_eq!(ctl.engine().total_keystrokes(), 0);
    }

    #[test]
    fn changing_settings_discards_the_test() {
        let mut ctl = controller("cat dog");
        let t_run = start_running(&mut ctl, Instant::now());
        type_str(&mut ctl, "ca", t_run);

        ctl.set_duration(30);
        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.settings().duration_secs, 30);
        assert_eq!(ctl.engine().duration_secs(), 30);
        assert_eq!(ctl.engine().total_keystrokes(), 0);

        ctl.set_difficulty(Difficulty::Hard);
        assert_eq!(ctl.settings().difficulty, Difficulty::Hard);
        assert_eq!(ctl.phase(), Phase::Idle);
    }

    #[test]
    fn broken_store_still_produces_an_outcome() {
        let mut ctl = controller_with("hi", Some(Box::new(BrokenStore)));
        let t_run = start_running(&mut ctl, Instant::now());

        type_str(&mut ctl, "hi", t_run);

        assert_eq!(ctl.phase(), Phase::Finished);
        let outcome = ctl.outcome().unwrap();
        assert!(!outcome.saved);
        assert_eq!(outcome.stats.accuracy, 100);
        assert!(ctl.history().is_empty());
    }

    #[test]
    fn missing_store_skips_saving() {
        let mut ctl = SessionController::new(
            settings(15),
            Box::new(FixedWords::from_prompt("hi")),
            None,
            NullPresenter,
        );
        let t_run = start_running(&mut ctl, Instant::now());

        type_str(&mut ctl, "hi", t_run);

        assert_eq!(ctl.phase(), Phase::Finished);
        assert!(!ctl.outcome().unwrap().saved);
    }

    #[test]
    fn interval_skips_missed_periods() {
        let t0 = Instant::now();
        let mut interval = Interval::new(Duration::from_secs(1), t0);

        assert!(!interval.poll(t0));
        assert!(interval.poll(t0 + Duration::from_millis(3500)));
        assert!(!interval.poll(t0 + Duration::from_millis(3900)));
        assert!(interval.poll(t0 + Duration::from_secs(4)));
    }
}
