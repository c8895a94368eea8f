mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use keysprint::{
    app_dirs::AppDirs,
    config::{next_duration, parse_duration, prev_duration, Config, ConfigStore, FileConfigStore},
    engine::KeyStroke,
    history::{ResultStore, SqliteResultStore},
    logging,
    presenter::WordBoard,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    session::{Phase, SessionController, SessionSettings},
    words::{Difficulty, DirectoryWords, EmbeddedWords, FixedWords, WordSource},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Instant,
};

const HISTORY_PAGE: usize = 10;

/// timed typing tests with live wpm/accuracy and local result history
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "A timed typing test for the terminal. Words come from embedded easy/medium/hard pools, progress is charted live, and the last 20 results are kept locally."
)]
pub struct Cli {
    /// word pool to draw from
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// test length in seconds: 15, 30, 60 or 120
    #[clap(short = 's', long, value_parser = parse_duration)]
    secs: Option<u64>,

    /// directory holding easy.json, medium.json and hard.json pools
    #[clap(long)]
    words_dir: Option<PathBuf>,

    /// type these space-separated words instead of a random selection
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// do not save results
    #[clap(long)]
    no_save: bool,
}

impl Cli {
    /// Flags override the saved config for this run only
    fn apply_to(&self, mut cfg: Config) -> Config {
        if let Some(difficulty) = self.difficulty {
            cfg.difficulty = difficulty;
        }
        if let Some(secs) = self.secs {
            cfg.duration_secs = secs;
        }
        if self.words_dir.is_some() {
            cfg.words_dir = self.words_dir.clone();
        }
        cfg
    }

    fn word_source(&self, cfg: &Config) -> Box<dyn WordSource> {
        if let Some(prompt) = &self.prompt {
            return Box::new(FixedWords::from_prompt(prompt));
        }
        match &cfg.words_dir {
            Some(dir) => Box::new(DirectoryWords::new(dir)),
            None => Box::new(EmbeddedWords),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Session,
    History,
}

pub struct App {
    pub controller: SessionController<WordBoard>,
    pub view: View,
    pub history_scroll: usize,
    /// time of the last event, used when rendering countdowns
    pub now: Instant,
    pub should_quit: bool,
    config: Config,
    config_store: Box<dyn ConfigStore>,
}

impl App {
    pub fn new(
        cli: &Cli,
        config_store: Box<dyn ConfigStore>,
        result_store: Option<Box<dyn ResultStore>>,
    ) -> Self {
        let config = cli.apply_to(config_store.load());
        let controller = SessionController::new(
            SessionSettings::from(&config),
            cli.word_source(&config),
            result_store,
            WordBoard::new(),
        );

        Self {
            controller,
            view: View::Session,
            history_scroll: 0,
            now: Instant::now(),
            should_quit: false,
            config,
            config_store,
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.now = now;
        self.controller.on_tick(now);
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) {
        self.now = now;

        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            self.should_quit = true;
            return;
        }
        if key.code == KeyCode::Tab {
            self.view = View::Session;
            self.controller.restart();
            return;
        }

        match self.view {
            View::History => self.on_history_key(key),
            View::Session => match self.controller.phase() {
                Phase::Idle => match key.code {
                    KeyCode::Left => self.change_difficulty(self.controller.settings().difficulty.prev()),
                    KeyCode::Right => self.change_difficulty(self.controller.settings().difficulty.next()),
                    KeyCode::Up => self.change_duration(next_duration(self.controller.settings().duration_secs)),
                    KeyCode::Down => self.change_duration(prev_duration(self.controller.settings().duration_secs)),
                    _ => {
                        self.controller.on_key(KeyStroke::from(key), now);
                    }
                },
                Phase::Countdown | Phase::Running => {
                    self.controller.on_key(KeyStroke::from(key), now);
                }
                Phase::Finished => match key.code {
                    KeyCode::Char('r') => self.controller.retry(),
                    KeyCode::Char('n') | KeyCode::Enter => self.controller.restart(),
                    KeyCode::Char('d') => self.change_difficulty(self.controller.settings().difficulty.next()),
                    KeyCode::Char('t') => self.change_duration(next_duration(self.controller.settings().duration_secs)),
                    KeyCode::Char('h') => {
                        self.view = View::History;
                        self.history_scroll = 0;
                    }
                    _ => {}
                },
            },
        }
    }

    fn on_history_key(&mut self, key: KeyEvent) {
        let max_scroll = self.controller.history().len().saturating_sub(1);
        match key.code {
            KeyCode::Char('b') | KeyCode::Backspace => self.view = View::Session,
            KeyCode::Up => self.history_scroll = self.history_scroll.saturating_sub(1),
            KeyCode::Down => self.history_scroll = (self.history_scroll + 1).min(max_scroll),
            KeyCode::PageUp => self.history_scroll = self.history_scroll.saturating_sub(HISTORY_PAGE),
            KeyCode::PageDown => {
                self.history_scroll = (self.history_scroll + HISTORY_PAGE).min(max_scroll)
            }
            KeyCode::Home => self.history_scroll = 0,
            _ => {}
        }
    }

    fn change_difficulty(&mut self, difficulty: Difficulty) {
        self.controller.set_difficulty(difficulty);
        self.config.difficulty = difficulty;
        self.save_config();
    }

    fn change_duration(&mut self, secs: u64) {
        self.controller.set_duration(secs);
        self.config.duration_secs = secs;
        self.save_config();
    }

    fn save_config(&self) {
        if let Err(e) = self.config_store.save(&self.config) {
            log::warn!("failed to save config: {e}");
        }
    }
}

fn open_result_store() -> Option<Box<dyn ResultStore>> {
    let path = AppDirs::results_db_path()?;
    match SqliteResultStore::open(&path) {
        Ok(store) => Some(Box::new(store)),
        Err(e) => {
            log::warn!("results will not be saved, {}: {e}", path.display());
            None
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(path) = AppDirs::log_path() {
        if let Err(e) = logging::init(&path) {
            eprintln!("keysprint: logging disabled: {e}");
        }
    }

    let result_store = if cli.no_save {
        None
    } else {
        open_result_store()
    };
    let mut app = App::new(&cli, Box::new(FileConfigStore::new()), result_store);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        log::error!("exiting after error: {e}");
    }
    res
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());

    terminal.draw(|f| ui::draw(app, f))?;
    while !app.should_quit {
        match runner.step() {
            AppEvent::Tick => app.on_tick(Instant::now()),
            AppEvent::Resize => {}
            AppEvent::Key(key) => app.on_key(key, Instant::now()),
        }
        terminal.draw(|f| ui::draw(app, f))?;
    }

    Ok(())
}
