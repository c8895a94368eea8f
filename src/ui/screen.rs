use ratatui::Frame;

use crate::{ui::history::render_history, App, View};

/// A UI Screen boundary: responsible for rendering one view of the app
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Typing and results, drawn by the App widget according to the session phase
pub struct SessionScreen;

impl Screen for SessionScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_history(app, f);
    }
}

pub fn current_screen(view: View) -> Box<dyn Screen> {
    match view {
        View::Session => Box::new(SessionScreen),
        View::History => Box::new(HistoryScreen),
    }
}
