pub mod charting;
pub mod history;
pub mod screen;

use keysprint::{
    engine::Verdict,
    history::sorted_by_timestamp,
    presenter::WordBoard,
    session::{Phase, TestOutcome},
    time_series::Sample,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Chart, Clear, Dataset, GraphType, Paragraph, Widget},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use crate::{
    ui::charting::{compute_chart_bounds, format_label},
    App,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
/// Rows of words visible at once
const BOARD_LINES: usize = 3;

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(app.view).render(app, f);
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.controller.phase() {
            Phase::Idle | Phase::Countdown | Phase::Running => render_typing(self, area, buf),
            Phase::Finished => {
                if let Some(outcome) = self.controller.outcome() {
                    render_results(self, outcome, area, buf);
                }
            }
        }
    }
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let ctl = &app.controller;
    let settings = ctl.settings();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([
            Constraint::Length(1),                  // header
            Constraint::Length(1),                  // padding
            Constraint::Length(1),                  // status
            Constraint::Length(1),                  // padding
            Constraint::Length(BOARD_LINES as u16), // words
            Constraint::Length(1),                  // padding
            Constraint::Length(1),                  // input
            Constraint::Length(1),                  // padding
            Constraint::Min(0),                     // live chart
            Constraint::Length(1),                  // legend
        ])
        .split(area);

    let header = Paragraph::new(Line::from(vec![
        Span::styled("keysprint", bold().fg(Color::Magenta)),
        Span::styled(
            format!("   {}   {}s", settings.difficulty, settings.duration_secs),
            dim_bold(),
        ),
    ]))
    .alignment(Alignment::Center);
    header.render(chunks[0], buf);

    let status = match ctl.phase() {
        Phase::Idle => Span::styled(
            "press a key to start",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        ),
        Phase::Countdown => Span::styled(
            format!("starting in {}", ctl.countdown_value()),
            bold().fg(Color::Yellow),
        ),
        _ => {
            let stats = ctl.engine().stats_at(false, app.now);
            Span::styled(
                format!(
                    "{}s   {} wpm   {}% acc",
                    ctl.seconds_left(app.now),
                    stats.wpm,
                    stats.accuracy
                ),
                bold(),
            )
        }
    };
    Paragraph::new(status)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    render_board(ctl.presenter(), ctl.engine().cursor().word_index, chunks[4], buf);

    if ctl.phase() == Phase::Countdown {
        Clear.render(chunks[4], buf);
        Paragraph::new(Span::styled(
            ctl.countdown_value().to_string(),
            bold().fg(Color::Yellow),
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    let input = Paragraph::new(Line::from(vec![
        Span::styled("> ", dim_bold()),
        Span::styled(ctl.presenter().input().to_string(), bold()),
    ]));
    input.render(chunks[6], buf);

    if ctl.phase() == Phase::Running {
        render_live_chart(ctl.samples(), settings.duration_secs, chunks[8], buf);
    }

    let legend = if ctl.phase() == Phase::Idle {
        "(←/→) difficulty / (↑/↓) duration / (tab) new words / (esc)ape"
    } else {
        "(tab) restart / (esc)ape"
    };
    Paragraph::new(Span::styled(legend, italic())).render(chunks[9], buf);
}

fn word_width(word: &[char]) -> usize {
    word.iter().map(|c| c.width().unwrap_or(0)).sum()
}

/// Greedy wrap of word indices into lines no wider than `width` columns
pub fn layout_lines(words: &[Vec<char>], width: usize) -> Vec<Vec<usize>> {
    let mut lines = Vec::new();
    let mut line: Vec<usize> = Vec::new();
    let mut used = 0;

    for (idx, word) in words.iter().enumerate() {
        let w = word_width(word);
        let needed = if line.is_empty() { w } else { used + 1 + w };
        if !line.is_empty() && needed > width {
            lines.push(std::mem::take(&mut line));
            used = w;
        } else {
            used = needed;
        }
        line.push(idx);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// The window of lines to show: the line holding `current_word` is the
/// second one once there is a line above it.
pub fn visible_lines(lines: &[Vec<usize>], current_word: usize) -> &[Vec<usize>] {
    let line = lines
        .iter()
        .position(|l| l.contains(&current_word))
        .unwrap_or(0);
    let start = line
        .saturating_sub(1)
        .min(lines.len().saturating_sub(BOARD_LINES));
    &lines[start..(start + BOARD_LINES).min(lines.len())]
}

pub fn word_spans(board: &WordBoard, word_index: usize) -> Vec<Span<'static>> {
    let Some(word) = board.words().get(word_index) else {
        return Vec::new();
    };

    word.iter()
        .enumerate()
        .map(|(char_index, c)| {
            let mut style = match board.verdict(word_index, char_index) {
                Some(Verdict::Correct) => bold().fg(Color::Green),
                Some(Verdict::Incorrect) => bold().fg(Color::Red),
                None => dim_bold(),
            };
            if board.is_flagged(word_index) {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            if board.current() == Some((word_index, char_index)) {
                style = style
                    .remove_modifier(Modifier::DIM)
                    .add_modifier(Modifier::REVERSED);
            }
            Span::styled(c.to_string(), style)
        })
        .collect()
}

fn render_board(board: &WordBoard, cursor_word: usize, area: Rect, buf: &mut Buffer) {
    if board.words().is_empty() {
        return;
    }

    let current_word = board
        .current()
        .map(|(w, _)| w)
        .unwrap_or(cursor_word)
        .min(board.words().len() - 1);
    let lines = layout_lines(board.words(), area.width as usize);

    let text: Vec<Line> = visible_lines(&lines, current_word)
        .iter()
        .map(|line| {
            let mut spans = Vec::new();
            for (pos, &word_index) in line.iter().enumerate() {
                if pos > 0 {
                    spans.push(Span::raw(" "));
                }
                spans.extend(word_spans(board, word_index));
            }
            Line::from(spans)
        })
        .collect();

    Paragraph::new(text).render(area, buf);
}

fn series_chart<'a>(
    datasets: Vec<Dataset<'a>>,
    x_title: &'a str,
    x_bounds: [f64; 2],
    max_y: f64,
) -> Chart<'a> {
    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title(x_title)
                .bounds(x_bounds)
                .labels(vec![
                    Span::styled(format_label(x_bounds[0]), bold()),
                    Span::styled(format_label(x_bounds[1]), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, max_y])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(format_label(max_y), bold()),
                ]),
        )
}

fn wpm_dataset(data: &[(f64, f64)]) -> Dataset<'_> {
    Dataset::default()
        .name("wpm")
        .marker(Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(data)
}

fn accuracy_dataset(data: &[(f64, f64)]) -> Dataset<'_> {
    Dataset::default()
        .name("acc %")
        .marker(Marker::Braille)
        .style(Style::default().fg(Color::Cyan))
        .graph_type(GraphType::Line)
        .data(data)
}

fn render_live_chart(samples: &[Sample], duration_secs: u64, area: Rect, buf: &mut Buffer) {
    let wpm: Vec<(f64, f64)> = samples.iter().map(Sample::wpm_point).collect();
    let accuracy: Vec<(f64, f64)> = samples.iter().map(Sample::accuracy_point).collect();
    let (max_x, max_y) = compute_chart_bounds(&wpm, duration_secs as f64, 100.0);

    series_chart(
        vec![wpm_dataset(&wpm), accuracy_dataset(&accuracy)],
        "seconds",
        [0.0, max_x],
        max_y,
    )
    .render(area, buf);
}

fn render_results(app: &App, outcome: &TestOutcome, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // trend chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // details
            Constraint::Length(1), // saved note
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let past = sorted_by_timestamp(app.controller.history());
    if past.is_empty() {
        Paragraph::new(Span::styled("no saved results to chart", italic()))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);
    } else {
        let wpm: Vec<(f64, f64)> = past
            .iter()
            .enumerate()
            .map(|(i, r)| ((i + 1) as f64, r.wpm as f64))
            .collect();
        let accuracy: Vec<(f64, f64)> = past
            .iter()
            .enumerate()
            .map(|(i, r)| ((i + 1) as f64, r.accuracy as f64))
            .collect();
        let (max_x, max_y) = compute_chart_bounds(&wpm, 2.0, 100.0);

        series_chart(
            vec![wpm_dataset(&wpm), accuracy_dataset(&accuracy)],
            "test",
            [1.0, max_x],
            max_y,
        )
        .render(chunks[0], buf);
    }

    let stats = &outcome.stats;
    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {:.2} sd",
            stats.wpm, stats.accuracy, outcome.consistency
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} keystrokes   {} mistyped words   {} {}s",
            stats.total_keystrokes,
            stats.mistyped_words,
            outcome.record.difficulty,
            outcome.record.duration_secs
        ),
        dim_bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let note = if outcome.saved {
        Span::styled("saved to history", italic().fg(Color::Green))
    } else {
        Span::styled("not saved", italic().fg(Color::Gray))
    };
    Paragraph::new(note)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(r)etry / (n)ew / (d)ifficulty / (t)ime / (h)istory / (esc)ape",
        italic(),
    ))
    .render(chunks[5], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{start_typing, test_app, type_text};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use keysprint::presenter::Presenter;
    use std::time::{Duration, Instant};

    fn rendered(app: &App, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);

        app.render(area, &mut buffer);

        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    fn chars(list: &[&str]) -> Vec<Vec<char>> {
        list.iter().map(|w| w.chars().collect()).collect()
    }

    #[test]
    fn test_idle_screen() {
        let app = test_app("hello world");

        let text = rendered(&app, 80, 24);
        assert!(text.contains("keysprint"));
        assert!(text.contains("easy"));
        assert!(text.contains("15s"));
        assert!(text.contains("press a key to start"));
        assert!(text.contains("hello world"));
        assert!(text.contains("difficulty"));
    }

    #[test]
    fn test_countdown_screen() {
        let mut app = test_app("hello world");
        app.on_key(KeyEvent::new(KeyCode::Char('h'), KeyModifiers::NONE), Instant::now());

        let text = rendered(&app, 80, 24);
        assert!(text.contains("starting in 3"));
        assert!(!text.contains("hello world"));
    }

    #[test]
    fn test_running_screen_shows_input_and_time() {
        let mut app = test_app("cat dog");
        let t_run = start_typing(&mut app);
        type_text(&mut app, "ca", t_run);

        let text = rendered(&app, 80, 24);
        assert!(text.contains("15s"));
        assert!(text.contains("> ca"));
        assert!(text.contains("cat dog"));
        assert!(text.contains("(tab) restart"));
    }

    #[test]
    fn test_results_screen() {
        let mut app = test_app("cat dog");
        let t_run = start_typing(&mut app);
        app.on_tick(t_run + Duration::from_secs(1));
        type_text(&mut app, "cat dog", t_run + Duration::from_secs(2));

        let text = rendered(&app, 80, 24);
        assert!(text.contains("wpm"));
        assert!(text.contains("6 keystrokes"));
        assert!(text.contains("0 mistyped words"));
        assert!(text.contains("saved to history"));
        assert!(text.contains("(r)etry"));
    }

    #[test]
    fn test_small_areas_do_not_panic() {
        let mut app = test_app("some words to type");
        rendered(&app, 10, 4);

        let t_run = start_typing(&mut app);
        type_text(&mut app, "some", t_run);
        rendered(&app, 12, 3);

        type_text(&mut app, " words to type", t_run);
        rendered(&app, 8, 2);
    }

    #[test]
    fn test_layout_lines_wraps_on_width() {
        let words = chars(&["aaa", "bb", "cccc"]);

        assert_eq!(layout_lines(&words, 6), vec![vec![0, 1], vec![2]]);
        assert_eq!(layout_lines(&words, 80), vec![vec![0, 1, 2]]);
        assert_eq!(layout_lines(&[], 10), Vec::<Vec<usize>>::new());
    }

    #[test]
    fn test_layout_lines_uses_display_width() {
        let words = chars(&["日本", "語"]);

        assert_eq!(layout_lines(&words, 5), vec![vec![0], vec![1]]);
        assert_eq!(layout_lines(&words, 7), vec![vec![0, 1]]);
    }

    #[test]
    fn test_visible_lines_follow_current_word() {
        let lines: Vec<Vec<usize>> = (0..10).map(|i| vec![i]).collect();

        assert_eq!(visible_lines(&lines, 0), &lines[0..3]);
        assert_eq!(visible_lines(&lines, 1), &lines[0..3]);
        assert_eq!(visible_lines(&lines, 5), &lines[4..7]);
        assert_eq!(visible_lines(&lines, 9), &lines[7..10]);
        assert_eq!(visible_lines(&lines[..2], 1), &lines[0..2]);
    }

    #[test]
    fn test_word_spans_styles() {
        let mut board = WordBoard::new();
        board.render_words(&["cat".to_string()]);
        board.set_char_verdict(0, 0, Some(Verdict::Correct));
        board.set_char_verdict(0, 1, Some(Verdict::Incorrect));
        board.flag_word_mistyped(0);
        board.highlight(0, 2);

        let spans = word_spans(&board, 0);

        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].style.fg, Some(Color::Green));
        assert_eq!(spans[1].style.fg, Some(Color::Red));
        assert!(spans[1].style.add_modifier.contains(Modifier::UNDERLINED));
        assert!(spans[2].style.add_modifier.contains(Modifier::REVERSED));
        assert!(word_spans(&board, 4).is_empty());
    }

    #[test]
    fn test_ui_constants() {
        assert_eq!(HORIZONTAL_MARGIN, 5);
        assert_eq!(VERTICAL_MARGIN, 2);
        assert_eq!(BOARD_LINES, 3);
    }
}
