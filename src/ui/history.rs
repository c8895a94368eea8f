use chrono::Local;
use keysprint::history::{newest_first, ResultRecord};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::App;

/// One history row; wpm and accuracy colored by band
pub fn present_row(record: &ResultRecord) -> Row<'static> {
    let wpm_color = if record.wpm >= 60 {
        Color::Green
    } else if record.wpm >= 30 {
        Color::Yellow
    } else {
        Color::Red
    };

    let accuracy_color = if record.accuracy >= 95 {
        Color::Green
    } else if record.accuracy >= 85 {
        Color::Yellow
    } else {
        Color::Red
    };

    Row::new(vec![
        Cell::from(record.wpm.to_string()).style(
            Style::default()
                .fg(wpm_color)
                .add_modifier(Modifier::BOLD),
        ),
        Cell::from(format!("{}%", record.accuracy)).style(Style::default().fg(accuracy_color)),
        Cell::from(record.difficulty.to_string()),
        Cell::from(format!("{}s", record.duration_secs)),
        Cell::from(
            record
                .timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
        ),
    ])
}

/// Past results, newest first
pub fn render_history(app: &App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(0),    // table
            Constraint::Length(3), // instructions
        ])
        .split(area);

    let records = newest_first(app.controller.history());

    let title = Paragraph::new(format!("Past results ({})", records.len()))
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if records.is_empty() {
        let empty = Paragraph::new("No saved results yet")
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC))
            .alignment(Alignment::Center);
        f.render_widget(empty, chunks[1]);
    } else {
        // table borders and header take three rows
        let visible = chunks[1].height.saturating_sub(3).max(1) as usize;
        let offset = app.history_scroll.min(records.len().saturating_sub(1));

        let rows: Vec<Row> = records.iter().skip(offset).take(visible).map(present_row).collect();

        let header = Row::new(vec!["WPM", "Acc", "Difficulty", "Length", "Date"]).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Length(6),
                Constraint::Length(12),
                Constraint::Length(8),
                Constraint::Min(16),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new("↑/↓ PgUp/PgDn Home scroll | (b)ack | (tab) new test | (esc)ape")
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC))
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}
