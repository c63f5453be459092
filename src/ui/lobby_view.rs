use crate::services::RankingEntry;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table},
    Frame,
};

use super::app::{AuthMode, LoginField, LoginForm};

fn split(frame: &Frame) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Body
            Constraint::Length(3), // Message
            Constraint::Length(3), // Controls
        ])
        .split(frame.area())
}

fn header(title: &str) -> Paragraph<'static> {
    Paragraph::new(title.to_string())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Connect Four"))
}

fn message_line(message: Option<&str>, color: Color) -> Paragraph<'static> {
    Paragraph::new(message.unwrap_or("").to_string())
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
}

fn controls(text: &'static str) -> Paragraph<'static> {
    Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Controls"))
}

pub fn render_login(frame: &mut Frame, form: &LoginForm) {
    let chunks = split(frame);
    let title = match form.mode {
        AuthMode::Login => "Log in",
        AuthMode::Signup => "Sign up",
    };
    frame.render_widget(header(title), chunks[0]);

    let mut lines = Vec::new();
    for field in form.fields() {
        let value = match field {
            LoginField::Password => "*".repeat(form.password.chars().count()),
            _ => form.value(field).to_string(),
        };
        let focused = field == form.focus;
        let label_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if focused { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("{:>10}: ", field.label()), label_style),
            Span::raw(format!("{value}{cursor}")),
        ]));
        lines.push(Line::from(""));
    }
    let body = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(body, chunks[1]);

    frame.render_widget(message_line(form.error.as_deref(), Color::Red), chunks[2]);
    frame.render_widget(
        controls("Tab: Next field  |  Enter: Submit  |  F2: Log in / Sign up  |  Esc: Quit"),
        chunks[3],
    );
}

pub fn render_lobby(
    frame: &mut Frame,
    username: &str,
    status: Option<&str>,
    message: Option<&str>,
) {
    let chunks = split(frame);
    frame.render_widget(header(&format!("Lobby  |  {username}")), chunks[0]);

    let mut lines = vec![Line::from("")];
    if let Some(status) = status {
        lines.push(Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(Color::Yellow),
        )));
        lines.push(Line::from(""));
    }
    lines.push(Line::from("Press P to find a match."));
    let body = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(body, chunks[1]);

    frame.render_widget(message_line(message, Color::Gray), chunks[2]);
    frame.render_widget(
        controls("P: Play  |  K: Rankings  |  L: Export logs  |  Q: Quit"),
        chunks[3],
    );
}

pub fn render_rankings(
    frame: &mut Frame,
    entries: &[RankingEntry],
    username: &str,
    message: Option<&str>,
) {
    let chunks = split(frame);
    frame.render_widget(header("Rankings"), chunks[0]);

    let rows = entries.iter().enumerate().map(|(i, entry)| {
        let style = if entry.username == username {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(vec![
            format!("{}", i + 1),
            entry.username.clone(),
            entry.score.to_string(),
        ])
        .style(style)
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Min(12),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["Rank", "Player", "Score"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(table, chunks[1]);

    let empty = entries.is_empty().then_some("No ranked players yet.");
    frame.render_widget(message_line(message.or(empty), Color::Gray), chunks[2]);
    frame.render_widget(controls("R: Refresh  |  B/Esc: Back"), chunks[3]);
}
