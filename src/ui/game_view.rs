use crate::session::{SessionMachine, SessionState};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::board_widget::{board_lines, player_color};

pub fn render(
    frame: &mut Frame,
    machine: &SessionMachine,
    selected_column: usize,
    message: &Option<String>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(12),   // Board
            Constraint::Length(4), // Status
            Constraint::Length(3), // Controls
        ])
        .split(frame.area());

    render_header(frame, machine, chunks[0]);
    render_board(frame, machine, selected_column, chunks[1]);
    render_status(frame, machine, message, chunks[2]);
    render_controls(frame, machine.state(), chunks[3]);
}

fn render_header(frame: &mut Frame, machine: &SessionMachine, area: Rect) {
    let timer = machine.timer().display();

    let line = match (machine.state(), machine.session()) {
        (SessionState::Connecting, _) => Line::from("Connecting to the game server..."),
        (SessionState::WaitingForOpponent, _) => {
            Line::from(format!("Looking for an opponent  |  {timer}"))
        }
        (_, Some(session)) => {
            let me = session.player_number;
            let mut spans = vec![
                Span::styled(
                    session.local_name().to_string(),
                    Style::default()
                        .fg(player_color(me))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" vs "),
                Span::styled(
                    session.opponent_name().to_string(),
                    Style::default()
                        .fg(player_color(me.other()))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  |  "),
            ];
            let turn = match machine.state() {
                SessionState::InProgress if machine.is_my_turn() => {
                    Span::styled("Your turn", Style::default().fg(Color::Green))
                }
                SessionState::InProgress => Span::raw("Opponent's turn"),
                _ => Span::raw("Game over"),
            };
            spans.push(turn);
            spans.push(Span::raw(format!("  |  {timer}")));
            Line::from(spans)
        }
        (_, None) => Line::from(""),
    };

    let header = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Connect Four"));
    frame.render_widget(header, area);
}

fn render_board(frame: &mut Frame, machine: &SessionMachine, selected_column: usize, area: Rect) {
    let selected = (machine.state() == SessionState::InProgress && machine.is_my_turn())
        .then_some(selected_column);
    let board_widget =
        Paragraph::new(board_lines(machine.board(), selected)).alignment(Alignment::Center);
    frame.render_widget(board_widget, area);
}

fn render_status(
    frame: &mut Frame,
    machine: &SessionMachine,
    message: &Option<String>,
    area: Rect,
) {
    let mut lines = Vec::new();
    if let Some(result) = machine.result() {
        lines.push(Line::from(Span::styled(
            result.message.clone(),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )));
    }
    if let Some(status) = machine.status() {
        let color = match machine.state() {
            SessionState::EndedAbnormally => Color::Red,
            _ => Color::Yellow,
        };
        lines.push(Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(color),
        )));
    }
    if let Some(message) = message {
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Gray),
        )));
    }

    let status_widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, area);
}

fn render_controls(frame: &mut Frame, state: SessionState, area: Rect) {
    let text = match state {
        SessionState::Connecting | SessionState::WaitingForOpponent => "Esc: Cancel  |  Q: Quit",
        SessionState::InProgress => "←/→: Move  |  Enter: Drop  |  Q: Quit",
        SessionState::EndedNormally | SessionState::EndedAbnormally => {
            "Enter/B: Back to lobby  |  Q: Quit"
        }
        SessionState::Idle => "",
    };

    let controls = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Controls"));
    frame.render_widget(controls, area);
}
