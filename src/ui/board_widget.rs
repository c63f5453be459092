use crate::game::{Board, Cell, Player};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Display color of a seat: player one is yellow, player two red.
pub fn player_color(player: Player) -> Color {
    match player {
        Player::One => Color::Yellow,
        Player::Two => Color::Red,
    }
}

fn cell_span(cell: Cell) -> Span<'static> {
    let (symbol, color) = match cell {
        Cell::Empty => (" . ", Color::DarkGray),
        Cell::PlayerOne => (" ● ", player_color(Player::One)),
        Cell::PlayerTwo => (" ● ", player_color(Player::Two)),
    };
    Span::styled(symbol, Style::default().fg(color))
}

/// Board with a frame sized to its own dimensions, column numbers on top,
/// and a selection marker under `selected` when given.
pub fn board_lines(board: &Board, selected: Option<usize>) -> Vec<Line<'static>> {
    let cols = board.cols();
    let inner = "═".repeat(cols * 3 + 1);
    let mut lines = Vec::with_capacity(board.rows() + 4);

    let mut col_line = vec![Span::raw("   ")];
    for col in 0..cols {
        let label = format!(" {} ", col + 1);
        if Some(col) == selected {
            col_line.push(Span::styled(
                label,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            ));
        } else {
            col_line.push(Span::raw(label));
        }
    }
    col_line.push(Span::raw("  "));
    lines.push(Line::from(col_line));

    lines.push(Line::from(format!("  ╔{inner}╗")));
    for row in 0..board.rows() {
        let mut spans = vec![Span::raw("  ║")];
        for col in 0..cols {
            spans.push(cell_span(board.get(row, col).unwrap_or(Cell::Empty)));
        }
        spans.push(Span::raw(" ║"));
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(format!("  ╚{inner}╝")));

    let mut indicator = vec![Span::raw("   ")];
    for col in 0..cols {
        if Some(col) == selected {
            indicator.push(Span::styled(" ▲ ", Style::default().fg(Color::Cyan)));
        } else {
            indicator.push(Span::raw("   "));
        }
    }
    indicator.push(Span::raw("  "));
    lines.push(Line::from(indicator));

    lines
}
