//! Terminal UI: login, lobby, rankings, and the live game screen.

mod app;
pub mod board_widget;
mod game_view;
mod lobby_view;

pub use app::App;
