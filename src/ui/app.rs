use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{backend::Backend, Terminal};
use reqwest::Url;
use tokio::runtime::Handle;
use tracing::{error, info};

use crate::client::GameClient;
use crate::config::AppConfig;
use crate::error::{ServiceError, StartupError};
use crate::logging::DebugLog;
use crate::net::{ConnectionManager, Connector, WebSocketConnector};
use crate::services::{AuthClient, LoginRequest, RankingClient, RankingEntry, SignupRequest};
use crate::session::{MoveOutcome, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Email,
    Password,
}

impl LoginField {
    pub fn label(self) -> &'static str {
        match self {
            LoginField::Username => "Username",
            LoginField::Email => "Email",
            LoginField::Password => "Password",
        }
    }
}

/// Text entered on the login screen.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub mode: AuthMode,
    pub focus: LoginField,
    pub username: String,
    pub email: String,
    pub password: String,
    pub error: Option<String>,
}

impl LoginForm {
    fn new() -> Self {
        LoginForm {
            mode: AuthMode::Login,
            focus: LoginField::Username,
            username: String::new(),
            email: String::new(),
            password: String::new(),
            error: None,
        }
    }

    /// Fields shown for the current mode, in tab order.
    pub fn fields(&self) -> Vec<LoginField> {
        match self.mode {
            AuthMode::Login => vec![LoginField::Username, LoginField::Password],
            AuthMode::Signup => vec![LoginField::Username, LoginField::Email, LoginField::Password],
        }
    }

    pub fn value(&self, field: LoginField) -> &str {
        match field {
            LoginField::Username => &self.username,
            LoginField::Email => &self.email,
            LoginField::Password => &self.password,
        }
    }

    fn value_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    fn cycle_focus(&mut self, forward: bool) {
        let fields = self.fields();
        let i = fields.iter().position(|&f| f == self.focus).unwrap_or(0);
        let next = if forward {
            (i + 1) % fields.len()
        } else {
            (i + fields.len() - 1) % fields.len()
        };
        self.focus = fields[next];
    }

    fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Signup,
            AuthMode::Signup => AuthMode::Login,
        };
        if !self.fields().contains(&self.focus) {
            self.focus = LoginField::Username;
        }
        self.error = None;
    }

    /// Local checks before anything is sent.
    fn check(&self) -> Result<(), String> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err("Username and password required".to_string());
        }
        if self.mode == AuthMode::Signup && !self.email.contains('@') {
            return Err("Enter a valid email address".to_string());
        }
        Ok(())
    }
}

enum Screen {
    Login(LoginForm),
    Lobby,
    Rankings(Vec<RankingEntry>),
}

pub struct App {
    runtime: Handle,
    config: AppConfig,
    endpoint: Url,
    connector: Arc<dyn Connector>,
    auth: AuthClient,
    rankings: RankingClient,
    debug_log: DebugLog,
    screen: Screen,
    client: Option<GameClient>,
    selected_column: usize,
    should_quit: bool,
    message: Option<String>,
}

impl App {
    /// Build the app. With `username` set the login screen is skipped.
    pub fn new(
        config: AppConfig,
        runtime: Handle,
        debug_log: DebugLog,
        username: Option<String>,
    ) -> Result<Self, StartupError> {
        let endpoint = config.websocket_url()?;
        let auth = AuthClient::new(&config.server.api_base_url)?;
        let rankings = RankingClient::new(&config.server.api_base_url)?;

        let mut app = App {
            runtime,
            config,
            endpoint,
            connector: Arc::new(WebSocketConnector),
            auth,
            rankings,
            debug_log,
            screen: Screen::Login(LoginForm::new()),
            client: None,
            selected_column: 3,
            should_quit: false,
            message: None,
        };
        if let Some(name) = username.filter(|n| !n.trim().is_empty()) {
            app.enter_lobby(name.trim().to_string());
        }
        Ok(app)
    }

    /// Main application loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()>
    where
        B::Error: Into<io::Error>,
    {
        loop {
            self.pump_session();

            terminal
                .draw(|f| self.render(f))
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

            if self.should_quit {
                break;
            }

            self.handle_events()?;
        }
        Ok(())
    }

    /// Apply whatever the connection has delivered since the last frame.
    fn pump_session(&mut self) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        for transition in client.poll() {
            if transition.to == SessionState::InProgress && transition.from != SessionState::InProgress {
                self.selected_column = client.machine().board().cols() / 2;
            }
        }
        client.tick(Instant::now());
    }

    /// Handle keyboard events
    fn handle_events(&mut self) -> io::Result<()> {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    fn in_game(&self) -> bool {
        self.client
            .as_ref()
            .is_some_and(|c| c.machine().state() != SessionState::Idle)
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if let Screen::Login(_) = self.screen {
            self.handle_login_key(key);
            return;
        }

        // Clear message on any key press
        self.message = None;

        if self.in_game() {
            self.handle_game_key(key);
            return;
        }

        let on_rankings = matches!(self.screen, Screen::Rankings(_));
        match (on_rankings, key.code) {
            (_, KeyCode::Char('q')) => self.should_quit = true,
            (false, KeyCode::Esc) => self.should_quit = true,
            (false, KeyCode::Char('p')) => {
                if let Some(client) = self.client.as_mut() {
                    client.play();
                }
            }
            (false, KeyCode::Char('k')) | (true, KeyCode::Char('r')) => self.show_rankings(),
            (false, KeyCode::Char('l')) => self.export_logs(),
            (true, KeyCode::Esc | KeyCode::Char('b')) => self.screen = Screen::Lobby,
            _ => {}
        }
    }

    fn handle_game_key(&mut self, key: KeyEvent) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        let state = client.machine().state();
        let cols = client.machine().board().cols();

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Left if state == SessionState::InProgress => {
                self.selected_column = self.selected_column.saturating_sub(1);
            }
            KeyCode::Right if state == SessionState::InProgress => {
                if self.selected_column + 1 < cols {
                    self.selected_column += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') if state == SessionState::InProgress => {
                let outcome = client.submit_move(self.selected_column);
                self.message = match outcome {
                    MoveOutcome::Sent => None,
                    MoveOutcome::NotYourTurn => Some("Wait for your turn.".to_string()),
                    MoveOutcome::ColumnFull => Some("Column is full!".to_string()),
                    MoveOutcome::Inactive | MoveOutcome::InvalidColumn => None,
                    MoveOutcome::SendFailed(e) => Some(format!("Move not sent: {e}")),
                };
            }
            KeyCode::Enter | KeyCode::Char('b') if state.is_ended() => {
                client.return_to_lobby();
                self.screen = Screen::Lobby;
            }
            KeyCode::Esc if state.is_matchmaking() => {
                client.return_to_lobby();
                self.screen = Screen::Lobby;
            }
            _ => {}
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        let Screen::Login(form) = &mut self.screen else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down => form.cycle_focus(true),
            KeyCode::BackTab | KeyCode::Up => form.cycle_focus(false),
            KeyCode::F(2) => form.toggle_mode(),
            KeyCode::Backspace => {
                form.value_mut().pop();
            }
            KeyCode::Char(c) => form.value_mut().push(c),
            KeyCode::Enter => self.submit_login(),
            _ => {}
        }
    }

    fn submit_login(&mut self) {
        let Screen::Login(form) = &mut self.screen else {
            return;
        };
        if let Err(reason) = form.check() {
            form.error = Some(reason);
            return;
        }

        let username = form.username.trim().to_string();
        let result = match form.mode {
            AuthMode::Login => self.runtime.block_on(self.auth.login(&LoginRequest {
                username,
                password: form.password.clone(),
            })),
            AuthMode::Signup => self.runtime.block_on(self.auth.signup(&SignupRequest {
                username,
                email: form.email.trim().to_string(),
                password: form.password.clone(),
            })),
        };

        match result {
            Ok(identity) => self.enter_lobby(identity.username),
            Err(e) => {
                error!(error = %e, "authentication failed");
                form.error = Some(match e {
                    ServiceError::Rejected { message, .. } if !message.is_empty() => message,
                    other => other.to_string(),
                });
                form.password.clear();
            }
        }
    }

    fn enter_lobby(&mut self, username: String) {
        info!(username = %username, "entering lobby");
        let manager = ConnectionManager::new(
            Arc::clone(&self.connector),
            self.runtime.clone(),
            self.config.session.connect_timeout(),
        );
        self.client = Some(GameClient::new(
            manager,
            self.endpoint.clone(),
            username,
            self.config.session.matchmaking_timeout(),
        ));
        self.screen = Screen::Lobby;
    }

    fn show_rankings(&mut self) {
        match self.runtime.block_on(self.rankings.fetch()) {
            Ok(entries) => self.screen = Screen::Rankings(entries),
            Err(e) => {
                error!(error = %e, "could not load rankings");
                self.message = Some(format!("Could not load rankings: {e}"));
            }
        }
    }

    fn export_logs(&mut self) {
        let path = &self.config.logging.capture_path;
        self.message = Some(match self.debug_log.export(path) {
            Ok(count) => format!("Exported {count} log entries to {}", path.display()),
            Err(e) => {
                error!(error = %e, "log export failed");
                format!("Log export failed: {e}")
            }
        });
    }

    /// Render the UI
    fn render(&self, frame: &mut ratatui::Frame) {
        if let Screen::Login(form) = &self.screen {
            super::lobby_view::render_login(frame, form);
            return;
        }
        let Some(client) = self.client.as_ref() else {
            return;
        };

        if self.in_game() {
            super::game_view::render(frame, client.machine(), self.selected_column, &self.message);
            return;
        }
        match &self.screen {
            Screen::Rankings(entries) => super::lobby_view::render_rankings(
                frame,
                entries,
                client.username(),
                self.message.as_deref(),
            ),
            _ => super::lobby_view::render_lobby(
                frame,
                client.username(),
                client.machine().status(),
                self.message.as_deref(),
            ),
        }
    }
}
