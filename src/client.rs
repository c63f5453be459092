//! The session client: a [`SessionMachine`] wired to a [`ConnectionManager`].
//!
//! The machine decides, the client carries out its effects. Front-ends call
//! [`GameClient::poll`] once per frame (or await [`GameClient::next_event`])
//! and read everything they draw from [`GameClient::machine`].

use std::time::{Duration, Instant};

use reqwest::Url;
use tracing::{info, warn};

use crate::net::ConnectionManager;
use crate::session::{self, Effect, MoveOutcome, SessionEvent, SessionMachine, Transition};

pub struct GameClient {
    machine: SessionMachine,
    connection: ConnectionManager,
    endpoint: Url,
    username: String,
    matchmaking_timeout: Option<Duration>,
    waiting_since: Option<Instant>,
}

impl GameClient {
    /// A zero `matchmaking_timeout` waits for an opponent indefinitely.
    pub fn new(
        connection: ConnectionManager,
        endpoint: Url,
        username: impl Into<String>,
        matchmaking_timeout: Duration,
    ) -> Self {
        GameClient {
            machine: SessionMachine::new(),
            connection,
            endpoint,
            username: username.into(),
            matchmaking_timeout: (!matchmaking_timeout.is_zero()).then_some(matchmaking_timeout),
            waiting_since: None,
        }
    }

    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// When the current matchmaking wait began.
    pub fn waiting_since(&self) -> Option<Instant> {
        self.waiting_since
    }

    /// Start a new session from the lobby.
    pub fn play(&mut self) -> Transition {
        self.apply(SessionEvent::PlayRequested)
    }

    /// Leave an ended session, or abandon matchmaking.
    pub fn return_to_lobby(&mut self) -> Transition {
        self.apply(SessionEvent::ReturnToLobby)
    }

    /// Ask the server to drop a disc in `col`.
    pub fn submit_move(&mut self, col: usize) -> MoveOutcome {
        session::submit_move(&self.machine, &mut self.connection, col)
    }

    /// Apply every connection notice that has arrived so far.
    pub fn poll(&mut self) -> Vec<Transition> {
        let mut transitions = Vec::new();
        while let Some(notice) = self.connection.try_next() {
            transitions.push(self.apply(notice.into()));
        }
        transitions
    }

    /// Wait for the next connection notice and apply it.
    pub async fn next_event(&mut self) -> Option<Transition> {
        let notice = self.connection.next().await?;
        Some(self.apply(notice.into()))
    }

    /// Give up on matchmaking once the wait exceeds the configured timeout.
    pub fn tick(&mut self, now: Instant) -> Option<Transition> {
        let timeout = self.matchmaking_timeout?;
        let since = self.waiting_since?;
        if now.saturating_duration_since(since) < timeout {
            return None;
        }
        info!(waited_secs = timeout.as_secs(), "no opponent found in time");
        Some(self.apply(SessionEvent::WaitTimedOut))
    }

    fn apply(&mut self, event: SessionEvent) -> Transition {
        let mut transition = self.machine.handle(event);

        match transition.effect.clone() {
            Some(Effect::OpenConnection) => {
                if let Err(e) = self.connection.open(&self.endpoint, &self.username) {
                    warn!(error = %e, "could not open session channel");
                    let failed = self.machine.handle(SessionEvent::TransportFailed {
                        reason: e.to_string(),
                    });
                    transition = Transition {
                        from: transition.from,
                        ..failed
                    };
                }
            }
            Some(Effect::CloseConnection { code, reason }) => {
                self.connection.close(code, &reason, true);
            }
            None => {}
        }

        if !transition.to.is_matchmaking() {
            self.waiting_since = None;
        } else if !transition.from.is_matchmaking() {
            self.waiting_since = Some(Instant::now());
        }
        transition
    }
}
