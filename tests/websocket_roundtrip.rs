//! A full session over a real WebSocket against an in-process server.

use std::sync::Arc;
use std::time::Duration;

use connect_four_client::client::GameClient;
use connect_four_client::game::{Cell, Player};
use connect_four_client::net::{ConnectionManager, WebSocketConnector};
use connect_four_client::session::{SessionState, Transition, LOBBY_RETURN_REASON};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;

const STEP: Duration = Duration::from_secs(5);

async fn step(client: &mut GameClient) -> Transition {
    timeout(STEP, client.next_event())
        .await
        .expect("timed out waiting for a connection notice")
        .expect("notice channel closed")
}

struct ServerLog {
    query: Option<String>,
    received: Value,
    close: Option<(u16, String)>,
}

/// Serve one match: start it, wait for a move, confirm it, end the game,
/// then wait for the client to hang up.
async fn serve_one(listener: TcpListener) -> ServerLog {
    let (stream, _) = listener.accept().await.unwrap();
    let mut query = None;
    let mut ws = accept_hdr_async(stream, |req: &Request, resp: Response| {
        query = req.uri().query().map(str::to_string);
        Ok(resp)
    })
    .await
    .unwrap();

    let start = json!({
        "type": "GAME_START",
        "game_id": "ws-1",
        "board": vec![vec![0; 7]; 6],
        "player_number": 1,
        "starting_player": 1,
        "player1_name": "alice",
        "player2_name": "bot",
    });
    ws.send(Message::text(start.to_string())).await.unwrap();

    let received = loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => break serde_json::from_str::<Value>(&text).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("client went away before moving: {other:?}"),
        }
    };

    let confirm = json!({"type": "MOVE", "player": 1, "col": received["col"], "row": 5, "next_turn": 2});
    ws.send(Message::text(confirm.to_string())).await.unwrap();
    let over = json!({"type": "GAME_OVER", "message": "alice wins!"});
    ws.send(Message::text(over.to_string())).await.unwrap();

    let close = loop {
        match ws.next().await {
            Some(Ok(Message::Close(frame))) => {
                break frame.map(|f| (u16::from(f.code), f.reason.to_string()))
            }
            Some(Ok(_)) => continue,
            _ => break None,
        }
    };

    ServerLog {
        query,
        received,
        close,
    }
}

#[tokio::test]
async fn test_full_session_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_one(listener));

    let manager = ConnectionManager::new(
        Arc::new(WebSocketConnector),
        Handle::current(),
        Duration::from_secs(5),
    );
    let endpoint = Url::parse(&format!("ws://{addr}/ws/game")).unwrap();
    let mut client = GameClient::new(manager, endpoint, "alice", Duration::from_secs(60));

    client.play();
    assert_eq!(step(&mut client).await.to, SessionState::WaitingForOpponent);
    assert_eq!(step(&mut client).await.to, SessionState::InProgress);
    assert_eq!(client.machine().session().unwrap().opponent_name(), "bot");

    assert!(client.submit_move(2).is_sent());
    step(&mut client).await;
    assert_eq!(client.machine().board().get(5, 2), Some(Cell::PlayerOne));
    assert_eq!(client.machine().turn(), Some(Player::Two));

    assert_eq!(step(&mut client).await.to, SessionState::EndedNormally);
    assert_eq!(client.machine().result().unwrap().message, "alice wins!");

    assert_eq!(client.return_to_lobby().to, SessionState::Idle);
    let t = step(&mut client).await;
    assert!(!t.changed());

    let log = timeout(STEP, server).await.unwrap().unwrap();
    assert_eq!(log.query.as_deref(), Some("username=alice"));
    assert_eq!(log.received, json!({"type": "MOVE", "col": 2, "player": 1}));
    assert_eq!(log.close, Some((1000, LOBBY_RETURN_REASON.to_string())));
}

#[tokio::test]
async fn test_unreachable_server_fails_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let manager = ConnectionManager::new(
        Arc::new(WebSocketConnector),
        Handle::current(),
        Duration::from_secs(5),
    );
    let endpoint = Url::parse(&format!("ws://{addr}/ws/game")).unwrap();
    let mut client = GameClient::new(manager, endpoint, "alice", Duration::ZERO);

    client.play();
    let t = step(&mut client).await;
    assert_eq!(t.to, SessionState::Idle);
    assert!(client
        .machine()
        .status()
        .unwrap()
        .starts_with("Could not reach the game server"));
}
