use super::*;

use std::net::SocketAddr;

use axum::routing::get;
use chrono::TimeDelta;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tokio_util::sync::CancellationToken;

use tidewatch_domain::{Role, UserId};

use crate::config::EngineConfig;
use crate::infrastructure::clock::{SystemClock, SystemRandom};
use crate::infrastructure::identity::JwtIdentityVerifier;
use crate::infrastructure::sqlite::{memory_pool, SqliteRepositories};
use crate::use_cases::ChallengeSettings;

pub(crate) type TestWs =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const TEST_SECRET: &str = "tidewatch-test-secret";
const TEST_AUDIENCE: &str = "tidewatch-test";

/// Configuration for in-process servers: no random challenges, no spawn
/// window, no cooldown between raid attacks.
pub(crate) fn test_config() -> EngineConfig {
    let mut config = EngineConfig {
        token_secret: Some(TEST_SECRET.to_string()),
        token_audience: TEST_AUDIENCE.to_string(),
        challenge: ChallengeSettings {
            timeout: Duration::from_secs(60),
            probability_percent: 0,
        },
        spawn_window: Duration::ZERO,
        ..EngineConfig::default()
    };
    config.cooldowns.raid = Duration::ZERO;
    config
}

/// Build an app over an in-memory store with real clock and randomness.
pub(crate) async fn build_test_app(
    config: &EngineConfig,
    connections: Arc<ConnectionManager>,
) -> (Arc<App>, Arc<JwtIdentityVerifier>) {
    let verifier = Arc::new(JwtIdentityVerifier::new(TEST_SECRET, TEST_AUDIENCE));
    let repos = SqliteRepositories::new(memory_pool().await);
    let app = Arc::new(App::with_ports(
        repos,
        verifier.clone(),
        connections,
        Arc::new(SystemClock::new()),
        Arc::new(SystemRandom::new()),
        config,
    ));
    (app, verifier)
}

/// A running engine on an ephemeral port. Background work stops on drop.
pub(crate) struct TestServer {
    pub(crate) addr: SocketAddr,
    pub(crate) state: Arc<WsState>,
    verifier: Arc<JwtIdentityVerifier>,
    cancel: CancellationToken,
}

impl TestServer {
    pub(crate) fn token(&self, user_id: UserId, name: &str, role: Role) -> String {
        self.verifier
            .issue(user_id, name, role, TimeDelta::hours(1))
    }

    pub(crate) fn app(&self) -> &App {
        &self.state.app
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub(crate) async fn start_test_server(config: EngineConfig) -> TestServer {
    let connections = Arc::new(ConnectionManager::new());
    let (app, verifier) = build_test_app(&config, connections.clone()).await;

    let cancel = CancellationToken::new();
    tokio::spawn(
        app.scheduler
            .clone()
            .run(app.deadline_router(), cancel.clone()),
    );

    let state = Arc::new(WsState {
        app,
        connections,
        allowed_origins: config.allowed_origins.clone(),
    });
    let (addr, _handle) = spawn_ws_server(state.clone()).await;

    TestServer {
        addr,
        state,
        verifier,
        cancel,
    }
}

pub(crate) async fn spawn_ws_server(
    state: Arc<WsState>,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let router = axum::Router::new().route("/ws", get(ws_handler).with_state(state));

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, handle)
}

pub(crate) async fn ws_connect(addr: SocketAddr) -> TestWs {
    let url = format!("ws://{}/ws", addr);
    let (ws, _resp) = connect_async(url).await.unwrap();
    ws
}

pub(crate) async fn ws_send_client(ws: &mut TestWs, msg: &ClientMessage) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(WsMessage::Text(json.into())).await.unwrap();
}

pub(crate) async fn ws_send_raw(ws: &mut TestWs, text: &str) {
    ws.send(WsMessage::Text(text.to_string().into())).await.unwrap();
}

pub(crate) async fn ws_recv_server(ws: &mut TestWs) -> ServerMessage {
    loop {
        let msg = ws.next().await.unwrap().unwrap();
        match msg {
            WsMessage::Text(text) => {
                return serde_json::from_str::<ServerMessage>(&text).unwrap();
            }
            WsMessage::Binary(bin) => {
                let text = String::from_utf8(bin.to_vec()).unwrap();
                return serde_json::from_str::<ServerMessage>(&text).unwrap();
            }
            _ => {}
        }
    }
}

/// Read until a message matches `predicate`, failing after `timeout`.
pub(crate) async fn ws_expect_message<F>(
    ws: &mut TestWs,
    timeout: Duration,
    mut predicate: F,
) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            let msg = ws_recv_server(ws).await;
            if predicate(&msg) {
                return msg;
            }
        }
    })
    .await
    .unwrap()
}

/// Read frames until the server closes; returns the close code.
pub(crate) async fn ws_expect_close(ws: &mut TestWs, timeout: Duration) -> Option<u16> {
    tokio::time::timeout(timeout, async {
        while let Some(frame) = ws.next().await {
            match frame {
                Ok(WsMessage::Close(frame)) => return frame.map(|f| u16::from(f.code)),
                Ok(_) => {}
                Err(_) => return None,
            }
        }
        None
    })
    .await
    .unwrap()
}

/// Connect and complete the join handshake.
pub(crate) async fn ws_join(server: &TestServer, user_id: UserId, name: &str) -> TestWs {
    let mut ws = ws_connect(server.addr).await;
    ws_send_client(
        &mut ws,
        &ClientMessage::Join {
            token: server.token(user_id, name, Role::Registered),
        },
    )
    .await;
    ws_expect_message(&mut ws, Duration::from_secs(2), |m| {
        matches!(m, ServerMessage::Joined { .. })
    })
    .await;
    ws
}
