use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::config::RealtimeSettings;
use crate::models::{ClientEvent, ServerEvent};
use crate::realtime::handlers::{self, RealtimeContext};
use crate::realtime::registry::ConnectionRegistry;
use crate::services::TokenVerifier;

/// Accept loop for the real-time WebSocket listener.
///
/// Each accepted socket gets its own task; a connection failing never
/// affects the loop or other connections.
pub async fn run(
    bind_addr: String,
    ctx: Arc<RealtimeContext>,
    verifier: Arc<TokenVerifier>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("real-time gateway listening on {}", bind_addr);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let ctx = ctx.clone();
        let verifier = verifier.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, ctx, verifier).await {
                tracing::warn!("connection from {} ended with error: {}", peer_addr, e);
            }
        });
    }
}

/// Drive one client connection: handshake, credential check, writer task,
/// then the read/dispatch loop until close.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    ctx: Arc<RealtimeContext>,
    verifier: Arc<TokenVerifier>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    // The access token travels as a query parameter on the handshake URL.
    let mut token: Option<String> = None;
    let ws_stream = accept_hdr_async(stream, |req: &Request, resp: Response| {
        token = req.uri().query().and_then(extract_token);
        Ok(resp)
    })
    .await?;

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Credential failures close the transport with the policy-violation
    // code; no registration happens.
    let user_id = match token.as_deref().map(|t| verifier.verify(t)) {
        Some(Ok(user_id)) => user_id,
        failure => {
            let reason = match failure {
                None => "missing token",
                Some(Err(e)) => {
                    tracing::warn!("handshake from {} rejected: {}", peer_addr, e);
                    "authentication failed"
                }
                Some(Ok(_)) => unreachable!(),
            };
            let _ = ws_sender
                .send(Message::Close(Some(CloseFrame {
                    code: CloseCode::Policy,
                    reason: reason.into(),
                })))
                .await;
            return Ok(());
        }
    };

    // Writer task: drains the registry channel into the socket. When the
    // channel closes (unregister, replacement, sweep) it closes the
    // transport, ignoring close errors.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("failed to serialize server event: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let tx_handle = tx.clone();
    ctx.registry.register(user_id, tx);
    ctx.registry.send(
        user_id,
        ServerEvent::Connection {
            status: "connected".to_string(),
            user_id,
        },
    );
    tracing::info!("user {} connected from {}", user_id, peer_addr);

    while let Some(incoming) = ws_receiver.next().await {
        match incoming {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => handlers::dispatch(&ctx, user_id, event).await,
                Err(e) => {
                    tracing::debug!("malformed event from {}: {}", user_id, e);
                    ctx.registry
                        .send(user_id, ServerEvent::error("unrecognized or malformed event"));
                }
            },
            // Protocol-level frames count as liveness signals too.
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => ctx.registry.touch(user_id),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("read error for user {}: {}", user_id, e);
                break;
            }
        }
    }

    // Leaving the loop for any reason vacates the registry and every room
    // before the task returns. The teardown is channel-guarded so a quick
    // reconnect is not torn down by this task's cleanup.
    ctx.registry.unregister_stale(user_id, &tx_handle);
    drop(tx_handle);
    let _ = writer.await;

    Ok(())
}

fn extract_token(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "token" {
            urlencoding::decode(value).ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

/// Spawn the periodic heartbeat ping and the stale-connection sweep.
pub fn spawn_heartbeat_tasks(registry: Arc<ConnectionRegistry>, settings: RealtimeSettings) {
    let ping_registry = registry.clone();
    let ping_interval = Duration::from_secs(settings.heartbeat_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            let online = ping_registry.online_users();
            if online.is_empty() {
                continue;
            }
            let timestamp = chrono::Utc::now();
            for user_id in online {
                ping_registry.send(user_id, ServerEvent::Ping { timestamp });
            }
        }
    });

    let sweep_interval = Duration::from_secs(settings.sweep_interval_secs);
    let timeout = Duration::from_secs(settings.heartbeat_timeout_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = registry.sweep_stale(timeout);
            if evicted > 0 {
                tracing::info!("heartbeat sweep evicted {} connections", evicted);
            }
        }
    });
}
