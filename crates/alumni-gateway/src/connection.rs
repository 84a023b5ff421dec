use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use alumni_types::events::{RelayCommand, RelayEvent};

use crate::relay::{Relay, RelayError};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a WebSocket connection whose user was authenticated at the HTTP
/// upgrade. Runs until the client goes away, then drops its room memberships.
pub async fn handle_connection(socket: WebSocket, relay: Relay, username: String) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut relay_rx) = relay.connect().await;
    info!("{} ({}) connected to gateway", username, conn_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received;

    // Forward relay events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = relay_rx.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode relay event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client, one at a time in arrival order
    let relay_recv = relay.clone();
    let username_recv = username.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<RelayCommand>(&text) {
                    Ok(cmd) => handle_command(&relay_recv, conn_id, &username_recv, cmd).await,
                    Err(e) => {
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            username_recv,
                            conn_id,
                            e,
                            truncate(&text, 200)
                        );
                        relay_recv.notify_error(conn_id, "malformed command").await;
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    relay.disconnect(conn_id).await;
    info!("{} ({}) disconnected from gateway", username, conn_id);
}

async fn handle_command(relay: &Relay, conn_id: Uuid, username: &str, cmd: RelayCommand) {
    match cmd {
        RelayCommand::Join { username: claimed, room } => {
            if claimed != username {
                warn!("{} ({}) tried to join {} as {}", username, conn_id, room, claimed);
                relay.notify_error(conn_id, "username does not match session").await;
                return;
            }
            relay.join(conn_id, username, &room).await;
        }

        RelayCommand::Message(payload) => {
            if payload.sender != username {
                warn!("{} ({}) tried to send as {}", username, conn_id, payload.sender);
                relay.notify_error(conn_id, "sender does not match session").await;
                return;
            }
            if let Err(e) = relay.send(payload).await {
                let reason = match &e {
                    RelayError::Rejected(inner) => inner.to_string(),
                    RelayError::Store(_) | RelayError::Task(_) => "message could not be saved".to_string(),
                };
                relay.notify_error(conn_id, reason).await;
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
