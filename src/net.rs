use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::drift_core::{GroundProbe, InputFrame};
use crate::error::ServerError;
use crate::state::SharedSimState;

/// Messages a driver can send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Input {
        #[serde(default)]
        steer: f32,
        #[serde(default)]
        throttle: f32,
        #[serde(default)]
        brake: f32,
        #[serde(default)]
        reset: bool,
    },
    Reset,
    Ping,
}

/// Direct replies; telemetry frames are sent by the tick loop.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage<'a> {
    Welcome { vehicle_id: &'a str },
    Pong,
}

impl ClientMessage {
    pub fn from_json(txt: &str) -> Option<Self> {
        serde_json::from_str(txt).ok()
    }
}

fn encode(msg: &ServerMessage<'_>) -> Option<String> {
    serde_json::to_string(msg).ok()
}

pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })
}

pub async fn start_websocket_server<P>(listener: TcpListener, state: Arc<Mutex<SharedSimState<P>>>)
where
    P: GroundProbe + Send + Sync + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "websocket listening");
    }

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        debug!(%peer, "tcp connection");
        tokio::spawn(handle_connection(raw, Arc::clone(&state)));
    }
}

async fn handle_connection<P>(raw: TcpStream, state: Arc<Mutex<SharedSimState<P>>>)
where
    P: GroundProbe + Send + Sync + 'static,
{
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(error = %e, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing message channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Spawn the vehicle
    // -------------------------------
    let vehicle_id = {
        let mut sim = state.lock().await;
        match sim.add_session() {
            Ok(id) => {
                sim.register_client(tx.clone());
                id
            }
            Err(e) => {
                warn!(error = %e, "could not spawn vehicle");
                return;
            }
        }
    };

    info!(vehicle = %vehicle_id, "driver connected");
    if let Some(welcome) = encode(&ServerMessage::Welcome { vehicle_id: &vehicle_id }) {
        let _ = tx.send(welcome);
    }

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else { continue };

        match ClientMessage::from_json(text) {
            Some(ClientMessage::Ping) => {
                if let Some(pong) = encode(&ServerMessage::Pong) {
                    let _ = tx.send(pong);
                }
            }
            Some(ClientMessage::Input { steer, throttle, brake, reset }) => {
                let input = InputFrame::new(steer, throttle, brake);
                state.lock().await.update_input(&vehicle_id, input, reset);
            }
            Some(ClientMessage::Reset) => {
                state.lock().await.request_reset(&vehicle_id);
            }
            None => debug!(vehicle = %vehicle_id, "ignoring malformed message"),
        }
    }

    info!(vehicle = %vehicle_id, "driver disconnected");
    state.lock().await.remove_session(&vehicle_id);
}
