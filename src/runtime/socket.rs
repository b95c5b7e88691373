//! Websocket transport for the live booking channel.
//!
//! Authentication happens before the upgrade. After that, each text frame is
//! handled to completion before the next is read, so one session's calls are
//! applied in arrival order.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::NaiveDate;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::identity::SessionIdentity;
use crate::core::protocol::Ack;
use crate::core::BookingService;
use crate::runtime::api::{ApiError, AppState};
use crate::runtime::auth::bearer_token;
use crate::util::serde::SessionId;

/// Client-to-server frames.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Subscribe to updates for an active date.
    #[serde(rename_all = "camelCase")]
    Join {
        /// `YYYY-MM-DD`.
        active_date: String,
    },
    /// Take a seat in a slot of the active day.
    #[serde(rename_all = "camelCase")]
    Reserve {
        /// Echoed back in the ack.
        #[serde(default)]
        request_id: Value,
        /// Target slot.
        #[serde(default)]
        slot_id: Option<String>,
    },
    /// Release a seat.
    #[serde(rename_all = "camelCase")]
    Cancel {
        /// Echoed back in the ack.
        #[serde(default)]
        request_id: Value,
        /// Target slot.
        #[serde(default)]
        slot_id: Option<String>,
    },
}

/// Direct replies to a client frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Outcome of a reserve or cancel.
    #[serde(rename_all = "camelCase")]
    Ack {
        /// The request id the client sent.
        request_id: Value,
        /// Whether the transition happened.
        ok: bool,
        /// Human-readable outcome.
        message: String,
    },
    /// The frame could not be understood.
    Error {
        /// Parse failure description.
        message: String,
    },
}

impl ServerMessage {
    fn ack(request_id: Value, ack: Ack) -> Self {
        Self::Ack {
            request_id,
            ok: ack.ok,
            message: ack.message,
        }
    }
}

/// One authenticated connection's view of the booking core.
pub struct SessionHandler {
    session: SessionId,
    identity: SessionIdentity,
    service: BookingService,
}

impl SessionHandler {
    /// Handler for an already registered session.
    pub const fn new(session: SessionId, identity: SessionIdentity, service: BookingService) -> Self {
        Self {
            session,
            identity,
            service,
        }
    }

    /// Session identifier.
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Apply one message. Reserve and cancel always produce exactly one reply; join none.
    pub async fn handle(&self, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Join { active_date } => {
                if NaiveDate::parse_from_str(&active_date, "%Y-%m-%d").is_ok() {
                    self.service.hub().join(self.session, &active_date);
                } else {
                    tracing::debug!(session = %self.session, active_date, "ignoring join with malformed date");
                }
                None
            }
            ClientMessage::Reserve {
                request_id,
                slot_id,
            } => {
                let ack = self
                    .service
                    .protocol()
                    .reserve(&self.identity, slot_id.as_deref())
                    .await;
                Some(ServerMessage::ack(request_id, ack))
            }
            ClientMessage::Cancel {
                request_id,
                slot_id,
            } => {
                let ack = self
                    .service
                    .protocol()
                    .cancel(&self.identity, slot_id.as_deref())
                    .await;
                Some(ServerMessage::ack(request_id, ack))
            }
        }
    }

    /// Parse and apply a raw text frame.
    pub async fn handle_text(&self, text: &str) -> Option<ServerMessage> {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.handle(msg).await,
            Err(e) => Some(ServerMessage::Error {
                message: format!("unrecognised message: {e}"),
            }),
        }
    }
}

/// Query parameters accepted on upgrade, for clients that cannot set headers.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Bearer token.
    pub token: Option<String>,
}

/// Upgrade handler. Rejects with 401 before upgrading when the caller has no identity.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers).or(params.token.as_deref());
    let identity = state.authenticate(token)?;
    let ws = ws.ok_or_else(|| ApiError::bad_request("expected a websocket upgrade"))?;
    let service = state.service.clone();
    Ok(ws.on_upgrade(move |socket| run_session(socket, service, identity)))
}

async fn send_json<T: Serialize>(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    value: &T,
) -> bool {
    match serde_json::to_string(value) {
        Ok(text) => sink.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode outgoing frame");
            true
        }
    }
}

async fn run_session(socket: WebSocket, service: BookingService, identity: SessionIdentity) {
    let session = SessionId::new();
    let mut events = service.hub().connect(session);
    let user = identity.user_id;
    let handler = SessionHandler::new(session, identity, service.clone());
    let (mut sink, mut stream) = socket.split();
    tracing::info!(%session, %user, "session connected");

    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handler.handle_text(&text).await {
                            if !send_json(&mut sink, &reply).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(%session, error = %e, "websocket read failed");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Some(event) => {
                        if !send_json(&mut sink, &event).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    service.hub().disconnect(session);
    tracing::info!(%session, %user, "session closed");
}
