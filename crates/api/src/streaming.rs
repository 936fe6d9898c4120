//! WebSocket streaming API.
//!
//! Fans recomputed tallies out to subscribers of `election:{id}` and
//! `results:{id}`. Delivery is best-effort: a subscriber that is not connected
//! when an update is published never sees it, and one that falls behind the
//! channel capacity skips ahead.
//!
//! Both channels carry the full tally, so a subscription is accepted only for
//! callers allowed to read the election's results.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use ballotbox_common::{AppError, AppResult};
use ballotbox_core::{
    AuthService, ElectionResults, Principal, ResultsChannel, ResultsPublisher, TallyService,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{extractors::AuthPrincipal, middleware::AppState};

/// Streaming query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Access token for clients that cannot set headers.
    #[serde(rename = "i")]
    pub token: Option<String>,
}

/// Caller of a streaming connection.
///
/// The `Authorization` header wins; otherwise the `i` query token is tried.
pub async fn stream_principal(
    auth: &AuthService,
    header: Option<AuthPrincipal>,
    query: &StreamQuery,
) -> Option<Principal> {
    if let Some(AuthPrincipal(principal)) = header {
        return Some(principal);
    }
    let token = query.token.as_deref()?;
    match auth.authenticate(token.trim()).await {
        Ok(principal) => Some(principal),
        Err(e) => {
            warn!("Streaming auth failed: {}", e);
            None
        }
    }
}

/// A published tally update.
#[derive(Debug, Clone)]
pub struct ResultsEvent {
    pub channel: ResultsChannel,
    pub election_id: i32,
    /// Serialised once at publish time and shared between subscribers.
    pub payload: Arc<serde_json::Value>,
}

impl ResultsEvent {
    /// Whether this event belongs to `channel` of `election_id`.
    #[must_use]
    pub fn is_for(&self, channel: ResultsChannel, election_id: i32) -> bool {
        self.channel == channel && self.election_id == election_id
    }
}

/// Client-to-server message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Subscribe to a channel under a client-chosen id.
    Connect {
        channel: String,
        id: String,
        #[serde(default)]
        params: serde_json::Value,
    },
    /// Drop the subscription with this id.
    Disconnect { id: String },
}

/// Server-to-client message.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Subscription accepted.
    Connected { id: String },
    /// Channel event.
    Channel {
        id: String,
        #[serde(rename = "type")]
        event_type: String,
        body: serde_json::Value,
    },
    /// Subscription refused.
    Error { id: String, message: String },
}

/// One subscription held by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub channel: ResultsChannel,
    pub election_id: i32,
}

/// Shared state for streaming.
#[derive(Clone)]
pub struct StreamingState {
    tx: Arc<broadcast::Sender<ResultsEvent>>,
}

impl StreamingState {
    /// Create a new streaming state.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to every published update.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ResultsEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, channel: ResultsChannel, results: &ElectionResults) -> AppResult<()> {
        let payload = serde_json::to_value(results)
            .map_err(|e| AppError::Internal(format!("Failed to serialise results: {e}")))?;

        let event = ResultsEvent {
            channel,
            election_id: results.election_id,
            payload: Arc::new(payload),
        };

        // No subscribers is not an error.
        match self.tx.send(event) {
            Ok(receivers) => debug!(
                topic = %channel.topic(results.election_id),
                receivers,
                "Results published"
            ),
            Err(_) => debug!(
                topic = %channel.topic(results.election_id),
                "Results published with no subscribers"
            ),
        }
        Ok(())
    }
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl ResultsPublisher for StreamingState {
    async fn publish_vote_update(&self, results: &ElectionResults) -> AppResult<()> {
        self.publish(ResultsChannel::Election, results)
    }

    async fn publish_results_update(&self, results: &ElectionResults) -> AppResult<()> {
        self.publish(ResultsChannel::Results, results)
    }
}

/// WebSocket handler for streaming.
pub async fn streaming_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    header: Option<AuthPrincipal>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("New streaming connection");

    ws.on_upgrade(move |socket| handle_socket(socket, query, header, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(
    socket: WebSocket,
    query: StreamQuery,
    header: Option<AuthPrincipal>,
    state: AppState,
) {
    let (mut sender, mut receiver) = socket.split();
    let principal = stream_principal(&state.auth_service, header, &query).await;
    info!(
        authenticated = principal.is_some(),
        admin = principal.as_ref().is_some_and(Principal::is_admin),
        "Streaming connection established"
    );

    let mut rx = state.streaming.subscribe();
    let mut subscriptions: HashMap<String, Subscription> = HashMap::new();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let Some(msg) = msg else { break };
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                let response = handle_client_message(
                                    client_msg,
                                    &mut subscriptions,
                                    principal.as_ref(),
                                    &state.tally_service,
                                )
                                .await;
                                if let Some(response) = response {
                                    let json = serde_json::to_string(&response).unwrap_or_default();
                                    if sender.send(Message::Text(json.into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                warn!("Failed to parse client message: {}", e);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Client closed connection");
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }

            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let mut closed = false;
                        for msg in route_event(&subscriptions, &event) {
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                closed = true;
                                break;
                            }
                        }
                        if closed {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Streaming subscriber lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    info!(subscriptions = subscriptions.len(), "Streaming connection closed");
}

/// Apply a client message to the connection's subscriptions.
pub async fn handle_client_message(
    msg: ClientMessage,
    subscriptions: &mut HashMap<String, Subscription>,
    principal: Option<&Principal>,
    tally: &TallyService,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Connect {
            channel,
            id,
            params,
        } => {
            let channel = match channel.as_str() {
                "election" => ResultsChannel::Election,
                "results" => ResultsChannel::Results,
                _ => {
                    warn!("Unknown channel: {}", channel);
                    return None;
                }
            };

            let Some(election_id) = election_id_param(&params) else {
                warn!("Channel connection without electionId param");
                return None;
            };

            if let Err(e) = tally.authorize_read(principal, election_id).await {
                warn!(topic = %channel.topic(election_id), error = %e, "Channel connection refused");
                return Some(ServerMessage::Error {
                    id,
                    message: e.public_message(),
                });
            }

            subscriptions.insert(
                id.clone(),
                Subscription {
                    channel,
                    election_id,
                },
            );
            info!(topic = %channel.topic(election_id), id = %id, "Channel connected");

            Some(ServerMessage::Connected { id })
        }
        ClientMessage::Disconnect { id } => {
            subscriptions.remove(&id);
            info!(id = %id, "Channel disconnected");
            None
        }
    }
}

/// Messages an event produces for the connection's subscriptions.
#[must_use]
pub fn route_event(
    subscriptions: &HashMap<String, Subscription>,
    event: &ResultsEvent,
) -> Vec<ServerMessage> {
    subscriptions
        .iter()
        .filter(|(_, sub)| event.is_for(sub.channel, sub.election_id))
        .map(|(id, _)| ServerMessage::Channel {
            id: id.clone(),
            event_type: event.channel.event_name().to_string(),
            body: event.payload.as_ref().clone(),
        })
        .collect()
}

/// `electionId` as a number or a numeric string.
fn election_id_param(params: &serde_json::Value) -> Option<i32> {
    let value = params.get("electionId")?;
    value
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
