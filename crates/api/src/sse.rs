//! Server-Sent Events (SSE) for realtime results.
//!
//! Mirrors the WebSocket channels for clients that cannot hold a socket.
//! The same read policy applies: the caller must be allowed to read the
//! election's results before the stream opens.

#![allow(missing_docs)]

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use ballotbox_common::AppResult;
use ballotbox_core::ResultsChannel;
use futures::stream::{self, Stream};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::{
    extractors::AuthPrincipal,
    middleware::AppState,
    streaming::{ResultsEvent, StreamQuery, stream_principal},
};

/// Events of one channel of one election.
///
/// Owns its receiver, so the stream outlives the request state.
fn channel_events(
    rx: broadcast::Receiver<ResultsEvent>,
    channel: ResultsChannel,
    election_id: i32,
) -> impl Stream<Item = ResultsEvent> + use<> {
    // Lagged receivers skip the missed updates.
    BroadcastStream::new(rx)
        .filter_map(move |result| result.ok().filter(|event| event.is_for(channel, election_id)))
}

/// SSE stream of one channel of one election.
fn channel_stream(
    rx: broadcast::Receiver<ResultsEvent>,
    channel: ResultsChannel,
    election_id: i32,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    debug!(topic = %channel.topic(election_id), "SSE subscriber connected");

    let updates = channel_events(rx, channel, election_id).map(move |event| {
        Ok(Event::default()
            .event(channel.event_name())
            .json_data(event.payload.as_ref())
            .unwrap_or_else(|_| Event::default().data("error")))
    });

    let initial = stream::once(async move {
        Ok(Event::default()
            .event("connected")
            .data(channel.topic(election_id)))
    });

    Sse::new(initial.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// Authorize the caller, then open the channel.
async fn open_channel(
    state: AppState,
    header: Option<AuthPrincipal>,
    query: StreamQuery,
    channel: ResultsChannel,
    election_id: i32,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let principal = stream_principal(&state.auth_service, header, &query).await;
    state
        .tally_service
        .authorize_read(principal.as_ref(), election_id)
        .await?;

    Ok(channel_stream(
        state.streaming.subscribe(),
        channel,
        election_id,
    ))
}

/// Live voting stream of an election.
async fn live(
    Path(election_id): Path<i32>,
    Query(query): Query<StreamQuery>,
    header: Option<AuthPrincipal>,
    State(state): State<AppState>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    open_channel(state, header, query, ResultsChannel::Election, election_id).await
}

/// Results stream of an election.
async fn results(
    Path(election_id): Path<i32>,
    Query(query): Query<StreamQuery>,
    header: Option<AuthPrincipal>,
    State(state): State<AppState>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    open_channel(state, header, query, ResultsChannel::Results, election_id).await
}

/// Create SSE router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/elections/{id}/live", get(live))
        .route("/elections/{id}/results", get(results))
}
