//! Server-Sent Events change stream
//!
//! GET /api/events?table=posts&event=INSERT

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use encore_common::events::{EventFilter, Table};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub table: Option<String>,
    /// `INSERT`, `UPDATE`, `DELETE` or `*` (the default)
    pub event: Option<String>,
}

/// GET /api/events?table=...&event=...
///
/// Each matching change is sent as an SSE event named after its kind with the
/// JSON change as data. The subscription ends when the client disconnects.
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let table: Table = query
        .table
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("table is required".to_string()))?
        .parse()
        .map_err(ApiError::BadRequest)?;
    let filter: EventFilter = query
        .event
        .as_deref()
        .unwrap_or("*")
        .parse()
        .map_err(ApiError::BadRequest)?;

    debug!(table = %table, ?filter, "SSE client subscribed");
    let mut subscription = state.store.changes().subscribe(table, filter);

    // Dropping the stream drops the subscription, which cancels it
    let stream = async_stream::stream! {
        while let Some(change) = subscription.recv().await {
            match serde_json::to_string(&change) {
                Ok(json) => yield Ok(Event::default().event(change.kind.as_str()).data(json)),
                Err(e) => warn!("Failed to serialize change: {}", e),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
