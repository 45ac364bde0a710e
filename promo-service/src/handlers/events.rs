use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use service_core::error::AppError;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use crate::{
    dtos::{EventResponse, EventsQuery},
    AppState,
};

/// Persistent redemption event log, newest first.
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = state.notifier.history(query.limit()).await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

/// In-memory recent activity feed.
pub async fn recent_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<EventResponse>> {
    let limit = query.limit.map(|l| l as usize);
    Json(
        state
            .notifier
            .recent(limit)
            .into_iter()
            .map(EventResponse::from)
            .collect(),
    )
}

/// Live redemption events as Server-Sent Events.
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = BroadcastStream::new(state.notifier.subscribe()).filter_map(|message| {
        match message {
            Ok(event) => Some(
                Event::default()
                    .event("redemption")
                    .json_data(EventResponse::from(event)),
            ),
            Err(lagged) => {
                tracing::warn!(error = %lagged, "Event stream subscriber lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
