use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::AppError;
use crate::state::AppState;

// GET /api/events: SSE stream of booking events
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
    pub last_id: Option<i64>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Auth via query param (EventSource can't set headers)
    let token = query.token.as_deref().unwrap_or("");
    if token.is_empty() || token != state.config.admin_token {
        return Err(AppError::Unauthorized);
    }

    let last_id = query.last_id.unwrap_or(0);

    // Subscribe before the catch-up read so nothing falls in between
    let rx = state.events_tx.subscribe();

    let catchup_events = {
        let db = state.conn()?;
        queries::get_booking_events_since(&db, last_id)?
    };
    let caught_up_to = catchup_events.last().map(|e| e.id).unwrap_or(last_id);

    let catchup_stream = tokio_stream::iter(catchup_events.into_iter().map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok::<_, Infallible>(
            Event::default()
                .id(event.id.to_string())
                .data(data)
                .event("booking_event"),
        )
    }));

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.id > caught_up_to => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default()
                .id(event.id.to_string())
                .data(data)
                .event("booking_event")))
        }
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "event subscriber lagged");
            None
        }
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    let combined = catchup_stream.chain(live_stream);
    let merged = StreamExt::merge(combined, keepalive_stream);

    Ok(Sse::new(merged))
}
