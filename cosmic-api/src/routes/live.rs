/// SSE live feed endpoint
///
/// Streams broadcast events (guestbook posts, visitor activity) to the
/// browser. Subscribers join at the stream head; there is no backfill. A
/// subscriber that falls behind gets a `lagged` event with the number of
/// missed events and then continues live.
///
/// # Endpoint
///
/// ```text
/// GET /api/live/events
/// Accept: text/event-stream
/// ```

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use futures::StreamExt;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::app::AppState;

/// Opens an SSE subscription to the live feed
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.live.subscribe();
    tracing::debug!(
        subscribers = state.live.subscriber_count(),
        "Live feed subscriber connected"
    );

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(live_event) => {
                let name = live_event.event_name();
                match serde_json::to_string(&live_event) {
                    Ok(data) => Some(Ok(Event::default().event(name).data(data))),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to serialize live event");
                        None
                    }
                }
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => Some(Ok(Event::default()
                .event("lagged")
                .data(skipped.to_string()))),
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
