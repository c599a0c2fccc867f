use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures_util::stream::{Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use marquee_core::ShowId;
use marquee_shared::models::SeatView;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shows/{id}/seats", get(get_seats))
        .route("/shows/{id}/seats/stream", get(stream_seats))
}

/// Seats grouped by row, then by number within the row.
async fn get_seats(
    State(state): State<AppState>,
    Path(show_id): Path<u64>,
) -> Result<Json<Vec<SeatView>>, AppError> {
    let seats = state
        .inventory
        .get_seats(ShowId(show_id))
        .await
        .map_err(|_| AppError::NotFoundError(format!("Show {} not found", show_id)))?;

    Ok(Json(seats.iter().map(|seat| seat.view()).collect()))
}

/// Live seat transitions for one show. Display only: a client that falls
/// behind simply misses events and should re-read the seat map.
async fn stream_seats(
    State(state): State<AppState>,
    Path(show_id): Path<u64>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let show_id = ShowId(show_id);
    if !state.inventory.show_ids().await.contains(&show_id) {
        return Err(AppError::NotFoundError(format!("Show {} not found", show_id)));
    }

    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.show_id == show_id => Event::default()
                .event("seats")
                .json_data(&event)
                .ok()
                .map(Ok),
            Ok(_) => None,
            Err(e) => {
                warn!("Seat stream for show {} lagged: {}", show_id, e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
