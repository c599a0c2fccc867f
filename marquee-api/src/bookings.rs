use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use marquee_core::{BookingId, HolderToken};
use marquee_shared::models::{
    BookingView, ConfirmData, LockData, ReleaseData, SeatSelectionRequest,
};
use marquee_shared::{ApiResponse, Masked};

use crate::error::AppError;
use crate::middleware::customer_auth_middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/bookings/lock", post(lock_seats))
        .route("/bookings/confirm", post(confirm_booking))
        .route("/bookings/release", post(release_seats))
        .route("/bookings/my", get(my_bookings))
        .route("/bookings/{id}", get(get_booking))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            customer_auth_middleware,
        ))
}

fn selection(
    payload: Result<Json<SeatSelectionRequest>, JsonRejection>,
) -> Result<SeatSelectionRequest, AppError> {
    payload
        .map(|Json(req)| req)
        .map_err(|e| AppError::ValidationError(e.body_text()))
}

async fn lock_seats(
    State(state): State<AppState>,
    Extension(holder): Extension<HolderToken>,
    payload: Result<Json<SeatSelectionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LockData>>, AppError> {
    let req = selection(payload)?;
    let grant = state
        .coordinator
        .acquire(req.show_id, &req.seat_ids, &holder)
        .await?;

    Ok(Json(ApiResponse::ok_with_message(
        "Seats locked",
        LockData {
            expires_at_utc: grant.expires_at,
        },
    )))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Extension(holder): Extension<HolderToken>,
    payload: Result<Json<SeatSelectionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ConfirmData>>, AppError> {
    let req = selection(payload)?;
    let booking = state
        .confirmer
        .confirm(req.show_id, &req.seat_ids, &holder)
        .await?;

    Ok(Json(ApiResponse::ok_with_message(
        "Booking confirmed",
        ConfirmData {
            booking_id: booking.id,
            total: booking.total_amount,
        },
    )))
}

async fn release_seats(
    State(state): State<AppState>,
    Extension(holder): Extension<HolderToken>,
    payload: Result<Json<SeatSelectionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ReleaseData>>, AppError> {
    let req = selection(payload)?;
    let released = state
        .coordinator
        .release(req.show_id, &req.seat_ids, &holder)
        .await?;

    Ok(Json(ApiResponse::ok_with_message(
        "Seats released",
        ReleaseData { released },
    )))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(holder): Extension<HolderToken>,
) -> Result<Json<ApiResponse<Vec<BookingView>>>, AppError> {
    let bookings = state
        .bookings
        .list_bookings(&holder)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    info!("Listing {} bookings for {}", bookings.len(), Masked(&holder));
    Ok(Json(ApiResponse::ok(
        bookings.iter().map(|b| b.view()).collect(),
    )))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(holder): Extension<HolderToken>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<BookingView>>, AppError> {
    let not_found = || AppError::NotFoundError("Booking not found".to_string());
    let Path(id) = id.map_err(|_| not_found())?;

    let booking = state
        .bookings
        .get_booking(BookingId(id))
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        // Someone else's booking is indistinguishable from a missing one.
        .filter(|b| b.holder == holder)
        .ok_or_else(not_found)?;

    Ok(Json(ApiResponse::ok(booking.view())))
}
