use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BookingId, SeatId, ShowId};

/// Body of `POST /bookings/lock`, `/bookings/confirm` and `/bookings/release`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatSelectionRequest {
    pub show_id: ShowId,
    pub seat_ids: Vec<SeatId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LockData {
    pub expires_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmData {
    pub booking_id: BookingId,
    /// Minor currency units.
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseData {
    /// Seats that went back to Available; already-available seats are omitted.
    pub released: Vec<SeatId>,
}

/// A seat as the seat-selection screen renders it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub id: SeatId,
    pub row: String,
    pub number: u32,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub is_booked: bool,
    #[serde(default)]
    pub is_locked: bool,
}

impl SeatView {
    pub fn label(&self) -> String {
        format!("{}{}", self.row, self.number)
    }

    pub fn is_selectable(&self) -> bool {
        !(self.is_disabled || self.is_booked || self.is_locked)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingSeatView {
    pub row: String,
    pub number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: BookingId,
    pub show_id: ShowId,
    pub movie_title: String,
    pub starts_at_utc: DateTime<Utc>,
    pub status: String,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub seats: Vec<BookingSeatView>,
}
