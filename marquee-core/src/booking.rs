use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marquee_shared::ids::{BookingId, HolderToken, SeatId, ShowId};
use marquee_shared::models::{BookingSeatView, BookingView};

use crate::seat::SeatLabel;
use crate::show::Show;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

/// A permanent claim on a non-empty, ordered set of seats of one show.
///
/// Only the confirmer builds these; once confirmed the seat set never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub show_id: ShowId,
    /// Show title and start time as they were when the booking was made.
    pub movie_title: String,
    pub starts_at: DateTime<Utc>,
    pub holder: HolderToken,
    pub seat_ids: Vec<SeatId>,
    pub seats: Vec<SeatLabel>,
    /// Minor currency units, captured from the show price at confirmation.
    pub total_amount: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// `seats` pairs each seat id with its label; it is sorted by id so the
    /// stored set is ordered. Price, title and start time come from `show`.
    pub fn confirmed(
        show: &Show,
        holder: HolderToken,
        mut seats: Vec<(SeatId, SeatLabel)>,
        created_at: DateTime<Utc>,
    ) -> Self {
        seats.sort_by_key(|(id, _)| *id);
        let total_amount = show.price_per_seat * seats.len() as i64;
        let (seat_ids, labels) = seats.into_iter().unzip();
        Self {
            id: BookingId::new(),
            show_id: show.id,
            movie_title: show.title.clone(),
            starts_at: show.starts_at,
            holder,
            seat_ids,
            seats: labels,
            total_amount,
            status: BookingStatus::Confirmed,
            created_at,
        }
    }

    pub fn view(&self) -> BookingView {
        let mut seats: Vec<BookingSeatView> = self
            .seats
            .iter()
            .map(|label| BookingSeatView {
                row: label.row.clone(),
                number: label.number,
            })
            .collect();
        seats.sort_by(|a, b| a.row.cmp(&b.row).then(a.number.cmp(&b.number)));

        BookingView {
            id: self.id,
            show_id: self.show_id,
            movie_title: self.movie_title.clone(),
            starts_at_utc: self.starts_at,
            status: self.status.as_str().to_string(),
            total_amount: self.total_amount,
            created_at: self.created_at,
            seats,
        }
    }
}
