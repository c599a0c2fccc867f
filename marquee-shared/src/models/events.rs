use serde::{Deserialize, Serialize};

use crate::ids::{SeatId, ShowId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatEventKind {
    Held,
    Released,
    Expired,
    Booked,
}

/// Published after every committed seat transition of a show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatEvent {
    pub show_id: ShowId,
    pub seat_ids: Vec<SeatId>,
    #[serde(rename = "status")]
    pub kind: SeatEventKind,
    /// Unix timestamp, seconds.
    pub at: i64,
}
