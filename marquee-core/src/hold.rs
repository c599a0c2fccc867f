use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marquee_shared::ids::{HolderToken, SeatId};

/// A time-boxed exclusive claim on one seat. Exists only while the seat is
/// `Held`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub seat_id: SeatId,
    pub holder: HolderToken,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    /// A hold is live strictly before its deadline.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_held_by(&self, holder: &HolderToken) -> bool {
        &self.holder == holder
    }
}
