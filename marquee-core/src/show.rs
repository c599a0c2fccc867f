use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marquee_shared::ids::ShowId;

/// A screening. Owned by the catalog; read-only to reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    /// Minor currency units.
    pub price_per_seat: i64,
}
