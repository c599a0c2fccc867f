pub mod envelope;
pub mod ids;
pub mod models;
pub mod pii;

pub use envelope::{ApiResponse, EnvelopeOutcome, FailureCode, FailureDetail};
pub use ids::{BookingId, HolderToken, SeatId, ShowId};
pub use pii::Masked;
