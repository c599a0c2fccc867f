pub mod booking;
pub mod clock;
pub mod error;
pub mod hold;
pub mod repository;
pub mod seat;
pub mod show;

pub use marquee_shared::ids::{BookingId, HolderToken, SeatId, ShowId};

pub use booking::{Booking, BookingStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfirmError, LockError};
pub use hold::Hold;
pub use seat::{Seat, SeatLabel, SeatStatus};
pub use show::Show;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
