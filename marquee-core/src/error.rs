use marquee_shared::envelope::{FailureCode, FailureDetail};
use marquee_shared::ids::{SeatId, ShowId};

/// Failures of the lock coordinator (`acquire` and `release`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// Nothing was granted; these are exactly the seats that were not Available.
    #[error("Seats no longer available: {}", join(.rejected))]
    Conflict { rejected: Vec<SeatId> },

    #[error("Show not found: {0}")]
    ShowNotFound(ShowId),

    #[error("Seats not found: {}", join(.0))]
    SeatsNotFound(Vec<SeatId>),

    /// Release by a non-holder, of an expired hold, or of a booked seat.
    #[error("Seats not held by caller: {}", join(.0))]
    NotHeld(Vec<SeatId>),

    #[error("No seats selected")]
    EmptySelection,

    #[error("Too many seats requested: {requested} (max {max})")]
    TooManySeats { requested: usize, max: usize },
}

/// Failures of the booking confirmer. In every case no booking exists and
/// no seat changed state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmError {
    #[error("Hold expired for seats: {}", join(.0))]
    HoldExpired(Vec<SeatId>),

    /// None of the requested seats are held by the caller, some are held by
    /// somebody else.
    #[error("Seats held by another customer: {}", join(.0))]
    NotHolder(Vec<SeatId>),

    /// The caller holds some, but not all, of the requested seats.
    #[error("Caller no longer holds seats: {}", join(.0))]
    PartialHold(Vec<SeatId>),

    #[error("Show not found: {0}")]
    ShowNotFound(ShowId),

    #[error("Seats not found: {}", join(.0))]
    SeatsNotFound(Vec<SeatId>),

    #[error("A confirmation is already pending for this customer")]
    RequestPending,

    #[error("No seats selected")]
    EmptySelection,

    #[error("Booking could not be recorded: {0}")]
    Storage(String),
}

impl LockError {
    pub fn detail(&self) -> FailureDetail {
        match self {
            LockError::Conflict { rejected } => {
                FailureDetail::new(FailureCode::Conflict, rejected.clone())
            }
            LockError::ShowNotFound(_) => FailureDetail::bare(FailureCode::NotFound),
            LockError::SeatsNotFound(ids) => FailureDetail::new(FailureCode::NotFound, ids.clone()),
            LockError::NotHeld(ids) => FailureDetail::new(FailureCode::NotHeld, ids.clone()),
            LockError::EmptySelection => FailureDetail::bare(FailureCode::EmptySelection),
            LockError::TooManySeats { .. } => FailureDetail::bare(FailureCode::TooManySeats),
        }
    }
}

impl ConfirmError {
    pub fn detail(&self) -> FailureDetail {
        match self {
            ConfirmError::HoldExpired(ids) => FailureDetail::new(FailureCode::HoldExpired, ids.clone()),
            ConfirmError::NotHolder(ids) => FailureDetail::new(FailureCode::NotHolder, ids.clone()),
            ConfirmError::PartialHold(ids) => FailureDetail::new(FailureCode::PartialHold, ids.clone()),
            ConfirmError::ShowNotFound(_) => FailureDetail::bare(FailureCode::NotFound),
            ConfirmError::SeatsNotFound(ids) => FailureDetail::new(FailureCode::NotFound, ids.clone()),
            ConfirmError::RequestPending => FailureDetail::bare(FailureCode::RequestPending),
            ConfirmError::EmptySelection => FailureDetail::bare(FailureCode::EmptySelection),
            ConfirmError::Storage(_) => FailureDetail::bare(FailureCode::Internal),
        }
    }
}

fn join(ids: &[SeatId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
