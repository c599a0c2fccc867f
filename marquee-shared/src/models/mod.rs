pub mod events;
pub mod wire;

pub use events::{SeatEvent, SeatEventKind};
pub use wire::{
    BookingSeatView, BookingView, ConfirmData, LockData, ReleaseData, SeatSelectionRequest,
    SeatView,
};
