pub mod gateway;
pub mod machine;
pub mod session;

pub use gateway::{BookingGateway, GatewayError, HttpGateway};
pub use machine::{
    BookingReceipt, LocalSeatState, Phase, ReservationSession, SeatDisplay, SeatRow, SessionError,
    ToggleOutcome,
};
pub use session::{AuthSnapshot, SessionStore, UserProfile};
