pub mod confirmer;
pub mod pending;

pub use confirmer::BookingConfirmer;
pub use pending::{PendingGuard, PendingRequests};
