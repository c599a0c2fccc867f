use async_trait::async_trait;

use marquee_shared::ids::{BookingId, HolderToken, ShowId};

use crate::booking::Booking;
use crate::show::Show;
use crate::CoreResult;

/// Read access to shows, owned by the catalog collaborator.
#[async_trait]
pub trait ShowRepository: Send + Sync {
    async fn get_show(&self, id: ShowId) -> CoreResult<Option<Show>>;
}

/// Append-only booking ledger.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> CoreResult<()>;

    async fn get_booking(&self, id: BookingId) -> CoreResult<Option<Booking>>;

    /// Newest first.
    async fn list_bookings(&self, holder: &HolderToken) -> CoreResult<Vec<Booking>>;
}
