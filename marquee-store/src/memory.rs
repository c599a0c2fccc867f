use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use marquee_core::repository::{BookingRepository, ShowRepository};
use marquee_core::{Booking, BookingId, CoreError, CoreResult, HolderToken, Show, ShowId};

#[derive(Debug, Default)]
pub struct InMemoryShowRepository {
    shows: RwLock<HashMap<ShowId, Show>>,
}

impl InMemoryShowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_show(&self, show: Show) -> CoreResult<()> {
        let mut shows = self.shows.write().await;
        if shows.contains_key(&show.id) {
            return Err(CoreError::ValidationError(format!(
                "show {} already exists",
                show.id
            )));
        }
        info!("Show registered: {} ({})", show.id, show.title);
        shows.insert(show.id, show);
        Ok(())
    }
}

#[async_trait]
impl ShowRepository for InMemoryShowRepository {
    async fn get_show(&self, id: ShowId) -> CoreResult<Option<Show>> {
        Ok(self.shows.read().await.get(&id).cloned())
    }
}

/// Append-only ledger kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<Vec<Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.bookings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bookings.read().await.is_empty()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert_booking(&self, booking: &Booking) -> CoreResult<()> {
        let mut bookings = self.bookings.write().await;
        if bookings.iter().any(|b| b.id == booking.id) {
            return Err(CoreError::InternalError(format!(
                "booking {} already recorded",
                booking.id
            )));
        }
        bookings.push(booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> CoreResult<Option<Booking>> {
        Ok(self
            .bookings
            .read()
            .await
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn list_bookings(&self, holder: &HolderToken) -> CoreResult<Vec<Booking>> {
        Ok(self
            .bookings
            .read()
            .await
            .iter()
            .rev()
            .filter(|b| &b.holder == holder)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use marquee_core::{SeatId, SeatLabel};

    fn booking(holder: &str, seat: u64) -> Booking {
        let show = Show {
            id: ShowId(1),
            title: "Matinee".into(),
            starts_at: Utc::now(),
            price_per_seat: 1000,
        };
        Booking::confirmed(
            &show,
            HolderToken::new(holder),
            vec![(SeatId(seat), SeatLabel::new("A", seat as u32))],
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_ledger_lists_per_holder_newest_first() {
        let repo = InMemoryBookingRepository::new();
        let first = booking("x", 1);
        let other = booking("y", 2);
        let second = booking("x", 3);
        for b in [&first, &other, &second] {
            repo.insert_booking(b).await.unwrap();
        }

        let mine = repo.list_bookings(&HolderToken::new("x")).await.unwrap();
        let ids: Vec<BookingId> = mine.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        assert_eq!(repo.get_booking(other.id).await.unwrap(), Some(other.clone()));
        assert!(repo.insert_booking(&other).await.is_err());
        assert_eq!(repo.len().await, 3);
    }

    #[tokio::test]
    async fn test_show_repository() {
        let repo = InMemoryShowRepository::new();
        let show = Show {
            id: ShowId(4),
            title: "Late Show".into(),
            starts_at: Utc::now(),
            price_per_seat: 800,
        };
        repo.insert_show(show.clone()).await.unwrap();
        assert!(repo.insert_show(show.clone()).await.is_err());
        assert_eq!(repo.get_show(ShowId(4)).await.unwrap(), Some(show));
        assert_eq!(repo.get_show(ShowId(5)).await.unwrap(), None);
    }
}
