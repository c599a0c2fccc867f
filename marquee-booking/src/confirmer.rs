use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use marquee_catalog::{InventoryError, SeatInventory};
use marquee_core::repository::{BookingRepository, ShowRepository};
use marquee_core::{Booking, Clock, ConfirmError, HolderToken, SeatId, SeatStatus, ShowId};
use marquee_hold::HoldEvents;
use marquee_shared::models::SeatEventKind;
use marquee_shared::Masked;

use crate::pending::PendingRequests;

/// Turns live holds into a confirmed booking, or changes nothing.
///
/// Runs under the same per-show gate as acquire, release and the expiry
/// sweep, so for any hold exactly one of {confirm, expire} wins.
pub struct BookingConfirmer {
    inventory: Arc<SeatInventory>,
    shows: Arc<dyn ShowRepository>,
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
    events: HoldEvents,
    pending: PendingRequests,
}

/// How the requested seats relate to the caller at confirmation time.
#[derive(Debug, Default)]
struct HoldCensus {
    live: Vec<SeatId>,
    expired: Vec<SeatId>,
    foreign: Vec<SeatId>,
    unheld: Vec<SeatId>,
}

impl BookingConfirmer {
    pub fn new(
        inventory: Arc<SeatInventory>,
        shows: Arc<dyn ShowRepository>,
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
        events: HoldEvents,
    ) -> Self {
        Self {
            inventory,
            shows,
            bookings,
            clock,
            events,
            pending: PendingRequests::new(),
        }
    }

    pub async fn confirm(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: &HolderToken,
    ) -> Result<Booking, ConfirmError> {
        let requested: BTreeSet<SeatId> = seat_ids.iter().copied().collect();
        if requested.is_empty() {
            return Err(ConfirmError::EmptySelection);
        }

        let _pending = self
            .pending
            .begin(holder)
            .ok_or(ConfirmError::RequestPending)?;

        let show = self
            .shows
            .get_show(show_id)
            .await
            .map_err(|e| ConfirmError::Storage(e.to_string()))?
            .ok_or(ConfirmError::ShowNotFound(show_id))?;

        let mut gate = self
            .inventory
            .gate(show_id)
            .await
            .map_err(|e| match e {
                InventoryError::SeatNotFound(_, seat_id) => ConfirmError::SeatsNotFound(vec![seat_id]),
                _ => ConfirmError::ShowNotFound(show_id),
            })?;

        let missing = gate.missing(&requested);
        if !missing.is_empty() {
            return Err(ConfirmError::SeatsNotFound(missing));
        }

        let now = self.clock.now();
        let mut census = HoldCensus::default();
        for seat_id in requested.iter().copied() {
            match (gate.status(seat_id), gate.hold(seat_id)) {
                (Some(SeatStatus::Held), Some(hold)) if hold.is_held_by(holder) => {
                    if hold.is_live(now) {
                        census.live.push(seat_id);
                    } else {
                        census.expired.push(seat_id);
                    }
                }
                (Some(SeatStatus::Held), _) => census.foreign.push(seat_id),
                _ => census.unheld.push(seat_id),
            }
        }

        if !census.expired.is_empty() {
            warn!(
                "Confirm on show {} for {} hit expired holds {:?}",
                show_id,
                Masked(holder),
                census.expired
            );
            return Err(ConfirmError::HoldExpired(census.expired));
        }
        if census.live.is_empty() && !census.foreign.is_empty() {
            return Err(ConfirmError::NotHolder(census.foreign));
        }
        if !census.foreign.is_empty() || !census.unheld.is_empty() {
            let mut lost = census.foreign;
            lost.extend(census.unheld);
            lost.sort();
            return Err(ConfirmError::PartialHold(lost));
        }

        let seats = census
            .live
            .iter()
            .filter_map(|id| gate.label(*id).map(|label| (*id, label.clone())))
            .collect();
        let booking = Booking::confirmed(&show, holder.clone(), seats, now);

        // Record first: if the ledger refuses, no seat has moved yet.
        self.bookings
            .insert_booking(&booking)
            .await
            .map_err(|e| ConfirmError::Storage(e.to_string()))?;

        for seat_id in &booking.seat_ids {
            if let Err(e) = gate.promote_hold(*seat_id) {
                error!("Booking {} could not promote seat {}: {}", booking.id, seat_id, e);
            }
        }
        drop(gate);

        self.events.publish(
            show_id,
            booking.seat_ids.clone(),
            SeatEventKind::Booked,
            now.timestamp(),
        );
        info!(
            "Booking {} confirmed on show {} for {}: {} seats, total {}",
            booking.id,
            show_id,
            Masked(holder),
            booking.seat_ids.len(),
            booking.total_amount
        );

        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use marquee_catalog::SeatLayout;
    use marquee_core::{BookingId, BookingStatus, CoreError, CoreResult, ManualClock, Show};
    use marquee_hold::{ExpirySweeper, HoldPolicy, LockCoordinator};
    use marquee_store::{InMemoryBookingRepository, InMemoryShowRepository};

    const SHOW: ShowId = ShowId(1);
    const A1: SeatId = SeatId(1);
    const A2: SeatId = SeatId(2);
    const A3: SeatId = SeatId(3);
    const PRICE: i64 = 1250;

    struct Fixture {
        inventory: Arc<SeatInventory>,
        clock: Arc<ManualClock>,
        bookings: Arc<InMemoryBookingRepository>,
        coordinator: LockCoordinator,
        confirmer: BookingConfirmer,
        sweeper: ExpirySweeper,
    }

    async fn fixture_with(bookings_repo: Option<Arc<dyn BookingRepository>>) -> Fixture {
        let inventory = Arc::new(SeatInventory::new());
        inventory
            .register_show(SHOW, SeatLayout::new(1, 3).seats())
            .await
            .unwrap();
        let shows = Arc::new(InMemoryShowRepository::new());
        shows
            .insert_show(Show {
                id: SHOW,
                title: "Premiere".into(),
                starts_at: Utc::now(),
                price_per_seat: PRICE,
            })
            .await
            .unwrap();
        let bookings = Arc::new(InMemoryBookingRepository::new());
        let ledger: Arc<dyn BookingRepository> = match bookings_repo {
            Some(repo) => repo,
            None => bookings.clone(),
        };
        let clock = Arc::new(ManualClock::default());
        let events = HoldEvents::new(64);

        Fixture {
            coordinator: LockCoordinator::new(
                inventory.clone(),
                clock.clone(),
                events.clone(),
                HoldPolicy::default(),
            ),
            confirmer: BookingConfirmer::new(
                inventory.clone(),
                shows,
                ledger,
                clock.clone(),
                events.clone(),
            ),
            sweeper: ExpirySweeper::new(
                inventory.clone(),
                clock.clone(),
                events,
                std::time::Duration::from_secs(5),
            ),
            inventory,
            clock,
            bookings,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(None).await
    }

    fn token(name: &str) -> HolderToken {
        HolderToken::new(name)
    }

    async fn statuses(f: &Fixture) -> Vec<SeatStatus> {
        f.inventory
            .get_seats(SHOW)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.status)
            .collect()
    }

    #[tokio::test]
    async fn test_confirm_books_held_seats() {
        let f = fixture().await;
        f.coordinator.acquire(SHOW, &[A1], &token("x")).await.unwrap();

        let booking = f.confirmer.confirm(SHOW, &[A1], &token("x")).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.seat_ids, vec![A1]);
        assert_eq!(booking.total_amount, PRICE);
        assert_eq!(f.inventory.status_of(SHOW, A1).await.unwrap(), SeatStatus::Booked);
        assert!(f.inventory.hold_of(SHOW, A1).await.unwrap().is_none());
        assert_eq!(f.bookings.len().await, 1);

        // Booked is permanent: expiry and release cannot touch it.
        f.clock.advance(Duration::seconds(3600));
        f.sweeper.sweep_once().await;
        assert!(f.coordinator.release(SHOW, &[A1], &token("x")).await.is_err());
        assert_eq!(f.inventory.status_of(SHOW, A1).await.unwrap(), SeatStatus::Booked);
    }

    #[tokio::test]
    async fn test_total_is_price_times_seats() {
        let f = fixture().await;
        f.coordinator
            .acquire(SHOW, &[A1, A2, A3], &token("x"))
            .await
            .unwrap();
        let booking = f
            .confirmer
            .confirm(SHOW, &[A3, A1, A2], &token("x"))
            .await
            .unwrap();
        assert_eq!(booking.seat_ids, vec![A1, A2, A3]);
        assert_eq!(booking.total_amount, PRICE * 3);
    }

    #[tokio::test]
    async fn test_confirm_after_expiry_changes_nothing() {
        let f = fixture().await;
        f.coordinator.acquire(SHOW, &[A1, A2], &token("x")).await.unwrap();
        f.clock.advance(Duration::seconds(120));

        let before = statuses(&f).await;
        let err = f
            .confirmer
            .confirm(SHOW, &[A1, A2], &token("x"))
            .await
            .unwrap_err();
        assert_eq!(err, ConfirmError::HoldExpired(vec![A1, A2]));
        assert_eq!(statuses(&f).await, before);
        assert!(f.bookings.is_empty().await);
    }

    #[tokio::test]
    async fn test_confirm_by_other_customer_is_not_holder() {
        let f = fixture().await;
        f.coordinator.acquire(SHOW, &[A1], &token("x")).await.unwrap();

        let err = f.confirmer.confirm(SHOW, &[A1], &token("y")).await.unwrap_err();
        assert_eq!(err, ConfirmError::NotHolder(vec![A1]));
        assert_eq!(f.inventory.status_of(SHOW, A1).await.unwrap(), SeatStatus::Held);
    }

    #[tokio::test]
    async fn test_confirm_after_partial_release_is_partial_hold() {
        let f = fixture().await;
        f.coordinator.acquire(SHOW, &[A1, A2], &token("x")).await.unwrap();
        f.coordinator.release(SHOW, &[A2], &token("x")).await.unwrap();

        let err = f
            .confirmer
            .confirm(SHOW, &[A1, A2], &token("x"))
            .await
            .unwrap_err();
        assert_eq!(err, ConfirmError::PartialHold(vec![A2]));
        assert_eq!(f.inventory.status_of(SHOW, A1).await.unwrap(), SeatStatus::Held);
        assert!(f.bookings.is_empty().await);
    }

    #[tokio::test]
    async fn test_confirm_never_books_twice() {
        let f = fixture().await;
        f.coordinator.acquire(SHOW, &[A1], &token("x")).await.unwrap();
        f.confirmer.confirm(SHOW, &[A1], &token("x")).await.unwrap();

        let err = f.confirmer.confirm(SHOW, &[A1], &token("x")).await.unwrap_err();
        assert_eq!(err, ConfirmError::PartialHold(vec![A1]));
        assert_eq!(f.bookings.len().await, 1);
    }

    #[tokio::test]
    async fn test_confirm_validation() {
        let f = fixture().await;
        assert_eq!(
            f.confirmer.confirm(SHOW, &[], &token("x")).await.unwrap_err(),
            ConfirmError::EmptySelection
        );
        assert_eq!(
            f.confirmer.confirm(ShowId(9), &[A1], &token("x")).await.unwrap_err(),
            ConfirmError::ShowNotFound(ShowId(9))
        );
        assert_eq!(
            f.confirmer
                .confirm(SHOW, &[SeatId(40)], &token("x"))
                .await
                .unwrap_err(),
            ConfirmError::SeatsNotFound(vec![SeatId(40)])
        );
    }

    #[tokio::test]
    async fn test_overlapping_confirm_for_same_holder_is_rejected() {
        let f = fixture().await;
        f.coordinator.acquire(SHOW, &[A1], &token("x")).await.unwrap();

        let _in_flight = f.confirmer.pending.begin(&token("x")).unwrap();
        let err = f.confirmer.confirm(SHOW, &[A1], &token("x")).await.unwrap_err();
        assert_eq!(err, ConfirmError::RequestPending);
        assert_eq!(f.inventory.status_of(SHOW, A1).await.unwrap(), SeatStatus::Held);
    }

    struct RefusingLedger;

    #[async_trait]
    impl BookingRepository for RefusingLedger {
        async fn insert_booking(&self, _booking: &Booking) -> CoreResult<()> {
            Err(CoreError::InternalError("disk full".into()))
        }

        async fn get_booking(&self, _id: BookingId) -> CoreResult<Option<Booking>> {
            Ok(None)
        }

        async fn list_bookings(&self, _holder: &HolderToken) -> CoreResult<Vec<Booking>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_ledger_failure_leaves_holds_in_place() {
        let f = fixture_with(Some(Arc::new(RefusingLedger))).await;
        f.coordinator.acquire(SHOW, &[A1, A2], &token("x")).await.unwrap();

        let err = f
            .confirmer
            .confirm(SHOW, &[A1, A2], &token("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfirmError::Storage(_)));
        assert_eq!(
            statuses(&f).await,
            vec![SeatStatus::Held, SeatStatus::Held, SeatStatus::Available]
        );
    }

    #[tokio::test]
    async fn test_sweep_and_confirm_race_has_one_winner() {
        for _ in 0..50 {
            let f = Arc::new(fixture().await);
            f.coordinator.acquire(SHOW, &[A1, A2], &token("x")).await.unwrap();

            let confirm = {
                let f = f.clone();
                tokio::spawn(async move { f.confirmer.confirm(SHOW, &[A1, A2], &token("x")).await })
            };
            let expire = {
                let f = f.clone();
                tokio::spawn(async move {
                    f.clock.advance(Duration::seconds(121));
                    f.sweeper.sweep_once().await
                })
            };

            let confirmed = confirm.await.unwrap();
            let swept = expire.await.unwrap();
            let seats = statuses(&f).await;

            match confirmed {
                Ok(booking) => {
                    assert_eq!(swept.holds_expired, 0);
                    assert_eq!(&seats[..2], &[SeatStatus::Booked, SeatStatus::Booked]);
                    assert_eq!(f.bookings.get_booking(booking.id).await.unwrap(), Some(booking));
                }
                Err(err) => {
                    assert!(matches!(err, ConfirmError::HoldExpired(_) | ConfirmError::PartialHold(_)));
                    assert!(f.bookings.is_empty().await);
                    assert!(seats[..2].iter().all(|s| *s != SeatStatus::Booked));
                }
            }
        }
    }
}
