use std::sync::Arc;

use marquee_booking::BookingConfirmer;
use marquee_catalog::{SeatInventory, SeatLayout};
use marquee_core::repository::BookingRepository;
use marquee_core::{Clock, Show};
use marquee_hold::{ExpirySweeper, HoldEvents, HoldPolicy, LockCoordinator};
use marquee_store::app_config::ReservationRules;
use marquee_store::{InMemoryBookingRepository, InMemoryShowRepository};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<SeatInventory>,
    pub coordinator: Arc<LockCoordinator>,
    pub confirmer: Arc<BookingConfirmer>,
    pub shows: Arc<InMemoryShowRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub events: HoldEvents,
    pub clock: Arc<dyn Clock>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(rules: &ReservationRules, auth: AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let inventory = Arc::new(SeatInventory::new());
        let shows = Arc::new(InMemoryShowRepository::new());
        let bookings: Arc<dyn BookingRepository> = Arc::new(InMemoryBookingRepository::new());
        let events = HoldEvents::new(rules.event_buffer);
        let policy = HoldPolicy {
            ttl: chrono::Duration::seconds(rules.hold_ttl_seconds as i64),
            max_seats_per_request: rules.max_seats_per_request,
        };

        let coordinator = Arc::new(LockCoordinator::new(
            inventory.clone(),
            clock.clone(),
            events.clone(),
            policy,
        ));
        let confirmer = Arc::new(BookingConfirmer::new(
            inventory.clone(),
            shows.clone(),
            bookings.clone(),
            clock.clone(),
            events.clone(),
        ));

        Self {
            inventory,
            coordinator,
            confirmer,
            shows,
            bookings,
            events,
            clock,
            auth,
        }
    }

    /// Make a show sellable: record it and lay out its seats.
    pub async fn seed_show(&self, show: Show, layout: &SeatLayout) -> anyhow::Result<usize> {
        let show_id = show.id;
        self.shows.insert_show(show).await?;
        let seats = self.inventory.register_show(show_id, layout.seats()).await?;
        Ok(seats)
    }

    pub fn sweeper(&self, interval: std::time::Duration) -> ExpirySweeper {
        ExpirySweeper::new(
            self.inventory.clone(),
            self.clock.clone(),
            self.events.clone(),
            interval,
        )
    }
}
