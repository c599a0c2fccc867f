use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use marquee_catalog::{SeatInventory, ShowSeats};
use marquee_core::{Clock, SeatId};
use marquee_shared::models::SeatEventKind;

use crate::events::HoldEvents;

/// Revert every hold among `seat_ids` whose deadline has passed. This is the
/// single expiry path: the sweeper and lazy reclaim on acquire both use it,
/// always under the show's gate.
pub(crate) fn reclaim_expired(
    seats: &mut ShowSeats,
    seat_ids: impl IntoIterator<Item = SeatId>,
    now: DateTime<Utc>,
) -> Vec<SeatId> {
    let mut reclaimed = Vec::new();
    for seat_id in seat_ids {
        let expired = seats.hold(seat_id).is_some_and(|hold| !hold.is_live(now));
        if expired && seats.clear_hold(seat_id).is_ok() {
            reclaimed.push(seat_id);
        }
    }
    reclaimed
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub shows_scanned: usize,
    pub holds_expired: usize,
}

/// Background worker returning lapsed holds to Available, independent of
/// any client.
pub struct ExpirySweeper {
    inventory: Arc<SeatInventory>,
    clock: Arc<dyn Clock>,
    events: HoldEvents,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(
        inventory: Arc<SeatInventory>,
        clock: Arc<dyn Clock>,
        events: HoldEvents,
        interval: Duration,
    ) -> Self {
        Self {
            inventory,
            clock,
            events,
            interval,
        }
    }

    /// One pass over every show. Each show's gate is taken on its own, so a
    /// sweep never holds two gates at once.
    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        for show_id in self.inventory.show_ids().await {
            let mut gate = match self.inventory.gate(show_id).await {
                Ok(gate) => gate,
                Err(e) => {
                    warn!("Skipping show {} during sweep: {}", show_id, e);
                    continue;
                }
            };
            report.shows_scanned += 1;

            let now = self.clock.now();
            let lapsed = gate.expired_holds(now);
            if lapsed.is_empty() {
                continue;
            }
            let reclaimed = reclaim_expired(&mut gate, lapsed, now);
            drop(gate);

            if !reclaimed.is_empty() {
                warn!(
                    "Expired {} holds on show {}: {:?}",
                    reclaimed.len(),
                    show_id,
                    reclaimed
                );
                report.holds_expired += reclaimed.len();
                self.events
                    .publish(show_id, reclaimed, SeatEventKind::Expired, now.timestamp());
            }
        }

        report
    }

    /// Run `sweep_once` every interval until `shutdown` flips to true or its
    /// sender goes away.
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = if self.interval.is_zero() {
                Duration::from_secs(1)
            } else {
                self.interval
            };
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!("Expiry sweeper started, interval {:?}", period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.sweep_once().await;
                        if report.holds_expired > 0 {
                            info!(
                                "Sweep released {} holds across {} shows",
                                report.holds_expired, report.shows_scanned
                            );
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Expiry sweeper stopped");
        })
    }
}
