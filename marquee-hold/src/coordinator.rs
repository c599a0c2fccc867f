use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use marquee_catalog::{InventoryError, SeatInventory};
use marquee_core::{Clock, Hold, HolderToken, LockError, SeatId, SeatStatus, ShowId};
use marquee_shared::models::SeatEventKind;
use marquee_shared::Masked;

use crate::events::HoldEvents;
use crate::expiry::reclaim_expired;

/// Tunables for hold acquisition.
#[derive(Debug, Clone, Copy)]
pub struct HoldPolicy {
    pub ttl: Duration,
    pub max_seats_per_request: usize,
}

impl Default for HoldPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(120),
            max_seats_per_request: 10,
        }
    }
}

/// Result of a successful `acquire`: every requested seat, ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grant {
    pub seat_ids: Vec<SeatId>,
    pub expires_at: DateTime<Utc>,
}

/// Grants and revokes time-boxed holds. At most one holder per seat.
pub struct LockCoordinator {
    inventory: Arc<SeatInventory>,
    clock: Arc<dyn Clock>,
    events: HoldEvents,
    policy: HoldPolicy,
}

impl LockCoordinator {
    pub fn new(
        inventory: Arc<SeatInventory>,
        clock: Arc<dyn Clock>,
        events: HoldEvents,
        policy: HoldPolicy,
    ) -> Self {
        Self {
            inventory,
            clock,
            events,
            policy,
        }
    }

    /// Hold every seat in `seat_ids` for the configured ttl, or none of them.
    pub async fn acquire(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: &HolderToken,
    ) -> Result<Grant, LockError> {
        self.acquire_with_ttl(show_id, seat_ids, holder, self.policy.ttl)
            .await
    }

    /// All-or-nothing: if any requested seat is not Available the call fails
    /// with `Conflict` naming exactly those seats and nothing is held.
    pub async fn acquire_with_ttl(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: &HolderToken,
        ttl: Duration,
    ) -> Result<Grant, LockError> {
        let requested: BTreeSet<SeatId> = seat_ids.iter().copied().collect();
        if requested.is_empty() {
            return Err(LockError::EmptySelection);
        }
        if requested.len() > self.policy.max_seats_per_request {
            return Err(LockError::TooManySeats {
                requested: requested.len(),
                max: self.policy.max_seats_per_request,
            });
        }

        let mut gate = self.inventory.gate(show_id).await.map_err(lock_error)?;

        let missing = gate.missing(&requested);
        if !missing.is_empty() {
            return Err(LockError::SeatsNotFound(missing));
        }

        let now = self.clock.now();
        let reclaimed = reclaim_expired(&mut gate, requested.iter().copied(), now);

        let rejected: Vec<SeatId> = requested
            .iter()
            .copied()
            .filter(|id| gate.status(*id) != Some(SeatStatus::Available))
            .collect();

        if !rejected.is_empty() {
            drop(gate);
            self.events
                .publish(show_id, reclaimed, SeatEventKind::Expired, now.timestamp());
            warn!(
                "Hold conflict on show {} for {}: rejected {:?}",
                show_id,
                Masked(holder),
                rejected
            );
            return Err(LockError::Conflict { rejected });
        }

        let expires_at = now + ttl;
        let mut placed = Vec::with_capacity(requested.len());
        for seat_id in requested.iter().copied() {
            let hold = Hold {
                seat_id,
                holder: holder.clone(),
                acquired_at: now,
                expires_at,
            };
            if let Err(e) = gate.place_hold(hold) {
                // Unreachable after validation under the gate; undo anyway.
                for placed_id in placed {
                    let _ = gate.clear_hold(placed_id);
                }
                warn!("Hold placement failed on show {}: {}", show_id, e);
                return Err(LockError::Conflict {
                    rejected: vec![seat_id],
                });
            }
            placed.push(seat_id);
        }
        drop(gate);

        self.events
            .publish(show_id, reclaimed, SeatEventKind::Expired, now.timestamp());
        self.events
            .publish(show_id, placed.clone(), SeatEventKind::Held, now.timestamp());
        info!(
            "Held {} seats on show {} for {} until {}",
            placed.len(),
            show_id,
            Masked(holder),
            expires_at
        );

        Ok(Grant {
            seat_ids: placed,
            expires_at,
        })
    }

    /// Return the caller's live holds to Available.
    ///
    /// Idempotent: seats that are already Available are skipped. Fails with
    /// `NotHeld`, changing nothing, if any seat is held by someone else, is
    /// held by the caller past its deadline, or is not held at all (Booked,
    /// Disabled). Returns the seats actually released.
    pub async fn release(
        &self,
        show_id: ShowId,
        seat_ids: &[SeatId],
        holder: &HolderToken,
    ) -> Result<Vec<SeatId>, LockError> {
        let requested: BTreeSet<SeatId> = seat_ids.iter().copied().collect();
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let mut gate = self.inventory.gate(show_id).await.map_err(lock_error)?;

        let missing = gate.missing(&requested);
        if !missing.is_empty() {
            return Err(LockError::SeatsNotFound(missing));
        }

        let now = self.clock.now();
        let mut to_release = Vec::new();
        let mut not_held = Vec::new();

        for seat_id in requested.iter().copied() {
            match gate.status(seat_id) {
                Some(SeatStatus::Available) => {}
                Some(SeatStatus::Held) => match gate.hold(seat_id) {
                    Some(hold) if hold.is_held_by(holder) && hold.is_live(now) => {
                        to_release.push(seat_id)
                    }
                    _ => not_held.push(seat_id),
                },
                _ => not_held.push(seat_id),
            }
        }

        if !not_held.is_empty() {
            debug!(
                "Release refused on show {} for {}: {:?}",
                show_id,
                Masked(holder),
                not_held
            );
            return Err(LockError::NotHeld(not_held));
        }

        let mut released = Vec::with_capacity(to_release.len());
        for seat_id in to_release {
            if gate.clear_hold(seat_id).is_ok() {
                released.push(seat_id);
            }
        }
        drop(gate);

        if released.is_empty() {
            debug!("Release on show {} was a no-op", show_id);
        } else {
            info!(
                "Released {} seats on show {} for {}",
                released.len(),
                show_id,
                Masked(holder)
            );
        }
        self.events
            .publish(show_id, released.clone(), SeatEventKind::Released, now.timestamp());

        Ok(released)
    }
}

fn lock_error(err: InventoryError) -> LockError {
    match err {
        InventoryError::SeatNotFound(_, seat_id) => LockError::SeatsNotFound(vec![seat_id]),
        InventoryError::ShowNotFound(show_id) | InventoryError::ShowAlreadyRegistered(show_id) => {
            LockError::ShowNotFound(show_id)
        }
        InventoryError::DuplicateSeat(_, seat_id)
        | InventoryError::InvalidTransition { seat_id, .. } => LockError::Conflict {
            rejected: vec![seat_id],
        },
    }
}
