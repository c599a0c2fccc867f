use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::info;

use marquee_core::{Hold, Seat, SeatId, SeatLabel, SeatStatus, ShowId};

use crate::layout::SeatSpec;

/// The status of a slot together with whatever backs it, so a `Held` seat
/// cannot exist without its hold. The booking itself lives in the ledger.
#[derive(Debug, Clone)]
enum SlotState {
    Available,
    Held(Hold),
    Booked,
    Disabled,
}

#[derive(Debug, Clone)]
struct SeatSlot {
    label: SeatLabel,
    state: SlotState,
}

impl SeatSlot {
    fn status(&self) -> SeatStatus {
        match self.state {
            SlotState::Available => SeatStatus::Available,
            SlotState::Held(_) => SeatStatus::Held,
            SlotState::Booked => SeatStatus::Booked,
            SlotState::Disabled => SeatStatus::Disabled,
        }
    }
}

/// Arena of one show's seats, indexed by seat id.
///
/// Reachable mutably only through a [`ShowGate`], so every transition of a
/// show's seats is serialized. Each mutating method is exactly one edge of
/// the seat state machine:
///
/// - `place_hold`: Available -> Held
/// - `clear_hold`: Held -> Available
/// - `promote_hold`: Held -> Booked
#[derive(Debug)]
pub struct ShowSeats {
    show_id: ShowId,
    slots: BTreeMap<SeatId, SeatSlot>,
}

impl ShowSeats {
    pub fn show_id(&self) -> ShowId {
        self.show_id
    }

    pub fn contains(&self, seat_id: SeatId) -> bool {
        self.slots.contains_key(&seat_id)
    }

    pub fn status(&self, seat_id: SeatId) -> Option<SeatStatus> {
        self.slots.get(&seat_id).map(SeatSlot::status)
    }

    pub fn label(&self, seat_id: SeatId) -> Option<&SeatLabel> {
        self.slots.get(&seat_id).map(|slot| &slot.label)
    }

    pub fn hold(&self, seat_id: SeatId) -> Option<&Hold> {
        match self.slots.get(&seat_id).map(|slot| &slot.state) {
            Some(SlotState::Held(hold)) => Some(hold),
            _ => None,
        }
    }

    /// Ids from `seat_ids` that do not belong to this show, in ascending order.
    pub fn missing<'a>(&self, seat_ids: impl IntoIterator<Item = &'a SeatId>) -> Vec<SeatId> {
        let mut missing: Vec<SeatId> = seat_ids
            .into_iter()
            .filter(|id| !self.slots.contains_key(id))
            .copied()
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// All seats grouped by row (lexicographic) then by number.
    pub fn seats(&self) -> Vec<Seat> {
        let mut seats: Vec<Seat> = self
            .slots
            .iter()
            .map(|(id, slot)| Seat {
                show_id: self.show_id,
                id: *id,
                label: slot.label.clone(),
                status: slot.status(),
            })
            .collect();
        seats.sort_by(|a, b| a.label.cmp(&b.label));
        seats
    }

    pub fn holds(&self) -> impl Iterator<Item = &Hold> {
        self.slots.values().filter_map(|slot| match &slot.state {
            SlotState::Held(hold) => Some(hold),
            _ => None,
        })
    }

    /// Seats whose hold deadline is at or before `now`, ascending.
    pub fn expired_holds(&self, now: DateTime<Utc>) -> Vec<SeatId> {
        self.holds()
            .filter(|hold| !hold.is_live(now))
            .map(|hold| hold.seat_id)
            .collect()
    }

    pub fn place_hold(&mut self, hold: Hold) -> Result<(), InventoryError> {
        let seat_id = hold.seat_id;
        let slot = self.slot_mut(seat_id)?;
        match slot.state {
            SlotState::Available => {
                slot.state = SlotState::Held(hold);
                Ok(())
            }
            _ => Err(InventoryError::InvalidTransition {
                seat_id,
                from: slot.status(),
                to: SeatStatus::Held,
            }),
        }
    }

    /// Drops the hold and makes the seat Available again; returns the hold.
    pub fn clear_hold(&mut self, seat_id: SeatId) -> Result<Hold, InventoryError> {
        let slot = self.slot_mut(seat_id)?;
        match std::mem::replace(&mut slot.state, SlotState::Available) {
            SlotState::Held(hold) => Ok(hold),
            other => {
                slot.state = other;
                Err(InventoryError::InvalidTransition {
                    seat_id,
                    from: slot.status(),
                    to: SeatStatus::Available,
                })
            }
        }
    }

    /// Converts the hold into a permanent booking; returns the consumed hold.
    pub fn promote_hold(&mut self, seat_id: SeatId) -> Result<Hold, InventoryError> {
        let slot = self.slot_mut(seat_id)?;
        match std::mem::replace(&mut slot.state, SlotState::Booked) {
            SlotState::Held(hold) => Ok(hold),
            other => {
                slot.state = other;
                Err(InventoryError::InvalidTransition {
                    seat_id,
                    from: slot.status(),
                    to: SeatStatus::Booked,
                })
            }
        }
    }

    fn slot_mut(&mut self, seat_id: SeatId) -> Result<&mut SeatSlot, InventoryError> {
        self.slots
            .get_mut(&seat_id)
            .ok_or(InventoryError::SeatNotFound(self.show_id, seat_id))
    }
}

/// Exclusive access to one show's seats. Held for the duration of a single
/// acquire, release, confirm or sweep step; never across an await on
/// anything but the booking ledger.
pub type ShowGate = OwnedMutexGuard<ShowSeats>;

/// Per-show seat inventory: the single source of truth for seat status.
///
/// Reads take the show's gate briefly and return a consistent snapshot.
/// Mutation goes through [`SeatInventory::gate`] and the transition methods
/// of [`ShowSeats`].
#[derive(Debug, Default)]
pub struct SeatInventory {
    shows: RwLock<HashMap<ShowId, Arc<Mutex<ShowSeats>>>>,
}

impl SeatInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the seat arena for a show. Seats start Available, or Disabled
    /// when marked so in the layout.
    pub async fn register_show(
        &self,
        show_id: ShowId,
        seats: Vec<SeatSpec>,
    ) -> Result<usize, InventoryError> {
        let mut slots = BTreeMap::new();
        for spec in seats {
            let state = if spec.disabled {
                SlotState::Disabled
            } else {
                SlotState::Available
            };
            if slots
                .insert(spec.id, SeatSlot { label: spec.label, state })
                .is_some()
            {
                return Err(InventoryError::DuplicateSeat(show_id, spec.id));
            }
        }

        let count = slots.len();
        let mut shows = self.shows.write().await;
        if shows.contains_key(&show_id) {
            return Err(InventoryError::ShowAlreadyRegistered(show_id));
        }
        shows.insert(show_id, Arc::new(Mutex::new(ShowSeats { show_id, slots })));

        info!("Registered show {} with {} seats", show_id, count);
        Ok(count)
    }

    pub async fn show_ids(&self) -> Vec<ShowId> {
        let mut ids: Vec<ShowId> = self.shows.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn get_seats(&self, show_id: ShowId) -> Result<Vec<Seat>, InventoryError> {
        let gate = self.gate(show_id).await?;
        Ok(gate.seats())
    }

    pub async fn status_of(
        &self,
        show_id: ShowId,
        seat_id: SeatId,
    ) -> Result<SeatStatus, InventoryError> {
        let gate = self.gate(show_id).await?;
        gate.status(seat_id)
            .ok_or(InventoryError::SeatNotFound(show_id, seat_id))
    }

    pub async fn hold_of(
        &self,
        show_id: ShowId,
        seat_id: SeatId,
    ) -> Result<Option<Hold>, InventoryError> {
        let gate = self.gate(show_id).await?;
        if !gate.contains(seat_id) {
            return Err(InventoryError::SeatNotFound(show_id, seat_id));
        }
        Ok(gate.hold(seat_id).cloned())
    }

    /// Take the show's mutation gate.
    pub async fn gate(&self, show_id: ShowId) -> Result<ShowGate, InventoryError> {
        let seats = {
            let shows = self.shows.read().await;
            shows
                .get(&show_id)
                .cloned()
                .ok_or(InventoryError::ShowNotFound(show_id))?
        };
        Ok(seats.lock_owned().await)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("Show not found: {0}")]
    ShowNotFound(ShowId),

    #[error("Show {0} already has a seat inventory")]
    ShowAlreadyRegistered(ShowId),

    #[error("Seat {1} listed twice for show {0}")]
    DuplicateSeat(ShowId, SeatId),

    #[error("Seat {1} not found in show {0}")]
    SeatNotFound(ShowId, SeatId),

    #[error("Seat {seat_id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        seat_id: SeatId,
        from: SeatStatus,
        to: SeatStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SeatLayout;
    use chrono::Duration;
    use marquee_core::HolderToken;

    fn hold(seat: u64, holder: &str, now: DateTime<Utc>) -> Hold {
        Hold {
            seat_id: SeatId(seat),
            holder: HolderToken::new(holder),
            acquired_at: now,
            expires_at: now + Duration::seconds(120),
        }
    }

    async fn inventory() -> SeatInventory {
        let inventory = SeatInventory::new();
        let layout = SeatLayout::new(2, 2).with_disabled(SeatLabel::new("B", 2));
        inventory
            .register_show(ShowId(1), layout.seats())
            .await
            .unwrap();
        inventory
    }

    #[tokio::test]
    async fn test_seats_grouped_by_row_and_number() {
        let inventory = SeatInventory::new();
        inventory
            .register_show(
                ShowId(9),
                vec![
                    SeatSpec { id: SeatId(1), label: SeatLabel::new("B", 10), disabled: false },
                    SeatSpec { id: SeatId(2), label: SeatLabel::new("A", 2), disabled: false },
                    SeatSpec { id: SeatId(3), label: SeatLabel::new("B", 9), disabled: false },
                    SeatSpec { id: SeatId(4), label: SeatLabel::new("A", 1), disabled: false },
                ],
            )
            .await
            .unwrap();

        let labels: Vec<String> = inventory
            .get_seats(ShowId(9))
            .await
            .unwrap()
            .iter()
            .map(|s| s.label.to_string())
            .collect();
        assert_eq!(labels, vec!["A1", "A2", "B9", "B10"]);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let inventory = inventory().await;
        let err = inventory
            .register_show(ShowId(1), SeatLayout::new(1, 1).seats())
            .await
            .unwrap_err();
        assert_eq!(err, InventoryError::ShowAlreadyRegistered(ShowId(1)));

        let spec = SeatSpec { id: SeatId(1), label: SeatLabel::new("A", 1), disabled: false };
        let err = inventory
            .register_show(ShowId(2), vec![spec.clone(), spec])
            .await
            .unwrap_err();
        assert_eq!(err, InventoryError::DuplicateSeat(ShowId(2), SeatId(1)));
    }

    #[tokio::test]
    async fn test_hold_lifecycle_keeps_status_and_hold_consistent() {
        let inventory = inventory().await;
        let now = Utc::now();

        {
            let mut gate = inventory.gate(ShowId(1)).await.unwrap();
            gate.place_hold(hold(1, "x", now)).unwrap();
        }
        assert_eq!(inventory.status_of(ShowId(1), SeatId(1)).await.unwrap(), SeatStatus::Held);
        assert!(inventory.hold_of(ShowId(1), SeatId(1)).await.unwrap().is_some());

        {
            let mut gate = inventory.gate(ShowId(1)).await.unwrap();
            let released = gate.clear_hold(SeatId(1)).unwrap();
            assert_eq!(released.holder, HolderToken::new("x"));
        }
        assert_eq!(
            inventory.status_of(ShowId(1), SeatId(1)).await.unwrap(),
            SeatStatus::Available
        );
        assert!(inventory.hold_of(ShowId(1), SeatId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_transitions_leave_seat_untouched() {
        let inventory = inventory().await;
        let now = Utc::now();
        let mut gate = inventory.gate(ShowId(1)).await.unwrap();

        // Disabled seat B2 has id 4.
        let err = gate.place_hold(hold(4, "x", now)).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidTransition { from: SeatStatus::Disabled, .. }));
        assert_eq!(gate.status(SeatId(4)), Some(SeatStatus::Disabled));

        assert!(gate.clear_hold(SeatId(1)).is_err());
        assert_eq!(gate.status(SeatId(1)), Some(SeatStatus::Available));

        gate.place_hold(hold(1, "x", now)).unwrap();
        assert!(gate.place_hold(hold(1, "y", now)).is_err());

        gate.promote_hold(SeatId(1)).unwrap();
        assert_eq!(gate.status(SeatId(1)), Some(SeatStatus::Booked));
        assert!(gate.hold(SeatId(1)).is_none());

        assert!(gate.clear_hold(SeatId(1)).is_err());
        assert_eq!(gate.status(SeatId(1)), Some(SeatStatus::Booked));
    }

    #[tokio::test]
    async fn test_expired_holds_and_missing_seats() {
        let inventory = inventory().await;
        let now = Utc::now();
        let mut gate = inventory.gate(ShowId(1)).await.unwrap();
        gate.place_hold(hold(1, "x", now)).unwrap();
        gate.place_hold(hold(2, "y", now + Duration::seconds(60))).unwrap();

        assert!(gate.expired_holds(now + Duration::seconds(119)).is_empty());
        assert_eq!(gate.expired_holds(now + Duration::seconds(120)), vec![SeatId(1)]);
        assert_eq!(
            gate.expired_holds(now + Duration::seconds(500)),
            vec![SeatId(1), SeatId(2)]
        );

        assert_eq!(
            gate.missing(&[SeatId(77), SeatId(1), SeatId(77)]),
            vec![SeatId(77)]
        );
    }

    #[tokio::test]
    async fn test_unknown_show() {
        let inventory = SeatInventory::new();
        assert_eq!(
            inventory.get_seats(ShowId(5)).await.unwrap_err(),
            InventoryError::ShowNotFound(ShowId(5))
        );
    }
}
