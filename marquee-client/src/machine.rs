use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use marquee_shared::models::{SeatSelectionRequest, SeatView};
use marquee_shared::{BookingId, EnvelopeOutcome, FailureCode, FailureDetail, SeatId, ShowId};

use crate::gateway::{BookingGateway, GatewayError};

/// What this client knows about a seat beyond the last server snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSeatState {
    Selected,
    /// Part of a lock request that has not answered yet.
    Pending,
    Held { expires_at: DateTime<Utc> },
}

/// How a seat should be rendered: server truth with the local overlay on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatDisplay {
    Available,
    Selected,
    Pending,
    HeldByMe,
    /// Held by another customer.
    Locked,
    Booked,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatRow {
    pub row: String,
    pub seats: Vec<(SeatView, SeatDisplay)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingReceipt {
    pub booking_id: BookingId,
    pub total: i64,
    pub seat_labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    InFlight,
    Complete(BookingReceipt),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// Booked, disabled or held by someone else: nothing changed.
    Ignored,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No seats selected")]
    EmptySelection,

    #[error("A booking request is already in flight")]
    RequestInFlight,

    #[error("Booking already complete")]
    Completed,

    #[error("Seat {0} is not part of this show")]
    UnknownSeat(SeatId),

    #[error("Show {0} not found")]
    ShowNotFound(ShowId),

    #[error("Sign-in required")]
    Unauthorized,

    /// Another customer won these seats. The rest of the selection is kept.
    #[error("Seats no longer available: {}", labels.join(", "))]
    SeatsUnavailable {
        seat_ids: Vec<SeatId>,
        labels: Vec<String>,
    },

    /// The holds lapsed before confirmation. The selection is discarded.
    #[error("Your hold on {} expired", labels.join(", "))]
    HoldExpired {
        seat_ids: Vec<SeatId>,
        labels: Vec<String>,
    },

    #[error("{message}")]
    Rejected {
        code: Option<FailureCode>,
        message: String,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// One customer's seat-selection and checkout cycle for a single show.
///
/// Every mutating call takes `&mut self`, so a second lock or confirm cannot
/// start while one is outstanding. If a call is cancelled mid-flight the
/// session stays [`Phase::InFlight`] until [`ReservationSession::abandon`].
pub struct ReservationSession<G> {
    gateway: G,
    show_id: ShowId,
    price_per_seat: i64,
    board: BTreeMap<SeatId, SeatView>,
    overlay: BTreeMap<SeatId, LocalSeatState>,
    phase: Phase,
}

impl<G: BookingGateway> ReservationSession<G> {
    pub fn new(gateway: G, show_id: ShowId, price_per_seat: i64) -> Self {
        Self {
            gateway,
            show_id,
            price_per_seat,
            board: BTreeMap::new(),
            overlay: BTreeMap::new(),
            phase: Phase::Idle,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn show_id(&self) -> ShowId {
        self.show_id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn local_state(&self, seat_id: SeatId) -> Option<LocalSeatState> {
        self.overlay.get(&seat_id).copied()
    }

    /// Replace the seat map with a fresh server snapshot. Returns the seats
    /// dropped from the selection because they are no longer selectable.
    pub async fn load(&mut self) -> Result<Vec<SeatId>, SessionError> {
        let seats = self
            .gateway
            .fetch_seats(self.show_id)
            .await
            .map_err(|e| match e {
                GatewayError::ShowNotFound(id) => SessionError::ShowNotFound(id),
                other => SessionError::Gateway(other),
            })?;
        self.board = seats.into_iter().map(|seat| (seat.id, seat)).collect();

        let stale: Vec<SeatId> = self
            .overlay
            .iter()
            .filter(|(id, state)| {
                **state == LocalSeatState::Selected
                    && !self.board.get(id).is_some_and(SeatView::is_selectable)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            self.overlay.remove(id);
        }
        if !stale.is_empty() {
            debug!("Dropped {} stale seats from selection on show {}", stale.len(), self.show_id);
        }
        Ok(stale)
    }

    pub fn display(&self, seat_id: SeatId) -> Option<SeatDisplay> {
        let seat = self.board.get(&seat_id)?;
        Some(match self.overlay.get(&seat_id) {
            Some(LocalSeatState::Selected) => SeatDisplay::Selected,
            Some(LocalSeatState::Pending) => SeatDisplay::Pending,
            Some(LocalSeatState::Held { .. }) => SeatDisplay::HeldByMe,
            None if seat.is_disabled => SeatDisplay::Disabled,
            None if seat.is_booked => SeatDisplay::Booked,
            None if seat.is_locked => SeatDisplay::Locked,
            None => SeatDisplay::Available,
        })
    }

    /// Seats grouped by row label, rows and seats in ascending order.
    pub fn rows(&self) -> Vec<SeatRow> {
        let mut grouped: BTreeMap<&str, Vec<(SeatView, SeatDisplay)>> = BTreeMap::new();
        for seat in self.board.values() {
            let display = self.display(seat.id).unwrap_or(SeatDisplay::Available);
            grouped
                .entry(seat.row.as_str())
                .or_default()
                .push((seat.clone(), display));
        }
        grouped
            .into_iter()
            .map(|(row, mut seats)| {
                seats.sort_by_key(|(seat, _)| seat.number);
                SeatRow {
                    row: row.to_string(),
                    seats,
                }
            })
            .collect()
    }

    pub fn toggle(&mut self, seat_id: SeatId) -> Result<ToggleOutcome, SessionError> {
        self.ensure_idle()?;
        let seat = self
            .board
            .get(&seat_id)
            .ok_or(SessionError::UnknownSeat(seat_id))?;

        if self.overlay.remove(&seat_id).is_some() {
            return Ok(ToggleOutcome::Deselected);
        }
        if !seat.is_selectable() {
            return Ok(ToggleOutcome::Ignored);
        }
        self.overlay.insert(seat_id, LocalSeatState::Selected);
        Ok(ToggleOutcome::Selected)
    }

    pub fn selected_seat_ids(&self) -> Vec<SeatId> {
        self.overlay
            .iter()
            .filter(|(_, state)| **state == LocalSeatState::Selected)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Labels of the current selection in seat-map order, e.g. `["A1", "A2"]`.
    pub fn selected_labels(&self) -> Vec<String> {
        let mut seats: Vec<&SeatView> = self
            .selected_seat_ids()
            .iter()
            .filter_map(|id| self.board.get(id))
            .collect();
        seats.sort_by(|a, b| a.row.cmp(&b.row).then(a.number.cmp(&b.number)));
        seats.into_iter().map(SeatView::label).collect()
    }

    pub fn total_amount(&self) -> i64 {
        self.price_per_seat * self.selected_seat_ids().len() as i64
    }

    /// Lock the selection, then confirm it. Never retries: every failure
    /// leaves the session idle with a reconciled seat map.
    pub async fn confirm_booking(&mut self) -> Result<BookingReceipt, SessionError> {
        self.ensure_idle()?;
        let seat_ids = self.selected_seat_ids();
        if seat_ids.is_empty() {
            return Err(SessionError::EmptySelection);
        }
        let labels = self.labels_of(&seat_ids);
        let request = SeatSelectionRequest {
            show_id: self.show_id,
            seat_ids: seat_ids.clone(),
        };

        self.phase = Phase::InFlight;
        for id in &seat_ids {
            self.overlay.insert(*id, LocalSeatState::Pending);
        }

        let expires_at = match self.gateway.lock_seats(&request).await {
            Ok(EnvelopeOutcome::Success {
                data: Some(lock), ..
            }) => lock.expires_at_utc,
            Ok(EnvelopeOutcome::Success { data: None, .. }) => {
                let err = GatewayError::Decode("lock response carried no expiry".into());
                return Err(self.unreachable(err).await);
            }
            Ok(EnvelopeOutcome::Failure { message, detail }) => {
                return Err(self.lock_rejected(&seat_ids, message, detail).await);
            }
            Err(err) => return Err(self.unreachable(err).await),
        };
        for id in &seat_ids {
            self.overlay
                .insert(*id, LocalSeatState::Held { expires_at });
        }
        debug!("Holding {} seats on show {} until {}", seat_ids.len(), self.show_id, expires_at);

        match self.gateway.confirm_seats(&request).await {
            Ok(EnvelopeOutcome::Success {
                data: Some(confirmed),
                ..
            }) => {
                let receipt = BookingReceipt {
                    booking_id: confirmed.booking_id,
                    total: confirmed.total,
                    seat_labels: labels,
                };
                self.overlay.clear();
                self.phase = Phase::Complete(receipt.clone());
                info!("Booking {} complete for show {}", receipt.booking_id, self.show_id);
                self.refresh_quietly().await;
                Ok(receipt)
            }
            Ok(EnvelopeOutcome::Success { data: None, .. }) => {
                let err = GatewayError::Decode("confirm response carried no booking".into());
                Err(self.unreachable(err).await)
            }
            Ok(EnvelopeOutcome::Failure { message, detail }) => {
                Err(self.confirm_rejected(&seat_ids, message, detail).await)
            }
            Err(err) => Err(self.unreachable(err).await),
        }
    }

    /// Give up the current cycle: release whatever this client may still
    /// hold, clear the selection and re-read the seat map. Release failures
    /// are logged; the holds lapse on their own.
    pub async fn abandon(&mut self) -> Result<(), SessionError> {
        if matches!(self.phase, Phase::Complete(_)) {
            return Ok(());
        }
        let claimed: Vec<SeatId> = self
            .overlay
            .iter()
            .filter(|(_, state)| **state != LocalSeatState::Selected)
            .map(|(id, _)| *id)
            .collect();
        self.release_quietly(claimed).await;
        self.overlay.clear();
        self.phase = Phase::Idle;
        self.load().await.map(|_| ())
    }

    /// Start a new cycle after a completed booking.
    pub async fn restart(&mut self) -> Result<(), SessionError> {
        self.overlay.clear();
        self.phase = Phase::Idle;
        self.load().await.map(|_| ())
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::InFlight => Err(SessionError::RequestInFlight),
            Phase::Complete(_) => Err(SessionError::Completed),
        }
    }

    fn labels_of(&self, seat_ids: &[SeatId]) -> Vec<String> {
        seat_ids
            .iter()
            .map(|id| match self.board.get(id) {
                Some(seat) => seat.label(),
                None => id.to_string(),
            })
            .collect()
    }

    async fn lock_rejected(
        &mut self,
        requested: &[SeatId],
        message: Option<String>,
        detail: Option<FailureDetail>,
    ) -> SessionError {
        self.phase = Phase::Idle;
        let code = detail.as_ref().map(|d| d.code);
        let named: BTreeSet<SeatId> = detail
            .map(|d| d.seat_ids.into_iter().collect())
            .unwrap_or_default();

        for id in requested {
            self.overlay.insert(*id, LocalSeatState::Selected);
        }

        match code {
            Some(FailureCode::Conflict) | Some(FailureCode::NotFound) if !named.is_empty() => {
                for id in &named {
                    self.overlay.remove(id);
                }
                let mut lost = named;
                match self.load().await {
                    Ok(pruned) => lost.extend(pruned),
                    Err(e) => warn!("Seat map refresh failed after conflict: {}", e),
                }
                let seat_ids: Vec<SeatId> = lost.into_iter().collect();
                let labels = self.labels_of(&seat_ids);
                info!("Seats {:?} on show {} lost to another customer", labels, self.show_id);
                SessionError::SeatsUnavailable { seat_ids, labels }
            }
            Some(FailureCode::Conflict) => {
                // No seat list: find the losers by re-reading the map.
                match self.load().await {
                    Ok(pruned) => {
                        let labels = self.labels_of(&pruned);
                        SessionError::SeatsUnavailable {
                            seat_ids: pruned,
                            labels,
                        }
                    }
                    Err(e) => e,
                }
            }
            Some(FailureCode::NotFound) => {
                self.overlay.clear();
                SessionError::ShowNotFound(self.show_id)
            }
            Some(FailureCode::Unauthorized) => SessionError::Unauthorized,
            _ => SessionError::Rejected {
                code,
                message: message.unwrap_or_else(|| "Could not hold seats".to_string()),
            },
        }
    }

    async fn confirm_rejected(
        &mut self,
        requested: &[SeatId],
        message: Option<String>,
        detail: Option<FailureDetail>,
    ) -> SessionError {
        let code = detail.as_ref().map(|d| d.code);
        let named: BTreeSet<SeatId> = detail
            .map(|d| d.seat_ids.into_iter().collect())
            .unwrap_or_default();

        let err = match code {
            Some(FailureCode::HoldExpired) => {
                let seat_ids: Vec<SeatId> = if named.is_empty() {
                    requested.to_vec()
                } else {
                    named.into_iter().collect()
                };
                let labels = self.labels_of(&seat_ids);
                SessionError::HoldExpired { seat_ids, labels }
            }
            Some(FailureCode::RequestPending) => SessionError::Rejected {
                code,
                message: message.unwrap_or_else(|| "A confirmation is already pending".to_string()),
            },
            _ => {
                // Give back what is still ours; a seat named in the failure is
                // not, and would make the whole release fail.
                let still_ours: Vec<SeatId> = requested
                    .iter()
                    .filter(|id| !named.contains(id))
                    .copied()
                    .collect();
                self.release_quietly(still_ours).await;
                match code {
                    Some(FailureCode::Unauthorized) => SessionError::Unauthorized,
                    Some(FailureCode::NotFound) if named.is_empty() => {
                        SessionError::ShowNotFound(self.show_id)
                    }
                    _ => SessionError::Rejected {
                        code,
                        message: message.unwrap_or_else(|| "Booking failed".to_string()),
                    },
                }
            }
        };

        warn!("Confirmation on show {} rejected: {:?}", self.show_id, code);
        self.overlay.clear();
        self.phase = Phase::Idle;
        self.refresh_quietly().await;
        err
    }

    /// Outcome unknown: trust nothing local.
    async fn unreachable(&mut self, err: GatewayError) -> SessionError {
        warn!("Booking request for show {} failed in transit: {}", self.show_id, err);
        self.overlay.clear();
        self.phase = Phase::Idle;
        self.refresh_quietly().await;
        SessionError::Gateway(err)
    }

    async fn refresh_quietly(&mut self) {
        if let Err(e) = self.load().await {
            warn!("Seat map refresh for show {} failed: {}", self.show_id, e);
        }
    }

    async fn release_quietly(&self, seat_ids: Vec<SeatId>) {
        if seat_ids.is_empty() {
            return;
        }
        let request = SeatSelectionRequest {
            show_id: self.show_id,
            seat_ids,
        };
        match self.gateway.release_seats(&request).await {
            Ok(EnvelopeOutcome::Success { .. }) => {
                debug!("Released {} seats on show {}", request.seat_ids.len(), self.show_id);
            }
            Ok(EnvelopeOutcome::Failure { message, .. }) => {
                warn!("Release on show {} refused: {:?}", self.show_id, message);
            }
            Err(e) => warn!("Release on show {} failed: {}", self.show_id, e),
        }
    }
}
