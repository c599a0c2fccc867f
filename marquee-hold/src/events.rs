use tokio::sync::broadcast;
use tracing::debug;

use marquee_core::{SeatId, ShowId};
use marquee_shared::models::{SeatEvent, SeatEventKind};

/// Fan-out of committed seat transitions. Subscribers that fall behind
/// miss events; nothing here is used for mutation decisions.
#[derive(Clone)]
pub struct HoldEvents {
    tx: broadcast::Sender<SeatEvent>,
}

impl HoldEvents {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SeatEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, show_id: ShowId, seat_ids: Vec<SeatId>, kind: SeatEventKind, at: i64) {
        if seat_ids.is_empty() {
            return;
        }
        let event = SeatEvent {
            show_id,
            seat_ids,
            kind,
            at,
        };
        if self.tx.send(event).is_err() {
            debug!("No seat event subscribers for show {}", show_id);
        }
    }
}

impl Default for HoldEvents {
    fn default() -> Self {
        Self::new(256)
    }
}
