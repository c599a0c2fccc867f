use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use marquee_shared::ids::{SeatId, ShowId};
use marquee_shared::models::SeatView;

/// Authoritative status of a seat for one show.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Held,
    Booked,
    /// Never selectable, never transitions.
    Disabled,
}

/// Human label of a seat: row letters plus number, e.g. `B12`.
///
/// Ordering is row first (lexicographic), then number (numeric), which is
/// the order seats are displayed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatLabel {
    pub row: String,
    pub number: u32,
}

impl SeatLabel {
    pub fn new(row: impl Into<String>, number: u32) -> Self {
        Self {
            row: row.into(),
            number,
        }
    }
}

impl Ord for SeatLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.number.cmp(&other.number))
    }
}

impl PartialOrd for SeatLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub show_id: ShowId,
    pub id: SeatId,
    pub label: SeatLabel,
    pub status: SeatStatus,
}

impl Seat {
    pub fn view(&self) -> SeatView {
        SeatView {
            id: self.id,
            row: self.label.row.clone(),
            number: self.label.number,
            is_disabled: self.status == SeatStatus::Disabled,
            is_booked: self.status == SeatStatus::Booked,
            is_locked: self.status == SeatStatus::Held,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_ordering_is_row_then_number() {
        let mut labels = vec![
            SeatLabel::new("B", 2),
            SeatLabel::new("A", 10),
            SeatLabel::new("A", 2),
            SeatLabel::new("B", 1),
        ];
        labels.sort();
        let rendered: Vec<String> = labels.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["A2", "A10", "B1", "B2"]);
    }

    #[test]
    fn test_view_flags_follow_status() {
        let seat = Seat {
            show_id: ShowId(1),
            id: SeatId(3),
            label: SeatLabel::new("C", 4),
            status: SeatStatus::Held,
        };
        let view = seat.view();
        assert!(view.is_locked);
        assert!(!view.is_booked);
        assert!(!view.is_selectable());
        assert_eq!(view.label(), "C4");
    }
}
