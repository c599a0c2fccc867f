use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use marquee_core::{SeatId, SeatLabel};

/// One seat to register for a show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSpec {
    pub id: SeatId,
    pub label: SeatLabel,
    pub disabled: bool,
}

/// Largest row count a layout may declare.
pub const MAX_ROWS: u32 = 200;
/// Largest seats-per-row a layout may declare.
pub const MAX_SEATS_PER_ROW: u32 = 200;

/// Rectangular screen layout. Rows are labelled `A`..`Z`, then `AA`, `AB`...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatLayout {
    pub rows: u32,
    pub seats_per_row: u32,
    #[serde(default)]
    pub disabled: BTreeSet<SeatLabel>,
}

impl SeatLayout {
    pub fn new(rows: u32, seats_per_row: u32) -> Self {
        Self {
            rows,
            seats_per_row,
            disabled: BTreeSet::new(),
        }
    }

    pub fn with_disabled(mut self, label: SeatLabel) -> Self {
        self.disabled.insert(label);
        self
    }

    pub fn capacity(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.seats_per_row)
    }

    /// Whether the dimensions are within [`MAX_ROWS`] and
    /// [`MAX_SEATS_PER_ROW`]. `seats` assumes they are.
    pub fn is_within_bounds(&self) -> bool {
        self.rows <= MAX_ROWS && self.seats_per_row <= MAX_SEATS_PER_ROW
    }

    /// Seats numbered from 1 within each row; ids run from 1 in row-major
    /// order so id order matches display order.
    pub fn seats(&self) -> Vec<SeatSpec> {
        let mut seats = Vec::with_capacity(self.capacity() as usize);
        let mut next_id = 1u64;

        for row in 0..self.rows {
            let row_label = row_label(row);
            for number in 1..=self.seats_per_row {
                let label = SeatLabel::new(row_label.clone(), number);
                seats.push(SeatSpec {
                    id: SeatId(next_id),
                    disabled: self.disabled.contains(&label),
                    label,
                });
                next_id += 1;
            }
        }

        seats
    }
}

/// Spreadsheet-style row names: 0 -> A, 25 -> Z, 26 -> AA.
pub fn row_label(index: u32) -> String {
    let mut n = index + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        label.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_labels() {
        assert_eq!(row_label(0), "A");
        assert_eq!(row_label(25), "Z");
        assert_eq!(row_label(26), "AA");
        assert_eq!(row_label(27), "AB");
        assert_eq!(row_label(701), "ZZ");
        assert_eq!(row_label(702), "AAA");
    }

    #[test]
    fn test_layout_bounds() {
        assert!(SeatLayout::new(MAX_ROWS, MAX_SEATS_PER_ROW).is_within_bounds());
        assert!(!SeatLayout::new(MAX_ROWS + 1, 10).is_within_bounds());
        assert!(!SeatLayout::new(10, u32::MAX).is_within_bounds());
    }

    #[test]
    fn test_layout_generation() {
        let layout = SeatLayout::new(2, 3).with_disabled(SeatLabel::new("B", 2));
        let seats = layout.seats();

        assert_eq!(seats.len(), 6);
        assert_eq!(seats[0].id, SeatId(1));
        assert_eq!(seats[0].label.to_string(), "A1");
        assert_eq!(seats[5].label.to_string(), "B3");

        let disabled: Vec<String> = seats
            .iter()
            .filter(|s| s.disabled)
            .map(|s| s.label.to_string())
            .collect();
        assert_eq!(disabled, vec!["B2"]);
    }
}
