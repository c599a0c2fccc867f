pub mod inventory;
pub mod layout;

pub use inventory::{InventoryError, SeatInventory, ShowGate, ShowSeats};
pub use layout::{SeatLayout, SeatSpec, MAX_ROWS, MAX_SEATS_PER_ROW};
