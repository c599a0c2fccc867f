pub mod coordinator;
pub mod events;
pub mod expiry;

pub use coordinator::{Grant, HoldPolicy, LockCoordinator};
pub use events::HoldEvents;
pub use expiry::{ExpirySweeper, SweepReport};
