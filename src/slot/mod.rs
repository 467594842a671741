pub mod controller;
pub mod state;

pub use controller::{AdSlotController, SlotContext, SlotElements};
pub use state::{SlotState, SlotStatus};
