// src/vast/mod.rs

//! Video ad schedule: probed VAST tags and the player options built from them.

pub mod builder;
pub mod player;
pub mod probe;

pub use builder::{Roll, VastEntry, VastScheduleBuilder};
pub use player::{PlayerConfig, VastOptions};
pub use probe::{HttpProbe, ProbeOutcome, ReachabilityProbe};
