// src/lib.rs

//! Banner slot delivery, validation and rotation for a streaming page, plus
//! the VAST schedule handed to its video player.

pub mod classifier;
pub mod config;
pub mod error;
pub mod interstitial;
pub mod logging;
pub mod mock_settings;
pub mod model;
pub mod page;
pub mod slot;
pub mod vast;

pub use error::AdError;
