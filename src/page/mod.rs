// src/page/mod.rs

pub mod dom;
pub mod markup;
pub mod runtime;
pub mod script_host;
pub mod task;
pub mod timers;

#[cfg(test)]
pub(crate) mod testing;

pub use runtime::{AdPage, PageLayout};
