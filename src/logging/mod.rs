// src/logging/mod.rs

pub mod delivery_log;
pub mod runtime_logger;
