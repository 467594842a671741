pub mod adapters;
pub mod settings;
pub mod slot;
pub mod source;
