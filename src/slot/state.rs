// src/slot/state.rs

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    #[default]
    Idle,
    Loading,
    Validating,
    Loaded,
    Fallback,
}

impl SlotStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SlotStatus::Loaded | SlotStatus::Fallback)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotStatus::Idle => "idle",
            SlotStatus::Loading => "loading",
            SlotStatus::Validating => "validating",
            SlotStatus::Loaded => "loaded",
            SlotStatus::Fallback => "fallback",
        }
    }
}

/// Per-slot mutable state, owned by exactly one controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotState {
    pub current_index: usize,
    pub retry_count: u32,
    pub status: SlotStatus,
}
