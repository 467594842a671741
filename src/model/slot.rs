// src/model/slot.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AdError;

/// 页面上的广告位
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SlotPosition {
    Top,
    Middle,
    Bottom,
    Header,
    Sidebar,
    Footer,
    Interstitial,
}

impl SlotPosition {
    pub const ALL: [SlotPosition; 7] = [
        SlotPosition::Top,
        SlotPosition::Middle,
        SlotPosition::Bottom,
        SlotPosition::Header,
        SlotPosition::Sidebar,
        SlotPosition::Footer,
        SlotPosition::Interstitial,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SlotPosition::Top => "top",
            SlotPosition::Middle => "middle",
            SlotPosition::Bottom => "bottom",
            SlotPosition::Header => "header",
            SlotPosition::Sidebar => "sidebar",
            SlotPosition::Footer => "footer",
            SlotPosition::Interstitial => "interstitial",
        }
    }
}

impl fmt::Display for SlotPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotPosition {
    type Err = AdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SlotPosition::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| AdError::UnknownPosition(value.to_string()))
    }
}

/// 单个广告创意（脚本或 HTML 片段），加载后不可变
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AdCreative {
    pub id: String,
    pub payload: String,
    pub width: String,
    pub height: String,
}

impl AdCreative {
    pub fn new(id: &str, payload: &str) -> Self {
        Self {
            id: id.to_string(),
            payload: payload.to_string(),
            width: "100%".to_string(),
            height: "auto".to_string(),
        }
    }

    pub fn with_size(mut self, width: &str, height: &str) -> Self {
        self.width = width.to_string();
        self.height = height.to_string();
        self
    }
}
