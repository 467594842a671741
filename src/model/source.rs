// src/model/source.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::settings::BannerAdSettings;
use crate::model::slot::{AdCreative, SlotPosition};

/// Script names shipped in the default creatives of the positions that have
/// no real ad network configured. A payload carrying one of them is inert.
pub const PLACEHOLDER_MARKERS: [&str; 4] = [
    "header-ad-script",
    "sidebar-ad-script",
    "footer-ad-script",
    "interstitial-ad-script",
];

/// 判断创意脚本是否为空或仅为占位脚本
pub fn is_placeholder_payload(payload: &str) -> bool {
    payload.trim().is_empty() || PLACEHOLDER_MARKERS.iter().any(|m| payload.contains(m))
}

impl AdCreative {
    pub fn is_deliverable(&self) -> bool {
        !is_placeholder_payload(&self.payload)
    }
}

/// Ordered creative lists per slot position, populated once per page load.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotAdSource {
    slots: BTreeMap<SlotPosition, Vec<AdCreative>>,
}

impl SlotAdSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每个广告位一个创意，ID 形如 `top-1`；空字符串也保留（广告位将保持 Idle）
    pub fn from_banner_settings(settings: &BannerAdSettings) -> Self {
        let mut source = Self::new();
        for position in SlotPosition::ALL {
            let payload = settings.payload(position).unwrap_or_default();
            source.push(position, default_creative(position, payload));
        }
        source
    }

    /// Creatives used when the settings collaborator is unreachable: the
    /// placeholder-script positions keep their inert script, the rest are empty.
    pub fn placeholders() -> Self {
        let mut source = Self::new();
        for position in SlotPosition::ALL {
            let payload = match position {
                SlotPosition::Header
                | SlotPosition::Sidebar
                | SlotPosition::Footer
                | SlotPosition::Interstitial => placeholder_script(position),
                _ => String::new(),
            };
            source.push(position, default_creative(position, &payload));
        }
        source
    }

    pub fn with_creatives(mut self, position: SlotPosition, creatives: Vec<AdCreative>) -> Self {
        self.slots.insert(position, creatives);
        self
    }

    pub fn push(&mut self, position: SlotPosition, creative: AdCreative) {
        self.slots.entry(position).or_default().push(creative);
    }

    pub fn creatives(&self, position: SlotPosition) -> &[AdCreative] {
        self.slots.get(&position).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn deliverable_positions(&self) -> Vec<SlotPosition> {
        self.slots
            .iter()
            .filter(|(_, creatives)| creatives.iter().any(AdCreative::is_deliverable))
            .map(|(position, _)| *position)
            .collect()
    }
}

fn default_creative(position: SlotPosition, payload: &str) -> AdCreative {
    let creative = AdCreative::new(&format!("{}-1", position), payload);
    if position == SlotPosition::Interstitial {
        creative.with_size("100%", "100%")
    } else {
        creative
    }
}

fn placeholder_script(position: SlotPosition) -> String {
    format!(
        "<script>(function(s){{var d=document,e=d.createElement('script');e.src=\"//ads.invalid/{}-ad-script\";e.async=true;d.body.appendChild(e);}})({{}})</script>",
        position
    )
}
