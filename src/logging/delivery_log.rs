// src/logging/delivery_log.rs

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::model::slot::SlotPosition;
use crate::slot::{AdSlotController, SlotStatus};
use crate::vast::ProbeOutcome;

/// **广告位投放日志**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SlotDeliveryLog {
    pub position: SlotPosition,
    pub status: SlotStatus,
    pub creative_id: Option<String>, // 当前展示的创意
    pub creative_count: usize,
    pub retry_count: u32,
    pub checks_run: u32,
}

impl SlotDeliveryLog {
    pub fn from_controller(controller: &AdSlotController) -> Self {
        Self {
            position: controller.position(),
            status: controller.status(),
            creative_id: controller.current_creative().map(|c| c.id.clone()),
            creative_count: controller.creatives().len(),
            retry_count: controller.retry_count(),
            checks_run: controller.checks_run(),
        }
    }
}

/// **VAST 标签探测日志**
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VastProbeLog {
    pub roll: String,
    pub tag: String,
    pub reachable: bool,
    pub http_status: Option<u16>,
    pub error: Option<String>, // 失败原因，如 "timeout"、"HTTP 404"
    pub elapsed_ms: u128,
}

impl VastProbeLog {
    pub fn new(roll: &str, tag: &str, outcome: &ProbeOutcome) -> Self {
        Self {
            roll: roll.to_string(),
            tag: tag.to_string(),
            reachable: outcome.ok,
            http_status: outcome.status,
            error: outcome.error.clone(),
            elapsed_ms: outcome.elapsed_ms,
        }
    }
}

/// **页面会话日志**：一次页面运行的汇总
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionLog {
    pub timestamp: String,
    pub log_type: String,
    pub session_id: String,
    pub device: String,
    pub settings_source: String,
    pub duration_ms: u64,
    pub slots: Vec<SlotDeliveryLog>,
    pub vast_probes: Vec<VastProbeLog>,
    pub vast_ads_kept: usize,
    pub interstitial: Option<String>,
}

impl SessionLog {
    pub fn new(session_id: &str, device: &str, settings_source: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            log_type: "ad_page_session".to_string(),
            session_id: session_id.to_string(),
            device: device.to_string(),
            settings_source: settings_source.to_string(),
            duration_ms: 0,
            slots: Vec::new(),
            vast_probes: Vec::new(),
            vast_ads_kept: 0,
            interstitial: None,
        }
    }

    pub fn add_slot(&mut self, controller: &AdSlotController) {
        self.slots.push(SlotDeliveryLog::from_controller(controller));
    }

    pub fn add_probe(&mut self, probe: VastProbeLog) {
        if probe.reachable {
            self.vast_ads_kept += 1;
        }
        self.vast_probes.push(probe);
    }

    /// Slots by terminal outcome: (loaded, fallback, idle).
    pub fn outcome_counts(&self) -> (usize, usize, usize) {
        self.slots.iter().fold((0, 0, 0), |(l, f, i), s| match s.status {
            SlotStatus::Loaded => (l + 1, f, i),
            SlotStatus::Fallback => (l, f + 1, i),
            SlotStatus::Idle => (l, f, i + 1),
            _ => (l, f, i),
        })
    }
}
