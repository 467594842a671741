// src/config/engine_config.rs

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AdError;

static MOBILE_USER_AGENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini")
        .expect("mobile user agent pattern")
});

/// 视口宽度不超过该值时按移动端处理
const MOBILE_MAX_VIEWPORT: u32 = 768;

/// Device class of the page, computed once and threaded into every slot.
/// It only selects delay constants; it never changes a decision.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    #[default]
    Desktop,
    Mobile,
}

impl DeviceProfile {
    pub fn detect(user_agent: &str, viewport_width: u32) -> Self {
        if MOBILE_USER_AGENT.is_match(user_agent) || viewport_width <= MOBILE_MAX_VIEWPORT {
            DeviceProfile::Mobile
        } else {
            DeviceProfile::Desktop
        }
    }

    pub fn is_mobile(self) -> bool {
        self == DeviceProfile::Mobile
    }
}

/// 单个广告位的加载时序（毫秒）
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTimings {
    /// delay before injected content is moved into the slot
    pub move_delay_ms: u64,
    /// delay before the first load check
    pub check_delay_ms: u64,
    /// delay between validation re-checks when content is present but not meaningful
    pub revalidate_delay_ms: u64,
}

impl SlotTimings {
    pub fn retry_move_delay_ms(&self) -> u64 {
        self.move_delay_ms * 2
    }

    pub fn retry_check_delay_ms(&self) -> u64 {
        self.move_delay_ms * 3
    }
}

/// Engine-wide timing and retry configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub max_retries: u32,
    pub rotation_interval_ms: u64,
    pub desktop: SlotTimings,
    pub mobile: SlotTimings,
    /// delay after page init before the interstitial gate is evaluated
    pub gate_delay_ms: u64,
    /// longest the gate waits for a still-loading slot before declining
    pub gate_max_wait_ms: u64,
    /// delay between a positive gate decision and the overlay appearing
    pub interstitial_display_delay_ms: u64,
    pub probe_timeout_ms: u64,
    pub mid_roll_offset_seconds: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rotation_interval_ms: 5000,
            desktop: SlotTimings {
                move_delay_ms: 200,
                check_delay_ms: 3000,
                revalidate_delay_ms: 1000,
            },
            mobile: SlotTimings {
                move_delay_ms: 500,
                check_delay_ms: 4000,
                revalidate_delay_ms: 1000,
            },
            gate_delay_ms: 2000,
            gate_max_wait_ms: 10_000,
            interstitial_display_delay_ms: 3000,
            probe_timeout_ms: 5000,
            mid_roll_offset_seconds: 30,
        }
    }
}

impl EngineConfig {
    pub fn timings(&self, profile: DeviceProfile) -> &SlotTimings {
        match profile {
            DeviceProfile::Desktop => &self.desktop,
            DeviceProfile::Mobile => &self.mobile,
        }
    }

    /// 从 JSON 文件加载配置；未提供路径时使用默认值
    pub fn load(path: Option<&Path>) -> Result<Self, AdError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path).map_err(|source| AdError::SettingsFile {
            path: path.display().to_string(),
            source,
        })?;
        let config: EngineConfig =
            serde_json::from_str(&content).map_err(|e| AdError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AdError> {
        if self.max_retries == 0 {
            return Err(AdError::Config("max_retries must be at least 1".to_string()));
        }
        if self.rotation_interval_ms == 0 {
            return Err(AdError::Config("rotation_interval_ms must be positive".to_string()));
        }
        Ok(())
    }
}
