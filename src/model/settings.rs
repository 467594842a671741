// src/model/settings.rs

use serde::{Deserialize, Serialize};

use crate::error::AdError;
use crate::model::slot::SlotPosition;

/// `GET /api/settings/banner_ads` 的返回结构：每个广告位一段脚本
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BannerAdSettings {
    pub top: Option<String>,
    pub middle: Option<String>,
    pub bottom: Option<String>,
    pub header: Option<String>,
    pub sidebar: Option<String>,
    pub footer: Option<String>,
    pub interstitial: Option<String>,
}

impl BannerAdSettings {
    pub fn payload(&self, position: SlotPosition) -> Option<&str> {
        let value = match position {
            SlotPosition::Top => &self.top,
            SlotPosition::Middle => &self.middle,
            SlotPosition::Bottom => &self.bottom,
            SlotPosition::Header => &self.header,
            SlotPosition::Sidebar => &self.sidebar,
            SlotPosition::Footer => &self.footer,
            SlotPosition::Interstitial => &self.interstitial,
        };
        value.as_deref()
    }

    pub fn set_payload(&mut self, position: SlotPosition, payload: &str) {
        let slot = match position {
            SlotPosition::Top => &mut self.top,
            SlotPosition::Middle => &mut self.middle,
            SlotPosition::Bottom => &mut self.bottom,
            SlotPosition::Header => &mut self.header,
            SlotPosition::Sidebar => &mut self.sidebar,
            SlotPosition::Footer => &mut self.footer,
            SlotPosition::Interstitial => &mut self.interstitial,
        };
        *slot = Some(payload.to_string());
    }

    pub fn configured_positions(&self) -> Vec<SlotPosition> {
        SlotPosition::ALL
            .into_iter()
            .filter(|p| self.payload(*p).is_some_and(|s| !s.trim().is_empty()))
            .collect()
    }
}

/// `GET /api/settings/vast_ads` 的返回结构
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct VastSettings {
    pub pre_roll: Option<String>,
    pub mid_roll: Option<String>,
    pub post_roll: Option<String>,
    /// older documents stored a flat list of tags, all played as pre-roll
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vast_ads: Option<Vec<String>>,
}

/// Messages from the real-time settings channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettingsEvent {
    Ping,
    Pong,
    SettingsUpdate {
        #[serde(default)]
        section: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
}

impl SettingsEvent {
    pub fn parse(message: &str) -> Result<Self, AdError> {
        serde_json::from_str(message.trim()).map_err(|e| AdError::SettingsParse(e.to_string()))
    }

    /// Reads a recorded channel: one `<at_ms> <json message>` per line, blank
    /// lines and `#` comments skipped. Events come back ordered by time.
    pub fn parse_timeline(text: &str) -> Result<Vec<(u64, Self)>, AdError> {
        let mut events = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let invalid = |reason: String| AdError::SettingsParse(format!("event line {}: {}", number + 1, reason));
            let (at, message) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| invalid("expected `<at_ms> <message>`".to_string()))?;
            let at_ms = at.parse::<u64>().map_err(|e| invalid(format!("bad time `{}`: {}", at, e)))?;
            let event = Self::parse(message).map_err(|e| match e {
                AdError::SettingsParse(reason) => invalid(reason),
                other => other,
            })?;
            events.push((at_ms, event));
        }
        events.sort_by_key(|(at_ms, _)| *at_ms);
        Ok(events)
    }

    /// banner 广告变更（或未指明 section）时需要重建所有广告位
    pub fn requires_slot_rebuild(&self) -> bool {
        match self {
            SettingsEvent::SettingsUpdate { section, .. } => {
                section.as_deref().map_or(true, |s| s == "banner_ads")
            }
            _ => false,
        }
    }

    pub fn requires_vast_rebuild(&self) -> bool {
        match self {
            SettingsEvent::SettingsUpdate { section, .. } => {
                section.as_deref().map_or(true, |s| s == "vast_ads")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_settings_tolerate_missing_positions() {
        let settings: BannerAdSettings =
            serde_json::from_str(r#"{"top": "<div>ad</div>", "footer": ""}"#).unwrap();
        assert_eq!(settings.payload(SlotPosition::Top), Some("<div>ad</div>"));
        assert_eq!(settings.payload(SlotPosition::Sidebar), None);
        assert_eq!(settings.configured_positions(), vec![SlotPosition::Top]);
    }

    #[test]
    fn vast_settings_use_camel_case() {
        let settings: VastSettings = serde_json::from_str(
            r#"{"preRoll": "https://ads.example/pre.xml", "midRoll": "", "vastAds": ["a"]}"#,
        )
        .unwrap();
        assert_eq!(settings.pre_roll.as_deref(), Some("https://ads.example/pre.xml"));
        assert_eq!(settings.mid_roll.as_deref(), Some(""));
        assert_eq!(settings.post_roll, None);
        assert_eq!(settings.vast_ads, Some(vec!["a".to_string()]));
    }

    #[test]
    fn settings_events_select_rebuild_scope() {
        let banner = SettingsEvent::parse(
            r#"{"type":"settings_update","section":"banner_ads","timestamp":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(banner.requires_slot_rebuild());
        assert!(!banner.requires_vast_rebuild());

        let everything = SettingsEvent::parse(r#"{"type":"settings_update"}"#).unwrap();
        assert!(everything.requires_slot_rebuild());
        assert!(everything.requires_vast_rebuild());

        let titles =
            SettingsEvent::parse(r#"{"type":"settings_update","section":"page_titles"}"#).unwrap();
        assert!(!titles.requires_slot_rebuild());

        assert_eq!(SettingsEvent::parse(r#"{"type":"ping"}"#).ok(), Some(SettingsEvent::Ping));
        assert!(matches!(SettingsEvent::parse("not json"), Err(AdError::SettingsParse(_))));
    }

    #[test]
    fn recorded_events_are_read_in_time_order() {
        let text = r#"
# admin saved vast tags, then banners
9000 {"type":"settings_update","section":"banner_ads"}

4000 {"type":"settings_update","section":"vast_ads"}
6000 {"type":"ping"}
"#;
        let events = SettingsEvent::parse_timeline(text).unwrap();
        let times: Vec<u64> = events.iter().map(|(at, _)| *at).collect();
        assert_eq!(times, vec![4000, 6000, 9000]);
        assert!(events[0].1.requires_vast_rebuild());
        assert_eq!(events[1].1, SettingsEvent::Ping);
        assert!(events[2].1.requires_slot_rebuild());
    }

    #[test]
    fn malformed_event_lines_name_the_line() {
        let err = SettingsEvent::parse_timeline("100 {\"type\":\"ping\"}\nsoon {\"type\":\"ping\"}")
            .unwrap_err();
        assert!(err.to_string().contains("event line 2"));
        assert!(SettingsEvent::parse_timeline("500").is_err());
        assert!(SettingsEvent::parse_timeline("500 {\"type\":\"reload\"}").is_err());
    }
}
