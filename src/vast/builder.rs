// src/vast/builder.rs

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::logging::delivery_log::VastProbeLog;
use crate::model::settings::VastSettings;
use crate::vast::probe::ReachabilityProbe;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Roll {
    PreRoll,
    MidRoll,
    PostRoll,
}

impl Roll {
    pub fn as_str(self) -> &'static str {
        match self {
            Roll::PreRoll => "preRoll",
            Roll::MidRoll => "midRoll",
            Roll::PostRoll => "postRoll",
        }
    }
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the player's `adList`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VastEntry {
    pub roll: Roll,
    #[serde(rename = "vastTag")]
    pub tag: String,
    /// seconds into the video, mid-roll only
    #[serde(rename = "timer", skip_serializing_if = "Option::is_none")]
    pub mid_roll_offset_seconds: Option<u32>,
}

/// 将 VAST 设置转换为经过探测的播放器广告列表
pub struct VastScheduleBuilder {
    probe: Arc<dyn ReachabilityProbe>,
    mid_roll_offset_seconds: u32,
}

impl VastScheduleBuilder {
    pub fn new(probe: Arc<dyn ReachabilityProbe>, mid_roll_offset_seconds: u32) -> Self {
        Self {
            probe,
            mid_roll_offset_seconds,
        }
    }

    /// Entries before probing, in preRoll, midRoll, postRoll order. Without
    /// any roll tag, the legacy `vastAds` list is played as pre-roll.
    pub fn candidates(&self, settings: &VastSettings) -> Vec<VastEntry> {
        let mut entries = Vec::new();
        let rolls = [
            (Roll::PreRoll, &settings.pre_roll),
            (Roll::MidRoll, &settings.mid_roll),
            (Roll::PostRoll, &settings.post_roll),
        ];
        for (roll, tag) in rolls {
            let Some(tag) = tag.as_deref().filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            entries.push(VastEntry {
                roll,
                tag: tag.to_string(),
                mid_roll_offset_seconds: (roll == Roll::MidRoll).then_some(self.mid_roll_offset_seconds),
            });
        }

        if entries.is_empty() {
            if let Some(legacy) = &settings.vast_ads {
                entries.extend(legacy.iter().filter(|t| !t.trim().is_empty()).map(|tag| VastEntry {
                    roll: Roll::PreRoll,
                    tag: tag.clone(),
                    mid_roll_offset_seconds: None,
                }));
            }
        }
        entries
    }

    pub async fn build(&self, settings: &VastSettings) -> Vec<VastEntry> {
        self.build_logged(settings).await.0
    }

    /// Probes every candidate concurrently and keeps the reachable ones in
    /// their original order, together with one log record per probe.
    pub async fn build_logged(&self, settings: &VastSettings) -> (Vec<VastEntry>, Vec<VastProbeLog>) {
        let candidates = self.candidates(settings);
        let probes = candidates.iter().map(|entry| self.probe.probe(&entry.tag));
        let outcomes = join_all(probes).await;

        let mut kept = Vec::new();
        let mut logs = Vec::with_capacity(candidates.len());
        for (entry, outcome) in candidates.into_iter().zip(outcomes) {
            logs.push(VastProbeLog::new(entry.roll.as_str(), &entry.tag, &outcome));
            if outcome.ok {
                info!(roll = %entry.roll, tag = %entry.tag, status = ?outcome.status, "vast tag reachable");
                kept.push(entry);
            } else {
                warn!(
                    roll = %entry.roll,
                    tag = %entry.tag,
                    status = ?outcome.status,
                    reason = outcome.error.as_deref().unwrap_or("unknown"),
                    "vast tag dropped"
                );
            }
        }
        if kept.is_empty() {
            info!("no reachable vast tags, player starts without ads");
        }
        (kept, logs)
    }
}
