// src/vast/player.rs

use serde::{Deserialize, Serialize};

use crate::vast::builder::VastEntry;

pub const VPAID_FLASH_LOADER: &str = "https://www.fluidplayer.com/vast/VPAIDFlash.swf";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutControls {
    pub primary_color: String,
    pub fill_to_container: bool,
    pub poster_image: String,
}

impl Default for LayoutControls {
    fn default() -> Self {
        Self {
            primary_color: "#3b82f6".to_string(),
            fill_to_container: true,
            poster_image: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VastOptions {
    pub ad_list: Vec<VastEntry>,
    pub autoplay: bool,
    pub play_ad_always: bool,
    pub vpaid_flash_loader_path: String,
    pub timeout: u64,
    pub max_allowed_vast_tag_redirects: u32,
    pub vast_load_timeout: u64,
}

impl VastOptions {
    pub fn new(ad_list: Vec<VastEntry>) -> Self {
        Self {
            ad_list,
            autoplay: false,
            play_ad_always: false,
            vpaid_flash_loader_path: VPAID_FLASH_LOADER.to_string(),
            timeout: 10_000,
            max_allowed_vast_tag_redirects: 5,
            vast_load_timeout: 8_000,
        }
    }
}

/// 视频播放器初始化参数；没有可用广告时不带 `vastOptions`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    pub layout_controls: LayoutControls,
    pub responsive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vast_options: Option<VastOptions>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            layout_controls: LayoutControls::default(),
            responsive: true,
            vast_options: None,
        }
    }
}

impl PlayerConfig {
    pub fn with_ad_schedule(ads: Vec<VastEntry>) -> Self {
        let vast_options = (!ads.is_empty()).then(|| VastOptions::new(ads));
        Self {
            vast_options,
            ..Self::default()
        }
    }

    pub fn has_ads(&self) -> bool {
        self.vast_options.is_some()
    }
}
