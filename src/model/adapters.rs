// src/model/adapters.rs

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::fs;

use crate::error::AdError;
use crate::model::settings::{BannerAdSettings, VastSettings};

/// Read-only access to the settings collaborator.
#[async_trait]
pub trait SettingsAdapter: Send + Sync {
    async fn banner_ads(&self) -> Result<BannerAdSettings, AdError>;
    async fn vast_ads(&self) -> Result<VastSettings, AdError>;
}

/// 从本地 JSON 文件读取配置（`banner_ads.json` / `vast_ads.json`）
pub struct FileSettingsAdapter {
    pub banner_file: PathBuf,
    pub vast_file: PathBuf,
}

impl FileSettingsAdapter {
    pub fn new(banner_file: &Path, vast_file: &Path) -> Self {
        Self {
            banner_file: banner_file.to_path_buf(),
            vast_file: vast_file.to_path_buf(),
        }
    }

    pub fn from_dir(dir: &Path) -> Self {
        Self::new(&dir.join("banner_ads.json"), &dir.join("vast_ads.json"))
    }
}

async fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, AdError> {
    let mut bytes = fs::read(path).await.map_err(|source| AdError::SettingsFile {
        path: path.display().to_string(),
        source,
    })?;
    simd_json::serde::from_slice(&mut bytes).map_err(|e| AdError::SettingsParse(e.to_string()))
}

#[async_trait]
impl SettingsAdapter for FileSettingsAdapter {
    async fn banner_ads(&self) -> Result<BannerAdSettings, AdError> {
        read_json_file(&self.banner_file).await
    }

    async fn vast_ads(&self) -> Result<VastSettings, AdError> {
        read_json_file(&self.vast_file).await
    }
}

/// Fetches settings from the admin API of the streaming site.
pub struct HttpSettingsAdapter {
    client: Client,
    base_url: String,
}

impl HttpSettingsAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AdError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl SettingsAdapter for HttpSettingsAdapter {
    async fn banner_ads(&self) -> Result<BannerAdSettings, AdError> {
        self.get_json("/api/settings/banner_ads").await
    }

    async fn vast_ads(&self) -> Result<VastSettings, AdError> {
        self.get_json("/api/settings/vast_ads").await
    }
}
