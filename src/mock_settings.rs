// src/mock_settings.rs

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{serve, Json, Router};
use rand::Rng;
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::error::AdError;
use crate::model::adapters::{FileSettingsAdapter, SettingsAdapter};
use crate::model::settings::{BannerAdSettings, VastSettings};
use crate::model::slot::SlotPosition;

/// Settings the mock admin API serves, plus the VAST tag names it answers 200 for.
#[derive(Debug, Clone)]
pub struct MockSettingsState {
    pub banner: BannerAdSettings,
    pub vast: VastSettings,
    pub known_tags: HashSet<String>,
    pub max_latency_ms: u64,
}

impl MockSettingsState {
    /// Demo settings: one rendering creative, one noise-only creative and a
    /// VAST schedule whose post-roll tag does not exist.
    pub fn sample(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let mut banner = BannerAdSettings::default();
        banner.set_payload(
            SlotPosition::Top,
            "<script>window.__ad='top'</script><div class=\"ad\"><a href=\"#\">Stream in 4K, first month free</a></div>",
        );
        banner.set_payload(
            SlotPosition::Middle,
            "<script>void 0</script><div>https://distortedwin.com/bvX.VzscdqG</div>",
        );
        banner.set_payload(
            SlotPosition::Sidebar,
            "<div class=\"ad\">Noise-cancelling headphones, 30% off</div>",
        );
        banner.set_payload(
            SlotPosition::Interstitial,
            "<div class=\"ad interstitial\">Premium plan: no ads, all sports</div>",
        );

        let vast = VastSettings {
            pre_roll: Some(format!("{}/vast/preroll.xml", base)),
            mid_roll: Some(format!("{}/vast/midroll.xml", base)),
            post_roll: Some(format!("{}/vast/postroll-missing.xml", base)),
            vast_ads: None,
        };

        Self {
            banner,
            vast,
            known_tags: ["preroll.xml", "midroll.xml"].into_iter().map(String::from).collect(),
            max_latency_ms: 120,
        }
    }

    /// Serves `banner_ads.json` / `vast_ads.json` from `dir`; tag names known
    /// to the mock are the last path segment of every configured VAST tag.
    pub async fn from_dir(dir: &Path) -> Result<Self, AdError> {
        let adapter = FileSettingsAdapter::from_dir(dir);
        let banner = adapter.banner_ads().await?;
        let vast = adapter.vast_ads().await?;
        let known_tags = [&vast.pre_roll, &vast.mid_roll, &vast.post_roll]
            .into_iter()
            .flatten()
            .chain(vast.vast_ads.iter().flatten())
            .filter_map(|tag| tag.trim().rsplit('/').next())
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        Ok(Self {
            banner,
            vast,
            known_tags,
            max_latency_ms: 120,
        })
    }

    async fn simulate_latency(&self) {
        if self.max_latency_ms == 0 {
            return;
        }
        let delay_ms = rand::thread_rng().gen_range(0..self.max_latency_ms);
        sleep(Duration::from_millis(delay_ms)).await;
    }
}

async fn banner_ads(State(state): State<Arc<MockSettingsState>>) -> Json<BannerAdSettings> {
    state.simulate_latency().await;
    Json(state.banner.clone())
}

async fn vast_ads(State(state): State<Arc<MockSettingsState>>) -> Json<VastSettings> {
    state.simulate_latency().await;
    Json(state.vast.clone())
}

/// `GET` (and `HEAD`, answered by the same route) for a VAST document.
async fn vast_tag(
    State(state): State<Arc<MockSettingsState>>,
    UrlPath(name): UrlPath<String>,
) -> Response {
    state.simulate_latency().await;
    if !state.known_tags.contains(&name) {
        info!(tag = %name, "mock vast tag not found");
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        mock_vast_document(&name),
    )
        .into_response()
}

fn mock_vast_document(name: &str) -> String {
    format!(
        r#"<VAST version="3.0">
  <Ad id="{name}">
    <InLine>
      <AdSystem>Mock Settings</AdSystem>
      <AdTitle>Mock Video Ad</AdTitle>
      <Creatives>
        <Creative>
          <Linear>
            <Duration>00:00:15</Duration>
            <MediaFiles>
              <MediaFile delivery="progressive" type="video/mp4" width="640" height="360">
                http://example.com/video.mp4
              </MediaFile>
            </MediaFiles>
          </Linear>
        </Creative>
      </Creatives>
    </InLine>
  </Ad>
</VAST>"#,
        name = name
    )
}

pub fn router(state: MockSettingsState) -> Router {
    Router::new()
        .route("/api/settings/banner_ads", get(banner_ads))
        .route("/api/settings/vast_ads", get(vast_ads))
        .route("/vast/{name}", get(vast_tag))
        .with_state(Arc::new(state))
}

/// 启动 Mock 配置服务
pub async fn start_mock_settings_server(port: u16, state: MockSettingsState) -> Result<(), AdError> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Mock settings server running at http://{}", addr);
    serve(listener, router(state)).await?;
    Ok(())
}
