// src/vast/probe.rs

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::{timeout, Duration};

/// Result of checking one VAST tag URL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

impl ProbeOutcome {
    pub fn reachable(status: u16) -> Self {
        Self {
            ok: true,
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn failed(status: Option<u16>, error: &str) -> Self {
        Self {
            ok: false,
            status,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// Reachability check for a VAST tag. Implementations never fail: transport
/// errors and timeouts are reported through `ProbeOutcome`.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// 协议相对地址（`//host/...`）按 https 处理
pub fn normalize_tag_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.starts_with("//") {
        format!("https:{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// `HEAD` request with a hard timeout.
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            client: Client::new(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let target = normalize_tag_url(url);
        let start = Instant::now();
        let response = timeout(self.timeout, self.client.head(&target).send()).await;
        let elapsed_ms = start.elapsed().as_millis();

        let mut outcome = match response {
            Ok(Ok(resp)) => {
                let status = resp.status();
                if status.is_success() {
                    let mut outcome = ProbeOutcome::reachable(status.as_u16());
                    outcome.content_type = resp
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    outcome
                } else {
                    ProbeOutcome::failed(Some(status.as_u16()), &format!("HTTP {}", status.as_u16()))
                }
            }
            Ok(Err(err)) => ProbeOutcome::failed(None, &err.to_string()),
            Err(_) => ProbeOutcome::failed(None, "timeout"),
        };
        outcome.elapsed_ms = elapsed_ms;
        outcome
    }
}
