// src/main.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tokio::signal;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use ad_slots::config::{DeviceProfile, EngineConfig};
use ad_slots::logging::delivery_log::SessionLog;
use ad_slots::logging::runtime_logger::{LogLevel, RuntimeLogger};
use ad_slots::mock_settings::{start_mock_settings_server, MockSettingsState};
use ad_slots::model::adapters::{FileSettingsAdapter, HttpSettingsAdapter, SettingsAdapter};
use ad_slots::model::settings::{SettingsEvent, VastSettings};
use ad_slots::model::source::SlotAdSource;
use ad_slots::page::script_host::MarkupScriptHost;
use ad_slots::page::AdPage;
use ad_slots::vast::{HttpProbe, PlayerConfig, VastScheduleBuilder};

#[derive(Parser, Debug)]
#[command(version, about = "Ad slot delivery and validation engine for a streaming page")]
struct CliArgs {
    #[arg(long, default_value = "logs", global = true)]
    log_dir: String,
    /// engine timing overrides (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate one page session and print its delivery summary
    Run(RunArgs),
    /// Serve settings and VAST tags for local testing
    MockSettings {
        #[arg(short, long, default_value_t = 9100)]
        port: u16,
        #[arg(long)]
        settings_dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, conflicts_with = "settings_dir")]
    settings_url: Option<String>,
    #[arg(long)]
    settings_dir: Option<PathBuf>,
    /// start the mock settings server on this port and read settings from it
    #[arg(long, conflicts_with_all = ["settings_url", "settings_dir"])]
    mock_port: Option<u16>,
    #[arg(long)]
    mobile: bool,
    #[arg(long, default_value = "")]
    user_agent: String,
    #[arg(long, default_value_t = 1280)]
    viewport_width: u32,
    /// virtual page time to simulate
    #[arg(long, default_value_t = 30_000)]
    duration_ms: u64,
    #[arg(long, default_value = "video.mp4")]
    video_src: String,
    /// settings-channel messages to replay, one `<at_ms> <json>` per line
    #[arg(long)]
    events: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化全局 tracing 日志
    let log_file = rolling::hourly(&args.log_dir, "ad_slots.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);
    let subscriber = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber)
        .context("unable to set global tracing subscriber")?;

    let config = EngineConfig::load(args.config.as_deref()).context("loading engine config")?;

    match args.command {
        Command::Run(run) => run_session(run, config, &args.log_dir).await,
        Command::MockSettings { port, settings_dir } => {
            let state = match settings_dir {
                Some(dir) => MockSettingsState::from_dir(&dir)
                    .await
                    .with_context(|| format!("reading settings from {}", dir.display()))?,
                None => MockSettingsState::sample(&format!("http://127.0.0.1:{}", port)),
            };
            tokio::select! {
                served = start_mock_settings_server(port, state) => served?,
                _ = signal::ctrl_c() => info!("mock settings server shutting down"),
            }
            Ok(())
        }
    }
}

async fn run_session(run: RunArgs, config: EngineConfig, log_dir: &str) -> anyhow::Result<()> {
    let runtime_logger = RuntimeLogger::new(log_dir, "session", 1000, 100, 1000);

    let profile = if run.mobile {
        DeviceProfile::Mobile
    } else {
        DeviceProfile::detect(&run.user_agent, run.viewport_width)
    };

    let settings_url = match run.mock_port {
        Some(port) => {
            let state = MockSettingsState::sample(&format!("http://127.0.0.1:{}", port));
            tokio::spawn(async move {
                if let Err(e) = start_mock_settings_server(port, state).await {
                    warn!(error = %e, "mock settings server stopped");
                }
            });
            // give the listener a moment to bind
            sleep(Duration::from_millis(100)).await;
            Some(format!("http://127.0.0.1:{}", port))
        }
        None => run.settings_url.clone(),
    };

    let (adapter, source_label): (Option<Box<dyn SettingsAdapter>>, String) =
        match (&settings_url, &run.settings_dir) {
            (Some(url), _) => (
                Some(Box::new(HttpSettingsAdapter::new(url)) as Box<dyn SettingsAdapter>),
                format!("url:{}", url),
            ),
            (None, Some(dir)) => (
                Some(Box::new(FileSettingsAdapter::from_dir(dir))),
                format!("dir:{}", dir.display()),
            ),
            (None, None) => (None, "defaults".to_string()),
        };

    let events = match &run.events {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading settings events from {}", path.display()))?;
            SettingsEvent::parse_timeline(&text)?
        }
        None => Vec::new(),
    };

    let adapter = adapter.as_deref();
    let source = load_slot_source(adapter).await;
    let builder = VastScheduleBuilder::new(
        Arc::new(HttpProbe::new(config.probe_timeout_ms)),
        config.mid_roll_offset_seconds,
    );
    let (ad_schedule, mut probe_logs) = builder.build_logged(&load_vast_settings(adapter).await).await;
    let mut player = PlayerConfig::with_ad_schedule(ad_schedule);

    info!(device = ?profile, source = %source_label, events = events.len(), "starting page session");
    let mut page = AdPage::new(config, profile, MarkupScriptHost::default());
    page.load(&source);

    for (at_ms, event) in events {
        if at_ms > run.duration_ms {
            break;
        }
        page.run_until(at_ms);
        if event.requires_slot_rebuild() {
            let source = load_slot_source(adapter).await;
            page.handle_settings_event(&event, &source);
        }
        if event.requires_vast_rebuild() {
            info!(at_ms, "vast settings changed, rebuilding player ads");
            let (ad_schedule, logs) = builder.build_logged(&load_vast_settings(adapter).await).await;
            probe_logs.extend(logs);
            player = PlayerConfig::with_ad_schedule(ad_schedule);
        }
    }
    page.run_until(run.duration_ms);

    let mut session = SessionLog::new(
        &uuid::Uuid::new_v4().to_string(),
        if profile.is_mobile() { "mobile" } else { "desktop" },
        &source_label,
    );
    session.duration_ms = page.now();
    for slot in page.slots() {
        session.add_slot(slot);
    }
    for probe in probe_logs {
        session.add_probe(probe);
    }
    session.interstitial = page
        .gate_state()
        .and_then(|state| serde_json::to_value(state).ok())
        .and_then(|value| value.as_str().map(str::to_string));

    let (loaded, fallback, idle) = session.outcome_counts();
    info!(loaded, fallback, idle, vast_ads = session.vast_ads_kept, "page session finished");
    runtime_logger.log_record(LogLevel::Info, &session).await;
    runtime_logger.shutdown().await;

    let output = json!({
        "session": session,
        "videoSrc": run.video_src,
        "player": player,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Banner settings as slot creatives; placeholders when there is no source or
/// it fails.
async fn load_slot_source(adapter: Option<&dyn SettingsAdapter>) -> SlotAdSource {
    let Some(adapter) = adapter else {
        return SlotAdSource::placeholders();
    };
    match adapter.banner_ads().await {
        Ok(banner) => {
            info!(configured = ?banner.configured_positions(), "banner settings loaded");
            SlotAdSource::from_banner_settings(&banner)
        }
        Err(e) => {
            warn!(error = %e, "banner settings unavailable, using placeholder creatives");
            SlotAdSource::placeholders()
        }
    }
}

async fn load_vast_settings(adapter: Option<&dyn SettingsAdapter>) -> VastSettings {
    let Some(adapter) = adapter else {
        return VastSettings::default();
    };
    adapter.vast_ads().await.unwrap_or_else(|e| {
        warn!(error = %e, "vast settings unavailable, player starts without ads");
        VastSettings::default()
    })
}
