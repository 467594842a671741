// src/error.rs

use thiserror::Error;

use crate::model::slot::SlotPosition;

/// Errors surfaced by the ad engine's collaborators.
///
/// None of these escape a page session: slot failures degrade to a fallback
/// placeholder and VAST failures drop the affected roll.
#[derive(Debug, Error)]
pub enum AdError {
    #[error("settings request failed: {0}")]
    SettingsRequest(#[from] reqwest::Error),

    #[error("settings payload invalid: {0}")]
    SettingsParse(String),

    #[error("settings file {path}: {source}")]
    SettingsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("script injection failed for {position} slot: {reason}")]
    ScriptInjection {
        position: SlotPosition,
        reason: String,
    },

    #[error("unknown slot position `{0}`")]
    UnknownPosition(String),

    #[error("invalid engine config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
