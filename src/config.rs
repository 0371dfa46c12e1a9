//! Application-level configuration loading.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::room::{BattleSettings, SettingsPatch};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BATTLE_BACK_CONFIG_PATH";
/// Default quiz content file consumed by the static quiz store.
const DEFAULT_QUIZ_FILE: &str = "data/quizzes.json";
/// Lead between a start command and the synchronized start instant.
const DEFAULT_START_LEAD: Duration = Duration::from_millis(1200);
/// Per-room broadcast channel capacity.
const DEFAULT_HUB_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    quiz_file: PathBuf,
    start_lead: Duration,
    default_settings: BattleSettings,
    hub_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in
    /// defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Path of the quiz content file.
    pub fn quiz_file(&self) -> &Path {
        &self.quiz_file
    }

    /// Lead applied to the synchronized start instant of a battle.
    pub fn start_lead(&self) -> Duration {
        self.start_lead
    }

    /// Settings applied to rooms created without explicit values.
    pub fn default_settings(&self) -> &BattleSettings {
        &self.default_settings
    }

    /// Capacity of each room's broadcast channel.
    pub fn hub_capacity(&self) -> usize {
        self.hub_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quiz_file: PathBuf::from(DEFAULT_QUIZ_FILE),
            start_lead: DEFAULT_START_LEAD,
            default_settings: BattleSettings {
                quiz_time_seconds: 30,
                num_questions: 10,
                max_players: 8,
            },
            hub_capacity: DEFAULT_HUB_CAPACITY,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    quiz_file: Option<PathBuf>,
    #[serde(default)]
    start_lead_ms: Option<u64>,
    #[serde(default)]
    default_settings: Option<SettingsPatch>,
    #[serde(default)]
    hub_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            quiz_file: value.quiz_file.unwrap_or(defaults.quiz_file),
            start_lead: value
                .start_lead_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.start_lead),
            default_settings: match &value.default_settings {
                Some(patch) => defaults.default_settings.merged(patch),
                None => defaults.default_settings,
            },
            hub_capacity: value
                .hub_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.hub_capacity),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
