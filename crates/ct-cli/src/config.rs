//! Configuration loading and management.

use std::path::{Path, PathBuf};

use ct_core::SplitConfig;
use ct_judge::JudgeConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the verdict cache.
    pub database_path: PathBuf,
    /// Directory holding one fixture directory per exercise.
    pub fixtures_dir: Option<PathBuf>,
    pub split: SplitConfig,
    pub judge: JudgeConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let judge = JudgeConfig {
            work_dir: dirs_cache_path()
                .map_or_else(|| JudgeConfig::default().work_dir, |dir| dir.join("work")),
            ..JudgeConfig::default()
        };
        Self {
            database_path: data_dir.join("verdicts.db"),
            fixtures_dir: None,
            split: SplitConfig::default(),
            judge,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Nested keys are set from the environment with a double underscore,
    /// e.g. `CT_JUDGE__WORKERS=4`.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (CT_*)
        figment = figment.merge(Env::prefixed("CT_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for ct.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ct"))
}

/// Returns the platform-specific data directory for ct.
///
/// On Linux: `~/.local/share/ct`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ct"))
}

/// Returns the platform-specific cache directory for ct.
///
/// On Linux: `~/.cache/ct`
pub fn dirs_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("ct"))
}
