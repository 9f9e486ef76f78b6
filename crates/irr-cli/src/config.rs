//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use irr_core::{Condition, DEFAULT_WINDOW_SECONDS};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Sampling cadence for reliability, in seconds.
    pub window_seconds: f64,

    /// Session condition assumed when a command does not specify one.
    pub condition: Condition,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            condition: Condition::TwoStream,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // IRR_WINDOW_SECONDS, IRR_CONDITION
        figment = figment.merge(Env::prefixed("IRR_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for irr.
///
/// On Linux: `~/.config/irr`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("irr"))
}
