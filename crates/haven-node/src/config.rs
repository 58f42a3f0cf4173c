//! Node configuration loading and management.

use haven_core::{AnchorPolicy, TrustPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full configuration for the Haven issuer node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HavenConfig {
    /// Issuer identity settings.
    #[serde(default)]
    pub issuer: IssuerConfig,

    /// Batch anchoring policy.
    #[serde(default)]
    pub anchor: AnchorPolicy,

    /// Trust scoring policy, read by `haven score --config`.
    #[serde(default)]
    pub trust: TrustPolicy,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Display name stamped on issued credentials.
    #[serde(default = "default_issuer_name")]
    pub name: String,
    /// JSON identity export; created on first start.
    #[serde(default = "default_identity_file")]
    pub identity_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

fn default_issuer_name() -> String {
    "Haven Issuer".into()
}
fn default_identity_file() -> PathBuf {
    PathBuf::from("./data/issuer-identity.json")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            name: default_issuer_name(),
            identity_file: default_identity_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl HavenConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: HavenConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.anchor.batch_threshold == 0 {
            anyhow::bail!("anchor.batch_threshold must be at least 1");
        }
        if self.anchor.flush_interval_secs == 0 {
            anyhow::bail!("anchor.flush_interval_secs must be at least 1");
        }
        if self.trust.days_per_month == 0 {
            anyhow::bail!("trust.days_per_month must be at least 1");
        }
        Ok(())
    }
}
