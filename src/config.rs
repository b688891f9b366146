//! Run-wide settings carried in the scenario file.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::genotype::CondScoreSystem;

fn default_level() -> String {
    "info".to_string()
}

fn default_report_interval_days() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Days between herd summaries in the log. Zero turns them off.
    #[serde(default = "default_report_interval_days")]
    pub report_interval_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            report_interval_days: default_report_interval_days(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Scale used for condition scores in scenario files and reports.
    #[serde(default)]
    pub condition_score_system: CondScoreSystem,
}

/// Installs the fmt subscriber. `RUST_LOG` wins over the configured level. Calling this
/// again once a subscriber is installed does nothing.
pub fn init_logging(config: &LoggingConfig) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_defaults() {
        let config: LoggingConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, LoggingConfig::default());
        assert_eq!(config.level, "info");
        assert_eq!(config.report_interval_days, 30);
    }

    #[test]
    fn condition_scale_is_read_by_name() {
        let config: ModelConfig = serde_yaml::from_str("condition_score_system: \"1-8\"").unwrap();
        assert_eq!(config.condition_score_system, CondScoreSystem::OneToEight);
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(&LoggingConfig::default());
        init_logging(&LoggingConfig::default());
    }
}
