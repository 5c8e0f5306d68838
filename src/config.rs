use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::adaptation::AdaptationConfig;
use crate::error::FitAssessError;
use crate::leaderboard::LeaderboardConfig;
use crate::logging::LogConfig;
use crate::norms::NormativeTable;
use crate::scoring::ScoringConfig;
use crate::training_plan::PlanConfig;

const CONFIG_DIR: &str = ".fitassess";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Normative table file; built-in norms when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norms_path: Option<PathBuf>,

    /// Application metadata
    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Plan generation rules and templates
    #[serde(default)]
    pub plan: PlanConfig,

    #[serde(default)]
    pub adaptation: AdaptationConfig,

    #[serde(default)]
    pub leaderboard: LeaderboardConfig,

    #[serde(default)]
    pub dashboard: DashboardSettings,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file path
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: AppConfig::config_dir().join("fitassess.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    /// Number of recent results shown
    pub recent_limit: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self { recent_limit: 5 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            norms_path: None,
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            database: DatabaseSettings::default(),
            scoring: ScoringConfig::default(),
            plan: PlanConfig::default(),
            adaptation: AdaptationConfig::default(),
            leaderboard: LeaderboardConfig::default(),
            dashboard: DashboardSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// `~/.fitassess`, or `./.fitassess` without a home directory
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "Invalid config file, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Save configuration to default location
    pub fn save_default(&mut self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to_file(config_path)
    }

    /// Check every section; the first violation wins
    pub fn validate(&self) -> crate::error::Result<()> {
        self.scoring.validate()?;
        self.plan.validate()?;
        self.adaptation.validate()?;

        if self.adaptation.min_volume < self.plan.min_weekly_volume
            || self.adaptation.max_volume > self.plan.max_weekly_volume
        {
            return Err(FitAssessError::Configuration(format!(
                "adaptation volume bounds {}..{} exceed plan bounds {}..{}",
                self.adaptation.min_volume,
                self.adaptation.max_volume,
                self.plan.min_weekly_volume,
                self.plan.max_weekly_volume
            )));
        }
        if self.leaderboard.default_limit == 0 {
            return Err(FitAssessError::Configuration(
                "leaderboard default limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Normative table from `norms_path`, or the built-in table
    pub fn load_norms(&self) -> Result<NormativeTable> {
        let table = match &self.norms_path {
            Some(path) => NormativeTable::load_from_file(path)?,
            None => NormativeTable::builtin(),
        };
        table.validate()?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::RankingKey;
    use crate::models::{AgeGroup, Gender, TestType};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            [metadata]
            version = "1.0"
            created_at = "2024-01-01T00:00:00Z"
            updated_at = "2024-01-01T00:00:00Z"

            [adaptation]
            window_days = 14

            [leaderboard]
            ranking_key = "average_form_score"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.adaptation.window_days, 14);
        assert_eq!(config.adaptation.min_results, 2);
        assert_eq!(config.adaptation.max_history, Some(120));
        assert_eq!(config.leaderboard.ranking_key, RankingKey::AverageFormScore);
        assert_eq!(config.scoring, ScoringConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = AppConfig::default();
        original.database.path = temp_dir.path().join("fitassess.db");
        original.adaptation.max_history = Some(10);

        original.save_to_file(&config_path).unwrap();
        let loaded = AppConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded.database.path, original.database.path);
        assert_eq!(loaded.adaptation.max_history, Some(10));
    }

    #[test]
    fn test_validate_rejects_inconsistent_bounds() {
        let mut config = AppConfig::default();
        config.adaptation.max_volume = config.plan.max_weekly_volume + 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, FitAssessError::Configuration(_)));

        let mut config = AppConfig::default();
        config.leaderboard.default_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_norms_from_file() {
        let temp_dir = tempdir().unwrap();
        let norms_path = temp_dir.path().join("norms.toml");
        NormativeTable::builtin().save_to_file(&norms_path).unwrap();

        let mut config = AppConfig::default();
        assert_eq!(config.load_norms().unwrap().version, "2024.1");

        config.norms_path = Some(norms_path);
        let table = config.load_norms().unwrap();
        let bands = table
            .lookup(TestType::Squats, AgeGroup::Adult, Gender::Male)
            .unwrap();
        assert_eq!(bands.p50, dec!(35));

        config.norms_path = Some(temp_dir.path().join("missing.toml"));
        assert!(config.load_norms().is_err());
    }
}
