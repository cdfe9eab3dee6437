use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("scoring weight {0} must be a finite non-negative number")]
    InvalidWeight(&'static str),
    #[error("scoring weights must sum to 1.0 (got {0})")]
    WeightSum(f64),
    #[error("tier thresholds must lie in [0,1] with medium <= high")]
    InvalidTierThresholds,
    #[error("scoring.gene_normalization_top_k must be at least 1")]
    InvalidTopK,
    #[error("scoring.default_gene_association must lie in [0,1]")]
    InvalidDefaultAssociation,
    #[error("scoring.max_path_length must be at least 1")]
    InvalidPathLength,
    #[error("validation.weak_adverse_event_threshold must not exceed the strong threshold")]
    InvalidAdverseEventThresholds,
    #[error("analysis.default_min_score must lie in [0,1]")]
    InvalidDefaultMinScore,
    #[error("analysis.default_max_results must be at least 1")]
    InvalidDefaultMaxResults,
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ConfigValidationError),
}

/// Weights of the four sub-scores in the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub gene_target: f64,
    pub pathway_overlap: f64,
    pub network_proximity: f64,
    pub prior_evidence: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            gene_target: 0.50,
            pathway_overlap: 0.35,
            network_proximity: 0.10,
            prior_evidence: 0.05,
        }
    }
}

impl ScoringWeights {
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.gene_target,
            self.pathway_overlap,
            self.network_proximity,
            self.prior_evidence,
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let named = [
            ("gene_target", self.gene_target),
            ("pathway_overlap", self.pathway_overlap),
            ("network_proximity", self.network_proximity),
            ("prior_evidence", self.prior_evidence),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigValidationError::InvalidWeight(name));
            }
        }
        let sum: f64 = self.as_array().iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigValidationError::WeightSum(sum));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub high: f64,
    pub medium: f64,
    /// Non-zero sub-scores required before a candidate may be rated High.
    pub high_min_signals: usize,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: 0.7,
            medium: 0.4,
            high_min_signals: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub tiers: TierThresholds,
    pub gene_normalization_top_k: usize,
    pub default_gene_association: f64,
    pub max_path_length: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            tiers: TierThresholds::default(),
            gene_normalization_top_k: 5,
            default_gene_association: 0.5,
            max_path_length: 4,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.weights.validate()?;
        let tiers = &self.tiers;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(tiers.high) || !in_unit(tiers.medium) || tiers.medium > tiers.high {
            return Err(ConfigValidationError::InvalidTierThresholds);
        }
        if self.gene_normalization_top_k == 0 {
            return Err(ConfigValidationError::InvalidTopK);
        }
        if !in_unit(self.default_gene_association) {
            return Err(ConfigValidationError::InvalidDefaultAssociation);
        }
        if self.max_path_length == 0 {
            return Err(ConfigValidationError::InvalidPathLength);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// When set, Relative contraindications filter instead of warn.
    pub strict: bool,
    pub use_builtin_rules: bool,
    pub rules_path: Option<String>,
    /// Treat a drug's serious adverse-event count at or above
    /// `serious_event_threshold` as a Relative contraindication.
    pub use_adverse_events: bool,
    pub serious_event_threshold: u32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            strict: false,
            use_builtin_rules: true,
            rules_path: None,
            use_adverse_events: true,
            serious_event_threshold: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub strong_adverse_event_threshold: u32,
    pub weak_adverse_event_threshold: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strong_adverse_event_threshold: 100,
            weak_adverse_event_threshold: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub default_min_score: f64,
    pub default_max_results: usize,
    pub summary_top_genes: usize,
    pub explain: bool,
    pub cache_graphs: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_min_score: 0.2,
            default_max_results: 10,
            summary_top_genes: 10,
            explain: true,
            cache_graphs: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub scoring: ScoringConfig,
    pub safety: SafetyConfig,
    pub validation: ValidationConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Layered load: `config/default`, `config/{RUN_MODE}`, then
    /// `REPURPOSE__SECTION__KEY` environment overrides.
    pub fn load() -> Result<Self, AppConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::load_from(Path::new("config"), &run_mode)
    }

    pub fn load_from(dir: &Path, run_mode: &str) -> Result<Self, AppConfigError> {
        let default_path = dir.join("default");
        let mode_path = dir.join(run_mode);

        let builder = Config::builder()
            .add_source(File::with_name(&default_path.to_string_lossy()))
            .add_source(File::with_name(&mode_path.to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix("REPURPOSE")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.scoring.validate()?;
        if self.validation.weak_adverse_event_threshold
            > self.validation.strong_adverse_event_threshold
        {
            return Err(ConfigValidationError::InvalidAdverseEventThresholds);
        }
        if !(0.0..=1.0).contains(&self.analysis.default_min_score) {
            return Err(ConfigValidationError::InvalidDefaultMinScore);
        }
        if self.analysis.default_max_results == 0 {
            return Err(ConfigValidationError::InvalidDefaultMaxResults);
        }
        Ok(())
    }
}
