use clinical::{DiseaseProfile, DrugProfile};
use repurpose_core::config::AnalysisConfig;
use repurpose_core::model::DiseaseQuery;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

const DEFAULT_MIN_SCORE: f64 = 0.2;
const DEFAULT_MAX_RESULTS: usize = 10;
const MAX_RESULTS_LIMIT: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisRequest {
    pub disease_name: String,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_explain")]
    pub explain: bool,
}

const fn default_min_score() -> f64 {
    DEFAULT_MIN_SCORE
}

const fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

const fn default_explain() -> bool {
    true
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestValidationError {
    #[error("disease_name must not be empty")]
    EmptyDiseaseName,
    #[error("drug_name must not be empty")]
    EmptyDrugName,
    #[error("min_score must be a number between 0 and 1 (got {0})")]
    InvalidMinScore(f64),
    #[error("max_results must be between 1 and 1000 (got {0})")]
    InvalidMaxResults(usize),
}

impl AnalysisRequest {
    pub fn new(disease_name: impl Into<String>) -> Self {
        Self {
            disease_name: disease_name.into(),
            min_score: DEFAULT_MIN_SCORE,
            max_results: DEFAULT_MAX_RESULTS,
            explain: true,
        }
    }

    /// A request carrying the deployment's configured defaults.
    pub fn with_defaults(disease_name: impl Into<String>, defaults: &AnalysisConfig) -> Self {
        Self {
            disease_name: disease_name.into(),
            min_score: defaults.default_min_score,
            max_results: defaults.default_max_results,
            explain: defaults.explain,
        }
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn parse_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Checks every field and builds the immutable query. Runs before any
    /// provider call.
    pub fn validate(&self) -> Result<DiseaseQuery, RequestValidationError> {
        if self.disease_name.trim().is_empty() {
            return Err(RequestValidationError::EmptyDiseaseName);
        }
        if !self.min_score.is_finite() || !(0.0..=1.0).contains(&self.min_score) {
            return Err(RequestValidationError::InvalidMinScore(self.min_score));
        }
        if self.max_results == 0 || self.max_results > MAX_RESULTS_LIMIT {
            return Err(RequestValidationError::InvalidMaxResults(self.max_results));
        }
        Ok(DiseaseQuery::new(
            &self.disease_name,
            self.min_score,
            self.max_results,
            self.explain,
        ))
    }
}

/// Caller-supplied drug context for a validation request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DrugData {
    pub mechanism: Option<String>,
    pub targets: BTreeSet<String>,
    pub pathways: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DiseaseData {
    pub genes: BTreeSet<String>,
    pub pathways: BTreeSet<String>,
    pub harmful_mechanisms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidationRequest {
    pub drug_name: String,
    pub disease_name: String,
    #[serde(default)]
    pub drug_data: DrugData,
    #[serde(default)]
    pub disease_data: DiseaseData,
}

impl ValidationRequest {
    pub fn new(drug_name: impl Into<String>, disease_name: impl Into<String>) -> Self {
        Self {
            drug_name: drug_name.into(),
            disease_name: disease_name.into(),
            drug_data: DrugData::default(),
            disease_data: DiseaseData::default(),
        }
    }

    pub fn parse_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn profiles(&self) -> Result<(DrugProfile, DiseaseProfile), RequestValidationError> {
        let drug_name = self.drug_name.trim();
        if drug_name.is_empty() {
            return Err(RequestValidationError::EmptyDrugName);
        }
        let disease_name = self.disease_name.trim();
        if disease_name.is_empty() {
            return Err(RequestValidationError::EmptyDiseaseName);
        }

        let drug = DrugProfile {
            name: drug_name.to_string(),
            mechanism: self.drug_data.mechanism.clone(),
            targets: self.drug_data.targets.clone(),
            pathways: self.drug_data.pathways.clone(),
        };
        let disease = DiseaseProfile {
            name: disease_name.to_string(),
            genes: self.disease_data.genes.clone(),
            pathways: self.disease_data.pathways.clone(),
            harmful_mechanisms: self.disease_data.harmful_mechanisms.clone(),
        };
        Ok((drug, disease))
    }
}
