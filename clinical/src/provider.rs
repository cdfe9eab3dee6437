use crate::evidence::EvidenceBundle;
use crate::mechanism::{DiseaseProfile, DrugProfile};
use async_trait::async_trait;
use repurpose_core::error::{ErrorCode, RepurposeError};
use repurpose_core::model::normalize_name;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvidenceError {
    #[error("evidence source unavailable: {0}")]
    Unavailable(String),
}

impl RepurposeError for EvidenceError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::PartialData
    }
}

/// Supplies trial, literature and adverse-event evidence for one pair.
/// Sources it cannot reach are left as `None` in the bundle.
#[async_trait]
pub trait EvidenceProvider: Send + Sync {
    async fn fetch_evidence(
        &self,
        drug: &DrugProfile,
        disease: &DiseaseProfile,
    ) -> Result<EvidenceBundle, EvidenceError>;
}

/// Fixed bundles keyed by normalized (drug, disease) names.
#[derive(Debug, Clone, Default)]
pub struct StaticEvidenceProvider {
    bundles: HashMap<(String, String), EvidenceBundle>,
}

impl StaticEvidenceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, drug_name: &str, disease_name: &str, bundle: EvidenceBundle) {
        self.bundles.insert(
            (normalize_name(drug_name), normalize_name(disease_name)),
            bundle,
        );
    }
}

#[async_trait]
impl EvidenceProvider for StaticEvidenceProvider {
    async fn fetch_evidence(
        &self,
        drug: &DrugProfile,
        disease: &DiseaseProfile,
    ) -> Result<EvidenceBundle, EvidenceError> {
        let key = (normalize_name(&drug.name), normalize_name(&disease.name));
        Ok(self.bundles.get(&key).cloned().unwrap_or_default())
    }
}
