//! Contract between the core and the normalized record provider.
//!
//! The provider owns fan-out, retries and credentials for the external
//! databases; the core only ever sees one awaited call returning a complete
//! or partially complete [`RecordSet`].

use async_trait::async_trait;
use repurpose_core::model::normalize_name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("no disease matches '{0}'")]
    NotFound(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_rare: bool,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub active_trials: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub association: Option<f64>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genes: BTreeSet<String>,
    /// Enrichment strength of the pathway for the disease.
    #[serde(default)]
    pub association: Option<f64>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub gene_id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub indication: String,
    #[serde(default)]
    pub mechanism: Option<String>,
    #[serde(default)]
    pub targets: Vec<TargetRecord>,
    #[serde(default)]
    pub pathways: BTreeSet<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default = "default_approved")]
    pub approved: bool,
    pub source: String,
    /// Serious adverse-event reports on file, when the source has them.
    #[serde(default)]
    pub serious_adverse_events: Option<u32>,
}

fn default_approved() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalAssociation {
    pub drug_id: String,
    pub disease_id: String,
    pub strength: f64,
    /// e.g. "off_label", "trial", "approved".
    #[serde(default)]
    pub kind: String,
    pub source: String,
}

/// A secondary source the provider could not reach for this request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOutage {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub disease: DiseaseRecord,
    #[serde(default)]
    pub genes: Vec<GeneRecord>,
    #[serde(default)]
    pub pathways: Vec<PathwayRecord>,
    #[serde(default)]
    pub drugs: Vec<DrugRecord>,
    #[serde(default)]
    pub associations: Vec<HistoricalAssociation>,
    #[serde(default)]
    pub outages: Vec<SourceOutage>,
}

impl RecordSet {
    pub fn new(disease: DiseaseRecord) -> Self {
        Self {
            disease,
            genes: Vec::new(),
            pathways: Vec::new(),
            drugs: Vec::new(),
            associations: Vec::new(),
            outages: Vec::new(),
        }
    }
}

#[async_trait]
pub trait RecordProvider: Send + Sync {
    /// `disease_name` is already normalized.
    async fn fetch_disease_records(&self, disease_name: &str) -> Result<RecordSet, ProviderError>;
}

/// Serves a fixed snapshot of record sets keyed by normalized disease name and
/// synonyms. Identical snapshots always produce identical graphs.
#[derive(Debug, Clone, Default)]
pub struct SnapshotProvider {
    records: HashMap<String, Arc<RecordSet>>,
}

impl SnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = RecordSet>) -> Self {
        let mut provider = Self::new();
        for set in records {
            provider.insert(set);
        }
        provider
    }

    /// Parse a JSON array of record sets.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let sets: Vec<RecordSet> = serde_json::from_str(raw)?;
        Ok(Self::with_records(sets))
    }

    pub fn insert(&mut self, records: RecordSet) {
        let shared = Arc::new(records);
        let mut keys = vec![normalize_name(&shared.disease.name)];
        keys.extend(shared.disease.synonyms.iter().map(|s| normalize_name(s)));
        for key in keys {
            self.records.insert(key, shared.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordProvider for SnapshotProvider {
    async fn fetch_disease_records(&self, disease_name: &str) -> Result<RecordSet, ProviderError> {
        self.records
            .get(&normalize_name(disease_name))
            .map(|set| set.as_ref().clone())
            .ok_or_else(|| ProviderError::NotFound(disease_name.to_string()))
    }
}

/// Substitutes a secondary provider when the primary is unreachable. A
/// `NotFound` from the primary is authoritative and is not retried.
pub struct FallbackProvider {
    primary: Arc<dyn RecordProvider>,
    fallback: Arc<dyn RecordProvider>,
}

impl FallbackProvider {
    pub fn new(primary: Arc<dyn RecordProvider>, fallback: Arc<dyn RecordProvider>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl RecordProvider for FallbackProvider {
    async fn fetch_disease_records(&self, disease_name: &str) -> Result<RecordSet, ProviderError> {
        match self.primary.fetch_disease_records(disease_name).await {
            Err(ProviderError::Unavailable(reason)) => {
                warn!(disease = disease_name, %reason, "primary provider unavailable, using fallback");
                self.fallback.fetch_disease_records(disease_name).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parkinson() -> RecordSet {
        RecordSet::new(DiseaseRecord {
            id: "MONDO_0005180".to_string(),
            name: "Parkinson Disease".to_string(),
            description: String::new(),
            is_rare: false,
            synonyms: vec!["Parkinson's".to_string()],
            tags: BTreeSet::new(),
            active_trials: 0,
        })
    }

    struct Down;

    #[async_trait]
    impl RecordProvider for Down {
        async fn fetch_disease_records(&self, _: &str) -> Result<RecordSet, ProviderError> {
            Err(ProviderError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn snapshot_resolves_name_and_synonyms() {
        let provider = SnapshotProvider::with_records(vec![parkinson()]);
        assert_eq!(provider.len(), 2);

        let by_name = provider.fetch_disease_records("parkinson disease").await.unwrap();
        let by_synonym = provider.fetch_disease_records("PARKINSON'S").await.unwrap();
        assert_eq!(by_name, by_synonym);

        let missing = provider.fetch_disease_records("unknown").await;
        assert_eq!(missing, Err(ProviderError::NotFound("unknown".to_string())));
    }

    #[tokio::test]
    async fn snapshot_loads_from_json() {
        let raw = r#"[{
            "disease": {"id": "D1", "name": "Asthma"},
            "genes": [{"id": "G1", "symbol": "IL13", "association": 0.8, "source": "opentargets"}],
            "drugs": [{"id": "X1", "name": "Dupilumab", "source": "chembl",
                       "targets": [{"gene_id": "G1", "source": "dgidb"}]}]
        }]"#;
        let provider = SnapshotProvider::from_json(raw).unwrap();
        let records = provider.fetch_disease_records("asthma").await.unwrap();
        assert_eq!(records.genes.len(), 1);
        assert!(records.drugs[0].approved);
        assert!(records.outages.is_empty());
    }

    #[tokio::test]
    async fn fallback_only_on_unavailable() {
        let snapshot: Arc<dyn RecordProvider> =
            Arc::new(SnapshotProvider::with_records(vec![parkinson()]));
        let provider = FallbackProvider::new(Arc::new(Down), snapshot.clone());
        assert!(provider.fetch_disease_records("parkinson disease").await.is_ok());

        let empty: Arc<dyn RecordProvider> = Arc::new(SnapshotProvider::new());
        let provider = FallbackProvider::new(empty, snapshot);
        assert!(matches!(
            provider.fetch_disease_records("parkinson disease").await,
            Err(ProviderError::NotFound(_))
        ));
    }
}
