use chrono::{SecondsFormat, Utc};
use graph::{BuiltGraph, DiseaseSummary, GraphStats};
use repurpose_core::error::PartialData;
use repurpose_core::model::DiseaseQuery;
use safety::{AdmissibleCandidate, FilteredCandidate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_score: f64,
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub drugs_analyzed: usize,
    /// Drugs scored before safety filtering and thresholds.
    pub candidates_scored: usize,
    pub thresholds: Thresholds,
    pub data_sources: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<PartialData>,
    pub graph_fingerprint: String,
    pub graph_cached: bool,
    pub elapsed_ms: u64,
    /// RFC 3339, UTC.
    pub generated_at: String,
}

/// Payload of the `complete` stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub disease_name: String,
    /// Gene symbols, strongest association first.
    pub disease_genes: Vec<String>,
    pub disease_pathways: Vec<String>,
    pub candidates: Vec<AdmissibleCandidate>,
    /// Rule-based removals only; threshold exclusions are not counted.
    pub filtered_count: usize,
    pub filtered_drugs: Vec<FilteredCandidate>,
    pub graph_stats: GraphStats,
    pub disease: DiseaseSummary,
    pub metadata: ResultMetadata,
}

pub(crate) struct Assembly {
    pub candidates: Vec<AdmissibleCandidate>,
    pub filtered: Vec<FilteredCandidate>,
    pub candidates_scored: usize,
    pub cache_hit: bool,
    pub elapsed: Duration,
}

impl AnalysisResult {
    pub(crate) fn assemble(built: &BuiltGraph, query: &DiseaseQuery, parts: Assembly) -> Self {
        let graph = &built.graph;
        let disease_genes = graph
            .disease_genes()
            .into_iter()
            .map(|(gene, _)| gene.symbol.clone())
            .collect();
        let disease_pathways = graph
            .disease_pathways()
            .into_iter()
            .map(|(pathway, _)| pathway.name.clone())
            .collect();

        Self {
            disease_name: graph.disease().name.clone(),
            disease_genes,
            disease_pathways,
            filtered_count: parts.filtered.len(),
            candidates: parts.candidates,
            filtered_drugs: parts.filtered,
            graph_stats: graph.stats(),
            disease: built.summary.clone(),
            metadata: ResultMetadata {
                drugs_analyzed: built.drugs_analyzed,
                candidates_scored: parts.candidates_scored,
                thresholds: Thresholds {
                    min_score: query.min_score(),
                    max_results: query.max_results(),
                },
                data_sources: built.data_sources.iter().cloned().collect(),
                warnings: built.warnings.clone(),
                graph_fingerprint: graph.fingerprint(),
                graph_cached: parts.cache_hit,
                elapsed_ms: u64::try_from(parts.elapsed.as_millis()).unwrap_or(u64::MAX),
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
