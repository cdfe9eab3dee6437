use crate::explain::mechanism_text;
use graph::KnowledgeGraph;
use repurpose_core::config::{ConfigValidationError, ScoringConfig};
use repurpose_core::model::{clamp_unit, DiseaseQuery, DrugNode, NodeId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubScores {
    pub gene_target_score: f64,
    pub pathway_overlap_score: f64,
    pub network_proximity_score: f64,
    pub prior_evidence_score: f64,
}

impl SubScores {
    /// Same order as `ScoringWeights::as_array`.
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.gene_target_score,
            self.pathway_overlap_score,
            self.network_proximity_score,
            self.prior_evidence_score,
        ]
    }

    pub fn non_zero_count(&self) -> usize {
        self.as_array().iter().filter(|v| **v > 0.0).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub drug_id: String,
    pub drug_name: String,
    pub original_indication: String,
    pub composite_score: f64,
    #[serde(flatten)]
    pub sub_scores: SubScores,
    pub confidence: ConfidenceTier,
    /// Symbols, in disease-gene order (strongest association first).
    pub shared_genes: Vec<String>,
    /// Names, in disease-pathway order.
    pub shared_pathways: Vec<String>,
    pub mechanism: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Ranking order: composite desc, gene desc, pathway desc, name asc, id asc.
pub fn compare_candidates(a: &CandidateScore, b: &CandidateScore) -> Ordering {
    let desc = |x: f64, y: f64| y.partial_cmp(&x).unwrap_or(Ordering::Equal);
    desc(a.composite_score, b.composite_score)
        .then_with(|| desc(a.sub_scores.gene_target_score, b.sub_scores.gene_target_score))
        .then_with(|| {
            desc(
                a.sub_scores.pathway_overlap_score,
                b.sub_scores.pathway_overlap_score,
            )
        })
        .then_with(|| a.drug_name.cmp(&b.drug_name))
        .then_with(|| a.drug_id.cmp(&b.drug_id))
}

/// Drop candidates below `min_score`, then keep the first `max_results`.
/// Input must already be ranked.
pub fn apply_threshold(
    ranked: Vec<CandidateScore>,
    min_score: f64,
    max_results: usize,
) -> Vec<CandidateScore> {
    ranked
        .into_iter()
        .filter(|candidate| candidate.composite_score >= min_score)
        .take(max_results)
        .collect()
}

/// Disease-side inputs shared by every candidate of one graph.
struct DiseaseProfile {
    /// (gene id, symbol, association), strongest first.
    genes: Vec<(String, String, f64)>,
    top_k_total: f64,
    /// (pathway id, name), strongest first.
    pathways: Vec<(String, String)>,
    pathway_ids: BTreeSet<String>,
}

impl DiseaseProfile {
    fn from_graph(graph: &KnowledgeGraph, top_k: usize) -> Self {
        let genes: Vec<(String, String, f64)> = graph
            .disease_genes()
            .into_iter()
            .map(|(gene, strength)| (gene.id.clone(), gene.symbol.clone(), strength))
            .collect();
        let top_k_total: f64 = genes.iter().take(top_k).map(|(_, _, s)| s).sum();
        let pathways: Vec<(String, String)> = graph
            .disease_pathways()
            .into_iter()
            .map(|(pathway, _)| (pathway.id.clone(), pathway.name.clone()))
            .collect();
        let pathway_ids = pathways.iter().map(|(id, _)| id.clone()).collect();
        Self {
            genes,
            top_k_total,
            pathways,
            pathway_ids,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Every drug sharing a gene, a pathway or a historical association with
    /// the disease, ranked. Proximity alone does not make a candidate.
    pub fn score_all(&self, graph: &KnowledgeGraph) -> Vec<CandidateScore> {
        let profile = DiseaseProfile::from_graph(graph, self.config.gene_normalization_top_k);
        let mut candidates: Vec<CandidateScore> = graph
            .candidate_drugs()
            .into_iter()
            .map(|drug| self.score_with(&profile, graph, drug))
            .collect();
        candidates.sort_by(compare_candidates);
        debug!(
            disease = %graph.disease_id(),
            candidates = candidates.len(),
            "scored candidate drugs"
        );
        candidates
    }

    /// Ranked, thresholded and truncated per the query.
    pub fn rank(&self, graph: &KnowledgeGraph, query: &DiseaseQuery) -> Vec<CandidateScore> {
        apply_threshold(self.score_all(graph), query.min_score(), query.max_results())
    }

    /// Score one drug regardless of whether it is connected to the disease.
    pub fn score_drug(&self, graph: &KnowledgeGraph, drug: &DrugNode) -> CandidateScore {
        let profile = DiseaseProfile::from_graph(graph, self.config.gene_normalization_top_k);
        self.score_with(&profile, graph, drug)
    }

    pub fn score_drug_id(&self, graph: &KnowledgeGraph, drug_id: &str) -> Option<CandidateScore> {
        graph.drug(drug_id).map(|drug| self.score_drug(graph, drug))
    }

    pub fn tier(&self, composite: f64, sub_scores: &SubScores) -> ConfidenceTier {
        let tiers = &self.config.tiers;
        if composite >= tiers.high && sub_scores.non_zero_count() >= tiers.high_min_signals {
            ConfidenceTier::High
        } else if composite >= tiers.medium {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    fn score_with(
        &self,
        profile: &DiseaseProfile,
        graph: &KnowledgeGraph,
        drug: &DrugNode,
    ) -> CandidateScore {
        let targets = graph.drug_targets(&drug.id);

        let mut matched_strength: f64 = 0.0;
        let mut shared_genes = Vec::new();
        for (id, symbol, strength) in &profile.genes {
            if targets.contains(id) {
                matched_strength += strength;
                shared_genes.push(symbol.clone());
            }
        }
        let gene_target_score = if profile.top_k_total > 0.0 {
            clamp_unit(matched_strength / profile.top_k_total)
        } else {
            0.0
        };

        let drug_pathways = graph.drug_pathways(&drug.id);
        let shared_pathways: Vec<String> = profile
            .pathways
            .iter()
            .filter(|(id, _)| drug_pathways.contains(id))
            .map(|(_, name)| name.clone())
            .collect();
        let union = drug_pathways.union(&profile.pathway_ids).count();
        let pathway_overlap_score = if union > 0 {
            shared_pathways.len() as f64 / union as f64
        } else {
            0.0
        };

        let network_proximity_score = graph
            .shortest_path_len(
                &NodeId::drug(drug.id.clone()),
                graph.disease_id(),
                self.config.max_path_length,
            )
            .filter(|hops| *hops > 0)
            .map(|hops| 1.0 / hops as f64)
            .unwrap_or(0.0);

        let prior_evidence_score = clamp_unit(graph.historical_strength(&drug.id));

        let sub_scores = SubScores {
            gene_target_score,
            pathway_overlap_score,
            network_proximity_score,
            prior_evidence_score,
        };
        let composite_score = clamp_unit(
            self.config
                .weights
                .as_array()
                .iter()
                .zip(sub_scores.as_array())
                .map(|(w, s)| w * s)
                .sum::<f64>(),
        );

        CandidateScore {
            drug_id: drug.id.clone(),
            drug_name: drug.name.clone(),
            original_indication: drug.indication.clone(),
            composite_score,
            confidence: self.tier(composite_score, &sub_scores),
            sub_scores,
            mechanism: mechanism_text(drug, &shared_genes),
            shared_genes,
            shared_pathways,
            explanation: None,
        }
    }
}
