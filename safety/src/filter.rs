use crate::catalog::builtin_rules;
use crate::rules::{ContraindicationRule, Matcher, RuleSet, RuleSetError, Severity};
use graph::KnowledgeGraph;
use repurpose_core::config::SafetyConfig;
use repurpose_core::model::{DiseaseNode, DrugNode};
use scoring::CandidateScore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyWarning {
    pub severity: Severity,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissibleCandidate {
    #[serde(flatten)]
    pub candidate: CandidateScore,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety_warnings: Vec<SafetyWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredCandidate {
    #[serde(flatten)]
    pub candidate: CandidateScore,
    pub severity: Severity,
    pub reason: String,
    pub rule: ContraindicationRule,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SafetyPartition {
    pub admissible: Vec<AdmissibleCandidate>,
    pub filtered: Vec<FilteredCandidate>,
}

enum Verdict {
    Admit(Vec<SafetyWarning>),
    Filter(ContraindicationRule),
}

#[derive(Debug, Clone)]
pub struct SafetyFilter {
    rules: RuleSet,
    strict: bool,
    adverse_event_threshold: Option<u32>,
}

impl SafetyFilter {
    pub fn new(rules: RuleSet, strict: bool) -> Self {
        Self {
            rules,
            strict,
            adverse_event_threshold: None,
        }
    }

    /// Drugs with at least `threshold` serious adverse-event reports get a
    /// Relative contraindication. `None` disables the check.
    pub fn with_adverse_event_threshold(mut self, threshold: Option<u32>) -> Self {
        self.adverse_event_threshold = threshold;
        self
    }

    /// Built-in catalog (unless disabled) plus the optional rules file.
    pub fn from_config(config: &SafetyConfig) -> Result<Self, RuleSetError> {
        let mut rules = if config.use_builtin_rules {
            builtin_rules()
        } else {
            RuleSet::new()
        };
        if let Some(path) = &config.rules_path {
            let extra = RuleSet::load(Path::new(path))?;
            debug!(path = %path, rules = extra.len(), "loaded contraindication rules");
            rules.extend(extra);
        }
        Ok(Self::new(rules, config.strict).with_adverse_event_threshold(
            config
                .use_adverse_events
                .then_some(config.serious_event_threshold),
        ))
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn adverse_event_rule(
        &self,
        drug: &DrugNode,
        disease: &DiseaseNode,
    ) -> Option<ContraindicationRule> {
        let threshold = self.adverse_event_threshold?;
        let reports = drug.serious_adverse_events?;
        if reports < threshold {
            return None;
        }
        Some(
            ContraindicationRule::new(
                Matcher::Id(drug.id.clone()),
                Matcher::Id(disease.id.clone()),
                Severity::Relative,
                format!("High rate of serious adverse events ({reports} reports)"),
            )
            .with_source("adverse_events"),
        )
    }

    fn evaluate(&self, drug: &DrugNode, disease: &DiseaseNode) -> Verdict {
        let mut relative = Vec::new();
        for rule in self.rules.matching(drug, disease) {
            match rule.severity {
                Severity::Absolute => return Verdict::Filter(rule.clone()),
                Severity::Relative => relative.push(rule.clone()),
            }
        }
        relative.extend(self.adverse_event_rule(drug, disease));
        if self.strict && !relative.is_empty() {
            return Verdict::Filter(relative.remove(0));
        }
        Verdict::Admit(
            relative
                .into_iter()
                .map(|rule| SafetyWarning {
                    severity: rule.severity,
                    rationale: rule.rationale,
                })
                .collect(),
        )
    }

    /// Split ranked candidates into admissible and filtered, preserving
    /// order within each side. Scores are moved, never altered.
    pub fn partition(
        &self,
        candidates: Vec<CandidateScore>,
        graph: &KnowledgeGraph,
    ) -> SafetyPartition {
        let disease = graph.disease();
        let mut partition = SafetyPartition::default();

        for candidate in candidates {
            let fallback;
            let drug = match graph.drug(&candidate.drug_id) {
                Some(drug) => drug,
                None => {
                    fallback = DrugNode {
                        id: candidate.drug_id.clone(),
                        name: candidate.drug_name.clone(),
                        indication: candidate.original_indication.clone(),
                        mechanism: None,
                        targets: BTreeSet::new(),
                        pathways: BTreeSet::new(),
                        tags: BTreeSet::new(),
                        approved: true,
                        serious_adverse_events: None,
                    };
                    &fallback
                }
            };

            match self.evaluate(drug, disease) {
                Verdict::Filter(rule) => {
                    debug!(drug = %candidate.drug_name, severity = ?rule.severity, "candidate filtered");
                    partition.filtered.push(FilteredCandidate {
                        candidate,
                        severity: rule.severity,
                        reason: rule.rationale.clone(),
                        rule,
                    });
                }
                Verdict::Admit(safety_warnings) => {
                    partition.admissible.push(AdmissibleCandidate {
                        candidate,
                        safety_warnings,
                    });
                }
            }
        }

        info!(
            disease = %disease.name,
            admissible = partition.admissible.len(),
            filtered = partition.filtered.len(),
            strict = self.strict,
            "safety filter applied"
        );
        partition
    }
}
