use repurpose_core::error::{ErrorCode, RepurposeError};
use repurpose_core::model::{normalize_name, DiseaseNode, DrugNode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("failed to read rule file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed rule file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid rule #{index}: {reason}")]
    Invalid { index: usize, reason: String },
}

impl RepurposeError for RuleSetError {
    fn error_code(&self) -> ErrorCode {
        ErrorCode::Internal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Always filters.
    Absolute,
    /// Filters only in strict mode; otherwise a warning.
    Relative,
}

/// One side of a rule. Comparisons are exact after case and whitespace
/// normalization; there is no substring or fuzzy matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Matcher {
    Id(String),
    Tag(String),
    Name(String),
    Any,
}

impl Matcher {
    fn value_matches(expected: &str, actual: &str) -> bool {
        normalize_name(expected) == normalize_name(actual)
    }

    pub fn matches_drug(&self, drug: &DrugNode) -> bool {
        match self {
            Matcher::Id(id) => Self::value_matches(id, &drug.id),
            Matcher::Tag(tag) => drug.tags.iter().any(|t| Self::value_matches(tag, t)),
            Matcher::Name(name) => Self::value_matches(name, &drug.name),
            Matcher::Any => true,
        }
    }

    pub fn matches_disease(&self, disease: &DiseaseNode) -> bool {
        match self {
            Matcher::Id(id) => Self::value_matches(id, &disease.id),
            Matcher::Tag(tag) => disease.tags.iter().any(|t| Self::value_matches(tag, t)),
            Matcher::Name(name) => Self::value_matches(name, &disease.name),
            Matcher::Any => true,
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Matcher::Id(v) | Matcher::Tag(v) | Matcher::Name(v) => v.trim().is_empty(),
            Matcher::Any => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContraindicationRule {
    pub drug: Matcher,
    pub disease: Matcher,
    pub severity: Severity,
    pub rationale: String,
    #[serde(default)]
    pub source: String,
}

impl ContraindicationRule {
    pub fn new(
        drug: Matcher,
        disease: Matcher,
        severity: Severity,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            drug,
            disease,
            severity,
            rationale: rationale.into(),
            source: String::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn applies_to(&self, drug: &DrugNode, disease: &DiseaseNode) -> bool {
        self.drug.matches_drug(drug) && self.disease.matches_disease(disease)
    }
}

/// Ordered rule list. Evaluation order is insertion order. Deserializes as
/// a plain array and is validated like [`RuleSet::with_rules`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<ContraindicationRule>",
    into = "Vec<ContraindicationRule>"
)]
pub struct RuleSet {
    rules: Vec<ContraindicationRule>,
}

impl TryFrom<Vec<ContraindicationRule>> for RuleSet {
    type Error = RuleSetError;

    fn try_from(rules: Vec<ContraindicationRule>) -> Result<Self, Self::Error> {
        Self::with_rules(rules)
    }
}

impl From<RuleSet> for Vec<ContraindicationRule> {
    fn from(set: RuleSet) -> Self {
        set.rules
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<ContraindicationRule>) -> Result<Self, RuleSetError> {
        let set = Self { rules };
        set.validate()?;
        Ok(set)
    }

    /// Skips validation; for rule lists compiled into the crate.
    pub(crate) fn from_trusted(rules: Vec<ContraindicationRule>) -> Self {
        Self { rules }
    }

    /// Parse a JSON array of rules.
    pub fn from_json(raw: &str) -> Result<Self, RuleSetError> {
        let rules: Vec<ContraindicationRule> = serde_json::from_str(raw)?;
        Self::try_from(rules)
    }

    pub fn load(path: &Path) -> Result<Self, RuleSetError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    fn validate(&self) -> Result<(), RuleSetError> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.drug.is_blank() || rule.disease.is_blank() {
                return Err(RuleSetError::Invalid {
                    index,
                    reason: "matcher value is empty".to_string(),
                });
            }
            if rule.drug == Matcher::Any && rule.disease == Matcher::Any {
                return Err(RuleSetError::Invalid {
                    index,
                    reason: "rule would match every drug for every disease".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn push(&mut self, rule: ContraindicationRule) -> Result<(), RuleSetError> {
        self.rules.push(rule);
        if let Err(err) = self.validate() {
            self.rules.pop();
            return Err(err);
        }
        Ok(())
    }

    pub fn extend(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContraindicationRule> {
        self.rules.iter()
    }

    pub fn matching<'a>(
        &'a self,
        drug: &'a DrugNode,
        disease: &'a DiseaseNode,
    ) -> impl Iterator<Item = &'a ContraindicationRule> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.applies_to(drug, disease))
    }
}
