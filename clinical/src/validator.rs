use crate::evidence::{
    AdverseEventSummary, EvidenceBundle, LiteratureDirection, LiteratureSummary, TrialSummary,
};
use crate::mechanism::{assess_mechanism, DiseaseProfile, DrugProfile, MechanismVerdict};
use repurpose_core::config::ValidationConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdverseEventSignal {
    None,
    Weak,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub drug_name: String,
    pub disease_name: String,
    pub risk_level: RiskLevel,
    pub recommendation: String,
    pub trial_summary: Option<TrialSummary>,
    pub literature_summary: Option<LiteratureSummary>,
    pub adverse_event_summary: Option<AdverseEventSummary>,
    pub mechanism_verdict: MechanismVerdict,
    pub adverse_event_signal: AdverseEventSignal,
    /// Evidence bundles that could not be obtained.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_evidence: Vec<String>,
}

/// Deterministic rule table over trial presence, literature direction,
/// adverse-event strength and mechanism compatibility.
#[derive(Debug, Clone, Default)]
pub struct ClinicalValidator {
    thresholds: ValidationConfig,
}

impl ClinicalValidator {
    pub fn new(thresholds: ValidationConfig) -> Self {
        Self { thresholds }
    }

    pub fn adverse_event_signal(&self, events: Option<&AdverseEventSummary>) -> AdverseEventSignal {
        match events {
            Some(e) if e.serious_events >= self.thresholds.strong_adverse_event_threshold => {
                AdverseEventSignal::Strong
            }
            Some(e) if e.serious_events >= self.thresholds.weak_adverse_event_threshold => {
                AdverseEventSignal::Weak
            }
            _ => AdverseEventSignal::None,
        }
    }

    pub fn risk_level(
        active_trial: bool,
        literature: LiteratureDirection,
        adverse_events: AdverseEventSignal,
        mechanism: MechanismVerdict,
    ) -> RiskLevel {
        if mechanism == MechanismVerdict::Conflicting || adverse_events == AdverseEventSignal::Strong
        {
            return RiskLevel::High;
        }
        let negative_signal = adverse_events != AdverseEventSignal::None
            || literature == LiteratureDirection::Contradictory;
        if !negative_signal && active_trial {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        }
    }

    pub fn validate(
        &self,
        drug: &DrugProfile,
        disease: &DiseaseProfile,
        evidence: EvidenceBundle,
    ) -> ValidationReport {
        let mechanism_verdict = assess_mechanism(drug, disease);
        let adverse_event_signal = self.adverse_event_signal(evidence.adverse_events.as_ref());
        let active_trial = evidence
            .trials
            .as_ref()
            .map(TrialSummary::has_active_trial)
            .unwrap_or(false);
        let literature = evidence
            .literature
            .as_ref()
            .map(LiteratureSummary::direction)
            .unwrap_or(LiteratureDirection::Absent);

        let risk_level =
            Self::risk_level(active_trial, literature, adverse_event_signal, mechanism_verdict);
        let recommendation = recommendation(
            risk_level,
            &drug.name,
            &disease.name,
            mechanism_verdict,
        );
        info!(
            drug = %drug.name,
            disease = %disease.name,
            risk = ?risk_level,
            "clinical validation complete"
        );

        ValidationReport {
            drug_name: drug.name.clone(),
            disease_name: disease.name.clone(),
            risk_level,
            recommendation,
            missing_evidence: evidence.missing().into_iter().map(str::to_string).collect(),
            trial_summary: evidence.trials,
            literature_summary: evidence.literature,
            adverse_event_summary: evidence.adverse_events,
            mechanism_verdict,
            adverse_event_signal,
        }
    }
}

fn recommendation(
    risk: RiskLevel,
    drug: &str,
    disease: &str,
    mechanism: MechanismVerdict,
) -> String {
    match risk {
        RiskLevel::High if mechanism == MechanismVerdict::Conflicting => format!(
            "Not recommended: the mechanism of {drug} is expected to worsen {disease}."
        ),
        RiskLevel::High => format!(
            "Not recommended: {drug} carries a strong serious adverse-event signal."
        ),
        RiskLevel::Medium => format!(
            "Proceed with caution: evidence for {drug} in {disease} is incomplete or mixed; further review needed."
        ),
        RiskLevel::Low => format!(
            "Promising: {drug} has active clinical investigation relevant to {disease} and no negative safety signal."
        ),
    }
}
