use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialSummary {
    /// Recruiting or active trials of this drug for this or a related indication.
    pub active_trials: u32,
    pub completed_trials: u32,
    pub terminated_trials: u32,
    pub trial_ids: Vec<String>,
}

impl TrialSummary {
    pub fn has_active_trial(&self) -> bool {
        self.active_trials > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteratureDirection {
    Supportive,
    Contradictory,
    Mixed,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteratureSummary {
    pub supporting: u32,
    pub contradicting: u32,
    pub neutral: u32,
    pub pmids: Vec<String>,
}

impl LiteratureSummary {
    pub fn direction(&self) -> LiteratureDirection {
        match (self.supporting, self.contradicting) {
            (0, 0) => LiteratureDirection::Absent,
            (s, c) if s > c => LiteratureDirection::Supportive,
            (s, c) if c > s => LiteratureDirection::Contradictory,
            _ => LiteratureDirection::Mixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdverseEventSummary {
    pub serious_events: u32,
    pub total_reports: u32,
    pub top_reactions: Vec<String>,
}

/// Evidence gathered for one drug–disease pair. Any bundle may be missing
/// when its source was unavailable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceBundle {
    pub trials: Option<TrialSummary>,
    pub literature: Option<LiteratureSummary>,
    pub adverse_events: Option<AdverseEventSummary>,
}

impl EvidenceBundle {
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.trials.is_none() {
            missing.push("trials");
        }
        if self.literature.is_none() {
            missing.push("literature");
        }
        if self.adverse_events.is_none() {
            missing.push("adverse_events");
        }
        missing
    }
}
