pub mod evidence;
pub mod mechanism;
pub mod provider;
pub mod validator;

pub use evidence::{AdverseEventSummary, EvidenceBundle, LiteratureSummary, TrialSummary};
pub use mechanism::{assess_mechanism, DiseaseProfile, DrugProfile, MechanismVerdict};
pub use provider::{EvidenceError, EvidenceProvider, StaticEvidenceProvider};
pub use validator::{AdverseEventSignal, ClinicalValidator, RiskLevel, ValidationReport};
