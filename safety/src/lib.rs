pub mod catalog;
pub mod filter;
pub mod rules;

pub use filter::{AdmissibleCandidate, FilteredCandidate, SafetyFilter, SafetyPartition, SafetyWarning};
pub use rules::{ContraindicationRule, Matcher, RuleSet, RuleSetError, Severity};
