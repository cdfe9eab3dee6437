pub mod explain;
pub mod scorer;

pub use explain::{explanation_text, mechanism_text};
pub use scorer::{apply_threshold, compare_candidates, CandidateScore, ConfidenceTier, Scorer, SubScores};
