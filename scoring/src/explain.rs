//! Templated mechanism and explanation text. No language model involved:
//! every string is a deterministic function of the candidate.

use crate::scorer::CandidateScore;
use repurpose_core::model::DrugNode;

const MAX_LISTED_GENES: usize = 3;
const MAX_LISTED_PATHWAYS: usize = 2;
const UNCHARACTERIZED: &str = "Mechanism not characterized";
const TARGET_PREFIX: &str = "Modulator of ";
const OFF_DISEASE_PREFIX: &str = "Acts on ";

/// True when the text came from the drug record rather than from targets.
fn is_declared(mechanism: &str) -> bool {
    !mechanism.is_empty()
        && mechanism != UNCHARACTERIZED
        && !mechanism.starts_with(TARGET_PREFIX)
        && !mechanism.starts_with(OFF_DISEASE_PREFIX)
}

/// Declared mechanism when the source has one, otherwise a description of the
/// shared targets.
pub fn mechanism_text(drug: &DrugNode, shared_genes: &[String]) -> String {
    if let Some(mechanism) = drug.mechanism.as_deref().map(str::trim) {
        if !mechanism.is_empty() {
            return mechanism.to_string();
        }
    }
    if !shared_genes.is_empty() {
        return format!(
            "{TARGET_PREFIX}{}",
            list_with_overflow(shared_genes, MAX_LISTED_GENES, "others")
        );
    }
    match drug.targets.len() {
        0 => UNCHARACTERIZED.to_string(),
        1 => format!("{OFF_DISEASE_PREFIX}1 target outside the disease gene set"),
        n => format!("{OFF_DISEASE_PREFIX}{n} targets outside the disease gene set"),
    }
}

fn list_with_overflow(items: &[String], limit: usize, overflow_noun: &str) -> String {
    let mut listed = items
        .iter()
        .take(limit)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > limit {
        listed.push_str(&format!(" and {} {overflow_noun}", items.len() - limit));
    }
    listed
}

pub fn score_summary(candidate: &CandidateScore) -> String {
    let s = &candidate.sub_scores;
    format!(
        "Composite {:.2} ({:?} confidence): gene targets {:.2}, pathway overlap {:.2}, network proximity {:.2}, prior evidence {:.2}.",
        candidate.composite_score,
        candidate.confidence,
        s.gene_target_score,
        s.pathway_overlap_score,
        s.network_proximity_score,
        s.prior_evidence_score,
    )
}

pub fn explanation_text(disease_name: &str, candidate: &CandidateScore) -> String {
    let mut parts = Vec::new();
    if !candidate.shared_genes.is_empty() {
        parts.push(format!(
            "{} targets {}, which are implicated in {}",
            candidate.drug_name,
            list_with_overflow(&candidate.shared_genes, MAX_LISTED_GENES, "others"),
            disease_name
        ));
    }
    if !candidate.shared_pathways.is_empty() {
        parts.push(format!(
            "modulates {}",
            list_with_overflow(
                &candidate.shared_pathways,
                MAX_LISTED_PATHWAYS,
                "other pathways"
            )
        ));
    }
    if is_declared(&candidate.mechanism) {
        parts.push(format!(
            "Its mechanism as a {} may address underlying pathological processes",
            candidate.mechanism.to_lowercase()
        ));
    }

    let body = if parts.is_empty() {
        format!(
            "{} shows potential based on computational analysis of molecular signatures associated with {}.",
            candidate.drug_name, disease_name
        )
    } else {
        format!("{}.", parts.join(". "))
    };
    format!("{body} {}", score_summary(candidate))
}
