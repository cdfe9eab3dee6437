//! Rules that ship with the filter: market withdrawals and critical
//! drug–disease combinations.

use crate::rules::{ContraindicationRule, Matcher, RuleSet, Severity};

const CATALOG_SOURCE: &str = "builtin";

const WITHDRAWN: [&str; 8] = [
    "troglitazone",
    "rofecoxib",
    "cerivastatin",
    "fenfluramine",
    "terfenadine",
    "valdecoxib",
    "pemoline",
    "propoxyphene",
];

const CRITICAL: [(&str, &[&str], &str); 3] = [
    (
        "diabetes",
        &["olanzapine", "clozapine", "quetiapine", "risperidone"],
        "Atypical antipsychotics cause metabolic syndrome and diabetes",
    ),
    (
        "asthma",
        &["propranolol", "atenolol", "metoprolol", "nadolol", "timolol"],
        "Beta-blockers cause life-threatening bronchospasm",
    ),
    (
        "parkinson",
        &["perphenazine", "haloperidol", "olanzapine", "metoclopramide"],
        "Dopamine antagonists worsen Parkinson's symptoms",
    ),
];

/// Withdrawn drugs first, then disease-specific combinations. All Absolute.
pub fn builtin_rules() -> RuleSet {
    let withdrawn = WITHDRAWN.iter().map(|drug| {
        ContraindicationRule::new(
            Matcher::Name(drug.to_string()),
            Matcher::Any,
            Severity::Absolute,
            format!("{drug} has been withdrawn from the market"),
        )
        .with_source(CATALOG_SOURCE)
    });
    let critical = CRITICAL.iter().flat_map(|(disease, drugs, rationale)| {
        drugs.iter().map(move |drug| {
            ContraindicationRule::new(
                Matcher::Name(drug.to_string()),
                Matcher::Tag(disease.to_string()),
                Severity::Absolute,
                *rationale,
            )
            .with_source(CATALOG_SOURCE)
        })
    });
    RuleSet::from_trusted(withdrawn.chain(critical).collect())
}
