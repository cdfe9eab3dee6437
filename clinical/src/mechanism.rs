use repurpose_core::model::canonical_disease_tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrugProfile {
    pub name: String,
    pub mechanism: Option<String>,
    pub targets: BTreeSet<String>,
    pub pathways: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseProfile {
    pub name: String,
    pub genes: BTreeSet<String>,
    pub pathways: BTreeSet<String>,
    /// Mechanism phrases known to worsen the disease.
    pub harmful_mechanisms: Vec<String>,
}

impl DiseaseProfile {
    /// Caller-supplied harmful mechanisms plus the known ones for the
    /// disease's canonical tag.
    pub fn harmful_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = self
            .harmful_mechanisms
            .iter()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        terms.extend(
            known_harmful_mechanisms(&canonical_disease_tag(&self.name))
                .iter()
                .map(|term| term.to_string()),
        );
        terms.sort();
        terms.dedup();
        terms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanismVerdict {
    Compatible,
    Unknown,
    Conflicting,
}

pub fn known_harmful_mechanisms(disease_tag: &str) -> &'static [&'static str] {
    match disease_tag {
        "parkinson" => &["dopamine antagonist", "dopamine d2 antagonist"],
        "asthma" | "copd" => &["beta blocker", "beta-blocker", "beta adrenergic antagonist"],
        "diabetes" => &["atypical antipsychotic"],
        "epilepsy" => &["seizure threshold lowering"],
        "glaucoma" => &["anticholinergic"],
        "heart_failure" => &["negative inotrope"],
        _ => &[],
    }
}

pub fn assess_mechanism(drug: &DrugProfile, disease: &DiseaseProfile) -> MechanismVerdict {
    if let Some(mechanism) = drug.mechanism.as_deref() {
        let mechanism = mechanism.to_lowercase();
        if disease
            .harmful_terms()
            .iter()
            .any(|term| mechanism.contains(term.as_str()))
        {
            return MechanismVerdict::Conflicting;
        }
    }
    let shares_target = !drug.targets.is_disjoint(&disease.genes);
    let shares_pathway = !drug.pathways.is_disjoint(&disease.pathways);
    if shares_target || shares_pathway {
        MechanismVerdict::Compatible
    } else {
        MechanismVerdict::Unknown
    }
}
