use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Disease,
    Gene,
    Pathway,
    Drug,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Disease => "disease",
            NodeKind::Gene => "gene",
            NodeKind::Pathway => "pathway",
            NodeKind::Drug => "drug",
        }
    }
}

/// Namespaced identifier shared by every node type. Two nodes are the same
/// node iff kind and id are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub kind: NodeKind,
    pub id: String,
}

impl NodeId {
    pub fn new(kind: NodeKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn disease(id: impl Into<String>) -> Self {
        Self::new(NodeKind::Disease, id)
    }

    pub fn gene(id: impl Into<String>) -> Self {
        Self::new(NodeKind::Gene, id)
    }

    pub fn pathway(id: impl Into<String>) -> Self {
        Self::new(NodeKind::Pathway, id)
    }

    pub fn drug(id: impl Into<String>) -> Self {
        Self::new(NodeKind::Drug, id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_rare: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneNode {
    pub id: String,
    pub symbol: String,
    /// Association strength to the queried disease, when the provider knows one.
    pub association: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayNode {
    pub id: String,
    pub name: String,
    pub genes: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugNode {
    pub id: String,
    pub name: String,
    pub indication: String,
    pub mechanism: Option<String>,
    pub targets: BTreeSet<String>,
    pub pathways: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub approved: bool,
    #[serde(default)]
    pub serious_adverse_events: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum Node {
    Disease(DiseaseNode),
    Gene(GeneNode),
    Pathway(PathwayNode),
    Drug(DrugNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Disease(_) => NodeKind::Disease,
            Node::Gene(_) => NodeKind::Gene,
            Node::Pathway(_) => NodeKind::Pathway,
            Node::Drug(_) => NodeKind::Drug,
        }
    }

    pub fn node_id(&self) -> NodeId {
        let id = match self {
            Node::Disease(n) => &n.id,
            Node::Gene(n) => &n.id,
            Node::Pathway(n) => &n.id,
            Node::Drug(n) => &n.id,
        };
        NodeId::new(self.kind(), id.clone())
    }

    /// Human-readable label: disease/pathway/drug name or gene symbol.
    pub fn label(&self) -> &str {
        match self {
            Node::Disease(n) => &n.name,
            Node::Gene(n) => &n.symbol,
            Node::Pathway(n) => &n.name,
            Node::Drug(n) => &n.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    DiseaseGene,
    DiseasePathway,
    GenePathway,
    DrugGene,
    DrugPathway,
    /// Historical drug–disease relation: prior off-label use or trial history.
    DrugDisease,
}

impl EdgeKind {
    pub fn endpoints(&self) -> (NodeKind, NodeKind) {
        match self {
            EdgeKind::DiseaseGene => (NodeKind::Disease, NodeKind::Gene),
            EdgeKind::DiseasePathway => (NodeKind::Disease, NodeKind::Pathway),
            EdgeKind::GenePathway => (NodeKind::Gene, NodeKind::Pathway),
            EdgeKind::DrugGene => (NodeKind::Drug, NodeKind::Gene),
            EdgeKind::DrugPathway => (NodeKind::Drug, NodeKind::Pathway),
            EdgeKind::DrugDisease => (NodeKind::Drug, NodeKind::Disease),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    pub provenance: BTreeSet<String>,
}

impl GraphEdge {
    pub fn new(
        kind: EdgeKind,
        source: NodeId,
        target: NodeId,
        weight: f64,
        provenance: impl Into<String>,
    ) -> Self {
        let mut tags = BTreeSet::new();
        tags.insert(provenance.into());
        Self {
            kind,
            source,
            target,
            weight: clamp_unit(weight),
            provenance: tags,
        }
    }
}

/// Immutable per request. Only obtainable through request validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseQuery {
    disease_name: String,
    min_score: f64,
    max_results: usize,
    explain: bool,
}

impl DiseaseQuery {
    /// Out-of-range values are clamped. Request validation rejects them
    /// before a query is ever built from user input.
    pub fn new(disease_name: &str, min_score: f64, max_results: usize, explain: bool) -> Self {
        Self {
            disease_name: normalize_name(disease_name),
            min_score: clamp_unit(min_score),
            max_results: max_results.max(1),
            explain,
        }
    }

    pub fn disease_name(&self) -> &str {
        &self.disease_name
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn explain(&self) -> bool {
        self.explain
    }
}

/// Clamp into [0,1]; NaN counts as zero.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Trim, lowercase and collapse internal whitespace. Used as the disease key.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

const DISEASE_TAGS: [(&str, &str); 26] = [
    ("parkinson", "parkinson"),
    ("alzheimer", "alzheimer"),
    ("type 2 diabetes", "diabetes"),
    ("diabetes mellitus", "diabetes"),
    ("diabetes", "diabetes"),
    ("asthma", "asthma"),
    ("chronic obstructive pulmonary disease", "copd"),
    ("copd", "copd"),
    ("epilepsy", "epilepsy"),
    ("seizure", "epilepsy"),
    ("high blood pressure", "hypertension"),
    ("hypertension", "hypertension"),
    ("heart failure", "heart_failure"),
    ("glaucoma", "glaucoma"),
    ("osteoporosis", "osteoporosis"),
    ("crohn", "crohn"),
    ("rheumatoid arthritis", "rheumatoid_arthritis"),
    ("major depressive disorder", "depression"),
    ("depression", "depression"),
    ("huntington", "huntington"),
    ("amyotrophic lateral sclerosis", "als"),
    ("gaucher", "gaucher"),
    ("wilson", "wilson"),
    ("cystic fibrosis", "cystic_fibrosis"),
    ("duchenne", "duchenne"),
    ("multiple myeloma", "multiple_myeloma"),
];

/// Map a disease name onto the canonical tag used by contraindication rules,
/// falling back to the snake-cased normalized name.
pub fn canonical_disease_tag(name: &str) -> String {
    let normalized = normalize_name(name);
    DISEASE_TAGS
        .iter()
        .find(|(needle, _)| normalized.contains(needle))
        .map(|(_, tag)| tag.to_string())
        .unwrap_or_else(|| normalized.replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_collapses_whitespace_and_case() {
        assert_eq!(normalize_name("  Parkinson   Disease "), "parkinson disease");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn canonical_tag_uses_known_mappings() {
        assert_eq!(canonical_disease_tag("Parkinson's Disease"), "parkinson");
        assert_eq!(canonical_disease_tag("Type 2 Diabetes"), "diabetes");
        assert_eq!(canonical_disease_tag("Crohn's disease"), "crohn");
        assert_eq!(canonical_disease_tag("Fabry Disease"), "fabry_disease");
    }

    #[test]
    fn node_id_display_is_namespaced() {
        assert_eq!(NodeId::gene("ENSG0001").to_string(), "gene:ENSG0001");
        assert!(NodeId::disease("z") < NodeId::gene("a"));
    }

    #[test]
    fn disease_query_clamps_out_of_range_values() {
        let query = DiseaseQuery::new(" Asthma ", 1.7, 0, false);
        assert_eq!(query.disease_name(), "asthma");
        assert_eq!(query.min_score(), 1.0);
        assert_eq!(query.max_results(), 1);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }

    #[test]
    fn edge_weight_is_clamped() {
        let edge = GraphEdge::new(
            EdgeKind::DrugGene,
            NodeId::drug("D1"),
            NodeId::gene("G1"),
            1.4,
            "chembl",
        );
        assert_eq!(edge.weight, 1.0);
        assert!(edge.provenance.contains("chembl"));
        assert_eq!(edge.kind.endpoints(), (NodeKind::Drug, NodeKind::Gene));
    }
}
