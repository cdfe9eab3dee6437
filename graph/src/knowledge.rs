use crate::error::GraphError;
use crate::index::AdjacencyIndex;
use repurpose_core::model::{
    DiseaseNode, DrugNode, EdgeKind, GeneNode, GraphEdge, Node, NodeId, NodeKind, PathwayNode,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Edges are unique per (relation, source, target).
pub type EdgeKey = (EdgeKind, NodeId, NodeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeTypeCounts {
    pub gene: usize,
    pub drug: usize,
    pub pathway: usize,
    pub disease: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub node_types: NodeTypeCounts,
    pub density: f64,
}

/// Heterogeneous graph for a single disease query. Owned by one request;
/// ordered containers keep every iteration deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeGraph {
    disease: NodeId,
    disease_node: DiseaseNode,
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeKey, GraphEdge>,
    index: AdjacencyIndex,
}

impl KnowledgeGraph {
    pub fn new(disease: DiseaseNode) -> Self {
        let id = NodeId::disease(disease.id.clone());
        let mut index = AdjacencyIndex::new();
        index.add_node(id.clone());
        let mut nodes = BTreeMap::new();
        nodes.insert(id.clone(), Node::Disease(disease.clone()));
        Self {
            disease: id,
            disease_node: disease,
            nodes,
            edges: BTreeMap::new(),
            index,
        }
    }

    /// Insert or replace a node. The disease node itself cannot be replaced.
    pub fn upsert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if node.kind() == NodeKind::Disease {
            return Err(GraphError::InvalidRecord(format!(
                "graph already scoped to {}",
                self.disease
            )));
        }
        let id = node.node_id();
        self.index.add_node(id.clone());
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Add an edge, or merge it into an existing one: the higher weight wins
    /// and provenance tags accumulate.
    pub fn merge_edge(&mut self, edge: GraphEdge) -> Result<(), GraphError> {
        let (source_kind, target_kind) = edge.kind.endpoints();
        if edge.source.kind != source_kind || edge.target.kind != target_kind {
            return Err(GraphError::InvalidRecord(format!(
                "{:?} edge cannot join {} and {}",
                edge.kind, edge.source, edge.target
            )));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::InvalidRecord(format!(
                    "edge references missing node {endpoint}"
                )));
            }
        }

        let key = (edge.kind, edge.source.clone(), edge.target.clone());
        match self.edges.get_mut(&key) {
            Some(existing) => {
                if edge.weight > existing.weight {
                    existing.weight = edge.weight;
                }
                existing.provenance.extend(edge.provenance);
            }
            None => {
                self.index.add_edge(&edge.source, &edge.target, edge.kind);
                self.edges.insert(key, edge);
            }
        }
        Ok(())
    }

    pub fn disease_id(&self) -> &NodeId {
        &self.disease
    }

    pub fn disease(&self) -> &DiseaseNode {
        &self.disease_node
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values()
    }

    pub fn edge(&self, kind: EdgeKind, source: &NodeId, target: &NodeId) -> Option<&GraphEdge> {
        self.edges
            .get(&(kind, source.clone(), target.clone()))
    }

    pub fn gene(&self, id: &str) -> Option<&GeneNode> {
        match self.nodes.get(&NodeId::gene(id)) {
            Some(Node::Gene(gene)) => Some(gene),
            _ => None,
        }
    }

    pub fn pathway(&self, id: &str) -> Option<&PathwayNode> {
        match self.nodes.get(&NodeId::pathway(id)) {
            Some(Node::Pathway(pathway)) => Some(pathway),
            _ => None,
        }
    }

    pub fn drug(&self, id: &str) -> Option<&DrugNode> {
        match self.nodes.get(&NodeId::drug(id)) {
            Some(Node::Drug(drug)) => Some(drug),
            _ => None,
        }
    }

    pub fn drugs(&self) -> impl Iterator<Item = &DrugNode> {
        self.nodes.values().filter_map(|node| match node {
            Node::Drug(drug) => Some(drug),
            _ => None,
        })
    }

    fn neighbors_of_kind(&self, id: &NodeId, relation: EdgeKind) -> BTreeSet<String> {
        self.index
            .neighbors(id)
            .iter()
            .filter(|(_, kind)| *kind == relation)
            .map(|(node, _)| node.id.clone())
            .collect()
    }

    /// Disease-associated genes with their association strength, strongest
    /// first; ties broken by symbol then id.
    pub fn disease_genes(&self) -> Vec<(&GeneNode, f64)> {
        let mut out: Vec<(&GeneNode, f64)> = self
            .edges
            .values()
            .filter(|edge| edge.kind == EdgeKind::DiseaseGene)
            .filter_map(|edge| self.gene(&edge.target.id).map(|gene| (gene, edge.weight)))
            .collect();
        out.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.symbol.cmp(&b.0.symbol))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        out
    }

    /// Disease-associated pathways, strongest enrichment first.
    pub fn disease_pathways(&self) -> Vec<(&PathwayNode, f64)> {
        let mut out: Vec<(&PathwayNode, f64)> = self
            .edges
            .values()
            .filter(|edge| edge.kind == EdgeKind::DiseasePathway)
            .filter_map(|edge| {
                self.pathway(&edge.target.id)
                    .map(|pathway| (pathway, edge.weight))
            })
            .collect();
        out.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.name.cmp(&b.0.name))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        out
    }

    pub fn drug_targets(&self, drug_id: &str) -> BTreeSet<String> {
        self.neighbors_of_kind(&NodeId::drug(drug_id), EdgeKind::DrugGene)
    }

    /// Pathways modulated directly by the drug plus every pathway containing
    /// one of its targets.
    pub fn drug_pathways(&self, drug_id: &str) -> BTreeSet<String> {
        let mut pathways = self.neighbors_of_kind(&NodeId::drug(drug_id), EdgeKind::DrugPathway);
        for target in self.drug_targets(drug_id) {
            pathways.extend(self.neighbors_of_kind(&NodeId::gene(target), EdgeKind::GenePathway));
        }
        pathways
    }

    /// Strongest historical drug–disease edge weight, 0 if none.
    pub fn historical_strength(&self, drug_id: &str) -> f64 {
        self.edge(EdgeKind::DrugDisease, &NodeId::drug(drug_id), &self.disease)
            .map(|edge| edge.weight)
            .unwrap_or(0.0)
    }

    pub fn shortest_path_len(&self, from: &NodeId, to: &NodeId, max_hops: usize) -> Option<usize> {
        self.index.shortest_path_len(from, to, max_hops)
    }

    /// Drugs linked to the disease through a shared gene, a shared pathway
    /// (direct or via a target gene) or a historical association, by id.
    /// Paths that pass through another drug do not count.
    pub fn candidate_drugs(&self) -> Vec<&DrugNode> {
        let disease_genes: BTreeSet<String> =
            self.neighbors_of_kind(&self.disease, EdgeKind::DiseaseGene);
        let disease_pathways: BTreeSet<String> =
            self.neighbors_of_kind(&self.disease, EdgeKind::DiseasePathway);
        self.drugs()
            .filter(|drug| {
                !self.drug_targets(&drug.id).is_disjoint(&disease_genes)
                    || !self.drug_pathways(&drug.id).is_disjoint(&disease_pathways)
                    || self
                        .edge(EdgeKind::DrugDisease, &NodeId::drug(drug.id.clone()), &self.disease)
                        .is_some()
            })
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        let mut node_types = NodeTypeCounts::default();
        for node in self.nodes.values() {
            match node.kind() {
                NodeKind::Disease => node_types.disease += 1,
                NodeKind::Gene => node_types.gene += 1,
                NodeKind::Pathway => node_types.pathway += 1,
                NodeKind::Drug => node_types.drug += 1,
            }
        }
        let n = self.nodes.len();
        let e = self.edges.len();
        let density = if n > 1 {
            e as f64 / (n as f64 * (n as f64 - 1.0))
        } else {
            0.0
        };
        GraphStats {
            total_nodes: n,
            total_edges: e,
            node_types,
            density: (density * 10_000.0).round() / 10_000.0,
        }
    }

    /// SHA-256 over the canonical node and edge listing. Equal fingerprints
    /// mean equal node sets and equal edge weights.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (id, node) in &self.nodes {
            hasher.update(format!("node|{id}|{node:?}\n").as_bytes());
        }
        for edge in self.edges.values() {
            hasher.update(
                format!(
                    "edge|{:?}|{}|{}|{:?}|{:?}\n",
                    edge.kind, edge.source, edge.target, edge.weight, edge.provenance
                )
                .as_bytes(),
            );
        }
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}
