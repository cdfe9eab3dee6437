use crate::cache::GraphCache;
use crate::error::GraphError;
use crate::knowledge::KnowledgeGraph;
use crate::provider::{RecordProvider, RecordSet};
use repurpose_core::config::AppConfig;
use repurpose_core::error::PartialData;
use repurpose_core::model::{
    canonical_disease_tag, clamp_unit, DiseaseNode, DrugNode, EdgeKind, GeneNode, GraphEdge, Node,
    NodeId, PathwayNode,
};
use repurpose_core::progress::{ProgressEvent, ProgressSink, Stage};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    /// Used for disease genes whose association strength is unknown.
    pub default_gene_association: f64,
    pub target_edge_weight: f64,
    pub drug_pathway_weight: f64,
    pub disease_pathway_weight: f64,
    pub summary_top_genes: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_gene_association: 0.5,
            target_edge_weight: 0.8,
            drug_pathway_weight: 0.6,
            disease_pathway_weight: 0.7,
            summary_top_genes: 10,
        }
    }
}

impl GraphConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            default_gene_association: config.scoring.default_gene_association,
            summary_top_genes: config.analysis.summary_top_genes,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneSummary {
    pub id: String,
    pub symbol: String,
    pub association: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_rare: bool,
    pub gene_count: usize,
    pub pathway_count: usize,
    pub active_trials: u32,
    pub top_genes: Vec<GeneSummary>,
}

/// Output of one build: the graph plus everything the result needs to report
/// about how it was assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltGraph {
    pub graph: KnowledgeGraph,
    pub summary: DiseaseSummary,
    pub warnings: Vec<PartialData>,
    pub data_sources: BTreeSet<String>,
    pub drugs_analyzed: usize,
}

fn edge_weight(value: f64) -> f64 {
    if value.is_finite() {
        clamp_unit(value)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    config: GraphConfig,
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Assemble the graph for one disease. Pure: the same record set always
    /// yields the same graph.
    pub fn build(
        &self,
        records: &RecordSet,
        sink: &dyn ProgressSink,
    ) -> Result<BuiltGraph, GraphError> {
        let disease_record = &records.disease;
        if disease_record.id.trim().is_empty() {
            return Err(GraphError::InvalidRecord(
                "disease record has no identifier".to_string(),
            ));
        }

        sink.emit(ProgressEvent::with_data(
            Stage::GraphBuilding,
            format!("Building knowledge graph for {}", disease_record.name),
            json!({ "disease_id": disease_record.id }),
        ))?;

        let mut tags = disease_record.tags.clone();
        tags.insert(canonical_disease_tag(&disease_record.name));
        let disease = DiseaseNode {
            id: disease_record.id.clone(),
            name: disease_record.name.clone(),
            description: disease_record.description.clone(),
            is_rare: disease_record.is_rare,
            tags,
        };
        let disease_id = NodeId::disease(disease.id.clone());
        let mut graph = KnowledgeGraph::new(disease);
        let mut data_sources = BTreeSet::new();

        // Disease genes: strongest reported association wins.
        let mut genes: BTreeMap<&str, GeneNode> = BTreeMap::new();
        let mut gene_edges: Vec<GraphEdge> = Vec::new();
        for record in &records.genes {
            if record.id.trim().is_empty() {
                debug!(source = %record.source, "skipping gene record without id");
                continue;
            }
            data_sources.insert(record.source.clone());
            let strength =
                edge_weight(record.association.unwrap_or(self.config.default_gene_association));
            let gene = genes.entry(record.id.as_str()).or_insert_with(|| GeneNode {
                id: record.id.clone(),
                symbol: String::new(),
                association: None,
            });
            if gene.symbol.is_empty() && !record.symbol.is_empty() {
                gene.symbol = record.symbol.clone();
            }
            gene.association = Some(gene.association.map_or(strength, |s| s.max(strength)));
            gene_edges.push(GraphEdge::new(
                EdgeKind::DiseaseGene,
                disease_id.clone(),
                NodeId::gene(record.id.clone()),
                strength,
                record.source.clone(),
            ));
        }

        // Drugs, merged by id.
        let mut drugs: BTreeMap<&str, DrugNode> = BTreeMap::new();
        let mut target_edges: Vec<GraphEdge> = Vec::new();
        for record in &records.drugs {
            if record.id.trim().is_empty() {
                debug!(source = %record.source, "skipping drug record without id");
                continue;
            }
            data_sources.insert(record.source.clone());
            let drug = drugs.entry(record.id.as_str()).or_insert_with(|| DrugNode {
                id: record.id.clone(),
                name: record.name.clone(),
                indication: record.indication.clone(),
                mechanism: None,
                targets: BTreeSet::new(),
                pathways: BTreeSet::new(),
                tags: BTreeSet::new(),
                approved: record.approved,
                serious_adverse_events: None,
            });
            if drug.mechanism.is_none() {
                drug.mechanism = record.mechanism.clone();
            }
            drug.approved &= record.approved;
            drug.serious_adverse_events = drug
                .serious_adverse_events
                .max(record.serious_adverse_events);
            drug.pathways.extend(record.pathways.iter().cloned());
            drug.tags.extend(record.tags.iter().map(|tag| tag.to_lowercase()));

            for target in &record.targets {
                if target.gene_id.trim().is_empty() {
                    continue;
                }
                data_sources.insert(target.source.clone());
                drug.targets.insert(target.gene_id.clone());
                // Off-disease targets still become gene nodes, without association.
                let gene = genes.entry(target.gene_id.as_str()).or_insert_with(|| GeneNode {
                    id: target.gene_id.clone(),
                    symbol: String::new(),
                    association: None,
                });
                if gene.symbol.is_empty() {
                    if let Some(symbol) = target.symbol.as_ref().filter(|s| !s.is_empty()) {
                        gene.symbol = symbol.clone();
                    }
                }
                target_edges.push(GraphEdge::new(
                    EdgeKind::DrugGene,
                    NodeId::drug(record.id.clone()),
                    NodeId::gene(target.gene_id.clone()),
                    edge_weight(target.confidence.unwrap_or(self.config.target_edge_weight)),
                    target.source.clone(),
                ));
            }
        }

        // Pathways, membership unioned across sources.
        let mut pathways: BTreeMap<&str, PathwayNode> = BTreeMap::new();
        let mut pathway_edges: Vec<GraphEdge> = Vec::new();
        for record in &records.pathways {
            if record.id.trim().is_empty() {
                continue;
            }
            data_sources.insert(record.source.clone());
            let pathway = pathways.entry(record.id.as_str()).or_insert_with(|| PathwayNode {
                id: record.id.clone(),
                name: record.name.clone(),
                genes: BTreeSet::new(),
            });
            pathway.genes.extend(record.genes.iter().cloned());
            pathway_edges.push(GraphEdge::new(
                EdgeKind::DiseasePathway,
                disease_id.clone(),
                NodeId::pathway(record.id.clone()),
                edge_weight(record.association.unwrap_or(self.config.disease_pathway_weight)),
                record.source.clone(),
            ));
        }

        for mut gene in genes.into_values() {
            if gene.symbol.is_empty() {
                gene.symbol = gene.id.clone();
            }
            graph.upsert_node(Node::Gene(gene))?;
        }
        for pathway in pathways.values() {
            graph.upsert_node(Node::Pathway(pathway.clone()))?;
            for gene_id in &pathway.genes {
                let gene = NodeId::gene(gene_id.clone());
                if graph.node(&gene).is_some() {
                    graph.merge_edge(GraphEdge::new(
                        EdgeKind::GenePathway,
                        gene,
                        NodeId::pathway(pathway.id.clone()),
                        1.0,
                        "pathway_membership",
                    ))?;
                }
            }
        }
        let drugs_analyzed = drugs.len();
        for drug in drugs.values() {
            graph.upsert_node(Node::Drug(drug.clone()))?;
            for pathway_id in &drug.pathways {
                if pathways.contains_key(pathway_id.as_str()) {
                    graph.merge_edge(GraphEdge::new(
                        EdgeKind::DrugPathway,
                        NodeId::drug(drug.id.clone()),
                        NodeId::pathway(pathway_id.clone()),
                        self.config.drug_pathway_weight,
                        "drug_pathway",
                    ))?;
                }
            }
        }
        for edge in gene_edges
            .into_iter()
            .chain(target_edges)
            .chain(pathway_edges)
        {
            graph.merge_edge(edge)?;
        }

        for association in &records.associations {
            if association.disease_id != disease_id.id {
                continue;
            }
            let drug = NodeId::drug(association.drug_id.clone());
            if graph.node(&drug).is_none() {
                debug!(drug = %association.drug_id, "historical association for unknown drug");
                continue;
            }
            data_sources.insert(association.source.clone());
            graph.merge_edge(GraphEdge::new(
                EdgeKind::DrugDisease,
                drug,
                disease_id.clone(),
                edge_weight(association.strength),
                association.source.clone(),
            ))?;
        }

        let warnings: Vec<PartialData> = records
            .outages
            .iter()
            .map(|outage| {
                warn!(source = %outage.source, reason = %outage.reason, "building graph with partial data");
                PartialData::new(outage.source.clone(), outage.reason.clone())
            })
            .collect();

        let stats = graph.stats();
        info!(
            disease = %disease_id,
            nodes = stats.total_nodes,
            edges = stats.total_edges,
            drugs = drugs_analyzed,
            "knowledge graph built"
        );
        sink.emit(ProgressEvent::with_data(
            Stage::GraphBuilt,
            format!(
                "Graph built: {} nodes, {} edges",
                stats.total_nodes, stats.total_edges
            ),
            json!({
                "nodes": stats.total_nodes,
                "edges": stats.total_edges,
                "node_types": stats.node_types,
                "cached": false,
            }),
        ))?;

        let summary = self.summarize(&graph, disease_record.active_trials);
        Ok(BuiltGraph {
            graph,
            summary,
            warnings,
            data_sources,
            drugs_analyzed,
        })
    }

    fn summarize(&self, graph: &KnowledgeGraph, active_trials: u32) -> DiseaseSummary {
        let disease = graph.disease();
        let disease_genes = graph.disease_genes();
        DiseaseSummary {
            id: disease.id.clone(),
            name: disease.name.clone(),
            description: disease.description.clone(),
            is_rare: disease.is_rare,
            gene_count: disease_genes.len(),
            pathway_count: graph.disease_pathways().len(),
            active_trials,
            top_genes: disease_genes
                .into_iter()
                .take(self.config.summary_top_genes)
                .map(|(gene, association)| GeneSummary {
                    id: gene.id.clone(),
                    symbol: gene.symbol.clone(),
                    association,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphOutcome {
    pub graph: Arc<BuiltGraph>,
    pub cache_hit: bool,
}

/// Provider fetch plus build, optionally behind the single-flight cache.
pub struct GraphService {
    provider: Arc<dyn RecordProvider>,
    builder: GraphBuilder,
    cache: Option<Arc<GraphCache>>,
}

impl GraphService {
    pub fn new(provider: Arc<dyn RecordProvider>, builder: GraphBuilder) -> Self {
        Self {
            provider,
            builder,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<GraphCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<GraphCache>> {
        self.cache.as_ref()
    }

    /// `disease_name` must already be normalized.
    pub async fn fetch_and_build(
        &self,
        disease_name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<GraphOutcome, GraphError> {
        sink.emit(ProgressEvent::message(
            Stage::Fetching,
            format!("Fetching data for {disease_name}"),
        ))?;

        let Some(cache) = &self.cache else {
            let built = self.fetch_then_build(disease_name, sink).await?;
            return Ok(GraphOutcome {
                graph: Arc::new(built),
                cache_hit: false,
            });
        };

        let (graph, cache_hit) = cache
            .get_or_build(disease_name, || self.fetch_then_build(disease_name, sink))
            .await?;
        if cache_hit {
            debug!(disease = disease_name, "graph cache hit");
            let stats = graph.graph.stats();
            sink.emit(disease_found_event(&graph.summary.id, &graph.summary.name))?;
            sink.emit(ProgressEvent::with_data(
                Stage::GraphBuilt,
                format!(
                    "Graph loaded from cache: {} nodes, {} edges",
                    stats.total_nodes, stats.total_edges
                ),
                json!({
                    "nodes": stats.total_nodes,
                    "edges": stats.total_edges,
                    "node_types": stats.node_types,
                    "cached": true,
                }),
            ))?;
        }
        Ok(GraphOutcome { graph, cache_hit })
    }

    async fn fetch_then_build(
        &self,
        disease_name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<BuiltGraph, GraphError> {
        let records = self
            .provider
            .fetch_disease_records(disease_name)
            .await
            .map_err(|err| {
                warn!(disease = disease_name, error = %err, "record provider failed");
                GraphError::from(err)
            })?;
        sink.emit(disease_found_event(&records.disease.id, &records.disease.name))?;
        self.builder.build(&records, sink)
    }
}

fn disease_found_event(id: &str, name: &str) -> ProgressEvent {
    ProgressEvent::with_data(
        Stage::DiseaseFound,
        format!("Found disease: {name}"),
        json!({ "id": id, "name": name }),
    )
}
