use std::collections::BTreeSet;

use graph::provider::{
    DiseaseRecord, DrugRecord, GeneRecord, HistoricalAssociation, PathwayRecord, TargetRecord,
};
use graph::{GraphBuilder, KnowledgeGraph, RecordSet};
use repurpose_core::config::ScoringConfig;
use repurpose_core::model::DiseaseQuery;
use repurpose_core::progress::NoopSink;
use scoring::{ConfidenceTier, Scorer};

fn gene(id: &str, strength: f64) -> GeneRecord {
    GeneRecord {
        id: id.to_string(),
        symbol: format!("SYM_{id}"),
        association: Some(strength),
        source: "opentargets".to_string(),
    }
}

fn drug(id: &str, name: &str, targets: &[&str], pathways: &[&str]) -> DrugRecord {
    DrugRecord {
        id: id.to_string(),
        name: name.to_string(),
        indication: "hypertension".to_string(),
        mechanism: None,
        targets: targets
            .iter()
            .map(|t| TargetRecord {
                gene_id: t.to_string(),
                symbol: None,
                confidence: None,
                source: "dgidb".to_string(),
            })
            .collect(),
        pathways: pathways.iter().map(|p| p.to_string()).collect(),
        tags: BTreeSet::new(),
        approved: true,
        source: "chembl".to_string(),
        serious_adverse_events: None,
    }
}

/// Disease X with genes {G1:0.9, G2:0.6} and pathway P1; D1 targets G1 and
/// is associated with P1; D2 targets the unrelated G3.
fn scenario() -> RecordSet {
    let mut set = RecordSet::new(DiseaseRecord {
        id: "X".to_string(),
        name: "Example disease".to_string(),
        description: String::new(),
        is_rare: false,
        synonyms: Vec::new(),
        tags: BTreeSet::new(),
        active_trials: 0,
    });
    set.genes = vec![gene("G1", 0.9), gene("G2", 0.6)];
    set.pathways = vec![PathwayRecord {
        id: "P1".to_string(),
        name: "Pathway one".to_string(),
        genes: BTreeSet::new(),
        association: None,
        source: "reactome".to_string(),
    }];
    set.drugs = vec![
        drug("D1", "Drug one", &["G1"], &["P1"]),
        drug("D2", "Drug two", &["G3"], &[]),
    ];
    set
}

fn build(set: &RecordSet) -> KnowledgeGraph {
    GraphBuilder::default().build(set, &NoopSink).unwrap().graph
}

fn scorer() -> Scorer {
    Scorer::new(ScoringConfig::default()).unwrap()
}

#[test]
fn related_drug_outranks_unrelated_drug() {
    let graph = build(&scenario());
    let scorer = scorer();

    let d1 = scorer.score_drug_id(&graph, "D1").unwrap();
    let d2 = scorer.score_drug_id(&graph, "D2").unwrap();

    assert!(d1.sub_scores.gene_target_score > 0.0);
    assert!((d1.sub_scores.gene_target_score - 0.6).abs() < 1e-9);
    assert_eq!(d1.sub_scores.pathway_overlap_score, 1.0);
    assert_eq!(d1.sub_scores.network_proximity_score, 0.5);
    assert!(d1.composite_score > d2.composite_score);
    assert!(d2.composite_score.abs() < 1e-9);
    assert!((d1.composite_score - 0.7).abs() < 1e-9);
    assert_ne!(d1.confidence, ConfidenceTier::Low);
    assert_eq!(d2.confidence, ConfidenceTier::Low);
    assert_eq!(d1.shared_genes, vec!["SYM_G1".to_string()]);
    assert_eq!(d1.shared_pathways, vec!["Pathway one".to_string()]);

    let ranked = scorer.rank(&graph, &DiseaseQuery::new("example disease", 0.1, 10, false));
    let ids: Vec<&str> = ranked.iter().map(|c| c.drug_id.as_str()).collect();
    assert_eq!(ids, vec!["D1"]);
}

#[test]
fn composite_is_weighted_sum_in_unit_interval() {
    let mut set = scenario();
    set.associations.push(HistoricalAssociation {
        drug_id: "D1".to_string(),
        disease_id: "X".to_string(),
        strength: 0.4,
        kind: "off_label".to_string(),
        source: "pubmed".to_string(),
    });
    set.drugs.push(drug("D3", "Drug three", &["G2", "G1"], &[]));
    let graph = build(&set);
    let scorer = scorer();
    let weights = scorer.config().weights.as_array();

    let disease_genes: BTreeSet<String> = graph
        .disease_genes()
        .iter()
        .map(|(gene, _)| gene.symbol.clone())
        .collect();
    let disease_pathways: BTreeSet<String> = graph
        .disease_pathways()
        .iter()
        .map(|(pathway, _)| pathway.name.clone())
        .collect();

    let candidates = scorer.score_all(&graph);
    assert!(!candidates.is_empty());
    for candidate in &candidates {
        let expected: f64 = weights
            .iter()
            .zip(candidate.sub_scores.as_array())
            .map(|(w, s)| w * s)
            .sum();
        assert!((candidate.composite_score - expected).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&candidate.composite_score));
        for sub in candidate.sub_scores.as_array() {
            assert!((0.0..=1.0).contains(&sub));
        }
        assert!(candidate
            .shared_genes
            .iter()
            .all(|g| disease_genes.contains(g)));
        assert!(candidate
            .shared_pathways
            .iter()
            .all(|p| disease_pathways.contains(p)));
    }

    let d1 = candidates.iter().find(|c| c.drug_id == "D1").unwrap();
    assert_eq!(d1.sub_scores.prior_evidence_score, 0.4);
    let d3 = candidates.iter().find(|c| c.drug_id == "D3").unwrap();
    assert_eq!(d3.shared_genes, vec!["SYM_G1".to_string(), "SYM_G2".to_string()]);
    assert_eq!(d3.sub_scores.gene_target_score, 1.0);
}

#[test]
fn raising_min_score_never_adds_candidates() {
    let mut set = scenario();
    for i in 0..12 {
        let target = if i % 2 == 0 { "G1" } else { "G2" };
        set.drugs
            .push(drug(&format!("E{i:02}"), &format!("Extra {i:02}"), &[target], &[]));
    }
    let graph = build(&set);
    let scorer = scorer();

    let mut previous = usize::MAX;
    for step in 0..=10 {
        let min_score = step as f64 / 10.0;
        let count = scorer
            .rank(&graph, &DiseaseQuery::new("example disease", min_score, 1000, false))
            .len();
        assert!(count <= previous);
        previous = count;
    }
}

#[test]
fn scoring_is_idempotent_and_deterministic() {
    let set = scenario();
    let graph = build(&set);
    let scorer = scorer();
    assert_eq!(scorer.score_all(&graph), scorer.score_all(&graph));
    assert_eq!(scorer.score_all(&graph), scorer.score_all(&build(&set)));
}

#[test]
fn equal_scores_rank_by_name() {
    let mut set = scenario();
    set.drugs = vec![
        drug("B", "Bravo", &["G1"], &[]),
        drug("A", "Alpha", &["G1"], &[]),
        drug("C", "Charlie", &["G1"], &[]),
    ];
    let graph = build(&set);
    let names: Vec<String> = scorer()
        .score_all(&graph)
        .into_iter()
        .map(|c| c.drug_name)
        .collect();
    assert_eq!(names, vec!["Alpha", "Bravo", "Charlie"]);
}

#[test]
fn max_results_truncates_after_threshold() {
    let mut set = scenario();
    set.drugs.push(drug("D3", "Drug three", &["G2"], &[]));
    set.drugs.push(drug("D4", "Drug four", &["G1", "G2"], &["P1"]));
    let graph = build(&set);
    let ranked = scorer().rank(&graph, &DiseaseQuery::new("example disease", 0.0, 2, false));
    let ids: Vec<&str> = ranked.iter().map(|c| c.drug_id.as_str()).collect();
    assert_eq!(ids, vec!["D4", "D1"]);
}

#[test]
fn drugs_reached_only_through_another_drug_are_not_candidates() {
    let mut set = scenario();
    // D3 shares GX with D1 but nothing with the disease.
    set.drugs = vec![
        drug("D1", "Drug one", &["G1", "GX"], &[]),
        drug("D3", "Drug three", &["GX"], &[]),
    ];
    let graph = build(&set);
    let scorer = scorer();

    let ids: Vec<String> = scorer
        .score_all(&graph)
        .into_iter()
        .map(|c| c.drug_id)
        .collect();
    assert_eq!(ids, vec!["D1".to_string()]);
    assert!(scorer
        .rank(&graph, &DiseaseQuery::new("example disease", 0.0, 10, false))
        .iter()
        .all(|c| c.drug_id != "D3"));

    let d3 = scorer.score_drug_id(&graph, "D3").unwrap();
    assert_eq!(d3.sub_scores.network_proximity_score, 0.25);
}

#[test]
fn historical_association_alone_makes_a_candidate() {
    let mut set = scenario();
    set.drugs.push(drug("D5", "Drug five", &["G9"], &[]));
    set.associations.push(HistoricalAssociation {
        drug_id: "D5".to_string(),
        disease_id: "X".to_string(),
        strength: 0.8,
        kind: "off_label".to_string(),
        source: "pubmed".to_string(),
    });
    let graph = build(&set);
    let d5 = scorer()
        .score_all(&graph)
        .into_iter()
        .find(|c| c.drug_id == "D5")
        .unwrap();
    assert_eq!(d5.sub_scores.gene_target_score, 0.0);
    assert_eq!(d5.sub_scores.prior_evidence_score, 0.8);
}
