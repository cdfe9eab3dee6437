use std::collections::BTreeSet;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clinical::{
    EvidenceBundle, LiteratureSummary, RiskLevel, StaticEvidenceProvider, TrialSummary,
};
use graph::provider::{
    DiseaseRecord, DrugRecord, GeneRecord, SnapshotProvider, SourceOutage, TargetRecord,
};
use graph::{ProviderError, RecordProvider, RecordSet};
use pipeline::{AnalysisEngine, AnalysisRequest, ValidationRequest};
use repurpose_core::config::AppConfig;
use repurpose_core::error::{ErrorCode, RepurposeError};
use repurpose_core::progress::{Cancelled, ProgressEvent, ProgressSink, RecordingSink, Stage};

fn drug(id: &str, name: &str, targets: &[&str]) -> DrugRecord {
    DrugRecord {
        id: id.to_string(),
        name: name.to_string(),
        indication: "Hypertension".to_string(),
        mechanism: None,
        targets: targets
            .iter()
            .map(|t| TargetRecord {
                gene_id: t.to_string(),
                symbol: Some(t.to_string()),
                confidence: Some(0.9),
                source: "dgidb".to_string(),
            })
            .collect(),
        pathways: BTreeSet::new(),
        tags: BTreeSet::new(),
        approved: true,
        source: "chembl".to_string(),
        serious_adverse_events: None,
    }
}

fn asthma() -> RecordSet {
    let mut set = RecordSet::new(DiseaseRecord {
        id: "MONDO_0004979".to_string(),
        name: "Asthma".to_string(),
        description: "Chronic inflammatory airway disease".to_string(),
        is_rare: false,
        synonyms: Vec::new(),
        tags: BTreeSet::new(),
        active_trials: 0,
    });
    set.genes = vec![
        GeneRecord {
            id: "ADRB2".to_string(),
            symbol: "ADRB2".to_string(),
            association: Some(0.95),
            source: "opentargets".to_string(),
        },
        GeneRecord {
            id: "IL13".to_string(),
            symbol: "IL13".to_string(),
            association: Some(0.4),
            source: "opentargets".to_string(),
        },
    ];
    set.drugs = vec![
        drug("CHEMBL27", "Propranolol", &["ADRB2", "IL13"]),
        drug("CHEMBL1263", "Salmeterol", &["ADRB2"]),
        drug("CHEMBL1201", "Atorvastatin", &["HMGCR"]),
    ];
    set
}

fn engine_with(provider: Arc<dyn RecordProvider>) -> AnalysisEngine {
    AnalysisEngine::new(Arc::new(AppConfig::default()), provider).unwrap()
}

fn snapshot(sets: Vec<RecordSet>) -> Arc<dyn RecordProvider> {
    Arc::new(SnapshotProvider::with_records(sets))
}

struct CountingProvider {
    inner: SnapshotProvider,
    calls: AtomicUsize,
}

#[async_trait]
impl RecordProvider for CountingProvider {
    async fn fetch_disease_records(&self, disease_name: &str) -> Result<RecordSet, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_disease_records(disease_name).await
    }
}

struct Unreachable;

#[async_trait]
impl RecordProvider for Unreachable {
    async fn fetch_disease_records(&self, _: &str) -> Result<RecordSet, ProviderError> {
        Err(ProviderError::Unavailable("connection refused".to_string()))
    }
}

/// Accepts `limit` events, then reports the consumer as gone.
struct DisconnectAfter {
    limit: usize,
    seen: RecordingSink,
}

impl ProgressSink for DisconnectAfter {
    fn emit(&self, event: ProgressEvent) -> Result<(), Cancelled> {
        if self.seen.events().len() >= self.limit {
            return Err(Cancelled);
        }
        self.seen.emit(event)
    }
}

fn last_data(sink: &RecordingSink) -> serde_json::Value {
    sink.events()
        .last()
        .and_then(|event| event.data.clone())
        .unwrap()
}

#[tokio::test]
async fn full_run_emits_every_stage_in_order() {
    let engine = engine_with(snapshot(vec![asthma()]));
    let sink = RecordingSink::new();
    let result = engine
        .analyze(&AnalysisRequest::new("Asthma"), &sink)
        .await
        .unwrap();

    assert_eq!(
        sink.stages(),
        vec![
            Stage::Fetching,
            Stage::DiseaseFound,
            Stage::GraphBuilding,
            Stage::GraphBuilt,
            Stage::Scoring,
            Stage::Scored,
            Stage::Explaining,
            Stage::Complete,
        ]
    );
    assert_eq!(result.disease_name, "Asthma");
    assert_eq!(result.disease_genes, vec!["ADRB2", "IL13"]);
    assert_eq!(result.graph_stats.node_types.disease, 1);
    assert_eq!(result.graph_stats.node_types.drug, 3);
    assert!(result
        .candidates
        .iter()
        .all(|c| c.candidate.explanation.is_some()));

    let payload = last_data(&sink);
    assert_eq!(payload["disease_name"], "Asthma");
    assert_eq!(payload["filtered_count"], 1);
    assert!(payload["candidates"].is_array());
    assert!(payload["metadata"]["generated_at"].is_string());
}

#[tokio::test]
async fn absolute_contraindication_only_in_filtered_drugs() {
    let engine = engine_with(snapshot(vec![asthma()]));
    for (min_score, max_results) in [(0.0, 1), (0.0, 10), (0.2, 10), (0.5, 3)] {
        let request = AnalysisRequest::new("asthma")
            .min_score(min_score)
            .max_results(max_results);
        let result = engine.analyze(&request, &RecordingSink::new()).await.unwrap();

        assert!(result
            .candidates
            .iter()
            .all(|c| c.candidate.drug_name != "Propranolol"));
        assert_eq!(result.filtered_count, 1);
        assert_eq!(result.filtered_drugs[0].candidate.drug_name, "Propranolol");
        assert!(result.candidates.len() <= max_results);
    }

    // Its raw score is still the best of the lot.
    let result = engine
        .analyze(&AnalysisRequest::new("asthma").min_score(0.0), &RecordingSink::new())
        .await
        .unwrap();
    let top_admitted = result.candidates[0].candidate.composite_score;
    assert!(result.filtered_drugs[0].candidate.composite_score > top_admitted);
}

#[tokio::test]
async fn no_candidate_above_threshold_is_an_empty_result() {
    let engine = engine_with(snapshot(vec![asthma()]));
    let sink = RecordingSink::new();
    let result = engine
        .analyze(&AnalysisRequest::new("Asthma").min_score(0.99), &sink)
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.filtered_count, 1);
    // Atorvastatin only reaches an off-disease gene.
    assert_eq!(result.metadata.candidates_scored, 2);
    assert_eq!(result.metadata.drugs_analyzed, 3);
    assert!(!sink.stages().contains(&Stage::Explaining));
    assert_eq!(sink.stages().last(), Some(&Stage::Complete));
    assert_eq!(last_data(&sink)["candidates"], serde_json::json!([]));
}

#[tokio::test]
async fn invalid_query_is_rejected_before_any_provider_call() {
    let provider = Arc::new(CountingProvider {
        inner: SnapshotProvider::with_records(vec![asthma()]),
        calls: AtomicUsize::new(0),
    });
    let engine = engine_with(provider.clone());
    let sink = RecordingSink::new();

    let err = engine
        .analyze(&AnalysisRequest::new("Asthma").max_results(0), &sink)
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), ErrorCode::InvalidQuery);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert_eq!(sink.stages(), vec![Stage::Error]);
    assert_eq!(last_data(&sink)["code"], "INVALID_QUERY");
}

#[tokio::test]
async fn unknown_disease_is_not_found() {
    let engine = engine_with(snapshot(vec![asthma()]));
    let sink = RecordingSink::new();
    let err = engine
        .analyze(&AnalysisRequest::new("Xyzzy syndrome"), &sink)
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), ErrorCode::NotFound);
    assert_eq!(sink.stages(), vec![Stage::Fetching, Stage::Error]);
    assert_eq!(last_data(&sink)["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unreachable_provider_ends_with_error_stage() {
    let engine = engine_with(Arc::new(Unreachable));
    let sink = RecordingSink::new();
    let err = engine
        .analyze(&AnalysisRequest::new("Asthma"), &sink)
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), ErrorCode::ProviderUnavailable);
    assert_eq!(sink.stages(), vec![Stage::Fetching, Stage::Error]);
    let terminal: Vec<_> = sink
        .stages()
        .into_iter()
        .filter(|stage| stage.is_terminal())
        .collect();
    assert_eq!(terminal.len(), 1);
    assert_eq!(engine.metrics().snapshot().failed_analyses, 1);
}

#[tokio::test]
async fn missing_secondary_source_warns_and_continues() {
    let mut set = asthma();
    set.outages.push(SourceOutage {
        source: "reactome".to_string(),
        reason: "timeout after 10s".to_string(),
    });
    let engine = engine_with(snapshot(vec![set]));
    let sink = RecordingSink::new();
    let result = engine
        .analyze(&AnalysisRequest::new("Asthma"), &sink)
        .await
        .unwrap();

    let stages = sink.stages();
    let built = stages.iter().position(|s| *s == Stage::GraphBuilt).unwrap();
    let warning = stages.iter().position(|s| *s == Stage::Warning).unwrap();
    let scoring = stages.iter().position(|s| *s == Stage::Scoring).unwrap();
    assert!(built < warning && warning < scoring);
    assert_eq!(stages.last(), Some(&Stage::Complete));

    assert_eq!(result.metadata.warnings.len(), 1);
    assert_eq!(result.metadata.warnings[0].source, "reactome");
    let warning_event = &sink.events()[warning];
    assert_eq!(warning_event.data.as_ref().unwrap()["code"], "PARTIAL_DATA");
}

#[tokio::test]
async fn disconnected_consumer_stops_without_terminal_event() {
    let engine = engine_with(snapshot(vec![asthma()]));
    let sink = DisconnectAfter {
        limit: 3,
        seen: RecordingSink::new(),
    };
    let err = engine
        .analyze(&AnalysisRequest::new("Asthma"), &sink)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(sink.seen.stages().len(), 3);
    assert!(sink.seen.stages().iter().all(|stage| !stage.is_terminal()));
    assert_eq!(engine.metrics().snapshot().cancelled_analyses, 1);
}

#[tokio::test]
async fn repeated_query_reuses_cached_graph_with_identical_ranking() {
    let provider = Arc::new(CountingProvider {
        inner: SnapshotProvider::with_records(vec![asthma()]),
        calls: AtomicUsize::new(0),
    });
    let engine = engine_with(provider.clone());

    let first = engine
        .analyze(&AnalysisRequest::new("Asthma").min_score(0.0), &RecordingSink::new())
        .await
        .unwrap();
    let sink = RecordingSink::new();
    let second = engine
        .analyze(&AnalysisRequest::new("  ASTHMA ").min_score(0.0), &sink)
        .await
        .unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert!(!first.metadata.graph_cached);
    assert!(second.metadata.graph_cached);
    assert_eq!(first.candidates, second.candidates);
    assert_eq!(first.metadata.graph_fingerprint, second.metadata.graph_fingerprint);
    assert!(!sink.stages().contains(&Stage::GraphBuilding));
    assert!(engine.metrics().snapshot().cache_hit_rate > 0.0);
}

#[tokio::test]
async fn stream_yields_one_terminal_event() {
    let engine = Arc::new(engine_with(snapshot(vec![asthma()])));
    let events = engine.stream(AnalysisRequest::new("Asthma")).collect().await;

    assert_eq!(events.first().map(|e| e.stage), Some(Stage::Fetching));
    assert_eq!(events.last().map(|e| e.stage), Some(Stage::Complete));
    assert_eq!(events.iter().filter(|e| e.stage.is_terminal()).count(), 1);

    let frame = pipeline::frame_event(&events[0]).unwrap();
    assert!(frame.starts_with("data: {\"stage\":\"fetching\""));
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

struct HangingProvider {
    released: Arc<AtomicBool>,
}

#[async_trait]
impl RecordProvider for HangingProvider {
    async fn fetch_disease_records(&self, _: &str) -> Result<RecordSet, ProviderError> {
        let _flag = DropFlag(self.released.clone());
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(ProviderError::Unavailable("timed out".to_string()))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_the_stream_releases_in_flight_provider_call() {
    let released = Arc::new(AtomicBool::new(false));
    let engine = Arc::new(engine_with(Arc::new(HangingProvider {
        released: released.clone(),
    })));

    let mut stream = engine.stream(AnalysisRequest::new("Asthma"));
    let first = stream.next().await.unwrap();
    assert_eq!(first.stage, Stage::Fetching);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!released.load(Ordering::SeqCst));

    drop(stream);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(released.load(Ordering::SeqCst));
    assert!(engine.graph_cache().unwrap().is_empty());
}

#[tokio::test]
async fn validation_uses_supplied_evidence() {
    let mut evidence = StaticEvidenceProvider::new();
    evidence.insert(
        "Metformin",
        "Alzheimer Disease",
        EvidenceBundle {
            trials: Some(TrialSummary {
                active_trials: 3,
                ..Default::default()
            }),
            literature: Some(LiteratureSummary {
                supporting: 8,
                contradicting: 1,
                ..Default::default()
            }),
            adverse_events: Some(Default::default()),
        },
    );
    let engine = engine_with(snapshot(vec![asthma()])).with_evidence_provider(Arc::new(evidence));

    let request = ValidationRequest::parse_json(
        r#"{"drug_name": "Metformin", "disease_name": "Alzheimer Disease",
            "drug_data": {"targets": ["PRKAA1"]},
            "disease_data": {"genes": ["PRKAA1"]}}"#,
    )
    .unwrap();
    let response = engine.validate(&request).await.unwrap();
    assert!(response.success);
    assert_eq!(response.validation.risk_level, RiskLevel::Low);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["validation"]["risk_level"], "low");
    assert_eq!(engine.metrics().snapshot().total_validations, 1);
}

#[tokio::test]
async fn validation_without_evidence_provider_is_medium_risk() {
    let engine = engine_with(snapshot(vec![]));
    let response = engine
        .validate(&ValidationRequest::new("Metformin", "Alzheimer Disease"))
        .await
        .unwrap();
    assert_eq!(response.validation.risk_level, RiskLevel::Medium);
    assert_eq!(response.validation.missing_evidence.len(), 3);

    let err = engine
        .validate(&ValidationRequest::new("Metformin", " "))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::InvalidQuery);
}

#[tokio::test]
async fn strict_mode_from_config_filters_relative_rules() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("rules.json");
    fs::write(
        &rules_path,
        r#"[{"drug": {"by": "name", "value": "salmeterol"},
             "disease": {"by": "tag", "value": "asthma"},
             "severity": "relative",
             "rationale": "monotherapy without inhaled corticosteroid",
             "source": "site-policy"}]"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("default.toml"),
        format!(
            "[safety]\nstrict = true\nrules_path = {:?}\n",
            rules_path.to_string_lossy()
        ),
    )
    .unwrap();

    let config = AppConfig::load_from(dir.path(), "test").unwrap();
    assert!(config.safety.strict);
    let engine = AnalysisEngine::new(Arc::new(config), snapshot(vec![asthma()])).unwrap();

    let result = engine
        .analyze(&AnalysisRequest::new("Asthma").min_score(0.0), &RecordingSink::new())
        .await
        .unwrap();
    let filtered: Vec<_> = result
        .filtered_drugs
        .iter()
        .map(|f| f.candidate.drug_name.as_str())
        .collect();
    assert_eq!(filtered, vec!["Propranolol", "Salmeterol"]);
    assert_eq!(result.filtered_count, 2);
}
