use crate::dsl::{AnalysisRequest, ValidationRequest};
use crate::error::AnalysisError;
use crate::result::{AnalysisResult, Assembly};
use crate::stream::{ChannelSink, ProgressStream};
use clinical::{ClinicalValidator, EvidenceBundle, EvidenceProvider, RiskLevel, ValidationReport};
use graph::{GraphBuilder, GraphCache, GraphConfig, GraphOutcome, GraphService, RecordProvider};
use repurpose_core::config::AppConfig;
use repurpose_core::error::RepurposeError;
use repurpose_core::metrics::{AnalysisOutcome, MetricsCollector};
use repurpose_core::progress::{ProgressEvent, ProgressSink, Stage};
use safety::{AdmissibleCandidate, SafetyFilter};
use scoring::{explanation_text, Scorer};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub success: bool,
    pub validation: ValidationReport,
}

/// Runs one disease analysis as a strictly ordered pipeline: fetch, build,
/// score, filter, threshold, explain, assemble. Holds no per-request state,
/// so one engine serves concurrent requests.
pub struct AnalysisEngine {
    config: Arc<AppConfig>,
    graphs: GraphService,
    scorer: Scorer,
    safety: SafetyFilter,
    validator: ClinicalValidator,
    evidence: Option<Arc<dyn EvidenceProvider>>,
    metrics: MetricsCollector,
}

impl AnalysisEngine {
    pub fn new(
        config: Arc<AppConfig>,
        provider: Arc<dyn RecordProvider>,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        let builder = GraphBuilder::new(GraphConfig::from_app_config(&config));
        let mut graphs = GraphService::new(provider, builder);
        if config.analysis.cache_graphs {
            graphs = graphs.with_cache(Arc::new(GraphCache::new()));
        }
        Ok(Self {
            scorer: Scorer::new(config.scoring.clone())?,
            safety: SafetyFilter::from_config(&config.safety)?,
            validator: ClinicalValidator::new(config.validation.clone()),
            evidence: None,
            metrics: MetricsCollector::default(),
            graphs,
            config,
        })
    }

    pub fn with_safety_filter(mut self, safety: SafetyFilter) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_evidence_provider(mut self, evidence: Arc<dyn EvidenceProvider>) -> Self {
        self.evidence = Some(evidence);
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn graph_cache(&self) -> Option<&Arc<GraphCache>> {
        self.graphs.cache()
    }

    /// A request for `disease_name` with the configured defaults.
    pub fn request(&self, disease_name: impl Into<String>) -> AnalysisRequest {
        AnalysisRequest::with_defaults(disease_name, &self.config.analysis)
    }

    /// Run the pipeline, pushing progress into `sink`. Failures end with a
    /// single `error` event; a disconnected sink stops the run silently.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        sink: &dyn ProgressSink,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let outcome = self.run(request, sink, started).await;
        let latency_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

        match outcome {
            Ok(result) => {
                self.metrics.record_analysis(
                    latency_us,
                    result.metadata.graph_cached,
                    AnalysisOutcome::Completed,
                );
                Ok(result)
            }
            Err(err) if err.is_cancelled() => {
                info!(disease = %request.disease_name, "analysis cancelled by consumer");
                self.metrics
                    .record_analysis(latency_us, false, AnalysisOutcome::Cancelled);
                Err(err)
            }
            Err(err) => {
                let code = err.error_code();
                warn!(disease = %request.disease_name, code = %code, error = %err, "analysis failed");
                self.metrics
                    .record_analysis(latency_us, false, AnalysisOutcome::Failed);
                if sink
                    .emit(ProgressEvent::with_data(
                        Stage::Error,
                        err.to_string(),
                        json!({ "code": code, "message": err.to_string() }),
                    ))
                    .is_err()
                {
                    debug!("consumer gone before error event");
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        request: &AnalysisRequest,
        sink: &dyn ProgressSink,
        started: Instant,
    ) -> Result<AnalysisResult, AnalysisError> {
        let query = request.validate()?;
        info!(
            disease = query.disease_name(),
            min_score = query.min_score(),
            max_results = query.max_results(),
            "analysis accepted"
        );

        let GraphOutcome {
            graph: built,
            cache_hit,
        } = self.graphs.fetch_and_build(query.disease_name(), sink).await?;

        for warning in &built.warnings {
            sink.emit(ProgressEvent::with_data(
                Stage::Warning,
                warning.to_string(),
                json!({
                    "code": warning.code(),
                    "source": warning.source,
                    "reason": warning.reason,
                }),
            ))?;
        }

        sink.emit(ProgressEvent::message(
            Stage::Scoring,
            format!("Scoring {} drugs", built.drugs_analyzed),
        ))?;
        let ranked = self.scorer.score_all(&built.graph);
        let candidates_scored = ranked.len();

        // Safety runs on the full ranked list so that threshold exclusions
        // never hide or add rule-based removals.
        let partition = self.safety.partition(ranked, &built.graph);
        let mut candidates: Vec<AdmissibleCandidate> = partition
            .admissible
            .into_iter()
            .filter(|admissible| admissible.candidate.composite_score >= query.min_score())
            .take(query.max_results())
            .collect();
        let filtered = partition.filtered;

        sink.emit(ProgressEvent::with_data(
            Stage::Scored,
            format!(
                "Scored {candidates_scored} drugs: {} candidates, {} filtered",
                candidates.len(),
                filtered.len()
            ),
            json!({
                "scored": candidates_scored,
                "candidates": candidates.len(),
                "filtered": filtered.len(),
            }),
        ))?;

        if query.explain() && self.config.analysis.explain && !candidates.is_empty() {
            sink.emit(ProgressEvent::message(
                Stage::Explaining,
                format!("Generating explanations for {} candidates", candidates.len()),
            ))?;
            let disease_name = &built.graph.disease().name;
            for admissible in &mut candidates {
                admissible.candidate.explanation =
                    Some(explanation_text(disease_name, &admissible.candidate));
            }
        }

        let result = AnalysisResult::assemble(
            &built,
            &query,
            Assembly {
                candidates,
                filtered,
                candidates_scored,
                cache_hit,
                elapsed: started.elapsed(),
            },
        );
        info!(
            disease = %result.disease_name,
            candidates = result.candidates.len(),
            filtered = result.filtered_count,
            elapsed_ms = result.metadata.elapsed_ms,
            "analysis complete"
        );

        let payload =
            serde_json::to_value(&result).map_err(|err| AnalysisError::Internal(err.to_string()))?;
        sink.emit(ProgressEvent::with_data(
            Stage::Complete,
            format!("Found {} repurposing candidates", result.candidates.len()),
            payload,
        ))?;
        Ok(result)
    }

    /// Spawn the analysis and hand back its progress stream. Dropping the
    /// stream cancels the run along with any in-flight provider call.
    pub fn stream(self: &Arc<Self>, request: AnalysisRequest) -> ProgressStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::clone(self);
        let task = tokio::spawn(async move {
            let sink = ChannelSink::new(tx.clone());
            tokio::select! {
                _ = engine.analyze(&request, &sink) => {}
                _ = tx.closed() => {
                    debug!(disease = %request.disease_name, "progress stream closed");
                }
            }
        });
        ProgressStream::new(rx, task)
    }

    /// On-demand clinical validation for one drug–disease pair. Evidence that
    /// cannot be obtained is reported as missing, never as a failure.
    pub async fn validate(
        &self,
        request: &ValidationRequest,
    ) -> Result<ValidationResponse, AnalysisError> {
        let (drug, disease) = request.profiles()?;
        let evidence = match &self.evidence {
            Some(provider) => match provider.fetch_evidence(&drug, &disease).await {
                Ok(bundle) => bundle,
                Err(err) => {
                    warn!(drug = %drug.name, disease = %disease.name, error = %err, "evidence unavailable");
                    EvidenceBundle::default()
                }
            },
            None => {
                debug!("no evidence provider configured");
                EvidenceBundle::default()
            }
        };

        let validation = self.validator.validate(&drug, &disease, evidence);
        self.metrics
            .record_validation(validation.risk_level == RiskLevel::High);
        Ok(ValidationResponse {
            success: true,
            validation,
        })
    }
}
