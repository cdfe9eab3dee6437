use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisMetrics {
    pub total_analyses: u64,
    pub failed_analyses: u64,
    pub cancelled_analyses: u64,
    pub graph_cache_hits: u64,
    pub latencies: VecDeque<u64>, // microseconds
}

#[derive(Debug, Clone, Default)]
pub struct ValidationMetrics {
    pub total_validations: u64,
    pub high_risk_verdicts: u64,
}

#[derive(Clone)]
pub struct MetricsCollector {
    state: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    analysis: AnalysisMetrics,
    validation: ValidationMetrics,
    max_history: usize,
}

impl MetricsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MetricsState {
                analysis: AnalysisMetrics::default(),
                validation: ValidationMetrics::default(),
                max_history: max_history.max(1),
            })),
        }
    }

    pub fn record_analysis(&self, latency_us: u64, graph_cache_hit: bool, outcome: AnalysisOutcome) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let max_history = state.max_history;
        let analysis = &mut state.analysis;
        analysis.total_analyses += 1;
        match outcome {
            AnalysisOutcome::Completed => {}
            AnalysisOutcome::Failed => analysis.failed_analyses += 1,
            AnalysisOutcome::Cancelled => analysis.cancelled_analyses += 1,
        }
        if graph_cache_hit {
            analysis.graph_cache_hits += 1;
        }
        analysis.latencies.push_back(latency_us);
        if analysis.latencies.len() > max_history {
            analysis.latencies.pop_front();
        }
    }

    pub fn record_validation(&self, high_risk: bool) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.validation.total_validations += 1;
        if high_risk {
            state.validation.high_risk_verdicts += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let Ok(state) = self.state.lock() else {
            return MetricsSnapshot::default();
        };
        let a = &state.analysis;
        let v = &state.validation;

        let mut sorted_latencies: Vec<u64> = a.latencies.iter().copied().collect();
        sorted_latencies.sort_unstable();

        let cache_hit_rate = if a.total_analyses > 0 {
            a.graph_cache_hits as f32 / a.total_analyses as f32
        } else {
            0.0
        };

        MetricsSnapshot {
            total_analyses: a.total_analyses,
            failed_analyses: a.failed_analyses,
            cancelled_analyses: a.cancelled_analyses,
            cache_hit_rate,
            p50: percentile(&sorted_latencies, 50.0),
            p95: percentile(&sorted_latencies, 95.0),
            p99: percentile(&sorted_latencies, 99.0),
            history_count: a.latencies.len(),
            total_validations: v.total_validations,
            high_risk_verdicts: v.high_risk_verdicts,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(1_000)
    }
}

fn percentile(sorted: &[u64], p: f32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f32)).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub total_analyses: u64,
    pub failed_analyses: u64,
    pub cancelled_analyses: u64,
    pub cache_hit_rate: f32,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub history_count: usize,
    pub total_validations: u64,
    pub high_risk_verdicts: u64,
}
