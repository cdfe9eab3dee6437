use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetching,
    DiseaseFound,
    GraphBuilding,
    GraphBuilt,
    Scoring,
    Scored,
    Explaining,
    Complete,
    Warning,
    Error,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ProgressEvent {
    pub fn message(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn with_data(stage: Stage, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            stage,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

/// Returned by a sink whose consumer is gone. The pipeline stops on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("progress consumer disconnected")]
pub struct Cancelled;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent) -> Result<(), Cancelled>;
}

pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) -> Result<(), Cancelled> {
        Ok(())
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.events().iter().map(|event| event.stage).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) -> Result<(), Cancelled> {
        let mut events = self.events.lock().map_err(|_| Cancelled)?;
        events.push(event);
        Ok(())
    }
}
