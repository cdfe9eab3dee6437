pub mod builder;
pub mod cache;
pub mod error;
pub mod index;
pub mod knowledge;
pub mod provider;

pub use builder::{
    BuiltGraph, DiseaseSummary, GeneSummary, GraphBuilder, GraphConfig, GraphOutcome, GraphService,
};
pub use cache::GraphCache;
pub use error::GraphError;
pub use knowledge::{GraphStats, KnowledgeGraph, NodeTypeCounts};
pub use provider::{ProviderError, RecordProvider, RecordSet};
