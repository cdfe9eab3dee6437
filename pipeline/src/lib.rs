pub mod dsl;
pub mod engine;
pub mod error;
pub mod result;
pub mod stream;

pub use dsl::{AnalysisRequest, DiseaseData, DrugData, RequestValidationError, ValidationRequest};
pub use engine::{AnalysisEngine, ValidationResponse};
pub use error::AnalysisError;
pub use result::{AnalysisResult, ResultMetadata, Thresholds};
pub use stream::{frame_event, ProgressStream};
