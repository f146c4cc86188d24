pub mod error;
pub mod lbo;
pub mod types;

pub use error::CorpFinanceError;
pub use lbo::{run_analysis, AnalysisResult};
pub use types::*;

/// Standard result type for all lbo-core operations
pub type CorpFinanceResult<T> = Result<T, CorpFinanceError>;
