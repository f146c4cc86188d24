//! Leveraged buyout analysis: bind a deal, size it, project cash flows,
//! service the capital structure, and score the sponsor's return.

pub mod binder;
pub mod cash_flow;
pub mod model;
pub mod orchestrator;
pub mod returns;
pub mod sources_uses;
pub mod waterfall;

pub use binder::bind;
pub use model::{Deal, Financials, FinancialSeries, ReferenceRateCurve, Tranche, Valuation, ValuationMethod};
pub use orchestrator::{run_analysis, AnalysisFailure, AnalysisResult, AnalysisSuccess, Summary};
pub use returns::{calculate_returns, ReturnsOutput};
pub use sources_uses::{build_sources_uses, SourcesUsesOutput};
pub use waterfall::{run_waterfall, DebtScheduleOutput, LeverageMetrics, WaterfallOutput};
