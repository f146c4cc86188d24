//! Orchestrator: binds, sizes, projects, services and scores a deal in one pass.
//!
//! Grounded on `run_lbo_analysis` / `_run_complete_lbo_analysis` in the
//! Python original for phase ordering and the result shape; any failure
//! anywhere in the pipeline collapses into the bare `{success: false,
//! case_id, error}` shape rather than a partially filled result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Money;
use crate::CorpFinanceResult;

use super::binder::bind;
use super::cash_flow::{build_unlevered_cash_flows, retax, AnnualCashFlow};
use super::returns::{calculate_returns, ReturnsOutput};
use super::sources_uses::{build_sources_uses, SourcesUsesOutput};
use super::waterfall::{run_waterfall, DebtScheduleOutput, LeverageMetrics, WaterfallOutput};

use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub case_id: String,
    pub irr: Money,
    pub moic: Money,
    pub entry_equity: Money,
    pub exit_proceeds: Money,
    pub total_debt_paydown: Money,
    pub final_cash: Money,
    pub final_leverage: Money,
    pub holding_period: Money,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSuccess {
    pub success: bool,
    pub case_id: String,
    pub sources_uses: SourcesUsesOutput,
    pub annual_cash_flows: BTreeMap<i32, AnnualCashFlow>,
    pub debt_schedules: BTreeMap<String, DebtScheduleOutput>,
    pub cash_balance: BTreeMap<i32, Money>,
    pub leverage_metrics: BTreeMap<i32, LeverageMetrics>,
    pub returns: ReturnsOutput,
    pub summary: Summary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub success: bool,
    pub case_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Success(AnalysisSuccess),
    Failure(AnalysisFailure),
}

/// Runs the full analysis for `case_id` within `document`, never propagating
/// an error — binder and arithmetic failures alike are captured into the
/// failure variant.
pub fn run_analysis(document: &Value, case_id: &str) -> AnalysisResult {
    match try_run_analysis(document, case_id) {
        Ok(success) => AnalysisResult::Success(success),
        Err(e) => AnalysisResult::Failure(AnalysisFailure {
            success: false,
            case_id: case_id.to_string(),
            error: e.to_string(),
        }),
    }
}

fn try_run_analysis(document: &Value, case_id: &str) -> CorpFinanceResult<AnalysisSuccess> {
    let deal = bind(document, case_id)?;

    let sources_uses = build_sources_uses(&deal, None);
    let entry_equity = sources_uses
        .sources
        .iter()
        .find(|(label, _)| label == "Equity")
        .map(|(_, v)| *v)
        .unwrap_or(Money::ZERO);

    let mut cash_flows = build_unlevered_cash_flows(&deal);
    let waterfall: WaterfallOutput = run_waterfall(&deal, &cash_flows);
    retax(
        &mut cash_flows,
        &deal,
        &waterfall.total_interest_by_year,
        &waterfall.cash_interest_by_year,
    );

    let returns = calculate_returns(&deal, &waterfall, entry_equity);

    let exit_year = deal.exit_year();
    let total_debt_paydown: Money = waterfall.schedules.values().map(|s| s.total_paydown).sum();
    let final_cash = waterfall.cash_balance.get(&exit_year).copied().unwrap_or(Money::ZERO);
    let final_leverage = waterfall
        .leverage_metrics
        .get(&exit_year)
        .map(|m| m.net_leverage)
        .unwrap_or(Money::ZERO);

    let summary = Summary {
        case_id: deal.case_id.clone(),
        irr: returns.irr,
        moic: returns.moic,
        entry_equity,
        exit_proceeds: returns.exit_proceeds,
        total_debt_paydown,
        final_cash,
        final_leverage,
        holding_period: returns.holding_period,
        currency: deal.currency.clone(),
    };

    Ok(AnalysisSuccess {
        success: true,
        case_id: deal.case_id.clone(),
        sources_uses,
        annual_cash_flows: cash_flows,
        debt_schedules: waterfall.schedules,
        cash_balance: waterfall.cash_balance,
        leverage_metrics: waterfall.leverage_metrics,
        returns,
        summary,
    })
}
