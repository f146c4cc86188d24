//! Returns Calculator: exit proceeds, MOIC and IRR via the simple
//! compounded-return formula.
//!
//! Grounded on `ReturnsCalculator.calculate_irr_moic` /
//! `calculate_exit_proceeds` in the Python original — a single-cash-flow
//! compounded return (`MOIC = exit_proceeds / entry_equity`,
//! `IRR = MOIC^(1/H) - 1`), not the teacher's `pe/returns.rs` Newton-Raphson
//! IRR over a multi-period cash-flow series, which has no counterpart here.

use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

use super::model::Deal;
use super::waterfall::WaterfallOutput;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsOutput {
    pub entry_equity: Money,
    pub exit_enterprise_value: Money,
    pub exit_cash: Money,
    pub exit_debt: Money,
    pub exit_fees: Money,
    pub exit_proceeds: Money,
    pub moic: Money,
    pub irr: Rate,
    pub holding_period: Money,
}

/// The final forecast year's EBITDA if positive, otherwise the most recent
/// prior forecast year with a positive EBITDA, otherwise zero.
fn exit_ebitda(deal: &Deal) -> Money {
    for &year in deal.forecast_years().iter().rev() {
        let ebitda = deal.financials.ebitda.get(year);
        if ebitda > Money::ZERO {
            return ebitda;
        }
    }
    Money::ZERO
}

pub fn calculate_returns(deal: &Deal, waterfall: &WaterfallOutput, entry_equity: Money) -> ReturnsOutput {
    let exit_year = deal.exit_year();
    let exit_ebitda = exit_ebitda(deal);
    let exit_enterprise_value = deal.exit_valuation.resolve(exit_ebitda);
    let exit_fees = exit_enterprise_value * deal.exit_fee_percentage / dec!(100);

    let metrics = waterfall.leverage_metrics.get(&exit_year);
    let exit_cash = metrics.map(|m| m.cash).unwrap_or(Money::ZERO);
    let exit_debt = metrics.map(|m| m.total_debt).unwrap_or(Money::ZERO);
    let exit_net_debt = metrics.map(|m| m.net_debt).unwrap_or(exit_debt - exit_cash);

    let exit_proceeds = exit_enterprise_value - exit_fees - exit_net_debt;

    let moic = if entry_equity > Money::ZERO {
        exit_proceeds / entry_equity
    } else {
        Money::ZERO
    };

    let holding_period = deal.holding_period();
    let irr = if moic > Money::ZERO && holding_period > Money::ZERO {
        moic.powd(Money::ONE / holding_period) - Money::ONE
    } else {
        Money::ZERO
    };

    ReturnsOutput {
        entry_equity,
        exit_enterprise_value,
        exit_cash,
        exit_debt,
        exit_fees,
        exit_proceeds,
        moic,
        irr,
        holding_period,
    }
}
