//! Debt Waterfall Engine: per-year fixed-point iteration over interest, PIK
//! capitalization, mandatory amortization, revolver draws and cash sweep.
//!
//! Grounded primarily on `DebtScheduleTracker.calculate_schedules` in the
//! Python original — the one piece of this engine with no real counterpart
//! in the teacher's `pe/debt_schedule.rs` (which models a single static
//! per-tranche schedule, not a cross-tranche revolver-plug waterfall) or its
//! `pe/waterfall.rs` (an unrelated PE-fund LP/GP carry distribution
//! waterfall). See DESIGN.md for the open-question resolutions encoded here
//! (revolver cap enforcement, the deal-rate-throughout tax policy, and the
//! revolver's net-movement `total` field).

use std::collections::BTreeMap;

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Money;

use super::cash_flow::AnnualCashFlow;
use super::model::{Deal, Tranche};

const MAX_ITERATIONS: u32 = 10;
const CONVERGENCE_THRESHOLD: Money = dec!(0.01);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrincipalPayment {
    pub mandatory: Money,
    pub sweep: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtScheduleOutput {
    pub label: String,
    #[serde(rename = "type")]
    pub tranche_type: String,
    pub starting_balance: Money,
    pub original_size: Money,
    pub is_revolver: bool,
    pub balances: BTreeMap<i32, Money>,
    pub principal_payments: BTreeMap<i32, PrincipalPayment>,
    pub interest_expense: BTreeMap<i32, Money>,
    pub pik_interest: BTreeMap<i32, Money>,
    pub revolver_draws: BTreeMap<i32, Money>,
    pub total_paydown: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeverageMetrics {
    pub net_leverage: Money,
    pub gross_leverage: Money,
    pub total_debt: Money,
    pub cash: Money,
    pub net_debt: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallOutput {
    /// Keyed by tranche label; iteration order is not significant, callers
    /// needing seniority order should consult `Deal::non_revolver_in_seniority_order`.
    pub schedules: BTreeMap<String, DebtScheduleOutput>,
    pub total_interest_by_year: BTreeMap<i32, Money>,
    pub cash_interest_by_year: BTreeMap<i32, Money>,
    pub cash_balance: BTreeMap<i32, Money>,
    pub leverage_metrics: BTreeMap<i32, LeverageMetrics>,
    pub converged_by_year: BTreeMap<i32, bool>,
}

struct TrancheState<'a> {
    tranche: &'a Tranche,
    balances: BTreeMap<i32, Money>,
    cash_interest: BTreeMap<i32, Money>,
    pik_interest: BTreeMap<i32, Money>,
    principal: BTreeMap<i32, PrincipalPayment>,
    revolver_draws: BTreeMap<i32, Money>,
}

/// Runs the debt waterfall over the full forecast horizon, mutating nothing
/// outside its own return value. `cash_flows` must already hold the
/// first-pass unlevered series for every forecast year.
pub fn run_waterfall(deal: &Deal, cash_flows: &BTreeMap<i32, AnnualCashFlow>) -> WaterfallOutput {
    let deal_year = deal.deal_year();
    let forecast_years = deal.forecast_years();
    let revolver_label = deal.revolver().map(|t| t.label.clone());
    let non_revolver_order = deal.non_revolver_in_seniority_order();

    let mut states: Vec<TrancheState> = deal
        .tranches
        .iter()
        .map(|t| {
            let mut balances = BTreeMap::new();
            balances.insert(deal_year, t.drawn_amount());
            TrancheState {
                tranche: t,
                balances,
                cash_interest: BTreeMap::new(),
                pik_interest: BTreeMap::new(),
                principal: BTreeMap::new(),
                revolver_draws: BTreeMap::new(),
            }
        })
        .collect();

    let mut total_interest_by_year = BTreeMap::new();
    let mut cash_interest_by_year = BTreeMap::new();
    let mut cash_balance = BTreeMap::new();
    let mut converged_by_year = BTreeMap::new();
    let mut prev_year_cash = deal.minimum_cash;

    for (year_idx, &year) in forecast_years.iter().enumerate() {
        let prev_year = year - 1;
        let mut prev_revolver_balance = revolver_label
            .as_ref()
            .and_then(|label| states.iter().find(|s| &s.tranche.label == label))
            .and_then(|s| s.balances.get(&prev_year).copied())
            .unwrap_or(Money::ZERO);

        let row = &cash_flows[&year];
        let ebitda = row.ebitda;
        let ebit = row.ebit;
        let capex = row.capex;
        let change_wc = row.change_wc;

        let mut converged = false;
        let mut total_cash_interest = Money::ZERO;
        let mut total_pik_interest = Money::ZERO;

        for iteration in 0..MAX_ITERATIONS {
            total_cash_interest = Money::ZERO;
            total_pik_interest = Money::ZERO;

            // STEP 1: interest accrual.
            for s in states.iter_mut() {
                let beginning = s
                    .balances
                    .get(&prev_year)
                    .copied()
                    .unwrap_or_else(|| s.tranche.drawn_amount());
                let (cash_interest, pik_interest) = if beginning > Money::ZERO {
                    let rate = if s.tranche.is_floating {
                        deal.reference_rate_curve.rate_for_year(year) + s.tranche.margin
                    } else {
                        s.tranche.cash_rate
                    };
                    (beginning * rate, beginning * s.tranche.pik_rate)
                } else {
                    (Money::ZERO, Money::ZERO)
                };
                s.cash_interest.insert(year, cash_interest);
                s.pik_interest.insert(year, pik_interest);
                total_cash_interest += cash_interest;
                total_pik_interest += pik_interest;
            }

            // STEP 2: PIK capitalization for every non-revolver tranche.
            for s in states.iter_mut() {
                if s.tranche.is_revolver {
                    continue;
                }
                let beginning = s
                    .balances
                    .get(&prev_year)
                    .copied()
                    .unwrap_or_else(|| s.tranche.drawn_amount());
                let pik = s.pik_interest.get(&year).copied().unwrap_or(Money::ZERO);
                s.balances.insert(year, beginning + pik);
            }

            // STEP 3: pro-forma CFADS. The deal's tax rate is used throughout
            // every iteration (see DESIGN.md's tax-rate open question).
            let cash_taxes = ((ebit - (total_cash_interest + total_pik_interest)) * deal.tax_rate)
                .max(Money::ZERO);
            let cfads = ebitda - total_cash_interest - cash_taxes + capex + change_wc;
            let available_for_debt = prev_year_cash + cfads - deal.minimum_cash;

            // STEP 4: mandatory amortization schedule.
            let mut mandatory_by_label: BTreeMap<String, Money> = BTreeMap::new();
            for t in &non_revolver_order {
                if let Some(pct) = t.amortization_pct(year_idx) {
                    let current_balance = states
                        .iter()
                        .find(|s| s.tranche.label == t.label)
                        .and_then(|s| s.balances.get(&year).copied())
                        .unwrap_or(Money::ZERO);
                    let amort_amount = (t.original_size * pct).min(current_balance);
                    mandatory_by_label.insert(t.label.clone(), amort_amount);
                }
            }

            for s in states.iter_mut() {
                s.principal.insert(year, PrincipalPayment::default());
            }

            // STEP 5: pay mandatory amortization, shortfall drawn from revolver.
            let mut remaining_cash = available_for_debt;
            let mut rcf_draw_needed = Money::ZERO;

            for t in &non_revolver_order {
                let mandatory_due = mandatory_by_label.get(&t.label).copied().unwrap_or(Money::ZERO);
                if mandatory_due <= Money::ZERO {
                    continue;
                }
                let s = states.iter_mut().find(|s| s.tranche.label == t.label).unwrap();
                s.principal.get_mut(&year).unwrap().mandatory = mandatory_due;
                *s.balances.get_mut(&year).unwrap() -= mandatory_due;
                if remaining_cash >= mandatory_due {
                    remaining_cash -= mandatory_due;
                } else {
                    let cash_portion = remaining_cash.max(Money::ZERO);
                    rcf_draw_needed += mandatory_due - cash_portion;
                    remaining_cash = Money::ZERO;
                }
            }

            if let Some(label) = &revolver_label {
                if rcf_draw_needed > Money::ZERO {
                    let s = states.iter_mut().find(|s| &s.tranche.label == label).unwrap();
                    let prev_balance = s.balances.get(&prev_year).copied().unwrap_or(Money::ZERO);
                    // Open question resolved: enforce the revolver's cap at original_size.
                    let cap_room = (s.tranche.original_size - prev_balance).max(Money::ZERO);
                    let draw = rcf_draw_needed.min(cap_room);
                    s.balances.insert(year, prev_balance + draw);
                    s.revolver_draws.insert(year, draw);
                    s.principal.insert(
                        year,
                        PrincipalPayment {
                            mandatory: Money::ZERO,
                            sweep: Money::ZERO,
                            total: -draw,
                        },
                    );
                }
            }

            // STEP 6: cash sweep — revolver first (mutually exclusive with a draw), then seniority order.
            if remaining_cash > Money::ZERO {
                if let Some(label) = &revolver_label {
                    if rcf_draw_needed == Money::ZERO {
                        let s = states.iter_mut().find(|s| &s.tranche.label == label).unwrap();
                        let opening = s.balances.get(&prev_year).copied().unwrap_or(Money::ZERO);
                        let current = s.balances.get(&year).copied().unwrap_or(opening);
                        if current > Money::ZERO {
                            let repayment = remaining_cash.min(current);
                            s.balances.insert(year, current - repayment);
                            let p = s.principal.get_mut(&year).unwrap();
                            p.sweep = repayment;
                            p.total += repayment;
                            remaining_cash -= repayment;
                        }
                    }
                }

                for t in &non_revolver_order {
                    if remaining_cash <= Money::ZERO {
                        break;
                    }
                    let s = states.iter_mut().find(|s| s.tranche.label == t.label).unwrap();
                    let current = s.balances.get(&year).copied().unwrap_or(Money::ZERO);
                    if current > Money::ZERO {
                        let sweep_amount = remaining_cash.min(current);
                        let p = s.principal.get_mut(&year).unwrap();
                        p.sweep = sweep_amount;
                        p.total += sweep_amount;
                        *s.balances.get_mut(&year).unwrap() -= sweep_amount;
                        remaining_cash -= sweep_amount;
                    }
                }
            }

            // STEP 7: revolver carries forward unchanged if it saw no activity this year.
            if let Some(label) = &revolver_label {
                let s = states.iter_mut().find(|s| &s.tranche.label == label).unwrap();
                if !s.balances.contains_key(&year) {
                    let prev = s.balances.get(&prev_year).copied().unwrap_or(Money::ZERO);
                    s.balances.insert(year, prev);
                    s.principal.insert(year, PrincipalPayment::default());
                }
            }

            // STEP 8 (for non-revolver tranches only — see DESIGN.md): total = mandatory + sweep.
            // The revolver's total was already set above as its net movement
            // (-draw, +repayment, or 0) and is never recomputed here.
            for t in &non_revolver_order {
                let s = states.iter_mut().find(|s| s.tranche.label == t.label).unwrap();
                let p = s.principal.get_mut(&year).unwrap();
                p.total = p.mandatory + p.sweep;
            }

            // STEP 8 (cont'd): ending cash. The revolver's `total` already carries
            // the correct sign (-draw, +repayment), so every tranche's `total`
            // is summed the same way — no special-casing.
            let total_cash_used: Money = states.iter().map(|s| s.principal[&year].total).sum();
            let ending_cash = prev_year_cash + cfads - total_cash_used;
            cash_balance.insert(year, ending_cash);

            // STEP 9: convergence check.
            match &revolver_label {
                Some(label) => {
                    let current_revolver = states
                        .iter()
                        .find(|s| &s.tranche.label == label)
                        .and_then(|s| s.balances.get(&year).copied())
                        .unwrap_or(Money::ZERO);
                    if (current_revolver - prev_revolver_balance).abs() < CONVERGENCE_THRESHOLD {
                        converged = true;
                        break;
                    }
                    prev_revolver_balance = current_revolver;
                }
                None => {
                    converged = true;
                    break;
                }
            }

            let _ = iteration;
        }

        total_interest_by_year.insert(year, total_cash_interest + total_pik_interest);
        cash_interest_by_year.insert(year, total_cash_interest);
        converged_by_year.insert(year, converged);
        prev_year_cash = cash_balance[&year];
    }

    let mut leverage_metrics = BTreeMap::new();
    for &year in &forecast_years {
        let total_debt: Money = states.iter().map(|s| s.balances.get(&year).copied().unwrap_or(Money::ZERO)).sum();
        let cash = cash_balance[&year];
        let net_debt = total_debt - cash;
        let ebitda = cash_flows[&year].ebitda;
        let (net_leverage, gross_leverage) = if ebitda > Money::ZERO {
            (net_debt / ebitda, total_debt / ebitda)
        } else {
            (Money::ZERO, Money::ZERO)
        };
        leverage_metrics.insert(
            year,
            LeverageMetrics {
                net_leverage,
                gross_leverage,
                total_debt,
                cash,
                net_debt,
            },
        );
    }

    let mut schedules = BTreeMap::new();
    let final_year = forecast_years.last().copied().unwrap_or(deal_year);
    for s in &states {
        let starting_balance = s.tranche.drawn_amount();
        let ending_balance = s.balances.get(&final_year).copied().unwrap_or(Money::ZERO);
        let balances = s
            .balances
            .iter()
            .filter(|(y, _)| **y != deal_year)
            .map(|(y, v)| (*y, *v))
            .collect();
        schedules.insert(
            s.tranche.label.clone(),
            DebtScheduleOutput {
                label: s.tranche.label.clone(),
                tranche_type: s.tranche.tranche_type.clone(),
                starting_balance,
                original_size: s.tranche.original_size,
                is_revolver: s.tranche.is_revolver,
                balances,
                principal_payments: s.principal.clone(),
                interest_expense: s.cash_interest.clone(),
                pik_interest: s.pik_interest.clone(),
                revolver_draws: s.revolver_draws.clone(),
                total_paydown: starting_balance - ending_balance,
            },
        );
    }

    WaterfallOutput {
        schedules,
        total_interest_by_year,
        cash_interest_by_year,
        cash_balance,
        leverage_metrics,
        converged_by_year,
    }
}
