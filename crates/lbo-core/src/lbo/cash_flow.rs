//! Unlevered Cash Flow Builder and Cash Flow Re-taxer.
//!
//! Grounded on `CashFlowEngine.calculate_annual_cash_flows` /
//! `update_with_interest` in the Python original, ported to `Decimal` with
//! the same sign conventions: capex and the working-capital delta are always
//! stored as outflows (negative), taxes are floored at zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Money;

use super::model::Deal;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualCashFlow {
    pub year: i32,
    pub ebitda: Money,
    pub ebit: Money,
    pub d_and_a: Money,
    pub cash_taxes: Money,
    pub capex: Money,
    pub change_wc: Money,
    pub unlevered_fcf: Money,
    pub cash_interest: Money,
    pub fcf: Money,
    pub cfads: Money,
}

/// Builds the first-pass unlevered cash flow table, before interest is known.
pub fn build_unlevered_cash_flows(deal: &Deal) -> BTreeMap<i32, AnnualCashFlow> {
    let deal_year = deal.deal_year();
    let mut prior_wc = deal.financials.working_capital.get(deal_year);

    let mut table = BTreeMap::new();
    for year in deal.forecast_years() {
        let ebitda = deal.financials.ebitda.get(year);
        let ebit = deal.financials.ebit(year);
        let d_and_a = deal.financials.d_and_a(year);
        let cash_taxes = (ebit * deal.tax_rate).max(Money::ZERO);

        let capex_raw = deal.financials.capex.get(year);
        let capex = -capex_raw.abs();

        let wc = deal.financials.working_capital.get(year);
        let change_wc = -(wc - prior_wc);
        prior_wc = wc;

        let unlevered_fcf = ebitda - cash_taxes.abs() + capex + change_wc;

        table.insert(
            year,
            AnnualCashFlow {
                year,
                ebitda,
                ebit,
                d_and_a,
                cash_taxes,
                capex,
                change_wc,
                unlevered_fcf,
                cash_interest: Money::ZERO,
                fcf: unlevered_fcf,
                cfads: unlevered_fcf,
            },
        );
    }
    table
}

/// Re-computes taxes and FCF using the waterfall's final interest series.
pub fn retax(
    table: &mut BTreeMap<i32, AnnualCashFlow>,
    deal: &Deal,
    total_interest_by_year: &BTreeMap<i32, Money>,
    cash_interest_by_year: &BTreeMap<i32, Money>,
) {
    for (year, row) in table.iter_mut() {
        let total_interest = total_interest_by_year.get(year).copied().unwrap_or(Money::ZERO);
        let cash_interest = cash_interest_by_year.get(year).copied().unwrap_or(Money::ZERO);

        row.cash_taxes = ((row.ebit - total_interest) * deal.tax_rate).max(Money::ZERO);
        row.unlevered_fcf = row.ebitda - row.cash_taxes.abs() + row.capex + row.change_wc;
        row.cash_interest = -cash_interest;
        row.fcf = row.unlevered_fcf + row.cash_interest;
        row.cfads = row.fcf;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lbo::model::{Financials, FinancialSeries, ReferenceRateCurve, Valuation, ValuationMethod};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap as Map;

    fn series(pairs: &[(i32, Money)]) -> FinancialSeries {
        FinancialSeries(pairs.iter().copied().collect())
    }

    fn deal_with(ebitda: &[(i32, Money)], capex: &[(i32, Money)], wc: &[(i32, Money)]) -> Deal {
        Deal {
            case_id: "base_case".into(),
            currency: "USD".into(),
            unit: "millions".into(),
            deal_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            exit_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            tax_rate: dec!(0.25),
            minimum_cash: Money::ZERO,
            entry_fee_percentage: Money::ZERO,
            exit_fee_percentage: Money::ZERO,
            entry_valuation: Valuation {
                method: ValuationMethod::Multiple,
                multiple: dec!(8),
                hardcoded_value: Money::ZERO,
            },
            exit_valuation: Valuation {
                method: ValuationMethod::Multiple,
                multiple: dec!(8),
                hardcoded_value: Money::ZERO,
            },
            purchase_price: dec!(200),
            tranches: vec![],
            reference_rate_curve: ReferenceRateCurve {
                rate_name: "SOFR".into(),
                rates_by_year: Map::new(),
                default_rate: dec!(0.02),
            },
            financials: Financials {
                revenue: FinancialSeries::default(),
                ebitda: series(ebitda),
                ebit: None,
                d_and_a: None,
                capex: series(capex),
                working_capital: series(wc),
            },
        }
    }

    #[test]
    fn zero_debt_taxes_are_flat_percentage_of_ebitda() {
        let deal = deal_with(
            &[(2024, dec!(25)), (2025, dec!(28)), (2026, dec!(31))],
            &[],
            &[],
        );
        let table = build_unlevered_cash_flows(&deal);
        assert_eq!(table.len(), 2);
        let y2025 = &table[&2025];
        assert_eq!(y2025.cash_taxes, dec!(7));
        assert_eq!(y2025.unlevered_fcf, dec!(21));
    }

    #[test]
    fn capex_is_always_stored_negative() {
        let deal = deal_with(&[(2025, dec!(10)), (2026, dec!(10))], &[(2025, dec!(3)), (2026, dec!(-3))], &[]);
        let table = build_unlevered_cash_flows(&deal);
        assert_eq!(table[&2025].capex, dec!(-3));
        assert_eq!(table[&2026].capex, dec!(-3));
    }

    #[test]
    fn working_capital_increase_is_an_outflow() {
        let deal = deal_with(
            &[(2024, dec!(10)), (2025, dec!(10)), (2026, dec!(10))],
            &[],
            &[(2024, dec!(5)), (2025, dec!(8)), (2026, dec!(8))],
        );
        let table = build_unlevered_cash_flows(&deal);
        assert_eq!(table[&2025].change_wc, dec!(-3));
        assert_eq!(table[&2026].change_wc, Money::ZERO);
    }

    #[test]
    fn retax_is_idempotent_given_same_interest_series() {
        let deal = deal_with(
            &[(2024, dec!(25)), (2025, dec!(28)), (2026, dec!(31))],
            &[],
            &[],
        );
        let mut table = build_unlevered_cash_flows(&deal);
        let total_interest: BTreeMap<i32, Money> = [(2025, dec!(6)), (2026, dec!(6))].into_iter().collect();
        let cash_interest = total_interest.clone();
        retax(&mut table, &deal, &total_interest, &cash_interest);
        let first_pass = table.clone();
        retax(&mut table, &deal, &total_interest, &cash_interest);
        assert_eq!(table[&2025].cfads, first_pass[&2025].cfads);
        assert_eq!(table[&2026].cfads, first_pass[&2026].cfads);
    }
}
