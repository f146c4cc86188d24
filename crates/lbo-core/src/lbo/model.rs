use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Multiple, Rate, Years};

/// Type strings whose lower-cased value identifies a revolving credit facility.
const REVOLVER_TYPES: &[&str] = &["revolver", "revolving credit facility", "rcf"];

/// Type strings that default a tranche to a floating coupon.
const FLOATING_TYPES: &[&str] = &[
    "loan",
    "syndicated loan",
    "revolver",
    "rcf",
    "frn",
    "term_loan",
];

/// How an entry or exit value is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuationMethod {
    Multiple,
    Hardcode,
}

/// Entry or exit valuation assumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valuation {
    pub method: ValuationMethod,
    pub multiple: Multiple,
    pub hardcoded_value: Money,
}

impl Valuation {
    /// Resolve enterprise value given the EBITDA the multiple should apply to.
    pub fn resolve(&self, ebitda: Money) -> Money {
        match self.method {
            ValuationMethod::Hardcode if self.hardcoded_value > Money::ZERO => {
                self.hardcoded_value
            }
            _ => ebitda * self.multiple,
        }
    }
}

/// A single layer of the capital structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tranche {
    pub label: String,
    pub tranche_type: String,
    pub original_size: Money,
    pub drawn_fraction: Rate,
    pub cash_rate: Rate,
    pub is_floating: bool,
    pub margin: Rate,
    pub pik_rate: Rate,
    /// Per-year amortization percentages of original size, first forecast year first.
    /// Empty means bullet (no scheduled mandatory repayment).
    pub amortization_schedule: Vec<Rate>,
    pub financing_fee_fraction: Rate,
    pub seniority: i32,
    pub is_revolver: bool,
}

impl Tranche {
    pub fn drawn_amount(&self) -> Money {
        self.original_size * self.drawn_fraction
    }

    pub fn financing_fee_amount(&self) -> Money {
        self.original_size * self.financing_fee_fraction
    }

    pub fn is_revolver_type(type_name: &str) -> bool {
        REVOLVER_TYPES.contains(&type_name.to_lowercase().as_str())
    }

    pub fn is_floating_type(type_name: &str) -> bool {
        FLOATING_TYPES.contains(&type_name.to_lowercase().as_str())
    }

    /// Mandatory amortization percentage due in the given forecast-year index
    /// (0-indexed from the first forecast year). None past the schedule's length.
    pub fn amortization_pct(&self, year_index: usize) -> Option<Rate> {
        self.amortization_schedule.get(year_index).copied()
    }
}

/// Floating reference rate curve, keyed by calendar year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceRateCurve {
    pub rate_name: String,
    pub rates_by_year: BTreeMap<i32, Rate>,
    pub default_rate: Rate,
}

impl ReferenceRateCurve {
    pub fn rate_for_year(&self, year: i32) -> Rate {
        self.rates_by_year
            .get(&year)
            .copied()
            .unwrap_or(self.default_rate)
    }

    /// Name the reference rate the way the source labels it by currency:
    /// USD -> SOFR, EUR -> ESTR, GBP -> SONIA, CHF -> SARON, JPY -> TONAR, else generic.
    pub fn name_for_currency(currency: &str) -> String {
        match currency.to_uppercase().as_str() {
            "USD" => "SOFR",
            "EUR" => "ESTR",
            "GBP" => "SONIA",
            "CHF" => "SARON",
            "JPY" => "TONAR",
            _ => "GENERIC",
        }
        .to_string()
    }
}

/// Year-indexed financial series, missing years read as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialSeries(pub BTreeMap<i32, Money>);

impl FinancialSeries {
    pub fn get(&self, year: i32) -> Money {
        self.0.get(&year).copied().unwrap_or(Money::ZERO)
    }

    pub fn is_empty_or_all_zero(&self) -> bool {
        self.0.values().all(|v| *v == Money::ZERO)
    }
}

/// The full set of projected financial series the engine consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Financials {
    pub revenue: FinancialSeries,
    pub ebitda: FinancialSeries,
    pub ebit: Option<FinancialSeries>,
    pub d_and_a: Option<FinancialSeries>,
    pub capex: FinancialSeries,
    pub working_capital: FinancialSeries,
}

impl Financials {
    pub fn ebit(&self, year: i32) -> Money {
        match &self.ebit {
            Some(series) => series.get(year),
            None => self.ebitda.get(year) - self.d_and_a(year),
        }
    }

    pub fn d_and_a(&self, year: i32) -> Money {
        self.d_and_a.as_ref().map(|s| s.get(year)).unwrap_or(Money::ZERO)
    }
}

/// A fully bound, immutable deal ready for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub case_id: String,
    pub currency: String,
    pub unit: String,
    pub deal_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub tax_rate: Rate,
    pub minimum_cash: Money,
    pub entry_fee_percentage: Rate,
    pub exit_fee_percentage: Rate,
    pub entry_valuation: Valuation,
    pub exit_valuation: Valuation,
    pub purchase_price: Money,
    pub tranches: Vec<Tranche>,
    pub reference_rate_curve: ReferenceRateCurve,
    pub financials: Financials,
}

impl Deal {
    pub fn deal_year(&self) -> i32 {
        self.deal_date.format("%Y").to_string().parse().unwrap_or(0)
    }

    pub fn exit_year(&self) -> i32 {
        self.exit_date.format("%Y").to_string().parse().unwrap_or(0)
    }

    /// Dense forecast horizon [deal_year+1 .. exit_year], inclusive.
    pub fn forecast_years(&self) -> Vec<i32> {
        let deal_year = self.deal_year();
        let exit_year = self.exit_year();
        (deal_year + 1..=exit_year).collect()
    }

    pub fn holding_period(&self) -> Years {
        Years::from(self.exit_year() - self.deal_year())
    }

    pub fn revolver(&self) -> Option<&Tranche> {
        self.tranches.iter().find(|t| t.is_revolver)
    }

    /// Non-revolver tranches ordered ascending by (seniority, label), the order
    /// mandatory amortization and cash sweeps are applied in.
    pub fn non_revolver_in_seniority_order(&self) -> Vec<&Tranche> {
        let mut tranches: Vec<&Tranche> = self.tranches.iter().filter(|t| !t.is_revolver).collect();
        tranches.sort_by(|a, b| a.seniority.cmp(&b.seniority).then_with(|| a.label.cmp(&b.label)));
        tranches
    }
}
