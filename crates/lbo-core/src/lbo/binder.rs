//! Converts a loosely-typed external document into a validated [`Deal`].
//!
//! Grounded on `ProjectExtractor` in the Python original: synonym tolerance for
//! tranche field names, three accepted encodings for financial series, and
//! purchase-price derivation from an entry multiple.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::CorpFinanceError;
use crate::types::{Money, Rate};
use crate::CorpFinanceResult;

use super::model::{
    Deal, Financials, FinancialSeries, ReferenceRateCurve, Tranche, Valuation, ValuationMethod,
};

const DEFAULT_DEAL_DATE: &str = "2024-12-31";
const DEFAULT_EXIT_DATE: &str = "2029-12-31";
const DEFAULT_FLOAT_RATE: &str = "0.02";

/// Bind the named case within `document` into a [`Deal`].
pub fn bind(document: &Value, case_id: &str) -> CorpFinanceResult<Deal> {
    let meta = document.get("meta");
    let currency = meta
        .and_then(|m| m.get("currency"))
        .and_then(Value::as_str)
        .unwrap_or("USD")
        .to_string();
    let unit = meta
        .and_then(|m| m.get("unit"))
        .and_then(Value::as_str)
        .unwrap_or("millions")
        .to_string();

    let case_data = document
        .get("cases")
        .and_then(|c| c.get(case_id))
        .ok_or_else(|| CorpFinanceError::InvalidInput {
            field: "case_id".into(),
            reason: format!("case '{case_id}' not found in project"),
        })?;

    let deal_params = case_data.get("deal_parameters").cloned().unwrap_or(Value::Null);

    let deal_date = parse_date(deal_params.get("deal_date"), DEFAULT_DEAL_DATE)?;
    let exit_date = parse_date(deal_params.get("exit_date"), DEFAULT_EXIT_DATE)?;
    if exit_date.format("%Y").to_string() <= deal_date.format("%Y").to_string() {
        return Err(CorpFinanceError::InvalidInput {
            field: "exit_date".into(),
            reason: "exit year must be strictly after the deal year".into(),
        });
    }

    let financials = extract_financials(case_data);
    if financials.ebitda.0.is_empty() || financials.ebitda.is_empty_or_all_zero() {
        return Err(CorpFinanceError::InsufficientData(
            "no EBITDA data found for case".into(),
        ));
    }

    let tax_rate = decimal_field(&deal_params, "tax_rate").unwrap_or(dec("0.25"));
    let minimum_cash = decimal_field(&deal_params, "minimum_cash").unwrap_or(Money::ZERO);
    let entry_fee_percentage = decimal_field(&deal_params, "entry_fee_percentage").unwrap_or(dec("2.0"));
    let exit_fee_percentage = decimal_field(&deal_params, "exit_fee_percentage").unwrap_or(dec("2.0"));

    let entry_valuation_raw = deal_params.get("entry_valuation").cloned().unwrap_or(Value::Null);
    let exit_valuation_raw = deal_params.get("exit_valuation").cloned().unwrap_or(Value::Null);
    let entry_valuation = extract_valuation(&entry_valuation_raw);
    let exit_valuation = extract_valuation(&exit_valuation_raw);

    let deal_year: i32 = deal_date.format("%Y").to_string().parse().unwrap_or(0);
    let entry_ebitda = financials.ebitda.get(deal_year);

    let purchase_price = if entry_valuation.method == ValuationMethod::Hardcode
        && entry_valuation.hardcoded_value > Money::ZERO
    {
        entry_valuation.hardcoded_value
    } else if entry_valuation.multiple > Money::ZERO && entry_ebitda > Money::ZERO {
        entry_ebitda * entry_valuation.multiple
    } else {
        Money::ZERO
    };

    if purchase_price <= Money::ZERO {
        return Err(CorpFinanceError::InvalidInput {
            field: "entry_valuation".into(),
            reason: "entry multiple is zero and no hardcoded purchase price was supplied".into(),
        });
    }

    let horizon_len = (exit_date.format("%Y").to_string().parse::<i32>().unwrap_or(0) - deal_year).max(0) as usize;

    let capital_structure = deal_params.get("capital_structure").cloned().unwrap_or(Value::Null);
    let raw_tranches = capital_structure
        .get("tranches")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut tranches = Vec::with_capacity(raw_tranches.len());
    for raw in &raw_tranches {
        tranches.push(extract_tranche(raw, horizon_len)?);
    }

    let reference_rate_curve = extract_reference_rate_curve(capital_structure.get("reference_rate_curve"), &currency);

    Ok(Deal {
        case_id: case_id.to_string(),
        currency,
        unit,
        deal_date,
        exit_date,
        tax_rate,
        minimum_cash,
        entry_fee_percentage,
        exit_fee_percentage,
        entry_valuation,
        exit_valuation,
        purchase_price,
        tranches,
        reference_rate_curve,
        financials,
    })
}

fn dec(s: &str) -> Decimal {
    s.parse().expect("literal decimal constant")
}

fn parse_date(value: Option<&Value>, default: &str) -> CorpFinanceResult<NaiveDate> {
    let s = value.and_then(Value::as_str).unwrap_or(default);
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CorpFinanceError::DateError(format!("could not parse date '{s}'")))
}

fn decimal_field(value: &Value, key: &str) -> Option<Decimal> {
    value.get(key).and_then(value_as_decimal)
}

fn value_as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.as_f64().and_then(|f| Decimal::try_from(f).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn extract_valuation(value: &Value) -> Valuation {
    let method = match value.get("method").and_then(Value::as_str) {
        Some("hardcode") => ValuationMethod::Hardcode,
        _ => ValuationMethod::Multiple,
    };
    let multiple = decimal_field(value, "multiple").unwrap_or(Money::ZERO);
    let hardcoded_value = decimal_field(value, "hardcoded_value").unwrap_or(Money::ZERO);
    Valuation {
        method,
        multiple,
        hardcoded_value,
    }
}

fn extract_reference_rate_curve(value: Option<&Value>, currency: &str) -> ReferenceRateCurve {
    let rate_name = ReferenceRateCurve::name_for_currency(currency);
    let default_rate = dec(DEFAULT_FLOAT_RATE);
    let mut rates_by_year = BTreeMap::new();
    if let Some(Value::Object(map)) = value {
        for (year_str, rate_val) in map {
            if let (Ok(year), Some(rate)) = (year_str.parse::<i32>(), value_as_decimal(rate_val)) {
                rates_by_year.insert(year, rate);
            }
        }
    }
    ReferenceRateCurve {
        rate_name,
        rates_by_year,
        default_rate,
    }
}

fn extract_financials(case_data: &Value) -> Financials {
    let financials = case_data.get("financials").cloned().unwrap_or(Value::Null);
    let income_statement = financials.get("income_statement").cloned().unwrap_or(Value::Null);
    let cash_flow_statement = financials.get("cash_flow_statement").cloned().unwrap_or(Value::Null);

    let revenue = income_statement
        .get("revenue")
        .map(extract_standard_metric)
        .unwrap_or_default();
    let ebitda = income_statement
        .get("ebitda")
        .map(extract_array_metric)
        .unwrap_or_default();
    let ebit = income_statement.get("ebit").map(extract_array_metric);
    let d_and_a = income_statement
        .get("d_and_a")
        .or_else(|| income_statement.get("d&a"))
        .map(extract_array_metric);
    let capex = cash_flow_statement
        .get("capex")
        .map(extract_standard_metric)
        .unwrap_or_default();
    let working_capital = cash_flow_statement
        .get("working_capital")
        .map(extract_standard_metric)
        .unwrap_or_default();

    Financials {
        revenue,
        ebitda,
        ebit,
        d_and_a,
        capex,
        working_capital,
    }
}

/// Extracts a standard-format series: list of {year, value}; {values: [...]};
/// or a year-keyed mapping whose value is a bare number or a {value: ...} object.
fn extract_standard_metric(data: &Value) -> FinancialSeries {
    let mut out = BTreeMap::new();
    match data {
        Value::Array(entries) => {
            fill_from_year_value_list(entries, &mut out);
        }
        Value::Object(map) => {
            if let Some(Value::Array(entries)) = map.get("values") {
                fill_from_year_value_list(entries, &mut out);
            } else {
                for (year_str, year_data) in map {
                    if let Ok(year) = year_str.parse::<i32>() {
                        let value = match year_data {
                            Value::Object(o) => o.get("value").and_then(value_as_decimal),
                            other => value_as_decimal(other),
                        };
                        if let Some(v) = value {
                            out.insert(year, v);
                        }
                    }
                }
            }
        }
        _ => {}
    }
    FinancialSeries(out)
}

/// Extracts an array-format series (EBITDA/EBIT/D&A), additionally tolerating
/// the legacy nested `{primary_use, data: {year: {value}}}` encoding.
fn extract_array_metric(data: &Value) -> FinancialSeries {
    let mut out = BTreeMap::new();
    if let Value::Array(entries) = data {
        let looks_simple = entries
            .first()
            .map(|e| e.get("year").is_some() && e.get("value").is_some())
            .unwrap_or(false);
        if looks_simple {
            fill_from_year_value_list(entries, &mut out);
        } else {
            let primary = entries
                .iter()
                .find(|e| e.get("primary_use").and_then(Value::as_i64) == Some(1))
                .or_else(|| entries.first());
            if let Some(Value::Object(nested)) = primary.and_then(|p| p.get("data")) {
                for (year_str, year_data) in nested {
                    if let Ok(year) = year_str.parse::<i32>() {
                        let value = match year_data {
                            Value::Object(o) => o.get("value").and_then(value_as_decimal),
                            other => value_as_decimal(other),
                        };
                        if let Some(v) = value {
                            out.insert(year, v);
                        }
                    }
                }
            }
        }
    } else if let Value::Object(map) = data {
        for (year_str, year_data) in map {
            if let Ok(year) = year_str.parse::<i32>() {
                let value = match year_data {
                    Value::Object(o) => o.get("value").and_then(value_as_decimal),
                    other => value_as_decimal(other),
                };
                if let Some(v) = value {
                    out.insert(year, v);
                }
            }
        }
    }
    FinancialSeries(out)
}

fn fill_from_year_value_list(entries: &[Value], out: &mut BTreeMap<i32, Money>) {
    for entry in entries {
        let year = entry.get("year").and_then(|y| match y {
            Value::Number(n) => n.as_i64().map(|v| v as i32),
            Value::String(s) => s.parse().ok(),
            _ => None,
        });
        let value = entry.get("value").and_then(value_as_decimal);
        if let (Some(year), Some(value)) = (year, value) {
            out.insert(year, value);
        }
    }
}

fn extract_tranche(raw: &Value, horizon_len: usize) -> CorpFinanceResult<Tranche> {
    let tranche_type = raw
        .get("tranche_type")
        .or_else(|| raw.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("Bond")
        .to_string();

    let label = raw
        .get("label")
        .or_else(|| raw.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("Debt Tranche")
        .to_string();

    let is_revolver = Tranche::is_revolver_type(&tranche_type);
    let is_floating = Tranche::is_floating_type(&tranche_type);

    let original_size = decimal_field(raw, "original_size")
        .or_else(|| decimal_field(raw, "amount"))
        .or_else(|| decimal_field(raw, "size"))
        .unwrap_or(Money::ZERO);
    if original_size <= Money::ZERO {
        return Err(CorpFinanceError::InvalidInput {
            field: format!("tranche[{label}].original_size"),
            reason: "tranche size must be positive".into(),
        });
    }

    let drawn_fraction = raw
        .get("percentage_drawn_at_deal_date")
        .and_then(value_as_decimal)
        .unwrap_or_else(|| if is_revolver { Money::ZERO } else { Money::ONE });

    let cash_rate = decimal_field(raw, "interest_rate")
        .filter(|r| *r != Rate::ZERO)
        .or_else(|| decimal_field(raw, "interest_margin").filter(|r| *r != Rate::ZERO))
        .or_else(|| decimal_field(raw, "cash_interest_rate"))
        .unwrap_or(Rate::ZERO);

    let margin = decimal_field(raw, "interest_margin").unwrap_or(Rate::ZERO);
    let pik_rate = decimal_field(raw, "pik_interest_rate")
        .or_else(|| decimal_field(raw, "pik_rate"))
        .unwrap_or(Rate::ZERO);

    let schedule_str = raw
        .get("amortization_schedule")
        .or_else(|| raw.get("amortization"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    let amortization_schedule = if let Some(s) = schedule_str {
        parse_amortization_schedule(s, &label)?
    } else if let Some(rate) = decimal_field(raw, "amortization_rate").filter(|r| *r > Rate::ZERO) {
        vec![rate; horizon_len]
    } else {
        Vec::new()
    };

    let financing_fee_fraction = decimal_field(raw, "financing_fees").unwrap_or(dec("0.01"));
    let seniority = raw.get("repayment_seniority")
        .or_else(|| raw.get("seniority"))
        .and_then(Value::as_i64)
        .unwrap_or(1) as i32;

    Ok(Tranche {
        label,
        tranche_type,
        original_size,
        drawn_fraction,
        cash_rate,
        is_floating,
        margin,
        pik_rate,
        amortization_schedule,
        financing_fee_fraction,
        seniority,
        is_revolver,
    })
}

/// Parses a `"p1/p2/.../pn"` schedule string into decimal fractions of original size.
fn parse_amortization_schedule(s: &str, label: &str) -> CorpFinanceResult<Vec<Rate>> {
    if s == "0" {
        return Ok(Vec::new());
    }
    s.split('/')
        .map(|part| {
            part.trim()
                .parse::<Decimal>()
                .map(|pct| pct / dec("100"))
                .map_err(|_| CorpFinanceError::InvalidInput {
                    field: format!("tranche[{label}].amortization_schedule"),
                    reason: format!("could not parse schedule entry '{part}'"),
                })
        })
        .collect()
}
