//! Sources & Uses: totals, equity-as-plug, balance validation.
//!
//! Grounded on `pe/sources_uses.rs` for shape, corrected against
//! `calculate_sources_uses` in the Python original for the 0.01 balance
//! tolerance and the equity-as-plug default.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Money;

use super::model::Deal;

const BALANCE_TOLERANCE: Money = dec!(0.01);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesUsesDetails {
    pub debt_to_equity_ratio: Money,
    pub equity_percentage: Money,
    pub debt_percentage: Money,
    pub total_fees: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesUsesValidation {
    pub balanced: bool,
    pub imbalance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesUsesOutput {
    /// Ordered (label, amount) pairs; debt tranches then equity.
    pub sources: Vec<(String, Money)>,
    pub total_sources: Money,
    /// Ordered (label, amount) pairs: purchase price, fees, minimum cash.
    pub uses: Vec<(String, Money)>,
    pub total_uses: Money,
    pub details: SourcesUsesDetails,
    pub validation: SourcesUsesValidation,
}

/// Build sources & uses for `deal`. `equity_override` lets a caller supply an
/// equity contribution that may not balance uses (spec Scenario E).
pub fn build_sources_uses(deal: &Deal, equity_override: Option<Money>) -> SourcesUsesOutput {
    let transaction_fees = deal.purchase_price * deal.entry_fee_percentage / dec!(100);
    let total_financing_fees: Money = deal.tranches.iter().map(|t| t.financing_fee_amount()).sum();

    let mut uses = vec![("Purchase Price".to_string(), deal.purchase_price)];
    if transaction_fees > Money::ZERO {
        uses.push(("Transaction Fees".to_string(), transaction_fees));
    }
    if total_financing_fees > Money::ZERO {
        uses.push(("Financing Fees".to_string(), total_financing_fees));
    }
    if deal.minimum_cash > Money::ZERO {
        uses.push(("Minimum Cash".to_string(), deal.minimum_cash));
    }
    let total_uses: Money = uses.iter().map(|(_, v)| *v).sum();

    let total_debt: Money = deal.tranches.iter().map(|t| t.drawn_amount()).sum();
    let equity = equity_override.unwrap_or(total_uses - total_debt);

    let mut sources: Vec<(String, Money)> = deal
        .tranches
        .iter()
        .map(|t| (t.label.clone(), t.drawn_amount()))
        .collect();
    sources.push(("Equity".to_string(), equity));
    let total_sources: Money = sources.iter().map(|(_, v)| *v).sum();

    let imbalance = (total_sources - total_uses).abs();
    let balanced = imbalance <= BALANCE_TOLERANCE;

    let debt_to_equity_ratio = if equity > Money::ZERO {
        total_debt / equity
    } else {
        Money::ZERO
    };
    let equity_percentage = if total_sources > Money::ZERO {
        equity / total_sources * dec!(100)
    } else {
        Money::ZERO
    };
    let debt_percentage = if total_sources > Money::ZERO {
        total_debt / total_sources * dec!(100)
    } else {
        Money::ZERO
    };

    SourcesUsesOutput {
        sources,
        total_sources,
        uses,
        total_uses,
        details: SourcesUsesDetails {
            debt_to_equity_ratio,
            equity_percentage,
            debt_percentage,
            total_fees: transaction_fees + total_financing_fees,
        },
        validation: SourcesUsesValidation { balanced, imbalance },
    }
}
