//! Markup evaluation pipeline.
//!
//! `evaluate_price` runs filter → sequencer → tier resolution → compounding
//! over a caller-supplied snapshot of rules and tiers. It holds no state and
//! performs no I/O, so identical inputs always produce identical output.

pub mod compounding;
pub mod filter;
pub mod schedule;
pub mod sequencer;
pub mod tiers;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{CombineMode, PricingRule, ScopeKind, TierIndex, ValueKind};
use crate::domain::value_objects::{round_cents, Quantity};
use crate::{PricingError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    pub product_id: String,
    pub category_name: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl PriceRequest {
    pub fn new(product_id: impl Into<String>, category_name: impl Into<String>, base_price: Decimal) -> Self {
        Self { product_id: product_id.into(), category_name: category_name.into(), base_price, quantity: None }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn quantity(&self) -> Quantity {
        Quantity::normalized(self.quantity)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_price.is_sign_negative() && !self.base_price.is_zero() {
            return Err(PricingError::InvalidInput(format!("base price {} is negative", self.base_price)));
        }
        Ok(())
    }
}

/// One rule that fired, with the running price after it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMarkup {
    pub rule_id: String,
    pub rule_name: String,
    pub scope: ScopeKind,
    pub target_key: Option<String>,
    pub value_kind: ValueKind,
    pub effective_value: Decimal,
    pub original_value: Decimal,
    pub priority: i32,
    pub combine_mode: CombineMode,
    pub used_tier: bool,
    pub price_after_markup: Decimal,
}

/// A live, in-scope rule left out because its data could not be applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRule {
    pub rule_id: String,
    pub rule_name: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEvaluation {
    pub base_price: Decimal,
    pub final_price: Decimal,
    pub quantity: Quantity,
    pub applied_markups: Vec<AppliedMarkup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_rules: Vec<SkippedRule>,
}

impl PriceEvaluation {
    pub fn has_markup(&self) -> bool { self.final_price != self.base_price }
}

/// Prices one product at the requested quantity.
///
/// Fails only when the request itself is malformed; bad rule data is skipped
/// and reported in `skipped_rules`.
#[tracing::instrument(
    level = "debug",
    skip(request, rules, tiers),
    fields(product_id = %request.product_id, category = %request.category_name, quantity = ?request.quantity)
)]
pub fn evaluate_price(request: &PriceRequest, rules: &[PricingRule], tiers: &TierIndex, now: DateTime<Utc>) -> Result<PriceEvaluation> {
    request.validate()?;
    Ok(evaluate_at(request, request.quantity(), rules, tiers, now))
}

pub(crate) fn evaluate_at(
    request: &PriceRequest,
    quantity: Quantity,
    rules: &[PricingRule],
    tiers: &TierIndex,
    now: DateTime<Utc>,
) -> PriceEvaluation {
    let mut applicable = filter::applicable_rules(rules, &request.product_id, &request.category_name, now);
    sequencer::sequence(&mut applicable);

    let steps: Vec<_> = applicable
        .into_iter()
        .map(|rule| tiers::resolve(rule, tiers::tiers_for(tiers, &rule.id), quantity))
        .collect();
    let outcome = compounding::compound(request.base_price, &steps);

    PriceEvaluation {
        base_price: round_cents(request.base_price),
        final_price: round_cents(outcome.final_price),
        quantity,
        applied_markups: outcome.applied,
        skipped_rules: outcome.skipped,
    }
}
