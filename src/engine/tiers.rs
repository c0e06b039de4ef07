//! Tier resolution: picks the value a rule contributes at a given quantity.

use rust_decimal::Decimal;

use crate::domain::aggregates::{PricingRule, PricingTier, TierIndex};
use crate::domain::value_objects::Quantity;

/// A rule paired with the value it contributes for one evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedRule<'a> {
    pub rule: &'a PricingRule,
    pub effective_value: Decimal,
    pub used_tier: bool,
}

pub fn tiers_for<'a>(index: &'a TierIndex, rule_id: &str) -> &'a [PricingTier] {
    index.get(rule_id).map(Vec::as_slice).unwrap_or(&[])
}

/// Scans tiers by ascending `min_quantity` and takes the first one containing
/// `quantity`. A matching tier replaces the rule's value outright; with no
/// match the rule's own value is used.
pub fn resolve<'a>(rule: &'a PricingRule, tiers: &[PricingTier], quantity: Quantity) -> ResolvedRule<'a> {
    let mut ordered: Vec<&PricingTier> = tiers.iter().collect();
    ordered.sort_by_key(|tier| tier.min_quantity);

    match ordered.into_iter().find(|tier| tier.contains(quantity)) {
        Some(tier) => ResolvedRule { rule, effective_value: tier.value, used_tier: true },
        None => ResolvedRule { rule, effective_value: rule.value, used_tier: false },
    }
}
