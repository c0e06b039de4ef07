//! Quantity price breaks for product detail pages.
//!
//! A unit price can only change where some tier of an applicable rule starts
//! or ends, so evaluating at those boundaries gives the whole schedule.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{evaluate_at, filter, tiers, PriceRequest};
use crate::domain::aggregates::{PricingRule, TierIndex};
use crate::domain::value_objects::Quantity;
use crate::Result;

/// Unit price for every quantity in `[min_quantity, max_quantity]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreak {
    pub min_quantity: u32,
    pub max_quantity: Option<u32>,
    pub unit_price: Decimal,
}

/// Bands covering `[1, ∞)` in ascending order. Neighbouring bands always
/// differ in unit price. The request's own quantity is ignored.
pub fn price_breaks(request: &PriceRequest, rules: &[PricingRule], tiers: &TierIndex, now: DateTime<Utc>) -> Result<Vec<PriceBreak>> {
    request.validate()?;

    let applicable = filter::applicable_rules(rules, &request.product_id, &request.category_name, now);
    let mut boundaries = BTreeSet::from([1u32]);
    for rule in applicable {
        for tier in tiers::tiers_for(tiers, &rule.id) {
            boundaries.insert(tier.min_quantity.max(1));
            if let Some(after) = tier.max_quantity.and_then(|max| max.checked_add(1)) {
                boundaries.insert(after);
            }
        }
    }

    let starts: Vec<u32> = boundaries.into_iter().collect();
    let mut breaks: Vec<PriceBreak> = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let unit_price = evaluate_at(request, Quantity::new(start), rules, tiers, now).final_price;
        let max_quantity = starts.get(i + 1).map(|next| next - 1);
        match breaks.last_mut() {
            Some(last) if last.unit_price == unit_price => last.max_quantity = max_quantity,
            _ => breaks.push(PriceBreak { min_quantity: start, max_quantity, unit_price }),
        }
    }
    Ok(breaks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CombineMode, PricingTier, RuleScope, ValueKind};
    use crate::PricingError;

    fn setup() -> (Vec<PricingRule>, TierIndex) {
        let rules = vec![
            PricingRule::new("volume", "Volume", RuleScope::Product("p1".into()), ValueKind::Percentage, Decimal::ZERO, CombineMode::Additive),
            PricingRule::new("other", "Other", RuleScope::Product("p2".into()), ValueKind::Percentage, Decimal::ZERO, CombineMode::Additive),
        ];
        let mut tiers = TierIndex::new();
        tiers.insert("volume".into(), vec![
            PricingTier::new(3, Some(9), Decimal::new(-10, 0)),
            PricingTier::new(10, Some(49), Decimal::new(-20, 0)),
        ]);
        tiers.insert("other".into(), vec![PricingTier::new(2, None, Decimal::new(-50, 0))]);
        (rules, tiers)
    }

    #[test]
    fn test_breaks_cover_every_quantity() {
        let (rules, tiers) = setup();
        let request = PriceRequest::new("p1", "Flower", Decimal::new(100, 0)).with_quantity(7);
        let breaks = price_breaks(&request, &rules, &tiers, Utc::now()).unwrap();
        assert_eq!(breaks, vec![
            PriceBreak { min_quantity: 1, max_quantity: Some(2), unit_price: Decimal::new(100, 0) },
            PriceBreak { min_quantity: 3, max_quantity: Some(9), unit_price: Decimal::new(90, 0) },
            PriceBreak { min_quantity: 10, max_quantity: Some(49), unit_price: Decimal::new(80, 0) },
            PriceBreak { min_quantity: 50, max_quantity: None, unit_price: Decimal::new(100, 0) },
        ]);
    }

    #[test]
    fn test_equal_bands_merge() {
        let rules = vec![PricingRule::new("r", "R", RuleScope::SiteWide, ValueKind::FixedAmount, Decimal::ONE, CombineMode::Additive)];
        let mut tiers = TierIndex::new();
        tiers.insert("r".into(), vec![
            PricingTier::new(1, Some(4), Decimal::new(2, 0)),
            PricingTier::new(5, None, Decimal::new(2, 0)),
        ]);
        let breaks = price_breaks(&PriceRequest::new("p", "c", Decimal::TEN), &rules, &tiers, Utc::now()).unwrap();
        assert_eq!(breaks, vec![PriceBreak { min_quantity: 1, max_quantity: None, unit_price: Decimal::new(12, 0) }]);
    }

    #[test]
    fn test_no_tiers_single_band() {
        let breaks = price_breaks(&PriceRequest::new("p", "c", Decimal::new(1999, 2)), &[], &TierIndex::new(), Utc::now()).unwrap();
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].max_quantity, None);
        assert_eq!(breaks[0].unit_price, Decimal::new(1999, 2));
    }

    #[test]
    fn test_rejects_negative_base() {
        let err = price_breaks(&PriceRequest::new("p", "c", Decimal::NEGATIVE_ONE), &[], &TierIndex::new(), Utc::now());
        assert!(matches!(err, Err(PricingError::InvalidInput(_))));
    }
}
