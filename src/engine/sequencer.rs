//! Priority sequencer.

use std::cmp::Ordering;

use crate::domain::aggregates::PricingRule;

/// Orders rules by priority, highest first. Equal priorities put the most
/// recently created rule first; full ties keep their input order.
pub fn sequence(rules: &mut [&PricingRule]) {
    rules.sort_by(|a, b| application_order(a, b));
}

pub(crate) fn application_order(a: &PricingRule, b: &PricingRule) -> Ordering {
    b.priority.cmp(&a.priority).then_with(|| b.created_at.cmp(&a.created_at))
}
