//! Compounding evaluator.
//!
//! Folds the ordered, tier-resolved rules into a running price. Each step
//! reads the running price (or the untouched base price for `Replace`),
//! applies the rule's value under its value kind and floors the result at
//! zero. The running price is carried forward unrounded; only the trace
//! entries are rounded to cents.
//!
//! | combine mode     | percentage                  | fixed amount    |
//! |------------------|-----------------------------|-----------------|
//! | `Replace`        | `base * (1 + v / 100)`      | `base + v`      |
//! | `Additive`       | `current * (1 + v / 100)`   | `current + v`   |
//! | `Multiplicative` | `current * (1 + v / 100)`   | `current + v`   |

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::tiers::ResolvedRule;
use super::{AppliedMarkup, SkippedRule};
use crate::domain::aggregates::{CombineMode, ValueKind};
use crate::domain::value_objects::round_cents;

/// Outcome of folding a rule chain over a base price.
#[derive(Clone, Debug, PartialEq)]
pub struct Compounded {
    /// Floored at zero, not yet rounded.
    pub final_price: Decimal,
    pub applied: Vec<AppliedMarkup>,
    pub skipped: Vec<SkippedRule>,
}

impl Compounded {
    fn start(base_price: Decimal) -> Self {
        Self { final_price: base_price, applied: Vec::new(), skipped: Vec::new() }
    }

    fn apply(mut self, base_price: Decimal, step: &ResolvedRule<'_>) -> Self {
        let rule = step.rule;

        if let Some(reason) = invalid_value(step) {
            warn!(rule_id = %rule.id, rule_name = %rule.name, %reason, "skipping pricing rule");
            self.skipped.push(SkippedRule { rule_id: rule.id.clone(), rule_name: rule.name.clone(), reason });
            return self;
        }

        let Some(next) = step_price(rule.combine_mode, rule.value_kind, base_price, self.final_price, step.effective_value) else {
            let reason = format!("arithmetic overflow applying value {}", step.effective_value);
            warn!(rule_id = %rule.id, rule_name = %rule.name, %reason, "skipping pricing rule");
            self.skipped.push(SkippedRule { rule_id: rule.id.clone(), rule_name: rule.name.clone(), reason });
            return self;
        };

        let next = next.max(Decimal::ZERO);
        debug!(
            rule_id = %rule.id,
            combine_mode = ?rule.combine_mode,
            value = %step.effective_value,
            used_tier = step.used_tier,
            price = %next,
            "applied pricing rule"
        );

        self.applied.push(AppliedMarkup {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            scope: rule.scope.kind(),
            target_key: rule.scope.target_key().map(str::to_string),
            value_kind: rule.value_kind,
            effective_value: step.effective_value,
            original_value: rule.value,
            priority: rule.priority,
            combine_mode: rule.combine_mode,
            used_tier: step.used_tier,
            price_after_markup: round_cents(next),
        });
        self.final_price = next;
        self
    }
}

/// Runs the fold. An empty chain returns the base price untouched.
pub fn compound(base_price: Decimal, steps: &[ResolvedRule<'_>]) -> Compounded {
    let outcome = steps
        .iter()
        .fold(Compounded::start(base_price), |acc, step| acc.apply(base_price, step));
    Compounded { final_price: outcome.final_price.max(Decimal::ZERO), ..outcome }
}

/// Price after one rule, or `None` if the decimal arithmetic overflows.
pub fn step_price(mode: CombineMode, kind: ValueKind, base_price: Decimal, current: Decimal, value: Decimal) -> Option<Decimal> {
    let reference = match mode {
        CombineMode::Replace => base_price,
        CombineMode::Additive | CombineMode::Multiplicative => current,
    };
    match kind {
        ValueKind::Percentage => {
            let factor = Decimal::ONE.checked_add(value.checked_div(Decimal::ONE_HUNDRED)?)?;
            reference.checked_mul(factor)
        }
        ValueKind::FixedAmount => reference.checked_add(value),
    }
}

fn invalid_value(step: &ResolvedRule<'_>) -> Option<String> {
    let kind = step.rule.value_kind;
    if !kind.admits(step.rule.value) {
        return Some(format!("percentage value {} outside [-100, 100]", step.rule.value));
    }
    if !kind.admits(step.effective_value) {
        return Some(format!("tier percentage value {} outside [-100, 100]", step.effective_value));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{PricingRule, RuleScope};

    fn rule(id: &str, kind: ValueKind, value: Decimal, mode: CombineMode) -> PricingRule {
        PricingRule::new(id, id, RuleScope::SiteWide, kind, value, mode)
    }

    fn plain(rule: &PricingRule) -> ResolvedRule<'_> {
        ResolvedRule { rule, effective_value: rule.value, used_tier: false }
    }

    #[test]
    fn test_percentage_replace() {
        let r = rule("r", ValueKind::Percentage, Decimal::TEN, CombineMode::Replace);
        let out = compound(Decimal::new(10000, 2), &[plain(&r)]);
        assert_eq!(round_cents(out.final_price), Decimal::new(11000, 2));
        assert_eq!(out.applied[0].price_after_markup, Decimal::new(11000, 2));
    }

    #[test]
    fn test_fixed_additive() {
        let r = rule("r", ValueKind::FixedAmount, Decimal::new(-5, 0), CombineMode::Additive);
        let out = compound(Decimal::new(2000, 2), &[plain(&r)]);
        assert_eq!(out.final_price, Decimal::new(1500, 2));
    }

    #[test]
    fn test_replace_discards_earlier_steps() {
        let first = rule("a", ValueKind::FixedAmount, Decimal::new(50, 0), CombineMode::Additive);
        let second = rule("b", ValueKind::Percentage, Decimal::new(20, 0), CombineMode::Replace);
        let out = compound(Decimal::new(100, 0), &[plain(&first), plain(&second)]);
        assert_eq!(out.applied[0].price_after_markup, Decimal::new(15000, 2));
        assert_eq!(round_cents(out.final_price), Decimal::new(12000, 2));
    }

    #[test]
    fn test_multiplicative_matches_additive() {
        let add = [rule("a", ValueKind::Percentage, Decimal::TEN, CombineMode::Additive), rule("b", ValueKind::Percentage, Decimal::TEN, CombineMode::Additive)];
        let mul = [rule("a", ValueKind::Percentage, Decimal::TEN, CombineMode::Multiplicative), rule("b", ValueKind::Percentage, Decimal::TEN, CombineMode::Multiplicative)];
        let base = Decimal::new(100, 0);
        let a = compound(base, &add.iter().map(plain).collect::<Vec<_>>());
        let m = compound(base, &mul.iter().map(plain).collect::<Vec<_>>());
        assert_eq!(a.final_price, m.final_price);
        assert_eq!(round_cents(m.final_price), Decimal::new(12100, 2));
    }

    #[test]
    fn test_floor_applies_each_step() {
        let crash = rule("crash", ValueKind::FixedAmount, Decimal::new(-500, 0), CombineMode::Additive);
        let bump = rule("bump", ValueKind::FixedAmount, Decimal::new(3, 0), CombineMode::Additive);
        let out = compound(Decimal::new(20, 0), &[plain(&crash), plain(&bump)]);
        assert_eq!(out.applied[0].price_after_markup, Decimal::ZERO);
        assert_eq!(out.applied[1].price_after_markup, Decimal::new(300, 2));
        assert_eq!(out.final_price, Decimal::new(3, 0));
    }

    #[test]
    fn test_running_price_is_not_rounded() {
        let third = rule("third", ValueKind::Percentage, Decimal::new(3333, 2), CombineMode::Additive);
        let out = compound(Decimal::new(1, 0), &[plain(&third), plain(&third), plain(&third)]);
        assert_eq!(out.applied[0].price_after_markup, Decimal::new(133, 2));
        // 1.3333^3 = 2.3701..., rounding each step would give 2.36
        assert_eq!(round_cents(out.final_price), Decimal::new(237, 2));
    }

    #[test]
    fn test_out_of_range_percentage_is_skipped() {
        let bad = rule("bad", ValueKind::Percentage, Decimal::new(150, 0), CombineMode::Additive);
        let good = rule("good", ValueKind::FixedAmount, Decimal::ONE, CombineMode::Additive);
        let out = compound(Decimal::TEN, &[plain(&bad), plain(&good)]);
        assert_eq!(out.applied.len(), 1);
        assert_eq!(out.applied[0].rule_id, "good");
        assert_eq!(out.skipped[0].rule_id, "bad");
        assert_eq!(out.final_price, Decimal::new(11, 0));
    }

    #[test]
    fn test_out_of_range_tier_value_is_skipped() {
        let r = rule("r", ValueKind::Percentage, Decimal::TEN, CombineMode::Additive);
        let step = ResolvedRule { rule: &r, effective_value: Decimal::new(-101, 0), used_tier: true };
        let out = compound(Decimal::TEN, &[step]);
        assert!(out.applied.is_empty());
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.final_price, Decimal::TEN);
    }

    #[test]
    fn test_overflow_is_skipped() {
        let huge = rule("huge", ValueKind::FixedAmount, Decimal::MAX, CombineMode::Additive);
        let out = compound(Decimal::MAX, &[plain(&huge)]);
        assert!(out.applied.is_empty());
        assert!(out.skipped[0].reason.contains("overflow"));
        assert_eq!(out.final_price, Decimal::MAX);
    }
}
