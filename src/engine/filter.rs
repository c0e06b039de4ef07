//! Applicability filter: which rules are in scope and live right now.

use chrono::{DateTime, Utc};

use crate::domain::aggregates::PricingRule;

/// Rules that are active, inside their validity window at `now`, and target
/// this product, its category, or the whole site.
pub fn applicable_rules<'a>(
    rules: &'a [PricingRule],
    product_id: &str,
    category_name: &str,
    now: DateTime<Utc>,
) -> Vec<&'a PricingRule> {
    rules
        .iter()
        .filter(|rule| rule.is_live_at(now) && rule.scope.applies_to(product_id, category_name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CombineMode, RuleScope, ValueKind};
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn rule(id: &str, scope: RuleScope) -> PricingRule {
        PricingRule::new(id, id, scope, ValueKind::Percentage, Decimal::TEN, CombineMode::Additive)
    }

    fn ids(rules: Vec<&PricingRule>) -> Vec<&str> {
        rules.into_iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_scope_filtering() {
        let now = Utc::now();
        let rules = vec![
            rule("site", RuleScope::SiteWide),
            rule("flower", RuleScope::Category("Flower".into())),
            rule("edibles", RuleScope::Category("Edibles".into())),
            rule("p7", RuleScope::Product("7".into())),
            rule("p8", RuleScope::Product("8".into())),
        ];
        assert_eq!(ids(applicable_rules(&rules, "7", "Edibles", now)), vec!["site", "edibles", "p7"]);
        assert_eq!(ids(applicable_rules(&rules, "8", "Flower", now)), vec!["site", "flower", "p8"]);
    }

    #[test]
    fn test_time_window_exclusion() {
        let now = Utc::now();
        let rules = vec![
            rule("expired", RuleScope::SiteWide).with_window(None, Some(now - Duration::days(1))),
            rule("pending", RuleScope::SiteWide).with_window(Some(now + Duration::hours(1)), None),
            rule("running", RuleScope::SiteWide).with_window(Some(now - Duration::days(1)), Some(now + Duration::days(1))),
            rule("off", RuleScope::SiteWide).deactivated(),
        ];
        assert_eq!(ids(applicable_rules(&rules, "1", "Flower", now)), vec!["running"]);
    }

    #[test]
    fn test_multiple_site_wide_rules_tolerated() {
        let now = Utc::now();
        let rules = vec![rule("a", RuleScope::SiteWide), rule("b", RuleScope::SiteWide)];
        assert_eq!(applicable_rules(&rules, "1", "Flower", now).len(), 2);
    }
}
