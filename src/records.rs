//! Rule records as they arrive from storage or admin tooling.
//!
//! Records are checked once here and turned into typed [`PricingRule`]s and
//! [`PricingTier`]s; the engine never sees an unchecked record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::aggregates::{CombineMode, PricingRule, PricingTier, RuleScope, ScopeKind, ValueKind};
use crate::{PricingError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_rule_shape"))]
pub struct RuleRecord {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub scope: ScopeKind,
    #[serde(default)]
    pub target_key: Option<String>,
    pub value_kind: ValueKind,
    pub value: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    pub combine_mode: CombineMode,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    #[validate]
    pub tiers: Vec<TierRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_tier_bounds"))]
pub struct TierRecord {
    #[validate(range(min = 1))]
    pub min_quantity: i64,
    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_quantity: Option<i64>,
    pub value: Decimal,
}

fn default_true() -> bool {
    true
}

fn validate_rule_shape(record: &RuleRecord) -> std::result::Result<(), ValidationError> {
    let has_target = record.target_key.as_deref().is_some_and(|key| !key.trim().is_empty());
    if record.scope != ScopeKind::SiteWide && !has_target {
        return Err(ValidationError::new("missing_target_key"));
    }
    if let (Some(from), Some(until)) = (record.valid_from, record.valid_until) {
        if from > until {
            return Err(ValidationError::new("inverted_validity_window"));
        }
    }
    Ok(())
}

fn validate_tier_bounds(tier: &TierRecord) -> std::result::Result<(), ValidationError> {
    match tier.max_quantity {
        Some(max) if max < tier.min_quantity => Err(ValidationError::new("max_below_min")),
        _ => Ok(()),
    }
}

impl TierRecord {
    fn into_tier(self, rule_id: &str) -> Result<PricingTier> {
        let invalid = |reason: String| PricingError::InvalidRuleData { rule_id: rule_id.to_string(), reason };
        let min = u32::try_from(self.min_quantity).map_err(|_| invalid(format!("minQuantity {} out of range", self.min_quantity)))?;
        let max = self
            .max_quantity
            .map(|max| u32::try_from(max).map_err(|_| invalid(format!("maxQuantity {max} out of range"))))
            .transpose()?;
        Ok(PricingTier::new(min, max, self.value))
    }
}

impl RuleRecord {
    /// Validates the record and splits it into a rule and its tiers.
    ///
    /// A target key on a site-wide record is ignored.
    pub fn into_parts(self) -> Result<(PricingRule, Vec<PricingTier>)> {
        self.validate().map_err(|e| PricingError::InvalidRuleData { rule_id: self.id.clone(), reason: e.to_string() })?;

        let scope = match (self.scope, self.target_key) {
            (ScopeKind::SiteWide, _) => RuleScope::SiteWide,
            (ScopeKind::Category, Some(key)) => RuleScope::Category(key),
            (ScopeKind::Product, Some(key)) => RuleScope::Product(key),
            (_, None) => {
                return Err(PricingError::InvalidRuleData { rule_id: self.id, reason: "missing target key".into() });
            }
        };

        let tiers = self
            .tiers
            .into_iter()
            .map(|tier| tier.into_tier(&self.id))
            .collect::<Result<Vec<_>>>()?;

        let rule = PricingRule {
            id: self.id,
            name: self.name,
            scope,
            value_kind: self.value_kind,
            value: self.value,
            active: self.active,
            priority: self.priority,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            combine_mode: self.combine_mode,
            created_at: self.created_at,
        };
        Ok((rule, tiers))
    }

    pub fn from_parts(rule: &PricingRule, tiers: &[PricingTier]) -> Self {
        Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            scope: rule.scope.kind(),
            target_key: rule.scope.target_key().map(str::to_string),
            value_kind: rule.value_kind,
            value: rule.value,
            active: rule.active,
            priority: rule.priority,
            valid_from: rule.valid_from,
            valid_until: rule.valid_until,
            combine_mode: rule.combine_mode,
            created_at: rule.created_at,
            tiers: tiers
                .iter()
                .map(|t| TierRecord { min_quantity: i64::from(t.min_quantity), max_quantity: t.max_quantity.map(i64::from), value: t.value })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(body: serde_json::Value) -> RuleRecord {
        serde_json::from_value(body).unwrap()
    }

    fn category_rule() -> serde_json::Value {
        json!({
            "id": "r-flower",
            "name": "Flower markup",
            "scope": "CATEGORY",
            "targetKey": "Flower",
            "valueKind": "PERCENTAGE",
            "value": 12.5,
            "priority": 3,
            "combineMode": "ADDITIVE",
            "createdAt": "2025-01-01T00:00:00Z",
            "tiers": [
                { "minQuantity": 1, "maxQuantity": 9, "value": 12.5 },
                { "minQuantity": 10, "value": 8 }
            ]
        })
    }

    #[test]
    fn test_parse_category_rule() {
        let (rule, tiers) = record(category_rule()).into_parts().unwrap();
        assert_eq!(rule.scope, RuleScope::Category("Flower".into()));
        assert_eq!(rule.value, Decimal::new(125, 1));
        assert!(rule.active);
        assert_eq!(rule.priority, 3);
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[1], PricingTier::new(10, None, Decimal::new(8, 0)));
    }

    #[test]
    fn test_missing_target_rejected() {
        let mut body = category_rule();
        body["targetKey"] = json!("  ");
        let err = record(body).into_parts().unwrap_err();
        assert!(matches!(err, PricingError::InvalidRuleData { ref rule_id, .. } if rule_id == "r-flower"));
    }

    #[test]
    fn test_site_wide_ignores_target() {
        let mut body = category_rule();
        body["scope"] = json!("SITE_WIDE");
        let (rule, _) = record(body).into_parts().unwrap();
        assert_eq!(rule.scope, RuleScope::SiteWide);
    }

    #[test]
    fn test_bad_tier_bounds_rejected() {
        let mut body = category_rule();
        body["tiers"] = json!([{ "minQuantity": 0, "value": 1 }]);
        assert!(record(body).into_parts().is_err());

        let mut body = category_rule();
        body["tiers"] = json!([{ "minQuantity": 5, "maxQuantity": 2, "value": 1 }]);
        assert!(record(body).into_parts().is_err());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut body = category_rule();
        body["validFrom"] = json!("2025-02-01T00:00:00Z");
        body["validUntil"] = json!("2025-01-01T00:00:00Z");
        assert!(record(body).into_parts().is_err());
    }

    #[test]
    fn test_out_of_range_percentage_survives_parsing() {
        let mut body = category_rule();
        body["value"] = json!(250);
        assert!(record(body).into_parts().is_ok());
    }

    #[test]
    fn test_from_parts_preserves_rule() {
        let (rule, tiers) = record(category_rule()).into_parts().unwrap();
        let (again, again_tiers) = RuleRecord::from_parts(&rule, &tiers).into_parts().unwrap();
        assert_eq!(again, rule);
        assert_eq!(again_tiers, tiers);
    }
}
