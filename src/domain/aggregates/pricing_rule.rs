//! Pricing Rule Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::value_objects::Quantity;

/// Quantity tiers keyed by the id of the owning rule.
pub type TierIndex = HashMap<String, Vec<PricingTier>>;

/// Targeting level of a rule, with its target key where it has one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RuleScope {
    SiteWide,
    Category(String),
    Product(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeKind { SiteWide, Category, Product }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueKind { Percentage, FixedAmount }

/// How a rule's effect folds into the running price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombineMode {
    /// Applies to the original base price, discarding earlier steps.
    Replace,
    Additive,
    /// Currently evaluated exactly like `Additive`.
    Multiplicative,
}

impl RuleScope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::SiteWide => ScopeKind::SiteWide,
            Self::Category(_) => ScopeKind::Category,
            Self::Product(_) => ScopeKind::Product,
        }
    }

    pub fn target_key(&self) -> Option<&str> {
        match self {
            Self::SiteWide => None,
            Self::Category(key) | Self::Product(key) => Some(key),
        }
    }

    /// Exact, case-sensitive match against the product being priced.
    pub fn applies_to(&self, product_id: &str, category_name: &str) -> bool {
        match self {
            Self::SiteWide => true,
            Self::Category(key) => key == category_name,
            Self::Product(key) => key == product_id,
        }
    }
}

impl ValueKind {
    /// Percentages are bounded to [-100, 100]; fixed amounts are unbounded.
    pub fn admits(&self, value: Decimal) -> bool {
        match self {
            Self::Percentage => value >= -Decimal::ONE_HUNDRED && value <= Decimal::ONE_HUNDRED,
            Self::FixedAmount => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PricingRule {
    pub id: String,
    pub name: String,
    pub scope: RuleScope,
    pub value_kind: ValueKind,
    pub value: Decimal,
    pub active: bool,
    pub priority: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub combine_mode: CombineMode,
    pub created_at: DateTime<Utc>,
}

impl PricingRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, scope: RuleScope, value_kind: ValueKind, value: Decimal, combine_mode: CombineMode) -> Self {
        Self {
            id: id.into(), name: name.into(), scope, value_kind, value, active: true, priority: 0,
            valid_from: None, valid_until: None, combine_mode, created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self { self.priority = priority; self }
    pub fn with_window(mut self, from: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self { self.valid_from = from; self.valid_until = until; self }
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self { self.created_at = created_at; self }
    pub fn deactivated(mut self) -> Self { self.active = false; self }

    pub fn is_site_wide(&self) -> bool { self.scope == RuleScope::SiteWide }

    /// Both window bounds are inclusive; a missing bound is open.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.valid_from.map_or(true, |from| from <= now)
            && self.valid_until.map_or(true, |until| until >= now)
    }
}

/// Quantity-conditional override of a rule's value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTier {
    pub min_quantity: u32,
    pub max_quantity: Option<u32>,
    pub value: Decimal,
}

impl PricingTier {
    pub fn new(min_quantity: u32, max_quantity: Option<u32>, value: Decimal) -> Self { Self { min_quantity, max_quantity, value } }

    pub fn contains(&self, quantity: Quantity) -> bool {
        let q = quantity.value();
        q >= self.min_quantity && self.max_quantity.map_or(true, |max| q <= max)
    }

    pub fn overlaps(&self, other: &PricingTier) -> bool {
        let self_before_other = self.max_quantity.is_some_and(|max| max < other.min_quantity);
        let other_before_self = other.max_quantity.is_some_and(|max| max < self.min_quantity);
        !self_before_other && !other_before_self
    }
}
