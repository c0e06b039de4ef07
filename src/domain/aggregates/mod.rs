//! Aggregates module
pub mod pricing_rule;
pub mod cart;

pub use pricing_rule::{CombineMode, PricingRule, PricingTier, RuleScope, ScopeKind, TierIndex, ValueKind};
pub use cart::{Cart, CartItem, CartQuote, QuotedLine};
