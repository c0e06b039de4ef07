//! Marketplace Pricing Engine
//!
//! Turns a product's base price into the price a shopper pays by running it
//! through the configured markup rules.
//!
//! ## Features
//! - Site-wide, category and product markup rules
//! - Validity windows and priority ordering
//! - Quantity tiers for volume pricing
//! - Replace / additive / multiplicative combination with a full trace
//! - Price-break tables and cart quotes

pub mod config;
pub mod domain;
pub mod engine;
pub mod records;
pub mod repository;

use thiserror::Error;

pub use domain::aggregates::{
    Cart, CartItem, CartQuote, CombineMode, PricingRule, PricingTier, QuotedLine, RuleScope,
    ScopeKind, TierIndex, ValueKind,
};
pub use domain::value_objects::{Money, Quantity};
pub use engine::schedule::{price_breaks, PriceBreak};
pub use engine::{evaluate_price, AppliedMarkup, PriceEvaluation, PriceRequest, SkippedRule};
pub use repository::{InMemoryRuleRepository, RuleRepository, RuleSnapshot};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid rule data for {rule_id}: {reason}")]
    InvalidRuleData { rule_id: String, reason: String },

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Overlapping tiers for rule {0}")]
    OverlappingTiers(String),

    #[error("Currency mismatch")]
    CurrencyMismatch,

    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, PricingError>;
