//! Pricing domain: rules, tiers, carts and the value objects they share.
pub mod aggregates;
pub mod value_objects;
