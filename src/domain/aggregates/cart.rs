//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::value_objects::{Money, Quantity};
use crate::engine::{PriceEvaluation, PriceRequest};
use crate::repository::RuleSnapshot;
use crate::{PricingError, Result};

#[derive(Clone, Debug)]
pub struct Cart {
    id: String,
    customer_id: Option<String>,
    items: Vec<CartItem>,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A line as added by the shopper, before markups.
#[derive(Clone, Debug, PartialEq)]
pub struct CartItem {
    pub product_id: String,
    pub category_name: String,
    pub name: String,
    pub quantity: Quantity,
    pub base_price: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotedLine {
    pub product_id: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub line_total: Money,
    pub evaluation: PriceEvaluation,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuote {
    pub lines: Vec<QuotedLine>,
    pub subtotal: Money,
}

impl Cart {
    pub fn new(currency: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(), customer_id: None, items: vec![],
            currency: currency.to_string(), created_at: now, updated_at: now,
        }
    }

    pub fn for_customer(customer_id: impl Into<String>, currency: &str) -> Self {
        let mut cart = Self::new(currency);
        cart.customer_id = Some(customer_id.into());
        cart
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn customer_id(&self) -> Option<&str> { self.customer_id.as_deref() }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Adds a line, merging quantities with an existing line for the same product.
    pub fn add_item(&mut self, item: CartItem) -> Result<()> {
        if item.base_price.currency() != self.currency { return Err(PricingError::CurrencyMismatch); }
        if item.base_price.is_negative() {
            return Err(PricingError::InvalidInput(format!("negative base price for {}", item.product_id)));
        }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = existing.quantity.add(item.quantity.value());
        } else {
            self.items.push(item);
        }
        self.touch();
        Ok(())
    }

    /// Zero removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Result<()> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or_else(|| PricingError::InvalidInput(format!("{product_id} is not in the cart")))?;
        if quantity == 0 { self.items.retain(|i| i.product_id != product_id); }
        else { item.quantity = Quantity::new(quantity); }
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<()> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(PricingError::InvalidInput(format!("{product_id} is not in the cart"))); }
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); self.touch(); }

    /// Prices every line at its purchase quantity, so volume tiers apply.
    pub fn quote(&self, snapshot: &RuleSnapshot, now: DateTime<Utc>) -> Result<CartQuote> {
        let mut lines = Vec::with_capacity(self.items.len());
        let mut subtotal = Money::zero(&self.currency);
        for item in &self.items {
            let request = PriceRequest::new(&item.product_id, &item.category_name, item.base_price.amount())
                .with_quantity(i64::from(item.quantity.value()));
            let evaluation = snapshot.evaluate(&request, now)?;
            let unit_price = item.base_price.with_amount(evaluation.final_price);
            let line_total = unit_price.multiply(item.quantity)?.rounded();
            subtotal = subtotal.add(&line_total)?;
            lines.push(QuotedLine { product_id: item.product_id.clone(), quantity: item.quantity, unit_price, line_total, evaluation });
        }
        debug!(cart_id = %self.id, lines = lines.len(), subtotal = %subtotal, "quoted cart");
        Ok(CartQuote { lines, subtotal })
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
