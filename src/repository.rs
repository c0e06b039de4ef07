//! Rule storage seam.
//!
//! The engine only ever reads a [`RuleSnapshot`]. Write-time invariants that
//! the engine deliberately does not rely on (a single active site-wide rule,
//! non-overlapping tiers) are enforced here.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use crate::domain::aggregates::{PricingRule, PricingTier, ScopeKind, TierIndex};
use crate::engine::schedule::{price_breaks, PriceBreak};
use crate::engine::sequencer::application_order;
use crate::engine::{evaluate_price, PriceEvaluation, PriceRequest};
use crate::records::RuleRecord;
use crate::{PricingError, Result};

pub trait RuleRepository {
    /// A consistent view of every rule and its tiers.
    fn snapshot(&self) -> Result<RuleSnapshot>;
}

/// Rules and tiers captured together for one or more evaluations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleSnapshot {
    rules: Vec<PricingRule>,
    tiers: TierIndex,
}

impl RuleSnapshot {
    pub fn new(rules: Vec<PricingRule>, tiers: TierIndex) -> Self { Self { rules, tiers } }
    pub fn rules(&self) -> &[PricingRule] { &self.rules }
    pub fn tiers(&self) -> &TierIndex { &self.tiers }

    pub fn evaluate(&self, request: &PriceRequest, now: DateTime<Utc>) -> Result<PriceEvaluation> {
        evaluate_price(request, &self.rules, &self.tiers, now)
    }

    pub fn price_breaks(&self, request: &PriceRequest, now: DateTime<Utc>) -> Result<Vec<PriceBreak>> {
        price_breaks(request, &self.rules, &self.tiers, now)
    }
}

#[derive(Debug, Default)]
struct Store {
    rules: Vec<PricingRule>,
    tiers: TierIndex,
}

impl Store {
    fn put_tiers(&mut self, rule_id: &str, mut tiers: Vec<PricingTier>) {
        tiers.sort_by_key(|t| t.min_quantity);
        if tiers.is_empty() {
            self.tiers.remove(rule_id);
        } else {
            self.tiers.insert(rule_id.to_string(), tiers);
        }
    }
}

/// Thread-safe in-process rule store.
#[derive(Debug, Default)]
pub struct InMemoryRuleRepository {
    store: RwLock<Store>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self { Self::default() }

    /// Builds a store from records, skipping any that fail validation.
    pub fn from_records(records: impl IntoIterator<Item = RuleRecord>) -> Result<Self> {
        let repo = Self::new();
        let mut loaded = 0usize;
        for record in records {
            let id = record.id.clone();
            match record.into_parts().and_then(|(rule, tiers)| check_tiers(&rule.id, &tiers).map(|_| (rule, tiers))) {
                Ok((rule, tiers)) => {
                    repo.write()?.put_tiers(&rule.id, tiers);
                    repo.upsert_rule(rule)?;
                    loaded += 1;
                }
                Err(e) => warn!(rule_id = %id, error = %e, "skipping pricing rule record"),
            }
        }
        info!(rules = loaded, "loaded pricing rules");
        Ok(repo)
    }

    /// Loads a JSON array of rule records.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| PricingError::StorageError(format!("{}: {e}", path.display())))?;
        let records: Vec<RuleRecord> = serde_json::from_str(&raw).map_err(|e| PricingError::StorageError(format!("{}: {e}", path.display())))?;
        Self::from_records(records)
    }

    /// Inserts or replaces a rule. Activating a site-wide rule deactivates
    /// every other site-wide rule.
    pub fn upsert_rule(&self, rule: PricingRule) -> Result<()> {
        let mut store = self.write()?;
        if rule.active && rule.is_site_wide() {
            deactivate_other_site_wide(&mut store.rules, &rule.id);
        }
        match store.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => store.rules.push(rule),
        }
        Ok(())
    }

    pub fn set_active(&self, rule_id: &str, active: bool) -> Result<()> {
        let mut store = self.write()?;
        let rule = store.rules.iter_mut().find(|r| r.id == rule_id).ok_or_else(|| PricingError::RuleNotFound(rule_id.to_string()))?;
        rule.active = active;
        if active && rule.is_site_wide() {
            deactivate_other_site_wide(&mut store.rules, rule_id);
        }
        Ok(())
    }

    /// Replaces a rule's tier set. Tiers are stored by ascending `min_quantity`.
    pub fn replace_tiers(&self, rule_id: &str, tiers: Vec<PricingTier>) -> Result<()> {
        check_tiers(rule_id, &tiers)?;
        let mut store = self.write()?;
        if !store.rules.iter().any(|r| r.id == rule_id) {
            return Err(PricingError::RuleNotFound(rule_id.to_string()));
        }
        store.put_tiers(rule_id, tiers);
        Ok(())
    }

    /// Removes a rule together with its tiers.
    pub fn remove_rule(&self, rule_id: &str) -> Result<PricingRule> {
        let mut store = self.write()?;
        let index = store.rules.iter().position(|r| r.id == rule_id).ok_or_else(|| PricingError::RuleNotFound(rule_id.to_string()))?;
        store.tiers.remove(rule_id);
        Ok(store.rules.remove(index))
    }

    pub fn get_rule(&self, rule_id: &str) -> Result<PricingRule> {
        self.read()?.rules.iter().find(|r| r.id == rule_id).cloned().ok_or_else(|| PricingError::RuleNotFound(rule_id.to_string()))
    }

    /// Rules of one scope, optionally only the active ones, highest priority first.
    pub fn rules_by_scope(&self, scope: ScopeKind, active_only: bool) -> Result<Vec<PricingRule>> {
        let mut rules: Vec<PricingRule> = self
            .read()?
            .rules
            .iter()
            .filter(|r| r.scope.kind() == scope && (!active_only || r.active))
            .cloned()
            .collect();
        rules.sort_by(application_order);
        Ok(rules)
    }

    /// Dumps the store back into records, e.g. for writing a snapshot file.
    pub fn to_records(&self) -> Result<Vec<RuleRecord>> {
        let store = self.read()?;
        Ok(store
            .rules
            .iter()
            .map(|rule| RuleRecord::from_parts(rule, store.tiers.get(&rule.id).map(Vec::as_slice).unwrap_or(&[])))
            .collect())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Store>> {
        self.store.read().map_err(|_| PricingError::StorageError("rule store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Store>> {
        self.store.write().map_err(|_| PricingError::StorageError("rule store lock poisoned".into()))
    }
}

impl RuleRepository for InMemoryRuleRepository {
    fn snapshot(&self) -> Result<RuleSnapshot> {
        let store = self.read()?;
        Ok(RuleSnapshot::new(store.rules.clone(), store.tiers.clone()))
    }
}

fn deactivate_other_site_wide(rules: &mut [PricingRule], keep_id: &str) {
    for other in rules.iter_mut().filter(|r| r.is_site_wide() && r.active && r.id != keep_id) {
        info!(rule_id = %other.id, "deactivating site-wide rule");
        other.active = false;
    }
}

fn check_tiers(rule_id: &str, tiers: &[PricingTier]) -> Result<()> {
    for tier in tiers {
        if tier.min_quantity == 0 || tier.max_quantity.is_some_and(|max| max < tier.min_quantity) {
            return Err(PricingError::InvalidRuleData { rule_id: rule_id.to_string(), reason: "invalid tier bounds".into() });
        }
    }
    for (i, a) in tiers.iter().enumerate() {
        if tiers[i + 1..].iter().any(|b| a.overlaps(b)) {
            return Err(PricingError::OverlappingTiers(rule_id.to_string()));
        }
    }
    Ok(())
}
