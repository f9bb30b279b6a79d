//! Named weighted item pools that loot tables import.

use crate::{
    definitions::ItemRegistry,
    entry::{strip_tag, EntrySettings, LootEntry},
    error::GenerationError,
    probability::{self, BalanceMode, BalanceOutcome, CumulativeTable, Weighted},
    rng::LootRng,
    spawn::{Generated, ItemSpawner},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const EXAMPLE_GROUP: &str = "example_group";

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupItem {
    #[serde(rename = "Item Probability (1-100)", default)]
    pub probability: f64,
    #[serde(rename = "Item Amount", default)]
    pub entry: LootEntry,
}

impl GroupItem {
    pub fn new(probability: f64, entry: LootEntry) -> Self {
        Self { probability, entry }
    }
}

impl Weighted for GroupItem {
    fn weight(&self) -> f64 {
        self.probability
    }
    fn set_weight(&mut self, weight: f64) {
        self.probability = weight;
    }
}

/// What group validation changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupValidation {
    pub removed: Vec<String>,
    pub balanced: Option<BalanceOutcome>,
}

impl GroupValidation {
    pub fn modified(&self) -> bool {
        !self.removed.is_empty() || self.balanced.is_some()
    }
}

/// A weighted pool of items.
///
/// The item list is private: every edit goes through a method that
/// invalidates the cumulative table. Probability edits in particular
/// must never be possible without invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootGroup {
    #[serde(rename = "Enabled?", default = "enabled")]
    pub enabled: bool,
    #[serde(rename = "Guaranteed Items", default)]
    pub guaranteed_items: IndexMap<String, EntrySettings>,
    #[serde(rename = "Item List", default)]
    items: IndexMap<String, GroupItem>,
    #[serde(skip)]
    cumulative: CumulativeTable,
}

impl Default for LootGroup {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LootGroup {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            guaranteed_items: IndexMap::new(),
            items: IndexMap::new(),
            cumulative: CumulativeTable::new(),
        }
    }

    /// The disabled sample group written on first run.
    pub fn example() -> Self {
        Self::new(false).with_item(
            "lmg.m249",
            10.0,
            LootEntry::new(1, 2),
        )
    }

    pub fn with_item(mut self, key: &str, probability: f64, entry: LootEntry) -> Self {
        self.insert_item(key, probability, entry);
        self
    }

    pub fn with_guaranteed(mut self, key: &str, settings: EntrySettings) -> Self {
        self.guaranteed_items.insert(key.to_string(), settings);
        self
    }

    pub fn items(&self) -> &IndexMap<String, GroupItem> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn insert_item(&mut self, key: &str, probability: f64, entry: LootEntry) {
        self.items
            .insert(key.to_string(), GroupItem::new(probability, entry));
        self.cumulative.invalidate();
    }

    pub fn remove_item(&mut self, key: &str) -> Option<GroupItem> {
        let removed = self.items.shift_remove(key);
        self.cumulative.invalidate();
        removed
    }

    pub fn set_probability(&mut self, key: &str, probability: f64) -> bool {
        let Some(item) = self.items.get_mut(key) else {
            return false;
        };
        item.probability = probability;
        self.cumulative.invalidate();
        true
    }

    /// Mutable access to the entries without their probabilities.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = (&String, &mut LootEntry)> {
        self.items.iter_mut().map(|(key, item)| (key, &mut item.entry))
    }

    pub fn is_distribution_built(&self) -> bool {
        self.cumulative.is_built()
    }

    /// Rebuild the cumulative probability sequence from the item list.
    pub fn update_probabilities(&mut self) {
        self.cumulative
            .rebuild(self.items.values().map(|i| i.probability));
    }

    /// Scale probabilities to sum to 100 when they drift off target.
    pub fn balance(&mut self) -> Option<BalanceOutcome> {
        let outcome = probability::balance(
            &mut self.items,
            probability::PROBABILITY_TARGET,
            BalanceMode::Always,
        );
        if outcome.is_some() {
            self.cumulative.invalidate();
        }
        outcome
    }

    /// Drop items with unknown definitions, then balance if enabled.
    pub fn validate(
        &mut self,
        name: &str,
        registry: &ItemRegistry,
        balance_enabled: bool,
    ) -> GroupValidation {
        let mut removed = Vec::new();
        self.items.retain(|key, _| {
            let known = registry.contains(&strip_tag(key));
            if !known {
                log::error!("loot group '{name}': item '{key}' is not a valid item, removed");
                removed.push(key.clone());
            }
            known
        });
        if !removed.is_empty() {
            self.cumulative.invalidate();
        }

        let balanced = if balance_enabled { self.balance() } else { None };
        if let Some(outcome) = balanced {
            log::warn!(
                "loot group '{name}': probabilities summed to {:.2}, rebalanced to {:.2}",
                outcome.sum_before,
                outcome.sum_after
            );
        }
        GroupValidation { removed, balanced }
    }

    /// Weighted draw of one entry. A draw past the final cumulative
    /// value selects nothing.
    pub fn select(&self, rng: &mut LootRng) -> Option<(&str, &LootEntry)> {
        let cumulative = self
            .cumulative
            .get_or_build(|| self.items.values().map(|i| i.probability));
        let index = probability::select_index(cumulative, rng.next_percent())?;
        self.items
            .get_index(index)
            .map(|(key, item)| (key.as_str(), &item.entry))
    }

    /// Draw and spawn one item with its bonus items.
    pub fn get_item(
        &self,
        rng: &mut LootRng,
        spawner: &ItemSpawner<'_>,
    ) -> Result<Option<Generated>, GenerationError> {
        let Some((key, entry)) = self.select(rng) else {
            return Ok(None);
        };
        spawner.spawn_group_primary(key, entry, rng).map(Some)
    }
}
