//! Rarity-weighted buckets used for ungrouped draws.
//!
//! Each table's ungrouped items are sorted into five rarity classes.
//! A class's weight is `floor(BASE^(4 - rarity) * 1000) * count`, so a
//! common item is sixteen times as likely as a class-4 item and larger
//! classes get proportionally more draws.

use crate::{
    definitions::ItemRegistry,
    entry::{blueprint_target, is_blueprint_key, strip_tag, LootEntry},
    rng::LootRng,
    types::RARITY_CLASSES,
};
use indexmap::IndexMap;

pub const BASE_ITEM_RARITY: f64 = 2.0;

/// Redraws when a weighted roll lands on an empty class.
pub const BUCKET_RETRY_LIMIT: u32 = 10;

pub fn bucket_weight(rarity: usize, count: usize) -> u64 {
    let exponent = (RARITY_CLASSES - 1).saturating_sub(rarity) as i32;
    (BASE_ITEM_RARITY.powi(exponent) * 1000.0).floor() as u64 * count as u64
}

/// One family of buckets: items or blueprints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSet {
    keys: [Vec<String>; RARITY_CLASSES],
    weights: [u64; RARITY_CLASSES],
    total: u64,
}

impl BucketSet {
    fn insert(&mut self, rarity: usize, key: &str) {
        let bucket = &mut self.keys[rarity.min(RARITY_CLASSES - 1)];
        if !bucket.iter().any(|k| k == key) {
            bucket.push(key.to_string());
        }
    }

    fn recompute_weights(&mut self) {
        for rarity in 0..RARITY_CLASSES {
            self.weights[rarity] = bucket_weight(rarity, self.keys[rarity].len());
        }
        self.total = self.weights.iter().sum();
    }

    pub fn keys(&self, rarity: usize) -> &[String] {
        &self.keys[rarity]
    }

    pub fn weight(&self, rarity: usize) -> u64 {
        self.weights[rarity]
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Weighted class roll, then a uniform pick inside the class.
    pub fn draw(&self, rng: &mut LootRng) -> Option<&str> {
        if self.total == 0 {
            return None;
        }
        for _ in 0..BUCKET_RETRY_LIMIT {
            let roll = rng.next_u64_below(self.total);
            let mut running = 0;
            for rarity in 0..RARITY_CLASSES {
                running += self.weights[rarity];
                if roll < running {
                    let bucket = &self.keys[rarity];
                    if let Some(index) = rng.pick_index(bucket.len()) {
                        return Some(bucket[index].as_str());
                    }
                    break;
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketDraw<'a> {
    /// An ungrouped entry key.
    Item(&'a str),
    /// The shortname a blueprint teaches.
    Blueprint(&'a str),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RarityBuckets {
    /// Entry keys of ungrouped items, tags included.
    pub items: BucketSet,
    /// Shortnames of researchable blueprint targets.
    pub blueprints: BucketSet,
}

impl RarityBuckets {
    pub fn build(
        container_type: &str,
        ungrouped: &IndexMap<String, LootEntry>,
        registry: &ItemRegistry,
    ) -> Self {
        let mut buckets = Self::default();
        for key in ungrouped.keys() {
            if is_blueprint_key(key) {
                let target = blueprint_target(key);
                match registry.find(&target) {
                    Some(def) if def.researchable => {
                        buckets.blueprints.insert(def.rarity_index(), &def.shortname);
                    }
                    Some(_) => {
                        log::debug!("{container_type}: '{key}' cannot be researched, skipped");
                    }
                    None => {
                        log::warn!("{container_type}: blueprint target '{target}' is not a valid item");
                    }
                }
            } else {
                match registry.find(&strip_tag(key)) {
                    Some(def) => buckets.items.insert(def.rarity_index(), key),
                    None => log::warn!("{container_type}: '{key}' is not a valid item"),
                }
            }
        }
        buckets.items.recompute_weights();
        buckets.blueprints.recompute_weights();
        buckets
    }

    /// Draw from the blueprint family when asked, otherwise from the item
    /// family. A blueprint draw against an empty blueprint family yields
    /// nothing.
    pub fn draw(&self, as_blueprint: bool, rng: &mut LootRng) -> Option<BucketDraw<'_>> {
        if as_blueprint {
            self.blueprints.draw(rng).map(BucketDraw::Blueprint)
        } else {
            self.items.draw(rng).map(BucketDraw::Item)
        }
    }
}
