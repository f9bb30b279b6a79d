//! Per-container-type loot configuration.

use crate::{
    entry::{EntrySettings, LootEntry},
    loot_group::LootGroup,
    rng::LootRng,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

fn enabled() -> bool {
    true
}

/// A reference from a table to a loot group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupImport {
    #[serde(rename = "Group Enabled?", default = "enabled")]
    pub enabled: bool,
    #[serde(rename = "Loot Profile Name")]
    pub group: String,
    /// Chance in percent that the group is consulted for a slot.
    #[serde(rename = "Loot Profile Probability (1% - 100%)", default)]
    pub probability: f64,
}

impl GroupImport {
    pub fn new(group: &str, probability: f64) -> Self {
        Self {
            enabled: true,
            group: group.to_string(),
            probability,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSettings {
    #[serde(rename = "Minimum Amount of Items", default)]
    pub min_items: i32,
    #[serde(rename = "Maximum Amount of Items", default)]
    pub max_items: i32,
    #[serde(rename = "Minimum Scrap Amount", default)]
    pub min_scrap: i32,
    #[serde(rename = "Maximum Scrap Amount", default)]
    pub max_scrap: i32,
    /// Blueprint draws stop once this many blueprints were accepted.
    /// Zero or negative disables blueprint draws.
    #[serde(rename = "Max Blueprints", default)]
    pub max_blueprints: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LootTableEntry {
    #[serde(rename = "Is Prefab Enabled?", default = "enabled")]
    pub enabled: bool,
    #[serde(rename = "Loot Profiles", default)]
    pub imports: Vec<GroupImport>,
    #[serde(rename = "Guaranteed Items", default)]
    pub guaranteed_items: IndexMap<String, EntrySettings>,
    #[serde(rename = "Ungrouped Items", default)]
    pub ungrouped_items: IndexMap<String, LootEntry>,
    #[serde(rename = "Item Settings", default)]
    pub settings: ItemSettings,
}

impl LootTableEntry {
    pub fn new(min_items: i32, max_items: i32) -> Self {
        Self {
            enabled: true,
            settings: ItemSettings {
                min_items,
                max_items,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_scrap(mut self, min: i32, max: i32) -> Self {
        self.settings.min_scrap = min;
        self.settings.max_scrap = max;
        self
    }

    pub fn with_max_blueprints(mut self, max: i32) -> Self {
        self.settings.max_blueprints = max;
        self
    }

    pub fn with_import(mut self, import: GroupImport) -> Self {
        self.imports.push(import);
        self
    }

    pub fn with_item(mut self, key: &str, entry: LootEntry) -> Self {
        self.ungrouped_items.insert(key.to_string(), entry);
        self
    }

    pub fn with_guaranteed(mut self, key: &str, settings: EntrySettings) -> Self {
        self.guaranteed_items.insert(key.to_string(), settings);
        self
    }

    /// Put both ranges into a drawable shape. The item count range is
    /// swapped when inverted. An inverted scrap range collapses onto its
    /// minimum. Returns true if anything changed.
    pub fn normalize_ranges(&mut self) -> bool {
        let s = &mut self.settings;
        let mut changed = false;
        if s.min_items > s.max_items {
            std::mem::swap(&mut s.min_items, &mut s.max_items);
            changed = true;
        }
        if s.min_scrap > s.max_scrap {
            s.max_scrap = s.min_scrap;
            changed = true;
        }
        changed
    }

    /// Number of distinct entries the table can hand out: its own
    /// ungrouped items plus the items of every enabled imported group.
    ///
    /// Disabled imports are never consulted during a fill, so their items
    /// are left out. Counting them would let the slot target exceed what
    /// the table can actually produce.
    pub fn declared_inventory(&self, groups: &IndexMap<String, LootGroup>) -> usize {
        let grouped: usize = self
            .imports
            .iter()
            .filter(|import| import.enabled)
            .filter_map(|import| groups.get(&import.group))
            .map(LootGroup::len)
            .sum();
        self.ungrouped_items.len() + grouped
    }

    /// Whether `accepted` blueprints already reach the table's maximum.
    pub fn blueprints_full(&self, accepted: usize) -> bool {
        usize::try_from(self.settings.max_blueprints).map_or(true, |max| accepted >= max)
    }

    pub fn roll_item_count(&self, rng: &mut LootRng) -> usize {
        rng.range_i32(self.settings.min_items, self.settings.max_items)
            .max(0) as usize
    }

    pub fn roll_scrap(&self, rng: &mut LootRng) -> i32 {
        let (min, max) = (self.settings.min_scrap, self.settings.max_scrap);
        if min > max {
            return min;
        }
        rng.range_i32(min, max)
    }
}
