//! Item entries as they appear in loot tables and loot groups.
//!
//! Field names on disk follow the catalog file format shared with the
//! table editor, so the serde renames below are part of the data
//! contract. Fields marked `#[serde(skip)]` are derived by the
//! constraint pass and never persisted.

use crate::{
    probability::{self, BalanceMode, BalanceOutcome, CumulativeTable, Weighted},
    rng::LootRng,
    types::SkinId,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const BLUEPRINT_SUFFIX: &str = ".blueprint";

/// Remove every `{n}` tag from a key. Tags let one table list the same
/// item several times with different settings.
pub fn strip_tag(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut rest = key;
    while let Some(open) = rest.find('{') {
        let (head, tail) = rest.split_at(open);
        out.push_str(head);
        let digits = tail[1..].bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && tail[1 + digits..].starts_with('}') {
            rest = &tail[digits + 2..];
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

pub fn is_blueprint_key(key: &str) -> bool {
    key.ends_with(BLUEPRINT_SUFFIX)
}

/// Shortname a `.blueprint` key teaches, with tags removed.
pub fn blueprint_target(key: &str) -> String {
    strip_tag(&key.replace(BLUEPRINT_SUFFIX, ""))
}

fn full_durability() -> i32 {
    100
}

fn one() -> i32 {
    1
}

/// Condition range in percent of max condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurabilityRange {
    #[serde(rename = "Minimum Durability", default = "full_durability")]
    pub min: i32,
    #[serde(rename = "Maximum Durability", default = "full_durability")]
    pub max: i32,
}

impl Default for DurabilityRange {
    fn default() -> Self {
        Self { min: 100, max: 100 }
    }
}

impl DurabilityRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self {
            min: min.clamp(0, 100),
            max: max.clamp(0, 100),
        }
    }

    pub fn roll(&self, rng: &mut LootRng) -> i32 {
        rng.range_i32(self.min, self.max).clamp(0, 100)
    }
}

// ── Ammunition ────────────────────────────────────────────────────

/// How a weapon's ammo is rolled. Magazine weapons roll an amount,
/// single-shot weapons roll whether one round is loaded at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmmoCapacity {
    MultiUnit { min: i32, max: i32 },
    SingleUnit { probability: f64 },
}

impl AmmoCapacity {
    pub fn holds_multiple(&self) -> bool {
        matches!(self, Self::MultiUnit { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AmmoSettingsFile", into = "AmmoSettingsFile")]
pub struct AmmoSettings {
    /// Shortname of the ammo item. Empty means no ammo is loaded.
    pub ammo_item: String,
    pub capacity: AmmoCapacity,
    /// Built-in magazine or tank size.
    pub max_ammo: i32,
}

impl Default for AmmoSettings {
    fn default() -> Self {
        Self {
            ammo_item: String::new(),
            capacity: AmmoCapacity::MultiUnit { min: 0, max: 0 },
            max_ammo: 0,
        }
    }
}

impl AmmoSettings {
    pub fn multi(ammo_item: &str, min: i32, max: i32) -> Self {
        Self {
            ammo_item: ammo_item.to_string(),
            capacity: AmmoCapacity::MultiUnit { min, max },
            max_ammo: 0,
        }
    }

    pub fn single(ammo_item: &str, probability: f64) -> Self {
        Self {
            ammo_item: ammo_item.to_string(),
            capacity: AmmoCapacity::SingleUnit { probability },
            max_ammo: 0,
        }
    }

    /// Switch capacity mode. Values are kept when the mode already
    /// matches and reset otherwise.
    pub fn set_holds_multiple(&mut self, multiple: bool) {
        if self.capacity.holds_multiple() == multiple {
            return;
        }
        self.capacity = if multiple {
            AmmoCapacity::MultiUnit { min: 0, max: 0 }
        } else {
            AmmoCapacity::SingleUnit { probability: 0.0 }
        };
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AmmoSettingsFile {
    #[serde(rename = "Ammo Item Shortname", default)]
    ammo_item: String,
    #[serde(rename = "Minimum Amount", default, skip_serializing_if = "Option::is_none")]
    min: Option<i32>,
    #[serde(rename = "Maximum Amount", default, skip_serializing_if = "Option::is_none")]
    max: Option<i32>,
    #[serde(rename = "Spawn Probability", default, skip_serializing_if = "Option::is_none")]
    probability: Option<f64>,
}

impl From<AmmoSettingsFile> for AmmoSettings {
    fn from(file: AmmoSettingsFile) -> Self {
        let capacity = match (file.min, file.max, file.probability) {
            (None, None, Some(probability)) => AmmoCapacity::SingleUnit { probability },
            (min, max, _) => AmmoCapacity::MultiUnit {
                min: min.unwrap_or(0),
                max: max.unwrap_or(0),
            },
        };
        Self {
            ammo_item: file.ammo_item,
            capacity,
            max_ammo: 0,
        }
    }
}

impl From<AmmoSettings> for AmmoSettingsFile {
    fn from(settings: AmmoSettings) -> Self {
        let mut file = AmmoSettingsFile {
            ammo_item: settings.ammo_item,
            ..Default::default()
        };
        match settings.capacity {
            AmmoCapacity::MultiUnit { min, max } => {
                file.min = Some(min);
                file.max = Some(max);
            }
            AmmoCapacity::SingleUnit { probability } => file.probability = Some(probability),
        }
        file
    }
}

// ── Attachments ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentEntry {
    #[serde(rename = "Spawn Probability (0%-100%)", default)]
    pub probability: f64,
    #[serde(rename = "Durability", default, skip_serializing_if = "Option::is_none")]
    pub durability: Option<DurabilityRange>,
}

impl AttachmentEntry {
    pub fn new(probability: f64) -> Self {
        Self {
            probability,
            durability: None,
        }
    }
}

impl Weighted for AttachmentEntry {
    fn weight(&self) -> f64 {
        self.probability
    }
    fn set_weight(&mut self, weight: f64) {
        self.probability = weight;
    }
}

/// Weighted attachment pool of one weapon entry.
///
/// The pool is private so every mutation goes through a method that
/// invalidates the cumulative table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentSettings {
    #[serde(rename = "Minimum Mod Amount", default = "one")]
    pub min_mods: i32,
    #[serde(rename = "Maximum Mod Amount", default = "one")]
    pub max_mods: i32,
    #[serde(rename = "Available Attachments", default)]
    mods: IndexMap<String, AttachmentEntry>,
    #[serde(skip)]
    cumulative: CumulativeTable,
}

impl Default for AttachmentSettings {
    fn default() -> Self {
        Self {
            min_mods: 1,
            max_mods: 1,
            mods: IndexMap::new(),
            cumulative: CumulativeTable::new(),
        }
    }
}

impl AttachmentSettings {
    pub fn new(min_mods: i32, max_mods: i32) -> Self {
        Self {
            min_mods,
            max_mods,
            ..Default::default()
        }
    }

    pub fn with_mod(mut self, key: &str, entry: AttachmentEntry) -> Self {
        self.insert_mod(key, entry);
        self
    }

    pub fn mods(&self) -> &IndexMap<String, AttachmentEntry> {
        &self.mods
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    pub fn insert_mod(&mut self, key: &str, entry: AttachmentEntry) {
        self.mods.insert(key.to_string(), entry);
        self.cumulative.invalidate();
    }

    pub fn remove_mod(&mut self, key: &str) -> Option<AttachmentEntry> {
        let removed = self.mods.shift_remove(key);
        self.cumulative.invalidate();
        removed
    }

    /// Keep only the attachments `keep` returns true for. `keep` may
    /// also edit the entry in place.
    pub fn retain_mods<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&String, &mut AttachmentEntry) -> bool,
    {
        let before = self.mods.len();
        self.mods.retain(keep);
        self.cumulative.invalidate();
        before - self.mods.len()
    }

    pub fn balance_if_over(&mut self) -> Option<BalanceOutcome> {
        let outcome = probability::balance(
            &mut self.mods,
            probability::PROBABILITY_TARGET,
            BalanceMode::IfOver,
        );
        if outcome.is_some() {
            self.cumulative.invalidate();
        }
        outcome
    }

    pub fn is_distribution_built(&self) -> bool {
        self.cumulative.is_built()
    }

    /// Draw one attachment. `None` is a legitimate outcome when the pool
    /// sums below 100.
    pub fn select(&self, rng: &mut LootRng) -> Option<(&str, &AttachmentEntry)> {
        let cumulative = self
            .cumulative
            .get_or_build(|| self.mods.values().map(|m| m.probability));
        let index = probability::select_index(cumulative, rng.next_percent())?;
        self.mods.get_index(index).map(|(k, v)| (k.as_str(), v))
    }
}

/// Weapon-only settings attached to an entry by the constraint pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemModifications {
    #[serde(rename = "Ammunition Settings", default)]
    pub ammo: AmmoSettings,
    #[serde(rename = "Weapon Attachments", default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<AttachmentSettings>,
    /// Attachment slots of the weapon.
    #[serde(skip)]
    pub max_mods: i32,
}

// ── Entries ───────────────────────────────────────────────────────

/// Settings shared by every kind of entry: guaranteed items, bonus
/// items and the primary entries of tables and groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntrySettings {
    #[serde(rename = "Skin ID (0 = default)", default)]
    pub skin_id: SkinId,
    #[serde(rename = "Display Name (empty = none)", default)]
    pub display_name: String,
    #[serde(rename = "Item Minimum", default)]
    pub min: i32,
    #[serde(rename = "Item Maximum", default)]
    pub max: i32,
    #[serde(rename = "Item Durability", default, skip_serializing_if = "Option::is_none")]
    pub durability: Option<DurabilityRange>,
    #[serde(rename = "Item Properties", default, skip_serializing_if = "Option::is_none")]
    pub modifications: Option<ItemModifications>,
}

impl EntrySettings {
    pub fn new(min: i32, max: i32) -> Self {
        Self {
            min,
            max,
            ..Default::default()
        }
    }

    pub fn with_skin(mut self, skin_id: SkinId) -> Self {
        self.skin_id = skin_id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.display_name = name.to_string();
        self
    }

    pub fn with_durability(mut self, durability: DurabilityRange) -> Self {
        self.durability = Some(durability);
        self
    }

    pub fn with_modifications(mut self, modifications: ItemModifications) -> Self {
        self.modifications = Some(modifications);
        self
    }

    pub fn display_name(&self) -> Option<&str> {
        let name = self.display_name.trim();
        (!name.is_empty()).then_some(name)
    }

    pub fn roll_amount(&self, rng: &mut LootRng) -> i32 {
        rng.range_i32(self.min, self.max)
    }

    pub fn attachments(&self) -> Option<&AttachmentSettings> {
        self.modifications.as_ref()?.attachments.as_ref()
    }
}

/// A primary entry. Bonus items hang off primaries only, which keeps
/// the nesting one level deep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LootEntry {
    #[serde(flatten)]
    pub settings: EntrySettings,
    #[serde(rename = "Bonus Items", default)]
    pub bonus_items: IndexMap<String, EntrySettings>,
}

impl LootEntry {
    pub fn new(min: i32, max: i32) -> Self {
        Self {
            settings: EntrySettings::new(min, max),
            bonus_items: IndexMap::new(),
        }
    }

    pub fn from_settings(settings: EntrySettings) -> Self {
        Self {
            settings,
            bonus_items: IndexMap::new(),
        }
    }

    pub fn with_bonus(mut self, key: &str, settings: EntrySettings) -> Self {
        self.bonus_items.insert(key.to_string(), settings);
        self
    }
}
