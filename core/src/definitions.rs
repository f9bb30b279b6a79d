//! Static item metadata supplied by the host (the "world query" side).
//!
//! The engine never constructs definitions itself. The host exports them
//! once per catalog load; tests use [`ItemRegistry::default_test`].

use crate::{
    error::{LootError, LootResult},
    item::{ItemFactory, LootItem},
    types::{ItemId, SkinId, RARITY_CLASSES},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const BLUEPRINT_BASE: &str = "blueprintbase";

bitflags::bitflags! {
    /// Attachment slot types. A weapon's mask is the union of the
    /// slots it accepts. An attachment occupies one or more slots.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ItemSlot: u32 {
        const BARREL      = 1 << 0;
        const MUZZLE      = 1 << 1;
        const SIGHT       = 1 << 2;
        const UNDERBARREL = 1 << 3;
        const MAGAZINE    = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Weapon,
    Ammunition,
    Attire,
    Tool,
    Medical,
    Resources,
    Component,
    Construction,
    Food,
    #[default]
    Misc,
}

/// Kind of entity an item becomes when held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeldEntity {
    #[default]
    None,
    Projectile {
        magazine_size: i32,
    },
    FlameThrower {
        max_ammo: i32,
    },
    LiquidWeapon,
    WeaponMod,
}

/// The sub-container an item carries (attachment slots or a liquid tank).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModContainer {
    pub capacity: i32,
    #[serde(default = "ItemSlot::empty")]
    pub available_slots: ItemSlot,
    #[serde(default)]
    pub liquid_only: bool,
    #[serde(default)]
    pub max_stack: i32,
}

fn default_max_condition() -> f32 {
    100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub item_id: ItemId,
    pub shortname: String,
    #[serde(default)]
    pub category: ItemCategory,
    /// Rarity class, 0 (most common) to 4.
    #[serde(default)]
    pub rarity: u8,
    #[serde(default)]
    pub has_condition: bool,
    #[serde(default = "default_max_condition")]
    pub max_condition: f32,
    /// The item has a blueprint that players can research.
    #[serde(default)]
    pub researchable: bool,
    /// Vanilla spawn tables hand this item out as a blueprint.
    #[serde(default)]
    pub spawn_as_blueprint: bool,
    #[serde(default)]
    pub mod_container: Option<ModContainer>,
    #[serde(default)]
    pub held_entity: HeldEntity,
    #[serde(default = "ItemSlot::empty")]
    pub occupy_slots: ItemSlot,
}

impl ItemDefinition {
    pub fn new(item_id: ItemId, shortname: &str, category: ItemCategory) -> Self {
        Self {
            item_id,
            shortname: shortname.to_string(),
            category,
            rarity: 0,
            has_condition: false,
            max_condition: default_max_condition(),
            researchable: false,
            spawn_as_blueprint: false,
            mod_container: None,
            held_entity: HeldEntity::None,
            occupy_slots: ItemSlot::empty(),
        }
    }

    pub fn rarity(mut self, rarity: u8) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_condition(mut self) -> Self {
        self.has_condition = true;
        self
    }

    pub fn researchable(mut self) -> Self {
        self.researchable = true;
        self
    }

    pub fn held(mut self, held: HeldEntity) -> Self {
        self.held_entity = held;
        self
    }

    pub fn mod_slots(mut self, capacity: i32, slots: ItemSlot) -> Self {
        self.mod_container = Some(ModContainer {
            capacity,
            available_slots: slots,
            liquid_only: false,
            max_stack: 0,
        });
        self
    }

    pub fn liquid_tank(mut self, max_stack: i32) -> Self {
        self.mod_container = Some(ModContainer {
            capacity: 1,
            available_slots: ItemSlot::empty(),
            liquid_only: true,
            max_stack,
        });
        self
    }

    pub fn occupies(mut self, slots: ItemSlot) -> Self {
        self.occupy_slots = slots;
        self
    }

    /// Rarity clamped into a bucket index.
    pub fn rarity_index(&self) -> usize {
        (self.rarity as usize).min(RARITY_CLASSES - 1)
    }
}

/// Every item definition the host knows, addressable by shortname and id.
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    by_name: IndexMap<String, ItemDefinition>,
    by_id: HashMap<ItemId, String>,
}

impl ItemRegistry {
    pub fn new<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = ItemDefinition>,
    {
        let mut registry = Self::default();
        for def in definitions {
            registry.by_id.insert(def.item_id, def.shortname.clone());
            registry.by_name.insert(def.shortname.clone(), def);
        }
        registry
    }

    /// Parse a JSON array of definitions.
    pub fn from_json(json: &str) -> LootResult<Self> {
        let definitions: Vec<ItemDefinition> = serde_json::from_str(json)?;
        Ok(Self::new(definitions))
    }

    /// The engine refuses to run without item definitions.
    pub fn ensure_valid(&self) -> LootResult<()> {
        if self.by_name.is_empty() {
            return Err(LootError::CatalogIntegrity {
                reason: "item definition registry is empty".into(),
            });
        }
        Ok(())
    }

    pub fn find(&self, shortname: &str) -> Option<&ItemDefinition> {
        self.by_name.get(shortname)
    }

    pub fn find_by_id(&self, item_id: ItemId) -> Option<&ItemDefinition> {
        self.by_id.get(&item_id).and_then(|name| self.by_name.get(name))
    }

    pub fn contains(&self, shortname: &str) -> bool {
        self.by_name.contains_key(shortname)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// A small, fixed item set covering every weapon shape the engine
    /// distinguishes. Used by unit and integration tests.
    pub fn default_test() -> Self {
        use HeldEntity::*;
        use ItemCategory::*;
        Self::new([
            ItemDefinition::new(1, "scrap", Resources),
            ItemDefinition::new(2, "metal.fragments", Resources),
            ItemDefinition::new(3, "rope", Component),
            ItemDefinition::new(4, "bandage", Medical),
            ItemDefinition::new(5, "cloth", Resources),
            ItemDefinition::new(6, "sewingkit", Component).rarity(1),
            ItemDefinition::new(7, "techparts", Component).rarity(3),
            ItemDefinition::new(8, BLUEPRINT_BASE, Misc),
            ItemDefinition::new(10, "hatchet", Tool).with_condition().researchable(),
            ItemDefinition::new(11, "pickaxe", Tool).with_condition().researchable().rarity(1),
            ItemDefinition::new(20, "ammo.rifle", Ammunition),
            ItemDefinition::new(21, "ammo.pistol", Ammunition),
            ItemDefinition::new(22, "arrow.wooden", Ammunition),
            ItemDefinition::new(23, "lowgradefuel", Resources),
            ItemDefinition::new(24, "water", Food),
            ItemDefinition::new(30, "rifle.ak", Weapon)
                .rarity(3)
                .with_condition()
                .researchable()
                .held(Projectile { magazine_size: 30 })
                .mod_slots(3, ItemSlot::MUZZLE | ItemSlot::SIGHT | ItemSlot::UNDERBARREL | ItemSlot::MAGAZINE),
            ItemDefinition::new(31, "pistol.revolver", Weapon)
                .rarity(1)
                .with_condition()
                .researchable()
                .held(Projectile { magazine_size: 8 })
                .mod_slots(2, ItemSlot::SIGHT | ItemSlot::MUZZLE),
            ItemDefinition::new(32, "bow.hunting", Weapon)
                .with_condition()
                .researchable()
                .held(Projectile { magazine_size: 1 }),
            ItemDefinition::new(33, "flamethrower", Weapon)
                .rarity(2)
                .with_condition()
                .held(FlameThrower { max_ammo: 100 }),
            ItemDefinition::new(34, "pistol.water", Weapon)
                .held(LiquidWeapon)
                .liquid_tank(250),
            ItemDefinition::new(35, "shotgun.double", Weapon)
                .rarity(1)
                .with_condition()
                .held(Projectile { magazine_size: 2 })
                .mod_slots(2, ItemSlot::BARREL),
            ItemDefinition::new(40, "weapon.mod.silencer", Weapon)
                .with_condition()
                .held(WeaponMod)
                .occupies(ItemSlot::MUZZLE),
            ItemDefinition::new(41, "weapon.mod.holosight", Weapon)
                .with_condition()
                .held(WeaponMod)
                .occupies(ItemSlot::SIGHT),
            ItemDefinition::new(42, "weapon.mod.extendedmags", Weapon)
                .held(WeaponMod)
                .occupies(ItemSlot::MAGAZINE),
            ItemDefinition::new(43, "weapon.mod.flashlight", Weapon)
                .held(WeaponMod)
                .occupies(ItemSlot::UNDERBARREL),
            ItemDefinition::new(44, "weapon.mod.barrel", Weapon)
                .with_condition()
                .held(WeaponMod)
                .occupies(ItemSlot::BARREL),
        ])
    }
}

impl ItemFactory for ItemRegistry {
    fn definition(&self, shortname: &str) -> Option<&ItemDefinition> {
        self.find(shortname)
    }

    fn create(&self, shortname: &str, amount: i32, skin_id: SkinId) -> Option<LootItem> {
        self.find(shortname)
            .map(|def| LootItem::from_definition(def, amount, skin_id))
    }

    fn create_blueprint(&self, target: ItemId) -> Option<LootItem> {
        let base = self.find(BLUEPRINT_BASE)?;
        self.find_by_id(target)?;
        let mut item = LootItem::from_definition(base, 1, 0);
        item.blueprint_target = Some(target);
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_round_trip_through_json() {
        let registry = ItemRegistry::default_test();
        let json = serde_json::to_string(&registry.iter().cloned().collect::<Vec<_>>()).unwrap();
        let parsed = ItemRegistry::from_json(&json).unwrap();
        assert_eq!(parsed.len(), registry.len());
        assert_eq!(parsed.find("rifle.ak"), registry.find("rifle.ak"));
        assert_eq!(parsed.find_by_id(30).map(|d| d.shortname.as_str()), Some("rifle.ak"));
    }

    #[test]
    fn empty_registry_is_an_integrity_error() {
        let registry = ItemRegistry::new([]);
        assert!(matches!(
            registry.ensure_valid(),
            Err(LootError::CatalogIntegrity { .. })
        ));
    }

    #[test]
    fn blueprints_need_a_known_target() {
        let registry = ItemRegistry::default_test();
        let bp = registry.create_blueprint(30).unwrap();
        assert_eq!(bp.shortname, BLUEPRINT_BASE);
        assert_eq!(bp.blueprint_target, Some(30));
        assert!(registry.create_blueprint(9_999).is_none());
    }
}
