//! Weapon capability index, derived from item definitions once per
//! catalog build.

use crate::definitions::{HeldEntity, ItemCategory, ItemRegistry, ItemSlot};
use std::collections::{HashMap, HashSet};

/// What a weapon can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponCapability {
    pub max_mods: i32,
    pub max_ammo: i32,
    pub mod_slots: ItemSlot,
    pub is_liquid_weapon: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WeaponCapabilityIndex {
    weapons: HashMap<String, WeaponCapability>,
    mod_slots: HashMap<String, ItemSlot>,
    durability_items: HashSet<String>,
}

impl WeaponCapabilityIndex {
    pub fn build(registry: &ItemRegistry) -> Self {
        let mut index = Self::default();

        for def in registry.iter() {
            if def.has_condition {
                index.durability_items.insert(def.shortname.clone());
            }
            if def.category != ItemCategory::Weapon {
                continue;
            }

            if def.held_entity == HeldEntity::WeaponMod {
                index.mod_slots.insert(def.shortname.clone(), def.occupy_slots);
                continue;
            }

            let mut max_mods = 0;
            let mut mod_slots = ItemSlot::empty();
            let mut is_liquid_weapon = false;
            let mut liquid_stack = 0;
            if let Some(container) = def.mod_container {
                if container.capacity > 0 && !container.available_slots.is_empty() {
                    max_mods = container.capacity;
                    mod_slots = container.available_slots;
                }
                if container.liquid_only {
                    is_liquid_weapon = true;
                    liquid_stack = container.max_stack;
                }
            }

            let max_ammo = match def.held_entity {
                HeldEntity::Projectile { magazine_size } => magazine_size,
                HeldEntity::FlameThrower { max_ammo } => max_ammo,
                HeldEntity::LiquidWeapon => liquid_stack,
                _ => continue,
            };

            index.weapons.insert(
                def.shortname.clone(),
                WeaponCapability {
                    max_mods,
                    max_ammo,
                    mod_slots,
                    is_liquid_weapon: is_liquid_weapon || def.held_entity == HeldEntity::LiquidWeapon,
                },
            );
        }

        log::debug!(
            "capability index: weapons={} mods={} durability_items={}",
            index.weapons.len(),
            index.mod_slots.len(),
            index.durability_items.len()
        );
        index
    }

    pub fn weapon(&self, shortname: &str) -> Option<&WeaponCapability> {
        self.weapons.get(shortname)
    }

    pub fn mod_slot(&self, shortname: &str) -> Option<ItemSlot> {
        self.mod_slots.get(shortname).copied()
    }

    pub fn has_durability(&self, shortname: &str) -> bool {
        self.durability_items.contains(shortname)
    }

    pub fn weapon_count(&self) -> usize {
        self.weapons.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_each_weapon_shape() {
        let index = WeaponCapabilityIndex::build(&ItemRegistry::default_test());

        let ak = index.weapon("rifle.ak").unwrap();
        assert_eq!(ak.max_mods, 3);
        assert_eq!(ak.max_ammo, 30);
        assert!(ak.mod_slots.contains(ItemSlot::MAGAZINE));
        assert!(!ak.is_liquid_weapon);

        let flamer = index.weapon("flamethrower").unwrap();
        assert_eq!((flamer.max_mods, flamer.max_ammo), (0, 100));

        let water = index.weapon("pistol.water").unwrap();
        assert!(water.is_liquid_weapon);
        assert_eq!(water.max_ammo, 250);

        assert!(index.weapon("weapon.mod.silencer").is_none());
        assert_eq!(index.mod_slot("weapon.mod.silencer"), Some(ItemSlot::MUZZLE));
        assert!(index.has_durability("hatchet"));
        assert!(!index.has_durability("rope"));
    }
}
