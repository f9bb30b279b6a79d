//! Generated items and the containers they land in.
//!
//! RULE: The engine only ever creates items through an [`ItemFactory`].
//! Hosts plug their own item system in behind that trait.

use crate::{
    definitions::ItemDefinition,
    types::{ItemId, SkinId},
};
use serde::{Deserialize, Serialize};

/// Shortname of the magazine attachment that enlarges ammo loads.
pub const EXTENDED_MAGAZINE: &str = "weapon.mod.extendedmags";

/// Ammunition loaded into a weapon's magazine or tank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedAmmo {
    pub shortname: String,
    pub amount: i32,
}

/// What the duplicate policy compares: an item's shortname, or the
/// target of a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemIdentity {
    Item(String),
    Blueprint(ItemId),
}

/// A concrete item produced for a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootItem {
    pub item_id: ItemId,
    pub shortname: String,
    pub amount: i32,
    pub skin_id: SkinId,
    pub name: Option<String>,
    pub condition: Option<f32>,
    pub max_condition: f32,
    pub blueprint_target: Option<ItemId>,
    pub attachments: Vec<LootItem>,
    pub attachment_capacity: usize,
    pub ammo: Option<LoadedAmmo>,
    pub dirty: bool,
}

impl LootItem {
    pub fn from_definition(def: &ItemDefinition, amount: i32, skin_id: SkinId) -> Self {
        let attachment_capacity = def
            .mod_container
            .filter(|c| !c.liquid_only)
            .map(|c| c.capacity.max(0) as usize)
            .unwrap_or(0);
        Self {
            item_id: def.item_id,
            shortname: def.shortname.clone(),
            amount,
            skin_id,
            name: None,
            condition: def.has_condition.then_some(def.max_condition),
            max_condition: def.max_condition,
            blueprint_target: None,
            attachments: Vec::new(),
            attachment_capacity,
            ammo: None,
            dirty: false,
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    /// Set condition as a percentage of max condition. Items without a
    /// condition bar are left alone.
    pub fn set_condition_percent(&mut self, percent: i32) {
        if self.condition.is_some() {
            let fraction = percent.clamp(0, 100) as f32 / 100.0;
            self.condition = Some(self.max_condition * fraction);
        }
    }

    pub fn has_attachment(&self, shortname: &str) -> bool {
        self.attachments.iter().any(|a| a.shortname == shortname)
    }

    /// Move an attachment into the weapon. Hands it back when the weapon
    /// is full or already carries the same attachment.
    pub fn attach(&mut self, attachment: LootItem) -> Result<(), LootItem> {
        if self.attachments.len() >= self.attachment_capacity
            || self.has_attachment(&attachment.shortname)
        {
            return Err(attachment);
        }
        self.attachments.push(attachment);
        Ok(())
    }

    pub fn load_ammo(&mut self, ammo: LoadedAmmo) {
        self.ammo = Some(ammo);
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_blueprint(&self) -> bool {
        self.blueprint_target.is_some()
    }

    pub fn identity(&self) -> ItemIdentity {
        match self.blueprint_target {
            Some(target) => ItemIdentity::Blueprint(target),
            None => ItemIdentity::Item(self.shortname.clone()),
        }
    }
}

/// Creates items on behalf of the engine.
pub trait ItemFactory {
    fn definition(&self, shortname: &str) -> Option<&ItemDefinition>;

    /// Returns None when the shortname is unknown or the host refuses.
    fn create(&self, shortname: &str, amount: i32, skin_id: SkinId) -> Option<LootItem>;

    /// A blueprint teaching the item with id `target`.
    fn create_blueprint(&self, target: ItemId) -> Option<LootItem>;
}

/// A bounded inventory that population fills.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LootContainer {
    capacity: usize,
    items: Vec<LootItem>,
    dirty: bool,
}

impl LootContainer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::new(),
            dirty: false,
        }
    }

    /// Destroy every item the container holds.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn items(&self) -> &[LootItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Move an item in. A full container hands the item back.
    pub fn insert(&mut self, item: LootItem) -> Result<(), LootItem> {
        if self.items.len() >= self.capacity {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    /// Shrink capacity down to the number of occupied slots.
    pub fn shrink_to_occupied(&mut self) {
        self.capacity = self.items.len();
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn count_of(&self, shortname: &str) -> i32 {
        self.items
            .iter()
            .filter(|i| i.shortname == shortname)
            .map(|i| i.amount)
            .sum()
    }
}

/// A container placed in the world, keyed by its container type.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedContainer {
    pub container_type: String,
    pub container: LootContainer,
}

impl PlacedContainer {
    pub fn new(container_type: &str) -> Self {
        Self {
            container_type: container_type.to_string(),
            container: LootContainer::default(),
        }
    }
}

/// Host-side enumeration of every live container, used by world-wide
/// repopulation.
pub trait WorldContainers {
    fn visit_containers(&mut self, visit: &mut dyn FnMut(&str, &mut LootContainer));
}

impl WorldContainers for Vec<PlacedContainer> {
    fn visit_containers(&mut self, visit: &mut dyn FnMut(&str, &mut LootContainer)) {
        for placed in self.iter_mut() {
            visit(&placed.container_type, &mut placed.container);
        }
    }
}
