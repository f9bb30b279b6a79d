//! Turning entry settings into concrete items: amount, display name,
//! attachments, ammunition, durability and bonus items.

use crate::{
    entry::{strip_tag, AmmoCapacity, EntrySettings, LootEntry},
    error::GenerationError,
    item::{ItemFactory, LoadedAmmo, LootItem, EXTENDED_MAGAZINE},
    rng::LootRng,
};

/// Attempts per attachment slot before giving up on that slot.
pub const ATTACHMENT_ATTEMPTS: u32 = 5;

/// A primary item plus the bonus items that ride along with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub item: LootItem,
    pub bonus_items: Vec<LootItem>,
}

impl Generated {
    pub fn single(item: LootItem) -> Self {
        Self {
            item,
            bonus_items: Vec::new(),
        }
    }
}

pub struct ItemSpawner<'a> {
    factory: &'a dyn ItemFactory,
    loot_multiplier: i32,
}

impl<'a> ItemSpawner<'a> {
    pub fn new(factory: &'a dyn ItemFactory, loot_multiplier: i32) -> Self {
        Self {
            factory,
            loot_multiplier,
        }
    }

    pub fn factory(&self) -> &'a dyn ItemFactory {
        self.factory
    }

    /// Spawn an ungrouped entry and its bonus items. Sampled amounts are
    /// scaled by the loot multiplier.
    pub fn spawn_primary(
        &self,
        key: &str,
        entry: &LootEntry,
        rng: &mut LootRng,
    ) -> Result<Generated, GenerationError> {
        self.spawn_entry(key, entry, self.loot_multiplier, rng)
    }

    /// Spawn a loot group entry. The primary keeps its rolled amount,
    /// bonus items are still scaled by the loot multiplier.
    pub fn spawn_group_primary(
        &self,
        key: &str,
        entry: &LootEntry,
        rng: &mut LootRng,
    ) -> Result<Generated, GenerationError> {
        self.spawn_entry(key, entry, 1, rng)
    }

    fn spawn_entry(
        &self,
        key: &str,
        entry: &LootEntry,
        primary_multiplier: i32,
        rng: &mut LootRng,
    ) -> Result<Generated, GenerationError> {
        let amount = entry.settings.roll_amount(rng).saturating_mul(primary_multiplier);
        let item = self.spawn_settings(key, &entry.settings, amount, rng)?;

        let mut bonus_items = Vec::with_capacity(entry.bonus_items.len());
        for (bonus_key, settings) in &entry.bonus_items {
            let amount = settings.roll_amount(rng).saturating_mul(self.loot_multiplier);
            match self.spawn_settings(bonus_key, settings, amount, rng) {
                Ok(bonus) => bonus_items.push(bonus),
                Err(e) => log::warn!("bonus item '{bonus_key}' of '{key}' skipped: {e}"),
            }
        }

        Ok(Generated { item, bonus_items })
    }

    /// Guaranteed items keep their configured amount.
    pub fn spawn_guaranteed(
        &self,
        key: &str,
        settings: &EntrySettings,
        rng: &mut LootRng,
    ) -> Result<LootItem, GenerationError> {
        let amount = settings.roll_amount(rng);
        self.spawn_settings(key, settings, amount, rng)
    }

    pub fn spawn_settings(
        &self,
        key: &str,
        settings: &EntrySettings,
        amount: i32,
        rng: &mut LootRng,
    ) -> Result<LootItem, GenerationError> {
        let shortname = strip_tag(key);
        let mut item = self
            .factory
            .create(&shortname, amount.max(1), settings.skin_id)
            .ok_or_else(|| {
                if self.factory.definition(&shortname).is_none() {
                    GenerationError::UnknownItem { key: key.to_string() }
                } else {
                    GenerationError::FactoryRefused { key: key.to_string() }
                }
            })?;

        if let Some(name) = settings.display_name() {
            item.set_name(name);
        }
        self.apply_attachments(&mut item, settings, rng);
        self.apply_ammo(&mut item, settings, rng);
        if let Some(durability) = settings.durability {
            item.set_condition_percent(durability.roll(rng));
        }
        item.mark_dirty();
        Ok(item)
    }

    fn apply_attachments(&self, item: &mut LootItem, settings: &EntrySettings, rng: &mut LootRng) {
        let Some(modifications) = settings.modifications.as_ref() else {
            return;
        };
        let Some(attachments) = modifications.attachments.as_ref() else {
            return;
        };
        if attachments.is_empty() || modifications.max_mods <= 0 {
            return;
        }

        let total = rng
            .range_i32(attachments.min_mods, attachments.max_mods)
            .clamp(1, modifications.max_mods);

        for _ in 0..total {
            for _ in 0..ATTACHMENT_ATTEMPTS {
                let Some((mod_key, mod_entry)) = attachments.select(rng) else {
                    break;
                };
                let Some(mut attachment) = self.factory.create(mod_key, 1, 0) else {
                    log::error!("attachment '{mod_key}' could not be created for '{}'", item.shortname);
                    break;
                };
                if let Some(durability) = mod_entry.durability {
                    attachment.set_condition_percent(durability.roll(rng));
                }
                if item.attach(attachment).is_ok() {
                    break;
                }
            }
        }
    }

    fn apply_ammo(&self, item: &mut LootItem, settings: &EntrySettings, rng: &mut LootRng) {
        let Some(modifications) = settings.modifications.as_ref() else {
            return;
        };
        let ammo = &modifications.ammo;
        let ammo_item = ammo.ammo_item.trim();
        if ammo_item.is_empty() {
            return;
        }

        let amount = match ammo.capacity {
            AmmoCapacity::MultiUnit { min, max } => {
                let loaded = rng.range_i32(min, max).clamp(0, ammo.max_ammo.max(0));
                if item.has_attachment(EXTENDED_MAGAZINE) {
                    (loaded as f64 * 1.25).ceil() as i32
                } else {
                    loaded
                }
            }
            AmmoCapacity::SingleUnit { probability } => {
                if rng.range_i32(0, 100) as f64 > probability {
                    return;
                }
                1
            }
        };

        if self.factory.definition(ammo_item).is_none() {
            log::warn!("ammo '{ammo_item}' for '{}' is not a known item", item.shortname);
            return;
        }
        item.load_ammo(LoadedAmmo {
            shortname: ammo_item.to_string(),
            amount,
        });
    }
}
