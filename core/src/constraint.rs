//! Repairs catalog entries so they respect what each item can carry.
//!
//! Runs once per catalog build, after the capability index exists and
//! before any population. For every entry it:
//!   - adds or removes the durability range depending on whether the
//!     item has a condition bar
//!   - creates weapon modifications on weapons and clears them on
//!     everything else
//!   - sets the ammo mode from the weapon's ammo capacity
//!   - strips unknown and slot-incompatible attachments
//!   - balances attachment pools that sum over 100

use crate::{
    capability::{WeaponCapability, WeaponCapabilityIndex},
    definitions::ItemSlot,
    entry::{strip_tag, AttachmentSettings, EntrySettings, ItemModifications, LootEntry, DurabilityRange},
    loot_group::LootGroup,
    loot_table::LootTableEntry,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub scanned: usize,
    pub modified: usize,
    /// Misconfigurations fixed: stray modifications and attachments.
    pub repairs: usize,
}

impl ResolutionReport {
    pub fn merge(&mut self, other: ResolutionReport) {
        self.scanned += other.scanned;
        self.modified += other.modified;
        self.repairs += other.repairs;
    }

    pub fn is_modified(&self) -> bool {
        self.modified > 0
    }
}

pub struct ConstraintResolver<'a> {
    index: &'a WeaponCapabilityIndex,
    log_balancing: bool,
}

impl<'a> ConstraintResolver<'a> {
    pub fn new(index: &'a WeaponCapabilityIndex, log_balancing: bool) -> Self {
        Self {
            index,
            log_balancing,
        }
    }

    pub fn resolve_table(&self, container_type: &str, table: &mut LootTableEntry) -> ResolutionReport {
        let mut report = ResolutionReport::default();
        for (key, settings) in table.guaranteed_items.iter_mut() {
            self.scan(key, settings, container_type, &mut report);
        }
        for (key, entry) in table.ungrouped_items.iter_mut() {
            self.resolve_entry(key, entry, container_type, &mut report);
        }
        report
    }

    pub fn resolve_group(&self, name: &str, group: &mut LootGroup) -> ResolutionReport {
        let mut report = ResolutionReport::default();
        for (key, settings) in group.guaranteed_items.iter_mut() {
            self.scan(key, settings, name, &mut report);
        }
        for (key, entry) in group.entries_mut() {
            self.resolve_entry(key, entry, name, &mut report);
        }
        report
    }

    /// Resolve a primary entry and each of its bonus items.
    pub fn resolve_entry(
        &self,
        key: &str,
        entry: &mut LootEntry,
        context: &str,
        report: &mut ResolutionReport,
    ) {
        self.scan(key, &mut entry.settings, context, report);
        for (bonus_key, settings) in entry.bonus_items.iter_mut() {
            self.scan(bonus_key, settings, context, report);
        }
    }

    fn scan(&self, key: &str, settings: &mut EntrySettings, context: &str, report: &mut ResolutionReport) {
        report.scanned += 1;
        let shortname = strip_tag(key);
        let mut changed = false;

        match self.index.weapon(&shortname) {
            Some(capability) => {
                changed |= self.resolve_weapon(key, settings, capability, context, report);
            }
            None => {
                if settings.modifications.take().is_some() {
                    log::warn!("{context}: '{key}' is not a weapon, removed its weapon properties");
                    report.repairs += 1;
                    changed = true;
                }
            }
        }

        let has_durability = self.index.has_durability(&shortname);
        if has_durability && settings.durability.is_none() {
            settings.durability = Some(DurabilityRange::default());
            changed = true;
        } else if !has_durability && settings.durability.take().is_some() {
            changed = true;
        }

        if changed {
            report.modified += 1;
        }
    }

    fn resolve_weapon(
        &self,
        key: &str,
        settings: &mut EntrySettings,
        capability: &WeaponCapability,
        context: &str,
        report: &mut ResolutionReport,
    ) -> bool {
        let mut changed = false;
        if settings.modifications.is_none() {
            changed = true;
        }
        let modifications = settings
            .modifications
            .get_or_insert_with(ItemModifications::default);

        let holds_multiple = capability.max_ammo > 1;
        if modifications.ammo.capacity.holds_multiple() != holds_multiple {
            modifications.ammo.set_holds_multiple(holds_multiple);
            changed = true;
        }
        modifications.ammo.max_ammo = capability.max_ammo;
        modifications.max_mods = capability.max_mods;

        let accepts_mods = capability.max_mods > 0 && !capability.is_liquid_weapon;
        if !accepts_mods {
            if modifications.attachments.take().is_some() {
                log::warn!("{context}: '{key}' cannot carry attachments, removed them");
                report.repairs += 1;
                changed = true;
            }
            return changed;
        }

        if modifications.attachments.is_none() {
            changed = true;
        }
        let attachments = modifications
            .attachments
            .get_or_insert_with(AttachmentSettings::default);
        changed |= self.resolve_attachments(key, attachments, capability, context, report);
        changed
    }

    fn resolve_attachments(
        &self,
        key: &str,
        attachments: &mut AttachmentSettings,
        capability: &WeaponCapability,
        context: &str,
        report: &mut ResolutionReport,
    ) -> bool {
        let mut changed = false;
        let mut durability_stripped = 0;

        let removed = attachments.retain_mods(|mod_key, entry| {
            let Some(slot) = self.index.mod_slot(mod_key) else {
                log::warn!("{context}: '{key}' lists '{mod_key}', which is not an attachment");
                return false;
            };
            if slot.intersects(ItemSlot::BARREL) && entry.durability.take().is_some() {
                durability_stripped += 1;
            }
            if !capability.mod_slots.contains(slot) {
                log::warn!("{context}: '{key}' cannot mount '{mod_key}'");
                return false;
            }
            true
        });
        if removed > 0 || durability_stripped > 0 {
            report.repairs += removed;
            changed = true;
        }

        let max_mods = attachments.max_mods.clamp(1, capability.max_mods);
        if max_mods != attachments.max_mods {
            attachments.max_mods = max_mods;
            changed = true;
        }

        if let Some(outcome) = attachments.balance_if_over() {
            if self.log_balancing {
                log::info!(
                    "{context}: '{key}' attachment probabilities summed to {:.2}, balanced to {:.2}",
                    outcome.sum_before,
                    outcome.sum_after
                );
            }
            changed = true;
        }
        changed
    }
}
