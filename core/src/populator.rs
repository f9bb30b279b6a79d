//! Container population.
//!
//! RULE: The fill loop is bounded. Every slot either accepts an item,
//! is discarded by the blacklist, or spends one unit of a fixed retry
//! budget. When the budget runs out the remaining slots stay empty.
//!
//! A fill runs in four phases:
//!   1. init: clear the container and roll the slot target
//!   2. fill: per slot, consult imported groups, then the ungrouped pool
//!   3. guarantee: table and triggered-group guaranteed items
//!   4. finalize: shuffle, insert, add scrap, shrink capacity

use crate::{
    catalog::{CatalogCaches, LootCatalog},
    config::LootConfig,
    error::{GenerationError, LootError, LootResult},
    item::{ItemFactory, ItemIdentity, LootContainer, LootItem},
    loot_table::LootTableEntry,
    rarity::BucketDraw,
    rng::LootRng,
    spawn::{Generated, ItemSpawner},
};
use serde::Serialize;
use std::collections::HashSet;

pub const MAX_FILL_RETRIES: u32 = 10;
pub const WORKING_CAPACITY: usize = 36;
pub const SCRAP_SHORTNAME: &str = "scrap";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOrigin {
    LootGroup,
    Ungrouped,
}

/// Three independent duplicate switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicatePolicy {
    pub allow_items: bool,
    pub allow_bonus_items: bool,
    pub allow_loot_group_items: bool,
}

impl DuplicatePolicy {
    pub fn from_config(config: &LootConfig) -> Self {
        Self {
            allow_items: config.loot.allow_duplicate_items,
            allow_bonus_items: config.loot.allow_bonus_item_duplicates,
            allow_loot_group_items: config.loot_groups.allow_loot_group_duplicates,
        }
    }

    /// Whether an item of this origin must be unique in the container.
    /// Checked in a fixed order: group switch, item switch, bonus switch.
    pub fn forbids(&self, origin: ItemOrigin, bonus: bool) -> bool {
        (origin == ItemOrigin::LootGroup && !self.allow_loot_group_items)
            || (!bonus && !self.allow_items)
            || (bonus && !self.allow_bonus_items)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillSettings {
    pub blueprint_probability: f64,
    pub loot_multiplier: i32,
    pub scrap_multiplier: i32,
    pub duplicates: DuplicatePolicy,
}

impl FillSettings {
    pub fn from_config(config: &LootConfig) -> Self {
        Self {
            blueprint_probability: config.general.blueprint_probability,
            loot_multiplier: config.loot.loot_multiplier,
            scrap_multiplier: config.loot.scrap_multiplier,
            duplicates: DuplicatePolicy::from_config(config),
        }
    }
}

/// What a single fill did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub container_type: String,
    pub target_slots: usize,
    pub filled_slots: usize,
    pub retries_used: u32,
    pub gave_up: bool,
    pub duplicates_rejected: usize,
    pub blacklisted: usize,
    pub failed_draws: usize,
    pub bonus_items: usize,
    pub guaranteed_items: usize,
    pub scrap: i32,
    /// Items that did not fit in the container.
    pub overflowed: usize,
}

/// How a single slot attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotOutcome {
    Accepted,
    Blacklisted,
    Duplicate,
    NoItem,
    Failed,
}

impl SlotOutcome {
    fn advances_slot(self) -> bool {
        matches!(self, SlotOutcome::Accepted | SlotOutcome::Blacklisted)
    }
}

/// Explicit state of the fill loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FillState {
    slot: usize,
    target: usize,
    remaining_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillStep {
    Draw,
    Complete,
    GiveUp,
}

impl FillState {
    fn new(target: usize) -> Self {
        Self {
            slot: 0,
            target,
            remaining_attempts: MAX_FILL_RETRIES,
        }
    }

    fn step(&self) -> FillStep {
        if self.slot >= self.target {
            FillStep::Complete
        } else if self.remaining_attempts == 0 {
            FillStep::GiveUp
        } else {
            FillStep::Draw
        }
    }

    fn record(&mut self, outcome: SlotOutcome) {
        if outcome.advances_slot() {
            self.slot += 1;
        } else {
            self.remaining_attempts -= 1;
        }
    }
}

/// Per-fill bookkeeping.
#[derive(Default)]
struct FillContext<'c> {
    items: Vec<LootItem>,
    /// Identities of accepted primaries. Bonus items are checked against
    /// this set but never added to it.
    seen: HashSet<ItemIdentity>,
    blueprints: usize,
    /// One entry per group that yielded an item on an accepted slot. A
    /// group drawn on several slots appears several times.
    triggered_groups: Vec<&'c str>,
}

impl<'c> FillContext<'c> {
    fn record(&mut self, identity: ItemIdentity) {
        if matches!(identity, ItemIdentity::Blueprint(_)) {
            self.blueprints += 1;
        }
        self.seen.insert(identity);
    }
}

/// Fills containers from a built catalog. Borrows everything it reads,
/// so many populators can share one catalog.
pub struct ContainerPopulator<'a> {
    catalog: &'a LootCatalog,
    caches: &'a CatalogCaches,
    spawner: ItemSpawner<'a>,
    settings: FillSettings,
}

impl<'a> ContainerPopulator<'a> {
    pub fn new(
        catalog: &'a LootCatalog,
        caches: &'a CatalogCaches,
        factory: &'a dyn ItemFactory,
        settings: FillSettings,
    ) -> Self {
        Self {
            catalog,
            caches,
            spawner: ItemSpawner::new(factory, settings.loot_multiplier),
            settings,
        }
    }

    /// Replace the contents of `container` with a fresh fill for
    /// `container_type`. Fails only when the type has no enabled table.
    pub fn populate(
        &self,
        container_type: &str,
        container: &mut LootContainer,
        rng: &mut LootRng,
    ) -> LootResult<FillReport> {
        let table = self
            .catalog
            .tables
            .get(container_type)
            .filter(|t| t.enabled)
            .ok_or_else(|| LootError::NotEligible {
                container_type: container_type.to_string(),
            })?;

        // ── Init ──
        container.clear();
        container.set_capacity(WORKING_CAPACITY);

        let mut target = table.roll_item_count(rng);
        let inventory = table.declared_inventory(&self.catalog.groups);
        if inventory > 0 && target > inventory && inventory < WORKING_CAPACITY {
            target = inventory;
        }

        let mut report = FillReport {
            container_type: container_type.to_string(),
            target_slots: target,
            ..Default::default()
        };
        let mut ctx = FillContext::default();

        // ── Fill ──
        let mut state = FillState::new(target);
        loop {
            match state.step() {
                FillStep::Complete => break,
                FillStep::GiveUp => {
                    report.gave_up = true;
                    log::debug!(
                        "{container_type}: retry budget spent, {} of {} slots filled",
                        state.slot,
                        target
                    );
                    break;
                }
                FillStep::Draw => {
                    let outcome = self.fill_slot(container_type, table, &mut ctx, &mut report, rng);
                    state.record(outcome);
                }
            }
        }
        report.filled_slots = state.slot;
        report.retries_used = MAX_FILL_RETRIES - state.remaining_attempts;

        // ── Guarantee ──
        let guaranteed = table.guaranteed_items.iter().chain(
            ctx.triggered_groups
                .iter()
                .filter_map(|name| self.catalog.groups.get(*name))
                .flat_map(|group| group.guaranteed_items.iter()),
        );
        for (key, settings) in guaranteed {
            match self.spawner.spawn_guaranteed(key, settings, rng) {
                Ok(item) => {
                    ctx.items.push(item);
                    report.guaranteed_items += 1;
                }
                Err(e) => log::error!("{container_type}: guaranteed item '{key}' failed: {e}"),
            }
        }

        // ── Finalize ──
        rng.shuffle(&mut ctx.items);
        for item in ctx.items {
            if let Err(item) = container.insert(item) {
                log::debug!("{container_type}: no room for '{}', destroyed", item.shortname);
                report.overflowed += 1;
            }
        }

        let scrap = table.roll_scrap(rng).saturating_mul(self.settings.scrap_multiplier);
        if scrap > 0 {
            match self.spawner.factory().create(SCRAP_SHORTNAME, scrap, 0) {
                Some(item) => {
                    if container.insert(item).is_ok() {
                        report.scrap = scrap;
                    } else {
                        report.overflowed += 1;
                    }
                }
                None => log::warn!("{container_type}: scrap item is not defined"),
            }
        }

        container.shrink_to_occupied();
        container.mark_dirty();
        Ok(report)
    }

    fn fill_slot(
        &self,
        container_type: &str,
        table: &'a LootTableEntry,
        ctx: &mut FillContext<'a>,
        report: &mut FillReport,
        rng: &mut LootRng,
    ) -> SlotOutcome {
        let mut drawn: Option<(Generated, ItemOrigin)> = None;
        let mut triggered: Vec<&'a str> = Vec::new();

        for import in table.imports.iter().filter(|i| i.enabled) {
            let Some((name, group)) = self.catalog.groups.get_key_value(&import.group) else {
                log::warn!("{container_type}: imported group '{}' does not exist", import.group);
                continue;
            };
            if !group.enabled || rng.next_percent() > import.probability {
                continue;
            }
            match group.get_item(rng, &self.spawner) {
                Ok(Some(generated)) => {
                    triggered.push(name.as_str());
                    if drawn.is_none() {
                        drawn = Some((generated, ItemOrigin::LootGroup));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("{container_type}: group '{name}' draw failed: {e}");
                    report.failed_draws += 1;
                }
            }
        }

        if drawn.is_none() {
            let blueprints_full = table.blueprints_full(ctx.blueprints);
            match self.draw_ungrouped(container_type, table, blueprints_full, rng) {
                Ok(Some(generated)) => drawn = Some((generated, ItemOrigin::Ungrouped)),
                Ok(None) => {}
                Err(e) => {
                    log::error!("{container_type}: ungrouped draw failed: {e}");
                    report.failed_draws += 1;
                    return SlotOutcome::Failed;
                }
            }
        }

        let Some((generated, origin)) = drawn else {
            return SlotOutcome::NoItem;
        };

        let duplicates = self.settings.duplicates;
        let identity = generated.item.identity();
        if duplicates.forbids(origin, false) && ctx.seen.contains(&identity) {
            report.duplicates_rejected += 1;
            return SlotOutcome::Duplicate;
        }
        ctx.record(identity);

        if self.catalog.is_blacklisted(&generated.item.shortname) {
            report.blacklisted += 1;
            return SlotOutcome::Blacklisted;
        }

        ctx.items.push(generated.item);
        for bonus in generated.bonus_items {
            let identity = bonus.identity();
            if duplicates.forbids(origin, true) && ctx.seen.contains(&identity) {
                report.duplicates_rejected += 1;
                continue;
            }
            ctx.items.push(bonus);
            report.bonus_items += 1;
        }
        ctx.triggered_groups.extend(triggered);
        SlotOutcome::Accepted
    }

    fn draw_ungrouped(
        &self,
        container_type: &str,
        table: &LootTableEntry,
        blueprints_full: bool,
        rng: &mut LootRng,
    ) -> Result<Option<Generated>, GenerationError> {
        let buckets = self
            .caches
            .buckets
            .get(container_type)
            .ok_or_else(|| GenerationError::MissingBuckets {
                container_type: container_type.to_string(),
            })?;

        let as_blueprint = rng.chance(self.settings.blueprint_probability) && !blueprints_full;
        match buckets.draw(as_blueprint, rng) {
            None => Ok(None),
            Some(BucketDraw::Blueprint(shortname)) => {
                let factory = self.spawner.factory();
                let def = factory
                    .definition(shortname)
                    .ok_or_else(|| GenerationError::UnknownItem { key: shortname.to_string() })?;
                let item = factory
                    .create_blueprint(def.item_id)
                    .ok_or_else(|| GenerationError::FactoryRefused { key: shortname.to_string() })?;
                Ok(Some(Generated::single(item)))
            }
            Some(BucketDraw::Item(key)) => {
                let entry = table
                    .ungrouped_items
                    .get(key)
                    .ok_or_else(|| GenerationError::UnknownItem { key: key.to_string() })?;
                self.spawner.spawn_primary(key, entry, rng).map(Some)
            }
        }
    }
}
