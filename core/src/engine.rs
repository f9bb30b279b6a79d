//! The loot engine: owns the catalog, its derived caches, the store and
//! the RNG streams, and exposes every operation a host calls.
//!
//! RULES:
//!   - The engine is the single writer of the catalog. Reloads build a
//!     fresh catalog and swap it in whole.
//!   - All randomness flows through the RngBank.
//!   - Catalog-level changes are recorded in the event log.
//!   - Bulk re-population only ever runs from the tick scheduler.

use crate::{
    catalog::{
        BlacklistFile, BuildReport, CatalogCaches, LootCatalog, LootGroupsFile, LootTablesFile,
        BLACKLIST_FILE, LOOT_GROUPS_FILE, LOOT_TABLES_FILE,
    },
    command::{BlacklistOutcome, CommandOutcome, LootCommand},
    config::LootConfig,
    definitions::ItemRegistry,
    error::{LootError, LootResult},
    event::LootEvent,
    item::{LootContainer, WorldContainers},
    populator::{ContainerPopulator, FillReport, FillSettings},
    prefab::{derive_missing_tables, discover_watched, PrefabRegistry},
    remote::RemoteCatalogSource,
    rng::{LootRng, RngBank, StreamSlot},
    scheduler::{DeferredTask, TickScheduler},
    store::{BackupOutcome, CatalogStore, DocumentLoad, RestoreOutcome},
    types::Tick,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeSet;

/// Outcome of one world-wide re-population pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepopulationSummary {
    pub tick: Tick,
    pub populated: usize,
    /// Containers whose type has no enabled table.
    pub skipped: usize,
    pub failed: usize,
}

pub struct LootEngine {
    pub config: LootConfig,
    pub rng_bank: RngBank,
    pub(crate) registry: ItemRegistry,
    pub(crate) prefabs: PrefabRegistry,
    pub(crate) catalog: LootCatalog,
    pub(crate) caches: CatalogCaches,
    pub(crate) store: CatalogStore,
    scheduler: TickScheduler,
    population_rng: LootRng,
    repopulation_rng: LootRng,
    last_build: BuildReport,
}

impl LootEngine {
    /// Load the catalog from `store`, derive missing tables for watched
    /// container types, build the caches and queue the initial
    /// re-population pass.
    pub fn build(
        config: LootConfig,
        registry: ItemRegistry,
        prefabs: PrefabRegistry,
        store: CatalogStore,
        seed: u64,
    ) -> LootResult<Self> {
        registry.ensure_valid()?;
        store.migrate()?;

        let rng_bank = RngBank::new(seed);
        let mut engine = Self {
            population_rng: rng_bank.for_stream(StreamSlot::Population),
            repopulation_rng: rng_bank.for_stream(StreamSlot::Repopulation),
            rng_bank,
            config,
            registry,
            prefabs,
            catalog: LootCatalog::default(),
            caches: CatalogCaches::default(),
            store,
            scheduler: TickScheduler::new(),
            last_build: BuildReport::default(),
        };

        if engine.config.general.watched_prefabs.is_empty() && !engine.prefabs.is_empty() {
            engine.config.general.watched_prefabs = discover_watched(engine.prefabs.names());
            log::info!(
                "watched prefabs discovered from manifest: {}",
                engine.config.general.watched_prefabs.len()
            );
        }

        engine.reload_from_store()?;
        let log_summary = engine.config.general.log_updates_on_load;
        engine.schedule_repopulation(log_summary);
        Ok(engine)
    }

    /// Test engine: default test config and items, no prefabs, and an
    /// in-memory store.
    pub fn build_test(seed: u64) -> LootResult<Self> {
        Self::build(
            LootConfig::default_test(),
            ItemRegistry::default_test(),
            PrefabRegistry::default(),
            CatalogStore::in_memory()?,
            seed,
        )
    }

    // ── Catalog lifecycle ──────────────────────────────────────

    /// Validate `catalog`, build its caches and make it the live
    /// catalog. The repaired catalog is written back to the store.
    pub fn replace_catalog(&mut self, mut catalog: LootCatalog) -> LootResult<BuildReport> {
        let derived = derive_missing_tables(
            &mut self.config.general.watched_prefabs,
            &self.prefabs,
            &self.registry,
            &mut catalog.tables,
        );

        let (caches, report) = catalog.build(&self.registry, &self.config);
        self.catalog = catalog;
        self.caches = caches;

        self.persist_catalog()?;
        if report.tables_modified || report.groups_modified {
            log::info!(
                "catalog repaired on load: tables_modified={} groups_modified={}",
                report.tables_modified,
                report.groups_modified
            );
        }

        if !derived.added.is_empty() {
            self.store.append_event(&LootEvent::TablesDerived {
                container_types: derived.added,
            })?;
        }
        self.store.append_event(&LootEvent::CatalogBuilt {
            tables: report.tables,
            active_tables: report.active_tables,
            groups: report.groups,
            repairs: report.resolution.repairs,
        })?;

        self.last_build = report.clone();
        Ok(report)
    }

    /// Write the live catalog back to its three logical files.
    fn persist_catalog(&self) -> LootResult<()> {
        self.store
            .save_document(LOOT_TABLES_FILE, &self.catalog.tables_file())?;
        self.store
            .save_document(LOOT_GROUPS_FILE, &self.catalog.groups_file())?;
        self.store
            .save_document(BLACKLIST_FILE, &self.catalog.blacklist_file())?;
        Ok(())
    }

    /// Rebuild the live catalog, for instance after the item registry
    /// changed.
    pub fn rebuild(&mut self) -> LootResult<BuildReport> {
        let catalog = self.catalog.clone();
        self.replace_catalog(catalog)
    }

    /// Replace the item registry and rebuild against it.
    pub fn replace_registry(&mut self, registry: ItemRegistry) -> LootResult<BuildReport> {
        registry.ensure_valid()?;
        self.registry = registry;
        self.rebuild()
    }

    /// Read all three catalog files and swap the result in.
    pub fn reload_from_store(&mut self) -> LootResult<BuildReport> {
        let tables: LootTablesFile = self.load_or_default(LOOT_TABLES_FILE)?;
        let groups: LootGroupsFile = self.load_or_default(LOOT_GROUPS_FILE)?;
        let blacklist: BlacklistFile = self.load_or_default(BLACKLIST_FILE)?;
        self.replace_catalog(LootCatalog::from_files(tables, groups, blacklist))
    }

    fn load_or_default<T>(&self, name: &str) -> LootResult<T>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        match self.store.load_document::<T>(name)? {
            DocumentLoad::Loaded(value) => {
                log::debug!("loaded catalog file '{name}'");
                Ok(value)
            }
            DocumentLoad::Missing => {
                log::info!("catalog file '{name}' not found, writing defaults");
                let value = T::default();
                self.store.save_document(name, &value)?;
                Ok(value)
            }
            DocumentLoad::Corrupt(reason) => {
                log::error!("catalog file '{name}' is corrupt ({reason}), backing it up and writing defaults");
                self.store.backup_file(name)?;
                let value = T::default();
                self.store.save_document(name, &value)?;
                Ok(value)
            }
        }
    }

    // ── Population ─────────────────────────────────────────────

    fn fill_settings(&self) -> FillSettings {
        FillSettings::from_config(&self.config)
    }

    /// Fill one container in place.
    pub fn populate_container(
        &mut self,
        container_type: &str,
        container: &mut LootContainer,
    ) -> LootResult<FillReport> {
        let settings = self.fill_settings();
        let populator = ContainerPopulator::new(&self.catalog, &self.caches, &self.registry, settings);
        populator.populate(container_type, container, &mut self.population_rng)
    }

    /// Fill a brand new container of `container_type`.
    pub fn populate_new(&mut self, container_type: &str) -> LootResult<(LootContainer, FillReport)> {
        let mut container = LootContainer::default();
        let report = self.populate_container(container_type, &mut container)?;
        Ok((container, report))
    }

    /// Queue a world-wide re-population for the next tick. Returns false
    /// if one is already queued.
    pub fn schedule_repopulation(&mut self, log_summary: bool) -> bool {
        self.scheduler
            .schedule(DeferredTask::RepopulateAll { log_summary })
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// Advance the scheduler one tick and run whatever was due.
    pub fn run_scheduled(
        &mut self,
        world: &mut dyn WorldContainers,
    ) -> LootResult<Option<RepopulationSummary>> {
        let (tick, due) = self.scheduler.advance();
        let mut summary = None;
        for task in due {
            match task {
                DeferredTask::RepopulateAll { log_summary } => {
                    summary = Some(self.repopulate_all(tick, world, log_summary)?);
                }
            }
        }
        Ok(summary)
    }

    fn repopulate_all(
        &mut self,
        tick: Tick,
        world: &mut dyn WorldContainers,
        log_summary: bool,
    ) -> LootResult<RepopulationSummary> {
        let settings = self.fill_settings();
        let populator = ContainerPopulator::new(&self.catalog, &self.caches, &self.registry, settings);
        let rng = &mut self.repopulation_rng;
        let mut summary = RepopulationSummary {
            tick,
            ..Default::default()
        };

        world.visit_containers(&mut |container_type: &str, container: &mut LootContainer| {
            match populator.populate(container_type, container, rng) {
                Ok(_) => summary.populated += 1,
                Err(LootError::NotEligible { .. }) => summary.skipped += 1,
                Err(e) => {
                    log::error!("tick={tick} repopulation: '{container_type}' failed: {e}");
                    summary.failed += 1;
                }
            }
        });

        if log_summary {
            log::info!(
                "tick={tick} repopulation: populated={} skipped={} failed={}",
                summary.populated,
                summary.skipped,
                summary.failed
            );
        }
        self.store.append_event(&LootEvent::RepopulationCompleted {
            tick,
            populated: summary.populated,
            skipped: summary.skipped,
        })?;
        Ok(summary)
    }

    // ── Blacklist ──────────────────────────────────────────────

    pub fn blacklist(&self) -> &BTreeSet<String> {
        &self.catalog.blacklist
    }

    pub fn blacklist_add(&mut self, item: &str) -> LootResult<BlacklistOutcome> {
        if !self.registry.contains(item) {
            return Ok(BlacklistOutcome::NotAnItem);
        }
        if !self.catalog.blacklist.insert(item.to_string()) {
            return Ok(BlacklistOutcome::AlreadyListed);
        }
        self.blacklist_changed(item, true)?;
        Ok(BlacklistOutcome::Added)
    }

    pub fn blacklist_remove(&mut self, item: &str) -> LootResult<BlacklistOutcome> {
        if !self.registry.contains(item) {
            return Ok(BlacklistOutcome::NotAnItem);
        }
        if !self.catalog.blacklist.remove(item) {
            return Ok(BlacklistOutcome::NotListed);
        }
        self.blacklist_changed(item, false)?;
        Ok(BlacklistOutcome::Removed)
    }

    fn blacklist_changed(&mut self, item: &str, blacklisted: bool) -> LootResult<()> {
        self.store
            .save_document(BLACKLIST_FILE, &self.catalog.blacklist_file())?;
        self.store.append_event(&LootEvent::BlacklistChanged {
            item: item.to_string(),
            blacklisted,
        })?;
        self.schedule_repopulation(false);
        Ok(())
    }

    // ── Backup / restore ───────────────────────────────────────

    pub fn backup_tables(&mut self) -> LootResult<BackupOutcome> {
        let outcome = self.store.backup_file(LOOT_TABLES_FILE)?;
        if outcome == BackupOutcome::Created {
            self.store.append_event(&LootEvent::BackupCreated {
                file: LOOT_TABLES_FILE.to_string(),
            })?;
        }
        Ok(outcome)
    }

    /// Put the backed-up tables back and rebuild from them.
    pub fn restore_tables(&mut self) -> LootResult<RestoreOutcome> {
        let outcome = self.store.restore_file(LOOT_TABLES_FILE)?;
        if outcome == RestoreOutcome::Restored {
            self.reload_from_store()?;
            self.store.append_event(&LootEvent::BackupRestored {
                file: LOOT_TABLES_FILE.to_string(),
            })?;
            self.schedule_repopulation(false);
        }
        Ok(outcome)
    }

    // ── Commands ───────────────────────────────────────────────

    pub fn apply_command(
        &mut self,
        command: LootCommand,
        remote: &dyn RemoteCatalogSource,
    ) -> LootResult<CommandOutcome> {
        let outcome = match command {
            LootCommand::Populate { container_type } => {
                let (container, report) = self.populate_new(&container_type)?;
                CommandOutcome::Populated {
                    report,
                    items: container.items().to_vec(),
                }
            }
            LootCommand::RepopulateAll => CommandOutcome::Scheduled {
                queued: self.schedule_repopulation(true),
            },
            LootCommand::BlacklistAdd { item } => {
                let result = self.blacklist_add(&item)?;
                CommandOutcome::Blacklist { item, result }
            }
            LootCommand::BlacklistRemove { item } => {
                let result = self.blacklist_remove(&item)?;
                CommandOutcome::Blacklist { item, result }
            }
            LootCommand::BlacklistList => CommandOutcome::BlacklistItems {
                items: self.catalog.blacklist.iter().cloned().collect(),
            },
            LootCommand::ImportRemote { catalog_id } => {
                let report = self.import_remote(&catalog_id, remote)?;
                if report.success {
                    self.schedule_repopulation(true);
                }
                CommandOutcome::Imported { report }
            }
            LootCommand::BackupTables => CommandOutcome::Backup {
                result: self.backup_tables()?,
            },
            LootCommand::RestoreTables => CommandOutcome::Restore {
                result: self.restore_tables()?,
            },
            LootCommand::TableEnabled { container_type } => {
                let enabled = self.is_table_enabled(&container_type);
                CommandOutcome::TableEnabled {
                    container_type,
                    enabled,
                }
            }
        };
        Ok(outcome)
    }

    // ── Queries ────────────────────────────────────────────────

    /// Whether the engine manages containers of this type.
    pub fn is_table_enabled(&self, container_type: &str) -> bool {
        self.catalog
            .tables
            .get(container_type)
            .is_some_and(|t| t.enabled)
    }

    pub fn catalog(&self) -> &LootCatalog {
        &self.catalog
    }

    pub fn caches(&self) -> &CatalogCaches {
        &self.caches
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn last_build(&self) -> &BuildReport {
        &self.last_build
    }
}
