//! The loot catalog: tables, groups and the blacklist, plus the build
//! pass that validates them and derives the sampling caches.
//!
//! RULE: A built catalog is never edited in place while population can
//! see it. The engine builds a new catalog and swaps it in whole.

use crate::{
    capability::WeaponCapabilityIndex,
    config::LootConfig,
    constraint::{ConstraintResolver, ResolutionReport},
    definitions::ItemRegistry,
    loot_group::{LootGroup, EXAMPLE_GROUP},
    loot_table::{GroupImport, LootTableEntry},
    rarity::RarityBuckets,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub const LOOT_TABLES_FILE: &str = "LootTables";
pub const LOOT_GROUPS_FILE: &str = "LootGroups";
pub const BLACKLIST_FILE: &str = "Blacklist";

/// Import probability of the example group reference.
const EXAMPLE_IMPORT_PROBABILITY: f64 = 30.0;

// ── Logical files ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LootTablesFile {
    #[serde(rename = "LootTables", default)]
    pub tables: IndexMap<String, LootTableEntry>,
}

fn default_groups() -> IndexMap<String, LootGroup> {
    let mut groups = IndexMap::new();
    groups.insert(EXAMPLE_GROUP.to_string(), LootGroup::example());
    groups
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootGroupsFile {
    #[serde(rename = "Loot Groups", default = "default_groups")]
    pub groups: IndexMap<String, LootGroup>,
}

impl Default for LootGroupsFile {
    fn default() -> Self {
        Self {
            groups: default_groups(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlacklistFile {
    #[serde(rename = "ItemList", default)]
    pub items: BTreeSet<String>,
}

// ── Catalog ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LootCatalog {
    pub tables: IndexMap<String, LootTableEntry>,
    pub groups: IndexMap<String, LootGroup>,
    pub blacklist: BTreeSet<String>,
}

/// Caches derived from a catalog by [`LootCatalog::build`].
#[derive(Debug, Clone, Default)]
pub struct CatalogCaches {
    pub capabilities: WeaponCapabilityIndex,
    pub buckets: HashMap<String, RarityBuckets>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub tables: usize,
    pub active_tables: usize,
    pub groups: usize,
    pub invalid_group_entries: usize,
    pub balanced_groups: usize,
    pub tables_modified: bool,
    pub groups_modified: bool,
    pub resolution: ResolutionReport,
}

impl LootCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files(tables: LootTablesFile, groups: LootGroupsFile, blacklist: BlacklistFile) -> Self {
        Self {
            tables: tables.tables,
            groups: groups.groups,
            blacklist: blacklist.items,
        }
    }

    pub fn with_table(mut self, container_type: &str, table: LootTableEntry) -> Self {
        self.tables.insert(container_type.to_string(), table);
        self
    }

    pub fn with_group(mut self, name: &str, group: LootGroup) -> Self {
        self.groups.insert(name.to_string(), group);
        self
    }

    pub fn with_blacklisted(mut self, shortname: &str) -> Self {
        self.blacklist.insert(shortname.to_string());
        self
    }

    pub fn tables_file(&self) -> LootTablesFile {
        LootTablesFile {
            tables: self.tables.clone(),
        }
    }

    pub fn groups_file(&self) -> LootGroupsFile {
        LootGroupsFile {
            groups: self.groups.clone(),
        }
    }

    pub fn blacklist_file(&self) -> BlacklistFile {
        BlacklistFile {
            items: self.blacklist.clone(),
        }
    }

    pub fn is_blacklisted(&self, shortname: &str) -> bool {
        self.blacklist.contains(shortname)
    }

    pub fn active_table_count(&self) -> usize {
        self.tables.values().filter(|t| t.enabled).count()
    }

    /// Reference the example group from the first table if that table
    /// imports nothing yet. Returns the table it was added to.
    pub fn add_example_import(&mut self) -> Option<String> {
        let (container_type, table) = self.tables.first_mut()?;
        if !table.imports.is_empty() {
            return None;
        }
        table
            .imports
            .push(GroupImport::new(EXAMPLE_GROUP, EXAMPLE_IMPORT_PROBABILITY).disabled());
        log::info!("added loot group import example to '{container_type}'");
        Some(container_type.clone())
    }

    /// Validate and repair every table and group, then derive the caches
    /// population needs.
    pub fn build(&mut self, registry: &ItemRegistry, config: &LootConfig) -> (CatalogCaches, BuildReport) {
        let mut report = BuildReport::default();

        for (name, group) in self.groups.iter_mut() {
            let validation = group.validate(
                name,
                registry,
                config.loot_groups.enable_probability_balancing,
            );
            report.invalid_group_entries += validation.removed.len();
            if validation.balanced.is_some() {
                report.balanced_groups += 1;
            }
            report.groups_modified |= validation.modified();
        }

        if config.loot_groups.enable_example_group_creation && self.add_example_import().is_some() {
            report.tables_modified = true;
        }

        let capabilities = WeaponCapabilityIndex::build(registry);
        let resolver = ConstraintResolver::new(&capabilities, config.loot.log_attachment_balancing);

        for (name, group) in self.groups.iter_mut() {
            let resolution = resolver.resolve_group(name, group);
            report.groups_modified |= resolution.is_modified();
            report.resolution.merge(resolution);
            group.update_probabilities();
        }

        let mut buckets = HashMap::with_capacity(self.tables.len());
        for (container_type, table) in self.tables.iter_mut() {
            if table.normalize_ranges() {
                log::warn!("{container_type}: inverted item or scrap range normalized");
                report.tables_modified = true;
            }
            let resolution = resolver.resolve_table(container_type, table);
            report.tables_modified |= resolution.is_modified();
            report.resolution.merge(resolution);
            buckets.insert(
                container_type.clone(),
                RarityBuckets::build(container_type, &table.ungrouped_items, registry),
            );
        }

        report.tables = self.tables.len();
        report.active_tables = self.active_table_count();
        report.groups = self.groups.len();

        if config.general.log_updates_on_load {
            log::info!(
                "catalog built: tables={} active={} groups={} entries_scanned={} repairs={}",
                report.tables,
                report.active_tables,
                report.groups,
                report.resolution.scanned,
                report.resolution.repairs
            );
        }

        (CatalogCaches { capabilities, buckets }, report)
    }
}
