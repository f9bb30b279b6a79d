//! Container prefabs and default loot table derivation.
//!
//! When a watched container type has no table yet, one is derived from
//! the prefab's vanilla spawn definition so the engine starts out
//! mirroring the stock loot.

use crate::{
    definitions::ItemRegistry,
    entry::{LootEntry, BLUEPRINT_SUFFIX},
    loot_table::LootTableEntry,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Containers that only ever spawn from events keep their derived table
/// disabled.
const EVENT_CRATE_FRAGMENTS: [&str; 2] = ["bradley_crate", "heli_crate"];

/// A manifest entry is watched only if it contains one of these...
const WATCH_FRAGMENTS: [&str; 11] = [
    "resource/loot",
    "misc/supply drop/supply_drop",
    "/npc/m2bradley/bradley_crate",
    "/npc/patrol helicopter/heli_crate",
    "/deployable/chinooklockedcrate/chinooklocked",
    "/deployable/chinooklockedcrate/codelocked",
    "prefabs/radtown",
    "props/roadsigns",
    "humannpc/scientist",
    "humannpc/tunneldweller",
    "humannpc/underwaterdweller",
];

/// ...and none of these.
const IGNORE_FRAGMENTS: [&str; 6] = [
    "radtown/ore",
    "static",
    "/spawners",
    "radtown/desk",
    "radtown/loot_component_test",
    "water_puddles_border_fix",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnAmount {
    pub shortname: String,
    pub amount: f32,
    #[serde(default)]
    pub max_amount: f32,
}

/// A vanilla spawn definition: either nested sub-spawns or a flat item
/// list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LootSpawn {
    #[serde(default)]
    pub sub_spawns: Vec<LootSpawn>,
    #[serde(default)]
    pub items: Vec<SpawnAmount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnSlot {
    pub number_to_spawn: i32,
    pub definition: LootSpawn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrefabKind {
    Npc {
        #[serde(default)]
        spawn_slots: Vec<SpawnSlot>,
    },
    LootContainer {
        #[serde(default)]
        scrap_amount: i32,
        #[serde(default)]
        max_definitions_to_spawn: i32,
        #[serde(default)]
        spawn_slots: Vec<SpawnSlot>,
        #[serde(default)]
        loot_definition: Option<LootSpawn>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabDefinition {
    pub name: String,
    #[serde(flatten)]
    pub kind: PrefabKind,
}

#[derive(Debug, Clone, Default)]
pub struct PrefabRegistry {
    prefabs: IndexMap<String, PrefabDefinition>,
}

impl PrefabRegistry {
    pub fn new<I>(prefabs: I) -> Self
    where
        I: IntoIterator<Item = PrefabDefinition>,
    {
        Self {
            prefabs: prefabs.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let prefabs: Vec<PrefabDefinition> = serde_json::from_str(json)?;
        Ok(Self::new(prefabs))
    }

    pub fn find(&self, name: &str) -> Option<&PrefabDefinition> {
        self.prefabs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.prefabs.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }
}

/// Pick the manifest names worth watching.
pub fn discover_watched<'a, I>(manifest: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    manifest
        .into_iter()
        .filter(|name| WATCH_FRAGMENTS.iter().any(|f| name.contains(f)))
        .filter(|name| !IGNORE_FRAGMENTS.iter().any(|f| name.contains(f)))
        .map(str::to_string)
        .collect()
}

fn collect_spawn(spawn: &LootSpawn, registry: &ItemRegistry, items: &mut IndexMap<String, LootEntry>) {
    if !spawn.sub_spawns.is_empty() {
        for sub in &spawn.sub_spawns {
            collect_spawn(sub, registry, items);
        }
        return;
    }
    for amount in &spawn.items {
        let Some(def) = registry.find(&amount.shortname) else {
            log::warn!("spawn definition lists unknown item '{}'", amount.shortname);
            continue;
        };
        let key = if def.spawn_as_blueprint {
            format!("{}{BLUEPRINT_SUFFIX}", def.shortname)
        } else {
            def.shortname.clone()
        };
        let min = amount.amount as i32;
        let max = if amount.max_amount > amount.amount {
            amount.max_amount as i32
        } else {
            min
        };
        items.entry(key).or_insert_with(|| LootEntry::new(min, max));
    }
}

/// Derive a table from a prefab's stock spawn setup.
pub fn derive_table(prefab: &PrefabDefinition, registry: &ItemRegistry) -> LootTableEntry {
    let enabled = !EVENT_CRATE_FRAGMENTS.iter().any(|f| prefab.name.contains(f));
    let mut items = IndexMap::new();

    let mut table = match &prefab.kind {
        PrefabKind::Npc { spawn_slots } => {
            let mut slot_count = 0;
            for slot in spawn_slots {
                collect_spawn(&slot.definition, registry, &mut items);
                slot_count += slot.number_to_spawn;
            }
            LootTableEntry::new(slot_count, slot_count)
        }
        PrefabKind::LootContainer {
            scrap_amount,
            max_definitions_to_spawn,
            spawn_slots,
            loot_definition,
        } => {
            let slots = if spawn_slots.is_empty() {
                *max_definitions_to_spawn
            } else {
                spawn_slots.iter().map(|s| s.number_to_spawn).sum()
            };
            match loot_definition {
                Some(definition) => collect_spawn(definition, registry, &mut items),
                None => {
                    for slot in spawn_slots {
                        collect_spawn(&slot.definition, registry, &mut items);
                    }
                }
            }
            LootTableEntry::new(slots, slots)
                .with_scrap(*scrap_amount, *scrap_amount)
                .with_max_blueprints(1)
        }
    };

    table.enabled = enabled;
    table.ungrouped_items = items;
    table
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivationReport {
    pub added: Vec<String>,
    /// Watched names with no prefab behind them. Dropped from the watch
    /// list.
    pub unknown: Vec<String>,
}

/// Add a derived table for every watched type that has none.
pub fn derive_missing_tables(
    watched: &mut BTreeSet<String>,
    prefabs: &PrefabRegistry,
    registry: &ItemRegistry,
    tables: &mut IndexMap<String, LootTableEntry>,
) -> DerivationReport {
    let mut report = DerivationReport::default();
    for name in watched.iter() {
        if tables.contains_key(name) {
            continue;
        }
        match prefabs.find(name) {
            Some(prefab) => {
                tables.insert(name.clone(), derive_table(prefab, registry));
                report.added.push(name.clone());
            }
            None => report.unknown.push(name.clone()),
        }
    }
    if !report.unknown.is_empty() {
        watched.retain(|name| !report.unknown.contains(name));
        log::info!(
            "removed {} invalid or unloaded prefabs from the watch list: {}",
            report.unknown.len(),
            report.unknown.join(", ")
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crate_prefab(name: &str) -> PrefabDefinition {
        PrefabDefinition {
            name: name.into(),
            kind: PrefabKind::LootContainer {
                scrap_amount: 5,
                max_definitions_to_spawn: 0,
                spawn_slots: vec![SpawnSlot {
                    number_to_spawn: 3,
                    definition: LootSpawn {
                        sub_spawns: vec![LootSpawn {
                            sub_spawns: vec![],
                            items: vec![
                                SpawnAmount { shortname: "rope".into(), amount: 1.0, max_amount: 3.0 },
                                SpawnAmount { shortname: "bandage".into(), amount: 2.0, max_amount: 0.0 },
                            ],
                        }],
                        items: vec![],
                    },
                }],
                loot_definition: None,
            },
        }
    }

    #[test]
    fn container_prefab_derives_slots_scrap_and_items() {
        let registry = ItemRegistry::default_test();
        let table = derive_table(&crate_prefab("assets/bundled/prefabs/radtown/crate_normal.prefab"), &registry);
        assert!(table.enabled);
        assert_eq!((table.settings.min_items, table.settings.max_items), (3, 3));
        assert_eq!((table.settings.min_scrap, table.settings.max_scrap), (5, 5));
        assert_eq!(table.settings.max_blueprints, 1);
        let rope = &table.ungrouped_items["rope"];
        assert_eq!((rope.settings.min, rope.settings.max), (1, 3));
        let bandage = &table.ungrouped_items["bandage"];
        assert_eq!((bandage.settings.min, bandage.settings.max), (2, 2));
    }

    #[test]
    fn event_crates_start_disabled() {
        let registry = ItemRegistry::default_test();
        let table = derive_table(&crate_prefab("assets/prefabs/npc/m2bradley/bradley_crate.prefab"), &registry);
        assert!(!table.enabled);
    }

    #[test]
    fn discovery_applies_watch_and_ignore_fragments() {
        let watched = discover_watched([
            "assets/bundled/prefabs/radtown/crate_normal.prefab",
            "assets/bundled/prefabs/radtown/ore_stone.prefab",
            "assets/bundled/prefabs/radtown/crate_static.prefab",
            "assets/bundled/prefabs/autospawn/resource/loot/loot-barrel-1.prefab",
            "assets/prefabs/misc/junk/junkpile.prefab",
        ]);
        assert_eq!(watched.len(), 2);
        assert!(watched.contains("assets/bundled/prefabs/radtown/crate_normal.prefab"));
    }
}
