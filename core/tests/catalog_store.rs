//! Catalog files in the store: loading, repair, backup and restore,
//! remote import, blacklist commands and the event log.

use betterloot_core::{
    catalog::{LootCatalog, LootTablesFile, BLACKLIST_FILE, LOOT_GROUPS_FILE, LOOT_TABLES_FILE},
    command::{BlacklistOutcome, CommandOutcome, LootCommand},
    config::LootConfig,
    definitions::ItemRegistry,
    engine::LootEngine,
    entry::LootEntry,
    event::LootEvent,
    item::PlacedContainer,
    loot_group::EXAMPLE_GROUP,
    loot_table::LootTableEntry,
    prefab::PrefabRegistry,
    remote::InMemoryRemoteSource,
    store::{BackupOutcome, CatalogStore, DocumentLoad, RestoreOutcome},
};

const TABLES_JSON: &str = r#"{
  "LootTables": {
    "crate_normal": {
      "Is Prefab Enabled?": true,
      "Loot Profiles": [],
      "Guaranteed Items": {},
      "Ungrouped Items": {
        "rope": { "Item Minimum": 1, "Item Maximum": 2, "Bonus Items": {} }
      },
      "Item Settings": {
        "Minimum Amount of Items": 1,
        "Maximum Amount of Items": 1,
        "Minimum Scrap Amount": 0,
        "Maximum Scrap Amount": 0,
        "Max Blueprints": 0
      }
    }
  }
}"#;

const REMOTE_JSON: &str = r#"{
  "LootTable": {
    "loot_barrel": {
      "Ungrouped Items": { "cloth": { "Item Minimum": 3, "Item Maximum": 3 } },
      "Item Settings": { "Minimum Amount of Items": 1, "Maximum Amount of Items": 1 }
    }
  },
  "Loot Groups": {
    "medic": {
      "Enabled?": true,
      "Item List": {
        "bandage": { "Item Probability (1-100)": 100, "Item Amount": { "Item Minimum": 1, "Item Maximum": 1 } }
      }
    }
  }
}"#;

// ── Test helpers ─────────────────────────────────────────────

fn store_with_tables(json: &str) -> CatalogStore {
    let store = CatalogStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.write_file(LOOT_TABLES_FILE, json).expect("write tables");
    store
}

fn build_from(store: CatalogStore) -> LootEngine {
    LootEngine::build(
        LootConfig::default_test(),
        ItemRegistry::default_test(),
        PrefabRegistry::default(),
        store,
        7,
    )
    .expect("engine build")
}

fn single_table(container_type: &str, item: &str) -> LootCatalog {
    LootCatalog::new().with_table(
        container_type,
        LootTableEntry::new(1, 1).with_item(item, LootEntry::new(1, 1)),
    )
}

fn events(engine: &LootEngine, event_type: &str) -> Vec<LootEvent> {
    engine.store().events_of_type(event_type).expect("read events")
}

// ── Loading ──────────────────────────────────────────────────

#[test]
fn missing_files_are_written_with_defaults() {
    let engine = LootEngine::build_test(1).expect("test engine");

    for name in [LOOT_TABLES_FILE, LOOT_GROUPS_FILE, BLACKLIST_FILE] {
        assert!(
            engine.store().read_file(name).expect("read").is_some(),
            "{name} should exist after first load"
        );
    }
    let groups = engine.store().read_file(LOOT_GROUPS_FILE).expect("read").unwrap_or_default();
    assert!(groups.contains(EXAMPLE_GROUP), "default groups file carries the example group");
    assert_eq!(engine.catalog().tables.len(), 0);
}

#[test]
fn persisted_tables_are_loaded_with_original_field_names() {
    let mut engine = build_from(store_with_tables(TABLES_JSON));

    assert!(engine.is_table_enabled("crate_normal"));
    let (container, _) = engine.populate_new("crate_normal").expect("populate");
    let rope = container.count_of("rope");
    assert!((1..=2).contains(&rope), "rope amount {rope} outside 1..=2");
}

#[test]
fn corrupt_file_is_backed_up_and_reset() {
    let engine = build_from(store_with_tables("{ this is not json"));

    assert!(engine.store().has_backup(LOOT_TABLES_FILE).expect("backup query"));
    assert!(engine.catalog().tables.is_empty());
    match engine
        .store()
        .load_document::<LootTablesFile>(LOOT_TABLES_FILE)
        .expect("load")
    {
        DocumentLoad::Loaded(file) => assert!(file.tables.is_empty()),
        other => panic!("tables file should have been reset, got {other:?}"),
    }
}

#[test]
fn replaced_catalog_is_persisted() {
    let mut engine = LootEngine::build_test(2).expect("test engine");
    engine
        .replace_catalog(single_table("crate_tools", "hatchet"))
        .expect("replace");

    let store_json = engine.store().read_file(LOOT_TABLES_FILE).expect("read").unwrap_or_default();
    assert!(store_json.contains("crate_tools"));
    assert!(
        store_json.contains("Item Durability"),
        "repaired durability is written back"
    );
    assert_eq!(events(&engine, "catalog_built").len(), 2, "initial load plus replace");
}

// ── Backup and restore ───────────────────────────────────────

#[test]
fn restore_brings_back_backed_up_tables() {
    let mut engine = LootEngine::build_test(3).expect("test engine");
    engine.replace_catalog(single_table("crate_a", "rope")).expect("install a");
    assert_eq!(engine.backup_tables().expect("backup"), BackupOutcome::Created);

    engine.replace_catalog(single_table("crate_b", "cloth")).expect("install b");
    assert!(engine.is_table_enabled("crate_b"));

    assert_eq!(engine.restore_tables().expect("restore"), RestoreOutcome::Restored);
    assert!(engine.is_table_enabled("crate_a"));
    assert!(!engine.is_table_enabled("crate_b"));
    assert_eq!(events(&engine, "backup_created").len(), 1);
    assert_eq!(events(&engine, "backup_restored").len(), 1);
}

#[test]
fn restore_without_backup_changes_nothing() {
    let mut engine = LootEngine::build_test(4).expect("test engine");
    engine.replace_catalog(single_table("crate_a", "rope")).expect("install");

    assert_eq!(engine.restore_tables().expect("restore"), RestoreOutcome::NoBackup);
    assert!(engine.is_table_enabled("crate_a"));
}

// ── Remote import ────────────────────────────────────────────

#[test]
fn remote_import_installs_tables_and_groups() {
    let mut engine = LootEngine::build_test(5).expect("test engine");
    let source = InMemoryRemoteSource::new().with_document("abc123", REMOTE_JSON);

    let report = engine.import_remote("abc123", &source).expect("import");

    assert!(report.success, "messages: {:?}", report.messages);
    assert!(!report.restored);
    assert!(report.messages.iter().any(|m| m == "Loaded new LootTable successfully!"));
    assert!(report.messages.iter().any(|m| m == "Loaded new LootGroups.json successfully"));
    assert!(engine.is_table_enabled("loot_barrel"));
    assert!(engine.catalog().groups.contains_key("medic"));

    let (container, _) = engine.populate_new("loot_barrel").expect("populate");
    assert_eq!(container.count_of("cloth"), 3);
    assert_eq!(events(&engine, "remote_catalog_imported").len(), 1);
}

#[test]
fn remote_import_of_unknown_id_leaves_catalog_alone() {
    let mut engine = LootEngine::build_test(6).expect("test engine");
    engine.replace_catalog(single_table("crate_a", "rope")).expect("install");

    let report = engine
        .import_remote("missing", &InMemoryRemoteSource::new())
        .expect("import");

    assert!(!report.success);
    assert!(report
        .messages
        .iter()
        .any(|m| m.contains("The requested table id was not found")));
    assert!(engine.is_table_enabled("crate_a"));
    assert_eq!(events(&engine, "remote_catalog_failed").len(), 1);
}

#[test]
fn remote_import_of_malformed_document_aborts() {
    let mut engine = LootEngine::build_test(7).expect("test engine");
    let source = InMemoryRemoteSource::new().with_document("bad", "<html>rate limited</html>");

    let report = engine.import_remote("bad", &source).expect("import");

    assert!(!report.success);
    assert!(report.messages.iter().any(|m| m == "Error: Failed to load data. Aborting..."));
    assert!(!engine.store().has_backup(LOOT_TABLES_FILE).expect("backup query"), "nothing was overwritten");
}

#[test]
fn failed_install_restores_previous_tables() {
    let mut engine = LootEngine::build_test(8).expect("test engine");
    engine.replace_catalog(single_table("crate_a", "rope")).expect("install");
    let source = InMemoryRemoteSource::new().with_document("empty", r#"{ "LootTable": {} }"#);

    let report = engine.import_remote("empty", &source).expect("import");

    assert!(!report.success);
    assert!(report.restored);
    assert!(report.messages.iter().any(|m| m == "Restoring backup file."));
    assert!(engine.is_table_enabled("crate_a"), "previous table is live again");
    let stored = engine.store().read_file(LOOT_TABLES_FILE).expect("read").unwrap_or_default();
    assert!(stored.contains("crate_a"), "previous table is back on disk");
}

// ── Blacklist commands ───────────────────────────────────────

#[test]
fn blacklist_commands_report_outcomes_and_schedule_repopulation() {
    let mut engine = LootEngine::build_test(9).expect("test engine");
    let remote = InMemoryRemoteSource::new();
    let mut world: Vec<PlacedContainer> = Vec::new();
    engine.run_scheduled(&mut world).expect("drain initial task");
    assert_eq!(engine.pending_tasks(), 0);

    assert_eq!(engine.blacklist_add("rope").expect("add"), BlacklistOutcome::Added);
    assert_eq!(engine.blacklist_add("rope").expect("add again"), BlacklistOutcome::AlreadyListed);
    assert_eq!(engine.blacklist_add("nonsense").expect("add unknown"), BlacklistOutcome::NotAnItem);
    assert_eq!(engine.pending_tasks(), 1, "changes queue a single repopulation");

    match engine
        .apply_command(LootCommand::BlacklistList, &remote)
        .expect("list")
    {
        CommandOutcome::BlacklistItems { items } => assert_eq!(items, vec!["rope".to_string()]),
        other => panic!("unexpected outcome {other:?}"),
    }

    let stored = engine.store().read_file(BLACKLIST_FILE).expect("read").unwrap_or_default();
    assert!(stored.contains("rope"), "blacklist persisted: {stored}");

    assert_eq!(engine.blacklist_remove("rope").expect("remove"), BlacklistOutcome::Removed);
    assert_eq!(engine.blacklist_remove("rope").expect("remove again"), BlacklistOutcome::NotListed);
    assert!(engine.blacklist().is_empty());
    assert_eq!(events(&engine, "blacklist_changed").len(), 2);
}

// ── Scheduled repopulation ───────────────────────────────────

#[test]
fn scheduled_repopulation_fills_eligible_containers_once() {
    let mut engine = LootEngine::build_test(10).expect("test engine");
    engine.replace_catalog(single_table("crate_a", "rope")).expect("install");
    let mut world = vec![PlacedContainer::new("crate_a"), PlacedContainer::new("unknown_box")];

    let summary = engine
        .run_scheduled(&mut world)
        .expect("run")
        .expect("initial repopulation is queued at build");

    assert_eq!(summary.populated, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(world[0].container.count_of("rope"), 1);
    assert!(world[1].container.is_empty());

    assert!(engine.run_scheduled(&mut world).expect("second run").is_none());
    assert_eq!(events(&engine, "repopulation_completed").len(), 1);
}

#[test]
fn commands_route_to_engine_operations() {
    let mut engine = LootEngine::build_test(11).expect("test engine");
    engine.replace_catalog(single_table("crate_a", "rope")).expect("install");
    let remote = InMemoryRemoteSource::new();

    match engine
        .apply_command(LootCommand::Populate { container_type: "crate_a".into() }, &remote)
        .expect("populate")
    {
        CommandOutcome::Populated { items, report } => {
            assert_eq!(items.len(), 1);
            assert_eq!(report.filled_slots, 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    match engine
        .apply_command(LootCommand::TableEnabled { container_type: "crate_a".into() }, &remote)
        .expect("query")
    {
        CommandOutcome::TableEnabled { enabled, .. } => assert!(enabled),
        other => panic!("unexpected outcome {other:?}"),
    }

    match engine
        .apply_command(LootCommand::RepopulateAll, &remote)
        .expect("schedule")
    {
        CommandOutcome::Scheduled { queued } => assert!(!queued, "build already queued one"),
        other => panic!("unexpected outcome {other:?}"),
    }
}
