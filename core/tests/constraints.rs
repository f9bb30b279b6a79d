//! Catalog build repairs entries against the item definitions:
//! weapon properties, attachment pools and durability.

use betterloot_core::{
    catalog::LootCatalog,
    config::LootConfig,
    definitions::{HeldEntity, ItemCategory, ItemDefinition, ItemRegistry, ItemSlot},
    entry::{
        AmmoCapacity, AmmoSettings, AttachmentEntry, AttachmentSettings, DurabilityRange,
        EntrySettings, ItemModifications, LootEntry,
    },
    loot_group::LootGroup,
    loot_table::LootTableEntry,
};

const CRATE: &str = "crate_normal";

// ── Test helpers ─────────────────────────────────────────────

fn with_attachments(attachments: AttachmentSettings) -> EntrySettings {
    EntrySettings::new(1, 1).with_modifications(ItemModifications {
        ammo: AmmoSettings::multi("ammo.rifle", 1, 10),
        attachments: Some(attachments),
        max_mods: 0,
    })
}

fn build_single(registry: &ItemRegistry, key: &str, settings: EntrySettings) -> (LootCatalog, usize) {
    let mut catalog = LootCatalog::new().with_table(
        CRATE,
        LootTableEntry::new(1, 1).with_item(key, LootEntry::from_settings(settings)),
    );
    let (_, report) = catalog.build(registry, &LootConfig::default_test());
    (catalog, report.resolution.repairs)
}

fn resolved(catalog: &LootCatalog, key: &str) -> EntrySettings {
    catalog.tables[CRATE].ungrouped_items[key].settings.clone()
}

fn attachment_sum(settings: &EntrySettings) -> f64 {
    settings
        .attachments()
        .expect("attachments present")
        .mods()
        .values()
        .map(|m| m.probability)
        .sum()
}

// ── Attachment capacity ──────────────────────────────────────

#[test]
fn weapon_without_mod_slots_loses_attachments() {
    let registry = ItemRegistry::default_test();
    let settings = with_attachments(
        AttachmentSettings::new(1, 1).with_mod("weapon.mod.silencer", AttachmentEntry::new(100.0)),
    );

    let (catalog, repairs) = build_single(&registry, "flamethrower", settings);
    let entry = resolved(&catalog, "flamethrower");
    let modifications = entry.modifications.expect("weapon keeps its properties");

    assert!(modifications.attachments.is_none(), "flamethrower has no mod slots");
    assert_eq!(modifications.max_mods, 0);
    assert_eq!(modifications.ammo.max_ammo, 100, "flamethrower max ammo comes from its fuel tank");
    assert!(repairs >= 1, "stripping attachments counts as a repair");
}

#[test]
fn liquid_weapon_loses_attachments() {
    let registry = ItemRegistry::default_test();
    let settings = with_attachments(
        AttachmentSettings::new(1, 1).with_mod("weapon.mod.silencer", AttachmentEntry::new(100.0)),
    );

    let (catalog, _) = build_single(&registry, "pistol.water", settings);
    let modifications = resolved(&catalog, "pistol.water")
        .modifications
        .expect("weapon keeps its properties");

    assert!(modifications.attachments.is_none());
    assert_eq!(modifications.ammo.max_ammo, 250, "liquid weapons hold their tank size");
}

#[test]
fn incompatible_attachments_are_stripped_leaving_an_empty_pool() {
    let mut definitions: Vec<ItemDefinition> = ItemRegistry::default_test().iter().cloned().collect();
    for (id, name) in [(45, "weapon.mod.muzzleboost"), (46, "weapon.mod.muzzlebrake"), (47, "weapon.mod.choke")] {
        definitions.push(
            ItemDefinition::new(id, name, ItemCategory::Weapon)
                .held(HeldEntity::WeaponMod)
                .occupies(ItemSlot::BARREL),
        );
    }
    let registry = ItemRegistry::new(definitions);

    let pool = AttachmentSettings::new(1, 2)
        .with_mod("weapon.mod.barrel", AttachmentEntry::new(25.0))
        .with_mod("weapon.mod.muzzleboost", AttachmentEntry::new(25.0))
        .with_mod("weapon.mod.muzzlebrake", AttachmentEntry::new(25.0))
        .with_mod("weapon.mod.choke", AttachmentEntry::new(25.0));

    let (catalog, repairs) = build_single(&registry, "rifle.ak", with_attachments(pool));
    let entry = resolved(&catalog, "rifle.ak");
    let attachments = entry.attachments().expect("rifle keeps an attachment pool");

    assert!(attachments.is_empty(), "rifle has no barrel slot; got {:?}", attachments.mods());
    assert_eq!(repairs, 4, "each stripped attachment is one repair");
}

#[test]
fn unknown_attachments_are_removed() {
    let registry = ItemRegistry::default_test();
    let pool = AttachmentSettings::new(1, 1)
        .with_mod("weapon.mod.silencer", AttachmentEntry::new(40.0))
        .with_mod("weapon.mod.laserbeam", AttachmentEntry::new(40.0));

    let (catalog, _) = build_single(&registry, "rifle.ak", with_attachments(pool));
    let entry = resolved(&catalog, "rifle.ak");
    let mods = entry.attachments().expect("pool kept").mods();

    assert!(mods.contains_key("weapon.mod.silencer"));
    assert!(!mods.contains_key("weapon.mod.laserbeam"));
}

#[test]
fn barrel_attachments_lose_durability_but_stay() {
    let registry = ItemRegistry::default_test();
    let pool = AttachmentSettings::new(1, 1).with_mod(
        "weapon.mod.barrel",
        AttachmentEntry {
            probability: 60.0,
            durability: Some(DurabilityRange::new(40, 80)),
        },
    );

    let (catalog, _) = build_single(&registry, "shotgun.double", with_attachments(pool));
    let entry = resolved(&catalog, "shotgun.double");
    let barrel = &entry.attachments().expect("pool kept").mods()["weapon.mod.barrel"];

    assert_eq!(barrel.probability, 60.0);
    assert!(barrel.durability.is_none(), "barrel mods never carry durability");
}

#[test]
fn max_mods_is_clamped_to_weapon_capacity() {
    let registry = ItemRegistry::default_test();
    let pool = AttachmentSettings::new(1, 10).with_mod("weapon.mod.holosight", AttachmentEntry::new(50.0));

    let (catalog, _) = build_single(&registry, "rifle.ak", with_attachments(pool));
    let entry = resolved(&catalog, "rifle.ak");

    assert_eq!(entry.attachments().expect("pool kept").max_mods, 3);
    assert_eq!(entry.modifications.as_ref().expect("properties").max_mods, 3);
}

// ── Attachment balancing ─────────────────────────────────────

#[test]
fn oversubscribed_attachment_pool_is_balanced_to_100() {
    let registry = ItemRegistry::default_test();
    let pool = AttachmentSettings::new(1, 1)
        .with_mod("weapon.mod.silencer", AttachmentEntry::new(80.0))
        .with_mod("weapon.mod.holosight", AttachmentEntry::new(70.0));

    let (catalog, _) = build_single(&registry, "pistol.revolver", with_attachments(pool));
    let entry = resolved(&catalog, "pistol.revolver");
    let mods = entry.attachments().expect("pool kept").mods();

    assert!((attachment_sum(&entry) - 100.0).abs() < 1e-6, "sum was {}", attachment_sum(&entry));
    assert!(
        mods["weapon.mod.silencer"].probability > mods["weapon.mod.holosight"].probability,
        "balancing keeps the ratio"
    );
}

#[test]
fn undersubscribed_attachment_pool_is_left_alone() {
    let registry = ItemRegistry::default_test();
    let pool = AttachmentSettings::new(1, 1)
        .with_mod("weapon.mod.silencer", AttachmentEntry::new(20.0))
        .with_mod("weapon.mod.holosight", AttachmentEntry::new(30.0));

    let (catalog, _) = build_single(&registry, "pistol.revolver", with_attachments(pool));
    let entry = resolved(&catalog, "pistol.revolver");
    let mods = entry.attachments().expect("pool kept").mods();

    assert_eq!(mods["weapon.mod.silencer"].probability, 20.0);
    assert_eq!(mods["weapon.mod.holosight"].probability, 30.0);
}

// ── Ammo and durability ──────────────────────────────────────

#[test]
fn ammo_mode_follows_magazine_size() {
    let registry = ItemRegistry::default_test();
    let mut catalog = LootCatalog::new().with_table(
        CRATE,
        LootTableEntry::new(1, 1)
            .with_item("bow.hunting", LootEntry::new(1, 1))
            .with_item("rifle.ak", LootEntry::new(1, 1)),
    );
    catalog.build(&registry, &LootConfig::default_test());

    let bow = resolved(&catalog, "bow.hunting").modifications.expect("bow properties");
    assert!(
        matches!(bow.ammo.capacity, AmmoCapacity::SingleUnit { .. }),
        "single-shot bow uses a spawn probability"
    );
    assert_eq!(bow.ammo.max_ammo, 1);

    let rifle = resolved(&catalog, "rifle.ak").modifications.expect("rifle properties");
    assert!(matches!(rifle.ammo.capacity, AmmoCapacity::MultiUnit { .. }));
    assert_eq!(rifle.ammo.max_ammo, 30);
    assert!(rifle.attachments.is_some(), "rifle gains an empty attachment pool");
}

#[test]
fn non_weapon_loses_weapon_properties() {
    let registry = ItemRegistry::default_test();
    let settings = with_attachments(AttachmentSettings::new(1, 1));

    let (catalog, repairs) = build_single(&registry, "rope", settings);

    assert!(resolved(&catalog, "rope").modifications.is_none());
    assert_eq!(repairs, 1);
}

#[test]
fn durability_is_added_and_removed_to_match_definitions() {
    let registry = ItemRegistry::default_test();
    let mut catalog = LootCatalog::new().with_table(
        CRATE,
        LootTableEntry::new(1, 1)
            .with_item("hatchet", LootEntry::new(1, 1))
            .with_item(
                "rope",
                LootEntry::from_settings(EntrySettings::new(1, 1).with_durability(DurabilityRange::new(10, 20))),
            ),
    );
    let (_, report) = catalog.build(&registry, &LootConfig::default_test());

    assert_eq!(
        resolved(&catalog, "hatchet").durability,
        Some(DurabilityRange::default()),
        "items with condition gain a full durability range"
    );
    assert!(resolved(&catalog, "rope").durability.is_none());
    assert!(report.tables_modified);
}

#[test]
fn bonus_items_and_group_entries_are_resolved_too() {
    let registry = ItemRegistry::default_test();
    let mut catalog = LootCatalog::new()
        .with_group(
            "tools",
            LootGroup::new(true)
                .with_item("pickaxe", 100.0, LootEntry::new(1, 1))
                .with_guaranteed("hatchet", EntrySettings::new(1, 1)),
        )
        .with_table(
            CRATE,
            LootTableEntry::new(1, 1).with_item(
                "rope",
                LootEntry::new(1, 1).with_bonus("hatchet", EntrySettings::new(1, 1)),
            ),
        );
    let (_, report) = catalog.build(&registry, &LootConfig::default_test());

    let bonus = &catalog.tables[CRATE].ungrouped_items["rope"].bonus_items["hatchet"];
    assert!(bonus.durability.is_some(), "bonus items are resolved");

    let group = &catalog.groups["tools"];
    assert!(group.items()["pickaxe"].entry.settings.durability.is_some());
    assert!(group.guaranteed_items["hatchet"].durability.is_some());
    assert!(report.groups_modified);
}
