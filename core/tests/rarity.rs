//! Rarity-weighted bucket selection for ungrouped items.

use betterloot_core::{
    definitions::ItemRegistry,
    entry::LootEntry,
    rarity::{bucket_weight, BucketDraw, RarityBuckets},
    rng::LootRng,
};
use indexmap::IndexMap;

// ── Test helpers ─────────────────────────────────────────────

fn ungrouped(keys: &[&str]) -> IndexMap<String, LootEntry> {
    keys.iter()
        .map(|k| (k.to_string(), LootEntry::new(1, 1)))
        .collect()
}

fn buckets_for(keys: &[&str]) -> RarityBuckets {
    RarityBuckets::build("crate_normal", &ungrouped(keys), &ItemRegistry::default_test())
}

// ── Weights ──────────────────────────────────────────────────

#[test]
fn class_weights_halve_with_each_rarity_step() {
    let expected = [16_000, 8_000, 4_000, 2_000, 1_000];
    for (rarity, weight) in expected.iter().enumerate() {
        assert_eq!(bucket_weight(rarity, 1), *weight, "rarity {rarity}");
    }
    assert_eq!(bucket_weight(2, 3), 12_000, "weight scales with item count");
    assert_eq!(bucket_weight(0, 0), 0, "empty bucket has no weight");
}

#[test]
fn buckets_group_items_by_definition_rarity() {
    let buckets = buckets_for(&["rope", "cloth", "sewingkit", "techparts", "rope{1}"]);

    assert_eq!(buckets.items.keys(0), &["rope", "cloth", "rope{1}"]);
    assert_eq!(buckets.items.keys(1), &["sewingkit"]);
    assert_eq!(buckets.items.keys(3), &["techparts"]);
    assert_eq!(buckets.items.weight(0), 48_000);
    assert_eq!(buckets.items.weight(2), 0);
    assert_eq!(buckets.items.total_weight(), 48_000 + 8_000 + 2_000);
}

#[test]
fn blueprint_keys_only_fill_blueprint_buckets_when_researchable() {
    let buckets = buckets_for(&["hatchet.blueprint", "rope.blueprint", "unobtainium.blueprint", "rope"]);

    assert_eq!(buckets.blueprints.keys(0), &["hatchet"]);
    assert_eq!(buckets.blueprints.total_weight(), 16_000, "rope cannot be researched");
    assert_eq!(buckets.items.keys(0), &["rope"], "blueprint keys never land in item buckets");
}

#[test]
fn unknown_items_are_skipped() {
    let buckets = buckets_for(&["not.an.item"]);
    assert!(buckets.items.is_empty());
    assert!(buckets.blueprints.is_empty());

    let mut rng = LootRng::seeded(1);
    assert!(buckets.draw(false, &mut rng).is_none());
}

// ── Draws ────────────────────────────────────────────────────

#[test]
fn draws_are_proportional_to_class_weight() {
    const DRAWS: usize = 20_000;
    let buckets = buckets_for(&["rope", "techparts"]);
    let mut rng = LootRng::seeded(0xB0C4);

    let mut rope = 0usize;
    for _ in 0..DRAWS {
        match buckets.draw(false, &mut rng) {
            Some(BucketDraw::Item("rope")) => rope += 1,
            Some(BucketDraw::Item("techparts")) => {}
            other => panic!("unexpected draw {other:?}"),
        }
    }

    // 16000 : 2000
    let ratio = rope as f64 / DRAWS as f64;
    assert!((ratio - 8.0 / 9.0).abs() < 0.01, "rope ratio {ratio:.4}");
}

#[test]
fn empty_classes_are_never_selected() {
    let buckets = buckets_for(&["rope", "techparts"]);
    let mut rng = LootRng::seeded(3);

    for _ in 0..2_000 {
        let drawn = buckets.items.draw(&mut rng).expect("non-empty buckets always draw");
        assert!(drawn == "rope" || drawn == "techparts", "drew {drawn}");
    }
}

#[test]
fn blueprint_draw_without_blueprints_yields_nothing() {
    let buckets = buckets_for(&["rope"]);
    let mut rng = LootRng::seeded(9);

    assert_eq!(buckets.draw(true, &mut rng), None);
    assert_eq!(buckets.draw(false, &mut rng), Some(BucketDraw::Item("rope")));
}

#[test]
fn blueprint_draw_returns_target_shortname() {
    let buckets = buckets_for(&["pickaxe.blueprint"]);
    let mut rng = LootRng::seeded(9);

    assert_eq!(buckets.draw(true, &mut rng), Some(BucketDraw::Blueprint("pickaxe")));
}
