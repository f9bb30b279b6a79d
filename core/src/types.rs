//! Shared primitive types used across the loot engine.

/// Item shortname as written in a table, possibly carrying a `{n}` tag.
pub type ItemKey = String;

/// Container-type key (the prefab path of a crate, barrel or corpse).
pub type ContainerType = String;

/// Numeric item definition id.
pub type ItemId = i32;

/// Workshop skin id. Zero is the default skin.
pub type SkinId = u64;

/// Number of rarity classes. Class 0 is the most common.
pub const RARITY_CLASSES: usize = 5;

/// Scheduler tick. One tick is one host frame.
pub type Tick = u64;
