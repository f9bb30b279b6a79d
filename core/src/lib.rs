//! Loot generation engine for persistent-world container spawns.
//!
//! Containers are filled from a catalog of per-container-type loot
//! tables and reusable weighted loot groups. See [`engine::LootEngine`]
//! for the entry points.

pub mod capability;
pub mod catalog;
pub mod command;
pub mod config;
pub mod constraint;
pub mod definitions;
pub mod engine;
pub mod entry;
pub mod error;
pub mod event;
pub mod item;
pub mod loot_group;
pub mod loot_table;
pub mod populator;
pub mod prefab;
pub mod probability;
pub mod rarity;
pub mod remote;
pub mod rng;
pub mod scheduler;
pub mod spawn;
pub mod store;
pub mod types;
