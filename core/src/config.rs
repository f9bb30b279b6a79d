//! Engine configuration.
//!
//! The on-disk JSON keeps the key names of the existing configuration
//! file so hand-edited files keep loading. Missing keys take defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Chance that an ungrouped draw produces a blueprint instead of
    /// an item (0.0 to 1.0).
    #[serde(rename = "Blueprint Probability")]
    pub blueprint_probability: f64,
    #[serde(rename = "Log Updates On Load")]
    pub log_updates_on_load: bool,
    /// Container types the engine manages. Discovered from the prefab
    /// manifest when empty.
    #[serde(rename = "Watched Prefabs")]
    pub watched_prefabs: BTreeSet<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            blueprint_probability: 0.11,
            log_updates_on_load: true,
            watched_prefabs: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootSettingsConfig {
    #[serde(rename = "Loot Multiplier")]
    pub loot_multiplier: i32,
    #[serde(rename = "Scrap Multipler")]
    pub scrap_multiplier: i32,
    #[serde(rename = "Allow duplicate items")]
    pub allow_duplicate_items: bool,
    #[serde(rename = "Enable logging for item attachments auto balancing operations")]
    pub log_attachment_balancing: bool,
    #[serde(
        rename = "Always allow duplicate items from bonus items list (if set, will override 'Allow duplicate items option')"
    )]
    pub allow_bonus_item_duplicates: bool,
}

impl Default for LootSettingsConfig {
    fn default() -> Self {
        Self {
            loot_multiplier: 1,
            scrap_multiplier: 1,
            allow_duplicate_items: false,
            log_attachment_balancing: false,
            allow_bonus_item_duplicates: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootGroupsConfig {
    #[serde(rename = "Enable creation of example loot group on load?")]
    pub enable_example_group_creation: bool,
    #[serde(rename = "Enable auto profile probability balancing?")]
    pub enable_probability_balancing: bool,
    #[serde(
        rename = "Always allow duplicate items from loot groups (if true overrides 'Allow duplicate items option')"
    )]
    pub allow_loot_group_duplicates: bool,
}

impl Default for LootGroupsConfig {
    fn default() -> Self {
        Self {
            enable_example_group_creation: true,
            enable_probability_balancing: true,
            allow_loot_group_duplicates: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    #[serde(rename = "General Configuration")]
    pub general: GeneralConfig,
    #[serde(rename = "Loot Configuration")]
    pub loot: LootSettingsConfig,
    #[serde(rename = "Loot Groups Configuration")]
    pub loot_groups: LootGroupsConfig,
}

impl LootConfig {
    /// Load from a JSON file.
    /// In tests, use LootConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: LootConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let p = self.general.blueprint_probability;
        if !(0.0..=1.0).contains(&p) {
            anyhow::bail!("Blueprint Probability must be within 0.0..=1.0, got {p}");
        }
        if self.loot.loot_multiplier < 1 || self.loot.scrap_multiplier < 0 {
            anyhow::bail!(
                "multipliers out of range: loot={} scrap={}",
                self.loot.loot_multiplier,
                self.loot.scrap_multiplier
            );
        }
        Ok(())
    }

    /// Defaults with blueprint draws and example-group creation turned
    /// off, so tests only see the items they configure.
    pub fn default_test() -> Self {
        let mut config = Self::default();
        config.general.blueprint_probability = 0.0;
        config.general.log_updates_on_load = false;
        config.loot_groups.enable_example_group_creation = false;
        config
    }
}
