//! Importing a whole catalog from a remote table editor.
//!
//! The import is the one destructive catalog operation: it overwrites
//! LootTables (and LootGroups when the download carries groups). Each
//! overwritten file is backed up first and restored if anything after
//! that point fails.

use crate::{
    catalog::{LootTablesFile, LOOT_GROUPS_FILE, LOOT_TABLES_FILE},
    engine::LootEngine,
    error::{LootError, LootResult, RemoteFetchError},
    event::LootEvent,
    loot_group::LootGroup,
    loot_table::LootTableEntry,
    store::BackupOutcome,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Where remote catalogs come from. Implementations block until the
/// download finishes; hosts that fetch over the network run the import
/// off their main loop.
pub trait RemoteCatalogSource {
    fn fetch(&self, catalog_id: &str) -> Result<String, RemoteFetchError>;
}

/// Serves documents from memory. Used by tests and offline tooling.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemoteSource {
    documents: IndexMap<String, String>,
}

impl InMemoryRemoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, catalog_id: &str, body: &str) -> Self {
        self.documents.insert(catalog_id.to_string(), body.to_string());
        self
    }
}

impl RemoteCatalogSource for InMemoryRemoteSource {
    fn fetch(&self, catalog_id: &str) -> Result<String, RemoteFetchError> {
        self.documents
            .get(catalog_id)
            .cloned()
            .ok_or(RemoteFetchError::NotFound)
    }
}

/// Wire format of a downloaded catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCatalog {
    #[serde(rename = "LootTable")]
    pub tables: IndexMap<String, LootTableEntry>,
    #[serde(rename = "Loot Groups", default)]
    pub groups: Option<IndexMap<String, LootGroup>>,
}

/// User-facing account of an import attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub catalog_id: String,
    pub success: bool,
    pub restored: bool,
    pub messages: Vec<String>,
}

impl ImportReport {
    fn say(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("remote import {}: {message}", self.catalog_id);
        self.messages.push(message);
    }
}

#[derive(Default)]
struct ImportBackups {
    tables: bool,
    groups: bool,
}

impl LootEngine {
    pub fn import_remote(
        &mut self,
        catalog_id: &str,
        source: &dyn RemoteCatalogSource,
    ) -> LootResult<ImportReport> {
        let mut report = ImportReport {
            catalog_id: catalog_id.to_string(),
            ..Default::default()
        };
        report.say(format!("Attempting to download configuration: {catalog_id}"));

        let remote = match source
            .fetch(catalog_id)
            .and_then(|body| {
                serde_json::from_str::<RemoteCatalog>(&body).map_err(|e| RemoteFetchError::Malformed {
                    reason: e.to_string(),
                })
            }) {
            Ok(remote) => remote,
            Err(e) => {
                match &e {
                    RemoteFetchError::NotFound => report.say(
                        "The requested table id was not found. Please ensure youve got the right code.",
                    ),
                    RemoteFetchError::Malformed { .. } => {
                        report.say("Error: Failed to load data. Aborting...")
                    }
                    RemoteFetchError::Transport { reason } => {
                        report.say(format!("Error: Could not download request: {reason}"))
                    }
                }
                self.store.append_event(&LootEvent::RemoteCatalogFailed {
                    catalog_id: catalog_id.to_string(),
                    reason: e.to_string(),
                    restored: false,
                })?;
                return Ok(report);
            }
        };

        let mut backups = ImportBackups::default();
        match self.install_remote(remote, &mut backups, &mut report) {
            Ok(()) => {
                report.success = true;
            }
            Err(e) => {
                report.say("Error loading requested LootTable.");
                log::error!("remote import {catalog_id} failed: {e}");
                if backups.tables || backups.groups {
                    report.say("Restoring backup file.");
                    if backups.tables {
                        self.store.restore_file(LOOT_TABLES_FILE)?;
                    }
                    if backups.groups {
                        self.store.restore_file(LOOT_GROUPS_FILE)?;
                    }
                    self.reload_from_store()?;
                    report.restored = true;
                }
                self.store.append_event(&LootEvent::RemoteCatalogFailed {
                    catalog_id: catalog_id.to_string(),
                    reason: e.to_string(),
                    restored: report.restored,
                })?;
            }
        }
        Ok(report)
    }

    fn install_remote(
        &mut self,
        remote: RemoteCatalog,
        backups: &mut ImportBackups,
        report: &mut ImportReport,
    ) -> LootResult<()> {
        let mut next = self.catalog.clone();
        let table_count = remote.tables.len();
        next.tables = remote.tables;

        backups.tables = self.store.backup_file(LOOT_TABLES_FILE)? == BackupOutcome::Created;
        self.store.save_document(
            LOOT_TABLES_FILE,
            &LootTablesFile {
                tables: next.tables.clone(),
            },
        )?;
        report.say("Loaded new LootTable successfully!");

        let group_count = match remote.groups {
            Some(groups) => {
                let count = groups.len();
                next.groups = groups;
                backups.groups = self.store.backup_file(LOOT_GROUPS_FILE)? == BackupOutcome::Created;
                self.store.save_document(LOOT_GROUPS_FILE, &next.groups_file())?;
                report.say("Loaded new LootGroups.json successfully");
                Some(count)
            }
            None => None,
        };

        if table_count == 0 {
            return Err(LootError::CatalogIntegrity {
                reason: "downloaded catalog contains no loot tables".into(),
            });
        }

        self.replace_catalog(next)?;
        self.store.append_event(&LootEvent::RemoteCatalogImported {
            catalog_id: report.catalog_id.clone(),
            tables: table_count,
            groups: group_count,
        })?;
        Ok(())
    }
}
