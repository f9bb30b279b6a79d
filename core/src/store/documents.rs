//! Catalog documents: the LootTables, LootGroups and Blacklist files,
//! each stored as one JSON document with a single backup slot.

use super::{now, CatalogStore};
use crate::error::LootResult;
use rusqlite::{params, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

/// Result of reading a logical file.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentLoad<T> {
    Loaded(T),
    Missing,
    /// Present but unparseable. Carries the parser message.
    Corrupt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupOutcome {
    Created,
    NothingToBackup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreOutcome {
    Restored,
    NoBackup,
}

impl CatalogStore {
    pub fn read_file(&self, name: &str) -> LootResult<Option<String>> {
        let content = self
            .conn
            .query_row(
                "SELECT content FROM catalog_file WHERE name = ?1",
                params![name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(content)
    }

    pub fn write_file(&self, name: &str, content: &str) -> LootResult<()> {
        self.conn.execute(
            "INSERT INTO catalog_file (name, content, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET content = excluded.content,
                                             updated_at = excluded.updated_at",
            params![name, content, now()],
        )?;
        Ok(())
    }

    pub fn load_document<T: DeserializeOwned>(&self, name: &str) -> LootResult<DocumentLoad<T>> {
        let Some(content) = self.read_file(name)? else {
            return Ok(DocumentLoad::Missing);
        };
        Ok(match serde_json::from_str(&content) {
            Ok(value) => DocumentLoad::Loaded(value),
            Err(e) => DocumentLoad::Corrupt(e.to_string()),
        })
    }

    pub fn save_document<T: Serialize>(&self, name: &str, value: &T) -> LootResult<()> {
        let content = serde_json::to_string_pretty(value)?;
        self.write_file(name, &content)
    }

    /// Copy the current file into its backup slot, replacing any older
    /// backup.
    pub fn backup_file(&self, name: &str) -> LootResult<BackupOutcome> {
        let Some(content) = self.read_file(name)? else {
            return Ok(BackupOutcome::NothingToBackup);
        };
        self.conn.execute(
            "INSERT INTO catalog_backup (name, content, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET content = excluded.content,
                                             created_at = excluded.created_at",
            params![name, content, now()],
        )?;
        log::debug!("backed up catalog file '{name}'");
        Ok(BackupOutcome::Created)
    }

    /// Copy the backup back over the file. The backup slot is kept.
    pub fn restore_file(&self, name: &str) -> LootResult<RestoreOutcome> {
        let backup = self
            .conn
            .query_row(
                "SELECT content FROM catalog_backup WHERE name = ?1",
                params![name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        let Some(content) = backup else {
            return Ok(RestoreOutcome::NoBackup);
        };
        self.write_file(name, &content)?;
        log::info!("restored catalog file '{name}' from backup");
        Ok(RestoreOutcome::Restored)
    }

    pub fn has_backup(&self, name: &str) -> LootResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM catalog_backup WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
