use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::identity::RepositoryIdentity;
use crate::github::ReleaseEntry;

pub const REPOSITORY_RELEASES_TABLE: &str = "repository_releases";

/// Written in place of tag name, tag reference or author when GitHub omits them.
pub const NOT_AVAILABLE: &str = "N/A";

/// A row of the repository releases table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseRow {
    pub row_key: String,
    pub id: u64,
    pub tag_name: String,
    pub tag_reference: String,
    pub target_commitish: Option<String>,
    pub name: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
    pub body: Option<String>,
    pub author: String,
    pub created_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub repository_key: String,
}

impl ReleaseRow {
    pub fn from_entry(identity: &RepositoryIdentity, entry: ReleaseEntry) -> Self {
        let repository_key = identity.repository_key();
        let tag_reference = match &entry.tag_name {
            Some(tag) => format!("{repository_key}/commits/{tag}"),
            None => NOT_AVAILABLE.to_string(),
        };

        ReleaseRow {
            row_key: format!("{repository_key}/releases/{}", entry.id),
            id: entry.id,
            tag_name: entry.tag_name.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            tag_reference,
            target_commitish: entry.target_commitish,
            name: entry.name,
            draft: entry.draft,
            prerelease: entry.prerelease,
            body: entry.body,
            author: entry
                .author
                .and_then(|a| a.login)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            created_at: entry.created_at,
            published_at: entry.published_at,
            repository_key,
        }
    }
}

/// Destination of projected rows.
pub trait TableStore {
    /// Upserts `rows` by `row_key`; rows not in the batch are left alone.
    fn replace_rows(&mut self, table_id: &str, rows: Vec<ReleaseRow>);
}

#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    tables: HashMap<String, BTreeMap<String, ReleaseRow>>,
    writes: usize,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table_id: &str) -> Vec<&ReleaseRow> {
        self.tables
            .get(table_id)
            .map(|t| t.values().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn row(&self, table_id: &str, row_key: &str) -> Option<&ReleaseRow> {
        self.tables.get(table_id)?.get(row_key)
    }

    #[cfg(test)]
    pub fn len(&self, table_id: &str) -> usize {
        self.tables.get(table_id).map_or(0, BTreeMap::len)
    }

    /// Number of batches written so far, across all tables.
    #[cfg(test)]
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl TableStore for InMemoryTableStore {
    fn replace_rows(&mut self, table_id: &str, rows: Vec<ReleaseRow>) {
        let count = rows.len();
        let table = self.tables.entry(table_id.to_string()).or_default();
        for row in rows {
            table.insert(row.row_key.clone(), row);
        }
        self.writes += 1;
        tracing::debug!(
            "Replaced {} rows in {} (batch {}, {} rows total)",
            count,
            table_id,
            self.writes,
            table.len()
        );
    }
}
