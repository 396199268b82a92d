// 🗃️ Classification Cache - records and the storage boundary
// Once a key is cached it is the single source of truth for that item

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::category::Category;

/// How a cache record was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    /// Pinned by an operator; never overwritten by automated sources
    Manual,
    Ai,
    /// Imported keyword/rule data
    Rules,
    /// Last-resort degrade; never persisted by the resolver
    Fallback,
}

impl ItemSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSource::Manual => "manual",
            ItemSource::Ai => "ai",
            ItemSource::Rules => "rules",
            ItemSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(ItemSource::Manual),
            "ai" => Ok(ItemSource::Ai),
            "rules" => Ok(ItemSource::Rules),
            "fallback" => Ok(ItemSource::Fallback),
            other => anyhow::bail!("unknown item source: {}", other),
        }
    }
}

impl ToSql for ItemSource {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ItemSource {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|e: anyhow::Error| FromSqlError::Other(e.into()))
    }
}

/// Trimmed, lowercased item string used as the cache identity
pub fn normalize_item_key(item: &str) -> String {
    item.trim().to_lowercase()
}

/// One row of the item cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub item_key: String,
    pub category: Category,
    pub normalized_name: String,
    pub source: ItemSource,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Storage boundary for the item cache.
///
/// `put` must refuse to replace a record whose source is `manual` and
/// report whether a row was written.
pub trait CacheStore: Send + Sync {
    fn get(&self, item_key: &str) -> Result<Option<ClassificationRecord>>;

    fn put(
        &self,
        item_key: &str,
        category: Category,
        normalized_name: &str,
        source: ItemSource,
    ) -> Result<bool>;
}
