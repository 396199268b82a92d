// 📄 Cache CSV - bulk import/export of the item cache and layout backup
//
// Cache columns: item, category, normalized_name, source
// Imports go through cache_item, so manual rows are never replaced.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cache::ItemSource;
use crate::category::{short_name, Category};
use crate::db::{cache_item, list_cached_items, list_layout_entries};

#[derive(Debug, Deserialize)]
struct ImportRow {
    #[serde(default)]
    item: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    normalized_name: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    item: &'a str,
    category: &'a str,
    normalized_name: &'a str,
    source: &'a str,
    updated_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

pub fn import_cache_csv(conn: &Connection, csv_path: &Path) -> Result<ImportSummary> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    let mut summary = ImportSummary::default();

    for (index, result) in rdr.deserialize::<ImportRow>().enumerate() {
        let line = index + 2; // header is line 1
        let row = result.with_context(|| format!("Failed to read CSV row {}", line))?;

        if row.item.is_empty() {
            summary.skipped += 1;
            continue;
        }

        let category: Category = match row.category.parse() {
            Ok(category) => category,
            Err(_) => {
                log::warn!("row {}: skipping '{}' with unknown category '{}'", line, row.item, row.category);
                summary.skipped += 1;
                continue;
            }
        };

        let source = match row.source.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => match raw.parse::<ItemSource>() {
                Ok(source) => source,
                Err(e) => {
                    log::warn!("row {}: skipping '{}': {}", line, row.item, e);
                    summary.skipped += 1;
                    continue;
                }
            },
            None => ItemSource::Rules,
        };

        let normalized_name = if row.normalized_name.is_empty() {
            short_name(&row.item)
        } else {
            row.normalized_name
        };

        if cache_item(conn, &row.item, category, &normalized_name, source)? {
            summary.imported += 1;
        } else {
            summary.skipped += 1;
        }
    }

    log::info!(
        "imported {} cache rows from {:?} ({} skipped)",
        summary.imported,
        csv_path,
        summary.skipped
    );

    Ok(summary)
}

/// Write every cache row, ordered by item key. Returns the row count.
pub fn export_cache_csv(conn: &Connection, csv_path: &Path) -> Result<usize> {
    let records = list_cached_items(conn)?;

    let mut wtr = csv::Writer::from_path(csv_path)
        .with_context(|| format!("Failed to create CSV file: {:?}", csv_path))?;

    for record in &records {
        wtr.serialize(ExportRow {
            item: &record.item_key,
            category: record.category.as_str(),
            normalized_name: &record.normalized_name,
            source: record.source.as_str(),
            updated_at: record
                .updated_at
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default(),
        })?;
    }

    wtr.flush().context("Failed to flush CSV file")?;

    Ok(records.len())
}

/// Write every layout row (one line per zone category). Returns the row count.
pub fn export_layouts_csv(conn: &Connection, csv_path: &Path) -> Result<usize> {
    let entries = list_layout_entries(conn)?;

    let mut wtr = csv::Writer::from_path(csv_path)
        .with_context(|| format!("Failed to create CSV file: {:?}", csv_path))?;

    for entry in &entries {
        wtr.serialize(entry)?;
    }

    wtr.flush().context("Failed to flush CSV file")?;

    log::info!("exported {} layout rows to {:?}", entries.len(), csv_path);
    Ok(entries.len())
}
