use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cache::{normalize_item_key, CacheStore, ClassificationRecord, ItemSource};
use crate::category::Category;
use crate::layout::{LayoutStore, StoreDetails, StoreLayout, StoreRegistration, Zone};

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Item cache (normalized item key → classification)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS item_cache (
            item TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            normalized_name TEXT NOT NULL,
            source TEXT NOT NULL,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Store → Location → Zone → Category
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS stores (
            store_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            chain TEXT,
            UNIQUE(name)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS store_locations (
            location_id INTEGER PRIMARY KEY AUTOINCREMENT,
            store_id INTEGER NOT NULL,
            city TEXT,
            state TEXT,
            postal_code TEXT,
            FOREIGN KEY(store_id) REFERENCES stores(store_id),
            UNIQUE(store_id, postal_code)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS store_zones (
            zone_id INTEGER PRIMARY KEY AUTOINCREMENT,
            location_id INTEGER NOT NULL,
            zone_name TEXT NOT NULL,
            zone_order INTEGER NOT NULL,
            FOREIGN KEY(location_id) REFERENCES store_locations(location_id),
            UNIQUE(location_id, zone_order)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS zone_categories (
            zone_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            PRIMARY KEY (zone_id, category),
            FOREIGN KEY(zone_id) REFERENCES store_zones(zone_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_locations_store ON store_locations(store_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_zones_location ON store_zones(location_id, zone_order)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ITEM CACHE
// ============================================================================

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ClassificationRecord> {
    Ok(ClassificationRecord {
        item_key: row.get(0)?,
        category: row.get(1)?,
        normalized_name: row.get(2)?,
        source: row.get(3)?,
        created_at: parse_timestamp(row.get(4)?),
        updated_at: parse_timestamp(row.get(5)?),
    })
}

pub fn get_cached_item(conn: &Connection, item_key: &str) -> Result<Option<ClassificationRecord>> {
    let record = conn
        .query_row(
            "SELECT item, category, normalized_name, source, created_at, updated_at
             FROM item_cache
             WHERE item = ?1",
            [item_key],
            record_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to read cache entry for '{}'", item_key))?;

    Ok(record)
}

/// Upsert a cache entry unless the existing one is a manual override.
/// Returns whether a row was written.
pub fn cache_item(
    conn: &Connection,
    item: &str,
    category: Category,
    normalized_name: &str,
    source: ItemSource,
) -> Result<bool> {
    let now = Utc::now().to_rfc3339();

    let changed = conn
        .execute(
            "INSERT INTO item_cache (item, category, normalized_name, source, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(item) DO UPDATE SET
                category = excluded.category,
                normalized_name = excluded.normalized_name,
                source = excluded.source,
                updated_at = excluded.updated_at
             WHERE item_cache.source != 'manual'",
            params![normalize_item_key(item), category, normalized_name, source, now],
        )
        .context("Failed to write cache entry")?;

    Ok(changed > 0)
}

/// Pin an item to a category; replaces any existing record, manual included
pub fn override_item(
    conn: &Connection,
    item: &str,
    category: Category,
    normalized_name: &str,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO item_cache (item, category, normalized_name, source, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(item) DO UPDATE SET
            category = excluded.category,
            normalized_name = excluded.normalized_name,
            source = excluded.source,
            updated_at = excluded.updated_at",
        params![normalize_item_key(item), category, normalized_name, ItemSource::Manual, now],
    )
    .context("Failed to write manual override")?;

    Ok(())
}

pub fn list_cached_items(conn: &Connection) -> Result<Vec<ClassificationRecord>> {
    let mut stmt = conn.prepare(
        "SELECT item, category, normalized_name, source, created_at, updated_at
         FROM item_cache
         ORDER BY item ASC",
    )?;

    let records = stmt
        .query_map([], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn count_cached_items(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM item_cache", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// STORES & LAYOUTS
// ============================================================================

fn details_from_row(row: &Row<'_>) -> rusqlite::Result<StoreDetails> {
    Ok(StoreDetails {
        store_id: row.get(0)?,
        name: row.get(1)?,
        chain: row.get(2)?,
        postal_code: row.get(3)?,
        location_id: row.get(4)?,
    })
}

/// Resolve a store name to one location; lowest location_id when no postal code
pub fn find_store(
    conn: &Connection,
    store_name: &str,
    postal_code: Option<&str>,
) -> Result<Option<StoreDetails>> {
    let details = match postal_code {
        Some(code) => conn
            .query_row(
                "SELECT s.store_id, s.name, s.chain, sl.postal_code, sl.location_id
                 FROM stores s
                 JOIN store_locations sl ON s.store_id = sl.store_id
                 WHERE s.name = ?1 AND sl.postal_code = ?2
                 ORDER BY sl.location_id ASC
                 LIMIT 1",
                params![store_name, code],
                details_from_row,
            )
            .optional()?,
        None => conn
            .query_row(
                "SELECT s.store_id, s.name, s.chain, sl.postal_code, sl.location_id
                 FROM stores s
                 LEFT JOIN store_locations sl ON s.store_id = sl.store_id
                 WHERE s.name = ?1
                 ORDER BY sl.location_id ASC
                 LIMIT 1",
                params![store_name],
                details_from_row,
            )
            .optional()?,
    };

    Ok(details)
}

pub fn list_stores(conn: &Connection) -> Result<Vec<StoreDetails>> {
    let mut stmt = conn.prepare(
        "SELECT s.store_id, s.name, s.chain, sl.postal_code, sl.location_id
         FROM stores s
         LEFT JOIN store_locations sl ON s.store_id = sl.store_id
         ORDER BY s.name ASC, sl.location_id ASC",
    )?;

    let stores = stmt
        .query_map([], details_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(stores)
}

/// One category of one zone, flattened with its store and location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutEntry {
    pub store_name: String,
    pub chain: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub zone_order: i64,
    pub zone_name: String,
    pub category: String,
}

/// Every registered layout row, ordered by store, location, zone, category
pub fn list_layout_entries(conn: &Connection) -> Result<Vec<LayoutEntry>> {
    let mut stmt = conn.prepare(
        "SELECT s.name, s.chain, sl.city, sl.state, sl.postal_code,
                sz.zone_order, sz.zone_name, zc.category
         FROM stores s
         JOIN store_locations sl ON s.store_id = sl.store_id
         JOIN store_zones sz ON sl.location_id = sz.location_id
         JOIN zone_categories zc ON sz.zone_id = zc.zone_id
         ORDER BY s.name ASC, sl.location_id ASC, sz.zone_order ASC, zc.rowid ASC",
    )?;

    let entries = stmt
        .query_map([], |row| {
            Ok(LayoutEntry {
                store_name: row.get(0)?,
                chain: row.get(1)?,
                city: row.get(2)?,
                state: row.get(3)?,
                postal_code: row.get(4)?,
                zone_order: row.get(5)?,
                zone_name: row.get(6)?,
                category: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Zones in order; categories in registration order within each zone
pub fn get_location_layout(conn: &Connection, location_id: i64) -> Result<StoreLayout> {
    let mut stmt = conn.prepare(
        "SELECT sz.zone_order, sz.zone_name, zc.category
         FROM store_zones sz
         JOIN zone_categories zc ON sz.zone_id = zc.zone_id
         WHERE sz.location_id = ?1
         ORDER BY sz.zone_order ASC, zc.rowid ASC",
    )?;

    let rows = stmt
        .query_map([location_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut zones: Vec<(i64, Zone)> = Vec::new();
    for (order, zone_name, category) in rows {
        match zones.last_mut() {
            Some((last_order, zone)) if *last_order == order => zone.categories.push(category),
            _ => zones.push((
                order,
                Zone {
                    name: zone_name,
                    categories: vec![category],
                },
            )),
        }
    }

    Ok(StoreLayout::new(zones.into_iter().map(|(_, zone)| zone).collect()))
}

/// Layout of the store's first registered location
pub fn get_store_layout(conn: &Connection, store_id: i64) -> Result<StoreLayout> {
    let location_id: Option<i64> = conn
        .query_row(
            "SELECT location_id FROM store_locations
             WHERE store_id = ?1
             ORDER BY location_id ASC
             LIMIT 1",
            [store_id],
            |row| row.get(0),
        )
        .optional()?;

    match location_id {
        Some(id) => get_location_layout(conn, id),
        None => Ok(StoreLayout::default()),
    }
}

/// Get-or-create store and location, then replace the location's zones
/// (1-based order) and their categories. Runs in a single transaction.
pub fn register_store_layout(conn: &mut Connection, reg: &StoreRegistration) -> Result<StoreDetails> {
    reg.validate()?;

    let tx = conn.transaction()?;

    tx.execute(
        "INSERT OR IGNORE INTO stores (name, chain) VALUES (?1, ?2)",
        params![reg.name, reg.chain],
    )?;
    let store_id: i64 = tx.query_row(
        "SELECT store_id FROM stores WHERE name = ?1",
        [&reg.name],
        |row| row.get(0),
    )?;

    // UNIQUE(store_id, postal_code) does not catch NULL postal codes, so
    // look the location up with IS before creating it
    let existing: Option<i64> = tx
        .query_row(
            "SELECT location_id FROM store_locations
             WHERE store_id = ?1 AND postal_code IS ?2
             ORDER BY location_id ASC
             LIMIT 1",
            params![store_id, reg.postal_code],
            |row| row.get(0),
        )
        .optional()?;

    let location_id = match existing {
        Some(location_id) => {
            tx.execute(
                "UPDATE store_locations SET city = ?2, state = ?3 WHERE location_id = ?1",
                params![location_id, reg.city, reg.state],
            )?;
            // Re-registration replaces the whole layout
            tx.execute(
                "DELETE FROM zone_categories
                 WHERE zone_id IN (SELECT zone_id FROM store_zones WHERE location_id = ?1)",
                [location_id],
            )?;
            tx.execute("DELETE FROM store_zones WHERE location_id = ?1", [location_id])?;
            location_id
        }
        None => {
            tx.execute(
                "INSERT INTO store_locations (store_id, city, state, postal_code)
                 VALUES (?1, ?2, ?3, ?4)",
                params![store_id, reg.city, reg.state, reg.postal_code],
            )?;
            tx.last_insert_rowid()
        }
    };

    for (index, zone) in reg.zones.iter().enumerate() {
        let order = index as i64 + 1;

        tx.execute(
            "INSERT INTO store_zones (location_id, zone_name, zone_order)
             VALUES (?1, ?2, ?3)",
            params![location_id, zone.name, order],
        )?;
        let zone_id = tx.last_insert_rowid();

        for category in &zone.categories {
            tx.execute(
                "INSERT OR IGNORE INTO zone_categories (zone_id, category) VALUES (?1, ?2)",
                params![zone_id, category],
            )?;
        }
    }

    tx.commit().context("Failed to commit store layout")?;

    log::info!(
        "registered layout for '{}' (store_id {}, location_id {}, {} zones)",
        reg.name,
        store_id,
        location_id,
        reg.zones.len()
    );

    Ok(StoreDetails {
        store_id,
        name: reg.name.clone(),
        chain: reg.chain.clone(),
        postal_code: reg.postal_code.clone(),
        location_id: Some(location_id),
    })
}

// ============================================================================
// SHARED HANDLE
// ============================================================================

/// Thread-safe handle over one SQLite connection.
/// Implements both storage boundaries used by the organizer.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database: {:?}", path.as_ref()))?;
        Database::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Database::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection; a poisoned lock still guards a usable connection
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn override_item(&self, item: &str, category: Category, normalized_name: &str) -> Result<()> {
        override_item(&self.lock(), item, category, normalized_name)
    }

    pub fn register_layout(&self, reg: &StoreRegistration) -> Result<StoreDetails> {
        register_store_layout(&mut self.lock(), reg)
    }

    pub fn list_stores(&self) -> Result<Vec<StoreDetails>> {
        list_stores(&self.lock())
    }
}

impl CacheStore for Database {
    fn get(&self, item_key: &str) -> Result<Option<ClassificationRecord>> {
        get_cached_item(&self.lock(), item_key)
    }

    fn put(
        &self,
        item_key: &str,
        category: Category,
        normalized_name: &str,
        source: ItemSource,
    ) -> Result<bool> {
        cache_item(&self.lock(), item_key, category, normalized_name, source)
    }
}

impl LayoutStore for Database {
    fn find_store(&self, name: &str, postal_code: Option<&str>) -> Result<Option<StoreDetails>> {
        find_store(&self.lock(), name, postal_code)
    }

    fn store_layout(&self, store_id: i64) -> Result<StoreLayout> {
        get_store_layout(&self.lock(), store_id)
    }

    fn location_layout(&self, location_id: i64) -> Result<StoreLayout> {
        get_location_layout(&self.lock(), location_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registration(postal_code: &str) -> StoreRegistration {
        StoreRegistration {
            name: "Wegmans".to_string(),
            chain: Some("Wegmans".to_string()),
            city: Some("Parsippany".to_string()),
            state: Some("NJ".to_string()),
            postal_code: Some(postal_code.to_string()),
            zones: vec![
                Zone::new("Produce", &["Produce"]),
                Zone::new("Meat & Seafood", &["Meat", "Seafood", "Deli"]),
                Zone::new("Dairy", &["Dairy"]),
            ],
        }
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();
        assert_eq!(count_cached_items(&conn).unwrap(), 0);
    }

    #[test]
    fn test_cache_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        assert!(cache_item(&conn, "  Greek Yogurt ", Category::Dairy, "Greek Yogurt", ItemSource::Ai).unwrap());

        let record = get_cached_item(&conn, "greek yogurt").unwrap().unwrap();
        assert_eq!(record.category, Category::Dairy);
        assert_eq!(record.normalized_name, "Greek Yogurt");
        assert_eq!(record.source, ItemSource::Ai);
        assert!(record.created_at.is_some());
        assert!(get_cached_item(&conn, "milk").unwrap().is_none());
    }

    #[test]
    fn test_cache_item_updates_non_manual() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        cache_item(&conn, "oat milk", Category::Beverages, "Oat Milk", ItemSource::Rules).unwrap();
        assert!(cache_item(&conn, "oat milk", Category::Dairy, "Oat Milk", ItemSource::Ai).unwrap());

        let record = get_cached_item(&conn, "oat milk").unwrap().unwrap();
        assert_eq!(record.category, Category::Dairy);
        assert_eq!(record.source, ItemSource::Ai);
    }

    #[test]
    fn test_manual_override_is_not_overwritten() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        override_item(&conn, "Tofu", Category::Produce, "Tofu").unwrap();
        let written = cache_item(&conn, "tofu", Category::Pantry, "Tofu", ItemSource::Ai).unwrap();

        assert!(!written);
        let record = get_cached_item(&conn, "tofu").unwrap().unwrap();
        assert_eq!(record.category, Category::Produce);
        assert_eq!(record.source, ItemSource::Manual);
    }

    #[test]
    fn test_override_replaces_manual() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        override_item(&conn, "tofu", Category::Produce, "Tofu").unwrap();
        override_item(&conn, "tofu", Category::Pantry, "Firm Tofu").unwrap();

        let record = get_cached_item(&conn, "tofu").unwrap().unwrap();
        assert_eq!(record.category, Category::Pantry);
        assert_eq!(record.normalized_name, "Firm Tofu");
        assert_eq!(count_cached_items(&conn).unwrap(), 1);
    }

    #[test]
    fn test_register_and_read_layout() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let details = register_store_layout(&mut conn, &sample_registration("07054")).unwrap();
        let layout = get_store_layout(&conn, details.store_id).unwrap();

        assert_eq!(layout.zones.len(), 3);
        assert_eq!(layout.zones[1].name, "Meat & Seafood");
        assert_eq!(layout.zones[1].categories, vec!["Meat", "Seafood", "Deli"]);
        assert_eq!(layout.flatten(), vec!["Produce", "Meat", "Seafood", "Deli", "Dairy"]);
    }

    #[test]
    fn test_register_twice_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let first = register_store_layout(&mut conn, &sample_registration("07054")).unwrap();
        let second = register_store_layout(&mut conn, &sample_registration("07054")).unwrap();

        assert_eq!(first, second);
        assert_eq!(get_location_layout(&conn, first.location_id.unwrap()).unwrap().zones.len(), 3);
    }

    #[test]
    fn test_reregistration_replaces_layout() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let mut reg = sample_registration("07054");
        reg.zones = vec![Zone::new("Front", &["Produce"]), Zone::new("Back", &["Dairy"])];
        let first = register_store_layout(&mut conn, &reg).unwrap();

        reg.zones = vec![Zone::new("Cold", &["Dairy"]), Zone::new("Fresh", &["Produce"])];
        let second = register_store_layout(&mut conn, &reg).unwrap();

        assert_eq!(first.location_id, second.location_id);
        let layout = get_location_layout(&conn, second.location_id.unwrap()).unwrap();
        assert_eq!(
            layout.zones,
            vec![Zone::new("Cold", &["Dairy"]), Zone::new("Fresh", &["Produce"])]
        );
        assert_eq!(layout.flatten(), vec!["Dairy", "Produce"]);

        // Shorter layouts drop the trailing zones
        reg.zones = vec![Zone::new("Everything", &["Produce", "Dairy"])];
        register_store_layout(&mut conn, &reg).unwrap();
        let layout = get_location_layout(&conn, second.location_id.unwrap()).unwrap();
        assert_eq!(layout.zones, vec![Zone::new("Everything", &["Produce", "Dairy"])]);
    }

    #[test]
    fn test_registration_without_postal_code_reuses_location() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let mut reg = sample_registration("07054");
        reg.postal_code = None;
        reg.zones = vec![Zone::new("Front", &["Produce"])];
        let first = register_store_layout(&mut conn, &reg).unwrap();

        reg.zones = vec![Zone::new("Front", &["Bakery"])];
        let second = register_store_layout(&mut conn, &reg).unwrap();

        assert_eq!(first.location_id, second.location_id);
        assert_eq!(list_stores(&conn).unwrap().len(), 1);

        let found = find_store(&conn, "Wegmans", None).unwrap().unwrap();
        let layout = get_location_layout(&conn, found.location_id.unwrap()).unwrap();
        assert_eq!(layout.flatten(), vec!["Bakery"]);
    }

    #[test]
    fn test_list_layout_entries() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        register_store_layout(&mut conn, &sample_registration("07054")).unwrap();

        let entries = list_layout_entries(&conn).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[1].zone_name, "Meat & Seafood");
        assert_eq!(entries[1].zone_order, 2);
        assert_eq!(entries[1].category, "Meat");
        assert_eq!(entries[4].category, "Dairy");
    }

    #[test]
    fn test_register_rejects_duplicate_category() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let mut reg = sample_registration("07054");
        reg.zones.push(Zone::new("Back Wall", &["Dairy"]));

        assert!(register_store_layout(&mut conn, &reg).is_err());
        assert!(list_stores(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_find_store_tie_break_and_postal_code() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let first = register_store_layout(&mut conn, &sample_registration("07054")).unwrap();
        let second = register_store_layout(&mut conn, &sample_registration("07006")).unwrap();

        let any = find_store(&conn, "Wegmans", None).unwrap().unwrap();
        assert_eq!(any.location_id, first.location_id);

        let exact = find_store(&conn, "Wegmans", Some("07006")).unwrap().unwrap();
        assert_eq!(exact.location_id, second.location_id);
        assert_eq!(exact.postal_code.as_deref(), Some("07006"));

        assert!(find_store(&conn, "Wegmans", Some("12345")).unwrap().is_none());
        assert!(find_store(&conn, "Aldi", None).unwrap().is_none());
    }

    #[test]
    fn test_unknown_store_layout_is_empty() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        assert!(get_store_layout(&conn, 7).unwrap().is_empty());
    }

    #[test]
    fn test_database_handle_implements_boundaries() {
        let db = Database::open_in_memory().unwrap();
        db.register_layout(&sample_registration("07054")).unwrap();

        assert!(db.put("milk", Category::Dairy, "Milk", ItemSource::Ai).unwrap());
        assert_eq!(db.get("milk").unwrap().unwrap().normalized_name, "Milk");
        assert!(db.find_store("Wegmans", None).unwrap().is_some());
        assert_eq!(db.list_stores().unwrap().len(), 1);
    }
}
