// 🗺️ Store Layouts - zones, flattening, and store resolution
//
// Store → Location → Zone (ordered) → Category (unordered set)
// Only zone order is a contract; the flattened priority list is what the
// organizer sorts by.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::Error;

// ============================================================================
// LAYOUT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub categories: Vec<String>,
}

impl Zone {
    pub fn new(name: &str, categories: &[&str]) -> Self {
        Zone {
            name: name.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreLayout {
    pub zones: Vec<Zone>,
}

impl StoreLayout {
    pub fn new(zones: Vec<Zone>) -> Self {
        StoreLayout { zones }
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Category labels in zone order, each kept only where first seen
    pub fn flatten(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut priority = Vec::new();

        for zone in &self.zones {
            for category in &zone.categories {
                if seen.insert(category.as_str()) {
                    priority.push(category.clone());
                }
            }
        }

        priority
    }
}

/// Layout used when no store is identified
pub fn generic_layout() -> StoreLayout {
    StoreLayout::new(vec![
        Zone::new("Produce", &["Produce"]),
        Zone::new("Meat & Seafood", &["Meat", "Seafood", "Deli"]),
        Zone::new("Bakery", &["Bakery"]),
        Zone::new("Dairy", &["Dairy"]),
        Zone::new("Frozen", &["Frozen"]),
        Zone::new("Pantry", &["Pantry"]),
        Zone::new("Snacks", &["Snacks"]),
        Zone::new("Beverages", &["Beverages"]),
        Zone::new("Household", &["Household"]),
        Zone::new("Personal Care", &["Personal Care"]),
    ])
}

// ============================================================================
// STORES
// ============================================================================

/// A store resolved to one of its locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDetails {
    pub store_id: i64,
    pub name: String,
    pub chain: Option<String>,
    pub postal_code: Option<String>,
    /// None when the store has no registered location
    pub location_id: Option<i64>,
}

/// How a caller identifies the store to organize for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRef {
    Id(i64),
    Name {
        name: String,
        postal_code: Option<String>,
    },
}

impl StoreRef {
    pub fn named(name: &str, postal_code: Option<&str>) -> Self {
        StoreRef::Name {
            name: name.to_string(),
            postal_code: postal_code.map(str::to_string),
        }
    }
}

/// US ZIP codes: exactly five ASCII digits
pub fn validate_postal_code(postal_code: &str) -> Result<(), Error> {
    if postal_code.len() == 5 && postal_code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::InvalidStore(format!(
            "postal code '{}' must be 5 digits",
            postal_code
        )))
    }
}

/// Layout registration payload (the one write path for layouts)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRegistration {
    pub name: String,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub zones: Vec<Zone>,
}

impl StoreRegistration {
    /// Load a JSON array of registrations
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Vec<StoreRegistration>> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read layouts file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse layouts JSON")
    }

    /// A category may sit in at most one zone of a location
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("store name must not be blank");
        }

        let mut seen = HashSet::new();
        for zone in &self.zones {
            for category in &zone.categories {
                if !seen.insert(category.as_str()) {
                    anyhow::bail!(
                        "category '{}' appears in more than one zone of store '{}'",
                        category,
                        self.name
                    );
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// LAYOUT STORE BOUNDARY
// ============================================================================

pub trait LayoutStore: Send + Sync {
    /// Resolve a store name (+ optional postal code) to one location.
    /// Without a postal code the lowest location id wins.
    fn find_store(&self, name: &str, postal_code: Option<&str>) -> Result<Option<StoreDetails>>;

    /// Layout of the store's first registered location; empty if unknown
    fn store_layout(&self, store_id: i64) -> Result<StoreLayout>;

    fn location_layout(&self, location_id: i64) -> Result<StoreLayout>;
}

// ============================================================================
// LAYOUT RESOLVER
// ============================================================================

pub struct LayoutResolver {
    store: Arc<dyn LayoutStore>,
}

impl LayoutResolver {
    pub fn new(store: Arc<dyn LayoutStore>) -> Self {
        LayoutResolver { store }
    }

    /// Resolve a store name to its details, signalling unknown stores
    pub fn resolve(&self, name: &str, postal_code: Option<&str>) -> Result<StoreDetails, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidStore("store name must not be blank".to_string()));
        }
        let postal_code = postal_code.map(str::trim).filter(|code| !code.is_empty());

        self.store
            .find_store(name, postal_code)?
            .ok_or_else(|| Error::StoreNotFound {
                name: name.to_string(),
                postal_code: postal_code.map(str::to_string),
            })
    }

    /// Layout for a store reference, or the generic layout without one.
    /// An id with no rows yields an empty layout; an unknown name is an error.
    pub fn layout_for(&self, store: Option<&StoreRef>) -> Result<StoreLayout, Error> {
        match store {
            None => {
                log::info!("no store identified, using generic layout");
                Ok(generic_layout())
            }
            Some(StoreRef::Id(store_id)) => {
                if *store_id <= 0 {
                    return Err(Error::InvalidStore(format!("store id {} must be positive", store_id)));
                }
                let layout = self.store.store_layout(*store_id)?;
                if layout.is_empty() {
                    log::warn!("store {} has no layout, items will be ordered alphabetically", store_id);
                }
                Ok(layout)
            }
            Some(StoreRef::Name { name, postal_code }) => {
                let details = self.resolve(name, postal_code.as_deref())?;
                self.layout_of(&details)
            }
        }
    }

    /// Layout of an already-resolved store location
    pub fn layout_of(&self, details: &StoreDetails) -> Result<StoreLayout, Error> {
        log::info!(
            "using layout of store '{}' (store_id {}, location {:?})",
            details.name,
            details.store_id,
            details.location_id
        );
        match details.location_id {
            Some(location_id) => Ok(self.store.location_layout(location_id)?),
            None => Ok(StoreLayout::default()),
        }
    }
}
