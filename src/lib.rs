// Grocery Organizer - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod category;
pub mod error;
pub mod rules;      // Heuristic keyword classifier
pub mod llm;        // Model adapter + Gemini client
pub mod escalation; // primary → alternative → upgrade
pub mod cache;
pub mod resolver;
pub mod layout;
pub mod organize;
pub mod db;
pub mod csv_io;
pub mod config;

// Re-export commonly used types
pub use category::{short_name, title_case, Category, Classification};
pub use error::Error;
pub use rules::{HeuristicClassifier, KeywordBucket, HEURISTIC_BUCKETS};
pub use llm::{GeminiClient, ModelClient, ModelOutcome, ModelTier, ModelTiers};
pub use escalation::{Escalated, EscalationChain, Origin};
pub use cache::{normalize_item_key, CacheStore, ClassificationRecord, ItemSource};
pub use resolver::{ClassificationResolver, Resolution, ResolutionPath};
pub use layout::{
    generic_layout, validate_postal_code,
    LayoutResolver, LayoutStore, StoreDetails, StoreLayout, StoreRef, StoreRegistration, Zone,
};
pub use organize::{order_groups, ItemGroup, Organizer};
pub use db::{
    Database,
    setup_database, cache_item, get_cached_item, override_item,
    list_cached_items, count_cached_items, list_layout_entries, LayoutEntry,
    find_store, list_stores, get_store_layout, get_location_layout, register_store_layout,
};
pub use csv_io::{export_cache_csv, export_layouts_csv, import_cache_csv, ImportSummary};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
