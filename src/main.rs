use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use grocery_organizer::{
    count_cached_items, export_cache_csv, export_layouts_csv, import_cache_csv, short_name, validate_postal_code,
    Category, Config, Database, ItemGroup, Organizer, StoreRef, StoreRegistration,
};

/// Command-line arguments for grocery-organizer
#[derive(Parser, Debug)]
#[command(name = "grocery-organizer")]
#[command(about = "Sort a shopping list into store-aisle order")]
#[command(version)]
struct Args {
    /// SQLite cache database
    #[arg(long, global = true, env = "GROCERY_DB_PATH", default_value = "grocery_cache.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema
    Init,

    /// Classify a shopping list and print it in store order
    Organize {
        /// Store name
        #[arg(long)]
        store: Option<String>,

        /// 5-digit ZIP narrowing the store to one location
        #[arg(long, requires = "store")]
        zip: Option<String>,

        /// Store id (takes precedence over --store)
        #[arg(long, conflicts_with = "store")]
        store_id: Option<i64>,

        /// Comma-separated list, e.g. "milk, eggs, bread"
        #[arg(long)]
        list: Option<String>,

        /// Items given one per argument
        items: Vec<String>,
    },

    /// Show how a single item resolves
    Classify { item: String },

    /// Pin an item to a category
    Override {
        item: String,
        category: String,

        /// Display name (defaults to the title-cased item)
        #[arg(long)]
        name: Option<String>,
    },

    /// Import cache rows from CSV (item,category,normalized_name,source)
    ImportCache { file: PathBuf },

    /// Export the item cache to CSV
    ExportCache { file: PathBuf },

    /// Export registered store layouts to CSV (one row per zone category)
    ExportLayouts { file: PathBuf },

    /// Register store layouts from a JSON file
    RegisterLayouts { file: PathBuf },

    /// List stores, or look one up by name
    Stores {
        #[arg(long)]
        name: Option<String>,

        #[arg(long, requires = "name")]
        zip: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env();
    config.db_path = args.db.clone();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter()))
        .init();

    let db = Arc::new(Database::open(&config.db_path)?);

    match args.command {
        Command::Init => run_init(&db, &config),
        Command::Organize {
            store,
            zip,
            store_id,
            list,
            items,
        } => run_organize(&config, db, store, zip, store_id, list, items),
        Command::Classify { item } => run_classify(&config, db, &item),
        Command::Override {
            item,
            category,
            name,
        } => run_override(&db, &item, &category, name),
        Command::ImportCache { file } => {
            let summary = import_cache_csv(&db.lock(), &file)?;
            println!("✓ Imported {} rows ({} skipped)", summary.imported, summary.skipped);
            Ok(())
        }
        Command::ExportCache { file } => {
            let count = export_cache_csv(&db.lock(), &file)?;
            println!("✓ Exported {} rows to {}", count, file.display());
            Ok(())
        }
        Command::ExportLayouts { file } => {
            let count = export_layouts_csv(&db.lock(), &file)?;
            println!("✓ Exported {} layout rows to {}", count, file.display());
            Ok(())
        }
        Command::RegisterLayouts { file } => run_register_layouts(&db, &file),
        Command::Stores { name, zip } => run_stores(&config, db, name, zip),
    }
}

fn run_init(db: &Database, config: &Config) -> Result<()> {
    let count = count_cached_items(&db.lock())?;
    println!("✓ Database ready at {}", config.db_path.display());
    println!("✓ Item cache holds {} entries", count);
    Ok(())
}

fn run_organize(
    config: &Config,
    db: Arc<Database>,
    store: Option<String>,
    zip: Option<String>,
    store_id: Option<i64>,
    list: Option<String>,
    mut items: Vec<String>,
) -> Result<()> {
    if let Some(list) = list {
        items.extend(list.split(',').map(|s| s.trim().to_string()));
    }
    items.retain(|item| !item.trim().is_empty());

    if items.is_empty() {
        anyhow::bail!("no items given; pass them as arguments or with --list");
    }

    if let Some(code) = zip.as_deref() {
        validate_postal_code(code)?;
    }

    let store_ref = match (store_id, store) {
        (Some(id), _) => Some(StoreRef::Id(id)),
        (None, Some(name)) => Some(StoreRef::named(&name, zip.as_deref())),
        (None, None) => None,
    };

    let organizer = Organizer::from_config(config, db);
    let groups = organizer.organize(store_ref.as_ref(), &items)?;

    print_groups(&groups);
    Ok(())
}

fn print_groups(groups: &[ItemGroup]) {
    for group in groups {
        println!("{}:", group.label);
        for item in &group.items {
            println!("- {}", item);
        }
        println!();
    }
}

fn run_classify(config: &Config, db: Arc<Database>, item: &str) -> Result<()> {
    let organizer = Organizer::from_config(config, db);
    let resolution = organizer.resolver().resolve(item)?;

    println!("Item:     {}", item.trim());
    println!("Category: {}", resolution.category);
    println!("Name:     {}", resolution.normalized_name);
    println!("Source:   {}", resolution.source);
    println!("Path:     {}", resolution.path.as_str());
    Ok(())
}

fn run_override(db: &Database, item: &str, category: &str, name: Option<String>) -> Result<()> {
    if item.trim().is_empty() {
        anyhow::bail!("item must not be blank");
    }
    let category: Category = category.parse()?;
    let name = name.unwrap_or_else(|| short_name(item));

    db.override_item(item, category, &name)?;
    println!("✓ '{}' pinned to {} as '{}'", item.trim(), category, name);
    Ok(())
}

fn run_register_layouts(db: &Database, file: &Path) -> Result<()> {
    let registrations = StoreRegistration::from_file(file)?;

    for reg in &registrations {
        if let Some(code) = reg.postal_code.as_deref() {
            validate_postal_code(code)?;
        }
        let details = db
            .register_layout(reg)
            .with_context(|| format!("Failed to register layout for '{}'", reg.name))?;
        println!(
            "✓ {} ({}) → store_id {}, {} zones",
            details.name,
            details.postal_code.as_deref().unwrap_or("no postal code"),
            details.store_id,
            reg.zones.len()
        );
    }

    Ok(())
}

fn run_stores(config: &Config, db: Arc<Database>, name: Option<String>, zip: Option<String>) -> Result<()> {
    match name {
        Some(name) => {
            if let Some(code) = zip.as_deref() {
                validate_postal_code(code)?;
            }
            let organizer = Organizer::from_config(config, db);
            let details = organizer.layouts().resolve(&name, zip.as_deref())?;
            let layout = organizer.layouts().layout_of(&details)?;

            println!("{}", serde_json::to_string_pretty(&details)?);
            for (index, zone) in layout.zones.iter().enumerate() {
                println!("{:>2}. {}: {}", index + 1, zone.name, zone.categories.join(", "));
            }
        }
        None => {
            let stores = db.list_stores()?;
            if stores.is_empty() {
                println!("No stores registered. Run: grocery-organizer register-layouts data/sample_layouts.json");
            }
            for store in stores {
                println!(
                    "{:>4}  {:<30} {}",
                    store.store_id,
                    store.name,
                    store.postal_code.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
