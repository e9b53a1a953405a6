//! # Seed Data Generator
//!
//! Populates a database with a tenant subscription and a product catalog
//! for development.
//!
//! ## Usage
//! ```bash
//! # 200 products for the default tenant
//! cargo run -p mercato-engine --bin seed
//!
//! # Custom amount, database and tenant
//! cargo run -p mercato-engine --bin seed -- --count 1000 --db ./data/mercato.db --tenant shop-42
//! ```
//!
//! Products go through `ProductService`, so every seeded quantity has a
//! matching purchase movement in the ledger.

use anyhow::Context;
use std::env;
use std::path::PathBuf;

use mercato_core::{Actor, NewProduct, Plan, Role, Subscription, DEFAULT_TENANT_ID};
use mercato_db::RepositoryAccess;
use mercato_engine::{telemetry, Engine, EngineConfig};

/// Catalog categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &["Cola", "Lemonade", "Sparkling Water", "Orange Juice", "Iced Tea", "Cold Brew"],
    ),
    (
        "SNK",
        &["Salted Chips", "Pretzels", "Trail Mix", "Granola Bar", "Dark Chocolate", "Popcorn"],
    ),
    (
        "DRY",
        &["Whole Milk", "Oat Milk", "Cheddar", "Greek Yogurt", "Butter", "Eggs Dozen"],
    ),
    (
        "GRO",
        &["Spaghetti", "Basmati Rice", "Canned Tomatoes", "Peanut Butter", "Honey", "Rolled Oats"],
    ),
];

const SIZES: &[(&str, i64)] = &[("Small", 0), ("Regular", 75), ("Large", 150), ("Family", 300)];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path: Option<PathBuf> = None;
    let mut tenant_id = DEFAULT_TENANT_ID.to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().context("--count must be a number")?;
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mercato Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>      Database file path (default: from config)");
                println!("  -t, --tenant <ID>    Tenant to seed (default: {})", DEFAULT_TENANT_ID);
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = EngineConfig::load(None).context("loading engine config")?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("Mercato Ledger Seed Data Generator");
    println!("==================================");
    println!("Database: {}", config.database.path.display());
    println!("Tenant:   {}", tenant_id);
    println!("Products: {}", count);
    println!();

    let engine = Engine::open(&config).await.context("opening database")?;

    {
        let mut session = engine.database().session().await?;
        let existing = session.products().count(&tenant_id).await?;
        if existing > 0 {
            println!("Tenant already has {} products, skipping seed.", existing);
            println!("Delete the database file to regenerate.");
            return Ok(());
        }
        session
            .subscriptions()
            .upsert(&Subscription::new(&tenant_id, Plan::Enterprise))
            .await?;
    }
    println!("Subscription: enterprise (unlimited)");

    let owner = Actor::new("seed", tenant_id.as_str(), Role::Owner);
    let start = std::time::Instant::now();
    let mut generated = 0usize;

    'outer: for (category_idx, (code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 20 + size_idx;
                let input = generate_product(code, name, size, *addon, seed);

                if let Err(e) = engine.products().create_product(&owner, &input).await {
                    eprintln!("Failed to create {}: {}", input.sku, e);
                    continue;
                }
                generated += 1;

                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("Generated {} products in {:?}", generated, elapsed);
    println!("Seed complete!");

    engine.database().close().await;
    Ok(())
}

/// Builds one product with deterministic pseudo-random price and stock.
fn generate_product(category: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> NewProduct {
    let prefix: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();

    let price_cents = 149 + ((seed * 17) % 850) as i64 + price_addon;
    let cost_pct = 55 + (seed % 25) as i64;

    NewProduct {
        sku: format!("{}-{}-{:04}", category, prefix, seed),
        name: format!("{} {}", name, size),
        description: None,
        unit_price_cents: price_cents,
        cost_price_cents: Some(price_cents * cost_pct / 100),
        initial_qty: (seed % 101) as i64,
        reorder_level: 10,
    }
}
