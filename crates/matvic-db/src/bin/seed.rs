//! # Seed Data Generator
//!
//! Populates a database with the phone accessory catalogue and a few months
//! of demo sales, so the dashboard has something to show.
//!
//! ## Usage
//! ```bash
//! # Seed ./matvic.db with catalogue + 120 demo sales (default)
//! cargo run -p matvic-db --bin seed
//!
//! # Catalogue only, custom path
//! cargo run -p matvic-db --bin seed -- --db ./data/matvic.db --sales 0
//! ```
//!
//! Demo sales go through the normal commit path, so stock is decremented and
//! no sale is written that the stock could not cover.

use std::env;

use chrono::{Duration, Utc};
use matvic_core::{Money, ProductInput, SaleLine, SaleRequest};
use matvic_db::{Database, DbConfig, DbError};

/// (category, name, description, price in pesos, stock, min_stock)
const CATALOGUE: &[(&str, &str, &str, i64, i64, i64)] = &[
    ("Fundas", "Funda iPhone 15", "Silicona, varios colores", 12990, 30, 5),
    ("Fundas", "Funda iPhone 14", "Silicona, varios colores", 10990, 25, 5),
    ("Fundas", "Funda transparente para iPhone 15", "Antigolpes", 7990, 40, 8),
    ("Fundas", "Funda con anillo", "Soporte magnético", 8990, 12, 4),
    ("Protectores", "Protector Samsung S24", "Vidrio templado", 4990, 50, 10),
    ("Protectores", "Protector Samsung A54", "Vidrio templado", 4490, 35, 10),
    ("Protectores", "Protector 9H para Xiaomi", "Dureza 9H", 3990, 20, 6),
    ("Cargadores", "Cargador Rápido USB-C 65W", "Carga rápida PD", 19990, 15, 4),
    ("Cargadores", "Cargador Inalámbrico", "Base Qi 15W", 14990, 2, 3),
    ("Cables", "Cable USB-C 2m", "Mallado", 5990, 60, 10),
    ("Cables", "Cable Lightning 1m", "Certificado", 6990, 30, 8),
    ("Auriculares", "Auriculares Bluetooth", "Over-ear", 34990, 8, 2),
    ("Auriculares", "Auriculares TWS", "Estuche de carga", 24990, 10, 3),
];

const PAYMENT_METHODS: &[&str] = &["Efectivo", "Tarjeta", "Transferencia"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./matvic.db");
    let mut sales: usize = 120;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(sales);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("MatVic Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: ./matvic.db)");
                println!("  -s, --sales <N>     Demo sales to generate (default: 120)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 MatVic Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let schema = db.migration_status().await?;
    println!(
        "✓ Connected, {}/{} migrations applied",
        schema.applied, schema.embedded
    );

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut product_ids = Vec::with_capacity(CATALOGUE.len());
    for (category, name, description, price, stock, min_stock) in CATALOGUE {
        let product = db
            .products()
            .create(ProductInput {
                name: name.to_string(),
                description: Some(description.to_string()),
                category: category.to_string(),
                unit_price: Money::from_pesos(*price),
                // Demo sales draw on this; the configured figure is what remains.
                stock: stock + sales as i64,
                min_stock: *min_stock,
            })
            .await?;
        product_ids.push(product.id);
    }
    println!("✓ Inserted {} products", product_ids.len());

    let now = Utc::now();
    let mut committed = 0;
    let mut rejected = 0;

    for n in 0..sales {
        // Deterministic spread over the last ~180 days, both stores, 1-3 lines.
        let created_at = now - Duration::hours((n as i64 * 37) % (180 * 24));
        let lines = (0..1 + n % 3)
            .map(|k| SaleLine {
                product_id: product_ids[(n * 7 + k * 3) % product_ids.len()].clone(),
                quantity: 1 + ((n + k) % 2) as i64,
            })
            .collect();

        let request = SaleRequest {
            lines,
            payment_method: PAYMENT_METHODS[n % PAYMENT_METHODS.len()].to_string(),
            employee_id: 1 + (n % 4) as i64,
            store_id: 1 + (n % 2) as i64,
            customer_name: None,
            customer_id: None,
        };

        match db.sales().commit_at(request, created_at).await {
            Ok(_) => committed += 1,
            Err(DbError::Domain(e)) => {
                rejected += 1;
                eprintln!("  sale {} rejected: {}", n, e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("✓ Committed {} demo sales ({} rejected)", committed, rejected);

    let alerts = db.products().low_stock_alerts().await?;
    println!("  Low-stock alerts: {}", alerts.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
