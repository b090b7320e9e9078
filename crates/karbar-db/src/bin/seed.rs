//! # Seed Data Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed into the default database file
//! cargo run -p karbar-db --bin seed
//!
//! # Specify database path
//! cargo run -p karbar-db --bin seed -- --db ./data/karbar.db
//!
//! # Also record a handful of demo sales
//! cargo run -p karbar-db --bin seed -- --demo-sales
//! ```
//!
//! ## Generated Catalog
//! One product per kind, several variants each:
//! - Clear Glass (sheets priced per sheet and per sqft)
//! - Thai Aluminum (rods priced per bar and per ft)
//! - SS Pipe (pipes priced per pipe and per ft)
//! - Hardware (piece goods, single price)

use std::env;

use karbar_core::{NewInvoice, NewInvoiceLine, NewVariant, ProductKind};
use karbar_db::{Database, DbConfig};

/// Glass sheet variants: (sku, thickness mm, width in, height in,
/// Tk/sheet, Tk/sqft, cost Tk, opening sheets).
const GLASS_VARIANTS: &[(&str, f64, f64, f64, f64, f64, f64, f64)] = &[
    ("GL-24x36-3MM", 3.0, 24.0, 36.0, 90.0, 16.0, 60.0, 25.0),
    ("GL-24x36-5MM", 5.0, 24.0, 36.0, 120.0, 22.0, 80.0, 20.0),
    ("GL-36x48-5MM", 5.0, 36.0, 48.0, 260.0, 23.0, 180.0, 12.0),
    ("GL-48x72-5MM", 5.0, 48.0, 72.0, 540.0, 24.0, 380.0, 6.0),
    ("GL-24x36-8MM", 8.0, 24.0, 36.0, 200.0, 35.0, 140.0, 10.0),
];

/// Aluminum rod variants: (sku, color, rod ft, Tk/bar, Tk/ft, cost Tk,
/// opening bars).
const THAI_VARIANTS: &[(&str, &str, f64, f64, f64, f64, f64)] = &[
    ("TA-21FT-SIL", "Silver", 21.0, 60.0, 3.0, 40.0, 60.0),
    ("TA-21FT-BLK", "Black", 21.0, 68.0, 3.4, 46.0, 40.0),
    ("TA-18FT-SIL", "Silver", 18.0, 52.0, 3.0, 35.0, 30.0),
];

/// SS pipe variants: (sku, size label, pipe ft, Tk/pipe, Tk/ft,
/// cost Tk, opening pipes). Zero pipe length means the 20 ft default.
const PIPE_VARIANTS: &[(&str, &str, f64, f64, f64, f64, f64)] = &[
    ("SS-P-075", "3/4 inch", 20.0, 900.0, 45.0, 700.0, 15.0),
    ("SS-P-100", "1 inch", 20.0, 1200.0, 60.0, 950.0, 12.0),
    ("SS-P-150", "1.5 inch", 0.0, 1700.0, 85.0, 1350.0, 8.0),
];

/// Piece goods: (sku, name suffix, Tk/piece, cost Tk, opening pieces).
const OTHERS_VARIANTS: &[(&str, &str, f64, f64, f64)] = &[
    ("HW-HINGE", "Cabinet Hinge", 35.0, 20.0, 200.0),
    ("HW-HANDLE", "Door Handle", 120.0, 75.0, 80.0),
    ("HW-LOCK", "Drawer Lock", 180.0, 110.0, 50.0),
    ("HW-SCREW-PKT", "Screw Packet", 25.0, 12.0, 300.0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./karbar_dev.db");
    let mut demo_sales = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--demo-sales" => {
                demo_sales = true;
            }
            "--help" | "-h" => {
                println!("Karbar POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./karbar_dev.db)");
                println!("      --demo-sales   Record a few demo invoices after seeding");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Karbar POS Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("* Connected to database");
    println!("* Migrations applied");

    // Check existing catalog
    let existing = db.products().list_products().await?;
    if !existing.is_empty() {
        println!("! Database already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding catalog...");

    let mut variant_count = 0;

    let glass = db
        .products()
        .create_product("Clear Glass", ProductKind::Glass)
        .await?;
    for (sku, thickness, width, height, per_sheet, per_sqft, cost, stock) in GLASS_VARIANTS {
        db.products()
            .create_variant(
                &glass.id,
                &NewVariant {
                    sku: sku.to_string(),
                    thickness_mm: Some(*thickness),
                    width_in: Some(*width),
                    height_in: Some(*height),
                    price_base: Some(*per_sheet),
                    price_alt: Some(*per_sqft),
                    cost_price: Some(*cost),
                    opening_stock: Some(*stock),
                    low_stock_threshold: Some(3.0),
                    ..Default::default()
                },
            )
            .await?;
        variant_count += 1;
    }

    let thai = db
        .products()
        .create_product("Thai Aluminum", ProductKind::ThaiAluminum)
        .await?;
    for (sku, color, length, per_bar, per_ft, cost, stock) in THAI_VARIANTS {
        db.products()
            .create_variant(
                &thai.id,
                &NewVariant {
                    sku: sku.to_string(),
                    color: Some(color.to_string()),
                    rod_length_ft: Some(*length),
                    price_base: Some(*per_bar),
                    price_alt: Some(*per_ft),
                    cost_price: Some(*cost),
                    opening_stock: Some(*stock),
                    low_stock_threshold: Some(10.0),
                    ..Default::default()
                },
            )
            .await?;
        variant_count += 1;
    }

    let pipe = db
        .products()
        .create_product("SS Pipe", ProductKind::SsPipe)
        .await?;
    for (sku, label, length, per_pipe, per_ft, cost, stock) in PIPE_VARIANTS {
        db.products()
            .create_variant(
                &pipe.id,
                &NewVariant {
                    sku: sku.to_string(),
                    size_label: Some(label.to_string()),
                    pipe_length_ft: (*length > 0.0).then_some(*length),
                    price_base: Some(*per_pipe),
                    price_alt: Some(*per_ft),
                    cost_price: Some(*cost),
                    opening_stock: Some(*stock),
                    low_stock_threshold: Some(4.0),
                    ..Default::default()
                },
            )
            .await?;
        variant_count += 1;
    }

    let hardware = db
        .products()
        .create_product("Hardware", ProductKind::Others)
        .await?;
    for (sku, label, price, cost, stock) in OTHERS_VARIANTS {
        db.products()
            .create_variant(
                &hardware.id,
                &NewVariant {
                    sku: sku.to_string(),
                    size_label: Some(label.to_string()),
                    price_base: Some(*price),
                    cost_price: Some(*cost),
                    opening_stock: Some(*stock),
                    low_stock_threshold: Some(20.0),
                    ..Default::default()
                },
            )
            .await?;
        variant_count += 1;
    }

    println!("* Seeded 4 products, {} variants", variant_count);

    if demo_sales {
        println!();
        println!("Recording demo sales...");
        record_demo_sales(&db).await?;
    }

    println!();
    println!("* Seed complete!");

    Ok(())
}

/// Records a few invoices exercising every conversion path: glass by
/// area, aluminum by foot, a partial payment, and a walk-in cash sale.
async fn record_demo_sales(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let glass = db
        .products()
        .get_by_sku("GL-24x36-5MM")
        .await?
        .ok_or("seeded variant missing: GL-24x36-5MM")?;
    let thai = db
        .products()
        .get_by_sku("TA-21FT-SIL")
        .await?
        .ok_or("seeded variant missing: TA-21FT-SIL")?;
    let hinge = db
        .products()
        .get_by_sku("HW-HINGE")
        .await?
        .ok_or("seeded variant missing: HW-HINGE")?;

    // Credit customer: glass cut to area plus hinges, half paid up front
    let credit_sale = db
        .invoices()
        .create_invoice(&NewInvoice {
            invoice_date: None,
            customer: Some(karbar_core::CustomerInput {
                name: Some("Rahim Traders".to_string()),
                phone: Some("01711-000001".to_string()),
                address: Some("Mirpur 10, Dhaka".to_string()),
            }),
            lines: vec![
                NewInvoiceLine {
                    variant_id: glass.variant.id.clone(),
                    uom: Some("sqft".to_string()),
                    qty: 18.0,
                    unit_price: None,
                    line_total: None,
                },
                NewInvoiceLine {
                    variant_id: hinge.variant.id.clone(),
                    uom: None,
                    qty: 6.0,
                    unit_price: None,
                    line_total: None,
                },
            ],
            subtotal: None,
            discount: 10.0,
            paid_amount: 300.0,
            shop_name: Some("Karbar Glass & Aluminum".to_string()),
            shop_address: Some("Shop 12, Hatirpool Market, Dhaka".to_string()),
            shop_phone: Some("01911-000000".to_string()),
        })
        .await?;
    println!(
        "  {} grand Tk {:.2}, due Tk {:.2}",
        credit_sale.invoice.invoice_no,
        credit_sale.invoice.grand_total_paisa as f64 / 100.0,
        credit_sale.due_paisa as f64 / 100.0
    );

    // Walk-in cash sale: aluminum cut by the foot
    let cash_sale = db
        .invoices()
        .create_invoice(&NewInvoice {
            invoice_date: None,
            customer: None,
            lines: vec![NewInvoiceLine {
                variant_id: thai.variant.id.clone(),
                uom: Some("ft".to_string()),
                qty: 35.0,
                unit_price: None,
                line_total: None,
            }],
            subtotal: None,
            discount: 0.0,
            paid_amount: 105.0,
            shop_name: Some("Karbar Glass & Aluminum".to_string()),
            shop_address: None,
            shop_phone: None,
        })
        .await?;
    println!(
        "  {} grand Tk {:.2} (paid in full)",
        cash_sale.invoice.invoice_no,
        cash_sale.invoice.grand_total_paisa as f64 / 100.0
    );

    // Collect an installment against the credit sale
    let receipt = db
        .dues()
        .add_payment(&credit_sale.invoice.id, 100.0, Some("cash"))
        .await?;
    println!(
        "  {} collected Tk {:.2}",
        receipt.receipt_no,
        receipt.amount_paisa as f64 / 100.0
    );

    Ok(())
}
