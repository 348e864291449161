//! # Seed Data Generator
//!
//! Populates a database with a small store for development: a supplier, a
//! catalog with opening stock, a received purchase order, a few sales and
//! adjustments. Then logs the month's reports.
//!
//! ## Usage
//! ```bash
//! # Seed ./bodega.db (or BODEGA_DB_PATH) with the tenant's current method
//! cargo run -p bodega-db --bin seed
//!
//! # Specify database path and costing method
//! cargo run -p bodega-db --bin seed -- --db ./data/bodega.db --method fifo
//! ```
//!
//! Environment variables (`BODEGA_*`) are read first; flags override them.

use std::env;
use std::path::PathBuf;

use chrono::{Datelike, Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bodega_core::{
    AdjustmentReason, CartLine, InventoryMethod, NewProduct, NewPurchaseOrderLine, NewSupplier,
    PaymentMethod,
};
use bodega_db::{AppConfig, Database};

/// (name, category, barcode, purchase cents, sale cents, opening stock, days to expiry)
const CATALOG: &[(&str, &str, &str, i64, i64, i64, Option<i64>)] = &[
    ("Cafe Grano 250g", "Despensa", "7801000000011", 3200, 5490, 12, None),
    ("Arroz Grado 1 1kg", "Despensa", "7801000000028", 890, 1390, 40, None),
    ("Aceite Maravilla 1L", "Despensa", "7801000000035", 1650, 2490, 18, None),
    ("Leche Entera 1L", "Lacteos", "7801000000042", 720, 1090, 30, Some(9)),
    ("Yogur Frutilla 125g", "Lacteos", "7801000000059", 260, 450, 48, Some(4)),
    ("Pan Molde Blanco", "Panaderia", "7801000000066", 1450, 2190, 6, Some(2)),
    ("Bebida Cola 1.5L", "Bebidas", "7801000000073", 990, 1790, 24, None),
    ("Agua Mineral 1.6L", "Bebidas", "7801000000080", 450, 890, 3, None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = AppConfig::from_env()?;
    let mut method: Option<InventoryMethod> = None;

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    config.database_path = PathBuf::from(path);
                    i += 1;
                }
            }
            "--method" | "-m" => {
                if let Some(value) = args.get(i + 1) {
                    method = Some(value.parse()?);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bodega Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>         Database file path (default: BODEGA_DB_PATH or ./bodega.db)");
                println!("  -m, --method <METHOD>   Costing method: cpp | fifo");
                println!("  -h, --help              Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(
        path = %config.database_path.display(),
        tenant_id = %config.tenant_id,
        "Seeding database"
    );

    let db = Database::new(config.db_config()).await?;
    let inventory = db.inventory(&config.tenant_id, config.default_inventory_method);

    if !inventory.list_products().await?.is_empty() {
        warn!("Database already has products; skipping seed. Delete the file to regenerate.");
        return Ok(());
    }

    if let Some(method) = method {
        inventory.set_inventory_method(method).await?;
    }
    let settings = inventory.settings().await?;
    info!(method = %settings.inventory_method, "Costing method");

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    let today = Utc::now().date_naive();
    let mut products = Vec::with_capacity(CATALOG.len());
    for &(name, category, barcode, purchase, sale, opening, expiry) in CATALOG {
        let product = inventory
            .create_product(NewProduct {
                name: name.to_string(),
                category: Some(category.to_string()),
                barcode: Some(barcode.to_string()),
                purchase_price_cents: purchase,
                sale_price_cents: sale,
                opening_stock: opening,
                expiration_date: expiry.map(|days| today + Duration::days(days)),
                ..NewProduct::default()
            })
            .await?;
        products.push(product);
    }
    info!(count = products.len(), "Catalog created");

    // -------------------------------------------------------------------------
    // Purchasing
    // -------------------------------------------------------------------------

    let supplier = inventory
        .create_supplier(NewSupplier {
            name: "Distribuidora Central".to_string(),
            contact_name: Some("Marcela Rojas".to_string()),
            email: Some("pedidos@distribuidoracentral.cl".to_string()),
            phone: Some("+56 2 2345 6789".to_string()),
        })
        .await?;

    let lines: Vec<NewPurchaseOrderLine> = products
        .iter()
        .take(3)
        .map(|p| NewPurchaseOrderLine {
            product_id: p.id.clone(),
            quantity: 10,
            unit_cost_cents: p.purchase_price_cents + p.purchase_price_cents / 10,
        })
        .collect();
    let order = inventory.create_purchase_order(&supplier.id, &lines).await?;
    inventory.receive_purchase_order(&order.id).await?;

    inventory
        .enter_purchase(&products[7].id, 24, 430, today)
        .await?;

    // -------------------------------------------------------------------------
    // Sales and adjustments
    // -------------------------------------------------------------------------

    inventory
        .sale(
            &[
                CartLine::new(&products[0].id, 2),
                CartLine::new(&products[3].id, 3),
                CartLine::new(&products[6].id, 1),
            ],
            PaymentMethod::Cash,
        )
        .await?;
    inventory
        .sale(
            &[
                CartLine::new(&products[1].id, 5),
                CartLine::new(&products[6].id, 2).at_price(1590),
            ],
            PaymentMethod::Card,
        )
        .await?;

    inventory
        .adjust_stock(&products[1].id, 2, AdjustmentReason::Count, Some("Conteo semanal".to_string()))
        .await?;
    inventory
        .adjust_stock(&products[5].id, -1, AdjustmentReason::Shrinkage, Some("Vencido".to_string()))
        .await?;

    // -------------------------------------------------------------------------
    // Reports
    // -------------------------------------------------------------------------

    let now = Utc::now();
    let vat = inventory.monthly_vat_report(now.year(), now.month()).await?;
    info!(
        output = vat.output_vat_cents,
        input = vat.input_vat_cents,
        payable = vat.vat_payable_cents,
        "Monthly VAT"
    );

    for row in inventory.valuation_by_category().await? {
        info!(category = %row.category, units = row.units, value = row.value_cents, "Valuation");
    }

    let alerts = inventory.stock_alerts().await?;
    info!(
        low_stock = alerts.low_stock.len(),
        overstock = alerts.overstock.len(),
        "Stock alerts"
    );

    let expiring = inventory
        .expiring_products(today, config.expiry_window_days)
        .await?;
    info!(count = expiring.len(), days = config.expiry_window_days, "Expiring products");

    let rows = inventory.reconcile_all().await?;
    let inconsistent = rows.iter().filter(|r| !r.is_consistent()).count();
    info!(products = rows.len(), inconsistent, "Reconciliation");

    db.close().await;
    info!("Seed complete");
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bodega=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
