//! Database seeding: admin/manager/user accounts, warehouses, vendors and
//! the standard fare table. Idempotent: existing rows are left alone.
//!
//! ```ignore
//! DATA_DIR=./data cargo run --bin seed
//! ```

use logistics_server::auth::password;
use logistics_server::core::Config;
use logistics_server::db::DbService;
use logistics_server::db::repository::{fare, user, vendor, warehouse};
use logistics_server::init_logger;
use shared::models::{FareCreate, Role, VendorCreate, WarehouseCreate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    init_logger();

    let config = Config::from_env();
    config.ensure_data_dir_structure()?;
    let db = DbService::new(&config.database_path().to_string_lossy()).await?;
    let pool = db.pool;

    tracing::info!("Seeding database...");

    for (name, email, pass, role) in [
        ("Admin User", "admin@logistics.com", "admin123", Role::Admin),
        ("Manager User", "manager@logistics.com", "manager123", Role::Manager),
        ("Regular User", "user@logistics.com", "user123", Role::User),
    ] {
        if user::find_by_email(&pool, email).await?.is_none() {
            let hash = password::hash_password(pass)?;
            user::create(&pool, name, email, &hash, role, None).await?;
            tracing::info!(email, ?role, "user created");
        }
    }

    for (name, city, capacity) in [
        ("Pokhara Main Hub", "Pokhara", 10_000),
        ("Kathmandu Branch", "Kathmandu", 8_000),
    ] {
        let data = WarehouseCreate {
            name: name.to_string(),
            city: city.to_string(),
            address: None,
            capacity: Some(capacity),
        };
        match warehouse::create(&pool, data).await {
            Ok(w) => tracing::info!(id = w.id, name, "warehouse created"),
            Err(e) => tracing::debug!(name, error = %e, "warehouse skipped"),
        }
    }

    for (name, email) in [
        ("Himalayan Traders", "orders@himalayantraders.com"),
        ("Lakeside Electronics", "sales@lakeside-electronics.com"),
    ] {
        let data = VendorCreate {
            name: name.to_string(),
            email: email.to_string(),
            contact_number: None,
            address: None,
            city: Some("Pokhara".to_string()),
        };
        match vendor::create(&pool, data).await {
            Ok(v) => tracing::info!(id = v.id, name, "vendor created"),
            Err(e) => tracing::debug!(name, error = %e, "vendor skipped"),
        }
    }

    // Fares from the hub; one row per route
    for (to_city, branch, cod, door) in [
        ("Kathmandu", 150.0, 200.0, 300.0),
        ("Chitwan", 120.0, 170.0, 250.0),
        ("Butwal", 100.0, 150.0, 220.0),
        ("Biratnagar", 200.0, 260.0, 380.0),
    ] {
        let data = FareCreate {
            from_city: config.hub_city.clone(),
            to_city: to_city.to_string(),
            branch_delivery_price: branch,
            cod_branch_price: cod,
            door_delivery_price: door,
        };
        match fare::create(&pool, data).await {
            Ok(f) => tracing::info!(id = f.id, to_city, "fare created"),
            Err(e) => tracing::debug!(to_city, error = %e, "fare skipped"),
        }
    }

    tracing::info!("Seeding complete");
    Ok(())
}
