//! Warehouse Model

use serde::{Deserialize, Serialize};

/// Warehouse entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub address: Option<String>,
    pub capacity: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create warehouse payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseCreate {
    pub name: String,
    pub city: String,
    pub address: Option<String>,
    pub capacity: Option<i64>,
}

/// Update warehouse payload (all optional)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseUpdate {
    pub name: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<i64>,
    pub is_active: Option<bool>,
}
