//! Fare Model
//!
//! A fare is a priced route `(from_city, to_city)` with one price per
//! delivery type. At most one fare row exists per route (unique index).

use serde::{Deserialize, Serialize};

/// Fare entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Fare {
    pub id: i64,
    pub from_city: String,
    pub to_city: String,
    pub branch_delivery_price: f64,
    pub cod_branch_price: f64,
    pub door_delivery_price: f64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create fare payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareCreate {
    pub from_city: String,
    pub to_city: String,
    pub branch_delivery_price: f64,
    pub cod_branch_price: f64,
    pub door_delivery_price: f64,
}

/// Update fare payload (all optional)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareUpdate {
    pub from_city: Option<String>,
    pub to_city: Option<String>,
    pub branch_delivery_price: Option<f64>,
    pub cod_branch_price: Option<f64>,
    pub door_delivery_price: Option<f64>,
    pub is_active: Option<bool>,
}
