//! Vendor Model

use serde::{Deserialize, Serialize};

/// Vendor entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create vendor payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorCreate {
    pub name: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

/// Update vendor payload (all optional)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub is_active: Option<bool>,
}
