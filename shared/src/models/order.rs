//! Order Model
//!
//! `total_amount` is computed at creation: fare price for the delivery type
//! plus `amount_to_be_collected`. Updates never re-price.

use serde::{Deserialize, Serialize};

use super::{DeliveryType, OrderStatus};

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// Globally unique, never reassigned: `ORD-{millis}-{9 base36 chars}`
    pub order_number: String,
    pub vendor_id: i64,
    pub user_id: Option<i64>,
    pub fare_id: i64,
    pub status: OrderStatus,
    pub delivery_city: String,
    pub delivery_address: String,
    pub contact_number: String,
    pub name: String,
    pub alternate_contact_number: Option<String>,
    pub delivery_type: DeliveryType,
    pub amount_to_be_collected: f64,
    pub total_amount: f64,
    pub product_weight: Option<f64>,
    pub product_type: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order with joined vendor/user names (detail views)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderWithRelations {
    #[cfg_attr(feature = "db", sqlx(flatten))]
    #[serde(flatten)]
    pub order: Order,
    pub vendor_name: String,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

/// Create order payload: pricing fields are computed server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub vendor_id: i64,
    pub user_id: Option<i64>,
    pub delivery_city: String,
    pub delivery_address: String,
    pub contact_number: String,
    pub name: String,
    pub alternate_contact_number: Option<String>,
    pub delivery_type: DeliveryType,
    pub amount_to_be_collected: Option<f64>,
    pub product_weight: Option<f64>,
    pub product_type: Option<String>,
    pub notes: Option<String>,
}

/// Update order payload (all optional; status accepts any enumerated value)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub delivery_address: Option<String>,
    pub contact_number: Option<String>,
    pub name: Option<String>,
    pub alternate_contact_number: Option<String>,
    pub product_weight: Option<f64>,
    pub product_type: Option<String>,
    pub notes: Option<String>,
}
