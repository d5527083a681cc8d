//! Shipment Model

use serde::{Deserialize, Serialize};

use super::ShipmentStatus;

/// Shipment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Shipment {
    pub id: i64,
    /// Globally unique, immutable: `TRK-{millis}-{9 base36 chars}`
    pub tracking_number: String,
    pub order_id: i64,
    pub warehouse_id: i64,
    pub status: ShipmentStatus,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<i64>,
    pub actual_delivery: Option<i64>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Shipment with joined order/warehouse context (detail + tracking views)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShipmentWithRelations {
    #[cfg_attr(feature = "db", sqlx(flatten))]
    #[serde(flatten)]
    pub shipment: Shipment,
    pub order_number: String,
    pub delivery_city: String,
    pub vendor_id: i64,
    pub user_id: Option<i64>,
    pub warehouse_name: String,
}

/// Create shipment payload.
///
/// Status is not accepted from the client: a new shipment always starts
/// PREPARING.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentCreate {
    pub order_id: i64,
    pub warehouse_id: i64,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<i64>,
    pub notes: Option<String>,
}

/// Update shipment payload (all optional; status accepts any enumerated value)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentUpdate {
    pub status: Option<ShipmentStatus>,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<i64>,
    pub actual_delivery: Option<i64>,
    pub notes: Option<String>,
}
