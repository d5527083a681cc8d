//! Domain Models
//!
//! Entity structs match the SQLite schema 1:1 (i64 ids, i64 Unix-millis
//! timestamps). Each entity has `*Create` / `*Update` DTO companions for the
//! API layer. Status enums are stored as TEXT in their wire form.

mod activity_log;
mod enums;
mod fare;
mod order;
mod shipment;
mod user;
mod vendor;
mod warehouse;

pub use activity_log::{ActivityLog, ActivityLogCreate};
pub use enums::{DeliveryType, OrderStatus, Role, ShipmentStatus};
pub use fare::{Fare, FareCreate, FareUpdate};
pub use order::{Order, OrderCreate, OrderUpdate, OrderWithRelations};
pub use shipment::{Shipment, ShipmentCreate, ShipmentUpdate, ShipmentWithRelations};
pub use user::{User, UserCreate, UserPublic};
pub use vendor::{Vendor, VendorCreate, VendorUpdate};
pub use warehouse::{Warehouse, WarehouseCreate, WarehouseUpdate};

use serde::{Deserialize, Serialize};

/// Pagination block returned by list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if total > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}
