//! Shared types for the logistics backend
//!
//! Domain models and create/update DTOs used by the API server, plus the
//! common ID/time helpers. Enable the `db` feature to derive `sqlx::FromRow`
//! on the entity structs.

pub mod models;
pub mod util;

pub use models::{
    DeliveryType, Fare, Order, OrderStatus, Role, Shipment, ShipmentStatus, User, Vendor,
    Warehouse,
};
