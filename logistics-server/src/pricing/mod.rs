//! Order Pricing Module
//!
//! Fare resolution and order total calculation. Every order creation does a
//! fresh fare lookup: fares change rarely and volume is modest, so there is
//! no route cache here.
//!
//! Uses rust_decimal for the money arithmetic, stores as f64.

use rand::Rng;
use rust_decimal::prelude::*;
use sqlx::SqlitePool;

use crate::db::repository::fare;
use crate::utils::{AppError, AppResult};
use shared::models::{DeliveryType, Fare};
use shared::util::now_millis;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

const ORDER_NUMBER_PREFIX: &str = "ORD";
const TRACKING_NUMBER_PREFIX: &str = "TRK";

/// Length of the random base36 suffix on order/tracking numbers
const NUMBER_SUFFIX_LEN: usize = 9;

/// Convert f64 to Decimal for calculation
#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Resolve the active fare from the hub to `delivery_city`.
///
/// Matching is case-insensitive substring on `to_city`. No fare for the
/// route is a business error (400), not a 404: the route itself is the
/// missing resource, not a record the client addressed.
pub async fn resolve_fare(
    pool: &SqlitePool,
    hub_city: &str,
    delivery_city: &str,
) -> AppResult<Fare> {
    fare::find_active_for_route(pool, hub_city, delivery_city)
        .await?
        .ok_or_else(|| AppError::business("No fare found for this route"))
}

/// Price for the given delivery type tag
pub fn fare_amount(fare: &Fare, delivery_type: DeliveryType) -> f64 {
    match delivery_type {
        DeliveryType::BranchDelivery => fare.branch_delivery_price,
        DeliveryType::CodBranch => fare.cod_branch_price,
        DeliveryType::DoorDelivery => fare.door_delivery_price,
    }
}

/// `total_amount = fare price for type + amount_to_be_collected`
pub fn total_amount(fare: &Fare, delivery_type: DeliveryType, amount_to_be_collected: f64) -> f64 {
    let total = to_decimal(fare_amount(fare, delivery_type)) + to_decimal(amount_to_be_collected);
    to_f64(total)
}

/// `ORD-{epoch_millis}-{9 uppercase base36 chars}`
///
/// Collisions are not retried; the unique index on order_number is the
/// correctness backstop and surfaces as a 409.
pub fn generate_order_number() -> String {
    format!(
        "{}-{}-{}",
        ORDER_NUMBER_PREFIX,
        now_millis(),
        random_base36_upper(NUMBER_SUFFIX_LEN)
    )
}

/// `TRK-{epoch_millis}-{9 uppercase base36 chars}`, same contract as order
/// numbers
pub fn generate_tracking_number() -> String {
    format!(
        "{}-{}-{}",
        TRACKING_NUMBER_PREFIX,
        now_millis(),
        random_base36_upper(NUMBER_SUFFIX_LEN)
    )
}

fn random_base36_upper(len: usize) -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fare() -> Fare {
        Fare {
            id: 1,
            from_city: "Pokhara".to_string(),
            to_city: "Kathmandu".to_string(),
            branch_delivery_price: 150.0,
            cod_branch_price: 200.0,
            door_delivery_price: 300.0,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn fare_amount_selects_price_by_delivery_type() {
        let fare = sample_fare();
        assert_eq!(fare_amount(&fare, DeliveryType::BranchDelivery), 150.0);
        assert_eq!(fare_amount(&fare, DeliveryType::CodBranch), 200.0);
        assert_eq!(fare_amount(&fare, DeliveryType::DoorDelivery), 300.0);
    }

    #[test]
    fn total_is_fare_plus_cod_amount() {
        let fare = sample_fare();
        assert_eq!(total_amount(&fare, DeliveryType::DoorDelivery, 5000.0), 5300.0);
        assert_eq!(total_amount(&fare, DeliveryType::BranchDelivery, 0.0), 150.0);
    }

    #[test]
    fn total_is_rounded_to_two_decimals() {
        let mut fare = sample_fare();
        fare.door_delivery_price = 0.1;
        assert_eq!(total_amount(&fare, DeliveryType::DoorDelivery, 0.2), 0.3);
    }

    #[test]
    fn number_format() {
        let n = generate_order_number();
        let parts: Vec<&str> = n.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));

        let t = generate_tracking_number();
        assert!(t.starts_with("TRK-"));
    }

    #[test]
    fn numbers_do_not_trivially_collide() {
        let a = generate_order_number();
        let b = generate_order_number();
        assert_ne!(a, b);
    }
}
