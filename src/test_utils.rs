//! Shared test utilities.
//!
//! Common helpers for setting up test databases and creating test records
//! with sensible defaults. Payment and shipment fixtures insert rows directly
//! so tests can model what external writers (legacy clients, the fulfilment
//! process) actually leave behind, including the inconsistent reference
//! encodings.

use crate::{
    core::{quotation, status::ShipmentStatus},
    entities,
    entities::quotation::PriceOption,
    errors::Result,
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, Set, prelude::*};
use serde_json::Value as Json;
use uuid::Uuid;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A price option with the given unit price and placeholder details.
pub fn test_price_option(unit_price: f64) -> PriceOption {
    PriceOption {
        title: "Standard".to_string(),
        unit_price,
        unit_weight: 1.0,
        delivery_time: "10-14 days".to_string(),
        description: "Test option".to_string(),
        image_url: None,
        image_url2: None,
    }
}

/// Creates a test quotation with sensible defaults.
///
/// # Defaults
/// * quantity: 2
/// * one option at 40.0/unit
/// * `service_fee`: 5.0
///
/// Expected payment total: 40.0 * 2 + 5.0 = 85.0
pub async fn create_test_quotation(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<entities::quotation::Model> {
    create_custom_quotation(db, user_id, 2, vec![test_price_option(40.0)], 5.0).await
}

/// Creates a test quotation with custom quantity, options and fee.
pub async fn create_custom_quotation(
    db: &DatabaseConnection,
    user_id: &str,
    quantity: i32,
    options: Vec<PriceOption>,
    service_fee: f64,
) -> Result<entities::quotation::Model> {
    quotation::create_quotation(
        db,
        user_id.to_string(),
        "Test product".to_string(),
        quantity,
        "Accra".to_string(),
        "air".to_string(),
        options,
        service_fee,
        None,
        None,
        None,
    )
    .await
}

/// Creates a test profile with sensible defaults (approved customer).
pub async fn create_test_profile(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<entities::profile::Model> {
    create_custom_profile(db, user_id, "Test User", true).await
}

/// Creates a test profile with custom name and approval flag.
pub async fn create_custom_profile(
    db: &DatabaseConnection,
    user_id: &str,
    display_name: &str,
    approved: bool,
) -> Result<entities::profile::Model> {
    let now = Utc::now();
    let model = entities::profile::ActiveModel {
        id: Set(user_id.to_string()),
        display_name: Set(display_name.to_string()),
        email: Set(format!("{user_id}@example.com")),
        phone: Set(None),
        approved: Set(approved),
        role: Set("customer".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    model.insert(db).await.map_err(Into::into)
}

/// Inserts a pending payment row directly, bypassing the creation saga.
/// Use this to model rows written by legacy clients.
pub async fn create_custom_payment(
    db: &DatabaseConnection,
    user_id: &str,
    amount: f64,
    quotation_refs: Option<Json>,
    reference_number: &str,
) -> Result<entities::payment::Model> {
    let model = entities::payment::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        amount: Set(amount),
        method: Set("bank_transfer".to_string()),
        status: Set("pending".to_string()),
        reference_number: Set(reference_number.to_string()),
        quotation_refs: Set(quotation_refs),
        proof_url: Set(None),
        created_at: Set(Utc::now()),
    };
    model.insert(db).await.map_err(Into::into)
}

/// Inserts a pending payment with no quotation references.
pub async fn create_test_payment(
    db: &DatabaseConnection,
    user_id: &str,
    amount: f64,
) -> Result<entities::payment::Model> {
    create_custom_payment(db, user_id, amount, None, "PAY-TEST").await
}

/// Inserts a `waiting` shipment row directly, the way the external
/// fulfilment process does.
pub async fn create_test_shipment(
    db: &DatabaseConnection,
    user_id: &str,
    quotation_id: Option<String>,
) -> Result<entities::shipment::Model> {
    let now = Utc::now();
    let model = entities::shipment::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        quotation_id: Set(quotation_id),
        user_id: Set(user_id.to_string()),
        status: Set(ShipmentStatus::Waiting.as_str().to_string()),
        current_location: Set(None),
        media_urls: Set(None),
        label: Set(None),
        estimated_delivery: Set(None),
        delivered_at: Set(None),
        receiver_name: Set(None),
        receiver_phone: Set(None),
        receiver_address: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    model.insert(db).await.map_err(Into::into)
}
