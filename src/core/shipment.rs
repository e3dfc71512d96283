//! Shipment business logic - Status patches and receiver submission.
//!
//! Shipment rows come from an external fulfilment process; nothing here
//! creates them. The operations below read existing rows and patch status,
//! receiver, label and location fields, validating every status change
//! against the pipeline's transition table.

use crate::{
    core::status::ShipmentStatus,
    entities::{Shipment, shipment},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Receiver details captured on the shipment, independent of the quotation's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverInfo {
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
}

/// Finds a shipment by its primary key.
pub async fn get_shipment_by_id(
    db: &DatabaseConnection,
    shipment_id: &str,
) -> Result<Option<shipment::Model>> {
    Shipment::find_by_id(shipment_id).one(db).await.map_err(Into::into)
}

/// Finds the shipment fulfilling a quotation. One-to-one by convention, so the
/// first match wins.
pub async fn get_shipment_for_quotation(
    db: &DatabaseConnection,
    quotation_id: &str,
) -> Result<Option<shipment::Model>> {
    Shipment::find()
        .filter(shipment::Column::QuotationId.eq(quotation_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all shipments for a user, newest first.
pub async fn get_shipments_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<shipment::Model>> {
    Shipment::find()
        .filter(shipment::Column::UserId.eq(user_id))
        .order_by_desc(shipment::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Persists receiver details on a shipment.
///
/// A shipment still in `waiting` moves to `processing` on the first
/// submission; resubmitting different receiver details later updates the
/// fields without another transition.
pub async fn submit_receiver_info(
    db: &DatabaseConnection,
    shipment_id: &str,
    receiver: ReceiverInfo,
) -> Result<shipment::Model> {
    if receiver.name.trim().is_empty() || receiver.phone.trim().is_empty() {
        return Err(Error::Validation {
            message: "Receiver name and phone are required".to_string(),
        });
    }

    let model = get_shipment_by_id(db, shipment_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: "shipment",
            id: shipment_id.to_string(),
        })?;

    let status = ShipmentStatus::parse(&model.status)?;
    let mut active: shipment::ActiveModel = model.into();
    if status == ShipmentStatus::Waiting {
        active.status = Set(ShipmentStatus::Processing.as_str().to_string());
        info!("Shipment {shipment_id} moved to processing on receiver submission");
    }
    active.receiver_name = Set(Some(receiver.name.trim().to_string()));
    active.receiver_phone = Set(Some(receiver.phone.trim().to_string()));
    active.receiver_address = Set(receiver.address);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Sets a shipment's status, validating against the transition table.
/// `delivered` additionally stamps `delivered_at`.
pub async fn set_shipment_status(
    db: &DatabaseConnection,
    shipment_id: &str,
    target: ShipmentStatus,
) -> Result<shipment::Model> {
    let model = get_shipment_by_id(db, shipment_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: "shipment",
            id: shipment_id.to_string(),
        })?;

    let current = ShipmentStatus::parse(&model.status)?;
    current.validate_transition(target)?;

    let mut active: shipment::ActiveModel = model.into();
    active.status = Set(target.as_str().to_string());
    if target == ShipmentStatus::Delivered {
        active.delivered_at = Set(Some(Utc::now()));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!(
        "Shipment {shipment_id} transitioned {} -> {}",
        current.as_str(),
        target.as_str()
    );
    Ok(updated)
}

/// Updates the free-text current location shown on the tracking card.
pub async fn update_location(
    db: &DatabaseConnection,
    shipment_id: &str,
    location: String,
) -> Result<shipment::Model> {
    let model = get_shipment_by_id(db, shipment_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: "shipment",
            id: shipment_id.to_string(),
        })?;

    let mut active: shipment::ActiveModel = model.into();
    active.current_location = Set(Some(location));
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Sets or clears the free-text label on a shipment.
pub async fn set_label(
    db: &DatabaseConnection,
    shipment_id: &str,
    label: Option<String>,
) -> Result<shipment::Model> {
    let model = get_shipment_by_id(db, shipment_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: "shipment",
            id: shipment_id.to_string(),
        })?;

    let mut active: shipment::ActiveModel = model.into();
    active.label = Set(label);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn receiver(name: &str, phone: &str) -> ReceiverInfo {
        ReceiverInfo {
            name: name.to_string(),
            phone: phone.to_string(),
            address: Some("12 Harbor Rd".to_string()),
        }
    }

    #[tokio::test]
    async fn test_submit_receiver_info_transitions_waiting_to_processing() -> Result<()> {
        let db = setup_test_db().await?;
        let shipment = create_test_shipment(&db, "user-1", None).await?;
        assert_eq!(shipment.status, "waiting");

        let updated = submit_receiver_info(&db, &shipment.id, receiver("Ama", "+233200000001")).await?;
        assert_eq!(updated.status, "processing");
        assert_eq!(updated.receiver_name.as_deref(), Some("Ama"));
        assert_eq!(updated.receiver_phone.as_deref(), Some("+233200000001"));
        Ok(())
    }

    #[tokio::test]
    async fn test_resubmit_receiver_info_updates_without_second_transition() -> Result<()> {
        let db = setup_test_db().await?;
        let shipment = create_test_shipment(&db, "user-1", None).await?;

        submit_receiver_info(&db, &shipment.id, receiver("Ama", "+233200000001")).await?;
        let updated = submit_receiver_info(&db, &shipment.id, receiver("Kofi", "+233200000002")).await?;

        assert_eq!(updated.status, "processing");
        assert_eq!(updated.receiver_name.as_deref(), Some("Kofi"));
        assert_eq!(updated.receiver_phone.as_deref(), Some("+233200000002"));
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_receiver_info_requires_name_and_phone() -> Result<()> {
        let db = setup_test_db().await?;
        let shipment = create_test_shipment(&db, "user-1", None).await?;

        let result = submit_receiver_info(&db, &shipment.id, receiver("", "+233200000001")).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = submit_receiver_info(&db, &shipment.id, receiver("Ama", "  ")).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_shipment_status_walks_pipeline() -> Result<()> {
        let db = setup_test_db().await?;
        let shipment = create_test_shipment(&db, "user-1", None).await?;

        submit_receiver_info(&db, &shipment.id, receiver("Ama", "+233200000001")).await?;
        set_shipment_status(&db, &shipment.id, ShipmentStatus::InTransit).await?;
        let delivered = set_shipment_status(&db, &shipment.id, ShipmentStatus::Delivered).await?;

        assert_eq!(delivered.status, "delivered");
        assert!(delivered.delivered_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_set_shipment_status_refuses_illegal_jump() -> Result<()> {
        let db = setup_test_db().await?;
        let shipment = create_test_shipment(&db, "user-1", None).await?;

        // waiting -> delivered skips the whole pipeline
        let result = set_shipment_status(&db, &shipment.id, ShipmentStatus::Delivered).await;
        assert!(matches!(result.unwrap_err(), Error::IllegalTransition { .. }));

        let reloaded = get_shipment_by_id(&db, &shipment.id).await?.unwrap();
        assert_eq!(reloaded.status, "waiting");
        Ok(())
    }

    #[tokio::test]
    async fn test_delayed_is_reachable_and_resumes() -> Result<()> {
        let db = setup_test_db().await?;
        let shipment = create_test_shipment(&db, "user-1", None).await?;

        set_shipment_status(&db, &shipment.id, ShipmentStatus::Delayed).await?;
        let resumed = set_shipment_status(&db, &shipment.id, ShipmentStatus::Processing).await?;
        assert_eq!(resumed.status, "processing");
        Ok(())
    }

    #[tokio::test]
    async fn test_location_and_label_patches() -> Result<()> {
        let db = setup_test_db().await?;
        let shipment = create_test_shipment(&db, "user-1", None).await?;

        let updated = update_location(&db, &shipment.id, "Tema port".to_string()).await?;
        assert_eq!(updated.current_location.as_deref(), Some("Tema port"));

        let updated = set_label(&db, &shipment.id, Some("Fragile".to_string())).await?;
        assert_eq!(updated.label.as_deref(), Some("Fragile"));

        let updated = set_label(&db, &shipment.id, None).await?;
        assert!(updated.label.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_shipment_for_quotation() -> Result<()> {
        let db = setup_test_db().await?;
        let quotation = create_test_quotation(&db, "user-1").await?;
        let shipment = create_test_shipment(&db, "user-1", Some(quotation.id.clone())).await?;

        let found = get_shipment_for_quotation(&db, &quotation.id).await?;
        assert_eq!(found.unwrap().id, shipment.id);

        let missing = get_shipment_for_quotation(&db, "no-such-quotation").await?;
        assert!(missing.is_none());
        Ok(())
    }
}
