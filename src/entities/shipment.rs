//! Shipment entity - Tracking record for an approved quotation's goods.
//!
//! Shipment rows are created by an external fulfilment process; this crate
//! only reads them and patches status, receiver, label and location fields.
//! `quotation_id` links back to a quotation one-to-one by convention only.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shipment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    /// Opaque primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Id of the quotation this shipment fulfils, when the writer recorded one
    pub quotation_id: Option<String>,
    /// Authentication identity of the receiving user
    pub user_id: String,
    /// Lifecycle status: `"waiting"`, `"processing"`, `"in_transit"`,
    /// `"delivered"` or `"delayed"`
    pub status: String,
    /// Free-text current location of the goods
    pub current_location: Option<String>,
    /// Json array of media asset URLs (photos of the goods in transit)
    pub media_urls: Option<Json>,
    /// Free-text label shown on the tracking card
    pub label: Option<String>,
    /// Estimated delivery timestamp
    pub estimated_delivery: Option<DateTimeUtc>,
    /// When the shipment was delivered, set on the `"delivered"` transition
    pub delivered_at: Option<DateTimeUtc>,
    /// Receiver name, captured independently of the quotation's receiver
    pub receiver_name: Option<String>,
    /// Receiver phone number
    pub receiver_phone: Option<String>,
    /// Receiver street address
    pub receiver_address: Option<String>,
    /// When the shipment row was created
    pub created_at: DateTimeUtc,
    /// When the shipment row was last modified
    pub updated_at: DateTimeUtc,
}

/// Shipments are joined to other collections by resolved identifiers, not
/// by store-level foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
