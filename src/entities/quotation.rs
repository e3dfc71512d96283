//! Quotation entity - A priced request for a product/shipping service.
//!
//! A quotation carries up to three priced options in the `options` Json column,
//! with `selected_option` holding the index of the one currently chosen. The
//! `reference_code` is the human-facing code shown to customers; it is generated
//! independently of `id` and the two are not interchangeable.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Quotation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotations")]
pub struct Model {
    /// Opaque primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Authentication identity of the requesting user
    pub user_id: String,
    /// Human-facing business reference code, generated independently of `id`
    pub reference_code: String,
    /// What the customer asked to have sourced
    pub product_name: String,
    /// Requested quantity of units
    pub quantity: i32,
    /// Shipping destination
    pub destination: String,
    /// Shipping method (e.g. `"air"`, `"sea"`)
    pub shipping_method: String,
    /// Ordered list of 1-3 priced options, stored as a Json array of [`PriceOption`]
    pub options: Json,
    /// Index into `options` of the currently selected option, if any
    pub selected_option: Option<i32>,
    /// Flat service fee applied on top of the selected option
    pub service_fee: f64,
    /// Lifecycle status: `"pending"`, `"approved"` or `"rejected"`
    pub status: String,
    /// Receiver name, captured separately from the requesting user's profile
    pub receiver_name: Option<String>,
    /// Receiver phone number
    pub receiver_phone: Option<String>,
    /// Receiver street address
    pub receiver_address: Option<String>,
    /// When the quotation was created
    pub created_at: DateTimeUtc,
    /// When the quotation was last modified
    pub updated_at: DateTimeUtc,
}

/// A single priced option within a quotation's `options` column.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceOption {
    /// Short label shown to the customer
    pub title: String,
    /// Price per unit
    pub unit_price: f64,
    /// Weight per unit in kilograms
    pub unit_weight: f64,
    /// Estimated delivery time, free text (e.g. `"10-14 days"`)
    pub delivery_time: String,
    /// Longer description of the sourced product
    pub description: String,
    /// Primary product image URL
    pub image_url: Option<String>,
    /// Secondary product image URL
    pub image_url2: Option<String>,
}

impl Model {
    /// Decodes the `options` Json column into typed price options.
    ///
    /// A malformed column yields an empty list rather than an error; the store
    /// does not validate this field and the dashboard must keep rendering.
    pub fn price_options(&self) -> Vec<PriceOption> {
        serde_json::from_value(self.options.clone()).unwrap_or_default()
    }

    /// Returns the currently selected price option, falling back to the first
    /// (mandatory) option when no explicit selection has been made.
    pub fn selected_price_option(&self) -> Option<PriceOption> {
        let options = self.price_options();
        let index = usize::try_from(self.selected_option.unwrap_or(0)).ok()?;
        options.into_iter().nth(index)
    }

    /// Total a payment for this quotation is expected to carry:
    /// selected unit price x quantity + service fee.
    pub fn expected_total(&self) -> Option<f64> {
        let option = self.selected_price_option()?;
        Some(option.unit_price * f64::from(self.quantity) + self.service_fee)
    }
}

/// Quotations are joined to other collections by resolved identifiers, not
/// by store-level foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
