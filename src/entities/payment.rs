//! Payment entity - A customer payment covering one or more quotations.
//!
//! The `quotation_refs` column is the weakest link in the data model: upstream
//! writers have stored it both as a Json array of quotation ids and as a single
//! comma-delimited string. `reference_number` is an externally generated code
//! that sometimes matches a quotation's `reference_code` instead of its id.
//! Decoding is owned entirely by [`crate::core::refs`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Opaque primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Authentication identity of the paying user
    pub user_id: String,
    /// Total amount paid
    pub amount: f64,
    /// Payment method (e.g. `"bank_transfer"`, `"mobile_money"`)
    pub method: String,
    /// Lifecycle status: `"pending"`, `"approved"` or `"rejected"`
    pub status: String,
    /// Externally generated reference code; may match a quotation's
    /// `reference_code` rather than its id
    pub reference_number: String,
    /// Referenced quotations: Json array of ids or a comma-delimited id string
    pub quotation_refs: Option<Json>,
    /// Proof-of-payment asset URL, if uploaded
    pub proof_url: Option<String>,
    /// When the payment was recorded
    pub created_at: DateTimeUtc,
}

/// Payments are joined to other collections by resolved identifiers, not
/// by store-level foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
