//! Profile entity - Contact and approval data for a dashboard user.
//!
//! The primary key equals the authentication identity, so joins from payments
//! and shipments resolve directly on `user_id`. Profiles are a read-only join
//! target; nothing in this crate writes them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Authentication identity, used directly as the primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name shown in the dashboard
    pub display_name: String,
    /// Contact email
    pub email: String,
    /// Contact phone number
    pub phone: Option<String>,
    /// Whether an admin has approved this account
    pub approved: bool,
    /// Role name (e.g. `"customer"`, `"admin"`)
    pub role: String,
    /// When the profile was created
    pub created_at: DateTimeUtc,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// Profiles never reference other collections
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
