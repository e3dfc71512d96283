//! Draft entity - Durable key-value storage for in-progress form state.
//!
//! Backs the database implementation of the draft store. Keys are record
//! identities (one open form per record), values are the serialized draft.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Draft database model - stores one serialized draft per record key
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drafts")]
pub struct Model {
    /// Identity of the record the draft belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Serialized draft payload
    pub value: Json,
    /// When this draft was last written
    pub updated_at: DateTimeUtc,
}

/// Drafts have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
