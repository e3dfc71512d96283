//! Profile lookups. Profiles are a read-only join target; nothing in the
//! reconciliation core writes them.

use crate::{
    entities::{Profile, profile},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};

/// Finds a profile by its authentication identity.
pub async fn get_profile_by_id(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<profile::Model>> {
    Profile::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Retrieves all approved profiles, ordered by display name.
pub async fn get_approved_profiles(db: &DatabaseConnection) -> Result<Vec<profile::Model>> {
    Profile::find()
        .filter(profile::Column::Approved.eq(true))
        .order_by_asc(profile::Column::DisplayName)
        .all(db)
        .await
        .map_err(Into::into)
}
