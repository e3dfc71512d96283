//! Database configuration module.
//!
//! Handles `SQLite` connection and table creation using `SeaORM`. Table schemas
//! are generated from the entity definitions via `Schema::create_table_from_entity`,
//! so the database layout always matches the Rust struct definitions without
//! manual SQL.

use crate::entities::{Draft, Payment, Profile, Quotation, Shipment};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from the `DATABASE_URL` environment variable,
/// falling back to a local `SQLite` file.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/orderdesk.sqlite".to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all record collection tables plus the draft key-value table.
///
/// Uses `SeaORM`'s schema generation from the `DeriveEntityModel` definitions,
/// ensuring the database schema matches the entity structs.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let quotation_table = schema.create_table_from_entity(Quotation);
    let payment_table = schema.create_table_from_entity(Payment);
    let shipment_table = schema.create_table_from_entity(Shipment);
    let profile_table = schema.create_table_from_entity(Profile);
    let draft_table = schema.create_table_from_entity(Draft);

    db.execute(builder.build(&quotation_table)).await?;
    db.execute(builder.build(&payment_table)).await?;
    db.execute(builder.build(&shipment_table)).await?;
    db.execute(builder.build(&profile_table)).await?;
    db.execute(builder.build(&draft_table)).await?;

    Ok(())
}
