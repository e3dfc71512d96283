//! Draft persistence - Durable form state with merge-on-load.
//!
//! The pricing/receiver form survives interrupted sessions: every change is
//! written through to a durable store keyed by the record's identity, and on
//! reopen the stored draft is merged field-by-field against the latest
//! authoritative snapshot. A user's in-progress edit is never discarded by a
//! newer fetch; a genuinely blank draft field does not mask data that has
//! since appeared upstream. Successful submission and explicit cancellation
//! both delete the stored draft, otherwise stale edits would resurface on the
//! next open.

use crate::{
    entities::{Draft, draft, quotation},
    errors::Result,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::warn;

/// Durable key-value storage capability for drafts.
///
/// Keyed by record identity; one open form per record, so no cross-key
/// coordination is needed.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Json>>;
    async fn set(&self, key: &str, value: Json) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-memory draft store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    entries: RwLock<HashMap<String, Json>>,
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn get(&self, key: &str) -> Result<Option<Json>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Json) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Draft store backed by the `drafts` table, durable across restarts.
#[derive(Debug, Clone)]
pub struct DbDraftStore {
    db: DatabaseConnection,
}

impl DbDraftStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DraftStore for DbDraftStore {
    async fn get(&self, key: &str) -> Result<Option<Json>> {
        let row = Draft::find_by_id(key).one(&self.db).await?;
        Ok(row.map(|r| r.value))
    }

    async fn set(&self, key: &str, value: Json) -> Result<()> {
        let existing = Draft::find_by_id(key).one(&self.db).await?;
        match existing {
            Some(row) => {
                let mut active: draft::ActiveModel = row.into();
                active.value = Set(value);
                active.updated_at = Set(Utc::now());
                active.update(&self.db).await?;
            }
            None => {
                let active = draft::ActiveModel {
                    key: Set(key.to_string()),
                    value: Set(value),
                    updated_at: Set(Utc::now()),
                };
                active.insert(&self.db).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        Draft::delete_by_id(key).exec(&self.db).await?;
        Ok(())
    }
}

/// One priced option as raw form input. Blank string means unfilled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub unit_price: String,
    #[serde(default)]
    pub unit_weight: String,
    #[serde(default)]
    pub delivery_time: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub image_url2: String,
}

/// Receiver section of the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// The whole multi-section draft for one quotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationDraft {
    /// Up to three pricing options
    #[serde(default)]
    pub options: Vec<OptionDraft>,
    /// Service fee as raw form input
    #[serde(default)]
    pub service_fee: String,
    /// Receiver section
    #[serde(default)]
    pub receiver: ReceiverDraft,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Field-level precedence: a blank draft field takes the upstream value, a
/// filled one always wins.
fn merge_field(field: &mut String, upstream: &str) {
    if is_blank(field) && !is_blank(upstream) {
        *field = upstream.to_string();
    }
}

/// Numeric upstream fields: zero means "not yet priced" in the source data,
/// so only a non-zero value counts as populated.
fn merge_number(field: &mut String, upstream: f64) {
    if is_blank(field) && upstream != 0.0 {
        *field = format!("{upstream}");
    }
}

impl QuotationDraft {
    /// Merges the authoritative snapshot into this draft, field by field.
    /// Idempotent: merging the same snapshot twice changes nothing further.
    pub fn merge_snapshot(&mut self, snapshot: &quotation::Model) {
        let upstream_options = snapshot.price_options();
        for (index, upstream) in upstream_options.iter().enumerate().take(3) {
            if self.options.len() <= index {
                self.options.push(OptionDraft::default());
            }
            let slot = &mut self.options[index];
            merge_field(&mut slot.title, &upstream.title);
            merge_number(&mut slot.unit_price, upstream.unit_price);
            merge_number(&mut slot.unit_weight, upstream.unit_weight);
            merge_field(&mut slot.delivery_time, &upstream.delivery_time);
            merge_field(&mut slot.description, &upstream.description);
            merge_field(&mut slot.image_url, upstream.image_url.as_deref().unwrap_or(""));
            merge_field(&mut slot.image_url2, upstream.image_url2.as_deref().unwrap_or(""));
        }
        merge_number(&mut self.service_fee, snapshot.service_fee);
        merge_field(
            &mut self.receiver.name,
            snapshot.receiver_name.as_deref().unwrap_or(""),
        );
        merge_field(
            &mut self.receiver.phone,
            snapshot.receiver_phone.as_deref().unwrap_or(""),
        );
        merge_field(
            &mut self.receiver.address,
            snapshot.receiver_address.as_deref().unwrap_or(""),
        );
    }
}

/// Write-through draft accessor over a [`DraftStore`].
pub struct DraftManager<S: DraftStore> {
    store: S,
}

impl<S: DraftStore> DraftManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Opens the draft for a record, applying merge-on-load.
    ///
    /// No stored draft: seed entirely from the snapshot (when given). Stored
    /// draft: merge the snapshot in at field level. Either way the result is
    /// persisted before it is returned, so an interrupt right after open
    /// loses nothing.
    pub async fn open(
        &self,
        key: &str,
        snapshot: Option<&quotation::Model>,
    ) -> Result<QuotationDraft> {
        let stored = match self.store.get(key).await? {
            Some(value) => match serde_json::from_value::<QuotationDraft>(value) {
                Ok(draft) => Some(draft),
                Err(err) => {
                    warn!("Stored draft for {key} is unreadable, reseeding: {err}");
                    None
                }
            },
            None => None,
        };

        let mut draft = stored.unwrap_or_default();
        if let Some(snapshot) = snapshot {
            draft.merge_snapshot(snapshot);
        }

        self.store.set(key, serde_json::to_value(&draft)?).await?;
        Ok(draft)
    }

    /// Applies a mutation to the stored draft and writes it through.
    pub async fn update<F>(&self, key: &str, mutate: F) -> Result<QuotationDraft>
    where
        F: FnOnce(&mut QuotationDraft),
    {
        let mut draft = match self.store.get(key).await? {
            Some(value) => serde_json::from_value(value).unwrap_or_default(),
            None => QuotationDraft::default(),
        };
        mutate(&mut draft);
        self.store.set(key, serde_json::to_value(&draft)?).await?;
        Ok(draft)
    }

    /// Deletes the stored draft. Called on successful submission and on
    /// explicit cancellation.
    pub async fn clear(&self, key: &str) -> Result<()> {
        self.store.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_open_without_draft_seeds_from_snapshot() -> Result<()> {
        let db = setup_test_db().await?;
        let quotation = create_test_quotation(&db, "user-1").await?;
        let manager = DraftManager::new(MemoryDraftStore::default());

        let draft = manager.open(&quotation.id, Some(&quotation)).await?;
        assert_eq!(draft.options.len(), 1);
        assert_eq!(draft.options[0].unit_price, "40");
        assert_eq!(draft.service_fee, "5");
        Ok(())
    }

    #[tokio::test]
    async fn test_open_without_draft_or_snapshot_is_empty() -> Result<()> {
        let manager = DraftManager::new(MemoryDraftStore::default());
        let draft = manager.open("q-1", None).await?;
        assert_eq!(draft, QuotationDraft::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_merge_never_overwrites_filled_draft_field() -> Result<()> {
        let db = setup_test_db().await?;
        let quotation = create_test_quotation(&db, "user-1").await?;
        let manager = DraftManager::new(MemoryDraftStore::default());

        manager
            .update(&quotation.id, |draft| {
                draft.options.push(OptionDraft {
                    title: "Edited by hand".to_string(),
                    ..OptionDraft::default()
                });
            })
            .await?;

        let draft = manager.open(&quotation.id, Some(&quotation)).await?;
        // The filled title survives; the blank price is filled from upstream.
        assert_eq!(draft.options[0].title, "Edited by hand");
        assert_eq!(draft.options[0].unit_price, "40");
        Ok(())
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let quotation = create_test_quotation(&db, "user-1").await?;
        let manager = DraftManager::new(MemoryDraftStore::default());

        let first = manager.open(&quotation.id, Some(&quotation)).await?;
        let second = manager.open(&quotation.id, Some(&quotation)).await?;
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_draft_field_takes_newly_populated_upstream() -> Result<()> {
        let db = setup_test_db().await?;
        let quotation = create_test_quotation(&db, "user-1").await?;
        let manager = DraftManager::new(MemoryDraftStore::default());

        manager.open(&quotation.id, None).await?;

        // A separate workflow populates the receiver upstream in the meantime.
        let mut active: crate::entities::quotation::ActiveModel = quotation.clone().into();
        active.receiver_name = Set(Some("Ama Mensah".to_string()));
        let updated = active.update(&db).await?;

        let draft = manager.open(&quotation.id, Some(&updated)).await?;
        assert_eq!(draft.receiver.name, "Ama Mensah");
        Ok(())
    }

    #[tokio::test]
    async fn test_write_through_persists_every_change() -> Result<()> {
        let store = MemoryDraftStore::default();
        let manager = DraftManager::new(store);

        manager
            .update("q-9", |draft| draft.service_fee = "7.5".to_string())
            .await?;

        // A fresh read of the underlying store sees the change.
        let raw = manager.store.get("q-9").await?.unwrap();
        let reloaded: QuotationDraft = serde_json::from_value(raw).unwrap();
        assert_eq!(reloaded.service_fee, "7.5");
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_prevents_resurrection() -> Result<()> {
        let db = setup_test_db().await?;
        let quotation = create_test_quotation(&db, "user-1").await?;
        let manager = DraftManager::new(MemoryDraftStore::default());

        manager
            .update(&quotation.id, |draft| {
                draft.receiver.name = "Stale edit".to_string();
            })
            .await?;
        manager.clear(&quotation.id).await?;

        let draft = manager.open(&quotation.id, Some(&quotation)).await?;
        assert_ne!(draft.receiver.name, "Stale edit");
        Ok(())
    }

    #[tokio::test]
    async fn test_db_draft_store_round_trip() -> Result<()> {
        let db = setup_test_db().await?;
        let store = DbDraftStore::new(db);

        assert!(store.get("q-1").await?.is_none());

        store.set("q-1", serde_json::json!({"service_fee": "3"})).await?;
        let value = store.get("q-1").await?.unwrap();
        assert_eq!(value["service_fee"], "3");

        // Overwrite goes through the update path
        store.set("q-1", serde_json::json!({"service_fee": "4"})).await?;
        let value = store.get("q-1").await?.unwrap();
        assert_eq!(value["service_fee"], "4");

        store.delete("q-1").await?;
        assert!(store.get("q-1").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_stored_draft_is_reseeded() -> Result<()> {
        let db = setup_test_db().await?;
        let quotation = create_test_quotation(&db, "user-1").await?;
        let store = MemoryDraftStore::default();
        store.set(&quotation.id, serde_json::json!("not a draft")).await?;

        let manager = DraftManager::new(store);
        let draft = manager.open(&quotation.id, Some(&quotation)).await?;
        assert_eq!(draft.options[0].unit_price, "40");
        Ok(())
    }
}
