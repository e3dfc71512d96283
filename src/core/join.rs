//! Collection joining - Batched decoration of primary records.
//!
//! The record collections are weakly linked: a payment names its quotations
//! through whatever encoding [`crate::core::refs`] can decode, and profiles
//! hang off plain user ids. The joiner resolves every primary record's
//! candidates first, issues ONE batch fetch per target collection over the
//! union, then decorates each record from in-memory indexes. Fetch count is
//! proportional to the number of target collections, never to the number of
//! primary records.

use crate::{
    core::refs::RefDescriptor,
    entities::{Payment, Profile, Quotation, Shipment, payment, profile, quotation, shipment},
    errors::Result,
};
use sea_orm::{Condition, QueryOrder, prelude::*};
use serde_json::Value as Json;
use std::collections::HashMap;
use tracing::warn;

/// Join result for one target collection on one primary record.
///
/// `Fetched` carries the matched records, possibly none: the collection was
/// queried and these are the survivors. `Unavailable` means the collection's
/// batch fetch failed and no statement about matches can be made. Callers that
/// conflate the two would render "no data" where the truth is "unknown".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome<T> {
    /// The target collection was fetched; zero or more records matched
    Fetched(Vec<T>),
    /// The target collection could not be fetched; match state unknown
    Unavailable,
}

impl<T> JoinOutcome<T> {
    /// Matched records, or `None` when the collection was unavailable.
    pub fn records(&self) -> Option<&[T]> {
        match self {
            Self::Fetched(records) => Some(records),
            Self::Unavailable => None,
        }
    }

    /// First matched record, for one-to-one joins.
    pub fn first(&self) -> Option<&T> {
        self.records().and_then(<[T]>::first)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// A payment decorated with its resolved quotations and the payer's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPayment {
    pub payment: payment::Model,
    pub quotations: JoinOutcome<quotation::Model>,
    pub payer: JoinOutcome<profile::Model>,
}

/// A shipment decorated with its quotation and the owner's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedShipment {
    pub shipment: shipment::Model,
    pub quotation: JoinOutcome<quotation::Model>,
    pub owner: JoinOutcome<profile::Model>,
}

/// Quotation rows indexed for per-record lookup, or the failure marker.
enum QuotationIndex {
    Ready {
        by_id: HashMap<String, quotation::Model>,
        by_reference: HashMap<String, Vec<quotation::Model>>,
    },
    Unavailable,
}

impl QuotationIndex {
    /// One batch fetch over the union of every record's candidates. A failure
    /// here is tolerated: decoration continues with this collection marked
    /// unavailable on every record.
    async fn fetch(db: &DatabaseConnection, ids: Vec<String>, references: Vec<String>) -> Self {
        if ids.is_empty() && references.is_empty() {
            return Self::Ready {
                by_id: HashMap::new(),
                by_reference: HashMap::new(),
            };
        }

        let mut condition = Condition::any();
        if !ids.is_empty() {
            condition = condition.add(quotation::Column::Id.is_in(ids));
        }
        if !references.is_empty() {
            condition = condition.add(quotation::Column::ReferenceCode.is_in(references));
        }

        match Quotation::find().filter(condition).all(db).await {
            Ok(rows) => {
                let mut by_id = HashMap::new();
                let mut by_reference: HashMap<String, Vec<quotation::Model>> = HashMap::new();
                for row in rows {
                    by_reference
                        .entry(row.reference_code.clone())
                        .or_default()
                        .push(row.clone());
                    by_id.insert(row.id.clone(), row);
                }
                Self::Ready { by_id, by_reference }
            }
            Err(err) => {
                warn!("Quotation batch fetch failed, decorating without quotations: {err}");
                Self::Unavailable
            }
        }
    }

    /// Per-record lookup: primary keys first, the business-reference fallback
    /// only on a zero-match. Unmatched candidates are dropped silently.
    fn lookup(&self, descriptor: &RefDescriptor) -> JoinOutcome<quotation::Model> {
        match self {
            Self::Unavailable => JoinOutcome::Unavailable,
            Self::Ready { by_id, by_reference } => {
                let matched: Vec<quotation::Model> = descriptor
                    .ids()
                    .iter()
                    .filter_map(|id| by_id.get(id).cloned())
                    .collect();
                if matched.is_empty() {
                    if let Some(reference) = descriptor.reference_number() {
                        if let Some(rows) = by_reference.get(reference) {
                            return JoinOutcome::Fetched(rows.clone());
                        }
                    }
                }
                JoinOutcome::Fetched(matched)
            }
        }
    }
}

/// Profile rows indexed by id, or the failure marker.
enum ProfileIndex {
    Ready(HashMap<String, profile::Model>),
    Unavailable,
}

impl ProfileIndex {
    async fn fetch(db: &DatabaseConnection, ids: Vec<String>) -> Self {
        if ids.is_empty() {
            return Self::Ready(HashMap::new());
        }
        match Profile::find()
            .filter(profile::Column::Id.is_in(ids))
            .all(db)
            .await
        {
            Ok(rows) => Self::Ready(rows.into_iter().map(|row| (row.id.clone(), row)).collect()),
            Err(err) => {
                warn!("Profile batch fetch failed, decorating without profiles: {err}");
                Self::Unavailable
            }
        }
    }

    fn lookup(&self, user_id: &str) -> JoinOutcome<profile::Model> {
        match self {
            Self::Unavailable => JoinOutcome::Unavailable,
            Self::Ready(by_id) => {
                JoinOutcome::Fetched(by_id.get(user_id).cloned().into_iter().collect())
            }
        }
    }
}

/// Adds a batch of candidates to a union, preserving first-seen order.
fn extend_union(union: &mut Vec<String>, candidates: impl IntoIterator<Item = String>) {
    for candidate in candidates {
        if !union.contains(&candidate) {
            union.push(candidate);
        }
    }
}

/// Returns every payment decorated with its quotations and payer profile,
/// newest first.
///
/// Failing to fetch the payments themselves is fatal; a failure on either
/// target collection is logged and surfaces as [`JoinOutcome::Unavailable`]
/// on each record.
pub async fn enrich_payments(db: &DatabaseConnection) -> Result<Vec<EnrichedPayment>> {
    let payments = Payment::find()
        .order_by_desc(payment::Column::CreatedAt)
        .all(db)
        .await?;

    let descriptors: Vec<RefDescriptor> = payments
        .iter()
        .map(|p| RefDescriptor::new(p.quotation_refs.as_ref(), Some(&p.reference_number)))
        .collect();

    let mut id_union = Vec::new();
    let mut reference_union = Vec::new();
    let mut user_union = Vec::new();
    for (payment, descriptor) in payments.iter().zip(&descriptors) {
        extend_union(&mut id_union, descriptor.ids().iter().cloned());
        extend_union(
            &mut reference_union,
            descriptor.reference_number().map(ToString::to_string),
        );
        extend_union(&mut user_union, [payment.user_id.clone()]);
    }

    let quotations = QuotationIndex::fetch(db, id_union, reference_union).await;
    let profiles = ProfileIndex::fetch(db, user_union).await;

    Ok(payments
        .into_iter()
        .zip(descriptors)
        .map(|(payment, descriptor)| {
            let payer = profiles.lookup(&payment.user_id);
            EnrichedPayment {
                quotations: quotations.lookup(&descriptor),
                payer,
                payment,
            }
        })
        .collect())
}

/// Returns every shipment decorated with its quotation and owner profile,
/// newest first. Same failure semantics as [`enrich_payments`].
pub async fn enrich_shipments(db: &DatabaseConnection) -> Result<Vec<EnrichedShipment>> {
    let shipments = Shipment::find()
        .order_by_desc(shipment::Column::CreatedAt)
        .all(db)
        .await?;

    let descriptors: Vec<RefDescriptor> = shipments
        .iter()
        .map(|s| {
            let raw = s.quotation_id.clone().map(Json::String);
            RefDescriptor::new(raw.as_ref(), None)
        })
        .collect();

    let mut id_union = Vec::new();
    let mut user_union = Vec::new();
    for (shipment, descriptor) in shipments.iter().zip(&descriptors) {
        extend_union(&mut id_union, descriptor.ids().iter().cloned());
        extend_union(&mut user_union, [shipment.user_id.clone()]);
    }

    let quotations = QuotationIndex::fetch(db, id_union, Vec::new()).await;
    let profiles = ProfileIndex::fetch(db, user_union).await;

    Ok(shipments
        .into_iter()
        .zip(descriptors)
        .map(|(shipment, descriptor)| {
            let owner = profiles.lookup(&shipment.user_id);
            EnrichedShipment {
                quotation: quotations.lookup(&descriptor),
                owner,
                shipment,
            }
        })
        .collect())
}
