//! Reference resolution - Normalizes heterogeneous cross-collection links.
//!
//! Upstream writers have stored the same logical link three ways: a Json array
//! of identifiers, a single comma-delimited identifier string, or nothing at
//! all, with a business reference number sometimes standing in for the primary
//! key. Everything is funneled through [`RefDescriptor`] here so no other
//! module ever branches on the encoding again.

use serde::Deserialize;
use serde_json::Value as Json;
use tracing::debug;

/// Raw reference field as it appears in a record, before normalization.
///
/// Decoded with `serde`'s untagged representation: a Json array maps to
/// `Many`, a Json string to `One`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RefField {
    /// Array-of-identifiers encoding
    Many(Vec<String>),
    /// Single string, possibly comma-delimited
    One(String),
}

/// Normalized form of a record's cross-collection link.
///
/// `ids` is the deduplicated, order-preserving list of candidate primary keys.
/// `reference_number` is the secondary resolution key, matched against the
/// target collection's business-reference column only when the primary-key
/// path yields zero matches for the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefDescriptor {
    ids: Vec<String>,
    reference_number: Option<String>,
}

impl RefDescriptor {
    /// The one normalization function.
    ///
    /// Array fields keep their non-empty string elements in order; string
    /// fields are split on commas with each part trimmed and empties dropped;
    /// null/absent fields resolve to no candidates. Any other Json shape is
    /// logged and treated as absent.
    pub fn new(raw: Option<&Json>, reference_number: Option<&str>) -> Self {
        let parts: Vec<String> = match raw {
            None | Some(Json::Null) => Vec::new(),
            Some(value) => match RefField::deserialize(value) {
                Ok(RefField::Many(items)) => items
                    .iter()
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect(),
                Ok(RefField::One(s)) => s
                    .split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect(),
                Err(_) => {
                    debug!("Ignoring reference field with unexpected shape: {value}");
                    Vec::new()
                }
            },
        };

        let mut ids = Vec::with_capacity(parts.len());
        for part in parts {
            if !ids.contains(&part) {
                ids.push(part);
            }
        }

        let reference_number = reference_number
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToString::to_string);

        Self { ids, reference_number }
    }

    /// Candidate primary keys, deduplicated and in original order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Secondary resolution key for the business-reference fallback path.
    pub fn reference_number(&self) -> Option<&str> {
        self.reference_number.as_deref()
    }

    /// True when neither resolution path has anything to offer.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.reference_number.is_none()
    }
}
