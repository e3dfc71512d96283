//! Quotation business logic - Creation, lookup and option selection.
//!
//! Quotations are created through the submission wizard with status `pending`
//! and move to `approved` as a side effect of payment creation (or through a
//! direct admin review). All functions are async and return Result types for
//! error handling.

use crate::{
    core::draft::{OptionDraft, QuotationDraft},
    core::status::QuotationStatus,
    entities::{Quotation, quotation, quotation::PriceOption},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of the best-effort approval step run after a payment lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDisposition {
    /// The quotation was `pending` and is now `approved`
    Approved,
    /// The quotation was already `approved`; nothing to do
    AlreadyApproved,
    /// The quotation is in a terminal non-approved state and was left alone
    Terminal,
}

/// Generates a human-facing reference code, independent of the primary key.
fn generate_reference_code() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("ORD-{}", token[..8].to_uppercase())
}

/// Creates a new quotation with status `pending`.
///
/// Validates that the product name is non-empty, the quantity is positive and
/// at most three priced options are present. Quotations may start unpriced;
/// options are normally added later through [`apply_pricing`]. Identity and
/// the reference code are generated here; the store does not assign keys.
pub async fn create_quotation(
    db: &DatabaseConnection,
    user_id: String,
    product_name: String,
    quantity: i32,
    destination: String,
    shipping_method: String,
    options: Vec<PriceOption>,
    service_fee: f64,
    receiver_name: Option<String>,
    receiver_phone: Option<String>,
    receiver_address: Option<String>,
) -> Result<quotation::Model> {
    if product_name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Product name cannot be empty".to_string(),
        });
    }
    if quantity <= 0 {
        return Err(Error::Validation {
            message: format!("Quantity must be positive, got {quantity}"),
        });
    }
    if options.len() > 3 {
        return Err(Error::Validation {
            message: format!("A quotation carries at most 3 price options, got {}", options.len()),
        });
    }

    let selected = if options.is_empty() { None } else { Some(0) };
    let now = Utc::now();
    let model = quotation::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id),
        reference_code: Set(generate_reference_code()),
        product_name: Set(product_name.trim().to_string()),
        quantity: Set(quantity),
        destination: Set(destination),
        shipping_method: Set(shipping_method),
        options: Set(serde_json::to_value(options)?),
        selected_option: Set(selected),
        service_fee: Set(service_fee),
        status: Set(QuotationStatus::Pending.as_str().to_string()),
        receiver_name: Set(receiver_name),
        receiver_phone: Set(receiver_phone),
        receiver_address: Set(receiver_address),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let result = model.insert(db).await?;
    info!("Created quotation {} ({})", result.id, result.reference_code);
    Ok(result)
}

/// Finds a quotation by its primary key.
pub async fn get_quotation_by_id(
    db: &DatabaseConnection,
    quotation_id: &str,
) -> Result<Option<quotation::Model>> {
    Quotation::find_by_id(quotation_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all quotations for a user, newest first.
pub async fn get_quotations_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<quotation::Model>> {
    Quotation::find()
        .filter(quotation::Column::UserId.eq(user_id))
        .order_by_desc(quotation::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every quotation, newest first. Admin dashboard listing.
pub async fn get_all_quotations(db: &DatabaseConnection) -> Result<Vec<quotation::Model>> {
    Quotation::find()
        .order_by_desc(quotation::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Changes which price option is selected on a quotation.
///
/// Selection is locked once the quotation is approved: approval marks the
/// existence of a payment priced against the current selection, and changing
/// it afterwards would leave the paid amount inconsistent.
pub async fn select_price_option(
    db: &DatabaseConnection,
    quotation_id: &str,
    option_index: usize,
) -> Result<quotation::Model> {
    let model = get_quotation_by_id(db, quotation_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: "quotation",
            id: quotation_id.to_string(),
        })?;

    let status = QuotationStatus::parse(&model.status)?;
    if status == QuotationStatus::Approved {
        return Err(Error::SelectionLocked {
            quotation_id: quotation_id.to_string(),
        });
    }

    let option_count = model.price_options().len();
    if option_index >= option_count {
        return Err(Error::Validation {
            message: format!(
                "Option index {option_index} out of range, quotation has {option_count} options"
            ),
        });
    }

    let mut active: quotation::ActiveModel = model.into();
    active.selected_option = Set(Some(option_index as i32));
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Admin review of a quotation: `pending` moves to `approved` or `rejected`.
pub async fn review_quotation(
    db: &DatabaseConnection,
    quotation_id: &str,
    approve: bool,
) -> Result<quotation::Model> {
    let model = get_quotation_by_id(db, quotation_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: "quotation",
            id: quotation_id.to_string(),
        })?;

    let current = QuotationStatus::parse(&model.status)?;
    let target = if approve {
        QuotationStatus::Approved
    } else {
        QuotationStatus::Rejected
    };
    if !current.allowed_transitions().contains(&target) {
        return Err(Error::IllegalTransition {
            from: current.as_str().to_string(),
            to: target.as_str().to_string(),
        });
    }

    let mut active: quotation::ActiveModel = model.into();
    active.status = Set(target.as_str().to_string());
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

fn parse_positive_number(label: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
        .ok_or_else(|| Error::Validation {
            message: format!("{label} must be a positive number, got {raw:?}"),
        })
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Applies a completed pricing/receiver draft to a quotation.
///
/// Option 1 is mandatory; option 3 is only valid when option 2 is present. An
/// option counts as present when any of its fields is filled, and a present
/// option needs a title and a positive unit price. The caller clears the
/// stored draft after this returns Ok.
pub async fn apply_pricing(
    db: &DatabaseConnection,
    quotation_id: &str,
    draft: &QuotationDraft,
) -> Result<quotation::Model> {
    let model = get_quotation_by_id(db, quotation_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: "quotation",
            id: quotation_id.to_string(),
        })?;

    fn slot_filled(option: &OptionDraft) -> bool {
        [
            &option.title,
            &option.unit_price,
            &option.unit_weight,
            &option.delivery_time,
            &option.description,
            &option.image_url,
            &option.image_url2,
        ]
        .iter()
        .any(|field| !field.trim().is_empty())
    }

    let slots: Vec<&OptionDraft> = draft.options.iter().take(3).collect();
    if !slots.first().copied().is_some_and(slot_filled) {
        return Err(Error::Validation {
            message: "Price option 1 is required".to_string(),
        });
    }
    if slots.get(2).copied().is_some_and(slot_filled)
        && !slots.get(1).copied().is_some_and(slot_filled)
    {
        return Err(Error::Validation {
            message: "Price option 3 requires option 2".to_string(),
        });
    }

    let present: Vec<&OptionDraft> = slots.into_iter().filter(|&slot| slot_filled(slot)).collect();
    let mut options = Vec::with_capacity(present.len());
    for (index, option) in present.iter().enumerate() {
        let title = non_blank(&option.title).ok_or_else(|| Error::Validation {
            message: format!("Price option {} needs a title", index + 1),
        })?;
        let unit_price =
            parse_positive_number(&format!("Option {} unit price", index + 1), &option.unit_price)?;
        let unit_weight = if option.unit_weight.trim().is_empty() {
            0.0
        } else {
            parse_positive_number(&format!("Option {} unit weight", index + 1), &option.unit_weight)?
        };
        options.push(PriceOption {
            title,
            unit_price,
            unit_weight,
            delivery_time: option.delivery_time.trim().to_string(),
            description: option.description.trim().to_string(),
            image_url: non_blank(&option.image_url),
            image_url2: non_blank(&option.image_url2),
        });
    }

    let service_fee = if draft.service_fee.trim().is_empty() {
        0.0
    } else {
        parse_positive_number("Service fee", &draft.service_fee)?
    };

    // Keep an in-range existing selection, otherwise select the first option.
    let selected = model
        .selected_option
        .filter(|index| (*index as usize) < options.len())
        .unwrap_or(0);

    let mut active: quotation::ActiveModel = model.into();
    active.options = Set(serde_json::to_value(options)?);
    active.service_fee = Set(service_fee);
    active.selected_option = Set(Some(selected));
    if let Some(name) = non_blank(&draft.receiver.name) {
        active.receiver_name = Set(Some(name));
    }
    if let Some(phone) = non_blank(&draft.receiver.phone) {
        active.receiver_phone = Set(Some(phone));
    }
    if let Some(address) = non_blank(&draft.receiver.address) {
        active.receiver_address = Set(Some(address));
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Approves a quotation as a payment side effect, tolerating terminal states.
///
/// Idempotent: an already-approved quotation reports `AlreadyApproved` so
/// retries and overlapping payments referencing the same quotation converge.
/// A rejected quotation is never resurrected.
pub async fn approve_quotation(
    db: &DatabaseConnection,
    quotation_id: &str,
) -> Result<ApprovalDisposition> {
    let model = get_quotation_by_id(db, quotation_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: "quotation",
            id: quotation_id.to_string(),
        })?;

    match QuotationStatus::parse(&model.status)? {
        QuotationStatus::Approved => Ok(ApprovalDisposition::AlreadyApproved),
        QuotationStatus::Rejected => {
            warn!("Quotation {quotation_id} is rejected, leaving status untouched");
            Ok(ApprovalDisposition::Terminal)
        }
        QuotationStatus::Pending => {
            let mut active: quotation::ActiveModel = model.into();
            active.status = Set(QuotationStatus::Approved.as_str().to_string());
            active.updated_at = Set(Utc::now());
            active.update(db).await?;
            info!("Quotation {quotation_id} approved");
            Ok(ApprovalDisposition::Approved)
        }
    }
}
