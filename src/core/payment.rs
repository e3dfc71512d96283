//! Payment business logic - Creation saga and admin review.
//!
//! Payment creation is an explicit two-phase sequence with independent failure
//! handling per phase. Phase 1 validates the amount against the referenced
//! quotations and inserts the payment row; any failure there aborts the whole
//! operation. Phase 2 approves the referenced quotations on a detached task
//! with a bounded per-step retry; its failures are logged and reported through
//! [`ApprovalOutcome`], never as a failure of the payment itself. There is no
//! store-level transaction spanning the two collections.

use crate::{
    core::{
        quotation::{ApprovalDisposition, approve_quotation},
        refs::RefDescriptor,
        status::PaymentStatus,
    },
    entities::{Payment, Quotation, payment, quotation},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Amounts are compared against the quoted total within this tolerance.
const AMOUNT_TOLERANCE: f64 = 0.005;

/// Delay between retry attempts of a failed approval step.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Input for [`create_payment`].
#[derive(Debug, Clone)]
pub struct NewPayment {
    /// Authentication identity of the paying user
    pub user_id: String,
    /// Total amount paid
    pub amount: f64,
    /// Payment method
    pub method: String,
    /// Externally generated reference code
    pub reference_number: String,
    /// Referenced quotations in whatever encoding the caller holds
    pub quotation_refs: Option<Json>,
    /// Proof-of-payment asset URL
    pub proof_url: Option<String>,
}

/// What happened to one quotation during the approval phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    /// The quotation the step targeted
    pub quotation_id: String,
    /// Final disposition after retries
    pub outcome: StepOutcome,
}

/// Per-step saga result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Transitioned `pending` -> `approved`
    Approved,
    /// Already approved before this payment; treated as success
    AlreadyApproved,
    /// In a terminal non-approved state; left untouched
    SkippedTerminal,
    /// All attempts failed; the payment stands, the mismatch is audit-visible
    Failed,
}

/// Result of a successful payment creation.
///
/// The payment row is committed before this value exists. `approvals` resolves
/// once the detached side-effect phase finishes; dropping it detaches the task
/// without cancelling it.
#[derive(Debug)]
pub struct PaymentReceipt {
    /// The committed payment row
    pub payment: payment::Model,
    /// Handle on the quotation-approval phase, for tests and audit callers
    pub approvals: JoinHandle<Vec<ApprovalOutcome>>,
}

/// Resolves a payment's reference descriptor to quotation rows.
///
/// Primary path: one batch fetch over the candidate ids, result re-ordered to
/// descriptor order. Fallback path, taken only on zero primary matches: match
/// the reference number against the business reference column. Candidates that
/// match nothing are dropped without error.
async fn resolve_quotations(
    db: &DatabaseConnection,
    descriptor: &RefDescriptor,
) -> Result<Vec<quotation::Model>> {
    if !descriptor.ids().is_empty() {
        let rows = Quotation::find()
            .filter(quotation::Column::Id.is_in(descriptor.ids().to_vec()))
            .all(db)
            .await?;
        if !rows.is_empty() {
            let mut by_id: HashMap<String, quotation::Model> =
                rows.into_iter().map(|row| (row.id.clone(), row)).collect();
            return Ok(descriptor
                .ids()
                .iter()
                .filter_map(|id| by_id.remove(id))
                .collect());
        }
    }

    if let Some(reference_number) = descriptor.reference_number() {
        return Quotation::find()
            .filter(quotation::Column::ReferenceCode.eq(reference_number))
            .all(db)
            .await
            .map_err(Into::into);
    }

    Ok(Vec::new())
}

/// Creates a payment, then approves the referenced quotations best-effort.
///
/// Phase 1 (fatal on failure): resolve the quotation references, check that
/// the amount equals the sum of quoted totals over the resolved quotations,
/// insert the payment row. Phase 2 (detached, best-effort): approve each
/// resolved quotation with up to `retry_attempts` tries per step. The caller
/// gets the committed payment as soon as phase 1 finishes; a quotation left
/// `pending` by a phase 2 failure is tolerated by design.
pub async fn create_payment(
    db: &DatabaseConnection,
    new: NewPayment,
    retry_attempts: u32,
) -> Result<PaymentReceipt> {
    if new.amount <= 0.0 || !new.amount.is_finite() {
        return Err(Error::Validation {
            message: format!("Payment amount must be positive, got {}", new.amount),
        });
    }

    let descriptor = RefDescriptor::new(new.quotation_refs.as_ref(), Some(&new.reference_number));
    let quotations = resolve_quotations(db, &descriptor).await?;

    if quotations.is_empty() {
        // References to deleted or not-yet-visible quotations are legitimate;
        // without a resolved quotation there is no total to check against.
        warn!(
            "Payment {} resolved no quotations, skipping amount check",
            new.reference_number
        );
    } else {
        let expected: f64 = quotations
            .iter()
            .filter_map(quotation::Model::expected_total)
            .sum();
        if (expected - new.amount).abs() > AMOUNT_TOLERANCE {
            return Err(Error::AmountMismatch {
                expected,
                actual: new.amount,
            });
        }
    }

    // Phase 1: the payment row must be committed before any side effect runs.
    let model = payment::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(new.user_id),
        amount: Set(new.amount),
        method: Set(new.method),
        status: Set(PaymentStatus::Pending.as_str().to_string()),
        reference_number: Set(new.reference_number),
        quotation_refs: Set(new.quotation_refs),
        proof_url: Set(new.proof_url),
        created_at: Set(Utc::now()),
    };
    let committed = model.insert(db).await?;
    info!("Created payment {} ({})", committed.id, committed.reference_number);

    // Phase 2: detached so the caller is not held up by the status updates.
    let quotation_ids: Vec<String> = quotations.into_iter().map(|q| q.id).collect();
    let task_db = db.clone();
    let payment_id = committed.id.clone();
    let approvals = tokio::spawn(async move {
        run_approval_phase(&task_db, &payment_id, quotation_ids, retry_attempts).await
    });

    Ok(PaymentReceipt {
        payment: committed,
        approvals,
    })
}

/// Walks the referenced quotations and approves each, one bounded-retry step
/// per quotation. Never fails the surrounding operation.
async fn run_approval_phase(
    db: &DatabaseConnection,
    payment_id: &str,
    quotation_ids: Vec<String>,
    retry_attempts: u32,
) -> Vec<ApprovalOutcome> {
    let mut outcomes = Vec::with_capacity(quotation_ids.len());
    for quotation_id in quotation_ids {
        let mut outcome = StepOutcome::Failed;
        for attempt in 1..=retry_attempts.max(1) {
            match approve_quotation(db, &quotation_id).await {
                Ok(ApprovalDisposition::Approved) => {
                    outcome = StepOutcome::Approved;
                    break;
                }
                Ok(ApprovalDisposition::AlreadyApproved) => {
                    outcome = StepOutcome::AlreadyApproved;
                    break;
                }
                Ok(ApprovalDisposition::Terminal) => {
                    outcome = StepOutcome::SkippedTerminal;
                    break;
                }
                Err(err) => {
                    warn!(
                        "Approval of quotation {quotation_id} for payment {payment_id} \
                         failed on attempt {attempt}: {err}"
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
        if outcome == StepOutcome::Failed {
            error!(
                "Quotation {quotation_id} left pending after payment {payment_id}: \
                 all {retry_attempts} approval attempts failed"
            );
        }
        outcomes.push(ApprovalOutcome {
            quotation_id,
            outcome,
        });
    }
    outcomes
}

/// Finds a payment by its primary key.
pub async fn get_payment_by_id(
    db: &DatabaseConnection,
    payment_id: &str,
) -> Result<Option<payment::Model>> {
    Payment::find_by_id(payment_id).one(db).await.map_err(Into::into)
}

/// Retrieves all payments for a user, newest first.
pub async fn get_payments_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::UserId.eq(user_id))
        .order_by_desc(payment::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every payment, newest first. Admin dashboard listing.
pub async fn get_all_payments(db: &DatabaseConnection) -> Result<Vec<payment::Model>> {
    Payment::find()
        .order_by_desc(payment::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Admin review of a payment: `pending` moves to `approved` or `rejected`.
/// Independent of the referenced quotations' state.
pub async fn approve_payment(
    db: &DatabaseConnection,
    payment_id: &str,
    approve: bool,
) -> Result<payment::Model> {
    let model = get_payment_by_id(db, payment_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            collection: "payment",
            id: payment_id.to_string(),
        })?;

    let current = PaymentStatus::parse(&model.status)?;
    let target = if approve {
        PaymentStatus::Approved
    } else {
        PaymentStatus::Rejected
    };
    if !current.allowed_transitions().contains(&target) {
        return Err(Error::IllegalTransition {
            from: current.as_str().to_string(),
            to: target.as_str().to_string(),
        });
    }

    let mut active: payment::ActiveModel = model.into();
    active.status = Set(target.as_str().to_string());
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::quotation::get_quotation_by_id;
    use crate::test_utils::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_payment_amount_mismatch_leaves_no_row() -> Result<()> {
        let db = setup_test_db().await?;
        // quantity 2 x 40.0 + 5.0 fee = 85.0
        let quotation = create_test_quotation(&db, "user-1").await?;

        let result = create_payment(
            &db,
            NewPayment {
                user_id: "user-1".to_string(),
                amount: 90.0,
                method: "bank_transfer".to_string(),
                reference_number: "PAY-1".to_string(),
                quotation_refs: Some(json!([quotation.id])),
                proof_url: None,
            },
            3,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::AmountMismatch { .. }));

        assert!(get_all_payments(&db).await?.is_empty());
        let reloaded = get_quotation_by_id(&db, &quotation.id).await?.unwrap();
        assert_eq!(reloaded.status, "pending");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_payment_approves_quotation_asynchronously() -> Result<()> {
        let db = setup_test_db().await?;
        let quotation = create_test_quotation(&db, "user-1").await?;

        let receipt = create_payment(
            &db,
            NewPayment {
                user_id: "user-1".to_string(),
                amount: 85.0,
                method: "bank_transfer".to_string(),
                reference_number: "PAY-2".to_string(),
                quotation_refs: Some(json!([quotation.id])),
                proof_url: None,
            },
            3,
        )
        .await?;

        // The payment row is committed before the side-effect phase resolves.
        assert_eq!(receipt.payment.status, "pending");
        assert!(get_payment_by_id(&db, &receipt.payment.id).await?.is_some());

        // The quotation approval lands afterwards, on its own task.
        let mut approved = false;
        for _ in 0..200 {
            let reloaded = get_quotation_by_id(&db, &quotation.id).await?.unwrap();
            if reloaded.status == "approved" {
                approved = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(approved, "quotation never transitioned to approved");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_payment_comma_delimited_refs() -> Result<()> {
        let db = setup_test_db().await?;
        let q1 = create_test_quotation(&db, "user-1").await?;
        let q2 = create_test_quotation(&db, "user-1").await?;

        let receipt = create_payment(
            &db,
            NewPayment {
                user_id: "user-1".to_string(),
                amount: 170.0,
                method: "mobile_money".to_string(),
                reference_number: "PAY-3".to_string(),
                quotation_refs: Some(json!(format!("{}, {}", q1.id, q2.id))),
                proof_url: None,
            },
            3,
        )
        .await?;

        let outcomes = receipt.approvals.await.expect("approval task panicked");
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.outcome == StepOutcome::Approved));

        for id in [&q1.id, &q2.id] {
            let reloaded = get_quotation_by_id(&db, id).await?.unwrap();
            assert_eq!(reloaded.status, "approved");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_payment_reference_number_fallback() -> Result<()> {
        let db = setup_test_db().await?;
        let quotation = create_test_quotation(&db, "user-1").await?;

        // No usable primary keys; the business reference code carries the link.
        let receipt = create_payment(
            &db,
            NewPayment {
                user_id: "user-1".to_string(),
                amount: 85.0,
                method: "bank_transfer".to_string(),
                reference_number: quotation.reference_code.clone(),
                quotation_refs: Some(json!(["no-such-id"])),
                proof_url: None,
            },
            3,
        )
        .await?;

        let outcomes = receipt.approvals.await.expect("approval task panicked");
        assert_eq!(
            outcomes,
            vec![ApprovalOutcome {
                quotation_id: quotation.id.clone(),
                outcome: StepOutcome::Approved,
            }]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_payment_tolerates_rejected_quotation() -> Result<()> {
        let db = setup_test_db().await?;
        let quotation = create_test_quotation(&db, "user-1").await?;
        crate::core::quotation::review_quotation(&db, &quotation.id, false).await?;

        let receipt = create_payment(
            &db,
            NewPayment {
                user_id: "user-1".to_string(),
                amount: 85.0,
                method: "bank_transfer".to_string(),
                reference_number: "PAY-4".to_string(),
                quotation_refs: Some(json!([quotation.id])),
                proof_url: None,
            },
            3,
        )
        .await?;

        let outcomes = receipt.approvals.await.expect("approval task panicked");
        assert_eq!(outcomes[0].outcome, StepOutcome::SkippedTerminal);
        let reloaded = get_quotation_by_id(&db, &quotation.id).await?.unwrap();
        assert_eq!(reloaded.status, "rejected");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_payment_unresolved_refs_skips_amount_check() -> Result<()> {
        let db = setup_test_db().await?;

        let receipt = create_payment(
            &db,
            NewPayment {
                user_id: "user-1".to_string(),
                amount: 12.0,
                method: "bank_transfer".to_string(),
                reference_number: "PAY-5".to_string(),
                quotation_refs: Some(json!(["gone-1", "gone-2"])),
                proof_url: None,
            },
            3,
        )
        .await?;

        let outcomes = receipt.approvals.await.expect("approval task panicked");
        assert!(outcomes.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_payment_pipeline() -> Result<()> {
        let db = setup_test_db().await?;
        let payment = create_test_payment(&db, "user-1", 12.0).await?;

        let updated = approve_payment(&db, &payment.id, true).await?;
        assert_eq!(updated.status, "approved");

        let result = approve_payment(&db, &payment.id, false).await;
        assert!(matches!(result.unwrap_err(), Error::IllegalTransition { .. }));
        Ok(())
    }
}
