//! Submission wizard - Strictly linear multi-step quotation creation.
//!
//! Three steps share one form: product details, shipping, receiver. Advancing
//! validates the current step and refuses without moving; going back never
//! validates. Nothing is written remotely until final submission, which
//! re-validates every step, so an abandoned wizard leaves no partial records.
//! A guard refuses re-entrant and repeat submission of the same draft.

use crate::{
    core::draft::{DraftManager, DraftStore},
    entities::quotation,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;

/// Number of steps in the wizard.
pub const STEP_COUNT: usize = 3;

/// Shared form state across all steps. Raw text inputs, parsed at validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotationForm {
    pub product_name: String,
    pub quantity: String,
    pub destination: String,
    pub shipping_method: String,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub receiver_address: String,
}

/// The wizard state machine. Steps are 1-based.
#[derive(Debug)]
pub struct QuotationWizard {
    user_id: String,
    step: usize,
    form: QuotationForm,
    in_flight: bool,
    submitted: bool,
}

fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation {
            message: message.to_string(),
        });
    }
    Ok(())
}

impl QuotationWizard {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            step: 1,
            form: QuotationForm::default(),
            in_flight: false,
            submitted: false,
        }
    }

    /// Current 1-based step.
    pub fn current_step(&self) -> usize {
        self.step
    }

    pub fn form(&self) -> &QuotationForm {
        &self.form
    }

    /// Mutable access for the UI's field bindings. Edits alone never move the
    /// step or touch the store.
    pub fn form_mut(&mut self) -> &mut QuotationForm {
        &mut self.form
    }

    /// Key under which the UI persists this wizard's form between reloads.
    pub fn draft_key(&self) -> String {
        format!("wizard:{}", self.user_id)
    }

    /// Parses the quantity input into a positive integer.
    fn parsed_quantity(&self) -> Result<i32> {
        let raw = self.form.quantity.trim();
        raw.parse::<i32>()
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| Error::Validation {
                message: format!("Quantity must be a positive whole number, got {raw:?}"),
            })
    }

    /// Validates one step's required fields.
    fn validate_step(&self, step: usize) -> Result<()> {
        match step {
            1 => {
                require(&self.form.product_name, "Product name is required")?;
                self.parsed_quantity()?;
                Ok(())
            }
            2 => {
                require(&self.form.destination, "Shipping destination is required")?;
                require(&self.form.shipping_method, "Shipping method is required")
            }
            3 => {
                require(&self.form.receiver_name, "Receiver name is required")?;
                require(&self.form.receiver_phone, "Receiver phone is required")
            }
            other => Err(Error::Validation {
                message: format!("Unknown wizard step {other}"),
            }),
        }
    }

    /// Moves to the next step if the current one validates. On refusal the
    /// step does not change.
    pub fn advance(&mut self) -> Result<usize> {
        if self.step >= STEP_COUNT {
            return Err(Error::Validation {
                message: "Already at the final step".to_string(),
            });
        }
        self.validate_step(self.step)?;
        self.step += 1;
        Ok(self.step)
    }

    /// Moves one step back. Always permitted, never validated.
    pub fn back(&mut self) -> usize {
        if self.step > 1 {
            self.step -= 1;
        }
        self.step
    }

    /// Final submission: re-validates every step, then creates the quotation.
    ///
    /// Priced options are added later through the pricing form; the quotation
    /// is created unpriced with status `pending`. Refuses while a submission
    /// is in flight and after one has succeeded, so double-clicks cannot
    /// create duplicate records.
    pub async fn submit(&mut self, db: &DatabaseConnection) -> Result<quotation::Model> {
        if self.in_flight {
            return Err(Error::SubmissionInFlight);
        }
        if self.submitted {
            return Err(Error::Validation {
                message: "This draft has already been submitted".to_string(),
            });
        }
        for step in 1..=STEP_COUNT {
            self.validate_step(step)?;
        }
        let quantity = self.parsed_quantity()?;

        self.in_flight = true;
        let result = crate::core::quotation::create_quotation(
            db,
            self.user_id.clone(),
            self.form.product_name.clone(),
            quantity,
            self.form.destination.trim().to_string(),
            self.form.shipping_method.trim().to_string(),
            Vec::new(),
            0.0,
            Some(self.form.receiver_name.trim().to_string()),
            Some(self.form.receiver_phone.trim().to_string()),
            Some(self.form.receiver_address.trim().to_string()).filter(|a| !a.is_empty()),
        )
        .await;
        self.in_flight = false;

        let created = result?;
        self.submitted = true;
        Ok(created)
    }

    /// [`Self::submit`], then deletes the wizard's persisted form so the next
    /// open starts clean.
    pub async fn submit_and_clear<S: DraftStore>(
        &mut self,
        db: &DatabaseConnection,
        drafts: &DraftManager<S>,
    ) -> Result<quotation::Model> {
        let created = self.submit(db).await?;
        drafts.clear(&self.draft_key()).await?;
        Ok(created)
    }
}
