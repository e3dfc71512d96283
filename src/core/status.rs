//! Status pipeline - Lifecycle states and transition rules.
//!
//! Statuses are stored as strings in the record collections and parsed into
//! typed enums at the operation boundary. Each pipeline has an explicit
//! transition table; every status-changing operation in the crate validates
//! against it before touching the store.

use crate::errors::{Error, Result};

/// Quotation lifecycle. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotationStatus {
    /// Awaiting payment or an admin decision
    Pending,
    /// Approved, normally as a side effect of a successful payment
    Approved,
    /// Rejected by an admin
    Rejected,
}

/// Payment lifecycle. Admin-driven, independent of quotation state once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Recorded, awaiting admin review of the proof of payment
    Pending,
    /// Confirmed by an admin
    Approved,
    /// Rejected by an admin
    Rejected,
}

/// Shipment lifecycle. `Delivered` is terminal; `Delayed` is reachable from
/// any non-terminal state and can resume forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipmentStatus {
    /// Created, receiver information not yet submitted
    Waiting,
    /// Receiver information submitted, goods being prepared
    Processing,
    /// Goods en route
    InTransit,
    /// Goods delivered
    Delivered,
    /// Shipment held up; resumes to a forward state
    Delayed,
}

impl QuotationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::InvalidStatus { value: other.to_string() }),
        }
    }

    pub fn allowed_transitions(self) -> Vec<Self> {
        match self {
            Self::Pending => vec![Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => vec![],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(Error::InvalidStatus { value: other.to_string() }),
        }
    }

    pub fn allowed_transitions(self) -> Vec<Self> {
        match self {
            Self::Pending => vec![Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => vec![],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl ShipmentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Processing => "processing",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Delayed => "delayed",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "waiting" => Ok(Self::Waiting),
            "processing" => Ok(Self::Processing),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "delayed" => Ok(Self::Delayed),
            other => Err(Error::InvalidStatus { value: other.to_string() }),
        }
    }

    /// The in-transit stage is optional, so `Processing` may go straight to
    /// `Delivered`. `Delayed` resumes forward but never back to `Waiting`.
    pub fn allowed_transitions(self) -> Vec<Self> {
        match self {
            Self::Waiting => vec![Self::Processing, Self::Delayed],
            Self::Processing => vec![Self::InTransit, Self::Delivered, Self::Delayed],
            Self::InTransit => vec![Self::Delivered, Self::Delayed],
            Self::Delayed => vec![Self::Processing, Self::InTransit, Self::Delivered],
            Self::Delivered => vec![],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Validates a transition against the table.
    pub fn validate_transition(self, to: Self) -> Result<()> {
        if self.allowed_transitions().contains(&to) {
            Ok(())
        } else {
            Err(Error::IllegalTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}
