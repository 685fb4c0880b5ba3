use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Errors raised when a submitted transaction is malformed
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Malformed transaction: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A transfer of some resource between two parties.
///
/// Field order is part of the block digest: the hash engine serializes
/// transactions exactly in the order declared here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Unique identifier for the transaction
    #[serde(rename = "transactionId")]
    pub id: String,

    /// Opaque descriptor of what is being transacted
    #[serde(rename = "urlResource")]
    pub resource: String,

    /// Amount being transferred
    pub amount: f64,

    /// Sender identity (not authenticated)
    pub sender: String,

    /// Recipient identity
    pub recipient: String,

    /// Timestamp when the transaction was created
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new transaction stamped with a fresh id and the current time
    pub fn new(
        resource: impl Into<String>,
        amount: f64,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Transaction {
            id: Uuid::new_v4().simple().to_string(),
            resource: resource.into(),
            amount,
            sender: sender.into(),
            recipient: recipient.into(),
            timestamp: Utc::now(),
        }
    }

    /// Parses a transaction received from a peer and checks it
    pub fn from_json(value: serde_json::Value) -> Result<Self, TransactionError> {
        let transaction: Transaction = serde_json::from_value(value)?;
        transaction.validate()?;
        Ok(transaction)
    }

    /// Checks the fields that serde cannot: no empty identities, a usable amount
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.id.trim().is_empty() {
            return Err(TransactionError::MissingField("transactionId"));
        }
        if self.sender.trim().is_empty() {
            return Err(TransactionError::MissingField("sender"));
        }
        if self.recipient.trim().is_empty() {
            return Err(TransactionError::MissingField("recipient"));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(TransactionError::InvalidAmount(format!(
                "{} is not a finite, non-negative number",
                self.amount
            )));
        }

        Ok(())
    }
}
