//! Exchange record persistence boundary.
//!
//! Status transitions are owned by the store: the workflow only asks for a
//! record to be created (Pending or Fulfilled) and a later, separate caller
//! asks for a Pending record to be fulfilled.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fieldrep_core::{DomainError, ExchangeId, LocationId, OperatorId};

use crate::line_item::LineItem;
use crate::record::{ExchangeRecord, ExchangeStatus, RecordExchange};

/// Request to persist a confirmed exchange.
///
/// `exchange_id` is chosen by the caller so a retried create after a lost
/// response does not produce a second record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExchangeRecord {
    pub exchange_id: ExchangeId,
    pub operator_id: OperatorId,
    pub location_id: LocationId,
    pub removed: Vec<LineItem>,
    pub replacement: Vec<LineItem>,
    pub bundle_id: String,
    pub status: ExchangeStatus,
}

impl NewExchangeRecord {
    pub fn into_command(self, occurred_at: DateTime<Utc>) -> RecordExchange {
        RecordExchange {
            exchange_id: self.exchange_id,
            operator_id: self.operator_id,
            location_id: self.location_id,
            removed: self.removed,
            replacement: self.replacement,
            bundle_id: self.bundle_id,
            status: self.status,
            occurred_at,
        }
    }
}

/// Exchange record store failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Network/storage failure; the operation may be retried.
    #[error("exchange store unavailable: {0}")]
    Unavailable(String),

    #[error("exchange record not found: {0}")]
    NotFound(ExchangeId),

    /// The store rejected the request (validation, conflict).
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// External exchange record store.
pub trait ExchangeRecordStore: Send + Sync {
    /// Persist a new record; returns its id.
    ///
    /// Creating the same `exchange_id` again with identical content succeeds
    /// without creating a second record.
    fn create(&self, record: NewExchangeRecord) -> Result<ExchangeId, StoreError>;

    /// Flip a Pending record to Fulfilled.
    ///
    /// A second fulfill on the same record is rejected with
    /// `StoreError::Domain(DomainError::Conflict(..))`.
    fn fulfill(&self, exchange_id: ExchangeId) -> Result<ExchangeRecord, StoreError>;

    fn get(&self, exchange_id: ExchangeId) -> Result<Option<ExchangeRecord>, StoreError>;

    /// Pending records for one operator, oldest first.
    fn list_pending(&self, operator_id: OperatorId) -> Result<Vec<ExchangeRecord>, StoreError>;
}

impl<S> ExchangeRecordStore for Arc<S>
where
    S: ExchangeRecordStore + ?Sized,
{
    fn create(&self, record: NewExchangeRecord) -> Result<ExchangeId, StoreError> {
        (**self).create(record)
    }

    fn fulfill(&self, exchange_id: ExchangeId) -> Result<ExchangeRecord, StoreError> {
        (**self).fulfill(exchange_id)
    }

    fn get(&self, exchange_id: ExchangeId) -> Result<Option<ExchangeRecord>, StoreError> {
        (**self).get(exchange_id)
    }

    fn list_pending(&self, operator_id: OperatorId) -> Result<Vec<ExchangeRecord>, StoreError> {
        (**self).list_pending(operator_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_transient() {
        assert!(StoreError::Unavailable("timeout".into()).is_transient());
        assert!(!StoreError::NotFound(ExchangeId::new()).is_transient());
        assert!(!StoreError::from(DomainError::conflict("exchange already fulfilled")).is_transient());
    }
}
