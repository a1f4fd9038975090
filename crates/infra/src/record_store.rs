//! In-memory exchange record store.

use std::sync::RwLock;

use chrono::Utc;
use tracing::debug;

use fieldrep_core::{Aggregate, DomainError, ExchangeId, OperatorId};
use fieldrep_events::{Event, EventLog, Recorded};
use fieldrep_exchange::{
    ExchangeCommand, ExchangeEvent, ExchangeRecord, ExchangeRecordStore, FulfillExchange,
    NewExchangeRecord, StoreError,
};

#[derive(Debug, Clone)]
struct StoredRecord {
    request: NewExchangeRecord,
    record: ExchangeRecord,
    history: EventLog<ExchangeEvent>,
}

/// Exchange record store kept in process memory.
///
/// Intended for tests/dev. Records are kept in creation order, so
/// `list_pending` returns the oldest record first.
#[derive(Debug, Default)]
pub struct InMemoryExchangeRecordStore {
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryExchangeRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events applied to a record, oldest first.
    pub fn history(
        &self,
        exchange_id: ExchangeId,
    ) -> Result<Vec<Recorded<ExchangeEvent>>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        records
            .iter()
            .find(|r| r.record.id_typed() == exchange_id)
            .map(|r| r.history.entries().to_vec())
            .ok_or(StoreError::NotFound(exchange_id))
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().map_err(|_| poisoned())?.len())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl ExchangeRecordStore for InMemoryExchangeRecordStore {
    fn create(&self, request: NewExchangeRecord) -> Result<ExchangeId, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let exchange_id = request.exchange_id;

        if let Some(existing) = records.iter().find(|r| r.record.id_typed() == exchange_id) {
            // Same request replayed (e.g. a retry after a lost response).
            if existing.request == request {
                return Ok(exchange_id);
            }
            return Err(DomainError::conflict("exchange id already used").into());
        }

        let mut record = ExchangeRecord::empty(exchange_id);
        let command = ExchangeCommand::RecordExchange(request.clone().into_command(Utc::now()));
        let events = record.handle(&command)?;
        for event in &events {
            record.apply(event);
        }
        let mut history = EventLog::new();
        history.append(events);

        debug!(
            exchange_id = %exchange_id,
            version = history.version(),
            status = ?record.status(),
            total_value = %record.total_value(),
            "exchange record created"
        );

        records.push(StoredRecord {
            request,
            record,
            history,
        });
        Ok(exchange_id)
    }

    fn fulfill(&self, exchange_id: ExchangeId) -> Result<ExchangeRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let stored = records
            .iter_mut()
            .find(|r| r.record.id_typed() == exchange_id)
            .ok_or(StoreError::NotFound(exchange_id))?;

        let command = ExchangeCommand::FulfillExchange(FulfillExchange {
            exchange_id,
            occurred_at: Utc::now(),
        });
        let events = stored.record.handle(&command)?;
        for event in &events {
            stored.record.apply(event);
            debug!(exchange_id = %exchange_id, event = %event.schema(), "exchange event applied");
        }
        stored.history.append(events);

        Ok(stored.record.clone())
    }

    fn get(&self, exchange_id: ExchangeId) -> Result<Option<ExchangeRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .iter()
            .find(|r| r.record.id_typed() == exchange_id)
            .map(|r| r.record.clone()))
    }

    fn list_pending(&self, operator_id: OperatorId) -> Result<Vec<ExchangeRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .iter()
            .filter(|r| r.record.is_pending() && r.record.operator_id() == Some(operator_id))
            .map(|r| r.record.clone())
            .collect())
    }
}
