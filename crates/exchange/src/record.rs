//! Exchange record aggregate (event-sourced).
//!
//! Created once per confirmed workflow run. Status is monotonic:
//! `Pending -> Fulfilled` exactly once; `Fulfilled` is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldrep_core::{
    Aggregate, AggregateRoot, DomainError, ExchangeId, LocationId, Money, OperatorId,
};
use fieldrep_events::Event;

use crate::line_item::LineItem;

/// Exchange status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    /// Physical completion deferred to a later visit.
    Pending,
    Fulfilled,
}

/// Aggregate root: ExchangeRecord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    id: ExchangeId,
    operator_id: Option<OperatorId>,
    location_id: Option<LocationId>,
    removed: Vec<LineItem>,
    replacement: Vec<LineItem>,
    bundle_id: String,
    total_value: Money,
    status: ExchangeStatus,
    created_at: Option<DateTime<Utc>>,
    fulfilled_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl ExchangeRecord {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ExchangeId) -> Self {
        Self {
            id,
            operator_id: None,
            location_id: None,
            removed: Vec::new(),
            replacement: Vec::new(),
            bundle_id: String::new(),
            total_value: Money::ZERO,
            status: ExchangeStatus::Pending,
            created_at: None,
            fulfilled_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ExchangeId {
        self.id
    }

    pub fn operator_id(&self) -> Option<OperatorId> {
        self.operator_id
    }

    pub fn location_id(&self) -> Option<LocationId> {
        self.location_id
    }

    pub fn removed(&self) -> &[LineItem] {
        &self.removed
    }

    pub fn replacement(&self) -> &[LineItem] {
        &self.replacement
    }

    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    /// Value of the replacement lines.
    pub fn total_value(&self) -> Money {
        self.total_value
    }

    pub fn status(&self) -> ExchangeStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn fulfilled_at(&self) -> Option<DateTime<Utc>> {
        self.fulfilled_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_pending(&self) -> bool {
        self.created && self.status == ExchangeStatus::Pending
    }
}

impl AggregateRoot for ExchangeRecord {
    type Id = ExchangeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordExchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordExchange {
    pub exchange_id: ExchangeId,
    pub operator_id: OperatorId,
    pub location_id: LocationId,
    pub removed: Vec<LineItem>,
    pub replacement: Vec<LineItem>,
    pub bundle_id: String,
    pub status: ExchangeStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FulfillExchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillExchange {
    pub exchange_id: ExchangeId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeCommand {
    RecordExchange(RecordExchange),
    FulfillExchange(FulfillExchange),
}

/// Event: ExchangeRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRecorded {
    pub exchange_id: ExchangeId,
    pub operator_id: OperatorId,
    pub location_id: LocationId,
    pub removed: Vec<LineItem>,
    pub replacement: Vec<LineItem>,
    pub bundle_id: String,
    pub total_value: Money,
    pub status: ExchangeStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ExchangeFulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeFulfilled {
    pub exchange_id: ExchangeId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeEvent {
    ExchangeRecorded(ExchangeRecorded),
    ExchangeFulfilled(ExchangeFulfilled),
}

impl Event for ExchangeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ExchangeEvent::ExchangeRecorded(_) => "exchange.record.created",
            ExchangeEvent::ExchangeFulfilled(_) => "exchange.record.fulfilled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ExchangeEvent::ExchangeRecorded(e) => e.occurred_at,
            ExchangeEvent::ExchangeFulfilled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ExchangeRecord {
    type Command = ExchangeCommand;
    type Event = ExchangeEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ExchangeEvent::ExchangeRecorded(e) => {
                self.id = e.exchange_id;
                self.operator_id = Some(e.operator_id);
                self.location_id = Some(e.location_id);
                self.removed = e.removed.clone();
                self.replacement = e.replacement.clone();
                self.bundle_id = e.bundle_id.clone();
                self.total_value = e.total_value;
                self.status = e.status;
                self.created_at = Some(e.occurred_at);
                if e.status == ExchangeStatus::Fulfilled {
                    self.fulfilled_at = Some(e.occurred_at);
                }
                self.created = true;
            }
            ExchangeEvent::ExchangeFulfilled(e) => {
                self.status = ExchangeStatus::Fulfilled;
                self.fulfilled_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ExchangeCommand::RecordExchange(cmd) => self.handle_record(cmd),
            ExchangeCommand::FulfillExchange(cmd) => self.handle_fulfill(cmd),
        }
    }
}

impl ExchangeRecord {
    fn ensure_exchange_id(&self, exchange_id: ExchangeId) -> Result<(), DomainError> {
        if self.id != exchange_id {
            return Err(DomainError::invariant("exchange_id mismatch"));
        }
        Ok(())
    }

    fn handle_record(&self, cmd: &RecordExchange) -> Result<Vec<ExchangeEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("exchange already recorded"));
        }
        self.ensure_exchange_id(cmd.exchange_id)?;

        if !cmd.removed.iter().any(|i| i.quantity > 0) {
            return Err(DomainError::validation(
                "exchange needs at least one removed product",
            ));
        }
        if !cmd.replacement.iter().any(|i| i.quantity > 0) {
            return Err(DomainError::validation(
                "exchange needs at least one replacement product",
            ));
        }
        for (idx, item) in cmd.replacement.iter().enumerate() {
            if cmd.replacement[..idx]
                .iter()
                .any(|other| other.product_id() == item.product_id())
            {
                return Err(DomainError::invariant(
                    "replacement lines must reference distinct products",
                ));
            }
        }

        let total_value: Money = cmd.replacement.iter().map(LineItem::value).sum();

        Ok(vec![ExchangeEvent::ExchangeRecorded(ExchangeRecorded {
            exchange_id: cmd.exchange_id,
            operator_id: cmd.operator_id,
            location_id: cmd.location_id,
            removed: cmd.removed.clone(),
            replacement: cmd.replacement.clone(),
            bundle_id: cmd.bundle_id.clone(),
            total_value,
            status: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_fulfill(&self, cmd: &FulfillExchange) -> Result<Vec<ExchangeEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_exchange_id(cmd.exchange_id)?;

        if self.status == ExchangeStatus::Fulfilled {
            return Err(DomainError::conflict("exchange already fulfilled"));
        }

        Ok(vec![ExchangeEvent::ExchangeFulfilled(ExchangeFulfilled {
            exchange_id: cmd.exchange_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
