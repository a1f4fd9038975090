use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fieldrep_core::{Entity, LocationId, OperatorId};
use fieldrep_events::Event;

/// A retail location (store, outlet) on a representative's route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub address: Option<String>,
    /// Number of recorded visits (drives visit-frequency planning).
    pub visit_count: u32,
    pub last_visit_at: Option<DateTime<Utc>>,
}

impl Location {
    pub fn new(id: LocationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            address: None,
            visit_count: 0,
            last_visit_at: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Event: a representative visited a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecorded {
    pub location_id: LocationId,
    pub operator_id: OperatorId,
    /// Visit count after this visit.
    pub visit_count: u32,
    pub occurred_at: DateTime<Utc>,
}

impl Event for VisitRecorded {
    fn event_type(&self) -> &'static str {
        "locations.visit.recorded"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Location directory failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("location directory unavailable: {0}")]
    Unavailable(String),

    #[error("unknown location: {0}")]
    UnknownLocation(LocationId),
}

/// Location/visit collaborator.
///
/// `record_visit` is side-effecting and is called once per confirmed exchange.
pub trait LocationDirectory: Send + Sync {
    fn list(&self) -> Result<Vec<Location>, LocationError>;

    fn record_visit(
        &self,
        location_id: LocationId,
        operator_id: OperatorId,
    ) -> Result<VisitRecorded, LocationError>;
}

impl<D> LocationDirectory for Arc<D>
where
    D: LocationDirectory + ?Sized,
{
    fn list(&self) -> Result<Vec<Location>, LocationError> {
        (**self).list()
    }

    fn record_visit(
        &self,
        location_id: LocationId,
        operator_id: OperatorId,
    ) -> Result<VisitRecorded, LocationError> {
        (**self).record_visit(location_id, operator_id)
    }
}
