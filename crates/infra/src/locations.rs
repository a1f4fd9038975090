//! In-memory location directory.

use std::sync::RwLock;

use chrono::Utc;
use tracing::debug;

use fieldrep_core::{LocationId, OperatorId};
use fieldrep_locations::{Location, LocationDirectory, LocationError, VisitRecorded};

/// Location list kept in process memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryLocationDirectory {
    locations: RwLock<Vec<Location>>,
}

impl InMemoryLocationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_locations(locations: impl IntoIterator<Item = Location>) -> Self {
        Self {
            locations: RwLock::new(locations.into_iter().collect()),
        }
    }

    pub fn get(&self, location_id: LocationId) -> Result<Option<Location>, LocationError> {
        let locations = self.locations.read().map_err(|_| poisoned())?;
        Ok(locations.iter().find(|l| l.id == location_id).cloned())
    }
}

fn poisoned() -> LocationError {
    LocationError::Unavailable("lock poisoned".to_string())
}

impl LocationDirectory for InMemoryLocationDirectory {
    fn list(&self) -> Result<Vec<Location>, LocationError> {
        Ok(self.locations.read().map_err(|_| poisoned())?.clone())
    }

    fn record_visit(
        &self,
        location_id: LocationId,
        operator_id: OperatorId,
    ) -> Result<VisitRecorded, LocationError> {
        let mut locations = self.locations.write().map_err(|_| poisoned())?;
        let location = locations
            .iter_mut()
            .find(|l| l.id == location_id)
            .ok_or(LocationError::UnknownLocation(location_id))?;

        let now = Utc::now();
        location.visit_count = location.visit_count.saturating_add(1);
        location.last_visit_at = Some(now);

        debug!(
            location_id = %location_id,
            operator_id = %operator_id,
            visit_count = location.visit_count,
            "visit recorded"
        );

        Ok(VisitRecorded {
            location_id,
            operator_id,
            visit_count: location.visit_count,
            occurred_at: now,
        })
    }
}
