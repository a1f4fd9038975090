//! Exchange workflow state machine.
//!
//! One workflow instance per operator session. States carry the data they
//! need, so an illegal step (e.g. committing without a chosen bundle) cannot
//! be expressed. `ExchangeWorkflow::dispatch` is the single entry point.
//! `ChooseLocation` reads the location directory and `Commit` writes the
//! record; every other action is a pure transition.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use fieldrep_catalog::{Catalog, CatalogError, Product};
use fieldrep_core::{DomainError, ExchangeId, LocationId, OperatorId, ProductId};
use fieldrep_locations::{Location, LocationDirectory, LocationError};

use crate::abort::AbortHandle;
use crate::bundle::BundleCandidate;
use crate::engine::{BundleEngine, CalculationBasis, Recommendation, RecommendationRequest};
use crate::error::RecommendError;
use crate::line_item::{AvailabilitySet, LineItem, RemovalSet};
use crate::manual::ManualBundleBuilder;
use crate::record::ExchangeStatus;
use crate::store::{ExchangeRecordStore, NewExchangeRecord, StoreError};

/// Operator input gathered before calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub removed: RemovalSet,
    pub available: AvailabilitySet,
    /// Resolved against the location directory when chosen.
    pub location: Option<Location>,
}

/// A finished calculation and the input it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub selection: Selection,
    pub location: Location,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExchangeState {
    SelectingRemoved {
        selection: Selection,
    },
    SelectingAvailable {
        selection: Selection,
    },
    SelectingLocation {
        selection: Selection,
    },
    Calculating {
        selection: Selection,
        location: Location,
    },
    ReviewingSuggestions {
        review: Review,
    },
    ConfirmingLocation {
        review: Review,
        chosen: BundleCandidate,
    },
    ConfirmingExchange {
        review: Review,
        chosen: BundleCandidate,
        /// Fixed when the location is confirmed so retried commits are idempotent.
        exchange_id: ExchangeId,
        last_error: Option<String>,
    },
    Completed {
        record_id: ExchangeId,
        status: ExchangeStatus,
        visit_recorded: bool,
    },
}

impl Default for ExchangeState {
    fn default() -> Self {
        ExchangeState::SelectingRemoved {
            selection: Selection::default(),
        }
    }
}

impl ExchangeState {
    pub fn name(&self) -> &'static str {
        match self {
            ExchangeState::SelectingRemoved { .. } => "selecting_removed",
            ExchangeState::SelectingAvailable { .. } => "selecting_available",
            ExchangeState::SelectingLocation { .. } => "selecting_location",
            ExchangeState::Calculating { .. } => "calculating",
            ExchangeState::ReviewingSuggestions { .. } => "reviewing_suggestions",
            ExchangeState::ConfirmingLocation { .. } => "confirming_location",
            ExchangeState::ConfirmingExchange { .. } => "confirming_exchange",
            ExchangeState::Completed { .. } => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExchangeState::Completed { .. })
    }

    /// The bundle currently chosen for confirmation, if any.
    pub fn chosen(&self) -> Option<&BundleCandidate> {
        match self {
            ExchangeState::ConfirmingLocation { chosen, .. }
            | ExchangeState::ConfirmingExchange { chosen, .. } => Some(chosen),
            _ => None,
        }
    }

    /// The location the exchange will be recorded against, once chosen.
    pub fn location(&self) -> Option<&Location> {
        match self {
            ExchangeState::SelectingLocation { selection } => selection.location.as_ref(),
            ExchangeState::Calculating { location, .. } => Some(location),
            ExchangeState::ReviewingSuggestions { review }
            | ExchangeState::ConfirmingLocation { review, .. }
            | ExchangeState::ConfirmingExchange { review, .. } => Some(&review.location),
            _ => None,
        }
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            ExchangeState::ReviewingSuggestions { review }
            | ExchangeState::ConfirmingLocation { review, .. }
            | ExchangeState::ConfirmingExchange { review, .. } => Some(&review.recommendation),
            _ => None,
        }
    }
}

/// How a confirmed exchange is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Exchange happens now: record is created Fulfilled.
    ConfirmNow,
    /// Physical completion later: record is created Pending.
    Defer,
}

impl CommitMode {
    pub fn status(self) -> ExchangeStatus {
        match self {
            CommitMode::ConfirmNow => ExchangeStatus::Fulfilled,
            CommitMode::Defer => ExchangeStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowAction {
    AddRemoved { product: Product, quantity: u32 },
    DropRemoved(ProductId),
    AddAvailable { product: Product, quantity: u32 },
    DropAvailable(ProductId),
    /// Advance from the current selection step.
    Continue,
    /// Go straight from removals to location choice with no availability set.
    SkipAvailability,
    Back,
    ChooseLocation(LocationId),
    Calculate,
    SuggestionsReady(Recommendation),
    /// Calculation did not finish (aborted or failed); input is kept.
    CancelCalculation,
    SelectSuggestion(String),
    UseManualBundle(BundleCandidate),
    ConfirmLocation,
    RejectLocation,
    ChangeBundle,
    Commit(CommitMode),
}

impl WorkflowAction {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowAction::AddRemoved { .. } => "add_removed",
            WorkflowAction::DropRemoved(_) => "drop_removed",
            WorkflowAction::AddAvailable { .. } => "add_available",
            WorkflowAction::DropAvailable(_) => "drop_available",
            WorkflowAction::Continue => "continue",
            WorkflowAction::SkipAvailability => "skip_availability",
            WorkflowAction::Back => "back",
            WorkflowAction::ChooseLocation(_) => "choose_location",
            WorkflowAction::Calculate => "calculate",
            WorkflowAction::SuggestionsReady(_) => "suggestions_ready",
            WorkflowAction::CancelCalculation => "cancel_calculation",
            WorkflowAction::SelectSuggestion(_) => "select_suggestion",
            WorkflowAction::UseManualBundle(_) => "use_manual_bundle",
            WorkflowAction::ConfirmLocation => "confirm_location",
            WorkflowAction::RejectLocation => "reject_location",
            WorkflowAction::ChangeBundle => "change_bundle",
            WorkflowAction::Commit(_) => "commit",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("action `{action}` is not allowed in state `{state}`")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error(transparent)]
    Recommend(#[from] RecommendError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Locations(#[from] LocationError),

    /// Record creation failed; the workflow stays in `ConfirmingExchange`.
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl WorkflowError {
    fn invalid(state: &ExchangeState, action: &WorkflowAction) -> Self {
        WorkflowError::InvalidTransition {
            state: state.name(),
            action: action.name(),
        }
    }
}

/// Compute the successor state for every action except `ChooseLocation` and
/// `Commit`. Those need the location directory or the record store and are
/// handled by `ExchangeWorkflow::dispatch`; passing them here is an
/// `InvalidTransition`.
pub fn next(state: &ExchangeState, action: WorkflowAction) -> Result<ExchangeState, WorkflowError> {
    use ExchangeState as S;
    use WorkflowAction as A;

    let invalid = WorkflowError::invalid(state, &action);

    match (state, action) {
        (S::SelectingRemoved { selection }, A::AddRemoved { product, quantity }) => {
            let mut selection = selection.clone();
            selection.removed.add(LineItem::new(product, quantity));
            Ok(S::SelectingRemoved { selection })
        }
        (S::SelectingRemoved { selection }, A::DropRemoved(product_id)) => {
            let mut selection = selection.clone();
            selection.removed.remove(product_id);
            Ok(S::SelectingRemoved { selection })
        }
        (S::SelectingRemoved { selection }, A::Continue) => {
            ensure_actionable(&selection.removed)?;
            Ok(S::SelectingAvailable {
                selection: selection.clone(),
            })
        }
        (S::SelectingRemoved { selection }, A::SkipAvailability) => {
            ensure_actionable(&selection.removed)?;
            let mut selection = selection.clone();
            selection.available = AvailabilitySet::new();
            Ok(S::SelectingLocation { selection })
        }

        (S::SelectingAvailable { selection }, A::AddAvailable { product, quantity }) => {
            let mut selection = selection.clone();
            selection.available.add(LineItem::new(product, quantity));
            Ok(S::SelectingAvailable { selection })
        }
        (S::SelectingAvailable { selection }, A::DropAvailable(product_id)) => {
            let mut selection = selection.clone();
            selection.available.remove(product_id);
            Ok(S::SelectingAvailable { selection })
        }
        (S::SelectingAvailable { selection }, A::Continue) => Ok(S::SelectingLocation {
            selection: selection.clone(),
        }),
        (S::SelectingAvailable { selection }, A::Back) => Ok(S::SelectingRemoved {
            selection: selection.clone(),
        }),

        (S::SelectingLocation { selection }, A::Back) => Ok(S::SelectingAvailable {
            selection: selection.clone(),
        }),
        (S::SelectingLocation { selection }, A::Calculate) => {
            ensure_actionable(&selection.removed)?;
            let location = selection
                .location
                .clone()
                .ok_or_else(|| DomainError::validation("choose a location before calculating"))?;
            Ok(S::Calculating {
                selection: selection.clone(),
                location,
            })
        }

        (S::Calculating { selection, location }, A::SuggestionsReady(recommendation)) => {
            let basis = CalculationBasis::of(&selection.removed, &selection.available);
            if recommendation.basis != basis
                || recommendation.removed_value != selection.removed.removed_value()
            {
                return Err(DomainError::validation(
                    "suggestions were calculated for a different selection",
                )
                .into());
            }
            Ok(S::ReviewingSuggestions {
                review: Review {
                    selection: selection.clone(),
                    location: location.clone(),
                    recommendation,
                },
            })
        }
        (S::Calculating { selection, .. }, A::CancelCalculation) => Ok(S::SelectingLocation {
            selection: selection.clone(),
        }),

        (S::ReviewingSuggestions { review }, A::SelectSuggestion(bundle_id)) => {
            let chosen = review
                .recommendation
                .find(&bundle_id)
                .cloned()
                .ok_or_else(DomainError::not_found)?;
            Ok(S::ConfirmingLocation {
                review: review.clone(),
                chosen,
            })
        }
        (S::ReviewingSuggestions { review }, A::UseManualBundle(bundle)) => {
            ensure_well_formed(&bundle)?;
            Ok(S::ConfirmingLocation {
                review: review.clone(),
                chosen: bundle,
            })
        }
        (S::ReviewingSuggestions { review }, A::Back) => Ok(S::SelectingLocation {
            selection: review.selection.clone(),
        }),

        (S::ConfirmingLocation { review, chosen }, A::ConfirmLocation) => {
            Ok(S::ConfirmingExchange {
                review: review.clone(),
                chosen: chosen.clone(),
                exchange_id: ExchangeId::new(),
                last_error: None,
            })
        }
        (S::ConfirmingLocation { review, .. }, A::RejectLocation) => {
            let mut selection = review.selection.clone();
            selection.location = None;
            Ok(S::SelectingLocation { selection })
        }
        (
            S::ConfirmingLocation { review, .. } | S::ConfirmingExchange { review, .. },
            A::ChangeBundle,
        ) => Ok(S::ReviewingSuggestions {
            review: review.clone(),
        }),

        _ => Err(invalid),
    }
}

/// Record the operator's location choice. The location must already be
/// resolved against the directory.
fn with_location(state: &ExchangeState, location: Location) -> Result<ExchangeState, WorkflowError> {
    match state {
        ExchangeState::SelectingLocation { selection } => {
            let mut selection = selection.clone();
            selection.location = Some(location);
            Ok(ExchangeState::SelectingLocation { selection })
        }
        other => Err(WorkflowError::invalid(
            other,
            &WorkflowAction::ChooseLocation(location.id),
        )),
    }
}

fn ensure_actionable(removed: &RemovalSet) -> Result<(), WorkflowError> {
    if removed.is_actionable() {
        Ok(())
    } else {
        Err(DomainError::validation("select at least one removed product").into())
    }
}

fn ensure_well_formed(bundle: &BundleCandidate) -> Result<(), DomainError> {
    if bundle.items.is_empty() || bundle.items.iter().any(|i| i.quantity == 0) {
        return Err(DomainError::validation(
            "bundle lines must have positive quantities",
        ));
    }
    for (idx, item) in bundle.items.iter().enumerate() {
        if bundle.items[..idx]
            .iter()
            .any(|other| other.product_id() == item.product_id())
        {
            return Err(DomainError::invariant(
                "bundle lines must reference distinct products",
            ));
        }
    }
    Ok(())
}

/// An operator session driving one exchange from removal to record.
pub struct ExchangeWorkflow<C, L, S> {
    operator_id: OperatorId,
    engine: BundleEngine,
    catalog: C,
    locations: L,
    store: S,
    state: ExchangeState,
}

impl<C, L, S> ExchangeWorkflow<C, L, S>
where
    C: Catalog,
    L: LocationDirectory,
    S: ExchangeRecordStore,
{
    pub fn new(operator_id: OperatorId, engine: BundleEngine, catalog: C, locations: L, store: S) -> Self {
        Self {
            operator_id,
            engine,
            catalog,
            locations,
            store,
            state: ExchangeState::default(),
        }
    }

    pub fn operator_id(&self) -> OperatorId {
        self.operator_id
    }

    pub fn engine(&self) -> &BundleEngine {
        &self.engine
    }

    pub fn state(&self) -> &ExchangeState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Locations the operator may pick from.
    pub fn locations(&self) -> Result<Vec<Location>, WorkflowError> {
        Ok(self.locations.list()?)
    }

    /// Apply one action. On error the state is unchanged, except that a failed
    /// commit records its message in `ConfirmingExchange::last_error`.
    pub fn dispatch(&mut self, action: WorkflowAction) -> Result<&ExchangeState, WorkflowError> {
        let from = self.state.name();
        let action_name = action.name();
        let next_state = match action {
            WorkflowAction::Commit(mode) => {
                self.commit(mode)?;
                return Ok(&self.state);
            }
            WorkflowAction::ChooseLocation(location_id) => {
                let location = self.resolve_location(location_id)?;
                with_location(&self.state, location)?
            }
            WorkflowAction::SuggestionsReady(recommendation) => {
                self.ensure_policy_target(&recommendation)?;
                next(&self.state, WorkflowAction::SuggestionsReady(recommendation))?
            }
            action => next(&self.state, action)?,
        };
        debug!(
            operator_id = %self.operator_id,
            from,
            to = next_state.name(),
            action = action_name,
            "workflow transition"
        );
        self.state = next_state;
        Ok(&self.state)
    }

    fn resolve_location(&self, location_id: LocationId) -> Result<Location, WorkflowError> {
        if !matches!(self.state, ExchangeState::SelectingLocation { .. }) {
            return Err(WorkflowError::invalid(
                &self.state,
                &WorkflowAction::ChooseLocation(location_id),
            ));
        }
        self.locations
            .list()?
            .into_iter()
            .find(|location| location.id == location_id)
            .ok_or_else(|| {
                warn!(operator_id = %self.operator_id, %location_id, "unknown location chosen");
                LocationError::UnknownLocation(location_id).into()
            })
    }

    /// A result handed back from elsewhere must use this workflow's target.
    fn ensure_policy_target(&self, recommendation: &Recommendation) -> Result<(), WorkflowError> {
        let ExchangeState::Calculating { selection, .. } = &self.state else {
            return Ok(());
        };
        if !selection.removed.is_actionable() {
            return Ok(());
        }
        let expected = self.engine.target_for(&selection.removed);
        if (recommendation.target - expected).abs() > 1e-6 {
            return Err(DomainError::validation(
                "suggestions were calculated with a different target policy",
            )
            .into());
        }
        Ok(())
    }

    /// Removal and availability sets of a pending calculation, for callers
    /// that run the engine elsewhere and report back with `SuggestionsReady`.
    pub fn calculation_input(&self) -> Option<(&RemovalSet, &AvailabilitySet)> {
        match &self.state {
            ExchangeState::Calculating { selection, .. } => {
                Some((&selection.removed, &selection.available))
            }
            _ => None,
        }
    }

    pub fn catalog_snapshot(&self) -> Result<Vec<Product>, WorkflowError> {
        Ok(self.catalog.list_products()?)
    }

    /// Run the calculation synchronously: `Calculate`, engine run,
    /// `SuggestionsReady`. A failed run returns to `SelectingLocation`.
    pub fn calculate(&mut self) -> Result<&ExchangeState, WorkflowError> {
        self.calculate_with_abort(&AbortHandle::new())
    }

    pub fn calculate_with_abort(&mut self, abort: &AbortHandle) -> Result<&ExchangeState, WorkflowError> {
        if matches!(self.state, ExchangeState::SelectingLocation { .. }) {
            self.dispatch(WorkflowAction::Calculate)?;
        }

        let outcome = self.run_engine(abort);
        match outcome {
            Ok(recommendation) => self.dispatch(WorkflowAction::SuggestionsReady(recommendation)),
            Err(err) => {
                if matches!(self.state, ExchangeState::Calculating { .. }) {
                    warn!(operator_id = %self.operator_id, error = %err, "calculation failed");
                    self.dispatch(WorkflowAction::CancelCalculation)?;
                }
                Err(err)
            }
        }
    }

    fn run_engine(&self, abort: &AbortHandle) -> Result<Recommendation, WorkflowError> {
        let Some((removed, available)) = self.calculation_input() else {
            return Err(WorkflowError::invalid(&self.state, &WorkflowAction::Calculate));
        };
        let catalog = self.catalog_snapshot()?;
        let recommendation = self.engine.recommend_with_abort(
            RecommendationRequest {
                removed,
                available,
                catalog: &catalog,
            },
            abort,
        )?;
        Ok(recommendation)
    }

    /// Manual builder targeting the current removal set.
    pub fn manual_builder(&self) -> Option<ManualBundleBuilder> {
        match &self.state {
            ExchangeState::ReviewingSuggestions { review } => Some(ManualBundleBuilder::for_removal(
                &review.selection.removed,
                self.engine.policy(),
            )),
            _ => None,
        }
    }

    fn commit(&mut self, mode: CommitMode) -> Result<(), WorkflowError> {
        let ExchangeState::ConfirmingExchange {
            review,
            chosen,
            exchange_id,
            last_error,
        } = &mut self.state
        else {
            return Err(WorkflowError::invalid(
                &self.state,
                &WorkflowAction::Commit(mode),
            ));
        };

        let location_id = review.location.id;
        let request = NewExchangeRecord {
            exchange_id: *exchange_id,
            operator_id: self.operator_id,
            location_id,
            removed: review.selection.removed.items().to_vec(),
            replacement: chosen.items.clone(),
            bundle_id: chosen.id.clone(),
            status: mode.status(),
        };

        let record_id = match self.store.create(request) {
            Ok(id) => id,
            Err(err) => {
                warn!(
                    operator_id = %self.operator_id,
                    exchange_id = %exchange_id,
                    error = %err,
                    transient = err.is_transient(),
                    "exchange record creation failed"
                );
                *last_error = Some(err.to_string());
                return Err(WorkflowError::Persistence(err));
            }
        };

        let visit_recorded = match self.locations.record_visit(location_id, self.operator_id) {
            Ok(visit) => {
                debug!(location_id = %location_id, visit_count = visit.visit_count, "visit recorded");
                true
            }
            Err(err) => {
                warn!(
                    location_id = %location_id,
                    exchange_id = %record_id,
                    error = %err,
                    "visit notification failed after exchange was recorded"
                );
                false
            }
        };

        let status = mode.status();
        info!(
            operator_id = %self.operator_id,
            exchange_id = %record_id,
            location_id = %location_id,
            ?status,
            visit_recorded,
            "exchange committed"
        );

        self.state = ExchangeState::Completed {
            record_id,
            status,
            visit_recorded,
        };
        Ok(())
    }
}
