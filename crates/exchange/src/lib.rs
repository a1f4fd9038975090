//! Replacement bundle engine and exchange workflow.
//!
//! Given products removed from a retail shelf, the engine proposes replacement
//! bundles whose value approximates a policy-defined target and ranks them
//! deterministically. The workflow sequences the operator's selection,
//! review and confirmation, and persists the outcome through an external
//! record store.

pub mod abort;
pub mod bundle;
pub mod engine;
pub mod error;
pub mod generator;
pub mod line_item;
pub mod manual;
pub mod policy;
pub mod pool;
pub mod record;
pub mod scorer;
pub mod selector;
pub mod store;
pub mod workflow;

pub use abort::AbortHandle;
pub use bundle::{BundleCandidate, BundleOrigin};
pub use engine::{
    BundleEngine, CalculationBasis, Recommendation, RecommendationOutcome, RecommendationRequest,
};
pub use error::RecommendError;
pub use line_item::{AvailabilitySet, LineItem, LineItems, RemovalSet};
pub use manual::ManualBundleBuilder;
pub use policy::{ScoringWeights, TargetPolicy};
pub use pool::{AffinityProfile, CandidatePool, PoolSource};
pub use record::{
    ExchangeCommand, ExchangeEvent, ExchangeFulfilled, ExchangeRecord, ExchangeRecorded,
    ExchangeStatus, FulfillExchange, RecordExchange,
};
pub use store::{ExchangeRecordStore, NewExchangeRecord, StoreError};
pub use workflow::{
    CommitMode, ExchangeState, ExchangeWorkflow, Review, Selection, WorkflowAction, WorkflowError,
};
