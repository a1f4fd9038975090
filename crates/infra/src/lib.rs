//! Infrastructure adapters for the exchange engine: in-memory collaborators,
//! retrying persistence, policy configuration and background calculation.

pub mod config;
pub mod locations;
pub mod record_store;
pub mod retry;
pub mod runner;


pub use config::{ConfigError, PolicyConfig, PolicySource};
pub use locations::InMemoryLocationDirectory;
pub use record_store::InMemoryExchangeRecordStore;
pub use retry::{BackoffStrategy, RetryPolicy, RetryingExchangeStore};
pub use runner::{RecommendationJob, RecommendationRunner, RecommendationTask, RunnerError};
