//! Retail locations visited by field representatives.
//!
//! Location data and visit frequency live in an external store; this crate
//! defines the records and the directory boundary the exchange workflow uses.

pub mod location;

pub use location::{Location, LocationDirectory, LocationError, VisitRecorded};
