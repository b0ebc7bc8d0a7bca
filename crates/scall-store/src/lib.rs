//! Postgres job store access for the SantaCall render worker.
//!
//! The worker is a polling consumer of a shared relational store: it claims
//! pending render jobs with status-guarded conditional updates and appends
//! audit events as it drives them to a terminal state.

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{JobStore, StoreConfig};
