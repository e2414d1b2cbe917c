//! Domain types shared by every WES crate.
//!
//! Holds the run identifiers, the WES run-state vocabulary together with
//! the backend job-state mapping, the submission request value object and
//! the [`error::CoreError`] taxonomy surfaced to callers.

pub mod error;
pub mod request;
pub mod run_state;
pub mod types;
