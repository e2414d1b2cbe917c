//! Repository layer.
//!
//! [`RunStore`] is the seam the lifecycle code talks to. Two
//! implementations exist: [`PgRunStore`] keeps runs as JSONB documents in
//! Postgres, [`MemoryRunStore`] keeps them in process memory.

pub mod memory_run_store;
pub mod run_repo;
pub mod run_store;

pub use memory_run_store::MemoryRunStore;
pub use run_repo::PgRunStore;
pub use run_store::{allocate_unique_id, RunStore, StoreError, MAX_ALLOCATION_ATTEMPTS};
