//! Domain model structs persisted by the store.

pub mod run;
