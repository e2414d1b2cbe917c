//! Resolution of indirect (`drs://`) input references.
//!
//! Parses object references, queries the object metadata endpoint over
//! HTTP, and rewrites a submission's `input` parameter into a location the
//! workflow engine can read directly.

pub mod api;
pub mod config;
pub mod error;
pub mod reference;
pub mod resolver;

pub use error::ResolveError;
pub use resolver::InputResolver;
