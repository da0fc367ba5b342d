//! Pure domain logic for the telq job queue.
//!
//! Shared type aliases, the second-precision UTC clock, description
//! templating, and input validation. This crate has no internal
//! dependencies and performs no I/O.

pub mod clock;
pub mod error;
pub mod template;
pub mod types;

pub use error::CoreError;
pub use types::{JobId, Timestamp};
