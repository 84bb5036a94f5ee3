//! Core types for Vitrine.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod shape;
pub mod status;

pub use id::*;
pub use shape::SyncShape;
pub use status::*;
