//! Shared identifiers, 2D placement math and the crate error type.

pub mod core;
pub mod error;
