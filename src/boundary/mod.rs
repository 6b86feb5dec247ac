//! Contracts with out-of-process collaborators: read-only render snapshots
//! and the plain-data persistence model. The engine owns neither pixels nor
//! file formats.

pub mod persist;
pub mod render;
