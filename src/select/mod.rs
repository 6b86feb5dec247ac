//! Transient selections and the bulk transform planner they share with the
//! command layer.

pub mod selection;
