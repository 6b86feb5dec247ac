//! Reversible commands and the undo/redo stack that sequences them.

pub mod command;
pub mod stack;
