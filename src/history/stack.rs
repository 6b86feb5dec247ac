use crate::foundation::error::{StagecraftError, StagecraftResult};
use crate::graph::scene::Scene;
use crate::history::command::Command;

/// Default cap on retained undo units; oldest units fall off first.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// One undoable unit: a single command, or a committed transaction replayed
/// and reverted as a whole.
#[derive(Debug)]
struct HistoryUnit {
    description: String,
    commands: Vec<Command>,
}

/// Linear undo/redo stack over [`Command`]s.
///
/// Executing a command while the stack is not at its tail truncates the redo
/// side (standard linear undo). `begin_transaction`/`commit_transaction`
/// bracket a composite edit, e.g. a live drag, into one undo step; the
/// boundaries are not reentrant and undo/redo are rejected while a
/// transaction is open.
#[derive(Debug)]
pub struct CommandHistory {
    undo: Vec<HistoryUnit>,
    redo: Vec<HistoryUnit>,
    open: Option<HistoryUnit>,
    limit: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl CommandHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            open: None,
            limit,
        }
    }

    /// Run a command against the scene and record it.
    ///
    /// Inside a transaction the command joins the open unit instead of
    /// creating a new undo boundary. A command that fails is not recorded;
    /// commands validate preconditions before mutating, so the scene is
    /// unchanged in that case.
    #[tracing::instrument(skip_all, fields(command = command.description()))]
    pub fn execute(&mut self, scene: &mut Scene, mut command: Command) -> StagecraftResult<()> {
        command.apply(scene)?;
        match &mut self.open {
            Some(unit) => unit.commands.push(command),
            None => {
                self.redo.clear();
                self.push_unit(HistoryUnit {
                    description: command.description().to_owned(),
                    commands: vec![command],
                });
            }
        }
        Ok(())
    }

    fn push_unit(&mut self, unit: HistoryUnit) {
        self.undo.push(unit);
        while self.undo.len() > self.limit {
            self.undo.remove(0);
        }
    }

    /// Open a composite boundary. Nested calls are a programming error.
    pub fn begin_transaction(&mut self, description: impl Into<String>) -> StagecraftResult<()> {
        if self.open.is_some() {
            return Err(StagecraftError::transaction("transaction already open"));
        }
        self.open = Some(HistoryUnit {
            description: description.into(),
            commands: Vec::new(),
        });
        Ok(())
    }

    /// Close the open boundary, recording its commands as one undo step.
    /// Committing an empty transaction records nothing.
    pub fn commit_transaction(&mut self) -> StagecraftResult<()> {
        let unit = self
            .open
            .take()
            .ok_or_else(|| StagecraftError::transaction("no open transaction"))?;
        if !unit.commands.is_empty() {
            self.redo.clear();
            self.push_unit(unit);
        }
        Ok(())
    }

    /// Abort the open boundary, reverting its commands in reverse order.
    pub fn rollback_transaction(&mut self, scene: &mut Scene) -> StagecraftResult<()> {
        let mut unit = self
            .open
            .take()
            .ok_or_else(|| StagecraftError::transaction("no open transaction"))?;
        for command in unit.commands.iter_mut().rev() {
            command.revert(scene)?;
        }
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.open.is_some()
    }

    /// Undo the most recent unit. `Ok(None)` when the stack is empty (a
    /// normal terminal UI state, not an error).
    pub fn undo(&mut self, scene: &mut Scene) -> StagecraftResult<Option<String>> {
        if self.open.is_some() {
            return Err(StagecraftError::transaction("undo during open transaction"));
        }
        let Some(mut unit) = self.undo.pop() else {
            return Ok(None);
        };
        for command in unit.commands.iter_mut().rev() {
            command.revert(scene)?;
        }
        tracing::debug!(unit = %unit.description, "undo");
        let description = unit.description.clone();
        self.redo.push(unit);
        Ok(Some(description))
    }

    /// Re-apply the most recently undone unit. `Ok(None)` when there is
    /// nothing to redo.
    pub fn redo(&mut self, scene: &mut Scene) -> StagecraftResult<Option<String>> {
        if self.open.is_some() {
            return Err(StagecraftError::transaction("redo during open transaction"));
        }
        let Some(mut unit) = self.redo.pop() else {
            return Ok(None);
        };
        for command in unit.commands.iter_mut() {
            command.apply(scene)?;
        }
        tracing::debug!(unit = %unit.description, "redo");
        let description = unit.description.clone();
        self.undo.push(unit);
        Ok(Some(description))
    }

    /// The most recently recorded command, including one just added to an
    /// open transaction. Lets callers read back state a command captured
    /// during `apply` (e.g. the id of a created node).
    pub fn last_command(&self) -> Option<&Command> {
        if let Some(open) = &self.open
            && let Some(cmd) = open.commands.last()
        {
            return Some(cmd);
        }
        self.undo.last().and_then(|u| u.commands.last())
    }

    /// Union of the node ids touched by the most recently recorded unit.
    pub fn last_unit_affected(&self) -> Vec<crate::foundation::core::NodeId> {
        let mut out = Vec::new();
        if let Some(unit) = self.undo.last() {
            for command in &unit.commands {
                for id in command.affected_ids() {
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
            }
        }
        out
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Label of the unit `undo` would revert, for menu display.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo.last().map(|u| u.description.as_str())
    }

    /// Label of the unit `redo` would replay, for menu display.
    pub fn redo_description(&self) -> Option<&str> {
        self.redo.last().map(|u| u.description.as_str())
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.open = None;
    }
}
