use crate::boundary::persist::{self, SceneData};
use crate::boundary::render::{self, ItemSnapshot};
use crate::foundation::core::{NodeId, Point, SourceRef};
use crate::foundation::error::{StagecraftError, StagecraftResult};
use crate::graph::scene::{NodeSnapshot, Removal, Scene};
use crate::history::command::Command;
use crate::history::stack::CommandHistory;
use crate::select::selection::Selection;

/// Notification that a unit of work committed; collaborators (autosave, the
/// render feed) poll these rather than hooking into command execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedEdit {
    pub description: String,
    pub affected: Vec<NodeId>,
}

/// One explicitly-owned engine instance: a scene plus its command history.
///
/// This is the surface an automation API or UI layer drives. Every mutation
/// routes through a [`Command`] so it is undoable, and every return value is
/// plain data; callers never receive a mutable handle into graph state.
#[derive(Debug)]
pub struct SceneEditor {
    scene: Scene,
    history: CommandHistory,
    committed: Vec<CommittedEdit>,
}

impl SceneEditor {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            history: CommandHistory::default(),
            committed: Vec::new(),
        }
    }

    /// Read-only view of the scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    fn run(&mut self, command: Command) -> StagecraftResult<()> {
        let description = command.description().to_owned();
        self.history.execute(&mut self.scene, command)?;
        if !self.history.in_transaction() {
            self.committed.push(CommittedEdit {
                description,
                affected: self.history.last_unit_affected(),
            });
        }
        Ok(())
    }

    /// Create an item at the top of the stack and return its id.
    pub fn add_item(&mut self, source: SourceRef, name: impl Into<String>) -> StagecraftResult<NodeId> {
        self.run(Command::create_item(source, name))?;
        self.history
            .last_command()
            .and_then(Command::created_id)
            .ok_or_else(|| StagecraftError::stale("created item left no record"))
    }

    /// Create a folder at the top of the stack and return its id.
    pub fn add_folder(&mut self, name: impl Into<String>) -> StagecraftResult<NodeId> {
        self.run(Command::create_folder(name))?;
        self.history
            .last_command()
            .and_then(Command::created_id)
            .ok_or_else(|| StagecraftError::stale("created folder left no record"))
    }

    pub fn remove(&mut self, id: NodeId, mode: Removal) -> StagecraftResult<()> {
        let cmd = Command::remove(&self.scene, id, mode)?;
        self.run(cmd)
    }

    pub fn reparent(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        index: usize,
    ) -> StagecraftResult<()> {
        let cmd = Command::reparent(&self.scene, id, parent, index)?;
        self.run(cmd)
    }

    pub fn reorder(&mut self, id: NodeId, index: usize) -> StagecraftResult<()> {
        let cmd = Command::reorder(&self.scene, id, index)?;
        self.run(cmd)
    }

    fn run_optional(&mut self, cmd: Option<Command>) -> StagecraftResult<()> {
        match cmd {
            Some(cmd) => self.run(cmd),
            // Empty or fully-locked selection: succeed without mutating.
            None => Ok(()),
        }
    }

    pub fn translate(&mut self, ids: &[NodeId], dx: f64, dy: f64) -> StagecraftResult<()> {
        let sel = Selection::new(&self.scene, ids.iter().copied());
        self.run_optional(Command::translate(&self.scene, &sel, dx, dy))
    }

    pub fn resize(&mut self, ids: &[NodeId], factor: f64, anchor: Point) -> StagecraftResult<()> {
        let sel = Selection::new(&self.scene, ids.iter().copied());
        self.run_optional(Command::resize(&self.scene, &sel, factor, anchor))
    }

    pub fn rotate(&mut self, ids: &[NodeId], degrees: f64) -> StagecraftResult<()> {
        let sel = Selection::new(&self.scene, ids.iter().copied());
        self.run_optional(Command::rotate(&self.scene, &sel, degrees))
    }

    pub fn flip_x(&mut self, ids: &[NodeId]) -> StagecraftResult<()> {
        let sel = Selection::new(&self.scene, ids.iter().copied());
        self.run_optional(Command::flip_x(&self.scene, &sel))
    }

    pub fn flip_y(&mut self, ids: &[NodeId]) -> StagecraftResult<()> {
        let sel = Selection::new(&self.scene, ids.iter().copied());
        self.run_optional(Command::flip_y(&self.scene, &sel))
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> StagecraftResult<()> {
        let cmd = Command::set_visible(&self.scene, id, visible)?;
        self.run_optional(cmd)
    }

    pub fn set_locked(&mut self, id: NodeId, locked: bool) -> StagecraftResult<()> {
        let cmd = Command::set_locked(&self.scene, id, locked)?;
        self.run_optional(cmd)
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> StagecraftResult<()> {
        let cmd = Command::rename(&self.scene, id, name)?;
        self.run(cmd)
    }

    /// Group commands until `commit_transaction` into one undo step.
    pub fn begin_transaction(&mut self, description: impl Into<String>) -> StagecraftResult<()> {
        self.history.begin_transaction(description)
    }

    pub fn commit_transaction(&mut self) -> StagecraftResult<()> {
        let recorded = self.history.undo_len();
        self.history.commit_transaction()?;
        // An empty transaction records no unit and emits no event.
        if self.history.undo_len() > recorded {
            if let Some(desc) = self.history.undo_description() {
                self.committed.push(CommittedEdit {
                    description: desc.to_owned(),
                    affected: self.history.last_unit_affected(),
                });
            }
        }
        Ok(())
    }

    pub fn rollback_transaction(&mut self) -> StagecraftResult<()> {
        self.history.rollback_transaction(&mut self.scene)
    }

    pub fn undo(&mut self) -> StagecraftResult<Option<String>> {
        self.history.undo(&mut self.scene)
    }

    pub fn redo(&mut self) -> StagecraftResult<Option<String>> {
        self.history.redo(&mut self.scene)
    }

    /// Commit notifications since the last drain, oldest first.
    pub fn drain_committed(&mut self) -> Vec<CommittedEdit> {
        std::mem::take(&mut self.committed)
    }

    pub fn hierarchy(&self) -> Vec<NodeSnapshot> {
        self.scene.hierarchy()
    }

    pub fn render_snapshots(&self) -> Vec<ItemSnapshot> {
        render::snapshots(&self.scene)
    }

    pub fn to_data(&self) -> SceneData {
        persist::to_data(&self.scene)
    }

    /// Rebuild an editor around persisted scene data; history starts empty.
    pub fn from_data(data: SceneData) -> StagecraftResult<Self> {
        Ok(Self::new(persist::from_data(data)?))
    }
}
