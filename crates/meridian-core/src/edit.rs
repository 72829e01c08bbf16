//! Edit history: staging graph, annotated undo stack, id allocation.
//!
//! An [`EditSystem`] owns three things:
//!
//! | piece     | role                                                |
//! |-----------|-----------------------------------------------------|
//! | `stack`   | committed snapshots, each with an annotation        |
//! | `staging` | work in progress, advanced by [`perform`]           |
//! | `ids`     | allocator for fresh editor-local entity ids         |
//!
//! [`perform`] touches staging only; nothing is undoable until
//! [`commit`] snapshots staging onto the stack. Undo and redo move an
//! index over the stack and reset staging to the snapshot there.
//! Transactions make a burst of commits (a drag, a multi-step operation)
//! collapse into a single undoable edit.
//!
//! [`perform`]: EditSystem::perform
//! [`commit`]: EditSystem::commit

use crate::actions::Action;
use crate::difference::Difference;
use crate::entity::{EntityId, EntityKind};
use crate::graph::Graph;

/// One committed state.
#[derive(Debug, Clone)]
pub struct Edit {
    pub graph: Graph,
    /// Human-readable description shown for undo/redo.
    pub annotation: String,
    /// Selection to restore when this edit becomes current again.
    pub selected_ids: Vec<EntityId>,
}

/// Allocator for editor-local ids (`n-1`, `w-1`, `r-1`, ...).
///
/// The dashed form never collides with upstream ids, which are undashed.
/// One generator per session; no global state.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    nodes: u64,
    ways: u64,
    relations: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, kind: EntityKind) -> EntityId {
        let counter = match kind {
            EntityKind::Node => &mut self.nodes,
            EntityKind::Way => &mut self.ways,
            EntityKind::Relation => &mut self.relations,
        };
        *counter += 1;
        EntityId::from(format!("{}-{}", kind.prefix(), *counter))
    }
}

/// Staging plus annotated history over immutable snapshots.
#[derive(Debug)]
pub struct EditSystem {
    stack: Vec<Edit>,
    index: usize,
    staging: Graph,
    /// Stack index at `begin_transaction`, while one is open.
    transaction: Option<usize>,
    ids: IdGenerator,
}

impl EditSystem {
    pub fn new(base: Graph) -> Self {
        Self {
            stack: vec![Edit {
                graph: base.clone(),
                annotation: String::new(),
                selected_ids: Vec::new(),
            }],
            index: 0,
            staging: base,
            transaction: None,
            ids: IdGenerator::new(),
        }
    }

    /// The work-in-progress graph.
    pub fn staging(&self) -> &Graph {
        &self.staging
    }

    /// The graph as loaded, before any edit.
    pub fn base(&self) -> &Graph {
        &self.stack[0].graph
    }

    /// The most recent committed edit at or before the current position.
    pub fn current(&self) -> &Edit {
        &self.stack[self.index]
    }

    pub fn ids(&mut self) -> &mut IdGenerator {
        &mut self.ids
    }

    /// Apply an action to staging. Not undoable until committed.
    pub fn perform(&mut self, action: &dyn Action) {
        self.staging = action.apply(&self.staging);
    }

    /// Apply a fraction of a transitionable action to staging, for
    /// animated previews.
    pub fn perform_at(&mut self, action: &dyn Action, t: f64) {
        self.staging = action.apply_at(&self.staging, t);
    }

    /// Throw away uncommitted staging work.
    pub fn discard(&mut self) {
        self.staging = self.stack[self.index].graph.clone();
    }

    /// Snapshot staging onto the stack, truncating any redo tail. Inside
    /// a transaction, consecutive commits collapse into one edit.
    pub fn commit(&mut self, annotation: impl Into<String>, selected_ids: Vec<EntityId>) {
        let annotation = annotation.into();
        self.stack.truncate(self.index + 1);
        if let Some(mark) = self.transaction {
            if self.index > mark {
                self.stack.truncate(mark + 1);
                self.index = mark;
            }
        }
        tracing::debug!(annotation = %annotation, edits = self.stack.len(), "commit");
        self.stack.push(Edit {
            graph: self.staging.clone(),
            annotation,
            selected_ids,
        });
        self.index = self.stack.len() - 1;
    }

    /// Step back to the previous committed edit. Returns the edit that
    /// becomes current, or `None` at the bottom of the stack.
    pub fn undo(&mut self) -> Option<&Edit> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.staging = self.stack[self.index].graph.clone();
        let edit = &self.stack[self.index];
        tracing::debug!(annotation = %edit.annotation, index = self.index, "undo");
        Some(edit)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self) -> Option<&Edit> {
        if self.index + 1 >= self.stack.len() {
            return None;
        }
        self.index += 1;
        self.staging = self.stack[self.index].graph.clone();
        let edit = &self.stack[self.index];
        tracing::debug!(annotation = %edit.annotation, index = self.index, "redo");
        Some(edit)
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.stack.len()
    }

    /// Annotation an undo would return to, if any.
    pub fn undo_annotation(&self) -> Option<&str> {
        (self.index > 0).then(|| self.stack[self.index].annotation.as_str())
    }

    /// Annotation a redo would restore, if any.
    pub fn redo_annotation(&self) -> Option<&str> {
        self.stack
            .get(self.index + 1)
            .map(|e| e.annotation.as_str())
    }

    /// Open a transaction; until [`end_transaction`](Self::end_transaction),
    /// commits coalesce into a single undoable edit. Opening a second
    /// transaction inside the first is a no-op.
    pub fn begin_transaction(&mut self) {
        if self.transaction.is_none() {
            self.transaction = Some(self.index);
        }
    }

    pub fn end_transaction(&mut self) {
        self.transaction = None;
    }

    /// Changes from the loaded base to staging.
    pub fn difference(&self) -> Difference {
        Difference::new(self.base(), &self.staging)
    }

    pub fn has_changes(&self) -> bool {
        !self.difference().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{AddEntity, ChangeTags};
    use crate::entity::{tags, Entity, Node};

    fn system() -> EditSystem {
        EditSystem::new(Graph::new([Entity::from(
            Node::new("n1".into()).with_loc([0.0, 0.0]),
        )]))
    }

    #[test]
    fn id_generator_mints_dashed_ids_per_kind() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next(EntityKind::Node).as_str(), "n-1");
        assert_eq!(ids.next(EntityKind::Node).as_str(), "n-2");
        assert_eq!(ids.next(EntityKind::Way).as_str(), "w-1");
        assert_eq!(ids.next(EntityKind::Relation).as_str(), "r-1");
    }

    #[test]
    fn perform_touches_staging_only() {
        let mut sys = system();
        sys.perform(&AddEntity::new(Entity::from(
            Node::new("n-1".into()).with_loc([1.0, 1.0]),
        )));
        assert!(sys.staging().has(&"n-1".into()));
        assert!(!sys.current().graph.has(&"n-1".into()));
        assert!(!sys.can_undo());

        sys.discard();
        assert!(!sys.staging().has(&"n-1".into()));
    }

    #[test]
    fn commit_undo_redo_round_trip() {
        let mut sys = system();
        sys.perform(&ChangeTags::new("n1", tags([("name", "A")])));
        sys.commit("rename", vec!["n1".into()]);
        assert!(sys.can_undo());
        assert!(!sys.can_redo());
        assert_eq!(sys.undo_annotation(), Some("rename"));

        let edit = sys.undo().unwrap();
        assert!(edit.annotation.is_empty());
        assert!(sys.staging().entity(&"n1".into()).tags().is_empty());
        assert!(sys.can_redo());
        assert_eq!(sys.redo_annotation(), Some("rename"));

        let edit = sys.redo().unwrap();
        assert_eq!(edit.selected_ids, vec![EntityId::from("n1")]);
        assert_eq!(
            sys.staging().entity(&"n1".into()).tags().get("name").map(String::as_str),
            Some("A")
        );
        assert!(sys.redo().is_none());
    }

    #[test]
    fn commit_truncates_the_redo_tail() {
        let mut sys = system();
        sys.perform(&ChangeTags::new("n1", tags([("name", "A")])));
        sys.commit("a", vec![]);
        sys.perform(&ChangeTags::new("n1", tags([("name", "B")])));
        sys.commit("b", vec![]);
        sys.undo();

        sys.perform(&ChangeTags::new("n1", tags([("name", "C")])));
        sys.commit("c", vec![]);
        assert!(!sys.can_redo());
        assert_eq!(
            sys.staging().entity(&"n1".into()).tags().get("name").map(String::as_str),
            Some("C")
        );
        // "b" is gone.
        sys.undo();
        assert_eq!(
            sys.staging().entity(&"n1".into()).tags().get("name").map(String::as_str),
            Some("A")
        );
    }

    #[test]
    fn transaction_coalesces_commits() {
        let mut sys = system();
        sys.begin_transaction();
        sys.perform(&ChangeTags::new("n1", tags([("step", "1")])));
        sys.commit("step 1", vec![]);
        sys.perform(&ChangeTags::new("n1", tags([("step", "2")])));
        sys.commit("step 2", vec![]);
        sys.end_transaction();

        assert_eq!(sys.undo_annotation(), Some("step 2"));
        sys.undo().unwrap();
        // Both steps fold into one edit; undo skips the intermediate state.
        assert!(sys.staging().entity(&"n1".into()).tags().is_empty());
        assert!(!sys.can_undo());
    }

    #[test]
    fn difference_tracks_base_to_staging() {
        let mut sys = system();
        assert!(!sys.has_changes());
        sys.perform(&ChangeTags::new("n1", tags([("name", "A")])));
        assert!(sys.has_changes());
        let diff = sys.difference();
        assert_eq!(diff.modified().len(), 1);
    }
}
