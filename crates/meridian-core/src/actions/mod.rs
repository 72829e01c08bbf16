//! Pure graph transformations.
//!
//! Every edit the editor can perform is an [`Action`]: a value holding
//! its parameters, applied to a snapshot to produce a new snapshot. The
//! input graph is never mutated, so undo is just keeping the old
//! snapshot around.
//!
//! Actions assume their preconditions hold (the referenced entities
//! exist); feeding one a graph that violates them is a caller bug and
//! panics. Whether an action is *advisable* is a separate, fallible
//! question answered by [`Action::disabled`] before applying.

mod add_entity;
mod change_tags;
mod connect;
mod delete;
mod extract;
mod move_entities;
mod orthogonalize;
mod reflect;
mod restrict_turn;
mod reverse;
mod rotate;
mod upgrade_tags;

pub use add_entity::AddEntity;
pub use change_tags::ChangeTags;
pub use connect::Connect;
pub use delete::{DeleteMultiple, DeleteNode, DeleteRelation, DeleteWay};
pub use extract::Extract;
pub use move_entities::MoveEntities;
pub use orthogonalize::Orthogonalize;
pub use reflect::Reflect;
pub use restrict_turn::{RestrictTurn, UnrestrictTurn};
pub use reverse::Reverse;
pub use rotate::Rotate;
pub use upgrade_tags::UpgradeTags;

use crate::error::DisabledReason;
use crate::graph::Graph;

/// A pure edit over graph snapshots.
pub trait Action {
    /// Produce the edited snapshot. Panics on contract violations such as
    /// missing entities; check [`disabled`](Self::disabled) first.
    fn apply(&self, graph: &Graph) -> Graph;

    /// Why this action should not run against `graph`, if any reason.
    fn disabled(&self, _graph: &Graph) -> Option<DisabledReason> {
        None
    }

    /// Whether [`apply_at`](Self::apply_at) animates meaningfully.
    fn is_transitionable(&self) -> bool {
        false
    }

    /// Apply a fraction `t` of the edit, for animation. `t` is clamped to
    /// `[0, 1]`; non-transitionable actions ignore it.
    fn apply_at(&self, graph: &Graph, _t: f64) -> Graph {
        self.apply(graph)
    }
}
