//! Error and reason-code types shared across the engine.
//!
//! Two distinct failure channels exist, and they must not be conflated:
//!
//! - [`GraphError`]: a lookup failed outright. "Not found" is different
//!   from "present but incomplete": an incomplete entity (referenced by id
//!   but never downloaded) is reported as `None` by tolerant lookups such
//!   as [`Graph::get`](crate::graph::Graph::get); algorithms that can
//!   degrade do so explicitly through that path.
//! - [`DisabledReason`]: an edit is *inadvisable*, not erroneous. Actions
//!   report these from `disabled()` instead of failing so the caller can
//!   warn without unwinding.

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// GraphError
// ---------------------------------------------------------------------------

/// A hard failure while resolving graph data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The entity id is not present in the graph (neither local nor base).
    #[error("entity {id} not found")]
    EntityNotFound {
        /// The id that failed to resolve.
        id: EntityId,
    },
}

impl GraphError {
    /// Shorthand constructor used throughout the graph module.
    pub fn not_found(id: &EntityId) -> Self {
        Self::EntityNotFound { id: id.clone() }
    }
}

// ---------------------------------------------------------------------------
// DisabledReason
// ---------------------------------------------------------------------------

/// Machine-readable reason an action refuses to run on a given graph.
///
/// This is a closed set: downstream UI and tests match on it exhaustively,
/// so new variants are a semver-visible change. The string form returned by
/// [`code`](Self::code) is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisabledReason {
    /// Merging these entities would give one relation conflicting roles.
    Relation,
    /// The edit would create, destroy, or corrupt the from/via/to topology
    /// of a turn-restriction relation.
    Restriction,
    /// The geometry is already square; orthogonalizing is a no-op.
    SquareEnough,
    /// The geometry has no corners close enough to square to snap.
    NotSquarish,
    /// A relation involved is not fully downloaded, so the effect of the
    /// edit cannot be determined.
    IncompleteRelation,
    /// The target is still a member of a relation that is not being edited.
    PartOfRelation,
}

impl DisabledReason {
    /// Stable string code for UI lookup and test assertions.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Relation => "relation",
            Self::Restriction => "restriction",
            Self::SquareEnough => "square_enough",
            Self::NotSquarish => "not_squarish",
            Self::IncompleteRelation => "incomplete_relation",
            Self::PartOfRelation => "part_of_relation",
        }
    }
}

impl std::fmt::Display for DisabledReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
