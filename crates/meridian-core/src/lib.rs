//! meridian-core: an in-memory versioned graph engine for map editing.
//!
//! Editing happens over immutable [`Graph`](graph::Graph) snapshots:
//! actions are pure `Graph -> Graph` values, undo keeps old snapshots,
//! and [`Difference`](difference::Difference) computes the minimal change
//! set between any two snapshots derived from the same loaded base. The
//! [`intersection`] module analyzes junctions and enumerates turns with
//! their restriction state.

pub mod actions;
pub mod difference;
pub mod edit;
pub mod entity;
pub mod error;
pub mod geo;
pub mod graph;
pub mod intersection;

pub use difference::Difference;
pub use edit::{Edit, EditSystem, IdGenerator};
pub use entity::{Entity, EntityId, EntityKind, Member, Node, Relation, Tags, Way};
pub use error::{DisabledReason, GraphError};
pub use geo::Projection;
pub use graph::{Geometry, Graph};
pub use intersection::{Intersection, Turn, TurnEnd, TurnStart, TurnVia};
