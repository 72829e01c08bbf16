use crate::entity::{Entity, EntityId};
use crate::graph::Graph;

use super::Action;

/// Reverse a way's node order, optionally swapping its `oneway` tag so
/// travel direction is preserved.
#[derive(Debug, Clone)]
pub struct Reverse {
    way_id: EntityId,
    reverse_oneway: bool,
}

impl Reverse {
    pub fn new(way_id: impl Into<EntityId>) -> Self {
        Self {
            way_id: way_id.into(),
            reverse_oneway: false,
        }
    }

    pub fn reverse_oneway(mut self, yes: bool) -> Self {
        self.reverse_oneway = yes;
        self
    }
}

impl Action for Reverse {
    fn apply(&self, graph: &Graph) -> Graph {
        let way = match graph.entity(&self.way_id) {
            Entity::Way(w) => w,
            other => panic!("reverse: {} is not a way", other.id()),
        };
        graph.replace(Entity::from(way.reverse(self.reverse_oneway)))
    }
}
