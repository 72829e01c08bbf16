use crate::entity::{Entity, EntityId, Node};
use crate::graph::Graph;

use super::Action;

/// Detach a tagged vertex from its parent ways as a standalone point.
///
/// A fresh untagged node under `replacement_id` takes the vertex's place
/// at every position in every parent way (the one replacement is shared
/// across all of them). The original node keeps its id, tags, and
/// relation memberships, and ends up with no parent ways.
#[derive(Debug, Clone)]
pub struct Extract {
    node_id: EntityId,
    replacement_id: EntityId,
}

impl Extract {
    pub fn new(node_id: impl Into<EntityId>, replacement_id: impl Into<EntityId>) -> Self {
        Self {
            node_id: node_id.into(),
            replacement_id: replacement_id.into(),
        }
    }
}

impl Action for Extract {
    fn apply(&self, graph: &Graph) -> Graph {
        let node = match graph.entity(&self.node_id) {
            Entity::Node(n) => n,
            other => panic!("extract: {} is not a node", other.id()),
        };
        let replacement = Node::new(self.replacement_id.clone()).with_loc(node.loc);

        let mut graph = graph.replace(Entity::from(replacement));
        let parent_way_ids: Vec<EntityId> = graph.parent_way_ids(&self.node_id).cloned().collect();
        for wid in parent_way_ids {
            if let Some(way) = graph.get(&wid).and_then(Entity::as_way) {
                graph = graph.replace(Entity::from(
                    way.replace_node(&self.node_id, &self.replacement_id),
                ));
            }
        }
        graph
    }
}
