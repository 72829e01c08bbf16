use crate::entity::{EntityId, Tags};
use crate::graph::Graph;

use super::Action;

/// Replace an entity's tag map wholesale.
#[derive(Debug, Clone)]
pub struct ChangeTags {
    entity_id: EntityId,
    tags: Tags,
}

impl ChangeTags {
    pub fn new(entity_id: impl Into<EntityId>, tags: Tags) -> Self {
        Self {
            entity_id: entity_id.into(),
            tags,
        }
    }
}

impl Action for ChangeTags {
    fn apply(&self, graph: &Graph) -> Graph {
        let entity = graph.entity(&self.entity_id);
        graph.replace(entity.with_tags(self.tags.clone()))
    }
}
