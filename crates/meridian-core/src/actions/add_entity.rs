use std::sync::Arc;

use crate::entity::Entity;
use crate::graph::Graph;

use super::Action;

/// Insert a fully-formed entity into the graph.
#[derive(Debug, Clone)]
pub struct AddEntity {
    entity: Arc<Entity>,
}

impl AddEntity {
    pub fn new(entity: impl Into<Arc<Entity>>) -> Self {
        Self {
            entity: entity.into(),
        }
    }
}

impl Action for AddEntity {
    fn apply(&self, graph: &Graph) -> Graph {
        graph.replace(Arc::clone(&self.entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Node;

    #[test]
    fn adds_the_entity() {
        let g = Graph::default();
        let g2 = AddEntity::new(Entity::from(Node::new("n-1".into()).with_loc([0.0, 0.0])))
            .apply(&g);
        assert!(g2.has(&"n-1".into()));
        assert!(!g.has(&"n-1".into()));
    }
}
