use glam::DVec2;

use crate::entity::{Entity, EntityId};
use crate::geo::Projection;
use crate::graph::Graph;

use super::move_entities::affected_nodes;
use super::Action;

/// Rotate entities around a projected-plane pivot by an angle in radians.
#[derive(Debug, Clone)]
pub struct Rotate {
    ids: Vec<EntityId>,
    pivot: DVec2,
    angle: f64,
    projection: Projection,
}

impl Rotate {
    pub fn new(
        ids: impl IntoIterator<Item = impl Into<EntityId>>,
        pivot: DVec2,
        angle: f64,
        projection: Projection,
    ) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            pivot,
            angle,
            projection,
        }
    }
}

impl Action for Rotate {
    fn apply(&self, graph: &Graph) -> Graph {
        let (sin, cos) = self.angle.sin_cos();
        let mut graph = graph.clone();
        for node_id in affected_nodes(&graph, &self.ids) {
            let node = match graph.entity(&node_id) {
                Entity::Node(n) => n.clone(),
                other => panic!("rotate: {} is not a node", other.id()),
            };
            let p = self.projection.project(node.loc) - self.pivot;
            let rotated = DVec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos) + self.pivot;
            graph = graph.replace(Entity::from(node.with_loc(self.projection.unproject(rotated))));
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::entity::{Node, Way};

    #[test]
    fn quarter_turn_about_a_node() {
        let proj = Projection::default();
        let g = Graph::new([
            Entity::from(Node::new("c".into()).with_loc([0.0, 0.0])),
            Entity::from(Node::new("e".into()).with_loc([0.001, 0.0])),
            Entity::from(Way::new("w".into()).with_nodes(vec!["c".into(), "e".into()])),
        ]);
        let pivot = proj.project([0.0, 0.0]);
        let g2 = Rotate::new(["w"], pivot, std::f64::consts::FRAC_PI_2, proj).apply(&g);

        let c = g2.entity(&"c".into()).as_node().unwrap();
        assert_relative_eq!(c.loc[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(c.loc[1], 0.0, epsilon = 1e-9);

        // Screen y grows downward, so +90 degrees carries east to south.
        let e = g2.entity(&"e".into()).as_node().unwrap();
        assert_relative_eq!(e.loc[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(e.loc[1], -0.001, epsilon = 1e-6);
    }
}
