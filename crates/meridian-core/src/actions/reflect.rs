use glam::DVec2;

use crate::entity::{Entity, EntityId};
use crate::geo::{interp, Projection};
use crate::graph::Graph;

use super::move_entities::affected_nodes;
use super::Action;

/// Mirror entities across an axis of their projected bounding box. The
/// long axis by default, giving a "flip" that preserves the shape's
/// dominant orientation.
#[derive(Debug, Clone)]
pub struct Reflect {
    ids: Vec<EntityId>,
    projection: Projection,
    use_long_axis: bool,
}

impl Reflect {
    pub fn new(
        ids: impl IntoIterator<Item = impl Into<EntityId>>,
        projection: Projection,
    ) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            projection,
            use_long_axis: true,
        }
    }

    /// Mirror across the short axis instead.
    pub fn across_short_axis(mut self) -> Self {
        self.use_long_axis = false;
        self
    }
}

impl Action for Reflect {
    fn apply(&self, graph: &Graph) -> Graph {
        self.apply_at(graph, 1.0)
    }

    fn is_transitionable(&self) -> bool {
        true
    }

    fn apply_at(&self, graph: &Graph, t: f64) -> Graph {
        let t = t.clamp(0.0, 1.0);
        let node_ids = affected_nodes(graph, &self.ids);
        if node_ids.is_empty() {
            return graph.clone();
        }

        let mut min = DVec2::MAX;
        let mut max = DVec2::MIN;
        for id in &node_ids {
            let node = match graph.entity(id) {
                Entity::Node(n) => n,
                other => panic!("reflect: {} is not a node", other.id()),
            };
            let p = self.projection.project(node.loc);
            min = min.min(p);
            max = max.max(p);
        }
        let center = (min + max) / 2.0;
        let wide = (max.x - min.x) >= (max.y - min.y);

        // Mirroring across the long axis of a wide box flips vertically.
        let flip_y = wide == self.use_long_axis;

        let mut graph = graph.clone();
        for id in &node_ids {
            let node = match graph.entity(id) {
                Entity::Node(n) => n.clone(),
                other => panic!("reflect: {} is not a node", other.id()),
            };
            let p = self.projection.project(node.loc);
            let mirrored = if flip_y {
                DVec2::new(p.x, 2.0 * center.y - p.y)
            } else {
                DVec2::new(2.0 * center.x - p.x, p.y)
            };
            let target = interp(p, mirrored, t);
            graph = graph.replace(Entity::from(node.with_loc(self.projection.unproject(target))));
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::entity::{Node, Way};

    // A wide L shape: three nodes spanning more longitude than latitude.
    fn fixture() -> Graph {
        Graph::new([
            Entity::from(Node::new("a".into()).with_loc([0.0, 0.0])),
            Entity::from(Node::new("b".into()).with_loc([0.004, 0.0])),
            Entity::from(Node::new("c".into()).with_loc([0.004, 0.001])),
            Entity::from(Way::new("w".into()).with_nodes(vec![
                "a".into(),
                "b".into(),
                "c".into(),
            ])),
        ])
    }

    fn loc(g: &Graph, id: &str) -> [f64; 2] {
        g.entity(&id.into()).as_node().unwrap().loc
    }

    #[test]
    fn long_axis_of_a_wide_shape_flips_latitude() {
        let g2 = Reflect::new(["w"], Projection::default()).apply(&fixture());
        assert_relative_eq!(loc(&g2, "a")[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(loc(&g2, "a")[1], 0.001, epsilon = 1e-6);
        assert_relative_eq!(loc(&g2, "c")[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn short_axis_of_a_wide_shape_flips_longitude() {
        let g2 = Reflect::new(["w"], Projection::default())
            .across_short_axis()
            .apply(&fixture());
        assert_relative_eq!(loc(&g2, "a")[0], 0.004, epsilon = 1e-6);
        assert_relative_eq!(loc(&g2, "b")[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(loc(&g2, "b")[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn t_zero_is_the_identity() {
        let g = fixture();
        let g2 = Reflect::new(["w"], Projection::default()).apply_at(&g, 0.0);
        assert_relative_eq!(loc(&g2, "a")[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(loc(&g2, "a")[1], 0.0, epsilon = 1e-12);
    }
}
