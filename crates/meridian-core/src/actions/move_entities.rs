use std::collections::HashSet;

use glam::DVec2;

use crate::entity::{Entity, EntityId};
use crate::geo::Projection;
use crate::graph::Graph;

use super::Action;

/// Translate entities by a projected-plane delta. Ways and relations move
/// by moving their (transitive) child nodes; shared children move once.
#[derive(Debug, Clone)]
pub struct MoveEntities {
    ids: Vec<EntityId>,
    delta: DVec2,
    projection: Projection,
}

impl MoveEntities {
    pub fn new(
        ids: impl IntoIterator<Item = impl Into<EntityId>>,
        delta: DVec2,
        projection: Projection,
    ) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            delta,
            projection,
        }
    }
}

impl Action for MoveEntities {
    fn apply(&self, graph: &Graph) -> Graph {
        self.apply_at(graph, 1.0)
    }

    fn is_transitionable(&self) -> bool {
        true
    }

    fn apply_at(&self, graph: &Graph, t: f64) -> Graph {
        let t = t.clamp(0.0, 1.0);
        let delta = self.delta * t;
        let mut graph = graph.clone();
        for node_id in affected_nodes(&graph, &self.ids) {
            let node = match graph.entity(&node_id) {
                Entity::Node(n) => n.clone(),
                other => panic!("move: {} is not a node", other.id()),
            };
            let moved = self.projection.unproject(self.projection.project(node.loc) + delta);
            graph = graph.replace(Entity::from(node.with_loc(moved)));
        }
        graph
    }
}

/// Distinct child node ids of the given entities, in first-visit order.
/// Relation membership cycles terminate via the visited set.
pub(super) fn affected_nodes(graph: &Graph, ids: &[EntityId]) -> Vec<EntityId> {
    let mut out: Vec<EntityId> = Vec::new();
    let mut seen: HashSet<EntityId> = HashSet::new();
    let mut stack: Vec<EntityId> = ids.iter().rev().cloned().collect();

    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        match graph.get(&id) {
            Some(Entity::Node(n)) => out.push(n.id.clone()),
            Some(Entity::Way(w)) => {
                for n in w.nodes.iter().rev() {
                    stack.push(n.clone());
                }
            }
            Some(Entity::Relation(r)) => {
                for m in r.members.iter().rev() {
                    stack.push(m.id.clone());
                }
            }
            None => {}
        }
    }
    out
}
