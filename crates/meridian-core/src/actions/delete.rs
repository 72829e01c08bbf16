//! Cascading deletion.
//!
//! Deleting an entity also cleans up its references: parents drop the
//! membership, parents left degenerate are themselves deleted, and
//! children left orphaned without interesting tags are swept away. The
//! three entity kinds cascade into each other, so the workers live
//! together here.

use crate::entity::{has_interesting_tags, Entity, EntityId, EntityKind};
use crate::graph::Graph;

use super::Action;

/// Delete a node, removing it from parent ways and relations first.
/// Parents left degenerate are deleted too.
#[derive(Debug, Clone)]
pub struct DeleteNode {
    node_id: EntityId,
}

impl DeleteNode {
    pub fn new(node_id: impl Into<EntityId>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }
}

impl Action for DeleteNode {
    fn apply(&self, graph: &Graph) -> Graph {
        delete_node(graph.clone(), &self.node_id)
    }
}

/// Delete a way, then sweep child nodes left with no parents and no
/// interesting tags.
#[derive(Debug, Clone)]
pub struct DeleteWay {
    way_id: EntityId,
}

impl DeleteWay {
    pub fn new(way_id: impl Into<EntityId>) -> Self {
        Self {
            way_id: way_id.into(),
        }
    }
}

impl Action for DeleteWay {
    fn apply(&self, graph: &Graph) -> Graph {
        delete_way(graph.clone(), &self.way_id)
    }
}

/// Delete a relation, then sweep members left orphaned and uninteresting.
#[derive(Debug, Clone)]
pub struct DeleteRelation {
    relation_id: EntityId,
}

impl DeleteRelation {
    pub fn new(relation_id: impl Into<EntityId>) -> Self {
        Self {
            relation_id: relation_id.into(),
        }
    }
}

impl Action for DeleteRelation {
    fn apply(&self, graph: &Graph) -> Graph {
        delete_relation(graph.clone(), &self.relation_id)
    }
}

/// Delete several entities, each by its kind's cascade. Entities a prior
/// cascade already removed are skipped.
#[derive(Debug, Clone)]
pub struct DeleteMultiple {
    ids: Vec<EntityId>,
}

impl DeleteMultiple {
    pub fn new(ids: impl IntoIterator<Item = impl Into<EntityId>>) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl Action for DeleteMultiple {
    fn apply(&self, graph: &Graph) -> Graph {
        let mut graph = graph.clone();
        for id in &self.ids {
            let Some(entity) = graph.get(id) else {
                continue;
            };
            graph = match entity.kind() {
                EntityKind::Node => delete_node(graph, id),
                EntityKind::Way => delete_way(graph, id),
                EntityKind::Relation => delete_relation(graph, id),
            };
        }
        graph
    }
}

// ---------------------------------------------------------------------------
// Cascade workers
// ---------------------------------------------------------------------------

pub(super) fn delete_node(mut graph: Graph, node_id: &EntityId) -> Graph {
    let parent_way_ids: Vec<EntityId> = graph.parent_way_ids(node_id).cloned().collect();
    for wid in parent_way_ids {
        let Some(way) = graph.get(&wid).and_then(Entity::as_way) else {
            continue;
        };
        let shrunk = way.remove_node(node_id);
        let degenerate = shrunk.is_degenerate();
        graph = graph.replace(Entity::from(shrunk));
        if degenerate {
            tracing::debug!(way = %wid, node = %node_id, "deleting way left degenerate");
            graph = delete_way(graph, &wid);
        }
    }

    let parent_relation_ids: Vec<EntityId> = graph.parent_relation_ids(node_id).cloned().collect();
    for rid in parent_relation_ids {
        graph = remove_from_relation(graph, &rid, node_id);
    }

    graph.remove(node_id)
}

pub(super) fn delete_way(mut graph: Graph, way_id: &EntityId) -> Graph {
    let nodes: Vec<EntityId> = match graph.entity(way_id) {
        Entity::Way(w) => {
            let mut uniq = Vec::with_capacity(w.nodes.len());
            for n in &w.nodes {
                if !uniq.contains(n) {
                    uniq.push(n.clone());
                }
            }
            uniq
        }
        other => panic!("delete_way: {} is not a way", other.id()),
    };

    let parent_relation_ids: Vec<EntityId> = graph.parent_relation_ids(way_id).cloned().collect();
    for rid in parent_relation_ids {
        graph = remove_from_relation(graph, &rid, way_id);
    }

    for node_id in nodes {
        // Drop the membership first so the orphan check sees the
        // post-deletion parent counts.
        if let Some(way) = graph.get(way_id).and_then(Entity::as_way) {
            graph = graph.replace(Entity::from(way.remove_node(&node_id)));
        }
        let orphaned = graph.get(&node_id).is_some_and(|n| {
            graph.parent_way_ids(&node_id).next().is_none()
                && graph.parent_relation_ids(&node_id).next().is_none()
                && !has_interesting_tags(n.tags())
        });
        if orphaned {
            graph = graph.remove(&node_id);
        }
    }

    graph.remove(way_id)
}

pub(super) fn delete_relation(mut graph: Graph, relation_id: &EntityId) -> Graph {
    let member_ids: Vec<EntityId> = match graph.entity(relation_id) {
        Entity::Relation(r) => {
            let mut uniq = Vec::with_capacity(r.members.len());
            for m in &r.members {
                if !uniq.contains(&m.id) {
                    uniq.push(m.id.clone());
                }
            }
            uniq
        }
        other => panic!("delete_relation: {} is not a relation", other.id()),
    };

    let parent_relation_ids: Vec<EntityId> =
        graph.parent_relation_ids(relation_id).cloned().collect();
    for rid in parent_relation_ids {
        graph = remove_from_relation(graph, &rid, relation_id);
    }

    for member_id in member_ids {
        if let Some(relation) = graph.get(relation_id).and_then(Entity::as_relation) {
            graph = graph.replace(Entity::from(relation.remove_members_with_id(&member_id)));
        }
        let orphaned = graph.get(&member_id).is_some_and(|e| {
            graph.parent_way_ids(&member_id).next().is_none()
                && graph.parent_relation_ids(&member_id).next().is_none()
                && !e.has_interesting_tags()
        });
        if orphaned {
            let kind = graph.entity(&member_id).kind();
            graph = match kind {
                EntityKind::Node => graph.remove(&member_id),
                EntityKind::Way => delete_way(graph, &member_id),
                EntityKind::Relation => delete_relation(graph, &member_id),
            };
        }
    }

    graph.remove(relation_id)
}

/// Drop `member_id` from relation `rid`; delete the relation if that
/// leaves it empty.
fn remove_from_relation(mut graph: Graph, rid: &EntityId, member_id: &EntityId) -> Graph {
    let Some(relation) = graph.get(rid).and_then(Entity::as_relation) else {
        return graph;
    };
    let shrunk = relation.remove_members_with_id(member_id);
    let degenerate = shrunk.is_degenerate();
    graph = graph.replace(Entity::from(shrunk));
    if degenerate {
        tracing::debug!(relation = %rid, member = %member_id, "deleting relation left empty");
        graph = delete_relation(graph, rid);
    }
    graph
}
