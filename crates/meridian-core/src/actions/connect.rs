//! Merge coincident nodes into one.
//!
//! Connecting picks a survivor (preferring a node already persisted
//! upstream, so its id is stable), rewires every parent way and relation
//! of the losers onto it, folds the losers' tags in, and cleans up any
//! way the merge made degenerate.
//!
//! The merge can silently corrupt turn restrictions, so [`disabled`]
//! simulates it against every restriction touching the nodes first.
//!
//! [`disabled`]: super::Action::disabled

use std::collections::HashMap;

use crate::entity::{Entity, EntityId, EntityKind, Member, Way};
use crate::error::DisabledReason;
use crate::graph::Graph;

use super::delete::{delete_node, delete_way};
use super::Action;

/// Merge the listed nodes into one surviving node.
#[derive(Debug, Clone)]
pub struct Connect {
    node_ids: Vec<EntityId>,
}

impl Connect {
    pub fn new(node_ids: impl IntoIterator<Item = impl Into<EntityId>>) -> Self {
        Self {
            node_ids: node_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// The first node already persisted upstream, else the last listed.
    fn survivor_id<'a>(&'a self, graph: &Graph) -> &'a EntityId {
        self.node_ids
            .iter()
            .find(|id| !graph.entity(id).is_new())
            .or_else(|| self.node_ids.last())
            .unwrap_or_else(|| panic!("connect: no nodes given"))
    }
}

impl Action for Connect {
    fn apply(&self, graph: &Graph) -> Graph {
        let survivor_id = self.survivor_id(graph).clone();
        let mut survivor = graph.entity(&survivor_id).clone();
        let mut graph = graph.clone();

        for id in &self.node_ids {
            if *id == survivor_id {
                continue;
            }
            let loser_tags = graph.entity(id).tags().clone();

            let parent_way_ids: Vec<EntityId> = graph.parent_way_ids(id).cloned().collect();
            for wid in parent_way_ids {
                if let Some(way) = graph.get(&wid).and_then(Entity::as_way) {
                    graph = graph.replace(Entity::from(way.replace_node(id, &survivor_id)));
                }
            }

            let parent_relation_ids: Vec<EntityId> =
                graph.parent_relation_ids(id).cloned().collect();
            for rid in parent_relation_ids {
                if let Some(relation) = graph.get(&rid).and_then(Entity::as_relation) {
                    graph = graph.replace(Entity::from(relation.replace_member(
                        id,
                        &survivor_id,
                        EntityKind::Node,
                    )));
                }
            }

            survivor = survivor.merge_tags(&loser_tags);
            graph = delete_node(graph, id);
        }

        graph = graph.replace(survivor);

        // Connecting adjacent vertices can collapse a way.
        let degenerate: Vec<EntityId> = graph
            .parent_ways(&survivor_id)
            .iter()
            .filter(|w| w.is_degenerate())
            .map(|w| w.id.clone())
            .collect();
        for wid in degenerate {
            graph = delete_way(graph, &wid);
        }

        graph
    }

    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        let survivor_id = self.survivor_id(graph);
        let mut seen_roles: HashMap<EntityId, String> = HashMap::new();
        let mut restriction_ids: Vec<EntityId> = Vec::new();

        // Conflicting roles within one relation block the merge outright.
        for id in &self.node_ids {
            for relation in graph.parent_relations(id) {
                let role = relation
                    .member_by_id(id)
                    .map(|m| m.role.clone())
                    .unwrap_or_default();
                if relation.is_valid_restriction() {
                    push_unique(&mut restriction_ids, relation.id.clone());
                }
                match seen_roles.get(&relation.id) {
                    Some(prev) if *prev != role => return Some(DisabledReason::Relation),
                    Some(_) => {}
                    None => {
                        seen_roles.insert(relation.id.clone(), role);
                    }
                }
            }
        }

        // Restrictions reached through the nodes' parent ways matter too.
        for id in &self.node_ids {
            for way in graph.parent_ways(id) {
                for relation in graph.parent_relations(&way.id) {
                    if relation.is_valid_restriction() {
                        push_unique(&mut restriction_ids, relation.id.clone());
                    }
                }
            }
        }

        for rid in &restriction_ids {
            if self.damages_restriction(graph, rid, survivor_id) {
                return Some(DisabledReason::Restriction);
            }
        }

        None
    }
}

impl Connect {
    fn damages_restriction(&self, graph: &Graph, rid: &EntityId, survivor_id: &EntityId) -> bool {
        let Some(relation) = graph.get(rid).and_then(Entity::as_relation) else {
            return false;
        };
        if !relation.is_complete(graph) {
            return false;
        }

        let mut member_ways: Vec<&Way> = Vec::new();
        for m in &relation.members {
            if m.kind == EntityKind::Way {
                if let Some(w) = graph.get(&m.id).and_then(Entity::as_way) {
                    if !member_ways.iter().any(|mw| mw.id == w.id) {
                        member_ways.push(w);
                    }
                }
            }
        }

        let from = relation.member_by_role("from");
        let to = relation.member_by_role("to");
        let is_uturn = matches!((from, to), (Some(f), Some(t)) if f.id == t.id);

        let nodes = RoleNodes::collect(relation, graph);

        let mut connect_from = false;
        let mut connect_via = false;
        let mut connect_to = false;
        let mut connect_key = false;
        for id in &self.node_ids {
            connect_from |= nodes.from.contains(id);
            connect_via |= nodes.via.contains(id);
            connect_to |= nodes.to.contains(id);
            connect_key |= nodes.keyfrom.contains(id) || nodes.keyto.contains(id);
        }

        if connect_from && connect_to && !is_uturn {
            return true;
        }
        if (connect_from || connect_to) && connect_via {
            return true;
        }

        // Connecting onto a junction node: allowed only for a pair of
        // adjacent nodes on one member way.
        if connect_key {
            if self.node_ids.len() != 2 {
                return true;
            }
            let a = &self.node_ids[0];
            let b = &self.node_ids[1];
            let a_on_member = member_ways.iter().any(|w| w.contains(a));
            let b_on_member = member_ways.iter().any(|w| w.contains(b));
            if a_on_member && b_on_member && !member_ways.iter().any(|w| w.are_adjacent(a, b)) {
                return true;
            }
        }

        // Simulate the merge on each member way and reject if any would
        // collapse.
        for way in &member_ways {
            let mut trial = (*way).clone();
            for id in &self.node_ids {
                if id == survivor_id {
                    continue;
                }
                trial = if trial.are_adjacent(id, survivor_id) {
                    trial.remove_node(id)
                } else {
                    trial.replace_node(id, survivor_id)
                };
            }
            if trial.is_degenerate() {
                return true;
            }
        }

        false
    }
}

/// Node ids of a restriction bucketed by role. `keyfrom`/`keyto` are the
/// junction nodes where the from/to legs meet the via.
struct RoleNodes {
    from: Vec<EntityId>,
    via: Vec<EntityId>,
    to: Vec<EntityId>,
    keyfrom: Vec<EntityId>,
    keyto: Vec<EntityId>,
}

impl RoleNodes {
    fn collect(relation: &crate::entity::Relation, graph: &Graph) -> Self {
        let mut nodes = Self {
            from: Vec::new(),
            via: Vec::new(),
            to: Vec::new(),
            keyfrom: Vec::new(),
            keyto: Vec::new(),
        };

        for member in &relation.members {
            nodes.collect_member(member, graph);
        }

        // A key node is one referenced by more than one leg.
        nodes.keyfrom = duplicates_only(&nodes.keyfrom);
        nodes.keyto = duplicates_only(&nodes.keyto);

        let keyfrom = nodes.keyfrom.clone();
        let keyto = nodes.keyto.clone();
        let not_key = |id: &EntityId| !keyfrom.contains(id) && !keyto.contains(id);
        nodes.from.retain(not_key);
        nodes.via.retain(not_key);
        nodes.to.retain(not_key);

        nodes
    }

    fn collect_member(&mut self, member: &Member, graph: &Graph) {
        let Some(entity) = graph.get(&member.id) else {
            return;
        };
        match entity {
            Entity::Node(n) => {
                self.role_bucket(&member.role).push(n.id.clone());
                if member.role == "via" {
                    self.keyfrom.push(n.id.clone());
                    self.keyto.push(n.id.clone());
                }
            }
            Entity::Way(w) => {
                self.role_bucket(&member.role).extend(w.nodes.iter().cloned());
                let ends = w.first().into_iter().chain(w.last()).cloned();
                if member.role == "from" || member.role == "via" {
                    self.keyfrom.extend(ends.clone());
                }
                if member.role == "to" || member.role == "via" {
                    self.keyto.extend(ends);
                }
            }
            Entity::Relation(_) => {}
        }
    }

    fn role_bucket(&mut self, role: &str) -> &mut Vec<EntityId> {
        match role {
            "from" => &mut self.from,
            "to" => &mut self.to,
            // Unknown roles land in via's bucket only when actually via;
            // anything else is irrelevant to the damage check.
            _ => &mut self.via,
        }
    }
}

fn duplicates_only(ids: &[EntityId]) -> Vec<EntityId> {
    let mut out = Vec::new();
    for id in ids {
        let count = ids.iter().filter(|other| *other == id).count();
        if count > 1 && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

fn push_unique(ids: &mut Vec<EntityId>, id: EntityId) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
