use crate::entity::{Entity, EntityId, EntityKind, Member, Relation, Tags};
use crate::graph::Graph;
use crate::intersection::{Turn, TurnVia};

use super::delete::delete_relation;
use super::Action;

/// Materialize a turn as a restriction relation: `from` way, `via` node
/// or ways, `to` way, tagged with the given restriction value.
#[derive(Debug, Clone)]
pub struct RestrictTurn {
    turn: Turn,
    restriction: String,
    relation_id: EntityId,
}

impl RestrictTurn {
    /// `restriction` is the tag value, such as `no_right_turn` or
    /// `only_straight_on`. `relation_id` is a caller-minted id for the
    /// new relation.
    pub fn new(turn: Turn, restriction: &str, relation_id: impl Into<EntityId>) -> Self {
        Self {
            turn,
            restriction: restriction.to_owned(),
            relation_id: relation_id.into(),
        }
    }
}

impl Action for RestrictTurn {
    fn apply(&self, graph: &Graph) -> Graph {
        let mut members = vec![Member::new(
            self.turn.from.way.clone(),
            EntityKind::Way,
            "from",
        )];
        match &self.turn.via {
            TurnVia::Node(node) => {
                members.push(Member::new(node.clone(), EntityKind::Node, "via"));
            }
            TurnVia::Ways(ways) => {
                for way in ways {
                    members.push(Member::new(way.clone(), EntityKind::Way, "via"));
                }
            }
        }
        members.push(Member::new(self.turn.to.way.clone(), EntityKind::Way, "to"));

        let mut tags = Tags::new();
        tags.insert("type".to_owned(), "restriction".to_owned());
        tags.insert("restriction".to_owned(), self.restriction.clone());

        graph.replace(Entity::from(
            Relation::new(self.relation_id.clone())
                .with_tags(tags)
                .with_members(members),
        ))
    }
}

/// Remove the restriction relation forbidding or forcing a turn.
#[derive(Debug, Clone)]
pub struct UnrestrictTurn {
    relation_id: EntityId,
}

impl UnrestrictTurn {
    /// `relation_id` is the restriction carried by the turn being lifted.
    pub fn new(relation_id: impl Into<EntityId>) -> Self {
        Self {
            relation_id: relation_id.into(),
        }
    }
}

impl Action for UnrestrictTurn {
    fn apply(&self, graph: &Graph) -> Graph {
        delete_relation(graph.clone(), &self.relation_id)
    }
}
