//! Grouping entities: ordered member lists with roles.

use serde::{Deserialize, Serialize};

use super::{EntityId, EntityKind, Tags};
use crate::graph::Graph;

/// One relation member. Role may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default)]
    pub role: String,
}

impl Member {
    pub fn new(id: impl Into<EntityId>, kind: EntityKind, role: &str) -> Self {
        Self {
            id: id.into(),
            kind,
            role: role.to_owned(),
        }
    }
}

/// An ordered list of members, each an id plus kind plus role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: EntityId,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub v: u32,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Relation {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            tags: Tags::new(),
            version: 0,
            v: 0,
            members: Vec::new(),
        }
    }

    pub fn with_members(self, members: Vec<Member>) -> Self {
        Self {
            members,
            v: self.v + 1,
            ..self
        }
    }

    pub fn with_tags(self, tags: Tags) -> Self {
        Self {
            tags,
            v: self.v + 1,
            ..self
        }
    }

    pub fn has_member(&self, id: &EntityId) -> bool {
        self.members.iter().any(|m| &m.id == id)
    }

    /// First member carrying `id`, if any.
    pub fn member_by_id(&self, id: &EntityId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    /// First member carrying `role`, if any.
    pub fn member_by_role(&self, role: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.role == role)
    }

    /// All members carrying `role`, in order.
    pub fn members_by_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a Member> {
        self.members.iter().filter(move |m| m.role == role)
    }

    /// Roles held by `id` within this relation, in member order.
    pub fn member_roles<'a>(&'a self, id: &'a EntityId) -> impl Iterator<Item = &'a str> {
        self.members
            .iter()
            .filter(move |m| &m.id == id)
            .map(|m| m.role.as_str())
    }

    /// Replace members holding `needle` with `replacement` (role kept).
    /// When the swap would duplicate an existing (id, kind, role) triple,
    /// the duplicate is dropped rather than kept.
    pub fn replace_member(&self, needle: &EntityId, replacement: &EntityId, kind: EntityKind) -> Self {
        if !self.has_member(needle) {
            return self.clone();
        }
        let mut members: Vec<Member> = Vec::with_capacity(self.members.len());
        for m in &self.members {
            let candidate = if &m.id == needle {
                Member {
                    id: replacement.clone(),
                    kind,
                    role: m.role.clone(),
                }
            } else {
                m.clone()
            };
            if &m.id == needle && members.contains(&candidate) {
                continue;
            }
            members.push(candidate);
        }
        // A replaced member may also collide with an original further on.
        let mut deduped: Vec<Member> = Vec::with_capacity(members.len());
        for m in members {
            if !deduped.contains(&m) {
                deduped.push(m);
            }
        }
        self.clone().with_members(deduped)
    }

    /// Drop every member holding `id`.
    pub fn remove_members_with_id(&self, id: &EntityId) -> Self {
        let members = self
            .members
            .iter()
            .filter(|m| &m.id != id)
            .cloned()
            .collect();
        self.clone().with_members(members)
    }

    /// True when every member entity is present in `graph`.
    pub fn is_complete(&self, graph: &Graph) -> bool {
        self.members.iter().all(|m| graph.has(&m.id))
    }

    /// Fewer than one member.
    pub fn is_degenerate(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_multipolygon(&self) -> bool {
        self.tags.get("type").map(String::as_str) == Some("multipolygon")
    }

    /// `type=restriction`, including namespaced variants such as
    /// `type=restriction:hgv`.
    pub fn is_restriction(&self) -> bool {
        self.tags
            .get("type")
            .is_some_and(|t| t == "restriction" || t.starts_with("restriction:"))
    }

    /// The restriction value (`no_left_turn`, `only_straight_on`, ...),
    /// read from `restriction` or any `restriction:*` key.
    pub fn restriction_type(&self) -> Option<&str> {
        self.tags
            .get("restriction")
            .or_else(|| {
                self.tags
                    .iter()
                    .find(|(k, _)| k.starts_with("restriction:"))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// Structural validity for turn restrictions: exactly one `from` way
    /// (unless `no_entry`), exactly one `to` way (unless `no_exit`), at
    /// least one `via`, and multiple vias must all be ways.
    pub fn is_valid_restriction(&self) -> bool {
        if !self.is_restriction() {
            return false;
        }
        let restriction = self.restriction_type().unwrap_or("");

        let froms: Vec<&Member> = self
            .members_by_role("from")
            .filter(|m| m.kind == EntityKind::Way)
            .collect();
        let tos: Vec<&Member> = self
            .members_by_role("to")
            .filter(|m| m.kind == EntityKind::Way)
            .collect();
        let vias: Vec<&Member> = self.members_by_role("via").collect();

        if froms.len() != 1 && restriction != "no_entry" {
            return false;
        }
        if tos.len() != 1 && restriction != "no_exit" {
            return false;
        }
        if vias.is_empty() {
            return false;
        }
        if vias.len() > 1 && vias.iter().any(|m| m.kind != EntityKind::Way) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tags;

    fn member(id: &str, kind: EntityKind, role: &str) -> Member {
        Member::new(id, kind, role)
    }

    #[test]
    fn replace_member_keeps_role_and_dedups() {
        let r = Relation::new("r".into()).with_members(vec![
            member("b", EntityKind::Node, "stop"),
            member("c", EntityKind::Node, "stop"),
        ]);
        let replaced = r.replace_member(&"b".into(), &"c".into(), EntityKind::Node);
        assert_eq!(replaced.members, vec![member("c", EntityKind::Node, "stop")]);
    }

    #[test]
    fn replace_member_distinct_roles_survive() {
        let r = Relation::new("r".into()).with_members(vec![
            member("b", EntityKind::Node, "via"),
            member("c", EntityKind::Node, "to"),
        ]);
        let replaced = r.replace_member(&"b".into(), &"c".into(), EntityKind::Node);
        assert_eq!(
            replaced.members,
            vec![
                member("c", EntityKind::Node, "via"),
                member("c", EntityKind::Node, "to"),
            ]
        );
    }

    #[test]
    fn restriction_detection_covers_namespaced_types() {
        let plain = Relation::new("r".into()).with_tags(tags([
            ("type", "restriction"),
            ("restriction", "no_left_turn"),
        ]));
        assert!(plain.is_restriction());
        assert_eq!(plain.restriction_type(), Some("no_left_turn"));

        let hgv = Relation::new("r".into()).with_tags(tags([
            ("type", "restriction:hgv"),
            ("restriction:hgv", "no_right_turn"),
        ]));
        assert!(hgv.is_restriction());
        assert_eq!(hgv.restriction_type(), Some("no_right_turn"));

        let route = Relation::new("r".into()).with_tags(tags([("type", "route")]));
        assert!(!route.is_restriction());
    }

    #[test]
    fn restriction_validity_rules() {
        let valid = Relation::new("r".into())
            .with_tags(tags([("type", "restriction"), ("restriction", "no_u_turn")]))
            .with_members(vec![
                member("w1", EntityKind::Way, "from"),
                member("n1", EntityKind::Node, "via"),
                member("w2", EntityKind::Way, "to"),
            ]);
        assert!(valid.is_valid_restriction());

        let no_via = valid.clone().with_members(vec![
            member("w1", EntityKind::Way, "from"),
            member("w2", EntityKind::Way, "to"),
        ]);
        assert!(!no_via.is_valid_restriction());

        let two_froms = valid.clone().with_members(vec![
            member("w1", EntityKind::Way, "from"),
            member("w3", EntityKind::Way, "from"),
            member("n1", EntityKind::Node, "via"),
            member("w2", EntityKind::Way, "to"),
        ]);
        assert!(!two_froms.is_valid_restriction());

        let no_entry = two_froms.with_tags(tags([
            ("type", "restriction"),
            ("restriction", "no_entry"),
        ]));
        assert!(no_entry.is_valid_restriction());

        let mixed_vias = valid.with_members(vec![
            member("w1", EntityKind::Way, "from"),
            member("w3", EntityKind::Way, "via"),
            member("n1", EntityKind::Node, "via"),
            member("w2", EntityKind::Way, "to"),
        ]);
        assert!(!mixed_vias.is_valid_restriction());
    }
}
