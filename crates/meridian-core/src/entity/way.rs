//! Linear entities: ordered node-id sequences.

use serde::{Deserialize, Serialize};

use super::{EntityId, Tags};

/// Which end of a way a node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affix {
    Prefix,
    Suffix,
}

/// An ordered sequence of node ids. A way whose first and last ids are
/// equal is closed (a ring).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Way {
    pub id: EntityId,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub v: u32,
    #[serde(default)]
    pub nodes: Vec<EntityId>,
}

impl Way {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            tags: Tags::new(),
            version: 0,
            v: 0,
            nodes: Vec::new(),
        }
    }

    pub fn with_nodes(self, nodes: Vec<EntityId>) -> Self {
        Self {
            nodes,
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

    pub fn first(&self) -> Option<&EntityId> {
        self.nodes.first()
    }

    pub fn last(&self) -> Option<&EntityId> {
        self.nodes.last()
    }

    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 1 && self.nodes.first() == self.nodes.last()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.nodes.contains(id)
    }

    /// `Prefix` or `Suffix` if the node is a way endpoint.
    pub fn affix(&self, id: &EntityId) -> Option<Affix> {
        if self.nodes.first() == Some(id) {
            Some(Affix::Prefix)
        } else if self.nodes.last() == Some(id) {
            Some(Affix::Suffix)
        } else {
            None
        }
    }

    /// Whether the two ids appear at consecutive positions anywhere in the
    /// node list (either order).
    pub fn are_adjacent(&self, a: &EntityId, b: &EntityId) -> bool {
        self.nodes
            .windows(2)
            .any(|w| (&w[0] == a && &w[1] == b) || (&w[0] == b && &w[1] == a))
    }

    /// Traversal restricted to one direction. `oneway=-1` and
    /// `oneway=reverse` count; so do roundabout and circular junctions.
    pub fn is_one_way(&self) -> bool {
        match self.tags.get("oneway").map(String::as_str) {
            Some("yes" | "1" | "true" | "-1" | "reverse") => true,
            Some("no" | "0" | "false") => false,
            _ => matches!(
                self.tags.get("junction").map(String::as_str),
                Some("roundabout" | "circular")
            ),
        }
    }

    /// One-way against node order, so traversal runs last to first.
    pub fn is_reverse_one_way(&self) -> bool {
        matches!(
            self.tags.get("oneway").map(String::as_str),
            Some("-1" | "reverse")
        )
    }

    /// Only the explicit `area=yes` tag makes a way an area here; richer
    /// preset-driven inference belongs to callers.
    pub fn is_area(&self) -> bool {
        self.tags.get("area").map(String::as_str) == Some("yes")
    }

    /// Fewer than two distinct nodes (three for areas).
    pub fn is_degenerate(&self) -> bool {
        let mut distinct: Vec<&EntityId> = Vec::with_capacity(self.nodes.len());
        for n in &self.nodes {
            if !distinct.contains(&n) {
                distinct.push(n);
            }
        }
        distinct.len() < if self.is_area() { 3 } else { 2 }
    }

    /// Replace every occurrence of `needle` with `replacement`, collapsing
    /// any adjacent repeats the substitution creates. A closed way stays
    /// closed.
    pub fn replace_node(&self, needle: &EntityId, replacement: &EntityId) -> Self {
        let was_closed = self.is_closed();
        let mut nodes: Vec<EntityId> = Vec::with_capacity(self.nodes.len());
        for n in &self.nodes {
            let next = if n == needle { replacement.clone() } else { n.clone() };
            if nodes.last() != Some(&next) {
                nodes.push(next);
            }
        }
        reclose(&mut nodes, was_closed);
        self.clone().with_nodes(nodes)
    }

    /// Remove every occurrence of `id`, collapsing adjacent repeats. A
    /// closed way stays closed when enough nodes remain.
    pub fn remove_node(&self, id: &EntityId) -> Self {
        let was_closed = self.is_closed();
        let mut nodes: Vec<EntityId> = Vec::with_capacity(self.nodes.len());
        for n in &self.nodes {
            if n == id || nodes.last() == Some(n) {
                continue;
            }
            nodes.push(n.clone());
        }
        reclose(&mut nodes, was_closed);
        self.clone().with_nodes(nodes)
    }

    /// Reverse node order. When `reverse_oneway` is set, `oneway=yes` and
    /// `oneway=-1` swap so travel direction is preserved.
    pub fn reverse(&self, reverse_oneway: bool) -> Self {
        let mut nodes = self.nodes.clone();
        nodes.reverse();
        let mut tags = self.tags.clone();
        if reverse_oneway {
            if let Some(v) = tags.get_mut("oneway") {
                *v = match v.as_str() {
                    "yes" | "1" | "true" => "-1".to_owned(),
                    "-1" | "reverse" => "yes".to_owned(),
                    other => other.to_owned(),
                };
            }
        }
        Self {
            nodes,
            tags,
            v: self.v + 1,
            ..self.clone()
        }
    }
}

fn reclose(nodes: &mut Vec<EntityId>, was_closed: bool) {
    if was_closed && nodes.len() > 1 && nodes.first() != nodes.last() {
        if let Some(first) = nodes.first().cloned() {
            nodes.push(first);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tags;

    fn way(id: &str, nodes: &[&str]) -> Way {
        Way::new(id.into()).with_nodes(nodes.iter().map(|n| (*n).into()).collect())
    }

    #[test]
    fn detects_closed_ways() {
        assert!(way("w", &["a", "b", "c", "a"]).is_closed());
        assert!(!way("w", &["a", "b", "c"]).is_closed());
        assert!(!way("w", &["a"]).is_closed());
    }

    #[test]
    fn affix_reports_endpoints_only() {
        let w = way("w", &["a", "b", "c"]);
        assert_eq!(w.affix(&"a".into()), Some(Affix::Prefix));
        assert_eq!(w.affix(&"c".into()), Some(Affix::Suffix));
        assert_eq!(w.affix(&"b".into()), None);
    }

    #[test]
    fn replace_node_collapses_adjacent_repeats() {
        let w = way("w", &["a", "b", "c"]).replace_node(&"b".into(), &"c".into());
        assert_eq!(w.nodes, vec![EntityId::from("a"), "c".into()]);
    }

    #[test]
    fn replace_node_preserves_circularity() {
        let w = way("w", &["a", "b", "c", "a"]).replace_node(&"a".into(), &"d".into());
        assert_eq!(
            w.nodes,
            vec![EntityId::from("d"), "b".into(), "c".into(), "d".into()]
        );
        assert!(w.is_closed());
    }

    #[test]
    fn remove_node_recloses_ring() {
        let w = way("w", &["a", "b", "c", "a"]).remove_node(&"a".into());
        assert_eq!(w.nodes, vec![EntityId::from("b"), "c".into(), "b".into()]);
        assert!(w.is_closed());
    }

    #[test]
    fn oneway_variants() {
        assert!(way("w", &[]).clone().with_tags(tags([("oneway", "yes")])).is_one_way());
        assert!(way("w", &[]).with_tags(tags([("oneway", "-1")])).is_one_way());
        assert!(way("w", &[]).with_tags(tags([("oneway", "-1")])).is_reverse_one_way());
        assert!(way("w", &[]).with_tags(tags([("junction", "roundabout")])).is_one_way());
        assert!(!way("w", &[]).with_tags(tags([("oneway", "no")])).is_one_way());
        assert!(!way("w", &[]).is_one_way());
    }

    #[test]
    fn degenerate_ways() {
        assert!(way("w", &["a"]).is_degenerate());
        assert!(way("w", &["a", "a", "a"]).is_degenerate());
        assert!(!way("w", &["a", "b"]).is_degenerate());
        assert!(way("w", &["a", "b", "a"]).with_tags(tags([("area", "yes")])).is_degenerate());
    }

    #[test]
    fn reverse_swaps_oneway_when_asked() {
        let w = way("w", &["a", "b"]).with_tags(tags([("oneway", "yes")]));
        let rev = w.reverse(true);
        assert_eq!(rev.nodes, vec![EntityId::from("b"), "a".into()]);
        assert_eq!(rev.tags.get("oneway").map(String::as_str), Some("-1"));
        let back = rev.reverse(true);
        assert_eq!(back.tags.get("oneway").map(String::as_str), Some("yes"));
        let untouched = w.reverse(false);
        assert_eq!(untouched.tags.get("oneway").map(String::as_str), Some("yes"));
    }
}
