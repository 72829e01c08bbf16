//! Junction analysis and turn enumeration.
//!
//! An [`Intersection`] is a small virtual graph built around one vertex:
//! nearby road ways are collected, reverse oneways are normalized to
//! flow with node order, ways running through a key vertex are split so
//! every way touches key vertices only at its ends, and dangling stubs
//! are trimmed away. Each way is annotated with the turn roles its
//! endpoints allow.
//!
//! [`Intersection::turns`] then walks this graph depth-first and reports
//! every maneuver leaving a given way, along with any turn restriction
//! that forbids (`no = true`) or forces (`only = true`) it. Turn order
//! follows the graph's insertion-ordered parent indexes, so results are
//! deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::entity::{Entity, EntityId, EntityKind, Relation, Way};
use crate::geo::spherical_distance;
use crate::graph::Graph;

/// Default reach of an intersection, in meters from the start vertex.
pub const DEFAULT_MAX_DISTANCE: f64 = 30.0;

/// Highway classes that participate in junction analysis.
const ROAD_CLASSES: [&str; 16] = [
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "residential",
    "unclassified",
    "living_street",
    "service",
    "road",
    "track",
];

fn is_road(way: &Way) -> bool {
    if way.is_area() || way.is_degenerate() {
        return false;
    }
    way.tags
        .get("highway")
        .is_some_and(|h| ROAD_CLASSES.contains(&h.as_str()))
}

/// Turn roles a way's position in the junction allows.
#[derive(Debug, Clone, Copy, Default)]
pub struct WayMeta {
    pub one_way: bool,
    /// First node is a key vertex.
    pub first_vertex: bool,
    /// Last node is a key vertex.
    pub last_vertex: bool,
    /// Both ends on key vertices, so the way can carry a path through.
    pub via: bool,
    /// A turn may start on this way.
    pub from: bool,
    /// A turn may end on this way.
    pub to: bool,
}

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

/// Where a turn starts: the approach node and the way it arrives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnStart {
    pub node: EntityId,
    pub way: EntityId,
}

/// Where a turn ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnEnd {
    pub node: EntityId,
    pub way: EntityId,
}

/// What the turn passes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnVia {
    Node(EntityId),
    Ways(Vec<EntityId>),
}

/// One maneuver through the junction.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// Path ids joined with `_`; unique within one enumeration.
    pub key: String,
    pub from: TurnStart,
    pub via: TurnVia,
    pub to: TurnEnd,
    /// The restriction relation governing this turn, if any.
    pub restriction_id: Option<EntityId>,
    /// The turn is forbidden.
    pub no: bool,
    /// The turn is the mandated continuation of an `only_` restriction.
    pub only: bool,
    /// Whether the governing restriction names this exact from way.
    /// `None` when unrestricted.
    pub direct: Option<bool>,
    pub u_turn: bool,
}

// ---------------------------------------------------------------------------
// Intersection
// ---------------------------------------------------------------------------

/// A junction extracted around one vertex.
#[derive(Debug, Clone)]
pub struct Intersection {
    vgraph: Graph,
    vertex_ids: Vec<EntityId>,
    way_ids: Vec<EntityId>,
    meta: HashMap<EntityId, WayMeta>,
    max_distance: f64,
}

impl Intersection {
    pub fn new(graph: &Graph, start_vertex: &EntityId) -> Self {
        Self::with_max_distance(graph, start_vertex, DEFAULT_MAX_DISTANCE)
    }

    pub fn with_max_distance(graph: &Graph, start_vertex: &EntityId, max_distance: f64) -> Self {
        Self::with_predicate(graph, start_vertex, max_distance, &is_road)
    }

    /// Build the junction with a custom routability predicate. Ways the
    /// predicate rejects still enter the virtual graph when a restriction
    /// relation names them.
    #[allow(clippy::too_many_lines)]
    pub fn with_predicate(
        graph: &Graph,
        start_vertex: &EntityId,
        max_distance: f64,
        routable: &dyn Fn(&Way) -> bool,
    ) -> Self {
        let start_loc = node_loc(graph, start_vertex);

        // Key-vertex discovery: roads around the start vertex, plus the
        // vertices where two of them meet within reach.
        let mut vertex_ids: Vec<EntityId> = Vec::new();
        let mut way_ids: Vec<EntityId> = Vec::new();
        let mut check: Vec<EntityId> = vec![start_vertex.clone()];

        while let Some(vid) = check.pop() {
            let mut has_ways = false;
            let parent_ids: Vec<EntityId> = graph.parent_way_ids(&vid).cloned().collect();
            for wid in parent_ids {
                let Some(way) = graph.get(&wid).and_then(Entity::as_way) else {
                    continue;
                };
                if !routable(way) && !member_of_restriction(graph, &wid) {
                    continue;
                }
                if !way_ids.contains(&wid) {
                    way_ids.push(wid.clone());
                }
                has_ways = true;

                let mut seen_children: Vec<&EntityId> = Vec::new();
                for nid in &way.nodes {
                    if *nid == vid || seen_children.contains(&nid) {
                        continue;
                    }
                    seen_children.push(nid);
                    if vertex_ids.contains(nid) || check.contains(nid) {
                        continue;
                    }
                    if let (Some(a), Some(b)) = (node_loc(graph, nid), start_loc) {
                        if spherical_distance(a, b) > max_distance {
                            continue;
                        }
                    }
                    // A key vertex has another road besides this way.
                    let branches = graph.parent_way_ids(nid).any(|pid| {
                        *pid != wid
                            && !way_ids.contains(pid)
                            && graph.get(pid).and_then(Entity::as_way).is_some_and(routable)
                    });
                    if branches {
                        check.push(nid.clone());
                    }
                }
            }
            if has_ways && !vertex_ids.contains(&vid) {
                vertex_ids.push(vid);
            }
        }

        // Build the virtual graph: the collected ways, their child nodes,
        // and any structurally valid restrictions among them.
        let mut vgraph = Graph::default();
        for wid in &way_ids {
            if let Some(way) = graph.get_arc(wid) {
                if let Entity::Way(w) = way.as_ref() {
                    for nid in &w.nodes {
                        if let Some(node) = graph.get_arc(nid) {
                            vgraph = vgraph.replace(Arc::clone(node));
                        }
                    }
                }
                vgraph = vgraph.replace(Arc::clone(way));
            }
            for relation in graph.parent_relations(wid) {
                if relation.is_restriction() && relation.is_valid_restriction() {
                    if let Some(arc) = graph.get_arc(&relation.id) {
                        vgraph = vgraph.replace(Arc::clone(arc));
                    }
                }
            }
        }

        // Normalize reverse oneways so traversal always runs with node
        // order.
        for wid in &way_ids {
            let reversed = vgraph
                .get(wid)
                .and_then(Entity::as_way)
                .filter(|w| w.is_reverse_one_way())
                .map(|w| w.reverse(true));
            if let Some(w) = reversed {
                vgraph = vgraph.replace(Entity::from(w));
            }
        }

        // Split ways running through key vertices, so ways touch key
        // vertices only at their ends.
        let mut split_seq = 0u32;
        for vid in &vertex_ids {
            loop {
                let splittable = vgraph
                    .parent_ways(vid)
                    .into_iter()
                    .find(|w| needs_split(w, vid))
                    .map(|w| w.id.clone());
                let Some(wid) = splittable else { break };
                split_seq += 1;
                let mut new_id = EntityId::from(format!("w-{split_seq}"));
                while vgraph.has(&new_id) {
                    split_seq += 1;
                    new_id = EntityId::from(format!("w-{split_seq}"));
                }
                vgraph = split_way(&vgraph, &wid, vid, &new_id);
            }
        }

        // Re-anchor on the virtual graph and annotate turn roles.
        let mut vertex_ids: Vec<EntityId> = vertex_ids
            .into_iter()
            .filter(|v| vgraph.has(v))
            .collect();
        let mut way_ids: Vec<EntityId> = Vec::new();
        for vid in &vertex_ids {
            for way in vgraph.parent_ways(vid) {
                if !way_ids.contains(&way.id) {
                    way_ids.push(way.id.clone());
                }
            }
        }

        let mut meta: HashMap<EntityId, WayMeta> = HashMap::new();
        for wid in &way_ids {
            if let Some(way) = vgraph.get(wid).and_then(Entity::as_way) {
                meta.insert(wid.clone(), way_meta(way, &vertex_ids));
            }
        }

        // Trim: a vertex joining exactly two ways where one is a dead-end
        // stub contributes no turns; drop the stub, then drop vertices
        // left with fewer than two ways.
        loop {
            let mut changed = false;
            for vid in vertex_ids.clone() {
                if !vgraph.has(&vid) {
                    vertex_ids.retain(|v| *v != vid);
                    continue;
                }
                let parents: Vec<EntityId> = vgraph.parent_way_ids(&vid).cloned().collect();

                if parents.len() == 2 {
                    let a_via = meta.get(&parents[0]).is_some_and(|m| m.via);
                    let b_via = meta.get(&parents[1]).is_some_and(|m| m.via);
                    let leaf = match (a_via, b_via) {
                        (false, true) => Some(&parents[0]),
                        (true, false) => Some(&parents[1]),
                        _ => None,
                    };
                    if let Some(leaf) = leaf {
                        vgraph = vgraph.remove(leaf);
                        meta.remove(leaf);
                        way_ids.retain(|w| w != leaf);
                        changed = true;
                    }
                }

                let remaining = vgraph.parent_way_ids(&vid).count();
                if remaining < 2 {
                    vertex_ids.retain(|v| *v != vid);
                    vgraph = vgraph.remove(&vid);
                    changed = true;
                }
            }

            // Dropped vertices may demote a via way, which the next pass
            // must see.
            for wid in &way_ids {
                if let Some(way) = vgraph.get(wid).and_then(Entity::as_way) {
                    meta.insert(wid.clone(), way_meta(way, &vertex_ids));
                }
            }

            if !changed {
                break;
            }
        }

        tracing::debug!(
            vertex = %start_vertex,
            vertices = vertex_ids.len(),
            ways = way_ids.len(),
            "intersection extracted"
        );

        Self {
            vgraph,
            vertex_ids,
            way_ids,
            meta,
            max_distance,
        }
    }

    /// The virtual graph the analysis ran on.
    pub fn graph(&self) -> &Graph {
        &self.vgraph
    }

    /// Key vertices, in discovery order.
    pub fn vertex_ids(&self) -> &[EntityId] {
        &self.vertex_ids
    }

    /// Participating ways (post split and trim), in discovery order.
    pub fn way_ids(&self) -> &[EntityId] {
        &self.way_ids
    }

    pub fn way_meta(&self, id: &EntityId) -> Option<&WayMeta> {
        self.meta.get(id)
    }

    /// All maneuvers leaving `from_way`, passing through at most
    /// `max_via_ways` intermediate ways.
    pub fn turns(&self, from_way: &EntityId, max_via_ways: usize) -> Vec<Turn> {
        let Some(meta) = self.meta.get(from_way) else {
            return Vec::new();
        };
        if !(meta.from || meta.via) {
            return Vec::new();
        }

        let mut walker = TurnWalker {
            intersection: self,
            from_way: from_way.clone(),
            max_path_len: max_via_ways * 2 + 3,
            turns: Vec::new(),
            seen_keys: HashSet::new(),
        };
        walker.step_way(from_way, &[], &[], None);
        walker.turns
    }
}

fn member_of_restriction(graph: &Graph, id: &EntityId) -> bool {
    graph.parent_relations(id).iter().any(|r| r.is_restriction())
}

/// Tolerant: an unloaded node has no location and never fails a
/// distance check.
fn node_loc(graph: &Graph, id: &EntityId) -> Option<[f64; 2]> {
    graph.get(id).and_then(Entity::as_node).map(|n| n.loc)
}

fn way_meta(way: &Way, vertex_ids: &[EntityId]) -> WayMeta {
    let one_way = way.is_one_way();
    let first_vertex = way.first().is_some_and(|n| vertex_ids.contains(n));
    let last_vertex = way.last().is_some_and(|n| vertex_ids.contains(n));
    WayMeta {
        one_way,
        first_vertex,
        last_vertex,
        via: first_vertex && last_vertex,
        from: (first_vertex && !one_way) || last_vertex,
        to: first_vertex || (last_vertex && !one_way),
    }
}

/// The vertex sits strictly inside the way (or on the closure of a
/// ring), so the way must be cut there.
fn needs_split(way: &Way, vid: &EntityId) -> bool {
    if !way.contains(vid) || way.nodes.len() < 3 {
        return false;
    }
    if way.is_closed() {
        return true;
    }
    way.nodes[1..way.nodes.len() - 1].contains(vid)
}

/// Cut `wid` at `vid`. The piece beginning at the way's start keeps the
/// original id; the other becomes `new_id`. Rings are cut into two open
/// halves: at the closure point and either the opposite-side midpoint
/// (when `vid` is the closure) or the interior vertex.
fn split_way(vgraph: &Graph, wid: &EntityId, vid: &EntityId, new_id: &EntityId) -> Graph {
    let way = match vgraph.entity(wid) {
        Entity::Way(w) => w.clone(),
        other => panic!("split: {} is not a way", other.id()),
    };

    let (first_nodes, second_nodes) = if way.is_closed() {
        let nodes = &way.nodes;
        if nodes.first() == Some(vid) {
            // Ring closed at the vertex: cut opposite, at the middle node.
            let mid = nodes.len() / 2;
            (nodes[..=mid].to_vec(), nodes[mid..].to_vec())
        } else {
            // Ring closed elsewhere: cut at the vertex and the closure.
            let i = way
                .nodes
                .iter()
                .position(|n| n == vid)
                .unwrap_or_else(|| panic!("split: {vid} not in {wid}"));
            (nodes[..=i].to_vec(), nodes[i..].to_vec())
        }
    } else {
        let i = way
            .nodes
            .iter()
            .position(|n| n == vid)
            .unwrap_or_else(|| panic!("split: {vid} not in {wid}"));
        (way.nodes[..=i].to_vec(), way.nodes[i..].to_vec())
    };

    let kept = way.clone().with_nodes(first_nodes);
    let second = Way {
        id: new_id.clone(),
        tags: way.tags.clone(),
        version: 0,
        v: 0,
        nodes: second_nodes,
    };

    let mut graph = vgraph
        .replace(Entity::from(kept.clone()))
        .replace(Entity::from(second.clone()));

    // Restriction members must follow the piece that still touches the
    // restriction's via.
    let parent_relation_ids: Vec<EntityId> = graph.parent_relation_ids(wid).cloned().collect();
    for rid in parent_relation_ids {
        let Some(relation) = graph.get(&rid).and_then(Entity::as_relation) else {
            continue;
        };
        if !relation.is_restriction() {
            continue;
        }
        let via_nodes = restriction_via_nodes(&graph, relation);
        let kept_has_via = kept.nodes.iter().any(|n| via_nodes.contains(n));
        let new_has_via = second.nodes.iter().any(|n| via_nodes.contains(n));
        if new_has_via && !kept_has_via {
            let repaired = relation.replace_member(wid, new_id, EntityKind::Way);
            graph = graph.replace(Entity::from(repaired));
        }
    }

    graph
}

/// Node ids anchoring a restriction's via: the via node itself, or the
/// endpoints of its via ways.
fn restriction_via_nodes(graph: &Graph, relation: &Relation) -> Vec<EntityId> {
    let mut out = Vec::new();
    for m in relation.members_by_role("via") {
        match m.kind {
            EntityKind::Node => out.push(m.id.clone()),
            EntityKind::Way => {
                if let Some(w) = graph.get(&m.id).and_then(Entity::as_way) {
                    out.extend(w.first().into_iter().cloned());
                    out.extend(w.last().into_iter().cloned());
                }
            }
            EntityKind::Relation => {}
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Turn traversal
// ---------------------------------------------------------------------------

/// A restriction whose influence has been resolved against the current
/// path.
#[derive(Debug, Clone)]
struct MatchedRestriction {
    id: EntityId,
    from: EntityId,
    direct: bool,
    no: bool,
    only: bool,
    /// Traversal must not advance past this way.
    end: bool,
}

struct TurnWalker<'a> {
    intersection: &'a Intersection,
    from_way: EntityId,
    max_path_len: usize,
    turns: Vec<Turn>,
    seen_keys: HashSet<String>,
}

impl TurnWalker<'_> {
    fn vgraph(&self) -> &Graph {
        &self.intersection.vgraph
    }

    fn meta(&self, id: &EntityId) -> WayMeta {
        self.intersection.meta.get(id).copied().unwrap_or_default()
    }

    /// Entering `node_id`: fan out into its parent ways, resolving the
    /// gathered restrictions against each candidate continuation.
    fn step_node(&mut self, node_id: &EntityId, path: &[EntityId], restrictions: &[EntityId]) {
        if path.len() >= self.max_path_len {
            return;
        }
        let mut path = path.to_vec();
        path.push(node_id.clone());

        let parent_ids: Vec<EntityId> = self.vgraph().parent_way_ids(node_id).cloned().collect();
        let mut next: Vec<(EntityId, Option<MatchedRestriction>)> = Vec::new();

        for wid in parent_ids {
            let meta = self.meta(&wid);
            // A oneway is enterable only at its first node.
            if meta.one_way {
                let first = self
                    .vgraph()
                    .get(&wid)
                    .and_then(Entity::as_way)
                    .and_then(Way::first);
                if first != Some(node_id) {
                    continue;
                }
            }
            // Revisiting a way is only allowed for the initial u-turn.
            if path.len() >= 3 && path.contains(&wid) {
                continue;
            }

            let mut matched: Option<MatchedRestriction> = None;
            for rid in restrictions {
                let Some(relation) = self.vgraph().get(rid).and_then(Entity::as_relation) else {
                    continue;
                };
                // no_entry and no_exit restrictions may carry several
                // from or to legs; every leg binds.
                let froms: Vec<&crate::entity::Member> =
                    relation.members_by_role("from").collect();
                let vias: Vec<&crate::entity::Member> = relation.members_by_role("via").collect();
                let tos: Vec<&crate::entity::Member> = relation.members_by_role("to").collect();
                let Some(first_from) = froms.first() else {
                    continue;
                };
                if tos.is_empty() {
                    continue;
                }
                let is_only = relation
                    .restriction_type()
                    .is_some_and(|t| t.starts_with("only_"));

                let matches_from = froms.iter().any(|m| m.id == self.from_way);
                // Indirect turns are reported from the restriction's own
                // from way, so pick the leg lying on the walked path.
                let from_id = froms
                    .iter()
                    .find(|m| path.contains(&m.id))
                    .unwrap_or(first_from)
                    .id
                    .clone();
                let mut matches_via_to = false;
                let mut along_only_path = false;

                if tos.iter().any(|m| m.id == wid) {
                    if vias.len() == 1 && vias[0].kind == EntityKind::Node {
                        matches_via_to = vias[0].id == *node_id
                            && ((matches_from && path.len() == 2)
                                || (!matches_from && path.len() > 2));
                    } else {
                        // The whole via chain must have been walked: a
                        // path that merely shares the restriction's
                        // endpoints does not match.
                        let mut path_vias: Vec<&EntityId> =
                            path.iter().skip(2).step_by(2).collect();
                        let mut restriction_vias: Vec<&EntityId> = vias
                            .iter()
                            .filter(|m| m.kind == EntityKind::Way)
                            .map(|m| &m.id)
                            .collect();
                        path_vias.sort();
                        restriction_vias.sort();
                        matches_via_to =
                            !path_vias.is_empty() && path_vias == restriction_vias;
                    }
                } else if is_only {
                    along_only_path = vias
                        .iter()
                        .any(|m| m.kind == EntityKind::Way && m.id == wid);
                }

                if matches_via_to {
                    matched = Some(MatchedRestriction {
                        id: relation.id.clone(),
                        from: from_id,
                        direct: matches_from,
                        no: !is_only,
                        only: is_only,
                        end: true,
                    });
                } else if along_only_path {
                    matched = Some(MatchedRestriction {
                        id: relation.id.clone(),
                        from: from_id,
                        direct: false,
                        no: false,
                        only: true,
                        end: false,
                    });
                } else if is_only {
                    // Leaving the mandated path of an only_ restriction.
                    matched = Some(MatchedRestriction {
                        id: relation.id.clone(),
                        from: from_id,
                        direct: false,
                        no: true,
                        only: false,
                        end: true,
                    });
                }

                if matched.as_ref().is_some_and(|m| m.direct) {
                    break;
                }
            }

            next.push((wid, matched));
        }

        for (wid, matched) in next {
            self.step_way(&wid, &path, restrictions, matched);
        }
    }

    /// Entering `way_id`: record a completed turn if the path is long
    /// enough, then advance into reachable key vertices.
    fn step_way(
        &mut self,
        way_id: &EntityId,
        path: &[EntityId],
        restrictions: &[EntityId],
        matched: Option<MatchedRestriction>,
    ) {
        if path.len() >= self.max_path_len {
            return;
        }
        let mut path = path.to_vec();
        path.push(way_id.clone());

        if path.len() >= 3 {
            // An indirect restriction is reported from the restriction's
            // own from way, not ours.
            let turn_path = match &matched {
                Some(m) if !m.direct => path
                    .iter()
                    .position(|id| *id == m.from)
                    .map_or_else(|| path.clone(), |i| path[i..].to_vec()),
                _ => path.clone(),
            };

            if let Some(mut turn) = self.path_to_turn(&turn_path) {
                if let Some(m) = &matched {
                    turn.restriction_id = Some(m.id.clone());
                    turn.no = m.no;
                    turn.only = m.only;
                    turn.direct = Some(m.direct);
                }
                if self.seen_keys.insert(turn.key.clone()) {
                    self.turns.push(turn);
                }
            }

            // A u-turn ends the walk down this branch.
            if path.first() == path.last() {
                return;
            }
        }

        if matched.as_ref().is_some_and(|m| m.end) {
            return;
        }

        let way = match self.vgraph().entity(way_id) {
            Entity::Way(w) => w.clone(),
            other => panic!("turns: {} is not a way", other.id()),
        };
        let (Some(n1), Some(n2)) = (way.first().cloned(), way.last().cloned()) else {
            return;
        };
        let meta = self.meta(way_id);

        if path.len() > 1 {
            if let (Some(a), Some(b)) = (node_loc(self.vgraph(), &n1), node_loc(self.vgraph(), &n2))
            {
                if spherical_distance(a, b) > self.intersection.max_distance {
                    return;
                }
            }
            if !meta.via {
                return;
            }
        }

        let mut next_nodes: Vec<EntityId> = Vec::new();
        if !meta.one_way
            && self.intersection.vertex_ids.contains(&n1)
            && !path.contains(&n1)
        {
            next_nodes.push(n1);
        }
        if self.intersection.vertex_ids.contains(&n2) && !path.contains(&n2) {
            next_nodes.push(n2);
        }

        for next_node in next_nodes {
            let gathered = self.gather_restrictions(&way, &next_node);
            let mut all = restrictions.to_vec();
            for rid in gathered {
                if !all.contains(&rid) {
                    all.push(rid);
                }
            }
            self.step_node(&next_node, &path, &all);
        }
    }

    /// Restrictions whose from way is `way`. An `only_` restriction is
    /// gathered only when heading toward its via, since its mandate binds
    /// in that direction alone.
    fn gather_restrictions(&self, way: &Way, next_node: &EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        for relation in self.vgraph().parent_relations(&way.id) {
            if !relation.is_restriction() {
                continue;
            }
            // Any from leg qualifies; no_entry restrictions name several.
            if !relation.members_by_role("from").any(|m| m.id == way.id) {
                continue;
            }
            let is_only = relation
                .restriction_type()
                .is_some_and(|t| t.starts_with("only_"));
            if !is_only {
                out.push(relation.id.clone());
                continue;
            }

            let vias: Vec<&crate::entity::Member> = relation.members_by_role("via").collect();
            let toward_via = if vias.len() == 1 && vias[0].kind == EntityKind::Node {
                vias[0].id == *next_node
            } else {
                vias.iter().any(|m| {
                    m.kind == EntityKind::Way
                        && self
                            .vgraph()
                            .get(&m.id)
                            .and_then(Entity::as_way)
                            .is_some_and(|vw| {
                                vw.first() == Some(next_node) || vw.last() == Some(next_node)
                            })
                })
            };
            if toward_via {
                out.push(relation.id.clone());
            }
        }
        out
    }

    /// Interpret an alternating way-node-... path as a [`Turn`]. A
    /// three-element path returning to its own way is a u-turn, reported
    /// only for bidirectional ways.
    fn path_to_turn(&self, path: &[EntityId]) -> Option<Turn> {
        if path.len() < 3 {
            return None;
        }
        let from_way = &path[0];
        let to_way = &path[path.len() - 1];

        let adjacent = |way_id: &EntityId, affix: &EntityId| -> Option<EntityId> {
            let way = self.vgraph().get(way_id).and_then(Entity::as_way)?;
            if way.first() == Some(affix) {
                way.nodes.get(1).cloned()
            } else {
                way.nodes.get(way.nodes.len().checked_sub(2)?).cloned()
            }
        };

        if path.len() == 3 && from_way == to_way {
            if self.meta(from_way).one_way {
                return None;
            }
            let via = &path[1];
            let node = adjacent(from_way, via)?;
            return Some(Turn {
                key: join_key(path),
                from: TurnStart {
                    node: node.clone(),
                    way: from_way.clone(),
                },
                via: TurnVia::Node(via.clone()),
                to: TurnEnd {
                    node,
                    way: to_way.clone(),
                },
                restriction_id: None,
                no: false,
                only: false,
                direct: None,
                u_turn: true,
            });
        }

        let from_vertex = &path[1];
        let to_vertex = &path[path.len() - 2];
        let from_node = adjacent(from_way, from_vertex)?;
        let to_node = adjacent(to_way, to_vertex)?;

        let via = if path.len() == 3 {
            TurnVia::Node(from_vertex.clone())
        } else {
            TurnVia::Ways(
                path[2..path.len() - 1]
                    .iter()
                    .step_by(2)
                    .cloned()
                    .collect(),
            )
        };

        Some(Turn {
            key: join_key(path),
            from: TurnStart {
                node: from_node,
                way: from_way.clone(),
            },
            via,
            to: TurnEnd {
                node: to_node,
                way: to_way.clone(),
            },
            restriction_id: None,
            no: false,
            only: false,
            direct: None,
            u_turn: false,
        })
    }
}

fn join_key(path: &[EntityId]) -> String {
    path.iter()
        .map(EntityId::as_str)
        .collect::<Vec<_>>()
        .join("_")
}
