//! Immutable graph snapshots with copy-on-write derivation.
//!
//! A [`Graph`] layers a per-snapshot overlay over a shared, immutable
//! base:
//!
//! | layer   | contents                              | cost to derive |
//! |---------|---------------------------------------|----------------|
//! | `base`  | loaded entities plus parent indexes   | shared (`Arc`) |
//! | `local` | edited entities, tombstones, touched parent sets | cloned |
//!
//! Deriving a snapshot clones only the overlay, so cost tracks the number
//! of edited entities, never the base size. Entities are held behind
//! `Arc`, which gives `replace` reference-identity round trips:
//! `g.replace(e)` followed by a lookup of `e`'s id yields the same
//! allocation, and difference computation exploits pointer equality as a
//! fast path.
//!
//! Parent indexes (node to ways, entity to relations) are maintained
//! incrementally on every mutation and answer in insertion order. Turn
//! computation depends on that order, so the sets are [`IndexSet`]s.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexSet;

use crate::entity::{Entity, EntityId, Node, Relation, Way};
use crate::error::GraphError;

/// How an entity renders on a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// Standalone node.
    Point,
    /// Node referenced by at least one way.
    Vertex,
    Line,
    Area,
    Relation,
}

type ParentIndex = HashMap<EntityId, IndexSet<EntityId>>;

/// Shared, immutable bottom layer.
#[derive(Debug, Default)]
struct Base {
    entities: HashMap<EntityId, Arc<Entity>>,
    parent_ways: ParentIndex,
    parent_relations: ParentIndex,
}

/// Per-snapshot overlay. `None` in `entities` is a tombstone shadowing a
/// base entity. A parent set present here shadows the base set for that
/// id entirely.
#[derive(Debug, Default, Clone)]
struct Overlay {
    entities: HashMap<EntityId, Option<Arc<Entity>>>,
    parent_ways: ParentIndex,
    parent_relations: ParentIndex,
}

/// An immutable snapshot of the entity graph.
#[derive(Debug, Clone)]
pub struct Graph {
    base: Arc<Base>,
    local: Overlay,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(std::iter::empty::<Entity>())
    }
}

impl Graph {
    /// Build a fresh base layer from loaded entities and compute its
    /// parent indexes.
    pub fn new(entities: impl IntoIterator<Item = impl Into<Entity>>) -> Self {
        let mut base = Base::default();
        for entity in entities {
            let entity: Arc<Entity> = Arc::new(entity.into());
            index_parents(&entity, &mut base.parent_ways, &mut base.parent_relations);
            base.entities.insert(entity.id().clone(), entity);
        }
        Self {
            base: Arc::new(base),
            local: Overlay::default(),
        }
    }

    // -----------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------

    /// Tolerant lookup. Absent and deleted both answer `None`.
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.get_arc(id).map(Arc::as_ref)
    }

    /// Lookup preserving the shared handle, for identity comparisons.
    pub fn get_arc(&self, id: &EntityId) -> Option<&Arc<Entity>> {
        match self.local.entities.get(id) {
            Some(Some(e)) => Some(e),
            Some(None) => None,
            None => self.base.entities.get(id),
        }
    }

    /// Strict lookup. Callers use this when absence is a bug in their own
    /// bookkeeping.
    ///
    /// # Panics
    ///
    /// Panics when `id` is absent or deleted.
    pub fn entity(&self, id: &EntityId) -> &Entity {
        match self.get(id) {
            Some(e) => e,
            None => panic!("graph: no entity {id}"),
        }
    }

    /// Strict lookup returning an error instead of panicking.
    pub fn try_entity(&self, id: &EntityId) -> Result<&Entity, GraphError> {
        self.get(id).ok_or_else(|| GraphError::not_found(id))
    }

    pub fn has(&self, id: &EntityId) -> bool {
        self.get_arc(id).is_some()
    }

    /// The base-layer entity for `id`, ignoring the overlay.
    pub(crate) fn base_entity(&self, id: &EntityId) -> Option<&Arc<Entity>> {
        self.base.entities.get(id)
    }

    /// The overlay map. Difference computation walks this instead of the
    /// whole graph.
    pub(crate) fn local_entities(&self) -> &HashMap<EntityId, Option<Arc<Entity>>> {
        &self.local.entities
    }

    /// Whether both graphs share the same base layer.
    pub(crate) fn shares_base_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.base, &other.base)
    }

    // -----------------------------------------------------------------
    // Parent queries
    // -----------------------------------------------------------------

    /// Ids of ways containing node `id`, in first-reference order.
    pub fn parent_way_ids(&self, id: &EntityId) -> impl Iterator<Item = &EntityId> {
        self.local
            .parent_ways
            .get(id)
            .or_else(|| self.base.parent_ways.get(id))
            .into_iter()
            .flatten()
    }

    /// Ways containing node `id`, in first-reference order.
    pub fn parent_ways(&self, id: &EntityId) -> Vec<&Way> {
        self.parent_way_ids(id)
            .filter_map(|wid| self.get(wid).and_then(Entity::as_way))
            .collect()
    }

    /// Ids of relations holding `id` as a member, in first-reference order.
    pub fn parent_relation_ids(&self, id: &EntityId) -> impl Iterator<Item = &EntityId> {
        self.local
            .parent_relations
            .get(id)
            .or_else(|| self.base.parent_relations.get(id))
            .into_iter()
            .flatten()
    }

    /// Relations holding `id` as a member, in first-reference order.
    pub fn parent_relations(&self, id: &EntityId) -> Vec<&Relation> {
        self.parent_relation_ids(id)
            .filter_map(|rid| self.get(rid).and_then(Entity::as_relation))
            .collect()
    }

    /// A node with at least one parent way renders as a vertex, otherwise
    /// as a standalone point.
    pub fn is_vertex(&self, id: &EntityId) -> bool {
        self.parent_way_ids(id).next().is_some()
    }

    /// A node belonging to no way at all: a standalone point of interest.
    pub fn is_poi(&self, id: &EntityId) -> bool {
        self.get(id).and_then(Entity::as_node).is_some() && !self.is_vertex(id)
    }

    /// Node is referenced by more than one way, or by a way and a relation.
    pub fn is_shared(&self, id: &EntityId) -> bool {
        let ways = self.parent_way_ids(id).count();
        ways > 1 || (ways > 0 && self.parent_relation_ids(id).next().is_some())
    }

    /// Render classification, `None` if absent or deleted.
    pub fn geometry(&self, id: &EntityId) -> Option<Geometry> {
        Some(match self.get(id)? {
            Entity::Node(_) => {
                if self.is_vertex(id) {
                    Geometry::Vertex
                } else {
                    Geometry::Point
                }
            }
            Entity::Way(w) => {
                if w.is_area() {
                    Geometry::Area
                } else {
                    Geometry::Line
                }
            }
            Entity::Relation(r) => {
                if r.is_multipolygon() {
                    Geometry::Area
                } else {
                    Geometry::Relation
                }
            }
        })
    }

    /// Resolved node entities of a way, in order, skipping unloaded ids.
    /// Incomplete data degrades rather than failing.
    pub fn child_nodes(&self, way: &Way) -> Vec<&Node> {
        way.nodes
            .iter()
            .filter_map(|id| self.get(id).and_then(Entity::as_node))
            .collect()
    }

    // -----------------------------------------------------------------
    // Derivation
    // -----------------------------------------------------------------

    /// Derive a snapshot with `entity` inserted or replaced. Replacing an
    /// entity with the identical handle is a no-op returning a cheap clone.
    pub fn replace(&self, entity: impl Into<Arc<Entity>>) -> Self {
        let entity: Arc<Entity> = entity.into();
        let id = entity.id().clone();
        if self
            .get_arc(&id)
            .is_some_and(|current| Arc::ptr_eq(current, &entity))
        {
            return self.clone();
        }

        let mut next = self.clone();
        let prev = next.get_arc(&id).cloned();
        next.update_calculated(prev.as_deref(), Some(&entity));
        next.local.entities.insert(id, Some(entity));
        next
    }

    /// Derive one snapshot carrying a batch of replacements. Equivalent to
    /// chained [`replace`](Self::replace) calls but clones the overlay once.
    pub fn update(&self, entities: impl IntoIterator<Item = impl Into<Arc<Entity>>>) -> Self {
        let mut next = self.clone();
        for entity in entities {
            let entity: Arc<Entity> = entity.into();
            let id = entity.id().clone();
            if next
                .get_arc(&id)
                .is_some_and(|current| Arc::ptr_eq(current, &entity))
            {
                continue;
            }
            let prev = next.get_arc(&id).cloned();
            next.update_calculated(prev.as_deref(), Some(&entity));
            next.local.entities.insert(id, Some(entity));
        }
        next
    }

    /// Derive a snapshot with `id` deleted. Deleting an absent entity is a
    /// no-op.
    pub fn remove(&self, id: &EntityId) -> Self {
        let Some(prev) = self.get_arc(id).cloned() else {
            return self.clone();
        };
        let mut next = self.clone();
        next.update_calculated(Some(&prev), None);
        next.local.entities.insert(id.clone(), None);
        next
    }

    /// Derive a snapshot with any local edit of `id` dropped, restoring
    /// the base-layer entity (or absence).
    pub fn revert(&self, id: &EntityId) -> Self {
        if !self.local.entities.contains_key(id) {
            return self.clone();
        }
        let mut next = self.clone();
        let prev = next.get_arc(id).cloned();
        let restored = next.base.entities.get(id).cloned();
        next.update_calculated(prev.as_deref(), restored.as_deref());
        next.local.entities.remove(id);
        next
    }

    // -----------------------------------------------------------------
    // Parent index maintenance
    // -----------------------------------------------------------------

    /// Diff `prev` against `curr` and patch the overlay parent indexes.
    /// Only ids whose child lists actually changed have their sets copied
    /// down from the base.
    fn update_calculated(&mut self, prev: Option<&Entity>, curr: Option<&Entity>) {
        match (prev, curr) {
            (Some(Entity::Way(p)), Some(Entity::Way(c))) => {
                let parent = c.id.clone();
                for removed in ids_not_in(&p.nodes, &c.nodes) {
                    remove_parent(&mut self.local.parent_ways, &self.base.parent_ways, removed, &parent);
                }
                for added in ids_not_in(&c.nodes, &p.nodes) {
                    add_parent(&mut self.local.parent_ways, &self.base.parent_ways, added, &parent);
                }
            }
            (Some(Entity::Way(p)), _) => {
                let parent = p.id.clone();
                for removed in ids_not_in(&p.nodes, &[]) {
                    remove_parent(&mut self.local.parent_ways, &self.base.parent_ways, removed, &parent);
                }
            }
            (_, Some(Entity::Way(c))) => {
                let parent = c.id.clone();
                for added in ids_not_in(&c.nodes, &[]) {
                    add_parent(&mut self.local.parent_ways, &self.base.parent_ways, added, &parent);
                }
            }
            _ => {}
        }

        match (prev, curr) {
            (Some(Entity::Relation(p)), Some(Entity::Relation(c))) => {
                let parent = c.id.clone();
                let prev_ids: Vec<EntityId> = p.members.iter().map(|m| m.id.clone()).collect();
                let curr_ids: Vec<EntityId> = c.members.iter().map(|m| m.id.clone()).collect();
                for removed in ids_not_in(&prev_ids, &curr_ids) {
                    remove_parent(&mut self.local.parent_relations, &self.base.parent_relations, removed, &parent);
                }
                for added in ids_not_in(&curr_ids, &prev_ids) {
                    add_parent(&mut self.local.parent_relations, &self.base.parent_relations, added, &parent);
                }
            }
            (Some(Entity::Relation(p)), _) => {
                let parent = p.id.clone();
                let prev_ids: Vec<EntityId> = p.members.iter().map(|m| m.id.clone()).collect();
                for removed in ids_not_in(&prev_ids, &[]) {
                    remove_parent(&mut self.local.parent_relations, &self.base.parent_relations, removed, &parent);
                }
            }
            (_, Some(Entity::Relation(c))) => {
                let parent = c.id.clone();
                let curr_ids: Vec<EntityId> = c.members.iter().map(|m| m.id.clone()).collect();
                for added in ids_not_in(&curr_ids, &[]) {
                    add_parent(&mut self.local.parent_relations, &self.base.parent_relations, added, &parent);
                }
            }
            _ => {}
        }
    }
}

/// Ids in `these` missing from `those`, deduplicated, order kept.
fn ids_not_in<'a>(these: &'a [EntityId], those: &[EntityId]) -> Vec<&'a EntityId> {
    let mut out: Vec<&EntityId> = Vec::new();
    for id in these {
        if !those.contains(id) && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Copy `child`'s parent set down from the base (first touch only) and
/// insert `parent`.
fn add_parent(local: &mut ParentIndex, base: &ParentIndex, child: &EntityId, parent: &EntityId) {
    let set = local
        .entry(child.clone())
        .or_insert_with(|| base.get(child).cloned().unwrap_or_default());
    set.insert(parent.clone());
}

/// Copy `child`'s parent set down from the base (first touch only) and
/// remove `parent`.
fn remove_parent(local: &mut ParentIndex, base: &ParentIndex, child: &EntityId, parent: &EntityId) {
    let set = local
        .entry(child.clone())
        .or_insert_with(|| base.get(child).cloned().unwrap_or_default());
    set.shift_remove(parent);
}

/// Base construction: record `entity`'s children in the given indexes.
fn index_parents(entity: &Entity, parent_ways: &mut ParentIndex, parent_relations: &mut ParentIndex) {
    match entity {
        Entity::Way(w) => {
            for node in &w.nodes {
                parent_ways
                    .entry(node.clone())
                    .or_default()
                    .insert(w.id.clone());
            }
        }
        Entity::Relation(r) => {
            for member in &r.members {
                parent_relations
                    .entry(member.id.clone())
                    .or_default()
                    .insert(r.id.clone());
            }
        }
        Entity::Node(_) => {}
    }
}
