//! Structural difference between two graph snapshots.
//!
//! Computation walks only the overlays of the two snapshots, never the
//! shared base, so cost tracks edits rather than graph size. Entries
//! whose handles are pointer-equal are skipped outright; surviving
//! candidates are compared by semantic content (the bookkeeping `v`
//! counter is ignored), so a perform/revert round trip reports no
//! changes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId};
use crate::graph::Graph;

/// One changed entity: its state in the older and newer snapshot.
/// `base` absent means created, `head` absent means deleted, both present
/// means modified. Both absent never occurs.
#[derive(Debug, Clone, Serialize)]
pub struct Change {
    pub base: Option<Arc<Entity>>,
    pub head: Option<Arc<Entity>>,
}

/// User-facing classification produced by [`Difference::summary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

/// A summary row: the entity to present and how it changed.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryEntry {
    pub entity: Arc<Entity>,
    pub kind: ChangeKind,
}

/// The set of entities that differ between a `base` and a `head` snapshot.
#[derive(Debug, Clone)]
pub struct Difference {
    base: Graph,
    head: Graph,
    changes: HashMap<EntityId, Change>,
}

impl Difference {
    /// Diff two snapshots derived from the same loaded base.
    pub fn new(base: &Graph, head: &Graph) -> Self {
        debug_assert!(base.shares_base_with(head));

        let mut changes = HashMap::new();
        let mut seen: HashSet<&EntityId> = HashSet::new();

        for id in base
            .local_entities()
            .keys()
            .chain(head.local_entities().keys())
        {
            if !seen.insert(id) {
                continue;
            }
            let b = base.get_arc(id);
            let h = head.get_arc(id);
            match (b, h) {
                (None, None) => {}
                (Some(b), Some(h)) if Arc::ptr_eq(b, h) || b.same_content(h) => {}
                _ => {
                    changes.insert(
                        id.clone(),
                        Change {
                            base: b.cloned(),
                            head: h.cloned(),
                        },
                    );
                }
            }
        }

        Self {
            base: base.clone(),
            head: head.clone(),
            changes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.changes.contains_key(id)
    }

    pub fn changes(&self) -> impl Iterator<Item = (&EntityId, &Change)> {
        self.changes.iter()
    }

    /// Entities present in head but not base, sorted by id.
    pub fn created(&self) -> Vec<Arc<Entity>> {
        self.select(|c| c.base.is_none(), |c| c.head.clone())
    }

    /// Entities present in both but changed, as their head state, sorted
    /// by id.
    pub fn modified(&self) -> Vec<Arc<Entity>> {
        self.select(|c| c.base.is_some() && c.head.is_some(), |c| c.head.clone())
    }

    /// Entities present in base but not head, as their base state, sorted
    /// by id.
    pub fn deleted(&self) -> Vec<Arc<Entity>> {
        self.select(|c| c.head.is_none(), |c| c.base.clone())
    }

    fn select(
        &self,
        keep: impl Fn(&Change) -> bool,
        pick: impl Fn(&Change) -> Option<Arc<Entity>>,
    ) -> Vec<Arc<Entity>> {
        let mut out: Vec<Arc<Entity>> = self
            .changes
            .values()
            .filter(|c| keep(c))
            .filter_map(pick)
            .collect();
        out.sort_by(|a, b| a.id().cmp(b.id()));
        out
    }

    /// Condense the raw change set for presentation.
    ///
    /// Ways and relations pass through with their raw classification. A
    /// vertex (a node with parent ways) is suppressed unless it was
    /// retagged or carries interesting tags; a moved vertex instead
    /// surfaces its parent ways as modified, since that is the visible
    /// geometry change.
    pub fn summary(&self) -> Vec<SummaryEntry> {
        let mut relevant: IndexMap<EntityId, SummaryEntry> = IndexMap::new();

        let mut add = |relevant: &mut IndexMap<EntityId, SummaryEntry>,
                       entity: &Arc<Entity>,
                       kind: ChangeKind| {
            relevant.insert(
                entity.id().clone(),
                SummaryEntry {
                    entity: Arc::clone(entity),
                    kind,
                },
            );
        };

        let mut ids: Vec<&EntityId> = self.changes.keys().collect();
        ids.sort();

        for id in ids {
            let change = &self.changes[id];
            let head_is_vertex = change
                .head
                .as_ref()
                .is_some_and(|h| h.as_node().is_some() && self.head.is_vertex(h.id()));
            let base_is_vertex = change
                .base
                .as_ref()
                .is_some_and(|b| b.as_node().is_some() && self.base.is_vertex(b.id()));

            match (&change.base, &change.head) {
                (_, Some(h)) if !head_is_vertex => {
                    let kind = if change.base.is_some() {
                        ChangeKind::Modified
                    } else {
                        ChangeKind::Created
                    };
                    add(&mut relevant, h, kind);
                }
                (Some(b), None) if !base_is_vertex => {
                    add(&mut relevant, b, ChangeKind::Deleted);
                }
                (Some(b), Some(h)) => {
                    let moved = b.as_node().map(|n| n.loc) != h.as_node().map(|n| n.loc);
                    let retagged = b.tags() != h.tags();
                    if moved {
                        // A parent with its own entry keeps it; a created
                        // way must not be demoted to modified.
                        for way in self.head.parent_ways(h.id()) {
                            if relevant.contains_key(&way.id) {
                                continue;
                            }
                            if let Some(arc) = self.head.get_arc(&way.id) {
                                add(&mut relevant, arc, ChangeKind::Modified);
                            }
                        }
                    }
                    if retagged || (moved && h.has_interesting_tags()) {
                        add(&mut relevant, h, ChangeKind::Modified);
                    }
                }
                (None, Some(h)) if h.has_interesting_tags() => {
                    add(&mut relevant, h, ChangeKind::Created);
                }
                (Some(b), None) if b.has_interesting_tags() => {
                    add(&mut relevant, b, ChangeKind::Deleted);
                }
                _ => {}
            }
        }

        relevant.into_values().collect()
    }

    /// Everything an export of this difference must carry: each changed
    /// entity (head state, `None` for deletions), every child node a
    /// changed way references in either snapshot, resolvable members of
    /// changed multipolygons, and the transitive closure of head-side
    /// ancestors.
    pub fn complete(&self) -> HashMap<EntityId, Option<Arc<Entity>>> {
        let mut result: HashMap<EntityId, Option<Arc<Entity>>> = HashMap::new();

        for (id, change) in &self.changes {
            result.insert(id.clone(), change.head.clone());

            let head_nodes = change
                .head
                .as_ref()
                .and_then(|h| h.as_way())
                .map(|w| w.nodes.as_slice())
                .unwrap_or_default();
            let base_nodes = change
                .base
                .as_ref()
                .and_then(|b| b.as_way())
                .map(|w| w.nodes.as_slice())
                .unwrap_or_default();
            for node in head_nodes.iter().chain(base_nodes.iter()) {
                if !result.contains_key(node) {
                    result.insert(node.clone(), self.head.get_arc(node).cloned());
                }
            }

            let multipolygon = change
                .head
                .as_ref()
                .and_then(|h| h.as_relation())
                .filter(|r| r.is_multipolygon());
            if let Some(relation) = multipolygon {
                for member in &relation.members {
                    if let Some(arc) = self.head.get_arc(&member.id) {
                        result
                            .entry(member.id.clone())
                            .or_insert_with(|| Some(Arc::clone(arc)));
                    }
                }
            }

            self.add_parents(id, &mut result);
        }

        result
    }

    /// Walk ancestors of `id` in the head graph, tolerating membership
    /// cycles via the visited check on `result`.
    fn add_parents(&self, id: &EntityId, result: &mut HashMap<EntityId, Option<Arc<Entity>>>) {
        let parents: Vec<EntityId> = self
            .head
            .parent_way_ids(id)
            .chain(self.head.parent_relation_ids(id))
            .cloned()
            .collect();

        for pid in parents {
            if result.contains_key(&pid) {
                continue;
            }
            result.insert(pid.clone(), self.head.get_arc(&pid).cloned());
            self.add_parents(&pid, result);
        }
    }
}
