//! The entity model: Node, Way, and Relation under one tagged variant.
//!
//! Entities are immutable values. Every "mutating" method returns a new
//! entity with the bookkeeping counter `v` bumped; the original is left
//! untouched so older [`Graph`](crate::graph::Graph) snapshots stay valid.
//!
//! Identity is by [`EntityId`]: two entities with equal fields but
//! different ids are distinct, and structural equality is never used as
//! identity by the engine.

mod node;
mod relation;
mod way;

pub use node::Node;
pub use relation::{Member, Relation};
pub use way::{Affix, Way};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A stable, session-scoped entity id such as `n1`, `w-3`, or `r7`.
///
/// Ids allocated by the editor (never persisted upstream) use the dashed
/// form (`n-1`); ids from upstream are undashed (`n1`). The engine itself
/// only ever compares ids for equality; the shape matters to the
/// [`IdGenerator`](crate::edit::IdGenerator), which must never collide
/// with persisted ids.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id uses the editor-allocated dashed form (`n-1`).
    /// Upstream ids are undashed (`n1`).
    pub fn is_new(&self) -> bool {
        self.0.as_bytes().get(1) == Some(&b'-')
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// Discriminant for the three entity variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Node,
    Way,
    Relation,
}

impl EntityKind {
    /// Prefix letter used when minting ids of this kind.
    pub const fn prefix(self) -> char {
        match self {
            Self::Node => 'n',
            Self::Way => 'w',
            Self::Relation => 'r',
        }
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Tag mapping. Insertion order is irrelevant; a sorted map keeps
/// comparisons and serialization deterministic.
pub type Tags = BTreeMap<String, String>;

/// Keys that carry no editorial meaning on their own. A node holding only
/// these is fair game for cascade deletion.
fn is_uninteresting_key(key: &str) -> bool {
    matches!(key, "attribution" | "created_by" | "source" | "odbl")
        || key.starts_with("source:")
        || key.starts_with("source_ref")
        || key.starts_with("tiger:")
}

/// `true` if any tag key is interesting (see [`is_uninteresting_key`]).
pub fn has_interesting_tags(tags: &Tags) -> bool {
    tags.keys().any(|k| !is_uninteresting_key(k))
}

/// Merge `from` into `base`. Conflicting scalar values are unioned as a
/// `;`-joined list (deduplicated, order of first appearance). Returns
/// `None` when the merge changes nothing.
pub fn merged_tags(base: &Tags, from: &Tags) -> Option<Tags> {
    let mut merged = base.clone();
    let mut changed = false;

    for (k, v2) in from {
        match merged.get(k) {
            None => {
                merged.insert(k.clone(), v2.clone());
                changed = true;
            }
            Some(v1) if v1 == v2 => {}
            Some(v1) => {
                let mut vals: Vec<&str> = v1.split(';').map(str::trim).collect();
                for part in v2.split(';').map(str::trim) {
                    if !vals.contains(&part) {
                        vals.push(part);
                    }
                }
                merged.insert(k.clone(), vals.join(";"));
                changed = true;
            }
        }
    }

    changed.then_some(merged)
}

/// Convenience constructor for literal tag maps in tests and fixtures.
pub fn tags<const N: usize>(pairs: [(&str, &str); N]) -> Tags {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A Node, Way, or Relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Entity {
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Node(n) => &n.id,
            Self::Way(w) => &w.id,
            Self::Relation(r) => &r.id,
        }
    }

    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Node(_) => EntityKind::Node,
            Self::Way(_) => EntityKind::Way,
            Self::Relation(_) => EntityKind::Relation,
        }
    }

    pub const fn tags(&self) -> &Tags {
        match self {
            Self::Node(n) => &n.tags,
            Self::Way(w) => &w.tags,
            Self::Relation(r) => &r.tags,
        }
    }

    /// Upstream version counter; zero means the entity has never been
    /// persisted (it is "new").
    pub const fn version(&self) -> u32 {
        match self {
            Self::Node(n) => n.version,
            Self::Way(w) => w.version,
            Self::Relation(r) => r.version,
        }
    }

    /// Local modification counter, bumped on every update or touch.
    /// Cheap change detection, distinct from [`version`](Self::version).
    pub const fn v(&self) -> u32 {
        match self {
            Self::Node(n) => n.v,
            Self::Way(w) => w.v,
            Self::Relation(r) => r.v,
        }
    }

    pub const fn is_new(&self) -> bool {
        self.version() == 0
    }

    pub fn has_interesting_tags(&self) -> bool {
        has_interesting_tags(self.tags())
    }

    /// New entity with the given tag map; bumps `v`.
    pub fn with_tags(&self, tags: Tags) -> Self {
        match self {
            Self::Node(n) => Self::Node(Node {
                tags,
                v: n.v + 1,
                ..n.clone()
            }),
            Self::Way(w) => Self::Way(Way {
                tags,
                v: w.v + 1,
                ..w.clone()
            }),
            Self::Relation(r) => Self::Relation(Relation {
                tags,
                v: r.v + 1,
                ..r.clone()
            }),
        }
    }

    /// Tag merge per [`merged_tags`]; returns `self` unchanged (no `v`
    /// bump) when the merge is a no-op.
    pub fn merge_tags(&self, from: &Tags) -> Self {
        merged_tags(self.tags(), from).map_or_else(|| self.clone(), |t| self.with_tags(t))
    }

    /// Bump `v` without changing semantic content.
    pub fn touch(&self) -> Self {
        match self {
            Self::Node(n) => Self::Node(Node {
                v: n.v + 1,
                ..n.clone()
            }),
            Self::Way(w) => Self::Way(Way {
                v: w.v + 1,
                ..w.clone()
            }),
            Self::Relation(r) => Self::Relation(Relation {
                v: r.v + 1,
                ..r.clone()
            }),
        }
    }

    /// Compare semantic content (tags plus per-kind payload), ignoring the
    /// bookkeeping `v`. This is what [`Difference`](crate::difference::Difference)
    /// uses so that no-op round trips produce no changes.
    pub fn same_content(&self, other: &Self) -> bool {
        if self.id() != other.id() || self.tags() != other.tags() {
            return false;
        }
        match (self, other) {
            (Self::Node(a), Self::Node(b)) => a.loc == b.loc,
            (Self::Way(a), Self::Way(b)) => a.nodes == b.nodes,
            (Self::Relation(a), Self::Relation(b)) => a.members == b.members,
            _ => false,
        }
    }

    /// Whether the entity fails its variant's structural minimum:
    /// a way with fewer than two nodes, a relation with no members.
    pub fn is_degenerate(&self) -> bool {
        match self {
            Self::Node(n) => n.is_degenerate(),
            Self::Way(w) => w.is_degenerate(),
            Self::Relation(r) => r.is_degenerate(),
        }
    }

    pub const fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(n) => Some(n),
            _ => None,
        }
    }

    pub const fn as_way(&self) -> Option<&Way> {
        match self {
            Self::Way(w) => Some(w),
            _ => None,
        }
    }

    pub const fn as_relation(&self) -> Option<&Relation> {
        match self {
            Self::Relation(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Node> for Entity {
    fn from(n: Node) -> Self {
        Self::Node(n)
    }
}

impl From<Way> for Entity {
    fn from(w: Way) -> Self {
        Self::Way(w)
    }
}

impl From<Relation> for Entity {
    fn from(r: Relation) -> Self {
        Self::Relation(r)
    }
}
