//! Point entities.

use serde::{Deserialize, Serialize};

use super::{EntityId, Tags};

/// Sentinel location for nodes created without coordinates. Well outside
/// WGS84 so such nodes read as degenerate until placed.
pub const UNPLACED: [f64; 2] = [9999.0, 9999.0];

/// A point with a `[lon, lat]` location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: EntityId,
    #[serde(default)]
    pub tags: Tags,
    /// Upstream version; zero for entities never persisted.
    #[serde(default)]
    pub version: u32,
    /// Local modification counter.
    #[serde(default)]
    pub v: u32,
    pub loc: [f64; 2],
}

impl Node {
    /// A fresh untagged node at the unplaced sentinel location.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            tags: Tags::new(),
            version: 0,
            v: 0,
            loc: UNPLACED,
        }
    }

    pub fn with_loc(self, loc: [f64; 2]) -> Self {
        Self {
            loc,
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

    /// Degenerate when the location is missing, malformed, or outside the
    /// WGS84 envelope.
    pub fn is_degenerate(&self) -> bool {
        let [lon, lat] = self.loc;
        !lon.is_finite() || !lat.is_finite() || lon.abs() > 180.0 || lat.abs() > 90.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unplaced_node_is_degenerate() {
        assert!(Node::new("n1".into()).is_degenerate());
    }

    #[test]
    fn placed_node_is_not_degenerate() {
        assert!(!Node::new("n1".into()).with_loc([0.0, 0.0]).is_degenerate());
    }

    #[test]
    fn nan_and_out_of_range_are_degenerate() {
        assert!(Node::new("n1".into()).with_loc([f64::NAN, 0.0]).is_degenerate());
        assert!(Node::new("n1".into()).with_loc([0.0, 91.0]).is_degenerate());
        assert!(Node::new("n1".into()).with_loc([-181.0, 0.0]).is_degenerate());
    }
}
