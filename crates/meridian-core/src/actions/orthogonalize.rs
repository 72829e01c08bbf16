//! Corner squaring.
//!
//! Nudges a way's corners toward right angles by gradient descent in the
//! projected plane: each movable corner is pushed along the bisector of
//! its two edges, scaled by how far the corner is from square, until the
//! total squareness score stops improving. Nearly-straight vertices are
//! excluded from the solve and, at full application, deleted when
//! nothing else references them.

use glam::DVec2;

use crate::entity::{Entity, EntityId, Node};
use crate::error::DisabledReason;
use crate::geo::{interp, normalized_dot, Projection};
use crate::graph::Graph;

use super::delete::delete_node;
use super::Action;

const MAX_ITERATIONS: usize = 1000;

/// Square up the corners of one way.
#[derive(Debug, Clone)]
pub struct Orthogonalize {
    way_id: EntityId,
    projection: Projection,
    /// Degrees within right or straight considered close enough to alter.
    threshold_deg: f64,
    epsilon: f64,
}

impl Orthogonalize {
    pub fn new(way_id: impl Into<EntityId>, projection: Projection) -> Self {
        Self {
            way_id: way_id.into(),
            projection,
            threshold_deg: 13.0,
            epsilon: 1e-4,
        }
    }

    fn lower_threshold(&self) -> f64 {
        (90.0 - self.threshold_deg).to_radians().cos()
    }

    fn upper_threshold(&self) -> f64 {
        self.threshold_deg.to_radians().cos()
    }
}

/// One solver point: a node id and its projected coordinate.
#[derive(Clone)]
struct Point {
    id: EntityId,
    coord: DVec2,
}

impl Action for Orthogonalize {
    fn apply(&self, graph: &Graph) -> Graph {
        self.apply_at(graph, 1.0)
    }

    fn is_transitionable(&self) -> bool {
        true
    }

    #[allow(clippy::too_many_lines)]
    fn apply_at(&self, graph: &Graph, t: f64) -> Graph {
        let t = t.clamp(0.0, 1.0);
        let mut graph = graph.clone();

        let way = match graph.entity(&self.way_id) {
            Entity::Way(w) => w.clone(),
            other => panic!("orthogonalize: {} is not a way", other.id()),
        };
        if way.tags.contains_key("nonsquare") {
            // Squaring supersedes the marker that the shape is physically
            // unsquare.
            let mut tags = way.tags.clone();
            tags.remove("nonsquare");
            graph = graph.replace(Entity::from(way.clone().with_tags(tags)));
        }

        let is_closed = way.is_closed();
        let mut node_ids = way.nodes.clone();
        if is_closed {
            node_ids.pop();
        }

        let mut count = std::collections::HashMap::new();
        let mut points: Vec<Point> = Vec::with_capacity(node_ids.len());
        for id in &node_ids {
            *count.entry(id.clone()).or_insert(0u32) += 1;
            let node = match graph.entity(id) {
                Entity::Node(n) => n,
                other => panic!("orthogonalize: {} is not a node", other.id()),
            };
            points.push(Point {
                id: id.clone(),
                coord: self.projection.project(node.loc),
            });
        }

        let solver = Solver {
            is_closed,
            count: &count,
            lower_threshold: self.lower_threshold(),
            upper_threshold: self.upper_threshold(),
            epsilon: self.epsilon,
        };

        if points.len() == 3 {
            // A triangle has one corner worth squaring; move only the one
            // currently nearest to square.
            let mut corner = 0;
            for _ in 0..MAX_ITERATIONS {
                let steps: Vec<(DVec2, f64)> = (0..points.len())
                    .map(|i| solver.motion(&points, i))
                    .collect();
                corner = (0..steps.len())
                    .min_by(|&a, &b| steps[a].1.total_cmp(&steps[b].1))
                    .unwrap_or(0);
                points[corner].coord += steps[corner].0;
                if steps[corner].1 < self.epsilon {
                    break;
                }
            }
            let point = &points[corner];
            let node = node_at(&graph, &point.id);
            let target = interp(self.projection.project(node.loc), point.coord, t);
            let moved = node.with_loc(self.projection.unproject(target));
            return graph.replace(Entity::from(moved));
        }

        // Nearly-straight vertices are held out of the solve.
        let mut straights: Vec<Point> = Vec::new();
        let mut simplified: Vec<Point> = Vec::new();
        for (i, point) in points.iter().enumerate() {
            let dotp = if is_closed || (i > 0 && i < points.len() - 1) {
                let a = &points[(i + points.len() - 1) % points.len()];
                let b = &points[(i + 1) % points.len()];
                normalized_dot(a.coord, b.coord, point.coord).abs()
            } else {
                0.0
            };
            if dotp > self.upper_threshold() {
                straights.push(point.clone());
            } else {
                simplified.push(point.clone());
            }
        }

        let original: Vec<Point> = simplified.clone();
        let mut best: Vec<Point> = simplified.clone();
        let mut best_score = f64::INFINITY;

        for _ in 0..MAX_ITERATIONS {
            let motions: Vec<DVec2> = (0..simplified.len())
                .map(|i| solver.motion(&simplified, i).0)
                .collect();
            for (point, motion) in simplified.iter_mut().zip(motions) {
                point.coord += motion;
            }
            let score = solver.score(&simplified);
            if score < best_score {
                best = simplified.clone();
                best_score = score;
            }
            if best_score < self.epsilon {
                break;
            }
        }

        for (orig, point) in original.iter().zip(&best) {
            if orig.coord == point.coord {
                continue;
            }
            let node = node_at(&graph, &point.id);
            let target = interp(self.projection.project(node.loc), point.coord, t);
            let moved = node.with_loc(self.projection.unproject(target));
            graph = graph.replace(Entity::from(moved));
        }

        // At full application the held-out straight vertices are noise;
        // sweep the ones nothing else cares about.
        if t >= 1.0 {
            for point in &straights {
                let removable = count.get(&point.id).copied().unwrap_or(0) <= 1
                    && graph.parent_ways(&point.id).len() <= 1
                    && !graph.entity(&point.id).has_interesting_tags();
                if removable {
                    graph = delete_node(graph, &point.id);
                }
            }
        }

        graph
    }

    fn disabled(&self, graph: &Graph) -> Option<DisabledReason> {
        let way = match graph.entity(&self.way_id) {
            Entity::Way(w) => w,
            other => panic!("orthogonalize: {} is not a way", other.id()),
        };
        let is_closed = way.is_closed();
        let mut node_ids = way.nodes.clone();
        if is_closed {
            node_ids.pop();
        }
        let coords: Vec<DVec2> = node_ids
            .iter()
            .map(|id| {
                let node = match graph.entity(id) {
                    Entity::Node(n) => n,
                    other => panic!("orthogonalize: {} is not a node", other.id()),
                };
                self.projection.project(node.loc)
            })
            .collect();

        let first = usize::from(!is_closed);
        let last = if is_closed { coords.len() } else { coords.len().saturating_sub(1) };

        let mut all_square = false;
        for i in first..last {
            let a = coords[(i + coords.len() - 1) % coords.len()];
            let origin = coords[i];
            let b = coords[(i + 1) % coords.len()];
            let Some(dotp) = self.filter_dot(normalized_dot(a, b, origin)) else {
                continue;
            };
            if dotp.abs() > 0.0 {
                return None; // something to square
            }
            all_square = true;
        }

        if all_square {
            Some(DisabledReason::SquareEnough)
        } else {
            Some(DisabledReason::NotSquarish)
        }
    }
}

impl Orthogonalize {
    /// Classify a corner's dot product: `Some(0.0)` already square,
    /// `Some(dotp)` adjustable, `None` not squarable at all.
    fn filter_dot(&self, dotp: f64) -> Option<f64> {
        let val = dotp.abs();
        if val < self.epsilon {
            Some(0.0)
        } else if val < self.lower_threshold() || val > self.upper_threshold() {
            Some(dotp)
        } else {
            None
        }
    }
}

struct Solver<'a> {
    is_closed: bool,
    count: &'a std::collections::HashMap<EntityId, u32>,
    lower_threshold: f64,
    upper_threshold: f64,
    epsilon: f64,
}

impl Solver<'_> {
    /// The displacement nudging corner `i` toward square, and the
    /// corner's current deviation `|dotp|`. The push runs along the edge
    /// bisector, proportional to the deviation and the shorter edge, so
    /// it vanishes as the corner reaches a right angle.
    fn motion(&self, points: &[Point], i: usize) -> (DVec2, f64) {
        // Endpoints of an open way and self-intersection nodes stay put.
        if !self.is_closed && (i == 0 || i == points.len() - 1) {
            return (DVec2::ZERO, 1.0);
        }
        if self.count.get(&points[i].id).copied().unwrap_or(0) > 1 {
            return (DVec2::ZERO, 1.0);
        }

        let a = points[(i + points.len() - 1) % points.len()].coord;
        let origin = points[i].coord;
        let b = points[(i + 1) % points.len()].coord;
        let p = a - origin;
        let q = b - origin;

        let scale = 2.0 * p.length().min(q.length());
        let p = p.normalize_or_zero();
        let q = q.normalize_or_zero();
        let dotp = p.dot(q);

        ((p + q).normalize_or_zero() * (0.1 * dotp * scale), dotp.abs())
    }

    /// Total deviation from square-or-straight over the movable corners.
    fn score(&self, points: &[Point]) -> f64 {
        let first = usize::from(!self.is_closed);
        let last = if self.is_closed {
            points.len()
        } else {
            points.len().saturating_sub(1)
        };

        let mut score = 0.0;
        for i in first..last {
            let a = points[(i + points.len() - 1) % points.len()].coord;
            let origin = points[i].coord;
            let b = points[(i + 1) % points.len()].coord;
            let dotp = normalized_dot(a, b, origin);
            let val = dotp.abs();
            if val >= self.epsilon && (self.lower_threshold..=self.upper_threshold).contains(&val) {
                continue; // unsquarable corner, ignore
            }
            score += 2.0 * (dotp - 1.0).abs().min(dotp.abs()).min((dotp + 1.0).abs());
        }
        score
    }
}

fn node_at(graph: &Graph, id: &EntityId) -> Node {
    match graph.entity(id) {
        Entity::Node(n) => n.clone(),
        other => panic!("orthogonalize: {} is not a node", other.id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{tags, Way};

    fn node(id: &str, loc: [f64; 2]) -> Entity {
        Entity::from(Node::new(id.into()).with_loc(loc))
    }

    fn ring(id: &str, nodes: &[&str]) -> Entity {
        let mut ids: Vec<EntityId> = nodes.iter().map(|n| (*n).into()).collect();
        if let Some(first) = ids.first().cloned() {
            ids.push(first);
        }
        Entity::from(
            Way::new(id.into())
                .with_nodes(ids)
                .with_tags(tags([("building", "yes")])),
        )
    }

    // A slightly skewed quadrilateral, roughly 100m on a side.
    fn skewed() -> Graph {
        Graph::new([
            node("a", [0.0, 0.0]),
            node("b", [0.001, 0.00007]),
            node("c", [0.00107, -0.0009]),
            node("d", [0.00005, -0.001]),
            ring("w", &["a", "b", "c", "d"]),
        ])
    }

    fn corner_dots(g: &Graph, way: &str) -> Vec<f64> {
        let proj = Projection::default();
        let w = g.entity(&way.into()).as_way().unwrap();
        let mut ids = w.nodes.clone();
        ids.pop();
        let coords: Vec<DVec2> = ids
            .iter()
            .map(|id| proj.project(g.entity(id).as_node().unwrap().loc))
            .collect();
        (0..coords.len())
            .map(|i| {
                let a = coords[(i + coords.len() - 1) % coords.len()];
                let b = coords[(i + 1) % coords.len()];
                normalized_dot(a, b, coords[i])
            })
            .collect()
    }

    #[test]
    fn squares_a_skewed_quad() {
        let g = skewed();
        let g2 = Orthogonalize::new("w", Projection::default()).apply(&g);
        for dotp in corner_dots(&g2, "w") {
            assert!(dotp.abs() < 0.01, "corner not square: {dotp}");
        }
    }

    #[test]
    fn skewed_quad_is_enabled_square_quad_is_not() {
        let action = Orthogonalize::new("w", Projection::default());
        assert_eq!(action.disabled(&skewed()), None);

        let square = Graph::new([
            node("a", [0.0, 0.0]),
            node("b", [0.001, 0.0]),
            node("c", [0.001, -0.001]),
            node("d", [0.0, -0.001]),
            ring("w", &["a", "b", "c", "d"]),
        ]);
        assert_eq!(action.disabled(&square), Some(DisabledReason::SquareEnough));
    }

    #[test]
    fn diagonal_corner_is_not_squarish() {
        // The corner at b is near 140 degrees, too far from both square
        // and straight to adjust.
        let g = Graph::new([
            node("a", [0.0, 0.0]),
            node("b", [0.001, 0.0]),
            node("c", [0.002, 0.0008]),
            Entity::from(Way::new("w".into()).with_nodes(vec![
                "a".into(),
                "b".into(),
                "c".into(),
            ])),
        ]);
        let action = Orthogonalize::new("w", Projection::default());
        assert_eq!(action.disabled(&g), Some(DisabledReason::NotSquarish));
    }

    #[test]
    fn full_application_drops_straightened_vertices() {
        // e sits mid-edge between a and b and carries nothing.
        let g = Graph::new([
            node("a", [0.0, 0.0]),
            node("e", [0.0005, 0.00001]),
            node("b", [0.001, 0.00007]),
            node("c", [0.00107, -0.0009]),
            node("d", [0.00005, -0.001]),
            ring("w", &["a", "e", "b", "c", "d"]),
        ]);
        let g2 = Orthogonalize::new("w", Projection::default()).apply(&g);
        assert!(!g2.has(&"e".into()));

        // At partial t the vertex must survive.
        let g3 = Orthogonalize::new("w", Projection::default()).apply_at(&g, 0.5);
        assert!(g3.has(&"e".into()));
    }

    #[test]
    fn nonsquare_marker_is_cleared() {
        let g = Graph::new([
            node("a", [0.0, 0.0]),
            node("b", [0.001, 0.00007]),
            node("c", [0.00107, -0.0009]),
            node("d", [0.00005, -0.001]),
            Entity::from(
                Way::new("w".into())
                    .with_nodes(vec![
                        "a".into(),
                        "b".into(),
                        "c".into(),
                        "d".into(),
                        "a".into(),
                    ])
                    .with_tags(tags([("building", "yes"), ("nonsquare", "yes")])),
            ),
        ]);
        let g2 = Orthogonalize::new("w", Projection::default()).apply(&g);
        assert!(!g2.entity(&"w".into()).tags().contains_key("nonsquare"));
    }
}
