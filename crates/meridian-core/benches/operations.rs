//! Core operation benchmarks: snapshot derivation, diffing, and turn
//! enumeration over synthetic grids.
//!
//! Run with:
//! ```sh
//! cargo bench --bench operations
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use meridian_core::actions::{Action, Connect, MoveEntities};
use meridian_core::difference::Difference;
use meridian_core::entity::{tags, Entity, EntityId, Node, Way};
use meridian_core::graph::Graph;
use meridian_core::intersection::Intersection;
use meridian_core::Projection;

// ---------------------------------------------------------------------------
// Fixture: synthetic street grid
// ---------------------------------------------------------------------------

fn grid_node_id(x: usize, y: usize) -> EntityId {
    EntityId::from(format!("n{x}x{y}"))
}

/// An n-by-n street grid: every horizontal and vertical neighbor pair is
/// one residential way, so interior vertices are four-way junctions.
fn street_grid(n: usize) -> Graph {
    let spacing = 0.0002;
    let mut entities: Vec<Entity> = Vec::new();
    for y in 0..n {
        for x in 0..n {
            entities.push(Entity::from(
                Node::new(grid_node_id(x, y))
                    .with_loc([x as f64 * spacing, y as f64 * spacing]),
            ));
        }
    }
    let mut w = 0;
    for y in 0..n {
        for x in 0..n {
            if x + 1 < n {
                entities.push(road(&mut w, grid_node_id(x, y), grid_node_id(x + 1, y)));
            }
            if y + 1 < n {
                entities.push(road(&mut w, grid_node_id(x, y), grid_node_id(x, y + 1)));
            }
        }
    }
    Graph::new(entities)
}

fn road(seq: &mut usize, a: EntityId, b: EntityId) -> Entity {
    *seq += 1;
    Entity::from(
        Way::new(EntityId::from(format!("w{seq}")))
            .with_nodes(vec![a, b])
            .with_tags(tags([("highway", "residential")])),
    )
}

// ---------------------------------------------------------------------------
// Benches
// ---------------------------------------------------------------------------

fn bench_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph.derive");
    for n in [10usize, 30] {
        let graph = street_grid(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n * n), &graph, |b, graph| {
            let action = MoveEntities::new(
                [grid_node_id(1, 1)],
                glam::DVec2::new(3.0, 3.0),
                Projection::default(),
            );
            b.iter(|| black_box(action.apply(graph)));
        });
    }
    group.finish();
}

fn bench_difference(c: &mut Criterion) {
    let mut group = c.benchmark_group("difference.summary");
    for n in [10usize, 30] {
        let graph = street_grid(n);
        // Edit a diagonal of vertices so the overlay grows with n.
        let mut head = graph.clone();
        for i in 0..n {
            let action = MoveEntities::new(
                [grid_node_id(i, i)],
                glam::DVec2::new(2.0, 0.0),
                Projection::default(),
            );
            head = action.apply(&head);
        }
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(n),
            &(graph, head),
            |b, (base, head)| {
                b.iter(|| {
                    let diff = Difference::new(base, head);
                    black_box(diff.summary().len())
                });
            },
        );
    }
    group.finish();
}

fn bench_turns(c: &mut Criterion) {
    let graph = street_grid(10);
    let center = grid_node_id(5, 5);

    let mut group = c.benchmark_group("intersection");
    group.bench_function("build", |b| {
        b.iter(|| black_box(Intersection::new(&graph, &center)));
    });

    let intersection = Intersection::new(&graph, &center);
    let from = intersection.way_ids()[0].clone();
    group.bench_function("turns.via1", |b| {
        b.iter(|| black_box(intersection.turns(&from, 1).len()));
    });
    group.finish();
}

fn bench_connect(c: &mut Criterion) {
    let graph = street_grid(10);
    let action = Connect::new([grid_node_id(4, 4), grid_node_id(4, 5)]);
    c.bench_function("actions.connect", |b| {
        b.iter(|| black_box(action.apply(&graph)));
    });
}

criterion_group!(
    benches,
    bench_derivation,
    bench_difference,
    bench_turns,
    bench_connect
);
criterion_main!(benches);
