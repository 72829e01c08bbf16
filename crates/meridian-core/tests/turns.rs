//! Turn enumeration against realistic junction fixtures.

use meridian_core::entity::{tags, Entity, EntityId, EntityKind, Member, Node, Relation, Way};
use meridian_core::graph::Graph;
use meridian_core::intersection::{Intersection, TurnVia};

fn node(id: &str, lon: f64, lat: f64) -> Entity {
    Entity::from(Node::new(id.into()).with_loc([lon, lat]))
}

fn road(id: &str, nodes: &[&str]) -> Entity {
    road_tagged(id, nodes, &[("highway", "residential")])
}

fn road_tagged(id: &str, nodes: &[&str], extra: &[(&str, &str)]) -> Entity {
    let mut t = meridian_core::entity::Tags::new();
    for (k, v) in extra {
        t.insert((*k).to_owned(), (*v).to_owned());
    }
    Entity::from(
        Way::new(id.into())
            .with_nodes(nodes.iter().map(|n| (*n).into()).collect())
            .with_tags(t),
    )
}

fn restriction(id: &str, kind: &str, members: &[(&str, EntityKind, &str)]) -> Entity {
    Entity::from(
        Relation::new(id.into())
            .with_tags(tags([("type", "restriction"), ("restriction", kind)]))
            .with_members(
                members
                    .iter()
                    .map(|(mid, mkind, role)| Member::new(*mid, *mkind, role))
                    .collect(),
            ),
    )
}

fn keys(i: &Intersection, from: &str, max_via: usize) -> Vec<String> {
    i.turns(&from.into(), max_via)
        .into_iter()
        .map(|t| t.key)
        .collect()
}

// ---------------------------------------------------------------------------
// Four-way junction
// ---------------------------------------------------------------------------

// u --west-- c --east-- w
//            |
//          south
//            s
fn cross_entities() -> Vec<Entity> {
    vec![
        node("u", 0.0, 0.0),
        node("c", 0.0001, 0.0),
        node("w", 0.0002, 0.0),
        node("s", 0.0001, -0.0001),
        road("west", &["u", "c"]),
        road("east", &["c", "w"]),
        road("south", &["c", "s"]),
    ]
}

fn cross() -> Graph {
    Graph::new(cross_entities())
}

#[test]
fn cross_turns_in_parent_insertion_order() {
    let i = Intersection::new(&cross(), &"c".into());
    assert_eq!(
        keys(&i, "west", 0),
        vec!["west_c_west", "west_c_east", "west_c_south"]
    );
    let turns = i.turns(&"west".into(), 0);
    assert!(turns[0].u_turn);
    assert!(!turns[1].u_turn);
    assert_eq!(turns[1].from.node, EntityId::from("u"));
    assert_eq!(turns[1].to.node, EntityId::from("w"));
    assert_eq!(turns[1].via, TurnVia::Node("c".into()));
    assert!(turns.iter().all(|t| t.restriction_id.is_none()));
}

#[test]
fn cross_turns_exist_from_every_arm() {
    let i = Intersection::new(&cross(), &"c".into());
    for from in ["west", "east", "south"] {
        assert_eq!(keys(&i, from, 0).len(), 3, "from {from}");
    }
}

// ---------------------------------------------------------------------------
// Roundabout approach
// ---------------------------------------------------------------------------

#[test]
fn circular_way_splits_and_respects_oneway_entry() {
    let g = Graph::new([
        node("a", -0.0001, 0.0),
        node("r1", 0.0, 0.0),
        node("r2", 0.00005, 0.00005),
        node("r3", 0.0001, 0.0),
        node("r4", 0.00005, -0.00005),
        road_tagged(
            "ring",
            &["r1", "r2", "r3", "r4", "r1"],
            &[("highway", "primary"), ("junction", "roundabout")],
        ),
        road("in", &["a", "r1"]),
    ]);
    let i = Intersection::new(&g, &"r1".into());

    // The ring is cut into two open halves at the junction and opposite it.
    let ring = i.graph().entity(&"ring".into()).as_way().unwrap();
    let other = i.graph().entity(&"w-1".into()).as_way().unwrap();
    assert_eq!(ring.nodes.first(), Some(&EntityId::from("r1")));
    assert_eq!(other.nodes.last(), Some(&EntityId::from("r1")));

    // Entry only with the roundabout's direction; the other half arrives
    // at r1 and cannot be entered there.
    assert_eq!(keys(&i, "in", 1), vec!["in_r1_ring", "in_r1_in"]);
}

// ---------------------------------------------------------------------------
// Dual carriageway with a via-way restriction
// ---------------------------------------------------------------------------

//           a
//           |  (approach)
//    f -----b --link-- c --out-- d
//   (other)            |
//                    side
//                      e
fn dual_carriageway(restrictions: &[Entity]) -> Graph {
    let mut entities = vec![
        node("a", 0.0, 0.0001),
        node("b", 0.0, 0.0),
        node("c", 0.0001, 0.0),
        node("d", 0.0002, 0.0),
        node("e", 0.0001, -0.0001),
        node("f", -0.0001, 0.0),
        road("approach", &["a", "b"]),
        road("other", &["f", "b"]),
        road("link", &["b", "c"]),
        road("out", &["c", "d"]),
        road("side", &["c", "e"]),
    ];
    entities.extend_from_slice(restrictions);
    Graph::new(entities)
}

#[test]
fn via_way_paths_need_the_budget() {
    let g = dual_carriageway(&[]);
    let i = Intersection::new(&g, &"b".into());

    assert_eq!(
        keys(&i, "approach", 0),
        vec!["approach_b_approach", "approach_b_other", "approach_b_link"]
    );
    assert_eq!(
        keys(&i, "approach", 1),
        vec![
            "approach_b_approach",
            "approach_b_other",
            "approach_b_link",
            "approach_b_link_c_out",
            "approach_b_link_c_side",
        ]
    );
}

#[test]
fn via_way_turn_carries_the_ordered_ways() {
    let g = dual_carriageway(&[]);
    let i = Intersection::new(&g, &"b".into());
    let turns = i.turns(&"approach".into(), 1);
    let through = turns
        .iter()
        .find(|t| t.key == "approach_b_link_c_out")
        .unwrap();
    assert_eq!(through.via, TurnVia::Ways(vec!["link".into()]));
    assert_eq!(through.from.way, EntityId::from("approach"));
    assert_eq!(through.to.way, EntityId::from("out"));
    assert_eq!(through.from.node, EntityId::from("a"));
    assert_eq!(through.to.node, EntityId::from("d"));
}

#[test]
fn no_restriction_via_way_matches_the_full_path() {
    let g = dual_carriageway(&[restriction(
        "r",
        "no_left_turn",
        &[
            ("approach", EntityKind::Way, "from"),
            ("link", EntityKind::Way, "via"),
            ("out", EntityKind::Way, "to"),
        ],
    )]);
    let i = Intersection::new(&g, &"b".into());
    let turns = i.turns(&"approach".into(), 1);

    let through = turns
        .iter()
        .find(|t| t.key == "approach_b_link_c_out")
        .unwrap();
    assert_eq!(through.restriction_id, Some("r".into()));
    assert!(through.no);
    assert!(!through.only);
    assert_eq!(through.direct, Some(true));

    // The sibling maneuver over the same via way is unaffected.
    let sibling = turns
        .iter()
        .find(|t| t.key == "approach_b_link_c_side")
        .unwrap();
    assert!(sibling.restriction_id.is_none());
}

#[test]
fn via_way_restriction_needs_the_full_chain() {
    // Both carriageway ends meet at b, so a direct turn shares the
    // restriction's endpoints without ever walking its via way.
    let g = Graph::new([
        node("a", 0.0, 0.0001),
        node("b", 0.0, 0.0),
        node("c", 0.0001, 0.0),
        road("approach", &["a", "b"]),
        road("link", &["b", "c"]),
        road("back", &["c", "b"]),
        restriction(
            "r",
            "no_u_turn",
            &[
                ("approach", EntityKind::Way, "from"),
                ("link", EntityKind::Way, "via"),
                ("back", EntityKind::Way, "to"),
            ],
        ),
    ]);
    let i = Intersection::new(&g, &"b".into());
    let turns = i.turns(&"approach".into(), 1);
    let by_key = |k: &str| turns.iter().find(|t| t.key == k).cloned().unwrap();

    let direct = by_key("approach_b_back");
    assert!(direct.restriction_id.is_none());
    assert!(!direct.no);

    let walked = by_key("approach_b_link_c_back");
    assert_eq!(walked.restriction_id, Some("r".into()));
    assert!(walked.no);
    assert_eq!(walked.direct, Some(true));
}

#[test]
fn no_entry_binds_every_from_leg() {
    let mut entities: Vec<Entity> = cross_entities();
    entities.push(restriction(
        "r",
        "no_entry",
        &[
            ("west", EntityKind::Way, "from"),
            ("east", EntityKind::Way, "from"),
            ("c", EntityKind::Node, "via"),
            ("south", EntityKind::Way, "to"),
        ],
    ));
    let g = Graph::new(entities);
    let i = Intersection::new(&g, &"c".into());

    for from in ["west", "east"] {
        let turns = i.turns(&from.into(), 0);
        let onto_south = turns
            .iter()
            .find(|t| t.key == format!("{from}_c_south"))
            .unwrap();
        assert_eq!(onto_south.restriction_id, Some("r".into()), "from {from}");
        assert!(onto_south.no);
        assert_eq!(onto_south.direct, Some(true));
    }
}

#[test]
fn only_restriction_via_way_marks_every_departure() {
    let g = dual_carriageway(&[restriction(
        "r",
        "only_straight_on",
        &[
            ("approach", EntityKind::Way, "from"),
            ("link", EntityKind::Way, "via"),
            ("out", EntityKind::Way, "to"),
        ],
    )]);
    let i = Intersection::new(&g, &"b".into());
    let turns = i.turns(&"approach".into(), 1);
    let by_key = |k: &str| turns.iter().find(|t| t.key == k).cloned().unwrap();

    // The mandated continuation.
    let mandated = by_key("approach_b_link_c_out");
    assert!(mandated.only && !mandated.no);
    assert_eq!(mandated.direct, Some(true));

    // Stepping onto the via way is along the only-path, flagged but open.
    let onto_via = by_key("approach_b_link");
    assert!(onto_via.only && !onto_via.no);
    assert_eq!(onto_via.direct, Some(false));

    // Every other departure is implicitly forbidden.
    let u = by_key("approach_b_approach");
    assert!(u.no && !u.only);
    let off_other = by_key("approach_b_other");
    assert!(off_other.no && !off_other.only);
    let off_side = by_key("approach_b_link_c_side");
    assert!(off_side.no && !off_side.only);
    assert_eq!(off_side.restriction_id, Some("r".into()));
}

#[test]
fn restrictions_do_not_leak_to_other_from_ways() {
    let g = dual_carriageway(&[restriction(
        "r",
        "no_left_turn",
        &[
            ("approach", EntityKind::Way, "from"),
            ("link", EntityKind::Way, "via"),
            ("out", EntityKind::Way, "to"),
        ],
    )]);
    let i = Intersection::new(&g, &"c".into());
    let turns = i.turns(&"side".into(), 1);
    assert!(turns.iter().all(|t| t.restriction_id.is_none()));
}

#[test]
fn invalid_restrictions_are_ignored() {
    // Missing via: structurally invalid, excluded from the analysis.
    let g = dual_carriageway(&[restriction(
        "r",
        "no_left_turn",
        &[
            ("approach", EntityKind::Way, "from"),
            ("out", EntityKind::Way, "to"),
        ],
    )]);
    let i = Intersection::new(&g, &"b".into());
    assert!(!i.graph().has(&"r".into()));
    let turns = i.turns(&"approach".into(), 1);
    assert!(turns.iter().all(|t| t.restriction_id.is_none()));
}

// ---------------------------------------------------------------------------
// Through-way splitting
// ---------------------------------------------------------------------------

#[test]
fn through_road_turns_use_the_split_pieces() {
    let g = Graph::new([
        node("u", 0.0, 0.0),
        node("c", 0.0001, 0.0),
        node("w", 0.0002, 0.0),
        node("s", 0.0001, -0.0001),
        road("main", &["u", "c", "w"]),
        road("stem", &["c", "s"]),
    ]);
    let i = Intersection::new(&g, &"c".into());
    // The synthetic half indexes after the ways present before the split.
    assert_eq!(
        keys(&i, "main", 0),
        vec!["main_c_main", "main_c_stem", "main_c_w-1"]
    );
    // And from the synthetic half back across.
    assert_eq!(
        keys(&i, "w-1", 0),
        vec!["w-1_c_main", "w-1_c_stem", "w-1_c_w-1"]
    );
    assert!(i.turns(&"w-1".into(), 0)[2].u_turn);
}

#[test]
fn distance_limits_the_junction_reach() {
    // w sits ~110 m from the start vertex, past the default radius, so
    // "far" never becomes a via candidate.
    let g = Graph::new([
        node("u", 0.0, 0.0),
        node("c", 0.0001, 0.0),
        node("w", 0.001, 0.0),
        node("x", 0.0011, 0.0),
        node("s", 0.0001, -0.0001),
        road("west", &["u", "c"]),
        road("far", &["c", "w"]),
        road("tail", &["w", "x"]),
        road("stem", &["c", "s"]),
    ]);
    let i = Intersection::new(&g, &"c".into());
    assert!(!i.vertex_ids().contains(&"w".into()));
    let ks = keys(&i, "west", 1);
    assert!(ks.contains(&"west_c_far".to_owned()));
    assert!(!ks.iter().any(|k| k.contains("tail")));
}
