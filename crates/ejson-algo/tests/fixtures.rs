//! End-to-end tests of the reducers and transforms on the shared fixtures.

use std::path::PathBuf;

use ejson_algo::*;
use ejson_core::{
    Component, ComponentFilter, ComponentType, LineData, Network, StopWhen, TerminalAttrs,
    Wiring, ORIG_IDS_KEY,
};
use ejson_io::read_network;
use num_complex::Complex64;
use serde_json::json;

fn fixture(name: &str) -> Network {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../test_data")
        .join(name);
    read_network(path).unwrap()
}

fn line(net: &Network, id: &str) -> LineData {
    net.component(id).and_then(|c| c.as_line()).cloned().unwrap()
}

fn sorted_ids(net: &Network) -> Vec<String> {
    let mut ids: Vec<String> = net.components().map(|c| c.id.clone()).collect();
    ids.sort();
    ids
}

fn close(a: Complex64, b: Complex64) -> bool {
    (a - b).norm() < 1e-9
}

#[test]
fn test_parallel_duplicate_halves_impedance() {
    let mut net = fixture("simple_network.json");
    net.add_component(Component::line(
        "ln2_3b",
        LineData::new(1.0, Complex64::new(1.0, 1.0), Complex64::new(1.0, 1.0)),
    ))
    .unwrap();
    let abc = || TerminalAttrs::with_phases(["A", "B", "C"]);
    net.connect("ln2_3b", "nd2", 0, abc()).unwrap();
    net.connect("ln2_3b", "nd3", 1, abc()).unwrap();

    assert_eq!(merge_dups(&mut net), 1);
    assert!(!net.contains("ln2_3b"));

    let merged = line(&net, "ln2_3");
    assert!(close(merged.z, Complex64::new(0.5, 0.5)));
    assert!(close(merged.z0, Complex64::new(0.5, 0.5)));
    assert_eq!(merged.length, 1.0);
    assert_eq!(net.len(), 7);
}

#[test]
fn test_reducible_feeder_reaches_core() {
    let mut net = fixture("reducible_feeder.json");
    assert_eq!(net.len(), 19);
    reduce_network(&mut net).unwrap();

    assert_eq!(
        sorted_ids(&net),
        vec![
            "in1",
            "ld3",
            "ld4",
            "ld5",
            "ln3_5a",
            "merged_line_1",
            "nd0",
            "nd3",
            "nd5",
        ]
    );

    // ln0 + ln1 + ln2, series.
    let trunk = line(&net, "merged_line_1");
    assert!((trunk.length - 4.0).abs() < 1e-12);
    assert!(close(trunk.z * trunk.length, Complex64::new(0.8, 0.4)));
    assert_eq!(net.neighbors("merged_line_1"), vec!["nd0", "nd3"]);
    let user_data = net.component("merged_line_1").unwrap().user_data.clone().unwrap();
    assert_eq!(user_data[ORIG_IDS_KEY], json!(["ln0", "ln1", "ln2"]));
    assert_eq!(
        user_data["merged_user_data"],
        json!({"ln1": {"asset": "OH-17"}})
    );

    // The short circuit folded nd4 into nd3.
    assert_eq!(net.neighbors("ld4"), vec!["nd3"]);

    // The parallel pair became one line.
    let pair = line(&net, "ln3_5a");
    assert!(close(pair.z, Complex64::new(0.2, 0.1)));
    assert!(close(pair.z0, Complex64::new(0.6, 0.3)));
    assert_eq!(pair.length, 0.5);
    let user_data = net.component("ln3_5a").unwrap().user_data.clone().unwrap();
    assert_eq!(user_data[ORIG_IDS_KEY], json!(["ln3_5a", "ln3_5b"]));

    let before = sorted_ids(&net);
    reduce_network(&mut net).unwrap();
    assert_eq!(sorted_ids(&net), before);
}

#[test]
fn test_meshed_feeder_becomes_radial() {
    let mut net = fixture("meshed_feeder.json");
    assert_eq!(net.len(), 14);

    let removed = make_radial(&mut net, "in1").unwrap();
    assert_eq!(removed.len(), 1);
    assert!(["ln0_1", "ln1_2", "ln2_3", "ln3_0"].contains(&removed[0].as_str()));
    assert_eq!(net.len(), 13);
    assert!(net.contains("sw4_2"));

    // Live two-terminal elements form a spanning tree of the nodes.
    let reached = net
        .dfs("in1", &mut StopWhen(|_: &Network, c: &Component| !c.is_live()), ())
        .visited;
    let nodes = net.ids_of(ComponentFilter::nodes());
    assert!(nodes.iter().all(|id| reached.contains(id)));
    let live_lines = net
        .components_of(ComponentFilter::of_type(ComponentType::Line))
        .filter(|c| c.is_live())
        .count();
    assert_eq!(live_lines, nodes.len() - 1);

    assert!(make_radial(&mut net, "in1").unwrap().is_empty());
}

#[test]
fn test_scenario_single_phase_equivalent() {
    let mut net = fixture("simple_network.json");
    make_single_phased(&mut net).unwrap();

    assert!(net.properties.is_line_to_ground());
    for con in net.connections() {
        assert_eq!(con.attrs.phs, vec!["A"]);
    }
    let node = net.component("nd1").and_then(|c| c.as_node()).unwrap();
    assert_eq!(node.phs, vec!["A"]);
    assert_eq!(node.v_base, 11.0);

    let ln = line(&net, "ln2_3");
    assert!(close(ln.z, Complex64::new(1.0, 1.0)));
    assert_eq!(ln.z0, ln.z);
    assert!((ln.i_max.unwrap() - 0.4 * 3f64.sqrt()).abs() < 1e-12);

    let tx = net.component("tx1_2").and_then(|c| c.as_transformer()).unwrap();
    assert_eq!(tx.vector_group, "yy0");
    assert_eq!(tx.n_winding_pairs, Some(1));

    let load = net
        .component_mut("ld3")
        .and_then(|c| c.as_load_mut())
        .unwrap();
    assert_eq!(load.wiring, Some(Wiring::Wye));
    assert_eq!(load.s_nom.len(), 1);
    assert!(close(load.s_nom[0], Complex64::new(0.03, 0.006)));
}

#[test]
fn test_meshed_feeder_locations_filled() {
    let mut net = fixture("meshed_feeder.json");
    assert_eq!(add_missing_locations(&mut net, CoordKey::LatLong), 3);

    for node in net.components_of(ComponentFilter::nodes()) {
        let [lat, lon] = node.as_node().and_then(|n| n.lat_long).unwrap();
        assert!((-35.3201..=-35.2999).contains(&lat), "{}: {lat}", node.id);
        assert!((149.0999..=149.1201).contains(&lon), "{}: {lon}", node.id);
    }

    assert_eq!(add_standard_map(&mut net), 5);
    let xy = net.component("nd0").and_then(|c| c.as_node()).and_then(|n| n.xy);
    assert!(xy.is_some());
}
