//! Property tests for the reduction pipeline.

use ejson_algo::reduce_network;
use ejson_core::{
    Component, ComponentData, ComponentFilter, ComponentType, Extra, InfeederData, LineData,
    LoadData, Network, NodeData, TerminalAttrs,
};
use num_complex::Complex64;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Segment {
    length: f64,
    z: Complex64,
    duplicated: bool,
    spur: bool,
}

fn segment() -> impl Strategy<Value = Segment> {
    (0.1_f64..5.0, 0.01_f64..1.0, 0.01_f64..1.0, any::<bool>(), any::<bool>()).prop_map(
        |(length, re, im, duplicated, spur)| Segment {
            length,
            z: Complex64::new(re, im),
            duplicated,
            spur,
        },
    )
}

fn abc() -> TerminalAttrs {
    TerminalAttrs::with_phases(["A", "B", "C"])
}

fn add_node(net: &mut Network, id: &str) {
    net.add_component(Component::node(id, NodeData::new(["A", "B", "C"], 11.0)))
        .unwrap();
}

fn add_line(net: &mut Network, id: &str, from: &str, to: &str, length: f64, z: Complex64) {
    net.add_component(Component::line(id, LineData::new(length, z, z * 3.0)))
        .unwrap();
    net.connect(id, from, 0, abc()).unwrap();
    net.connect(id, to, 1, abc()).unwrap();
}

/// `in1 - nd0 - ln0 - nd1 - ... - nd{n} - ld`, with optional parallel
/// duplicates and dead-end spurs along the way.
fn feeder(segments: &[Segment]) -> Network {
    let mut net = Network::new();
    add_node(&mut net, "nd0");
    net.add_component(Component::new(
        "in1",
        ComponentData::Infeeder(InfeederData {
            v_setpoint: None,
            extra: Extra::new(),
        }),
    ))
    .unwrap();
    net.connect("in1", "nd0", 0, abc()).unwrap();

    for (i, seg) in segments.iter().enumerate() {
        let (from, to) = (format!("nd{i}"), format!("nd{}", i + 1));
        add_node(&mut net, &to);
        add_line(&mut net, &format!("ln{i}"), &from, &to, seg.length, seg.z);
        if seg.duplicated {
            add_line(&mut net, &format!("ln{i}b"), &from, &to, seg.length, seg.z);
        }
        if seg.spur {
            let tip = format!("spur{i}");
            add_node(&mut net, &tip);
            add_line(&mut net, &format!("ln{i}s"), &to, &tip, 1.0, seg.z);
        }
    }

    let last = format!("nd{}", segments.len());
    net.add_component(Component::new(
        "ld1",
        ComponentData::Load(LoadData {
            wiring: None,
            s_nom: vec![Complex64::new(0.1, 0.02); 3],
            extra: Extra::new(),
        }),
    ))
    .unwrap();
    net.connect("ld1", &last, 0, abc()).unwrap();
    net
}

fn lines(net: &Network) -> Vec<LineData> {
    net.components_of(ComponentFilter::of_type(ComponentType::Line))
        .filter_map(|c| c.as_line().cloned())
        .collect()
}

fn sorted_ids(net: &Network) -> Vec<String> {
    let mut ids: Vec<String> = net.components().map(|c| c.id.clone()).collect();
    ids.sort();
    ids
}

proptest! {
    #[test]
    fn series_string_conserves_impedance(
        segments in prop::collection::vec(segment(), 2..8)
    ) {
        let plain: Vec<Segment> = segments
            .into_iter()
            .map(|s| Segment { duplicated: false, spur: false, ..s })
            .collect();
        let expected: Complex64 = plain.iter().map(|s| s.z * s.length).sum();

        let mut net = feeder(&plain);
        reduce_network(&mut net).unwrap();

        let lines = lines(&net);
        prop_assert_eq!(lines.len(), 1);
        let merged = &lines[0];
        let total = merged.z * merged.length;
        prop_assert!((total - expected).norm() <= 1e-9 * expected.norm());
        prop_assert!((merged.z0 - merged.z * 3.0).norm() <= 1e-9 * merged.z.norm());
    }

    #[test]
    fn reduction_is_idempotent(segments in prop::collection::vec(segment(), 1..8)) {
        let mut net = feeder(&segments);
        reduce_network(&mut net).unwrap();
        let once = sorted_ids(&net);

        reduce_network(&mut net).unwrap();
        prop_assert_eq!(sorted_ids(&net), once);
        prop_assert!(net.contains("in1") && net.contains("ld1"));
    }
}
