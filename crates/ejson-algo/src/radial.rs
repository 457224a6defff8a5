//! Cycle breaking.

use ejson_core::{Component, ComponentType, EjsonResult, Network, Step, Visitor};
use indexmap::IndexSet;
use tracing::debug;

/// DFS state: the chain of open nodes and the lines that close a loop.
#[derive(Default)]
struct BreakCycles {
    ancestors: Vec<String>,
    to_remove: IndexSet<String>,
}

impl Visitor<()> for BreakCycles {
    fn pre_visit(&mut self, network: &Network, component: &Component, _: &mut ()) -> Step {
        if !component.is_live() {
            return Step::Halt;
        }
        match component.ctype() {
            ComponentType::Line => {
                let closes_loop = network
                    .connections_from(&component.id)
                    .iter()
                    .find(|c| c.index == 1)
                    .is_some_and(|c| self.ancestors.contains(&c.node));
                if closes_loop {
                    self.to_remove.insert(component.id.clone());
                    return Step::Halt;
                }
            }
            ComponentType::Node => self.ancestors.push(component.id.clone()),
            _ => {}
        }
        Step::Descend
    }

    fn post_visit(&mut self, _: &Network, component: &Component, _: &mut ()) {
        if component.is_node() {
            self.ancestors.pop();
        }
    }
}

/// Make the part of the network reachable from `start` radial by removing
/// the lines that close loops. Returns the removed line ids.
///
/// The network is first reordered from `start`, so terminal 1 of every
/// reached line points away from the root. A line reached while its
/// terminal-1 node is still open on the DFS path closes a loop. Non-live
/// components stop the walk; loops through them are kept.
pub fn make_radial(network: &mut Network, start: &str) -> EjsonResult<Vec<String>> {
    network.reorder(start)?;

    let mut visitor = BreakCycles::default();
    network.dfs(start, &mut visitor, ());

    let removed: Vec<String> = visitor.to_remove.into_iter().collect();
    for id in &removed {
        network.remove_component(id);
    }
    debug!(start, removed = ?removed, "made radial");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduce::test_support::*;
    use ejson_core::SwitchState;

    /// Two loops: nd0-la-nd1-lb-nd2-lc-nd0 and nd2-ld-nd3 with a parallel ld2.
    fn meshed() -> Network {
        let mut net = Network::new();
        for id in ["nd0", "nd1", "nd2", "nd3"] {
            node(&mut net, id, &["A", "B", "C"]);
        }
        line(&mut net, "la", "nd0", "nd1", 1.0, (1.0, 1.0));
        line(&mut net, "lb", "nd1", "nd2", 1.0, (1.0, 1.0));
        line(&mut net, "lc", "nd0", "nd2", 1.0, (1.0, 1.0));
        line(&mut net, "ld", "nd2", "nd3", 1.0, (1.0, 1.0));
        line(&mut net, "ld2", "nd3", "nd2", 1.0, (1.0, 1.0));
        load(&mut net, "ld3", "nd3");
        net
    }

    fn paths_to(net: &Network, from: &str, to: &str) -> usize {
        fn count(net: &Network, at: &str, to: &str, path: &mut Vec<String>) -> usize {
            if at == to {
                return 1;
            }
            let mut n = 0;
            for next in net.neighbors(at) {
                if path.iter().any(|p| p == next) {
                    continue;
                }
                path.push(next.to_string());
                n += count(net, next, to, path);
                path.pop();
            }
            n
        }
        count(net, from, to, &mut vec![from.to_string()])
    }

    #[test]
    fn loops_are_broken() {
        let mut net = meshed();
        let before = net.len();
        let removed = make_radial(&mut net, "nd0").unwrap();

        assert_eq!(removed.len(), 2);
        assert_eq!(net.len(), before - 2);
        for target in ["nd1", "nd2", "nd3", "ld3"] {
            assert_eq!(paths_to(&net, "nd0", target), 1, "{target}");
        }
        assert_eq!(make_radial(&mut net, "nd0").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn open_switch_keeps_its_loop() {
        let mut net = Network::new();
        for id in ["nd0", "nd1", "nd2"] {
            node(&mut net, id, &["A"]);
        }
        line(&mut net, "la", "nd0", "nd1", 1.0, (1.0, 1.0));
        line(&mut net, "lb", "nd1", "nd2", 1.0, (1.0, 1.0));
        connector(&mut net, "sw", "nd2", "nd0", Some(SwitchState::Open));

        assert!(make_radial(&mut net, "nd0").unwrap().is_empty());
        assert_eq!(net.len(), 6);
    }

    #[test]
    fn long_ring_loses_its_closing_line() {
        const DEPTH: usize = 10_000;
        let mut net = Network::new();
        for i in 0..DEPTH {
            node(&mut net, &format!("nd{i}"), &["A"]);
        }
        for i in 1..DEPTH {
            let (a, b) = (format!("nd{}", i - 1), format!("nd{i}"));
            line(&mut net, &format!("ln{i}"), &a, &b, 1.0, (1.0, 1.0));
        }
        line(&mut net, "ln_close", &format!("nd{}", DEPTH - 1), "nd0", 1.0, (1.0, 1.0));
        let before = net.len();

        let removed = make_radial(&mut net, "nd0").unwrap();
        assert_eq!(removed, vec!["ln_close"]);
        assert_eq!(net.len(), before - 1);
        assert_eq!(net.preorder("nd0").len(), net.len());
    }

    #[test]
    fn unknown_start_is_an_error() {
        let mut net = meshed();
        assert!(make_radial(&mut net, "nd9").is_err());
        assert_eq!(net.len(), 10);
    }
}
