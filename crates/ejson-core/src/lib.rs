//! # ejson-core: Distribution Network Graph Core
//!
//! Typed graph model for e-JSON electrical distribution networks.
//!
//! ## Design
//!
//! A network is an **undirected multigraph** where every [`Component`] is a
//! graph vertex and every terminal of an element is an edge ([`Connection`])
//! to a Node component:
//! - **Nodes** carry a phase set, a base voltage and optional coordinates
//! - **Elements** (Line, Transformer, Load, Infeeder, Connector) own numbered
//!   terminals; parallel edges are legal (e.g. both windings on one node)
//!
//! Iteration order is deterministic. Components iterate in insertion order
//! (or DFS preorder after [`Network::reorder`]); the connections of an element
//! iterate by terminal index, and those of a node by the position of the
//! owning element, then terminal index.
//!
//! ## Quick Start
//!
//! ```rust
//! use ejson_core::*;
//! use num_complex::Complex64;
//!
//! let mut network = Network::new();
//! network.add_component(Component::node("nd1", NodeData::new(["A", "B", "C"], 11.0)))?;
//! network.add_component(Component::node("nd2", NodeData::new(["A", "B", "C"], 11.0)))?;
//! network.add_component(Component::line(
//!     "ln1_2",
//!     LineData::new(0.5, Complex64::new(0.1, 0.2), Complex64::new(0.3, 0.6)),
//! ))?;
//! network.connect("ln1_2", "nd1", 0, TerminalAttrs::with_phases(["A", "B", "C"]))?;
//! network.connect("ln1_2", "nd2", 1, TerminalAttrs::with_phases(["A", "B", "C"]))?;
//!
//! assert_eq!(network.neighbors("ln1_2"), vec!["nd1", "nd2"]);
//! # Ok::<(), ejson_core::GraphError>(())
//! ```
//!
//! ## Modules
//!
//! - [`component`] - component payloads, terminals and phase helpers
//! - [`traversal`] - depth-first walk with visitor hooks
//! - [`report`] - audit report types
//! - [`properties`] - network-level configuration record
//! - [`error`] - unified error type

use std::collections::HashMap;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;

pub mod component;
pub mod error;
pub mod properties;
pub mod report;
pub mod traversal;

pub use component::{
    is_active_phase, is_phase_subset, same_phase_set, Component, ComponentData, ComponentType,
    Connection, ConnectorData, Extra, InfeederData, LineData, LoadData, NodeData, SwitchState,
    TerminalAttrs, TransformerData, TurnsRatio, Wiring, MERGED_USER_DATA_KEY, ORIG_IDS_KEY,
};
pub use error::{EjsonError, EjsonResult, GraphError};
pub use properties::{NetworkProperties, Units, VoltageType};
pub use report::{AuditReport, AuditSection, Problem, Severity};
pub use traversal::{Accumulate, Step, StopWhen, Traversal, Visitor};

/// Selects which components [`Network::components_of`] yields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentFilter {
    pub ctype: Option<ComponentType>,
    pub nodes_only: bool,
    pub elements_only: bool,
}

impl ComponentFilter {
    pub fn of_type(ctype: ComponentType) -> Self {
        Self {
            ctype: Some(ctype),
            ..Self::default()
        }
    }

    pub fn nodes() -> Self {
        Self {
            nodes_only: true,
            ..Self::default()
        }
    }

    pub fn elements() -> Self {
        Self {
            elements_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, component: &Component) -> bool {
        if self.ctype.is_some_and(|t| t != component.ctype()) {
            return false;
        }
        if self.nodes_only && !component.is_node() {
            return false;
        }
        !(self.elements_only && component.is_node())
    }
}

/// An e-JSON network: components, connections and global properties.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub properties: NetworkProperties,
    graph: StableUnGraph<Component, Connection>,
    order: IndexMap<String, NodeIndex>,
    fresh_counter: u64,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(properties: NetworkProperties) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.order.contains_key(id)
    }

    pub fn add_component(&mut self, component: Component) -> Result<(), GraphError> {
        if self.order.contains_key(&component.id) {
            return Err(GraphError::DuplicateId(component.id));
        }
        let id = component.id.clone();
        let ix = self.graph.add_node(component);
        self.order.insert(id, ix);
        Ok(())
    }

    /// Attach terminal `index` of `element` to `node`.
    pub fn connect(
        &mut self,
        element: &str,
        node: &str,
        index: usize,
        attrs: TerminalAttrs,
    ) -> Result<(), GraphError> {
        let elem_ix = self.element_index(element)?;
        let node_ix = match self.order.get(node) {
            Some(&ix) if self.graph[ix].is_node() => ix,
            _ => {
                return Err(GraphError::UnknownNode {
                    element: element.to_string(),
                    node: node.to_string(),
                    index,
                })
            }
        };
        self.graph.add_edge(
            elem_ix,
            node_ix,
            Connection {
                element: element.to_string(),
                node: node.to_string(),
                index,
                attrs,
            },
        );
        Ok(())
    }

    /// Remove a component and all its connections. Nodes left without
    /// connections stay until [`Network::remove_unconnected_nodes`].
    pub fn remove_component(&mut self, id: &str) -> Option<Component> {
        let ix = self.order.shift_remove(id)?;
        self.graph.remove_node(ix)
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.order.get(id).map(|&ix| &self.graph[ix])
    }

    pub fn component_mut(&mut self, id: &str) -> Option<&mut Component> {
        let ix = *self.order.get(id)?;
        self.graph.node_weight_mut(ix)
    }

    /// All components in iteration order.
    pub fn components(&self) -> impl Iterator<Item = &Component> + '_ {
        self.order.values().map(move |&ix| &self.graph[ix])
    }

    /// Components matching `filter`, in iteration order. Call again to restart.
    pub fn components_of(&self, filter: ComponentFilter) -> impl Iterator<Item = &Component> + '_ {
        self.components().filter(move |c| filter.matches(c))
    }

    /// Ids of components matching `filter`, collected so the caller may mutate.
    pub fn ids_of(&self, filter: ComponentFilter) -> Vec<String> {
        self.components_of(filter).map(|c| c.id.clone()).collect()
    }

    /// Every connection, grouped by element in iteration order.
    pub fn connections(&self) -> Vec<&Connection> {
        self.components()
            .filter(|c| c.is_element())
            .flat_map(|c| self.connections_from(&c.id))
            .collect()
    }

    /// Every connection, in no particular order, for in-place attribute edits.
    pub fn connections_mut(&mut self) -> impl Iterator<Item = &mut Connection> + '_ {
        self.graph.edge_weights_mut()
    }

    /// Connections incident to `id` in canonical order.
    pub fn connections_from(&self, id: &str) -> Vec<&Connection> {
        let Some(&ix) = self.order.get(id) else {
            return Vec::new();
        };
        let mut cons: Vec<&Connection> = self.graph.edges(ix).map(|e| e.weight()).collect();
        if self.graph[ix].is_node() {
            cons.sort_by_key(|c| (self.order.get_index_of(c.element.as_str()), c.index));
        } else {
            cons.sort_by_key(|c| c.index);
        }
        cons
    }

    /// Connections joining `a` and `b`, in `a`'s canonical order.
    pub fn connections_between(&self, a: &str, b: &str) -> Vec<&Connection> {
        self.connections_from(a)
            .into_iter()
            .filter(|c| c.other_end(a) == b)
            .collect()
    }

    /// Distinct adjacent component ids in connection order.
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        for con in self.connections_from(id) {
            seen.insert(con.other_end(id));
        }
        seen.into_iter().collect()
    }

    /// Number of connections incident to `id`.
    pub fn degree(&self, id: &str) -> usize {
        self.order
            .get(id)
            .map(|&ix| self.graph.edges(ix).count())
            .unwrap_or(0)
    }

    /// Rewire the terminals of `element` through `remap` (old node id to new
    /// node id). Terminal indices and attributes are preserved.
    pub fn reconnect_element(
        &mut self,
        element: &str,
        remap: &HashMap<String, String>,
    ) -> Result<(), GraphError> {
        let elem_ix = self.element_index(element)?;
        let edges: Vec<EdgeIndex> = self.graph.edges(elem_ix).map(|e| e.id()).collect();

        let mut moves = Vec::new();
        for edge in edges {
            let con = &self.graph[edge];
            let Some(target) = remap.get(&con.node) else {
                continue;
            };
            if *target == con.node {
                continue;
            }
            match self.order.get(target) {
                Some(&ix) if self.graph[ix].is_node() => moves.push((edge, ix, target.clone())),
                _ => {
                    return Err(GraphError::UnknownNode {
                        element: element.to_string(),
                        node: target.clone(),
                        index: con.index,
                    })
                }
            }
        }

        for (edge, node_ix, target) in moves {
            if let Some(mut con) = self.graph.remove_edge(edge) {
                con.node = target;
                self.graph.add_edge(elem_ix, node_ix, con);
            }
        }
        Ok(())
    }

    /// Remove every Node without connections, returning the removed ids.
    pub fn remove_unconnected_nodes(&mut self) -> Vec<String> {
        let isolated: Vec<String> = self
            .components_of(ComponentFilter::nodes())
            .filter(|c| self.degree(&c.id) == 0)
            .map(|c| c.id.clone())
            .collect();
        for id in &isolated {
            self.remove_component(id);
        }
        isolated
    }

    /// Relabel iteration order to DFS preorder from `start` and renumber the
    /// terminals of every reached non-Transformer element by the discovery
    /// order of their nodes. Unreached components keep their relative order
    /// after the reached ones.
    pub fn reorder(&mut self, start: &str) -> Result<(), GraphError> {
        if !self.contains(start) {
            return Err(GraphError::UnknownComponent(start.to_string()));
        }
        let preorder = self.preorder(start);

        let mut order = IndexMap::with_capacity(self.order.len());
        for id in &preorder {
            if let Some(&ix) = self.order.get(id) {
                order.insert(id.clone(), ix);
            }
        }
        for (id, &ix) in &self.order {
            if !order.contains_key(id) {
                order.insert(id.clone(), ix);
            }
        }
        self.order = order;

        let rank = |node: &str| preorder.get_index_of(node).unwrap_or(usize::MAX);
        for id in &preorder {
            let ix = self.order[id];
            let ctype = self.graph[ix].ctype();
            if ctype == ComponentType::Node || ctype == ComponentType::Transformer {
                continue;
            }
            let mut terminals: Vec<(EdgeIndex, usize, usize)> = self
                .graph
                .edges(ix)
                .map(|e| (e.id(), rank(e.weight().node.as_str()), e.weight().index))
                .collect();
            terminals.sort_by_key(|&(_, r, index)| (r, index));
            for (new_index, (edge, _, _)) in terminals.into_iter().enumerate() {
                self.graph[edge].index = new_index;
            }
        }
        Ok(())
    }

    /// Canonical renaming: `{type}_{n}` with a counter per type, numbered in
    /// iteration order. Returns the applied mapping.
    pub fn rename(&mut self) -> IndexMap<String, String> {
        let mut counters: HashMap<ComponentType, usize> = HashMap::new();
        let mut mapping = IndexMap::with_capacity(self.len());
        for component in self.components() {
            let n = counters.entry(component.ctype()).or_insert(0);
            *n += 1;
            let new_id = format!("{}_{}", component.ctype().as_str().to_lowercase(), n);
            mapping.insert(component.id.clone(), new_id);
        }
        let lookup: HashMap<String, String> = mapping
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.rename_to(&lookup);
        mapping
    }

    /// Rename components through `mapping`; ids not in the map are kept.
    pub fn rename_to(&mut self, mapping: &HashMap<String, String>) {
        let old = std::mem::take(&mut self.order);
        for (id, ix) in old {
            let new_id = mapping.get(&id).cloned().unwrap_or(id);
            self.graph[ix].id = new_id.clone();
            self.order.insert(new_id, ix);
        }
        for con in self.graph.edge_weights_mut() {
            if let Some(new_id) = mapping.get(&con.element) {
                con.element = new_id.clone();
            }
            if let Some(new_id) = mapping.get(&con.node) {
                con.node = new_id.clone();
            }
        }
    }

    /// Remove everything reached by a DFS from `start` that halts where `stop`
    /// holds, then prune unconnected nodes. Returns the removed ids.
    pub fn trim<F>(&mut self, start: &str, stop: F) -> Vec<String>
    where
        F: FnMut(&Network, &Component) -> bool,
    {
        let visited = self.dfs(start, &mut StopWhen(stop), ()).visited;
        let mut removed: Vec<String> = visited.into_iter().collect();
        for id in &removed {
            self.remove_component(id);
        }
        removed.extend(self.remove_unconnected_nodes());
        removed
    }

    /// Keep only what a DFS from `start` that halts where `stop` holds
    /// reaches, then prune unconnected nodes. Returns the removed ids.
    pub fn only<F>(&mut self, start: &str, stop: F) -> Vec<String>
    where
        F: FnMut(&Network, &Component) -> bool,
    {
        let visited = self.dfs(start, &mut StopWhen(stop), ()).visited;
        let mut removed: Vec<String> = self
            .order
            .keys()
            .filter(|id| !visited.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &removed {
            self.remove_component(id);
        }
        removed.extend(self.remove_unconnected_nodes());
        removed
    }

    /// Next id of the form `{prefix}{n}` from the network-scoped counter,
    /// skipping ids that already exist.
    pub fn fresh_id(&mut self, prefix: &str) -> String {
        loop {
            self.fresh_counter += 1;
            let candidate = format!("{}{}", prefix, self.fresh_counter);
            if !self.order.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Summary counts for logging.
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();
        for component in self.components() {
            match &component.data {
                ComponentData::Node(_) => stats.num_nodes += 1,
                ComponentData::Line(line) => {
                    stats.num_lines += 1;
                    stats.total_line_length += line.length;
                }
                ComponentData::Transformer(_) => stats.num_transformers += 1,
                ComponentData::Load(_) => stats.num_loads += 1,
                ComponentData::Infeeder(_) => stats.num_infeeders += 1,
                ComponentData::Connector(_) => stats.num_connectors += 1,
            }
        }
        stats.num_connections = self.graph.edge_count();
        stats
    }

    fn element_index(&self, id: &str) -> Result<NodeIndex, GraphError> {
        let &ix = self
            .order
            .get(id)
            .ok_or_else(|| GraphError::UnknownComponent(id.to_string()))?;
        if self.graph[ix].is_node() {
            return Err(GraphError::NotAnElement(id.to_string()));
        }
        Ok(ix)
    }
}

/// Network summary statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkStats {
    pub num_nodes: usize,
    pub num_lines: usize,
    pub num_transformers: usize,
    pub num_loads: usize,
    pub num_infeeders: usize,
    pub num_connectors: usize,
    pub num_connections: usize,
    pub total_line_length: f64,
}

impl NetworkStats {
    pub fn num_components(&self) -> usize {
        self.num_nodes
            + self.num_lines
            + self.num_transformers
            + self.num_loads
            + self.num_infeeders
            + self.num_connectors
    }
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, {} lines (length {:.3}), {} transformers, {} loads, {} infeeders, {} connectors",
            self.num_nodes,
            self.num_lines,
            self.total_line_length,
            self.num_transformers,
            self.num_loads,
            self.num_infeeders,
            self.num_connectors
        )
    }
}
