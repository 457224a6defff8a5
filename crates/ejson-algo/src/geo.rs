//! Node coordinates: affine maps between local `xy` and geographic
//! `lat_long`, and interpolation of missing positions.

use ejson_core::{Component, ComponentFilter, Network, NodeData, Step, Visitor};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::MapError;
use crate::linalg::solve_dense;

const EARTH_RADIUS_M: f64 = 6_378_100.0;
const DET_TOLERANCE: f64 = 1e-300;

/// A reference point known in both representations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Which missing representation [`add_map`] fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapTargets {
    pub lat_long: bool,
    pub xy: bool,
}

impl Default for MapTargets {
    fn default() -> Self {
        Self {
            lat_long: true,
            xy: true,
        }
    }
}

/// `lat_long = a · xy + b`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMap {
    pub a: [[f64; 2]; 2],
    pub b: [f64; 2],
}

impl AffineMap {
    /// Fit a map to 2 or 3 reference points.
    ///
    /// Two points fix an axis-aligned map: latitude follows `y`, longitude
    /// follows `x`. Three points fix a general affine map.
    pub fn fit(points: &[MapPoint]) -> Result<Self, MapError> {
        let map = match points {
            [p, q] => {
                let a01 = (p.lat - q.lat) / (p.y - q.y);
                let a10 = (p.lon - q.lon) / (p.x - q.x);
                AffineMap {
                    a: [[0.0, a01], [a10, 0.0]],
                    b: [p.lat - a01 * p.y, p.lon - a10 * p.x],
                }
            }
            [p, q, r] => {
                let area = (q.x - p.x) * (r.y - p.y) - (r.x - p.x) * (q.y - p.y);
                let extent = points
                    .iter()
                    .flat_map(|t| [(t.x - p.x).abs(), (t.y - p.y).abs()])
                    .fold(0.0, f64::max);
                if !(area.abs() > f64::EPSILON * extent * extent) {
                    return Err(MapError::Degenerate);
                }
                let mut matrix = Vec::with_capacity(6);
                let mut rhs = Vec::with_capacity(6);
                for p in points {
                    matrix.push(vec![p.x, p.y, 0.0, 0.0, 1.0, 0.0]);
                    matrix.push(vec![0.0, 0.0, p.x, p.y, 0.0, 1.0]);
                    rhs.push(p.lat);
                    rhs.push(p.lon);
                }
                let u = solve_dense(&matrix, &rhs).ok_or(MapError::Degenerate)?;
                AffineMap {
                    a: [[u[0], u[1]], [u[2], u[3]]],
                    b: [u[4], u[5]],
                }
            }
            _ => return Err(MapError::PointCount(points.len())),
        };
        if !map.is_invertible() {
            return Err(MapError::Degenerate);
        }
        Ok(map)
    }

    /// Equirectangular projection about `(lat0, lon0)`, in metres.
    pub fn standard(lat0: f64, lon0: f64) -> Self {
        let scale = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        let cos_lat0 = lat0.to_radians().cos();
        AffineMap {
            a: [[0.0, 1.0 / scale], [1.0 / (scale * cos_lat0), 0.0]],
            b: [lat0, lon0],
        }
    }

    fn det(&self) -> f64 {
        self.a[0][0] * self.a[1][1] - self.a[0][1] * self.a[1][0]
    }

    fn is_invertible(&self) -> bool {
        let det = self.det();
        det.is_finite() && det.abs() > DET_TOLERANCE && self.b.iter().all(|v| v.is_finite())
    }

    pub fn to_lat_long(&self, xy: [f64; 2]) -> [f64; 2] {
        let [[a00, a01], [a10, a11]] = self.a;
        [
            a00 * xy[0] + a01 * xy[1] + self.b[0],
            a10 * xy[0] + a11 * xy[1] + self.b[1],
        ]
    }

    pub fn to_xy(&self, lat_long: [f64; 2]) -> [f64; 2] {
        let [[a00, a01], [a10, a11]] = self.a;
        let det = self.det();
        let d = [lat_long[0] - self.b[0], lat_long[1] - self.b[1]];
        [
            (a11 * d[0] - a01 * d[1]) / det,
            (a00 * d[1] - a10 * d[0]) / det,
        ]
    }
}

/// Fit a map to `points` and give every node the representation it lacks,
/// as selected by `targets`. Nodes with neither representation are left
/// alone. Returns the number of nodes updated.
pub fn add_map(
    network: &mut Network,
    points: &[MapPoint],
    targets: MapTargets,
) -> Result<usize, MapError> {
    let map = AffineMap::fit(points)?;
    let mut updated = 0;
    for id in network.ids_of(ComponentFilter::nodes()) {
        let Some(node) = network.component_mut(&id).and_then(Component::as_node_mut) else {
            continue;
        };
        match (node.lat_long, node.xy) {
            (Some(ll), None) if targets.xy => node.xy = Some(map.to_xy(ll)),
            (None, Some(xy)) if targets.lat_long => node.lat_long = Some(map.to_lat_long(xy)),
            _ => continue,
        }
        updated += 1;
    }
    debug!(updated, map = ?map, "added map");
    Ok(updated)
}

/// Project every node with a `lat_long` onto `xy` in metres about the mean
/// position. Returns the number of nodes updated.
pub fn add_standard_map(network: &mut Network) -> usize {
    let located: Vec<(String, [f64; 2])> = network
        .components_of(ComponentFilter::nodes())
        .filter_map(|c| Some((c.id.clone(), c.as_node()?.lat_long?)))
        .collect();
    let Some([lat0, lon0]) = mean(located.iter().map(|(_, ll)| *ll)) else {
        warn!("no node has lat_long; standard map not added");
        return 0;
    };

    let map = AffineMap::standard(lat0, lon0);
    for (id, ll) in &located {
        if let Some(node) = network.component_mut(id).and_then(Component::as_node_mut) {
            node.xy = Some(map.to_xy(*ll));
        }
    }
    located.len()
}

/// Coordinate selector for [`add_missing_locations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordKey {
    LatLong,
    Xy,
}

impl CoordKey {
    pub fn get(self, node: &NodeData) -> Option<[f64; 2]> {
        match self {
            CoordKey::LatLong => node.lat_long,
            CoordKey::Xy => node.xy,
        }
    }

    pub fn set(self, node: &mut NodeData, value: [f64; 2]) {
        match self {
            CoordKey::LatLong => node.lat_long = Some(value),
            CoordKey::Xy => node.xy = Some(value),
        }
    }
}

/// Walks outwards from an unlocated node, stopping at located nodes.
struct NearestLocated {
    key: CoordKey,
}

impl Visitor<IndexMap<String, [f64; 2]>> for NearestLocated {
    fn pre_visit(
        &mut self,
        _: &Network,
        component: &Component,
        found: &mut IndexMap<String, [f64; 2]>,
    ) -> Step {
        match component.as_node().and_then(|n| self.key.get(n)) {
            Some(position) => {
                found.insert(component.id.clone(), position);
                Step::Halt
            }
            None => Step::Descend,
        }
    }
}

/// Give every node lacking `key` the mean position of the nearest located
/// nodes, found by walking outwards and stopping each branch at the first
/// located node. Nodes with no located node in reach get the mean of all
/// located nodes. Positions are computed from the input state, so newly
/// placed nodes do not influence each other. Returns the number of nodes
/// placed.
pub fn add_missing_locations(network: &mut Network, key: CoordKey) -> usize {
    let mut known = Vec::new();
    let mut missing = Vec::new();
    for component in network.components_of(ComponentFilter::nodes()) {
        match component.as_node().and_then(|n| key.get(n)) {
            Some(position) => known.push(position),
            None => missing.push(component.id.clone()),
        }
    }
    let Some(fallback) = mean(known.iter().copied()) else {
        warn!(?key, "no located nodes; locations not interpolated");
        return 0;
    };

    let placed: Vec<(String, [f64; 2])> = missing
        .into_iter()
        .map(|id| {
            let found = network
                .dfs(&id, &mut NearestLocated { key }, IndexMap::new())
                .accum;
            let position = mean(found.values().copied()).unwrap_or(fallback);
            (id, position)
        })
        .collect();

    for (id, position) in &placed {
        if let Some(node) = network.component_mut(id).and_then(Component::as_node_mut) {
            key.set(node, *position);
        }
    }
    debug!(placed = placed.len(), ?key, "interpolated missing locations");
    placed.len()
}

fn mean(points: impl Iterator<Item = [f64; 2]>) -> Option<[f64; 2]> {
    let (sum, n) = points.fold(([0.0, 0.0], 0usize), |(s, n), p| {
        ([s[0] + p[0], s[1] + p[1]], n + 1)
    });
    (n > 0).then(|| [sum[0] / n as f64, sum[1] / n as f64])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduce::test_support::*;

    fn close(a: [f64; 2], b: [f64; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-9 && (a[1] - b[1]).abs() < 1e-9
    }

    fn set(net: &mut Network, id: &str, lat_long: Option<[f64; 2]>, xy: Option<[f64; 2]>) {
        let node = net.component_mut(id).unwrap().as_node_mut().unwrap();
        node.lat_long = lat_long;
        node.xy = xy;
    }

    fn chain() -> Network {
        let mut net = Network::new();
        for id in ["nd0", "nd1", "nd2", "nd3"] {
            node(&mut net, id, &["A"]);
        }
        line(&mut net, "ln1", "nd0", "nd1", 1.0, (1.0, 1.0));
        line(&mut net, "ln2", "nd1", "nd2", 1.0, (1.0, 1.0));
        line(&mut net, "ln3", "nd2", "nd3", 1.0, (1.0, 1.0));
        net
    }

    #[test]
    fn two_point_map_is_axis_aligned() {
        let points = [
            MapPoint { x: 0.0, y: 0.0, lat: -35.0, lon: 149.0 },
            MapPoint { x: 100.0, y: 200.0, lat: -34.0, lon: 150.0 },
        ];
        let map = AffineMap::fit(&points).unwrap();
        assert_eq!(map.a[0][0], 0.0);
        assert_eq!(map.a[1][1], 0.0);
        assert!(close(map.to_lat_long([50.0, 100.0]), [-34.5, 149.5]));
        assert!(close(map.to_xy([-34.5, 149.5]), [50.0, 100.0]));
    }

    #[test]
    fn three_point_map_reproduces_references() {
        let points = [
            MapPoint { x: 0.0, y: 0.0, lat: 10.0, lon: 20.0 },
            MapPoint { x: 1.0, y: 0.0, lat: 10.5, lon: 21.0 },
            MapPoint { x: 0.0, y: 1.0, lat: 12.0, lon: 19.0 },
        ];
        let map = AffineMap::fit(&points).unwrap();
        for p in &points {
            assert!(close(map.to_lat_long([p.x, p.y]), [p.lat, p.lon]));
            assert!(close(map.to_xy([p.lat, p.lon]), [p.x, p.y]));
        }
    }

    #[test]
    fn bad_point_sets_are_rejected() {
        let p = MapPoint { x: 0.0, y: 0.0, lat: 0.0, lon: 0.0 };
        assert_eq!(AffineMap::fit(&[p]), Err(MapError::PointCount(1)));
        assert_eq!(AffineMap::fit(&[p; 4]), Err(MapError::PointCount(4)));
        assert_eq!(AffineMap::fit(&[p, p]), Err(MapError::Degenerate));
        let collinear = [
            p,
            MapPoint { x: 1.0, y: 1.0, lat: 1.0, lon: 1.0 },
            MapPoint { x: 2.0, y: 2.0, lat: 2.0, lon: 2.0 },
        ];
        assert_eq!(AffineMap::fit(&collinear), Err(MapError::Degenerate));
    }

    #[test]
    fn add_map_fills_only_what_is_missing() {
        let mut net = chain();
        set(&mut net, "nd0", Some([-34.5, 149.5]), None);
        set(&mut net, "nd1", None, Some([50.0, 100.0]));
        set(&mut net, "nd2", Some([1.0, 1.0]), Some([7.0, 7.0]));
        let points = [
            MapPoint { x: 0.0, y: 0.0, lat: -35.0, lon: 149.0 },
            MapPoint { x: 100.0, y: 200.0, lat: -34.0, lon: 150.0 },
        ];

        let only_xy = MapTargets { lat_long: false, xy: true };
        assert_eq!(add_map(&mut net, &points, only_xy).unwrap(), 1);
        assert_eq!(net.component("nd1").unwrap().as_node().unwrap().lat_long, None);

        assert_eq!(add_map(&mut net, &points, MapTargets::default()).unwrap(), 1);
        let nd0 = net.component("nd0").unwrap().as_node().unwrap();
        assert!(close(nd0.xy.unwrap(), [50.0, 100.0]));
        let nd1 = net.component("nd1").unwrap().as_node().unwrap();
        assert!(close(nd1.lat_long.unwrap(), [-34.5, 149.5]));
        let nd2 = net.component("nd2").unwrap().as_node().unwrap();
        assert_eq!(nd2.xy, Some([7.0, 7.0]));
        assert_eq!(net.component("nd3").unwrap().as_node().unwrap().xy, None);

        assert!(add_map(&mut net, &points[..1], MapTargets::default()).is_err());
    }

    #[test]
    fn standard_map_is_centred_on_the_mean() {
        let mut net = chain();
        set(&mut net, "nd0", Some([-35.0, 149.0]), None);
        set(&mut net, "nd1", Some([-35.0, 149.01]), None);
        set(&mut net, "nd2", Some([-34.99, 149.0]), None);
        set(&mut net, "nd3", Some([-34.99, 149.01]), None);
        assert_eq!(add_standard_map(&mut net), 4);

        let xy = |id: &str| net.component(id).unwrap().as_node().unwrap().xy.unwrap();
        let scale = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        assert!((xy("nd2")[1] - xy("nd0")[1] - 0.01 * scale).abs() < 1e-6);
        let dx = 0.01 * scale * (-34.995_f64).to_radians().cos();
        assert!((xy("nd1")[0] - xy("nd0")[0] - dx).abs() < 1e-6);
        let centre = mean(["nd0", "nd1", "nd2", "nd3"].into_iter().map(xy)).unwrap();
        assert!(close(centre, [0.0, 0.0]));
    }

    #[test]
    fn standard_map_without_positions_is_a_no_op() {
        let mut net = chain();
        assert_eq!(add_standard_map(&mut net), 0);
        assert_eq!(net.component("nd0").unwrap().as_node().unwrap().xy, None);
    }

    #[test]
    fn missing_locations_average_nearest_neighbours() {
        // nd0 and nd3 located, nd1 and nd2 between them.
        let mut net = chain();
        set(&mut net, "nd0", None, Some([0.0, 0.0]));
        set(&mut net, "nd3", None, Some([3.0, 6.0]));
        node(&mut net, "island", &["A"]);

        assert_eq!(add_missing_locations(&mut net, CoordKey::Xy), 3);
        let xy = |id: &str| net.component(id).unwrap().as_node().unwrap().xy.unwrap();
        assert!(close(xy("nd1"), [1.5, 3.0]));
        assert!(close(xy("nd2"), [1.5, 3.0]));
        // Unreachable nodes take the network-wide mean.
        assert!(close(xy("island"), [1.5, 3.0]));
        assert_eq!(net.component("nd1").unwrap().as_node().unwrap().lat_long, None);
    }

    #[test]
    fn nearest_located_node_shadows_farther_ones() {
        let mut net = chain();
        set(&mut net, "nd0", None, Some([0.0, 0.0]));
        set(&mut net, "nd1", None, Some([1.0, 1.0]));
        add_missing_locations(&mut net, CoordKey::Xy);
        let xy = |id: &str| net.component(id).unwrap().as_node().unwrap().xy.unwrap();
        assert!(close(xy("nd2"), [1.0, 1.0]));
        assert!(close(xy("nd3"), [1.0, 1.0]));
    }

    #[test]
    fn nothing_located_means_nothing_placed() {
        let mut net = chain();
        assert_eq!(add_missing_locations(&mut net, CoordKey::LatLong), 0);
    }
}
