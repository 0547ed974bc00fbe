//! Spatial lookup over stop coordinates.
//!
//! An R-tree over (lon, lat) points gives a cheap bounding-box pre-filter;
//! candidates are then refined with the haversine distance.

use geo::{Distance, Haversine, Point};
use rstar::{AABB, RTree, primitives::GeomWithData};

use crate::domain::Coordinate;

use super::index::{Stop, StopIdx};

/// Approximate metres per degree of latitude (used for the pre-filter box).
const METERS_PER_DEG_LAT: f64 = 111_111.0;

/// Spatial index over stops.
#[derive(Debug, Clone)]
pub struct StopTree {
    tree: RTree<GeomWithData<[f64; 2], StopIdx>>,
}

impl StopTree {
    /// Build the tree from the stop table; stop `i` gets `StopIdx(i)`.
    pub fn build(stops: &[Stop]) -> Self {
        let points = stops
            .iter()
            .enumerate()
            .map(|(i, stop)| {
                GeomWithData::new([stop.coordinate.lon(), stop.coordinate.lat()], StopIdx(i))
            })
            .collect();

        Self {
            tree: RTree::bulk_load(points),
        }
    }

    /// All stops within `radius_m` metres of `center`, with their distances.
    ///
    /// Order is unspecified.
    pub fn within(&self, center: &Coordinate, radius_m: f64) -> Vec<(StopIdx, f64)> {
        let origin = Point::new(center.lon(), center.lat());

        self.tree
            .locate_in_envelope(&search_box(center, radius_m))
            .filter_map(|item| {
                let [lon, lat] = *item.geom();
                let dist = Haversine.distance(origin, Point::new(lon, lat));
                (dist <= radius_m).then_some((item.data, dist))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// Bounding box in degrees that contains the circle of `radius_m` around
/// `center`.
///
/// The longitude span is widened using the latitude furthest from the
/// equator that the box reaches. Circles crossing the antimeridian are
/// clipped.
fn search_box(center: &Coordinate, radius_m: f64) -> AABB<[f64; 2]> {
    let dlat = radius_m / METERS_PER_DEG_LAT;
    let widest_lat = (center.lat().abs() + dlat).min(89.9);
    let dlon = (radius_m / (METERS_PER_DEG_LAT * widest_lat.to_radians().cos())).min(360.0);

    AABB::from_corners(
        [center.lon() - dlon, center.lat() - dlat],
        [center.lon() + dlon, center.lat() + dlat],
    )
}
