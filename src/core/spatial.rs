//! R-tree index over the government property reference set.
//!
//! Radius queries run in two stages: an envelope lookup in the tree using a
//! latitude-corrected bounding box, then exact great-circle pruning of the
//! candidates that fall in the box corners.

use crate::core::distance::{calculate_bounding_box, haversine_distance};
use crate::models::GovernmentPropertyRecord;
use rstar::{RTree, RTreeObject, AABB};
use std::sync::{Arc, RwLock};

/// Tree entry: a point envelope plus the slot of its record
#[derive(Debug, Clone, PartialEq)]
struct IndexedPoint {
    /// `[longitude, latitude]`
    position: [f64; 2],
    slot: usize,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Immutable spatial index. Rebuild and swap through [`SharedSpatialIndex`].
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
    records: Vec<GovernmentPropertyRecord>,
}

impl SpatialIndex {
    /// Bulk-load an index from a set of records
    pub fn build(records: Vec<GovernmentPropertyRecord>) -> Self {
        let points = records
            .iter()
            .enumerate()
            .map(|(slot, record)| IndexedPoint {
                position: [record.longitude, record.latitude],
                slot,
            })
            .collect();

        let tree = RTree::bulk_load(points);
        tracing::debug!("Built spatial index over {} records", records.len());

        Self { tree, records }
    }

    pub fn empty() -> Self {
        Self::build(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records within `radius_miles` of the point
    ///
    /// Coordinates and radius are assumed valid. Returns records sorted by
    /// distance, nearest first; an empty vector is a valid answer.
    pub fn query_radius(
        &self,
        lat: f64,
        lng: f64,
        radius_miles: f64,
    ) -> Vec<&GovernmentPropertyRecord> {
        let bbox = calculate_bounding_box(lat, lng, radius_miles);
        let envelope = AABB::from_corners([bbox.min_lon, bbox.min_lat], [bbox.max_lon, bbox.max_lat]);

        let mut hits: Vec<(f64, &GovernmentPropertyRecord)> = self
            .tree
            .locate_in_envelope(&envelope)
            .filter_map(|point| {
                let record = &self.records[point.slot];
                let distance = haversine_distance(lat, lng, record.latitude, record.longitude);
                (distance <= radius_miles).then_some((distance, record))
            })
            .collect();

        hits.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        tracing::trace!(
            "Radius query ({}, {}, {}mi) matched {} records",
            lat,
            lng,
            radius_miles,
            hits.len()
        );

        hits.into_iter().map(|(_, record)| record).collect()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::empty()
    }
}

/// Read-mostly handle to the current index.
///
/// Readers take an `Arc` snapshot and release the lock immediately, so a
/// background rebuild only contends on the pointer swap. Readers holding an
/// older snapshot keep seeing the previous data until they take a new one.
#[derive(Debug, Default)]
pub struct SharedSpatialIndex {
    current: RwLock<Arc<SpatialIndex>>,
}

impl SharedSpatialIndex {
    pub fn new(index: SpatialIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn snapshot(&self) -> Arc<SpatialIndex> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn replace(&self, index: SpatialIndex) {
        let fresh = Arc::new(index);
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ownership;

    fn record(id: &str, lat: f64, lng: f64) -> GovernmentPropertyRecord {
        GovernmentPropertyRecord {
            id: id.to_string(),
            latitude: lat,
            longitude: lng,
            ownership: Ownership::Leased,
            rsf: 10_000.0,
            lease_expiration: None,
            agency: None,
        }
    }

    #[test]
    fn test_query_radius_prunes_box_corners() {
        // 4.9 miles due north is inside; the NE corner of the 5mi box is not
        let lat_step = 4.9 / 69.0;
        let index = SpatialIndex::build(vec![
            record("center", 38.9072, -77.0369),
            record("north", 38.9072 + lat_step, -77.0369),
            record("corner", 38.9072 + lat_step, -77.0369 + 0.09),
            record("nyc", 40.7128, -74.0060),
        ]);

        let hits = index.query_radius(38.9072, -77.0369, 5.0);
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();

        assert_eq!(ids, vec!["center", "north"]);
    }

    #[test]
    fn test_isolated_point_is_empty_not_error() {
        let index = SpatialIndex::build(vec![record("nyc", 40.7128, -74.0060)]);
        assert!(index.query_radius(46.8772, -96.7898, 10.0).is_empty());
        assert!(SpatialIndex::empty().query_radius(0.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_shared_index_swap() {
        let shared = SharedSpatialIndex::new(SpatialIndex::empty());
        let before = shared.snapshot();

        shared.replace(SpatialIndex::build(vec![record("a", 38.9, -77.0)]));

        assert_eq!(before.len(), 0);
        assert_eq!(shared.snapshot().len(), 1);
    }
}
