//! In-memory spatial database backed by an R-tree.

use async_trait::async_trait;
use geo::Intersects;
use rstar::{RTree, RTreeObject, AABB};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::feature::{count_by_placetype, parse_feature_collection};
use super::{DatabaseError, SpatialDatabase, SpatialFeature};
use crate::models::PlaceRecord;
use crate::pip::{Coordinate, QueryFilter};

/// Wrapper for R-tree indexing of place features
#[derive(Clone)]
struct IndexedFeature {
    feature: Arc<SpatialFeature>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedFeature {
    fn new(feature: SpatialFeature) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) = feature.bbox()?;
        Some(Self {
            feature: Arc::new(feature),
            envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
        })
    }
}

/// Point-in-polygon database over an immutable R-tree.
///
/// Built once and never mutated, so concurrent queries need no locking.
pub struct RTreeDatabase {
    tree: RTree<IndexedFeature>,
}

impl RTreeDatabase {
    /// Build spatial index from place features
    pub fn build(features: Vec<SpatialFeature>) -> Self {
        info!("Building spatial index for {} features...", features.len());

        for (placetype, count) in count_by_placetype(&features) {
            info!("  {}: {} features", placetype, count);
        }

        let indexed: Vec<IndexedFeature> = features
            .into_iter()
            .filter_map(IndexedFeature::new)
            .collect();

        let tree = RTree::bulk_load(indexed);

        info!("Spatial index built with {} entries", tree.size());

        Self { tree }
    }

    /// Build from a GeoJSON `FeatureCollection` string
    pub fn from_geojson(json: &str) -> Result<Self, DatabaseError> {
        Ok(Self::build(parse_feature_collection(json)?))
    }

    /// Build from a GeoJSON `FeatureCollection` file
    pub async fn from_path(path: &Path) -> Result<Self, DatabaseError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DatabaseError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_geojson(&json)
    }

    /// Find all features whose geometry contains the coordinate.
    ///
    /// Points on a boundary count as contained.
    fn lookup(&self, coord: Coordinate) -> Vec<&Arc<SpatialFeature>> {
        let point = coord.to_point();
        let query_envelope = AABB::from_point([coord.longitude(), coord.latitude()]);

        // R-tree candidates by envelope, then exact containment
        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ib| ib.feature.geometry.intersects(&point))
            .map(|ib| &ib.feature)
            .collect()
    }

    /// Get total number of indexed features
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[async_trait]
impl SpatialDatabase for RTreeDatabase {
    fn name(&self) -> &str {
        "rtree"
    }

    async fn point_in_polygon(
        &self,
        coord: Coordinate,
        filter: &QueryFilter,
    ) -> Result<Vec<PlaceRecord>, DatabaseError> {
        let mut matches: Vec<&Arc<SpatialFeature>> = self
            .lookup(coord)
            .into_iter()
            .filter(|f| filter.matches(&f.record))
            .collect();

        // Coarsest placetype first, then by id
        matches.sort_by_key(|f| (f.record.placetype, f.record.id, f.record.alt_label.clone()));

        debug!(
            "PIP lookup at {}: found {} features after filtering",
            coord,
            matches.len()
        );

        let records = matches
            .into_iter()
            .map(|f| {
                let mut record = f.record.clone();
                f.project(&mut record, filter.properties());
                record
            })
            .collect();

        Ok(records)
    }
}
