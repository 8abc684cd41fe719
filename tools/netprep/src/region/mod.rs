//! Region reference data and spatial lookup
//!
//! Region boundaries are indexed by bounding box in an R-tree; exact `geo`
//! predicates run only against the boxes the tree returns.

pub mod assign;
pub mod tiebreak;

use std::path::Path;

use geo::{BoundingRect, ConvexHull, Contains, Intersects, LineString, MultiPolygon, Point, Polygon};
use netprep_common::County;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::read_table;

pub use assign::{assign_regions, AssignStats, AssignmentOutcome};

/// One county boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub county: County,
    pub boundary: MultiPolygon<f64>,
}

type RegionEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Loaded regions plus their coverage hull and bounding-box index
pub struct RegionSet {
    regions: Vec<Region>,
    coverage: Polygon<f64>,
    index: RTree<RegionEnvelope>,
}

impl RegionSet {
    pub fn new(regions: Vec<Region>) -> Self {
        let all_polygons: MultiPolygon<f64> = MultiPolygon::new(
            regions
                .iter()
                .flat_map(|r| r.boundary.0.iter().cloned())
                .collect(),
        );
        let coverage = all_polygons.convex_hull();

        let envelopes: Vec<RegionEnvelope> = regions
            .iter()
            .enumerate()
            .filter_map(|(idx, region)| {
                let rect = region.boundary.bounding_rect()?;
                Some(GeomWithData::new(
                    Rectangle::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    idx,
                ))
            })
            .collect();

        Self {
            regions,
            coverage,
            index: RTree::bulk_load(envelopes),
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, idx: usize) -> &Region {
        &self.regions[idx]
    }

    /// Convex hull of every region polygon
    pub fn coverage(&self) -> &Polygon<f64> {
        &self.coverage
    }

    pub fn covers(&self, line: &LineString<f64>) -> bool {
        self.coverage.intersects(line)
    }

    /// Regions whose boundary intersects the line, in region order
    pub fn intersecting(&self, line: &LineString<f64>) -> Vec<usize> {
        let Some(rect) = line.bounding_rect() else {
            return Vec::new();
        };
        let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        let mut hits: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .filter(|&idx| self.regions[idx].boundary.intersects(line))
            .collect();
        hits.sort_unstable();
        hits
    }

    /// County whose boundary contains the point; lowest county wins on overlap
    pub fn containing(&self, point: Point<f64>) -> Option<County> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        self.index
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| &self.regions[entry.data])
            .filter(|region| region.boundary.contains(&point))
            .map(|region| region.county)
            .min()
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> Error {
    Error::InvalidRegions {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Load region boundaries from a JSON array of `{county, boundary}` records
pub fn load_regions<P: AsRef<Path>>(path: P) -> Result<RegionSet> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::MissingRegions(path.to_path_buf()));
    }

    let regions: Vec<Region> = read_table(path)?;
    if regions.is_empty() {
        return Err(invalid(path, "no regions"));
    }

    let mut seen = Vec::with_capacity(regions.len());
    for region in &regions {
        if region.county.is_external() {
            return Err(invalid(path, "External is a sentinel, not a region"));
        }
        if seen.contains(&region.county) {
            return Err(invalid(path, format!("{} appears more than once", region.county)));
        }
        if region.boundary.0.is_empty() {
            return Err(invalid(path, format!("{} has an empty boundary", region.county)));
        }
        seen.push(region.county);
    }

    if seen.len() < County::NAMED.len() {
        tracing::info!(
            loaded = seen.len(),
            expected = County::NAMED.len(),
            "region file covers a subset of counties"
        );
    }

    Ok(RegionSet::new(regions))
}
