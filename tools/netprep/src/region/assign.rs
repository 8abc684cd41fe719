//! County assignment for links and nodes
//!
//! Links outside the coverage hull are dropped, then nodes not referenced by
//! a surviving link. After that filter the row counts are fixed: every later
//! step labels rows in place and the counts are re-checked at the end.

use std::collections::BTreeMap;

use geo::Point;
use netprep_common::County;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use super::tiebreak::{break_ties, intersection_length, Candidate};
use super::RegionSet;
use crate::error::{Error, Result};
use crate::table::{DirectedLink, EdgeKey, NodeRecord};

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssignStats {
    pub input_links: usize,
    pub input_nodes: usize,
    pub links_outside_coverage: usize,
    pub nodes_unreferenced: usize,
    pub links_preserved: usize,
    pub nodes_preserved: usize,
    pub links_multi_region: usize,
    pub link_counties: BTreeMap<County, usize>,
    pub node_counties: BTreeMap<County, usize>,
}

#[derive(Debug, Clone)]
pub struct AssignmentOutcome {
    pub links: Vec<DirectedLink>,
    pub nodes: Vec<NodeRecord>,
    pub stats: AssignStats,
}

fn ensure_count(table: &'static str, stage: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::RowCountDrift {
            table,
            stage,
            expected,
            actual,
        })
    }
}

fn assign_nodes(nodes: &mut [NodeRecord], regions: &RegionSet, stats: &mut AssignStats) {
    for node in nodes.iter_mut() {
        let joined = regions
            .containing(Point::new(node.x, node.y))
            .unwrap_or(County::External);
        match node.county {
            Some(_) => stats.nodes_preserved += 1,
            None => node.county = Some(joined),
        }
    }
}

/// Resolve the county of every unlabelled link; multi-region links go through the tie-break
fn link_counties(links: &[DirectedLink], regions: &RegionSet, stats: &mut AssignStats) -> Result<FxHashMap<EdgeKey, County>> {
    let mut resolved: FxHashMap<EdgeKey, County> = FxHashMap::default();
    let mut contested: Vec<Candidate> = Vec::new();

    for link in links.iter().filter(|l| l.county.is_none()) {
        let key = link.edge_key();
        let hits = regions.intersecting(&link.geometry);
        match hits.as_slice() {
            [] => {
                resolved.insert(key, County::External);
            }
            [only] => {
                resolved.insert(key, regions.region(*only).county);
            }
            several => {
                stats.links_multi_region += 1;
                contested.extend(several.iter().map(|&idx| {
                    let region = regions.region(idx);
                    Candidate {
                        key,
                        county: region.county,
                        length: intersection_length(&link.geometry, &region.boundary),
                    }
                }));
            }
        }
    }

    let kept = break_ties(contested);
    let mut rows_per_link: FxHashMap<EdgeKey, usize> = FxHashMap::default();
    for row in &kept {
        *rows_per_link.entry(row.key).or_default() += 1;
    }
    if let Some((key, count)) = rows_per_link.into_iter().find(|(_, n)| *n > 1) {
        return Err(Error::ResidualMultiRegion { key, count });
    }
    resolved.extend(kept.into_iter().map(|c| (c.key, c.county)));

    Ok(resolved)
}

/// Label every link and node with exactly one county.
///
/// Counties already present on a row are kept. Nodes are matched by
/// containment, links by intersection with the longest-overlap tie-break.
pub fn assign_regions(
    mut links: Vec<DirectedLink>,
    mut nodes: Vec<NodeRecord>,
    regions: &RegionSet,
) -> Result<AssignmentOutcome> {
    let mut stats = AssignStats {
        input_links: links.len(),
        input_nodes: nodes.len(),
        ..Default::default()
    };

    links.retain(|l| regions.covers(&l.geometry));
    stats.links_outside_coverage = stats.input_links - links.len();

    let referenced: FxHashSet<i64> = links.iter().flat_map(|l| [l.a, l.b]).collect();
    nodes.retain(|n| referenced.contains(&n.id));
    stats.nodes_unreferenced = stats.input_nodes - nodes.len();

    let expected_links = links.len();
    let expected_nodes = nodes.len();
    tracing::info!(
        links = expected_links,
        nodes = expected_nodes,
        dropped_links = stats.links_outside_coverage,
        dropped_nodes = stats.nodes_unreferenced,
        "filtered to region coverage"
    );

    assign_nodes(&mut nodes, regions, &mut stats);

    let counties = link_counties(&links, regions, &mut stats)?;
    for link in links.iter_mut() {
        if link.county.is_some() {
            stats.links_preserved += 1;
        } else {
            link.county = Some(counties.get(&link.edge_key()).copied().unwrap_or(County::External));
        }
    }

    ensure_count("links", "region assignment", expected_links, links.len())?;
    ensure_count("nodes", "region assignment", expected_nodes, nodes.len())?;

    for county in links.iter().filter_map(|l| l.county) {
        *stats.link_counties.entry(county).or_default() += 1;
    }
    for county in nodes.iter().filter_map(|n| n.county) {
        *stats.node_counties.entry(county).or_default() += 1;
    }

    if stats.links_multi_region > 0 {
        tracing::info!(count = stats.links_multi_region, "boundary-crossing links resolved by overlap length");
    }

    Ok(AssignmentOutcome { links, nodes, stats })
}
