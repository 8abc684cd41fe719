//! Directional attribute resolver
//!
//! Turns the undirected edge table into directed links with one lane count
//! and one set of access flags per direction. Stages run in a fixed order:
//!
//! 1. drop self-loops and collapse list-valued `oneway`
//! 2. pair list-valued `reversed` rows ([`pairing`])
//! 3. classify `highway` ([`crate::highway`]) and normalize lane tags ([`normalize`])
//! 4. join directions and apply tag priority ([`join`])
//! 5. emit one link per direction, synthesizing the reverse of lone two-way rows
//! 6. fill remaining lane counts through the fallback tiers ([`fallback`])
//! 7. derive bus and managed-lane fields

pub mod fallback;
pub mod join;
pub mod normalize;
pub mod pairing;

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::highway::{classify, Classification};
use crate::table::{DirectedLink, EdgeRecord, LaneAccess, OneOrMany};
use fallback::default_tiers;
use join::{join_directions, DirectionPair, LaneLookup};
use normalize::NormalizedLanes;
use pairing::{collapse_oneway, disambiguate_reversed, is_reversed};

pub use pairing::PairingStats;

const SAMPLE_ROWS: usize = 5;

/// Resolver options
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Endpoint pair whose rows are logged after each stage, in either direction
    pub trace: Option<(i64, i64)>,
}

impl ResolveOptions {
    fn traces(&self, a: i64, b: i64) -> bool {
        self.trace
            .is_some_and(|(x, y)| (a, b) == (x, y) || (a, b) == (y, x))
    }
}

/// A directed link whose lane fields are still being resolved
#[derive(Debug, Clone)]
pub struct PendingLink {
    pub link: DirectedLink,
    pub lanes: Option<u32>,
    pub buslanes: Option<u32>,
}

/// Counters reported by the resolver
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveStats {
    pub input_edges: usize,
    pub self_loops_dropped: usize,
    pub oneway_lists_collapsed: usize,
    pub reversed_list_valued: usize,
    pub reversed_paired: usize,
    pub reversed_unpaired: usize,
    pub unrecognized_highway: usize,
    /// Ways present in both directions
    pub pairs_both: usize,
    /// Ways present as a single row
    pub pairs_single: usize,
    /// Reverse links created for lone two-way rows
    pub synthesized_reverse: usize,
    pub lanes_from_tags: usize,
    pub lanes_by_tier: BTreeMap<&'static str, usize>,
    pub bus_only_links: usize,
    pub managed_bus_lanes: usize,
    pub output_links: usize,
}

/// Output of [`resolve_directed_links`]
#[derive(Debug, Clone)]
pub struct Resolution {
    pub links: Vec<DirectedLink>,
    pub stats: ResolveStats,
}

fn flag(value: &OneOrMany<bool>) -> bool {
    value.as_slice().iter().any(|f| *f)
}

fn directed_link(edge: &EdgeRecord, class: &Classification, lanes_orig: Option<u32>) -> DirectedLink {
    DirectedLink {
        a: edge.a,
        b: edge.b,
        key: edge.key,
        highway: class.highway.clone(),
        highway_orig: class.highway_orig.clone(),
        steps: class.steps,
        oneway: flag(&edge.oneway),
        reversed: is_reversed(edge),
        lanes_orig,
        lanes: 0,
        buslanes: 0,
        access: LaneAccess::Any,
        ml_access: LaneAccess::Any,
        ml_lanes: 0,
        drive_access: class.access.drive,
        bike_access: class.access.bike,
        walk_access: class.access.walk,
        truck_access: class.access.truck,
        bus_access: class.access.bus,
        name: edge.name.clone(),
        county: edge.county,
        model_link_id: None,
        geometry: edge.geometry.clone(),
        extra: edge.extra.clone(),
    }
}

/// Same link, traversed the other way
fn reverse_link(link: &DirectedLink) -> DirectedLink {
    let mut rev = link.clone();
    rev.a = link.b;
    rev.b = link.a;
    rev.reversed = !link.reversed;
    rev.geometry.0.reverse();
    rev
}

fn pending(link: DirectedLink, lookup: &LaneLookup) -> PendingLink {
    let resolved = lookup.get(&link.edge_key());
    let (lanes, buslanes) = if link.highway == "busway" {
        (Some(0), Some(1))
    } else {
        (resolved.lanes, resolved.buslanes)
    };
    PendingLink {
        link,
        lanes,
        buslanes,
    }
}

fn finalize(pending: PendingLink, stats: &mut ResolveStats) -> DirectedLink {
    let PendingLink {
        mut link,
        lanes,
        buslanes,
    } = pending;
    link.lanes = lanes.unwrap_or(1);
    link.buslanes = buslanes.unwrap_or(0);

    if link.buslanes > 0 {
        if link.lanes > 0 {
            link.ml_access = LaneAccess::Bus;
            link.ml_lanes = link.buslanes;
            stats.managed_bus_lanes += 1;
        } else {
            link.access = LaneAccess::Bus;
            link.lanes = link.buslanes;
            stats.bus_only_links += 1;
        }
    }
    link
}

fn trace_edges(options: &ResolveOptions, stage: &str, edges: &[EdgeRecord]) {
    if options.trace.is_none() {
        return;
    }
    for edge in edges.iter().filter(|e| options.traces(e.a, e.b)) {
        tracing::debug!(
            stage,
            key = %edge.edge_key(),
            highway = ?edge.highway,
            oneway = ?edge.oneway,
            reversed = ?edge.reversed,
            lanes = ?edge.lanes,
            "trace edge"
        );
    }
}

fn trace_links(options: &ResolveOptions, stage: &str, links: &[PendingLink]) {
    if options.trace.is_none() {
        return;
    }
    for p in links.iter().filter(|p| options.traces(p.link.a, p.link.b)) {
        tracing::debug!(
            stage,
            key = %p.link.edge_key(),
            highway = %p.link.highway,
            reversed = p.link.reversed,
            lanes = ?p.lanes,
            buslanes = ?p.buslanes,
            "trace link"
        );
    }
}

/// Resolve undirected edges into directed links.
///
/// Fails only when the direction join finds duplicated directed edges.
/// Every other ambiguity is settled by heuristics and logged.
pub fn resolve_directed_links(mut edges: Vec<EdgeRecord>, options: &ResolveOptions) -> Result<Resolution> {
    let mut stats = ResolveStats {
        input_edges: edges.len(),
        ..Default::default()
    };

    edges.retain(|e| e.a != e.b);
    stats.self_loops_dropped = stats.input_edges - edges.len();
    if stats.self_loops_dropped > 0 {
        tracing::info!(count = stats.self_loops_dropped, "dropped self-loop edges");
    }

    stats.oneway_lists_collapsed = collapse_oneway(&mut edges);
    let pairing = disambiguate_reversed(&mut edges);
    stats.reversed_list_valued = pairing.list_valued;
    stats.reversed_paired = pairing.paired;
    stats.reversed_unpaired = pairing.unpaired;
    if pairing.unpaired > 0 {
        tracing::warn!(
            count = pairing.unpaired,
            samples = ?pairing.unpaired_samples,
            "list-valued reversed rows without a sibling defaulted to reversed=false"
        );
    }
    trace_edges(options, "pairing", &edges);

    let classes: Vec<Classification> = edges.iter().map(|e| classify(&e.highway)).collect();
    let unrecognized: Vec<&str> = classes
        .iter()
        .filter(|c| !c.recognized)
        .map(|c| c.highway_orig.as_str())
        .collect();
    stats.unrecognized_highway = unrecognized.len();
    if !unrecognized.is_empty() {
        tracing::warn!(
            count = unrecognized.len(),
            samples = ?&unrecognized[..unrecognized.len().min(SAMPLE_ROWS)],
            "highway tags with no recognized classification kept their raw value"
        );
    }

    let norms: Vec<NormalizedLanes> = edges.iter().map(NormalizedLanes::from_edge).collect();
    let pairs = join_directions(&edges)?;
    let lookup = LaneLookup::build(&pairs, &edges, &norms);

    let mut keys: FxHashSet<_> = edges.iter().map(EdgeRecord::edge_key).collect();
    let mut links: Vec<PendingLink> = Vec::with_capacity(edges.len() * 2);
    let link_for = |idx: usize| directed_link(&edges[idx], &classes[idx], norms[idx].lanes_orig);

    for pair in pairs {
        match pair {
            DirectionPair::Both { forward, backward } => {
                stats.pairs_both += 1;
                links.push(pending(link_for(forward), &lookup));
                links.push(pending(link_for(backward), &lookup));
            }
            DirectionPair::Forward(idx) | DirectionPair::Backward(idx) => {
                stats.pairs_single += 1;
                let link = link_for(idx);
                let two_way = !link.oneway;
                let rev = two_way.then(|| reverse_link(&link));
                links.push(pending(link, &lookup));

                if let Some(rev) = rev {
                    if keys.insert(rev.edge_key()) {
                        stats.synthesized_reverse += 1;
                        links.push(pending(rev, &lookup));
                    } else {
                        tracing::debug!(key = %rev.edge_key(), "reverse link already present; not synthesized");
                    }
                }
            }
        }
    }
    trace_links(options, "join", &links);

    stats.lanes_from_tags = links.iter().filter(|p| p.lanes.is_some()).count();
    for tier in default_tiers() {
        let filled = tier.fill(&mut links);
        stats.lanes_by_tier.insert(tier.name(), filled);
        trace_links(options, tier.name(), &links);
    }

    let links: Vec<DirectedLink> = links.into_iter().map(|p| finalize(p, &mut stats)).collect();

    let mut seen = FxHashSet::default();
    for link in &links {
        if !seen.insert(link.edge_key()) {
            return Err(Error::DuplicateDirectedEdge {
                key: link.edge_key(),
                side: "output",
            });
        }
    }

    stats.output_links = links.len();
    tracing::info!(
        edges = stats.input_edges,
        links = stats.output_links,
        from_tags = stats.lanes_from_tags,
        "resolved directed links"
    );
    Ok(Resolution { links, stats })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::table::{EdgeKey, LaneValue};
    use geo::LineString;

    pub(crate) fn edge(a: i64, b: i64, highway: &str) -> EdgeRecord {
        EdgeRecord {
            a,
            b,
            key: 0,
            highway: OneOrMany::One(highway.to_string()),
            oneway: OneOrMany::One(false),
            reversed: OneOrMany::One(false),
            lanes: None,
            lanes_forward: None,
            lanes_backward: None,
            lanes_both_ways: None,
            lanes_bus: None,
            lanes_bus_forward: None,
            lanes_bus_backward: None,
            name: None,
            county: None,
            geometry: LineString::from(vec![(a as f64, 0.0), (b as f64, 0.0)]),
            extra: BTreeMap::new(),
        }
    }

    pub(crate) fn pending(a: i64, b: i64, highway: &str, lanes: Option<u32>) -> PendingLink {
        let e = edge(a, b, highway);
        PendingLink {
            link: directed_link(&e, &classify(&e.highway), None),
            lanes,
            buslanes: None,
        }
    }

    fn resolve(edges: Vec<EdgeRecord>) -> Resolution {
        resolve_directed_links(edges, &ResolveOptions::default()).unwrap()
    }

    fn find(links: &[DirectedLink], a: i64, b: i64) -> &DirectedLink {
        links.iter().find(|l| (l.a, l.b) == (a, b)).unwrap()
    }

    #[test]
    fn ambiguous_pair_resolves_per_direction() {
        let tags = OneOrMany::Many(vec!["residential".to_string(), "service".to_string()]);
        let list = OneOrMany::Many(vec![false, true]);
        let mut ab = edge(1, 2, "residential");
        ab.highway = tags.clone();
        ab.reversed = list.clone();
        ab.lanes_forward = Some(LaneValue::Int(2));
        ab.lanes_backward = Some(LaneValue::Int(1));
        let mut ba = ab.clone();
        ba.a = 2;
        ba.b = 1;
        ba.reversed = list;

        let out = resolve(vec![ab, ba]);
        assert_eq!(out.links.len(), 2);
        let fwd = find(&out.links, 1, 2);
        let bwd = find(&out.links, 2, 1);
        assert_eq!((fwd.lanes, fwd.highway.as_str()), (2, "residential"));
        assert_eq!((bwd.lanes, bwd.highway.as_str()), (1, "residential"));
        assert!(!fwd.reversed);
        assert!(bwd.reversed);
        assert_eq!(out.stats.reversed_paired, 1);
    }

    #[test]
    fn oneway_row_yields_single_link() {
        let mut e = edge(1, 2, "primary");
        e.oneway = OneOrMany::One(true);
        e.lanes = Some(LaneValue::Text("3".into()));
        let out = resolve(vec![e]);
        assert_eq!(out.links.len(), 1);
        assert_eq!(out.links[0].lanes, 3);
        assert_eq!(out.links[0].lanes_orig, Some(3));
    }

    #[test]
    fn lone_two_way_row_gets_reverse_link() {
        let mut e = edge(1, 2, "secondary");
        e.lanes_forward = Some(LaneValue::Int(2));
        e.lanes_backward = Some(LaneValue::Int(1));
        let out = resolve(vec![e]);
        assert_eq!(out.stats.synthesized_reverse, 1);
        let rev = find(&out.links, 2, 1);
        assert_eq!(rev.lanes, 1);
        assert!(rev.reversed);
        assert_eq!(rev.geometry, LineString::from(vec![(2.0, 0.0), (1.0, 0.0)]));
        assert_eq!(find(&out.links, 1, 2).lanes, 2);
    }

    #[test]
    fn link_count_matches_oneway_and_twoway_ways() {
        let mut oneway = edge(10, 11, "primary");
        oneway.oneway = OneOrMany::One(true);
        let mut back = edge(2, 1, "residential");
        back.reversed = OneOrMany::One(true);
        let edges = vec![oneway, edge(1, 2, "residential"), back, edge(20, 21, "service")];
        let out = resolve(edges);
        // one oneway, two two-way ways
        assert_eq!(out.links.len(), 1 + 2 * 2);
        assert_eq!(out.stats.pairs_both, 1);
        assert_eq!(out.stats.pairs_single, 2);
    }

    #[test]
    fn self_loops_are_dropped() {
        let out = resolve(vec![edge(4, 4, "service"), edge(4, 5, "service")]);
        assert_eq!(out.stats.self_loops_dropped, 1);
        assert!(out.links.iter().all(|l| l.a != l.b));
    }

    #[test]
    fn unresolved_lanes_fall_back() {
        let mut tagged = edge(1, 2, "tertiary");
        tagged.oneway = OneOrMany::One(true);
        tagged.lanes = Some(LaneValue::Int(2));
        let mut untagged = edge(3, 4, "tertiary");
        untagged.oneway = OneOrMany::One(true);
        let mut unknown = edge(5, 6, "construction");
        unknown.oneway = OneOrMany::One(true);

        let out = resolve(vec![tagged, untagged, unknown]);
        assert_eq!(find(&out.links, 3, 4).lanes, 2);
        assert_eq!(find(&out.links, 5, 6).lanes, 1);
        assert_eq!(out.stats.lanes_by_tier.get("highway_mode"), Some(&1));
        assert_eq!(out.stats.lanes_by_tier.get("last_resort"), Some(&1));
        assert_eq!(out.stats.unrecognized_highway, 1);
    }

    #[test]
    fn busway_is_bus_only_lane() {
        let mut e = edge(1, 2, "busway");
        e.oneway = OneOrMany::One(true);
        let out = resolve(vec![e]);
        let link = &out.links[0];
        assert_eq!(link.buslanes, 1);
        assert_eq!(link.access, LaneAccess::Bus);
        assert_eq!(link.lanes, 1);
        assert!(!link.drive_access);
    }

    #[test]
    fn bus_lane_beside_general_lanes_is_managed() {
        let mut e = edge(1, 2, "primary");
        e.oneway = OneOrMany::One(true);
        e.lanes = Some(LaneValue::Int(3));
        e.lanes_bus = Some(LaneValue::Int(1));
        let out = resolve(vec![e]);
        let link = &out.links[0];
        assert_eq!(link.lanes, 3);
        assert_eq!(link.ml_access, LaneAccess::Bus);
        assert_eq!(link.ml_lanes, 1);
        assert_eq!(link.access, LaneAccess::Any);
    }

    #[test]
    fn duplicate_edges_are_fatal() {
        let err = resolve_directed_links(
            vec![edge(1, 2, "primary"), edge(1, 2, "primary")],
            &ResolveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateDirectedEdge { .. }));
    }

    #[test]
    fn directed_keys_are_unique() {
        let mut back = edge(2, 1, "service");
        back.reversed = OneOrMany::One(true);
        let out = resolve(vec![edge(1, 2, "service"), back, edge(2, 3, "service")]);
        let keys: FxHashSet<EdgeKey> = out.links.iter().map(|l| l.edge_key()).collect();
        assert_eq!(keys.len(), out.links.len());
    }

    #[test]
    fn trace_option_matches_either_direction() {
        let options = ResolveOptions { trace: Some((1, 2)) };
        assert!(options.traces(1, 2));
        assert!(options.traces(2, 1));
        assert!(!options.traces(1, 3));
    }
}
