//! Fallback tiers for links whose tags left the lane count unresolved
//!
//! Tiers run in order and each only touches links that are still `None`.

use std::collections::BTreeMap;

use super::PendingLink;

/// Sample rows included in data-quality warnings
const SAMPLE_ROWS: usize = 5;

/// Lanes per classification when nothing was observed for it
pub const LANE_FALLBACK: [(&str, u32); 19] = [
    ("motorway", 3),
    ("motorway_link", 1),
    ("trunk", 2),
    ("trunk_link", 1),
    ("primary", 2),
    ("primary_link", 1),
    ("secondary", 2),
    ("secondary_link", 1),
    ("tertiary", 1),
    ("tertiary_link", 1),
    ("busway", 0),
    ("unclassified", 1),
    ("residential", 1),
    ("living_street", 1),
    ("service", 1),
    ("track", 1),
    ("path", 0),
    ("footway", 0),
    ("cycleway", 0),
];

/// One step of the fallback chain
pub trait LaneTier {
    fn name(&self) -> &'static str;

    /// Fill unresolved links, returning how many were filled
    fn fill(&self, links: &mut [PendingLink]) -> usize;
}

/// Most common observed lane count per classification
pub struct HighwayMode;

impl HighwayMode {
    fn modes(links: &[PendingLink]) -> BTreeMap<&str, u32> {
        let mut counts: BTreeMap<&str, BTreeMap<u32, usize>> = BTreeMap::new();
        for pending in links {
            if let Some(lanes) = pending.lanes.filter(|n| *n > 0) {
                *counts
                    .entry(pending.link.highway.as_str())
                    .or_default()
                    .entry(lanes)
                    .or_default() += 1;
            }
        }
        counts
            .into_iter()
            .filter_map(|(highway, histogram)| {
                // ascending iteration plus strict `>` keeps the smaller count on ties
                let mut best: Option<(u32, usize)> = None;
                for (lanes, n) in histogram {
                    if best.map_or(true, |(_, m)| n > m) {
                        best = Some((lanes, n));
                    }
                }
                best.map(|(lanes, _)| (highway, lanes))
            })
            .collect()
    }
}

impl LaneTier for HighwayMode {
    fn name(&self) -> &'static str {
        "highway_mode"
    }

    fn fill(&self, links: &mut [PendingLink]) -> usize {
        let modes: BTreeMap<String, u32> = Self::modes(links)
            .into_iter()
            .map(|(h, n)| (h.to_string(), n))
            .collect();

        let mut filled = 0;
        for pending in links.iter_mut().filter(|p| p.lanes.is_none()) {
            let highway = pending.link.highway.as_str();
            let lanes = if matches!(highway, "footway" | "cycleway") {
                Some(0)
            } else {
                modes.get(highway).copied()
            };
            if lanes.is_some() {
                pending.lanes = lanes;
                filled += 1;
            }
        }
        filled
    }
}

/// Fixed per-classification defaults
pub struct StaticTable;

impl LaneTier for StaticTable {
    fn name(&self) -> &'static str {
        "static_table"
    }

    fn fill(&self, links: &mut [PendingLink]) -> usize {
        let mut filled = 0;
        for pending in links.iter_mut().filter(|p| p.lanes.is_none()) {
            let hit = LANE_FALLBACK
                .iter()
                .find(|(highway, _)| *highway == pending.link.highway)
                .map(|(_, lanes)| *lanes);
            if hit.is_some() {
                pending.lanes = hit;
                filled += 1;
            }
        }
        filled
    }
}

/// One lane for anything left, with a warning
pub struct LastResort;

impl LaneTier for LastResort {
    fn name(&self) -> &'static str {
        "last_resort"
    }

    fn fill(&self, links: &mut [PendingLink]) -> usize {
        let mut samples = Vec::new();
        let mut filled = 0;
        for pending in links.iter_mut().filter(|p| p.lanes.is_none()) {
            if samples.len() < SAMPLE_ROWS {
                samples.push(format!(
                    "{} highway={}",
                    pending.link.edge_key(),
                    pending.link.highway
                ));
            }
            pending.lanes = Some(1);
            filled += 1;
        }
        if filled > 0 {
            tracing::warn!(
                count = filled,
                samples = ?samples,
                "lane count unresolved by tags and fallback table; assigned 1 lane"
            );
        }
        filled
    }
}

/// The fallback chain in the order it is applied
pub fn default_tiers() -> Vec<Box<dyn LaneTier>> {
    vec![Box::new(HighwayMode), Box::new(StaticTable), Box::new(LastResort)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lanes::tests::pending;

    #[test]
    fn mode_fills_matching_classification() {
        let mut links = vec![
            pending(1, 2, "primary", Some(2)),
            pending(2, 3, "primary", Some(2)),
            pending(3, 4, "primary", Some(3)),
            pending(4, 5, "primary", None),
            pending(5, 6, "secondary", None),
        ];
        assert_eq!(HighwayMode.fill(&mut links), 1);
        assert_eq!(links[3].lanes, Some(2));
        assert_eq!(links[4].lanes, None);
    }

    #[test]
    fn mode_ties_pick_smaller_count() {
        let mut links = vec![
            pending(1, 2, "tertiary", Some(3)),
            pending(2, 3, "tertiary", Some(1)),
            pending(3, 4, "tertiary", None),
        ];
        HighwayMode.fill(&mut links);
        assert_eq!(links[2].lanes, Some(1));
    }

    #[test]
    fn mode_ignores_zero_lane_observations() {
        let mut links = vec![
            pending(1, 2, "service", Some(0)),
            pending(2, 3, "service", None),
        ];
        assert_eq!(HighwayMode.fill(&mut links), 0);
        assert_eq!(links[1].lanes, None);
    }

    #[test]
    fn non_vehicle_ways_get_zero_lanes() {
        let mut links = vec![pending(1, 2, "footway", None), pending(2, 3, "cycleway", None)];
        assert_eq!(HighwayMode.fill(&mut links), 2);
        assert!(links.iter().all(|p| p.lanes == Some(0)));
    }

    #[test]
    fn static_table_covers_known_classes_only() {
        let mut links = vec![
            pending(1, 2, "motorway", None),
            pending(2, 3, "construction", None),
            pending(3, 4, "residential", Some(2)),
        ];
        assert_eq!(StaticTable.fill(&mut links), 1);
        assert_eq!(links[0].lanes, Some(3));
        assert_eq!(links[1].lanes, None);
        assert_eq!(links[2].lanes, Some(2));
    }

    #[test]
    fn chain_leaves_nothing_unresolved() {
        let mut links = vec![
            pending(1, 2, "construction", None),
            pending(2, 3, "trunk", None),
        ];
        let filled: Vec<usize> = default_tiers().iter().map(|t| t.fill(&mut links)).collect();
        assert_eq!(filled, vec![0, 1, 1]);
        assert_eq!(links[0].lanes, Some(1));
        assert_eq!(links[1].lanes, Some(2));
    }
}
