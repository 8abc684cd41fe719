//! Lane tag normalization
//!
//! OSM lane tags arrive as integers, numeric strings, or lists when several
//! source ways disagree. Two-element lists resolve to the minimum, longer
//! lists to the median. Anything non-numeric or negative is treated as absent.

use crate::table::{EdgeRecord, LaneValue};

fn scalar_count(value: &LaneValue) -> Option<u32> {
    let count = match value {
        LaneValue::Int(n) => *n as f64,
        LaneValue::Float(f) => *f,
        LaneValue::Text(s) => s.trim().parse::<f64>().ok()?,
        LaneValue::List(_) => return None,
    };
    // "1.5" happens in the wild; truncate like an integer cast
    if count.is_finite() && count >= 0.0 && count <= u32::MAX as f64 {
        Some(count.trunc() as u32)
    } else {
        None
    }
}

fn median(mut counts: Vec<u32>) -> u32 {
    counts.sort_unstable();
    let mid = counts.len() / 2;
    if counts.len() % 2 == 1 {
        counts[mid]
    } else {
        ((counts[mid - 1] as u64 + counts[mid] as u64) / 2) as u32
    }
}

/// Collapse a raw lane tag to a single count
pub fn min_or_median(value: &LaneValue) -> Option<u32> {
    match value {
        LaneValue::List(items) => {
            let counts: Vec<u32> = items.iter().filter_map(scalar_count).collect();
            match counts.len() {
                0 => None,
                2 => counts.iter().copied().min(),
                _ => Some(median(counts)),
            }
        }
        scalar => scalar_count(scalar),
    }
}

/// Every lane-bearing column of an edge, normalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizedLanes {
    /// The raw `lanes` tag; may count both directions
    pub lanes_orig: Option<u32>,
    pub forward: Option<u32>,
    pub backward: Option<u32>,
    pub both_ways: Option<u32>,
    pub bus: Option<u32>,
    pub bus_forward: Option<u32>,
    pub bus_backward: Option<u32>,
}

impl NormalizedLanes {
    pub fn from_edge(edge: &EdgeRecord) -> Self {
        let norm = |v: &Option<LaneValue>| v.as_ref().and_then(min_or_median);
        Self {
            lanes_orig: norm(&edge.lanes),
            forward: norm(&edge.lanes_forward),
            backward: norm(&edge.lanes_backward),
            both_ways: norm(&edge.lanes_both_ways),
            bus: norm(&edge.lanes_bus),
            bus_forward: norm(&edge.lanes_bus_forward),
            bus_backward: norm(&edge.lanes_bus_backward),
        }
    }

    /// Lanes in the digitized direction: forward, then both-ways, then total
    pub fn forward_lanes(&self) -> Option<u32> {
        self.forward.or(self.both_ways).or(self.lanes_orig)
    }

    /// Lanes against the digitized direction: backward, then both-ways, then total
    pub fn backward_lanes(&self) -> Option<u32> {
        self.backward.or(self.both_ways).or(self.lanes_orig)
    }

    pub fn forward_buslanes(&self) -> Option<u32> {
        self.bus_forward.or(self.bus)
    }

    pub fn backward_buslanes(&self) -> Option<u32> {
        self.bus_backward.or(self.bus)
    }
}
