//! Direction join and per-direction tag priority
//!
//! Not-reversed rows are matched to reversed rows on `(A, B, key)` against
//! `(B, A, key)`. Each side must be unique on its join key, otherwise the
//! input carries duplicated directed edges and the join is refused.

use rustc_hash::{FxHashMap, FxHashSet};

use super::normalize::NormalizedLanes;
use super::pairing::is_reversed;
use crate::error::{Error, Result};
use crate::table::{EdgeKey, EdgeRecord};

/// Rows of one undirected way, by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionPair {
    /// Both directions present: the not-reversed row and its reversed sibling
    Both { forward: usize, backward: usize },
    /// Only the not-reversed row
    Forward(usize),
    /// Only a reversed row
    Backward(usize),
}

impl DirectionPair {
    /// Key of the way in its digitized direction
    pub fn forward_key(self, edges: &[EdgeRecord]) -> EdgeKey {
        match self {
            DirectionPair::Both { forward, .. } | DirectionPair::Forward(forward) => {
                edges[forward].edge_key()
            }
            DirectionPair::Backward(backward) => edges[backward].edge_key().reversed(),
        }
    }
}

/// Join not-reversed rows to their reversed siblings.
///
/// Pairs come out in row order of their not-reversed row; reversed rows
/// with no partner are appended in row order.
pub fn join_directions(edges: &[EdgeRecord]) -> Result<Vec<DirectionPair>> {
    let mut pairs = Vec::with_capacity(edges.len());
    let mut slots: FxHashMap<EdgeKey, usize> = FxHashMap::default();

    for (idx, edge) in edges.iter().enumerate() {
        if is_reversed(edge) {
            continue;
        }
        let key = edge.edge_key();
        if slots.insert(key, pairs.len()).is_some() {
            return Err(Error::DuplicateDirectedEdge {
                key,
                side: "not-reversed",
            });
        }
        pairs.push(DirectionPair::Forward(idx));
    }

    let mut seen: FxHashSet<EdgeKey> = FxHashSet::default();
    for (idx, edge) in edges.iter().enumerate() {
        if !is_reversed(edge) {
            continue;
        }
        let join_key = edge.edge_key().reversed();
        if !seen.insert(join_key) {
            return Err(Error::DuplicateDirectedEdge {
                key: edge.edge_key(),
                side: "reversed",
            });
        }
        match slots.get(&join_key) {
            Some(&slot) => {
                if let DirectionPair::Forward(forward) = pairs[slot] {
                    pairs[slot] = DirectionPair::Both {
                        forward,
                        backward: idx,
                    };
                }
            }
            None => pairs.push(DirectionPair::Backward(idx)),
        }
    }

    Ok(pairs)
}

/// Lanes resolved from tags for one direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionLanes {
    pub lanes: Option<u32>,
    pub buslanes: Option<u32>,
}

/// Tag-priority lane counts for both directions of a pair.
///
/// Each direction reads its own row's tags first and falls back to the
/// sibling's; both rows normally carry the tags of the same way.
pub fn pair_lanes(pair: DirectionPair, norms: &[NormalizedLanes]) -> (DirectionLanes, DirectionLanes) {
    let (fwd, bwd) = match pair {
        DirectionPair::Both { forward, backward } => (norms[forward], Some(norms[backward])),
        DirectionPair::Forward(forward) => (norms[forward], None),
        DirectionPair::Backward(backward) => (norms[backward], None),
    };
    let (own_bwd, other_bwd) = match bwd {
        Some(b) => (b, Some(fwd)),
        None => (fwd, None),
    };

    let forward = DirectionLanes {
        lanes: fwd
            .forward_lanes()
            .or_else(|| bwd.and_then(|b| b.forward_lanes())),
        buslanes: fwd
            .forward_buslanes()
            .or_else(|| bwd.and_then(|b| b.forward_buslanes())),
    };
    let backward = DirectionLanes {
        lanes: own_bwd
            .backward_lanes()
            .or_else(|| other_bwd.and_then(|o| o.backward_lanes())),
        buslanes: own_bwd
            .backward_buslanes()
            .or_else(|| other_bwd.and_then(|o| o.backward_buslanes())),
    };
    (forward, backward)
}

/// Resolved lanes keyed by directed key, one map per direction of the way
#[derive(Debug, Default)]
pub struct LaneLookup {
    forward: FxHashMap<EdgeKey, DirectionLanes>,
    reverse: FxHashMap<EdgeKey, DirectionLanes>,
}

impl LaneLookup {
    pub fn build(pairs: &[DirectionPair], edges: &[EdgeRecord], norms: &[NormalizedLanes]) -> Self {
        let mut lookup = Self::default();
        for &pair in pairs {
            let key = pair.forward_key(edges);
            let (forward, backward) = pair_lanes(pair, norms);
            lookup.forward.insert(key, forward);
            lookup.reverse.insert(key.reversed(), backward);
        }
        lookup
    }

    /// Lanes for a directed key; the forward lookup wins, the reverse lookup fills gaps
    pub fn get(&self, key: &EdgeKey) -> DirectionLanes {
        let fwd = self.forward.get(key).copied().unwrap_or_default();
        let rev = self.reverse.get(key).copied().unwrap_or_default();
        DirectionLanes {
            lanes: fwd.lanes.or(rev.lanes),
            buslanes: fwd.buslanes.or(rev.buslanes),
        }
    }
}
