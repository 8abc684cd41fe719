//! Direction flag cleanup
//!
//! Bidirectional ways sometimes arrive as two rows with swapped endpoints
//! whose `reversed` column is a list (`[false, true]`) because the extractor
//! could not tell which row is which. Pairing them off leaves exactly one
//! `reversed=false` and one `reversed=true` row per way.

use rustc_hash::FxHashMap;

use super::SAMPLE_ROWS;
use crate::table::{EdgeKey, EdgeRecord, OneOrMany};

/// Counts from a pairing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingStats {
    pub list_valued: usize,
    pub paired: usize,
    pub unpaired: usize,
    /// First few rows left without a sibling, in row order
    pub unpaired_samples: Vec<EdgeKey>,
}

/// Collapse list-valued `oneway` flags: true if any element is true.
/// Returns the number of rows changed.
pub fn collapse_oneway(edges: &mut [EdgeRecord]) -> usize {
    let mut changed = 0;
    for edge in edges.iter_mut() {
        if let OneOrMany::Many(flags) = &edge.oneway {
            let any = flags.iter().any(|f| *f);
            edge.oneway = OneOrMany::One(any);
            changed += 1;
        }
    }
    changed
}

/// Resolve list-valued `reversed` flags by pairing sibling rows.
///
/// The first row of a pair (in row order) becomes `reversed=false`, its
/// sibling `reversed=true`. A sibling prefers the same `key`, then the lowest
/// row index. Rows without a sibling default to `reversed=false`. Already
/// resolved rows are never touched, so a second pass is a no-op.
pub fn disambiguate_reversed(edges: &mut [EdgeRecord]) -> PairingStats {
    let mut stats = PairingStats::default();

    let mut by_endpoints: FxHashMap<(i64, i64), Vec<usize>> = FxHashMap::default();
    for (idx, edge) in edges.iter().enumerate() {
        if edge.reversed.is_many() {
            by_endpoints.entry((edge.a, edge.b)).or_default().push(idx);
            stats.list_valued += 1;
        }
    }
    if stats.list_valued == 0 {
        return stats;
    }

    let mut processed = vec![false; edges.len()];
    for idx in 0..edges.len() {
        if processed[idx] || !edges[idx].reversed.is_many() {
            continue;
        }
        processed[idx] = true;

        let (a, b, key) = (edges[idx].a, edges[idx].b, edges[idx].key);
        let sibling = by_endpoints.get(&(b, a)).and_then(|candidates| {
            let open = || candidates.iter().copied().filter(|&j| j != idx && !processed[j]);
            open()
                .find(|&j| edges[j].key == key)
                .or_else(|| open().next())
        });

        edges[idx].reversed = OneOrMany::One(false);
        match sibling {
            Some(j) => {
                processed[j] = true;
                edges[j].reversed = OneOrMany::One(true);
                stats.paired += 1;
            }
            None => {
                stats.unpaired += 1;
                if stats.unpaired_samples.len() < SAMPLE_ROWS {
                    stats.unpaired_samples.push(edges[idx].edge_key());
                }
                tracing::debug!(a, b, key, "no sibling for list-valued reversed; assuming reversed=false");
            }
        }
    }

    stats
}

/// `reversed` as a single flag (list values count as not reversed)
pub fn is_reversed(edge: &EdgeRecord) -> bool {
    matches!(edge.reversed, OneOrMany::One(true))
}
