//! Output invariant checks
//!
//! Fast-fail report over the final link and node tables:
//! - lane counts are populated for every vehicle link
//! - directed keys are unique
//! - each undirected way has one link, or two mutually reverse links
//! - every link and node carries a county

use rustc_hash::{FxHashMap, FxHashSet};

use crate::table::{DirectedLink, EdgeKey, NodeRecord};

/// Invariant check results
#[derive(Debug, Default)]
pub struct InvariantResult {
    pub passed: bool,
    pub checks_run: usize,
    pub checks_passed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl InvariantResult {
    fn new() -> Self {
        Self {
            passed: true,
            ..Default::default()
        }
    }

    fn fail(&mut self, msg: String) {
        self.passed = false;
        self.errors.push(msg);
    }

    fn warn(&mut self, msg: String) {
        self.warnings.push(msg);
    }

    fn check_passed(&mut self) {
        self.checks_run += 1;
        self.checks_passed += 1;
    }

    fn check_failed(&mut self, msg: String) {
        self.checks_run += 1;
        self.fail(msg);
    }
}

fn check_lanes(links: &[DirectedLink], result: &mut InvariantResult) {
    // u32 is never negative; zero is only legitimate on non-vehicle links
    let zero_drive = links
        .iter()
        .filter(|l| l.lanes == 0 && l.drive_access)
        .count();
    if zero_drive > 0 {
        result.warn(format!("{zero_drive} drivable links have 0 lanes"));
    }
    result.check_passed();
    println!("  ✓ All {} links carry a lane count", links.len());
}

fn check_unique_keys(links: &[DirectedLink], result: &mut InvariantResult) {
    let mut seen = FxHashSet::default();
    let duplicates: Vec<EdgeKey> = links
        .iter()
        .map(DirectedLink::edge_key)
        .filter(|k| !seen.insert(*k))
        .collect();
    if duplicates.is_empty() {
        result.check_passed();
        println!("  ✓ Directed keys unique");
    } else {
        result.check_failed(format!(
            "{} duplicate directed keys, first {}",
            duplicates.len(),
            duplicates[0]
        ));
    }
}

fn check_direction_cardinality(links: &[DirectedLink], result: &mut InvariantResult) {
    // undirected identity: endpoints in ascending order plus key
    let mut per_way: FxHashMap<EdgeKey, Vec<EdgeKey>> = FxHashMap::default();
    for link in links {
        let key = link.edge_key();
        let way = if key.a <= key.b { key } else { key.reversed() };
        per_way.entry(way).or_default().push(key);
    }

    let mut bad: Vec<EdgeKey> = per_way
        .iter()
        .filter(|(_, dirs)| match dirs.as_slice() {
            [_] => false,
            [x, y] => x.reversed() != *y,
            _ => true,
        })
        .map(|(way, _)| *way)
        .collect();
    bad.sort();

    if bad.is_empty() {
        result.check_passed();
        println!("  ✓ {} ways with one or two directed links", per_way.len());
    } else {
        result.check_failed(format!(
            "{} ways without exactly one or two mutually reverse links, first {}",
            bad.len(),
            bad[0]
        ));
    }
}

fn check_counties(links: &[DirectedLink], nodes: &[NodeRecord], result: &mut InvariantResult) {
    let links_missing = links.iter().filter(|l| l.county.is_none()).count();
    let nodes_missing = nodes.iter().filter(|n| n.county.is_none()).count();
    if links_missing == 0 && nodes_missing == 0 {
        result.check_passed();
        println!("  ✓ Every link and node has a county");
    } else {
        result.check_failed(format!(
            "{links_missing} links and {nodes_missing} nodes without a county"
        ));
    }
}

/// Check resolved links; pass `nodes` to also require county totality
pub fn validate_outputs(links: &[DirectedLink], nodes: Option<&[NodeRecord]>) -> InvariantResult {
    println!("\n🔍 Invariant Validation");
    let mut result = InvariantResult::new();

    check_lanes(links, &mut result);
    check_unique_keys(links, &mut result);
    check_direction_cardinality(links, &mut result);
    if let Some(nodes) = nodes {
        check_counties(links, nodes, &mut result);
    }

    println!(
        "  Checks: {}/{} passed, {} warnings",
        result.checks_passed,
        result.checks_run,
        result.warnings.len()
    );
    for (i, e) in result.errors.iter().enumerate() {
        println!("    {}. {}", i + 1, e);
    }
    for w in &result.warnings {
        tracing::warn!("{w}");
    }

    if result.passed {
        println!("✅ All invariant checks passed!");
    } else {
        println!("❌ Invariant checks failed!");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lanes::tests::pending;
    use netprep_common::County;

    fn link(a: i64, b: i64) -> DirectedLink {
        let mut link = pending(a, b, "primary", Some(1)).link;
        link.lanes = 1;
        link.county = Some(County::Solano);
        link
    }

    #[test]
    fn clean_output_passes() {
        let links = vec![link(1, 2), link(2, 1), link(2, 3)];
        let result = validate_outputs(&links, Some(&[]));
        assert!(result.passed);
        assert_eq!(result.checks_run, 4);
    }

    #[test]
    fn duplicate_keys_fail() {
        let links = vec![link(1, 2), link(1, 2)];
        let result = validate_outputs(&links, None);
        assert!(!result.passed);
        // also breaks the one-or-two-directions check
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn missing_county_fails() {
        let mut unlabelled = link(1, 2);
        unlabelled.county = None;
        let result = validate_outputs(&[unlabelled], Some(&[]));
        assert!(!result.passed);
    }

    #[test]
    fn zero_lane_drivable_link_warns() {
        let mut zero = link(1, 2);
        zero.lanes = 0;
        let result = validate_outputs(&[zero], None);
        assert!(result.passed);
        assert_eq!(result.warnings.len(), 1);
    }
}
