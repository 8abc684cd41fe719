//! Boundary tie-break
//!
//! A link that crosses a county line belongs to the county holding the
//! longest stretch of it. Pure geometry: no index, no tables.

use geo::{BooleanOps, Euclidean, Length, LineString, MultiLineString, MultiPolygon};
use netprep_common::County;

use crate::table::EdgeKey;

/// One (link, county) match produced by the intersects join
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub key: EdgeKey,
    pub county: County,
    pub length: f64,
}

/// Length of the part of `line` inside `boundary`, in CRS units
pub fn intersection_length(line: &LineString<f64>, boundary: &MultiPolygon<f64>) -> f64 {
    let clipped = boundary.clip(&MultiLineString::new(vec![line.clone()]), false);
    clipped.length::<Euclidean>()
}

/// Keep one candidate per link.
///
/// Rows sort by link key ascending, then intersection length descending, then
/// county order; the first row of each link survives.
pub fn break_ties(mut rows: Vec<Candidate>) -> Vec<Candidate> {
    rows.sort_by(|x, y| {
        x.key
            .cmp(&y.key)
            .then_with(|| y.length.total_cmp(&x.length))
            .then_with(|| x.county.cmp(&y.county))
    });
    rows.dedup_by_key(|c| c.key);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::tests::square;
    use crate::region::Region;

    /// Winning county of one link among the given regions
    fn winner(line: &LineString<f64>, regions: &[&Region]) -> Option<County> {
        let key = EdgeKey::new(1, 2, 0);
        let rows = regions
            .iter()
            .map(|r| Candidate {
                key,
                county: r.county,
                length: intersection_length(line, &r.boundary),
            })
            .collect();
        break_ties(rows).first().map(|c| c.county)
    }

    #[test]
    fn clipped_length_counts_inside_part_only() {
        let region = square(County::Alameda, 0.0, 0.0, 100.0, 100.0);
        let line = LineString::from(vec![(50.0, 50.0), (150.0, 50.0)]);
        let length = intersection_length(&line, &region.boundary);
        assert!((length - 50.0).abs() < 1e-9);

        let far = LineString::from(vec![(500.0, 500.0), (600.0, 500.0)]);
        assert_eq!(intersection_length(&far, &region.boundary), 0.0);
    }

    #[test]
    fn longest_overlap_wins() {
        let alameda = square(County::Alameda, 0.0, 0.0, 1000.0, 1000.0);
        let contra_costa = square(County::ContraCosta, 1000.0, 0.0, 2000.0, 1000.0);
        // 800 ft in Alameda, 200 ft in Contra Costa
        let line = LineString::from(vec![(200.0, 500.0), (1200.0, 500.0)]);
        assert_eq!(winner(&line, &[&contra_costa, &alameda]), Some(County::Alameda));
    }

    #[test]
    fn exact_tie_goes_to_county_order() {
        let sonoma = square(County::Sonoma, 0.0, 0.0, 100.0, 100.0);
        let napa = square(County::Napa, 100.0, 0.0, 200.0, 100.0);
        let line = LineString::from(vec![(50.0, 50.0), (150.0, 50.0)]);
        assert_eq!(winner(&line, &[&sonoma, &napa]), Some(County::Napa));
    }

    #[test]
    fn ties_break_per_link() {
        let a = EdgeKey::new(1, 2, 0);
        let b = EdgeKey::new(1, 3, 0);
        let rows = vec![
            Candidate { key: b, county: County::Marin, length: 5.0 },
            Candidate { key: a, county: County::Solano, length: 10.0 },
            Candidate { key: a, county: County::Napa, length: 30.0 },
            Candidate { key: b, county: County::Sonoma, length: 7.0 },
        ];
        let kept = break_ties(rows);
        assert_eq!(
            kept.iter().map(|c| (c.key, c.county)).collect::<Vec<_>>(),
            vec![(a, County::Napa), (b, County::Sonoma)]
        );
    }

    #[test]
    fn no_candidates_no_region() {
        let line = LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]);
        assert_eq!(winner(&line, &[]), None);
    }
}
