//! Closed county enumeration for the nine-county region
//!
//! Every link and node ends up labelled with exactly one [`County`]. The nine
//! named counties partition the model area; [`County::External`] marks
//! anything that falls outside all of them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::error::{Error, Result};

/// A county label. Declaration order is the model numbering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum County {
    SanFrancisco,
    SanMateo,
    SantaClara,
    Alameda,
    ContraCosta,
    Solano,
    Napa,
    Sonoma,
    Marin,
    External,
}

impl County {
    /// The nine named counties, in numbering order (excludes `External`)
    pub const NAMED: [County; 9] = [
        County::SanFrancisco,
        County::SanMateo,
        County::SantaClara,
        County::Alameda,
        County::ContraCosta,
        County::Solano,
        County::Napa,
        County::Sonoma,
        County::Marin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            County::SanFrancisco => "San Francisco",
            County::SanMateo => "San Mateo",
            County::SantaClara => "Santa Clara",
            County::Alameda => "Alameda",
            County::ContraCosta => "Contra Costa",
            County::Solano => "Solano",
            County::Napa => "Napa",
            County::Sonoma => "Sonoma",
            County::Marin => "Marin",
            County::External => "External",
        }
    }

    /// First model node id handed out to nodes in this county
    pub fn node_start_num(self) -> i64 {
        match self {
            County::SanFrancisco => 1_000_000,
            County::SanMateo => 1_500_000,
            County::SantaClara => 2_000_000,
            County::Alameda => 2_500_000,
            County::ContraCosta => 3_000_000,
            County::Solano => 3_500_000,
            County::Napa => 4_000_000,
            County::Sonoma => 4_500_000,
            County::Marin => 5_000_000,
            County::External => 900_001,
        }
    }

    /// County number 1-9; `External` is 0
    pub fn number(self) -> i64 {
        match self {
            County::External => 0,
            named => named as i64 + 1,
        }
    }

    pub fn is_external(self) -> bool {
        self == County::External
    }
}

impl fmt::Display for County {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for County {
    type Err = Error;

    /// Case-insensitive parse against the closed enumeration
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        County::NAMED
            .iter()
            .chain(std::iter::once(&County::External))
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .copied()
            .ok_or_else(|| Error::UnknownCounty {
                name: s.to_string(),
                suggestion: suggest_correction(trimmed),
            })
    }
}

impl Serialize for County {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for County {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde helpers for an optional county column.
///
/// `null` and the empty string both mean "not yet assigned".
pub mod serde_opt {
    use super::County;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<County>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(county) => serializer.serialize_str(county.as_str()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<County>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) if !s.trim().is_empty() => {
                s.parse().map(Some).map_err(serde::de::Error::custom)
            }
            _ => Ok(None),
        }
    }
}

/// Find the best fuzzy match using Jaro-Winkler (70%) + normalized Levenshtein (30%),
/// with a bonus for a shared prefix. Minimum score 0.65.
fn find_best_fuzzy_match<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let input_lower = input.to_lowercase();
    let mut best_match = None;
    let mut best_score = 0.0f64;

    let min_threshold = 0.65;

    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();

        let jw_score = jaro_winkler(&input_lower, &candidate_lower);
        let lev_score = normalized_levenshtein(&input_lower, &candidate_lower);
        let mut score = (jw_score * 0.7) + (lev_score * 0.3);

        // "San ..." and "Santa ..." share short prefixes, so only reward long ones
        let prefix_len = input_lower.chars().count().min(7);
        if prefix_len >= 5 {
            let input_prefix: String = input_lower.chars().take(prefix_len).collect();
            let candidate_prefix: String = candidate_lower.chars().take(prefix_len).collect();
            let prefix_similarity = normalized_levenshtein(&input_prefix, &candidate_prefix);
            if prefix_similarity > 0.7 {
                score += 0.1 * prefix_similarity;
            }
        }

        if score >= min_threshold && score > best_score {
            best_score = score;
            best_match = Some(*candidate);
        }
    }

    best_match
}

/// Suggest a county for a potentially misspelled name.
///
/// Returns `None` for exact (case-insensitive) matches and for names too far
/// from every county.
pub fn suggest_correction(name: &str) -> Option<String> {
    let candidates: Vec<&str> = County::NAMED
        .iter()
        .chain(std::iter::once(&County::External))
        .map(|c| c.as_str())
        .collect();

    if candidates.iter().any(|c| c.eq_ignore_ascii_case(name)) {
        return None;
    }

    // Spaces are often dropped or replaced ("ContraCosta", "santa-clara")
    let squashed: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    for candidate in &candidates {
        let candidate_squashed: String = candidate
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if candidate_squashed == squashed {
            return Some(candidate.to_string());
        }
    }

    find_best_fuzzy_match(name, &candidates).map(str::to_string)
}
