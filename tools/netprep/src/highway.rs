//! Highway/access classifier
//!
//! Reduces a raw `highway` tag (scalar or list) to one canonical
//! classification plus per-mode access flags. Rules are tried in a fixed
//! priority order against the list form of the tag; the first match wins.

use crate::table::OneOrMany;

/// Auto highway types, highest capacity first
pub const HIGHWAY_HIERARCHY: [&str; 16] = [
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "busway",
    "unclassified",
    "residential",
    "living_street",
    "service",
    "track",
];

/// Per-mode access flags for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFlags {
    pub drive: bool,
    pub bike: bool,
    pub walk: bool,
    pub truck: bool,
    pub bus: bool,
}

impl Default for AccessFlags {
    fn default() -> Self {
        Self {
            drive: true,
            bike: true,
            walk: true,
            truck: true,
            bus: true,
        }
    }
}

impl AccessFlags {
    /// Access implied by a canonical classification
    pub fn for_highway(highway: &str) -> Self {
        let mut flags = Self::default();
        if matches!(highway, "path" | "footway" | "cycleway") {
            flags.drive = false;
            flags.truck = false;
            flags.bus = false;
        }
        match highway {
            "footway" => flags.bike = false,
            "cycleway" => flags.walk = false,
            "busway" => {
                flags.drive = false;
                flags.truck = false;
                flags.bike = false;
                flags.walk = false;
            }
            _ => {}
        }
        flags
    }
}

/// Result of classifying one edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub highway: String,
    /// Raw tag as `highway:<raw>`
    pub highway_orig: String,
    pub steps: bool,
    pub access: AccessFlags,
    /// False when no rule matched and the raw value was kept
    pub recognized: bool,
}

struct Rule {
    target: &'static str,
    matches: fn(&[&str]) -> bool,
}

fn has(tags: &[&str], value: &str) -> bool {
    tags.contains(&value)
}

/// Non-auto rules, in priority order. The auto hierarchy is tried after these.
const RULES: [Rule; 7] = [
    Rule {
        target: "footway",
        matches: |t| has(t, "steps"),
    },
    Rule {
        target: "path",
        matches: |t| has(t, "path"),
    },
    Rule {
        target: "path",
        matches: |t| (has(t, "footway") || has(t, "pedestrian")) && has(t, "cycleway"),
    },
    Rule {
        target: "footway",
        matches: |t| has(t, "footway"),
    },
    Rule {
        target: "footway",
        matches: |t| has(t, "pedestrian"),
    },
    Rule {
        target: "cycleway",
        matches: |t| has(t, "cycleway"),
    },
    Rule {
        target: "busway",
        matches: |t| has(t, "busway"),
    },
];

fn raw_value(tag: &OneOrMany<String>) -> String {
    match tag {
        OneOrMany::One(s) => s.clone(),
        OneOrMany::Many(list) => list.join(";"),
    }
}

fn orig_value(tag: &OneOrMany<String>) -> String {
    match tag {
        OneOrMany::One(s) => format!("highway:{s}"),
        OneOrMany::Many(list) => format!("highway:[{}]", list.join(", ")),
    }
}

/// Classify a single `highway` tag
pub fn classify(tag: &OneOrMany<String>) -> Classification {
    let tags: Vec<&str> = tag.as_slice().iter().map(String::as_str).collect();
    let steps = has(&tags, "steps");

    let matched = RULES
        .iter()
        .find(|rule| (rule.matches)(&tags))
        .map(|rule| rule.target)
        .or_else(|| {
            HIGHWAY_HIERARCHY
                .iter()
                .copied()
                .find(|level| has(&tags, level))
        });

    let (highway, recognized) = match matched {
        Some(h) => (h.to_string(), true),
        None => (raw_value(tag), false),
    };

    Classification {
        access: AccessFlags::for_highway(&highway),
        highway,
        highway_orig: orig_value(tag),
        steps,
        recognized,
    }
}
