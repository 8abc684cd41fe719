//! netprep - directed link and county preparation for regional roadway networks
//!
//! Stages:
//! - [`lanes`]: undirected edges to directed links with one lane count each
//! - [`region`]: one county per link and node, longest overlap wins at borders
//! - [`numbering`]: model ids per county
//!
//! [`pipeline`] strings them together for the `netprep` binary.

pub mod cli;
pub mod error;
pub mod highway;
pub mod lanes;
pub mod manifest;
pub mod numbering;
pub mod pipeline;
pub mod region;
pub mod table;
pub mod validate;

pub use error::{Error, Result};
pub use highway::{classify, AccessFlags, Classification};
pub use lanes::{resolve_directed_links, Resolution, ResolveOptions, ResolveStats};
pub use region::{assign_regions, load_regions, AssignmentOutcome, Region, RegionSet};
pub use table::{DirectedLink, EdgeKey, EdgeRecord, NodeRecord};
