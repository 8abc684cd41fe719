//! Model ids for nodes and links
//!
//! Nodes are numbered per county from the county's base id. Links get
//! `county_number * 1_000_000 + sequence`, with the sequence restarting at 1
//! in each county.

use netprep_common::County;

use crate::table::{DirectedLink, NodeRecord};

const LINK_COUNTY_STRIDE: i64 = 1_000_000;

/// Assign `model_node_id`, walking nodes in (county, id) order
pub fn number_nodes(nodes: &mut [NodeRecord]) {
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by_key(|&i| (nodes[i].county.unwrap_or(County::External), nodes[i].id));

    let mut current: Option<County> = None;
    let mut next_id = 0;
    for i in order {
        let county = nodes[i].county.unwrap_or(County::External);
        if current != Some(county) {
            current = Some(county);
            next_id = county.node_start_num();
        }
        nodes[i].model_node_id = Some(next_id);
        next_id += 1;
    }
}

/// Assign `model_link_id`, walking links in (county, A, B, key) order
pub fn number_links(links: &mut [DirectedLink]) {
    let mut order: Vec<usize> = (0..links.len()).collect();
    order.sort_by_key(|&i| {
        let link = &links[i];
        (link.county.unwrap_or(County::External), link.edge_key())
    });

    let mut current: Option<County> = None;
    let mut seq = 0;
    for i in order {
        let county = links[i].county.unwrap_or(County::External);
        if current != Some(county) {
            current = Some(county);
            seq = 0;
        }
        seq += 1;
        links[i].model_link_id = Some(county.number() * LINK_COUNTY_STRIDE + seq);
    }
}
