//! Deterministic placement for nodes imported without positions.
//!
//! Hand-written documents routinely omit node positions. The layout pass
//! assigns them so the graph reads as a top-to-bottom chain following
//! edge order, without landing on top of nodes that already have
//! positions. Placement is deterministic: the same document always lays
//! out the same way.

use flowdeck_workflow::{DocumentNode, Edge, Node, Position};
use std::collections::HashMap;

/// Node footprint on the canvas.
pub const NODE_WIDTH: f64 = 160.0;
/// Node footprint on the canvas.
pub const NODE_HEIGHT: f64 = 60.0;
/// X coordinate of the placement column.
const GRID_ORIGIN_X: f64 = 80.0;
/// Y coordinate of the first placed node on an empty canvas.
const GRID_ORIGIN_Y: f64 = 80.0;
/// Vertical distance between placed nodes.
const VERTICAL_GAP: f64 = 120.0;

/// Converts document node records into live nodes, assigning positions
/// to records that lack one.
///
/// Unpositioned nodes are placed in chain order (first appearance in the
/// edge list, then document order) in a single column below the lowest
/// already-positioned node. A candidate slot
/// that would overlap an existing node is pushed further down.
///
/// The returned nodes keep the document's order.
#[must_use]
pub fn place_nodes(records: Vec<DocumentNode>, edges: &[Edge]) -> Vec<Node> {
    let mut occupied: Vec<Position> = records.iter().filter_map(|r| r.position).collect();

    let rank = chain_rank(&records, edges);
    let mut pending: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.position.is_none())
        .map(|(index, _)| index)
        .collect();
    pending.sort_by_key(|&index| rank.get(records[index].id.as_str()).copied());

    let mut assigned: HashMap<usize, Position> = HashMap::new();
    let mut next_y = if occupied.is_empty() {
        GRID_ORIGIN_Y
    } else {
        lowest(&occupied) + VERTICAL_GAP
    };

    for index in pending {
        let mut candidate = Position::new(GRID_ORIGIN_X, next_y);
        while overlaps_any(candidate, &occupied) {
            candidate.y += VERTICAL_GAP;
        }
        occupied.push(candidate);
        next_y = candidate.y + VERTICAL_GAP;
        assigned.insert(index, candidate);
    }

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let fallback = assigned
                .remove(&index)
                .unwrap_or(Position::new(GRID_ORIGIN_X, GRID_ORIGIN_Y));
            record.into_node(fallback)
        })
        .collect()
}

/// Ranks node IDs by their first appearance in the edge list, then by
/// document order.
fn chain_rank<'a>(records: &'a [DocumentNode], edges: &'a [Edge]) -> HashMap<&'a str, usize> {
    let mut rank = HashMap::new();
    let mut next = 0;
    for edge in edges {
        for id in [edge.source.as_str(), edge.target.as_str()] {
            rank.entry(id).or_insert_with(|| {
                let current = next;
                next += 1;
                current
            });
        }
    }
    for record in records {
        rank.entry(record.id.as_str()).or_insert_with(|| {
            let current = next;
            next += 1;
            current
        });
    }
    rank
}

fn lowest(positions: &[Position]) -> f64 {
    positions.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max)
}

fn overlaps_any(candidate: Position, occupied: &[Position]) -> bool {
    occupied.iter().any(|existing| {
        (candidate.x - existing.x).abs() < NODE_WIDTH
            && (candidate.y - existing.y).abs() < NODE_HEIGHT
    })
}
