use std::collections::HashSet;

use serde::Serialize;

use crate::layout::{total_cells, Structure};
use crate::models::block::{Block, BlockItem};

/// Counts shown on block cards in the selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlockStats {
    pub rows: usize,
    pub total_cells: usize,
    /// Distinct cells holding at least one item.
    pub filled_cells: usize,
    pub items: usize,
}

pub fn block_stats(structure: &Structure, items: &[BlockItem]) -> BlockStats {
    let filled: HashSet<(usize, usize)> = items
        .iter()
        .map(BlockItem::address)
        .filter(|&(row, column)| structure.has_cell(row, column))
        .collect();
    BlockStats {
        rows: structure.rows.len(),
        total_cells: total_cells(structure),
        filled_cells: filled.len(),
        items: items.len(),
    }
}

/// Case-insensitive substring match over name and description. A blank
/// query matches everything.
pub fn matches_query(block: &Block, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    block.name.to_lowercase().contains(&needle)
        || block.description.to_lowercase().contains(&needle)
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    #[serde(flatten)]
    pub block: Block,
    pub stats: BlockStats,
}
