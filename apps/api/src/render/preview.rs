//! Live preview projection: the block as rows → cells → items, each node
//! carrying its computed inline style. The editor UI draws this directly and
//! the HTML exporter serializes it, so the two cannot drift apart.

use serde::Serialize;
use uuid::Uuid;

use crate::layout::{cell_index, items_in_cell, Row, Structure};
use crate::models::block::{Block, BlockItem, ItemKind};
use crate::render::style;

#[derive(Debug, Clone, Serialize)]
pub struct BlockPreview {
    pub block_id: Uuid,
    pub name: String,
    pub style: String,
    pub rows: Vec<PreviewRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewRow {
    pub index: usize,
    pub columns: usize,
    pub style: String,
    pub cells: Vec<PreviewCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewCell {
    /// Row-major position across the whole block; stable key for the UI.
    pub cell: usize,
    pub row: usize,
    pub column: usize,
    pub style: String,
    pub empty: bool,
    pub items: Vec<PreviewItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PreviewItem {
    Text {
        id: Uuid,
        content: String,
        style: String,
    },
    Image {
        id: Uuid,
        src: String,
        style: String,
        /// Shown in place of the image when it cannot be loaded.
        fallback: String,
    },
}

pub fn image_fallback(url: &str) -> String {
    format!("Image unavailable: {url}")
}

/// Projects a block and its items. A block with no rows projects to no rows.
pub fn preview(block: &Block, items: &[BlockItem]) -> BlockPreview {
    BlockPreview {
        block_id: block.id,
        name: block.name.clone(),
        style: style::block_style().to_inline(),
        rows: block
            .structure
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| preview_row(&block.structure, index, row, items))
            .collect(),
    }
}

fn preview_row(structure: &Structure, index: usize, row: &Row, items: &[BlockItem]) -> PreviewRow {
    let cells = row
        .column_settings()
        .iter()
        .enumerate()
        .map(|(column, settings)| {
            let items: Vec<PreviewItem> = items_in_cell(items, index, column)
                .into_iter()
                .map(|item| match item.kind {
                    ItemKind::Text => PreviewItem::Text {
                        id: item.id,
                        content: item.content.clone(),
                        style: style::text_item_style(&item.styles, settings).to_inline(),
                    },
                    ItemKind::Image => PreviewItem::Image {
                        id: item.id,
                        src: item.content.clone(),
                        style: style::image_item_style(&item.styles).to_inline(),
                        fallback: image_fallback(&item.content),
                    },
                })
                .collect();
            PreviewCell {
                cell: cell_index(structure, index, column).unwrap_or_default(),
                row: index,
                column,
                style: style::cell_style(settings).to_inline(),
                empty: items.is_empty(),
                items,
            }
        })
        .collect();

    PreviewRow {
        index,
        columns: row.columns(),
        style: style::row_style(row).to_inline(),
        cells,
    }
}
