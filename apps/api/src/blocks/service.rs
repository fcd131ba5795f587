//! Owner-scoped block operations. Every function checks ownership through the
//! store before it reads or writes, so a foreign block or item is `NotFound`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::blocks::saves::SaveRegistry;
use crate::blocks::stats::{block_stats, matches_query, BlockSummary};
use crate::errors::AppError;
use crate::layout::cells::normalize_content;
use crate::layout::{
    apply_all, create_default, items_fit, parse_structure, BlockDraft, EditOp, LayoutError,
    Structure,
};
use crate::models::block::{Block, BlockItem, BlockWithItems, ItemPatch, NewBlockItem};
use crate::render::{preview, BlockPreview};
use crate::store::{BlockStore, BlockUpdate, DraftCommit, NewBlock, Readdress, StoreError};

// ────────────────────────────────────────────────────────────────────────────
// Requests
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBlockRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Raw structure JSON; checked here rather than by the extractor so a bad
    /// shape is a validation error.
    pub structure: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBlockRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub structure: Option<Value>,
}

/// Where one item sits in a saved draft. Other item fields are ignored on
/// save; content and styles change through the item endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPlacement {
    pub id: Uuid,
    #[serde(alias = "row_index")]
    pub row_index: usize,
    #[serde(alias = "column_index")]
    pub column_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct SaveDraftRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub structure: Value,
    #[serde(default)]
    pub items: Vec<ItemPlacement>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyEditsRequest {
    pub ops: Vec<EditOp>,
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
pub struct EditOutcome {
    pub draft: BlockDraft,
    pub preview: BlockPreview,
    pub saved: bool,
}

/// A checked draft, ready to commit.
#[derive(Debug, Clone)]
pub struct DraftSave {
    pub name: String,
    pub description: String,
    pub structure: Structure,
    pub placements: Vec<ItemPlacement>,
}

impl From<&BlockDraft> for DraftSave {
    fn from(draft: &BlockDraft) -> Self {
        Self {
            name: draft.name.clone(),
            description: draft.description.clone(),
            structure: draft.structure.clone(),
            placements: draft
                .items
                .iter()
                .map(|item| ItemPlacement {
                    id: item.id,
                    row_index: item.row_index,
                    column_index: item.column_index,
                })
                .collect(),
        }
    }
}

impl TryFrom<SaveDraftRequest> for DraftSave {
    type Error = LayoutError;

    fn try_from(req: SaveDraftRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            structure: parse_structure(&req.structure)?,
            name: req.name,
            description: req.description,
            placements: req.items,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Checks
// ────────────────────────────────────────────────────────────────────────────

fn checked_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Block name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

/// Stored structures must have at least one row.
fn checked_structure(structure: Structure) -> Result<Structure, LayoutError> {
    if structure.rows.is_empty() {
        return Err(LayoutError::NoRows);
    }
    Ok(structure)
}

fn with_draft(block: &Block, draft: &BlockDraft) -> Block {
    Block {
        name: draft.name.clone(),
        description: draft.description.clone(),
        structure: draft.structure.clone(),
        ..block.clone()
    }
}

/// Loads an item and proves `owner` owns its block.
async fn owned_item(
    store: &dyn BlockStore,
    owner: Uuid,
    id: Uuid,
) -> Result<(Block, BlockItem), AppError> {
    let item = store.get_item(id).await?;
    let block = store
        .get_block(item.block_id, owner)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => AppError::NotFound(format!("Item {id}")),
            other => other.into(),
        })?;
    Ok((block, item))
}

// ────────────────────────────────────────────────────────────────────────────
// Blocks
// ────────────────────────────────────────────────────────────────────────────

pub async fn list_blocks(
    store: &dyn BlockStore,
    owner: Uuid,
    query: Option<&str>,
) -> Result<Vec<BlockSummary>, AppError> {
    let blocks = store.list_blocks(owner).await?;
    let mut summaries = Vec::with_capacity(blocks.len());
    for block in blocks
        .into_iter()
        .filter(|b| query.map_or(true, |q| matches_query(b, q)))
    {
        let items = store.list_items(block.id).await?;
        let stats = block_stats(&block.structure, &items);
        summaries.push(BlockSummary { block, stats });
    }
    Ok(summaries)
}

pub async fn get_block_with_items(
    store: &dyn BlockStore,
    owner: Uuid,
    id: Uuid,
) -> Result<BlockWithItems, AppError> {
    let block = store.get_block(id, owner).await?;
    let items = store.list_items(id).await?;
    Ok(BlockWithItems { block, items })
}

pub async fn create_block(
    store: &dyn BlockStore,
    owner: Uuid,
    req: CreateBlockRequest,
) -> Result<Block, AppError> {
    let name = checked_name(&req.name)?;
    let structure = match &req.structure {
        Some(raw) => checked_structure(parse_structure(raw)?)?,
        None => create_default(),
    };
    let block = store
        .create_block(
            owner,
            NewBlock {
                name,
                description: req.description.trim().to_string(),
                structure,
            },
        )
        .await?;
    info!("Block {} created by user {owner}", block.id);
    Ok(block)
}

pub async fn update_block(
    store: &dyn BlockStore,
    owner: Uuid,
    id: Uuid,
    req: UpdateBlockRequest,
) -> Result<Block, AppError> {
    let name = req.name.as_deref().map(checked_name).transpose()?;
    let structure = match &req.structure {
        Some(raw) => {
            let structure = checked_structure(parse_structure(raw)?)?;
            store.get_block(id, owner).await?;
            let items = store.list_items(id).await?;
            if !items_fit(&structure, &items) {
                return Err(AppError::Validation(
                    "Structure would leave existing items without a cell".to_string(),
                ));
            }
            Some(structure)
        }
        None => None,
    };
    let fields = BlockUpdate {
        name,
        description: req.description.map(|d| d.trim().to_string()),
        structure,
    };
    Ok(store.update_block(id, owner, fields).await?)
}

pub async fn delete_block(store: &dyn BlockStore, owner: Uuid, id: Uuid) -> Result<(), AppError> {
    store.delete_block(id, owner).await?;
    info!("Block {id} deleted by user {owner}");
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Items
// ────────────────────────────────────────────────────────────────────────────

pub async fn create_item(
    store: &dyn BlockStore,
    owner: Uuid,
    block_id: Uuid,
    mut new: NewBlockItem,
) -> Result<BlockItem, AppError> {
    let block = store.get_block(block_id, owner).await?;
    if !block.structure.has_cell(new.row_index, new.column_index) {
        return Err(LayoutError::NoSuchCell {
            row: new.row_index,
            column: new.column_index,
        }
        .into());
    }
    new.content = normalize_content(&new.content)?;
    let item = store.create_item(block_id, new).await?;
    debug!(
        "Item {} added at ({}, {}) in block {block_id}",
        item.id, item.row_index, item.column_index
    );
    Ok(item)
}

pub async fn update_item(
    store: &dyn BlockStore,
    owner: Uuid,
    id: Uuid,
    mut patch: ItemPatch,
) -> Result<BlockItem, AppError> {
    patch.content = patch.content.as_deref().map(normalize_content).transpose()?;
    owned_item(store, owner, id).await?;
    Ok(store.update_item(id, patch).await?)
}

pub async fn delete_item(store: &dyn BlockStore, owner: Uuid, id: Uuid) -> Result<(), AppError> {
    owned_item(store, owner, id).await?;
    store.delete_item(id).await?;
    debug!("Item {id} deleted by user {owner}");
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Drafts
// ────────────────────────────────────────────────────────────────────────────

/// Commits a draft: block fields, structure, and the item reconciliation
/// (items absent from the draft are deleted, moved items are re-addressed)
/// land together or not at all.
pub async fn save_draft(
    store: &dyn BlockStore,
    saves: &SaveRegistry,
    owner: Uuid,
    id: Uuid,
    draft: DraftSave,
) -> Result<BlockWithItems, AppError> {
    let _guard = saves.begin(id).ok_or_else(|| {
        warn!("Rejected concurrent save of block {id}");
        AppError::Conflict(format!("Block {id} is already being saved"))
    })?;

    let name = checked_name(&draft.name)?;
    let structure = checked_structure(draft.structure)?;

    let mut placed = HashSet::with_capacity(draft.placements.len());
    for p in &draft.placements {
        if !placed.insert(p.id) {
            return Err(AppError::Validation(format!("Item {} appears twice", p.id)));
        }
        if !structure.has_cell(p.row_index, p.column_index) {
            return Err(AppError::Validation(format!(
                "Item {} is placed at ({}, {}), which is not a cell",
                p.id, p.row_index, p.column_index
            )));
        }
    }

    store.get_block(id, owner).await?;
    let stored: HashMap<Uuid, (usize, usize)> = store
        .list_items(id)
        .await?
        .iter()
        .map(|item| (item.id, item.address()))
        .collect();

    let mut readdressed = Vec::new();
    for p in &draft.placements {
        match stored.get(&p.id) {
            None => {
                return Err(AppError::Validation(format!(
                    "Item {} does not belong to block {id}",
                    p.id
                )))
            }
            Some(&address) if address != (p.row_index, p.column_index) => {
                readdressed.push(Readdress {
                    item_id: p.id,
                    row_index: p.row_index,
                    column_index: p.column_index,
                })
            }
            Some(_) => {}
        }
    }
    let removed: Vec<Uuid> = stored
        .keys()
        .copied()
        .filter(|item_id| !placed.contains(item_id))
        .collect();

    let commit = DraftCommit {
        fields: BlockUpdate {
            name: Some(name),
            description: Some(draft.description.trim().to_string()),
            structure: Some(structure),
        },
        removed,
        readdressed,
    };
    let saved = store.commit_draft(id, owner, commit).await?;
    info!(
        "Block {id} saved: {} rows, {} items",
        saved.block.structure.rows.len(),
        saved.items.len()
    );
    Ok(saved)
}

/// Runs structural edits against a working copy of the block. Nothing is
/// written unless `save` is set; a rejected op leaves everything untouched.
pub async fn apply_edits(
    store: &dyn BlockStore,
    saves: &SaveRegistry,
    owner: Uuid,
    id: Uuid,
    req: ApplyEditsRequest,
) -> Result<EditOutcome, AppError> {
    let loaded = get_block_with_items(store, owner, id).await?;
    let base = loaded.block.clone();
    let op_count = req.ops.len();
    let draft = apply_all(BlockDraft::from(loaded), req.ops).map_err(|(_, e)| e)?;
    debug!("Applied {op_count} edits to block {id}");

    if !req.save {
        let preview = preview(&with_draft(&base, &draft), &draft.items);
        return Ok(EditOutcome {
            draft,
            preview,
            saved: false,
        });
    }

    let saved = save_draft(store, saves, owner, id, DraftSave::from(&draft)).await?;
    let preview = preview(&saved.block, &saved.items);
    Ok(EditOutcome {
        draft: BlockDraft::from(saved),
        preview,
        saved: true,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Projections
// ────────────────────────────────────────────────────────────────────────────

pub async fn block_preview(
    store: &dyn BlockStore,
    owner: Uuid,
    id: Uuid,
) -> Result<BlockPreview, AppError> {
    let loaded = get_block_with_items(store, owner, id).await?;
    Ok(preview(&loaded.block, &loaded.items))
}

pub async fn block_html(store: &dyn BlockStore, owner: Uuid, id: Uuid) -> Result<String, AppError> {
    let loaded = get_block_with_items(store, owner, id).await?;
    Ok(crate::render::render_block_html(&loaded.block, &loaded.items))
}
