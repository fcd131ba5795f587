//! Persistence boundary for blocks and their items.
//!
//! `AppState` holds an `Arc<dyn BlockStore>`; the Postgres and in-memory
//! backends are interchangeable behind it. Block queries are always scoped to
//! an owner, so another user's block is simply `NotFound`.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::layout::{ItemError, Structure};
use crate::models::block::{Block, BlockItem, BlockWithItems, ItemPatch, NewBlockItem};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgBlockStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl From<ItemError> for StoreError {
    fn from(e: ItemError) -> Self {
        match e {
            ItemError::EmptyContent => StoreError::Rejected(e.to_string()),
            ItemError::NotFound(id) => StoreError::NotFound(format!("Item {id}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBlock {
    pub name: String,
    pub description: String,
    pub structure: Structure,
}

/// Partial block update; `None` leaves a field as stored.
#[derive(Debug, Clone, Default)]
pub struct BlockUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub structure: Option<Structure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readdress {
    pub item_id: Uuid,
    pub row_index: usize,
    pub column_index: usize,
}

/// Everything a draft save writes. Applied as one unit: either all of it
/// lands or none of it does.
#[derive(Debug, Clone, Default)]
pub struct DraftCommit {
    pub fields: BlockUpdate,
    pub removed: Vec<Uuid>,
    pub readdressed: Vec<Readdress>,
}

/// First item that would sit outside `structure` once `removed` are gone and
/// `readdressed` have moved. Both backends run this under the same lock or
/// transaction that applies the change, so an item added by a concurrent
/// request is seen here.
pub(crate) fn stranded_item(
    structure: &Structure,
    items: &[BlockItem],
    removed: &[Uuid],
    readdressed: &[Readdress],
) -> Option<Uuid> {
    items
        .iter()
        .filter(|item| !removed.contains(&item.id))
        .map(|item| {
            let address = readdressed
                .iter()
                .find(|r| r.item_id == item.id)
                .map_or(item.address(), |r| (r.row_index, r.column_index));
            (item.id, address)
        })
        .find(|&(_, (row, column))| !structure.has_cell(row, column))
        .map(|(id, _)| id)
}

pub(crate) fn stranded(id: Uuid) -> StoreError {
    StoreError::Rejected(format!("Item {id} would be left without a cell"))
}

#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Newest first.
    async fn list_blocks(&self, owner: Uuid) -> Result<Vec<Block>, StoreError>;

    async fn get_block(&self, id: Uuid, owner: Uuid) -> Result<Block, StoreError>;

    async fn create_block(&self, owner: Uuid, new: NewBlock) -> Result<Block, StoreError>;

    /// A new structure is refused when an existing item would fall outside it.
    async fn update_block(
        &self,
        id: Uuid,
        owner: Uuid,
        fields: BlockUpdate,
    ) -> Result<Block, StoreError>;

    /// Deletes the block and all of its items.
    async fn delete_block(&self, id: Uuid, owner: Uuid) -> Result<(), StoreError>;

    /// Ordered by `(row_index, column_index)`, then creation.
    async fn list_items(&self, block_id: Uuid) -> Result<Vec<BlockItem>, StoreError>;

    async fn get_item(&self, id: Uuid) -> Result<BlockItem, StoreError>;

    /// The address must be a cell of the block's structure as stored.
    async fn create_item(&self, block_id: Uuid, new: NewBlockItem)
        -> Result<BlockItem, StoreError>;

    async fn update_item(&self, id: Uuid, patch: ItemPatch) -> Result<BlockItem, StoreError>;

    async fn delete_item(&self, id: Uuid) -> Result<(), StoreError>;

    /// Fails without writing anything if an item not in `removed` would be
    /// left outside the committed structure.
    async fn commit_draft(
        &self,
        id: Uuid,
        owner: Uuid,
        commit: DraftCommit,
    ) -> Result<BlockWithItems, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::parse_structure;
    use crate::models::block::{ItemKind, ItemStyles};
    use chrono::Utc;
    use serde_json::json;

    fn item_at(row: usize, column: usize) -> BlockItem {
        let now = Utc::now();
        BlockItem {
            id: Uuid::new_v4(),
            block_id: Uuid::nil(),
            row_index: row,
            column_index: column,
            kind: ItemKind::Text,
            content: "x".to_string(),
            styles: ItemStyles::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stranded_item_accounts_for_removals_and_moves() {
        let narrow = parse_structure(&json!({ "rows": [{ "columns": 1 }] })).unwrap();
        let inside = item_at(0, 0);
        let outside = item_at(0, 2);

        let items = vec![inside.clone(), outside.clone()];
        assert_eq!(stranded_item(&narrow, &items, &[], &[]), Some(outside.id));
        assert_eq!(stranded_item(&narrow, &items, &[outside.id], &[]), None);

        let back = Readdress {
            item_id: outside.id,
            row_index: 0,
            column_index: 0,
        };
        assert_eq!(stranded_item(&narrow, &items, &[], &[back]), None);

        let away = Readdress {
            item_id: inside.id,
            row_index: 3,
            column_index: 0,
        };
        assert_eq!(
            stranded_item(&narrow, &items, &[outside.id], &[away]),
            Some(inside.id)
        );
    }
}
