use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::layout::cells::sort_by_address;
use crate::layout::ItemStore;
use crate::models::block::{Block, BlockItem, BlockWithItems, ItemPatch, NewBlockItem};
use crate::store::{
    stranded, stranded_item, BlockStore, BlockUpdate, DraftCommit, NewBlock, StoreError,
};

#[derive(Default)]
struct Tables {
    blocks: Vec<Block>,
    items: ItemStore,
}

impl Tables {
    fn block(&self, id: Uuid, owner: Uuid) -> Result<&Block, StoreError> {
        self.blocks
            .iter()
            .find(|b| b.id == id && b.user_id == owner)
            .ok_or_else(|| StoreError::NotFound(format!("Block {id}")))
    }

    fn block_mut(&mut self, id: Uuid, owner: Uuid) -> Result<&mut Block, StoreError> {
        self.blocks
            .iter_mut()
            .find(|b| b.id == id && b.user_id == owner)
            .ok_or_else(|| StoreError::NotFound(format!("Block {id}")))
    }

    fn items_of(&self, block_id: Uuid) -> Vec<BlockItem> {
        let mut items: Vec<BlockItem> = self
            .items
            .items()
            .iter()
            .filter(|i| i.block_id == block_id)
            .cloned()
            .collect();
        sort_by_address(&mut items);
        items
    }
}

fn apply_update(block: &mut Block, fields: BlockUpdate) {
    if let Some(name) = fields.name {
        block.name = name;
    }
    if let Some(description) = fields.description {
        block.description = description;
    }
    if let Some(structure) = fields.structure {
        block.structure = structure;
    }
    block.updated_at = Utc::now();
}

/// In-process store with the same contract as Postgres. Used when no
/// `DATABASE_URL` is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn list_blocks(&self, owner: Uuid) -> Result<Vec<Block>, StoreError> {
        let tables = self.tables.read().await;
        let mut blocks: Vec<Block> = tables
            .blocks
            .iter()
            .filter(|b| b.user_id == owner)
            .cloned()
            .collect();
        blocks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(blocks)
    }

    async fn get_block(&self, id: Uuid, owner: Uuid) -> Result<Block, StoreError> {
        self.tables.read().await.block(id, owner).cloned()
    }

    async fn create_block(&self, owner: Uuid, new: NewBlock) -> Result<Block, StoreError> {
        let now = Utc::now();
        let block = Block {
            id: Uuid::new_v4(),
            user_id: owner,
            name: new.name,
            description: new.description,
            structure: new.structure,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.blocks.push(block.clone());
        Ok(block)
    }

    async fn update_block(
        &self,
        id: Uuid,
        owner: Uuid,
        fields: BlockUpdate,
    ) -> Result<Block, StoreError> {
        let mut tables = self.tables.write().await;
        tables.block(id, owner)?;
        if let Some(structure) = &fields.structure {
            if let Some(item_id) = stranded_item(structure, &tables.items_of(id), &[], &[]) {
                return Err(stranded(item_id));
            }
        }
        let block = tables.block_mut(id, owner)?;
        apply_update(block, fields);
        Ok(block.clone())
    }

    async fn delete_block(&self, id: Uuid, owner: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.blocks.len();
        tables.blocks.retain(|b| !(b.id == id && b.user_id == owner));
        if tables.blocks.len() == before {
            return Err(StoreError::NotFound(format!("Block {id}")));
        }
        let removed = tables.items.delete_where(|i| i.block_id == id);
        debug!("Deleted block {id} with {removed} items");
        Ok(())
    }

    async fn list_items(&self, block_id: Uuid) -> Result<Vec<BlockItem>, StoreError> {
        Ok(self.tables.read().await.items_of(block_id))
    }

    async fn get_item(&self, id: Uuid) -> Result<BlockItem, StoreError> {
        self.tables
            .read()
            .await
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Item {id}")))
    }

    async fn create_item(
        &self,
        block_id: Uuid,
        new: NewBlockItem,
    ) -> Result<BlockItem, StoreError> {
        let mut tables = self.tables.write().await;
        let block = tables
            .blocks
            .iter()
            .find(|b| b.id == block_id)
            .ok_or_else(|| StoreError::NotFound(format!("Block {block_id}")))?;
        if !block.structure.has_cell(new.row_index, new.column_index) {
            return Err(StoreError::NotFound(format!(
                "Cell ({}, {})",
                new.row_index, new.column_index
            )));
        }
        Ok(tables.items.create(block_id, new)?)
    }

    async fn update_item(&self, id: Uuid, patch: ItemPatch) -> Result<BlockItem, StoreError> {
        Ok(self.tables.write().await.items.update(id, patch)?)
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), StoreError> {
        self.tables.write().await.items.delete(id)?;
        Ok(())
    }

    async fn commit_draft(
        &self,
        id: Uuid,
        owner: Uuid,
        commit: DraftCommit,
    ) -> Result<BlockWithItems, StoreError> {
        let mut tables = self.tables.write().await;
        tables.block(id, owner)?;

        // Check everything before touching anything.
        let belongs = |item_id: Uuid| {
            tables
                .items
                .get(item_id)
                .is_some_and(|item| item.block_id == id)
        };
        if let Some(missing) = commit
            .removed
            .iter()
            .copied()
            .chain(commit.readdressed.iter().map(|r| r.item_id))
            .find(|&item_id| !belongs(item_id))
        {
            return Err(StoreError::NotFound(format!("Item {missing}")));
        }
        let structure = match &commit.fields.structure {
            Some(structure) => structure,
            None => &tables.block(id, owner)?.structure,
        };
        if let Some(item_id) = stranded_item(
            structure,
            &tables.items_of(id),
            &commit.removed,
            &commit.readdressed,
        ) {
            return Err(stranded(item_id));
        }

        let now = Utc::now();
        for r in &commit.readdressed {
            if let Some(item) = tables.items.get_mut(r.item_id) {
                item.row_index = r.row_index;
                item.column_index = r.column_index;
                item.updated_at = now;
            }
        }
        tables
            .items
            .delete_where(|item| commit.removed.contains(&item.id));

        let block = tables.block_mut(id, owner)?;
        apply_update(block, commit.fields);
        let block = block.clone();
        let items = tables.items_of(id);
        Ok(BlockWithItems { block, items })
    }
}
