use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::layout::Structure;
use crate::models::block::{
    Block, BlockItem, BlockItemRow, BlockRow, BlockWithItems, ItemPatch, NewBlockItem,
};
use crate::store::{
    stranded, stranded_item, BlockStore, BlockUpdate, DraftCommit, NewBlock, Readdress,
    StoreError,
};

pub struct PgBlockStore {
    pool: PgPool,
}

impl PgBlockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn block_from_row(row: BlockRow) -> Result<Block, StoreError> {
    let id = row.id;
    Block::try_from(row).map_err(|e| StoreError::Corrupt(format!("block {id}: {e}")))
}

fn item_from_row(row: BlockItemRow) -> Result<BlockItem, StoreError> {
    BlockItem::try_from(row).map_err(StoreError::Corrupt)
}

fn to_i32(v: usize) -> Result<i32, StoreError> {
    i32::try_from(v).map_err(|_| StoreError::Rejected(format!("index {v} is out of range")))
}

const SELECT_ITEMS: &str = r#"
    SELECT * FROM block_items
    WHERE block_id = $1
    ORDER BY row_index ASC, column_index ASC, created_at ASC
"#;

const UPDATE_BLOCK: &str = r#"
    UPDATE blocks
    SET name = COALESCE($3, name),
        description = COALESCE($4, description),
        structure = COALESCE($5, structure),
        updated_at = now()
    WHERE id = $1 AND user_id = $2
    RETURNING *
"#;

/// Locks the block's item rows for the rest of the transaction. Item inserts
/// take a share lock on the block row, which the `UPDATE blocks` that follows
/// conflicts with, so no item can appear between this check and commit.
async fn ensure_no_stranded_items(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    structure: &Structure,
    removed: &[Uuid],
    readdressed: &[Readdress],
) -> Result<(), StoreError> {
    let items = sqlx::query_as::<_, BlockItemRow>(
        "SELECT * FROM block_items WHERE block_id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_all(&mut **tx)
    .await?
    .into_iter()
    .map(item_from_row)
    .collect::<Result<Vec<_>, _>>()?;
    match stranded_item(structure, &items, removed, readdressed) {
        Some(item_id) => Err(stranded(item_id)),
        None => Ok(()),
    }
}

async fn update_block_in(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    owner: Uuid,
    fields: &BlockUpdate,
) -> Result<Block, StoreError> {
    let row = sqlx::query_as::<_, BlockRow>(UPDATE_BLOCK)
        .bind(id)
        .bind(owner)
        .bind(fields.name.as_deref())
        .bind(fields.description.as_deref())
        .bind(fields.structure.as_ref().map(Json))
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Block {id}")))?;
    block_from_row(row)
}

#[async_trait]
impl BlockStore for PgBlockStore {
    async fn list_blocks(&self, owner: Uuid) -> Result<Vec<Block>, StoreError> {
        sqlx::query_as::<_, BlockRow>(
            "SELECT * FROM blocks WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(block_from_row)
        .collect()
    }

    async fn get_block(&self, id: Uuid, owner: Uuid) -> Result<Block, StoreError> {
        let row = sqlx::query_as::<_, BlockRow>(
            "SELECT * FROM blocks WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Block {id}")))?;
        block_from_row(row)
    }

    async fn create_block(&self, owner: Uuid, new: NewBlock) -> Result<Block, StoreError> {
        let row = sqlx::query_as::<_, BlockRow>(
            r#"
            INSERT INTO blocks (id, user_id, name, description, structure)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(&new.name)
        .bind(&new.description)
        .bind(Json(&new.structure))
        .fetch_one(&self.pool)
        .await?;
        info!("Created block {} for user {owner}", row.id);
        block_from_row(row)
    }

    async fn update_block(
        &self,
        id: Uuid,
        owner: Uuid,
        fields: BlockUpdate,
    ) -> Result<Block, StoreError> {
        let mut tx = self.pool.begin().await?;
        let block = update_block_in(&mut tx, id, owner, &fields).await?;
        if fields.structure.is_some() {
            ensure_no_stranded_items(&mut tx, id, &block.structure, &[], &[]).await?;
        }
        tx.commit().await?;
        Ok(block)
    }

    async fn delete_block(&self, id: Uuid, owner: Uuid) -> Result<(), StoreError> {
        // block_items.block_id is ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM blocks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Block {id}")));
        }
        info!("Deleted block {id} for user {owner}");
        Ok(())
    }

    async fn list_items(&self, block_id: Uuid) -> Result<Vec<BlockItem>, StoreError> {
        sqlx::query_as::<_, BlockItemRow>(SELECT_ITEMS)
            .bind(block_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(item_from_row)
            .collect()
    }

    async fn get_item(&self, id: Uuid) -> Result<BlockItem, StoreError> {
        let row = sqlx::query_as::<_, BlockItemRow>("SELECT * FROM block_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Item {id}")))?;
        item_from_row(row)
    }

    async fn create_item(
        &self,
        block_id: Uuid,
        new: NewBlockItem,
    ) -> Result<BlockItem, StoreError> {
        // The share lock keeps the structure fixed until the insert commits.
        let mut tx = self.pool.begin().await?;
        let block = sqlx::query_as::<_, BlockRow>("SELECT * FROM blocks WHERE id = $1 FOR SHARE")
            .bind(block_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Block {block_id}")))?;
        let block = block_from_row(block)?;
        if !block.structure.has_cell(new.row_index, new.column_index) {
            return Err(StoreError::NotFound(format!(
                "Cell ({}, {})",
                new.row_index, new.column_index
            )));
        }

        let row = sqlx::query_as::<_, BlockItemRow>(
            r#"
            INSERT INTO block_items
                (id, block_id, row_index, column_index, item_type, content, styles)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(block_id)
        .bind(to_i32(new.row_index)?)
        .bind(to_i32(new.column_index)?)
        .bind(new.kind.as_str())
        .bind(&new.content)
        .bind(Json(&new.styles))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        debug!("Created item {} in block {block_id}", row.id);
        item_from_row(row)
    }

    async fn update_item(&self, id: Uuid, patch: ItemPatch) -> Result<BlockItem, StoreError> {
        // Read-merge-write so the styles merge matches the in-memory semantics.
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, BlockItemRow>(
            "SELECT * FROM block_items WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Item {id}")))?;
        let mut item = item_from_row(current)?;
        if let Some(content) = patch.content {
            item.content = content;
        }
        if let Some(styles) = patch.styles {
            item.styles.merge(styles);
        }

        let row = sqlx::query_as::<_, BlockItemRow>(
            r#"
            UPDATE block_items
            SET content = $2, styles = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&item.content)
        .bind(Json(&item.styles))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        item_from_row(row)
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM block_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Item {id}")));
        }
        Ok(())
    }

    async fn commit_draft(
        &self,
        id: Uuid,
        owner: Uuid,
        commit: DraftCommit,
    ) -> Result<BlockWithItems, StoreError> {
        // One transaction: an early return drops `tx`, which rolls back.
        let mut tx = self.pool.begin().await?;
        let block = update_block_in(&mut tx, id, owner, &commit.fields).await?;
        ensure_no_stranded_items(
            &mut tx,
            id,
            &block.structure,
            &commit.removed,
            &commit.readdressed,
        )
        .await?;

        if !commit.removed.is_empty() {
            let result =
                sqlx::query("DELETE FROM block_items WHERE block_id = $1 AND id = ANY($2)")
                    .bind(id)
                    .bind(&commit.removed)
                    .execute(&mut *tx)
                    .await?;
            if result.rows_affected() != commit.removed.len() as u64 {
                return Err(StoreError::NotFound(format!(
                    "{} of {} items to remove from block {id}",
                    commit.removed.len() as u64 - result.rows_affected(),
                    commit.removed.len()
                )));
            }
        }

        for r in &commit.readdressed {
            let result = sqlx::query(
                r#"
                UPDATE block_items
                SET row_index = $3, column_index = $4, updated_at = now()
                WHERE id = $1 AND block_id = $2
                "#,
            )
            .bind(r.item_id)
            .bind(id)
            .bind(to_i32(r.row_index)?)
            .bind(to_i32(r.column_index)?)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("Item {}", r.item_id)));
            }
        }

        let items = sqlx::query_as::<_, BlockItemRow>(SELECT_ITEMS)
            .bind(id)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(item_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tx.commit().await?;
        info!(
            "Committed block {id}: {} items removed, {} re-addressed",
            commit.removed.len(),
            commit.readdressed.len()
        );
        Ok(BlockWithItems { block, items })
    }
}
