//! Cell-addressed item store: the flat item list of one block, queried and
//! mutated by `(row, column)` address.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::block::{BlockItem, ItemPatch, NewBlockItem};

#[derive(Debug, Error, PartialEq)]
pub enum ItemError {
    #[error("content cannot be empty")]
    EmptyContent,

    #[error("item {0} not found")]
    NotFound(Uuid),
}

/// Items at `(row, column)`, in the order they appear in `items`.
pub fn items_in_cell(items: &[BlockItem], row: usize, column: usize) -> Vec<&BlockItem> {
    items
        .iter()
        .filter(|item| item.address() == (row, column))
        .collect()
}

/// Trims content and rejects blank input.
pub fn normalize_content(content: &str) -> Result<String, ItemError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ItemError::EmptyContent);
    }
    Ok(trimmed.to_string())
}

/// Orders items by address, keeping creation order within a cell.
pub fn sort_by_address(items: &mut [BlockItem]) {
    items.sort_by_key(|item| (item.row_index, item.column_index, item.created_at));
}

#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: Vec<BlockItem>,
}

impl ItemStore {
    pub fn items(&self) -> &[BlockItem] {
        &self.items
    }

    pub fn get(&self, id: Uuid) -> Option<&BlockItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn create(&mut self, block_id: Uuid, new: NewBlockItem) -> Result<BlockItem, ItemError> {
        let content = normalize_content(&new.content)?;
        let now = Utc::now();
        let item = BlockItem {
            id: Uuid::new_v4(),
            block_id,
            row_index: new.row_index,
            column_index: new.column_index,
            kind: new.kind,
            content,
            styles: new.styles,
            created_at: now,
            updated_at: now,
        };
        self.items.push(item.clone());
        Ok(item)
    }

    pub fn update(&mut self, id: Uuid, patch: ItemPatch) -> Result<BlockItem, ItemError> {
        let content = patch.content.as_deref().map(normalize_content).transpose()?;
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(ItemError::NotFound(id))?;
        if let Some(content) = content {
            item.content = content;
        }
        if let Some(styles) = patch.styles {
            item.styles.merge(styles);
        }
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    /// Hard delete. A second call for the same id is `NotFound`.
    pub fn delete(&mut self, id: Uuid) -> Result<BlockItem, ItemError> {
        let pos = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(ItemError::NotFound(id))?;
        Ok(self.items.remove(pos))
    }

    /// Removes every item matching `predicate`, returning how many went.
    pub fn delete_where(&mut self, predicate: impl Fn(&BlockItem) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !predicate(item));
        before - self.items.len()
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut BlockItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::block::{ItemKind, ItemStyles};

    fn new_text(row: usize, column: usize, content: &str) -> NewBlockItem {
        NewBlockItem {
            row_index: row,
            column_index: column,
            kind: ItemKind::Text,
            content: content.to_string(),
            styles: ItemStyles::default(),
        }
    }

    #[test]
    fn test_create_assigns_identity_and_trims() {
        let mut store = ItemStore::default();
        let block_id = Uuid::new_v4();
        let item = store.create(block_id, new_text(0, 0, "  Hello  ")).unwrap();
        assert_eq!(item.content, "Hello");
        assert_eq!(item.block_id, block_id);
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.get(item.id), Some(&item));
    }

    #[test]
    fn test_create_rejects_whitespace_content() {
        let mut store = ItemStore::default();
        let err = store.create(Uuid::new_v4(), new_text(0, 0, " \n\t ")).unwrap_err();
        assert_eq!(err, ItemError::EmptyContent);
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_items_in_cell_keeps_insertion_order() {
        let mut store = ItemStore::default();
        let block_id = Uuid::new_v4();
        let a = store.create(block_id, new_text(0, 1, "a")).unwrap();
        store.create(block_id, new_text(0, 0, "other")).unwrap();
        let b = store.create(block_id, new_text(0, 1, "b")).unwrap();

        let cell: Vec<_> = items_in_cell(store.items(), 0, 1).iter().map(|i| i.id).collect();
        assert_eq!(cell, vec![a.id, b.id]);
        assert!(items_in_cell(store.items(), 1, 0).is_empty());
    }

    #[test]
    fn test_update_merges_styles_and_content() {
        let mut store = ItemStore::default();
        let mut new = new_text(0, 0, "Hi");
        new.styles.font_size = Some("20px".to_string());
        let item = store.create(Uuid::new_v4(), new).unwrap();

        let patch = ItemPatch {
            content: Some("Hello".to_string()),
            styles: Some(ItemStyles {
                color: Some("#333333".to_string()),
                ..ItemStyles::default()
            }),
        };
        let updated = store.update(item.id, patch).unwrap();
        assert_eq!(updated.content, "Hello");
        assert_eq!(updated.styles.font_size.as_deref(), Some("20px"));
        assert_eq!(updated.styles.color.as_deref(), Some("#333333"));
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let mut store = ItemStore::default();
        let id = Uuid::new_v4();
        assert_eq!(
            store.update(id, ItemPatch::default()).unwrap_err(),
            ItemError::NotFound(id)
        );
    }

    #[test]
    fn test_update_blank_content_leaves_item_unchanged() {
        let mut store = ItemStore::default();
        let item = store.create(Uuid::new_v4(), new_text(0, 0, "keep")).unwrap();
        let patch = ItemPatch {
            content: Some("   ".to_string()),
            styles: None,
        };
        assert_eq!(store.update(item.id, patch).unwrap_err(), ItemError::EmptyContent);
        assert_eq!(store.get(item.id).unwrap().content, "keep");
    }

    #[test]
    fn test_delete_twice_is_not_found() {
        let mut store = ItemStore::default();
        let item = store.create(Uuid::new_v4(), new_text(0, 0, "x")).unwrap();
        store.delete(item.id).unwrap();
        assert!(store.items().is_empty());
        assert_eq!(store.delete(item.id).unwrap_err(), ItemError::NotFound(item.id));
    }
}
