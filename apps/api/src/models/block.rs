use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::layout::{parse_structure, LayoutError, Structure};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub structure: Structure,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Text,
    Image,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Text => "text",
            ItemKind::Image => "image",
        }
    }
}

/// Type-dependent presentation attributes. Text uses the font keys, images use
/// `width`/`height`. Keys this service does not know are carried through
/// untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStyles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemStyles {
    /// Shallow merge: keys named in `patch` replace ours, everything else stays.
    pub fn merge(&mut self, patch: ItemStyles) {
        fn take(slot: &mut Option<String>, incoming: Option<String>) {
            if incoming.is_some() {
                *slot = incoming;
            }
        }
        take(&mut self.font_size, patch.font_size);
        take(&mut self.color, patch.color);
        take(&mut self.font_weight, patch.font_weight);
        take(&mut self.text_align, patch.text_align);
        take(&mut self.width, patch.width);
        take(&mut self.height, patch.height);
        self.extra.extend(patch.extra);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockItem {
    pub id: Uuid,
    pub block_id: Uuid,
    pub row_index: usize,
    pub column_index: usize,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub content: String,
    #[serde(default)]
    pub styles: ItemStyles,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlockItem {
    pub fn address(&self) -> (usize, usize) {
        (self.row_index, self.column_index)
    }
}

/// Fields for a new item; identity and timestamps are assigned on creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBlockItem {
    pub row_index: usize,
    pub column_index: usize,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub content: String,
    #[serde(default)]
    pub styles: ItemStyles,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    pub content: Option<String>,
    pub styles: Option<ItemStyles>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockWithItems {
    #[serde(flatten)]
    pub block: Block,
    pub items: Vec<BlockItem>,
}

// ────────────────────────────────────────────────────────────────────────────
// Database rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, FromRow)]
pub struct BlockRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub structure: Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BlockRow> for Block {
    type Error = LayoutError;

    /// Stored structures are validated and resolved here, once, on load.
    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        Ok(Block {
            structure: parse_structure(&row.structure.0)?,
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BlockItemRow {
    pub id: Uuid,
    pub block_id: Uuid,
    pub row_index: i32,
    pub column_index: i32,
    pub item_type: String,
    pub content: String,
    pub styles: Json<ItemStyles>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BlockItemRow> for BlockItem {
    type Error = String;

    fn try_from(row: BlockItemRow) -> Result<Self, Self::Error> {
        let kind = match row.item_type.as_str() {
            "text" => ItemKind::Text,
            "image" => ItemKind::Image,
            other => return Err(format!("item {} has unknown type '{other}'", row.id)),
        };
        let index = |v: i32, what: &str| {
            usize::try_from(v).map_err(|_| format!("item {} has negative {what} {v}", row.id))
        };
        Ok(BlockItem {
            row_index: index(row.row_index, "row_index")?,
            column_index: index(row.column_index, "column_index")?,
            id: row.id,
            block_id: row.block_id,
            kind,
            content: row.content,
            styles: row.styles.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_styles_merge_is_shallow() {
        let mut styles: ItemStyles =
            serde_json::from_value(json!({ "fontSize": "18px", "color": "#111", "letterSpacing": "1px" }))
                .unwrap();
        let patch: ItemStyles = serde_json::from_value(json!({ "color": "#f00" })).unwrap();
        styles.merge(patch);
        assert_eq!(styles.font_size.as_deref(), Some("18px"));
        assert_eq!(styles.color.as_deref(), Some("#f00"));
        assert_eq!(styles.extra["letterSpacing"], "1px");
    }

    #[test]
    fn test_item_serializes_type_key() {
        let item = BlockItem {
            id: Uuid::new_v4(),
            block_id: Uuid::new_v4(),
            row_index: 0,
            column_index: 1,
            kind: ItemKind::Image,
            content: "http://x/y.png".to_string(),
            styles: ItemStyles::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["styles"], json!({}));
    }

    #[test]
    fn test_item_row_rejects_unknown_type() {
        let row = BlockItemRow {
            id: Uuid::new_v4(),
            block_id: Uuid::new_v4(),
            row_index: 0,
            column_index: 0,
            item_type: "video".to_string(),
            content: "x".to_string(),
            styles: Json(ItemStyles::default()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(BlockItem::try_from(row).is_err());
    }
}
