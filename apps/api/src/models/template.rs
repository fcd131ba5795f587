use serde::{Deserialize, Serialize};

use crate::models::block::BlockWithItems;

/// An email template as composed in the editor. Templates are persisted by
/// another service; this one only renders them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub components: Vec<EmailComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailComponent {
    pub id: String,
    #[serde(flatten)]
    pub body: ComponentBody,
    #[serde(default)]
    pub order: i64,
}

/// A `block` component holds a copy of the block and its items taken when it
/// was inserted. Later edits to the source block are not reflected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComponentBody {
    #[serde(rename_all = "camelCase")]
    Text {
        #[serde(default)]
        content: String,
        font_size: Option<String>,
        color: Option<String>,
        text_align: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        #[serde(default)]
        content: String,
        width: Option<String>,
        height: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Block { block_data: Box<BlockWithItems> },
}
