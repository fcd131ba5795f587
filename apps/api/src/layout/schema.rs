//! Stored (JSON) shape of a block structure and its resolution into the
//! canonical `Structure`.
//!
//! Two generations of rows exist in storage:
//! - legacy rows carry only `columns` and a row-wide `alignment`;
//! - current rows add `padding` and a `columnSettings` list.
//!
//! Both are accepted on load. Only `columns` and the row `alignment` are
//! checked; every other field is optional, and one of the wrong shape falls
//! back to its default. The row is resolved exactly once into one
//! `ColumnSettings` entry per column. Writes always emit the current shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::layout::structure::{
    ColumnCount, ColumnSettings, HorizontalAlign, LayoutError, Padding, Row, Structure,
    VerticalAlign,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredStructure {
    pub rows: Vec<StoredRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRow {
    pub columns: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<HorizontalAlign>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub padding: Option<StoredPadding>,
    #[serde(
        default,
        deserialize_with = "lenient_settings",
        skip_serializing_if = "Option::is_none"
    )]
    pub column_settings: Option<Vec<StoredColumnSettings>>,
}

/// Lenient padding: missing or non-numeric sides are zero, fractions round,
/// negative sides clamp to zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredPadding {
    #[serde(deserialize_with = "lenient_px")]
    pub top: i64,
    #[serde(deserialize_with = "lenient_px")]
    pub right: i64,
    #[serde(deserialize_with = "lenient_px")]
    pub bottom: i64,
    #[serde(deserialize_with = "lenient_px")]
    pub left: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredColumnSettings {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub horizontal_align: Option<HorizontalAlign>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<VerticalAlign>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub padding: Option<StoredPadding>,
}

/// An optional field whose value has the wrong shape reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A settings list that is not a list is absent; an entry that is not an
/// object is a default column.
fn lenient_settings<'de, D>(deserializer: D) -> Result<Option<Vec<StoredColumnSettings>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_array().map(|entries| {
        entries
            .iter()
            .map(|entry| serde_json::from_value(entry.clone()).unwrap_or_default())
            .collect()
    }))
}

fn lenient_px<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
        .unwrap_or(0))
}

/// Which generation a stored row belongs to.
#[derive(Debug)]
enum ColumnLayout<'a> {
    Legacy(HorizontalAlign),
    Explicit(&'a [StoredColumnSettings]),
}

impl StoredRow {
    fn layout(&self) -> ColumnLayout<'_> {
        match &self.column_settings {
            Some(settings) => ColumnLayout::Explicit(settings),
            None => ColumnLayout::Legacy(self.alignment.unwrap_or_default()),
        }
    }

    fn resolve(&self) -> Result<Row, LayoutError> {
        let count = ColumnCount::new(i64::from(self.columns))?;
        let mut settings: Vec<ColumnSettings> = match self.layout() {
            // A legacy row-wide alignment becomes each column's horizontal alignment.
            ColumnLayout::Legacy(alignment) => vec![
                ColumnSettings {
                    horizontal_align: alignment,
                    ..ColumnSettings::default()
                };
                count.get()
            ],
            ColumnLayout::Explicit(stored) => stored.iter().map(StoredColumnSettings::resolve).collect(),
        };
        settings.resize(count.get(), ColumnSettings::default());

        Row::with_columns(
            self.alignment.unwrap_or_default(),
            self.padding.map(StoredPadding::resolve).unwrap_or_default(),
            settings,
        )
    }
}

impl StoredPadding {
    fn resolve(self) -> Padding {
        Padding {
            top: clamp_px(self.top),
            right: clamp_px(self.right),
            bottom: clamp_px(self.bottom),
            left: clamp_px(self.left),
        }
    }
}

impl From<Padding> for StoredPadding {
    fn from(p: Padding) -> Self {
        Self {
            top: i64::from(p.top),
            right: i64::from(p.right),
            bottom: i64::from(p.bottom),
            left: i64::from(p.left),
        }
    }
}

impl StoredColumnSettings {
    fn resolve(&self) -> ColumnSettings {
        ColumnSettings {
            horizontal_align: self.horizontal_align.unwrap_or_default(),
            vertical_align: self.vertical_align.unwrap_or_default(),
            padding: self.padding.map(StoredPadding::resolve).unwrap_or_default(),
        }
    }
}

fn clamp_px(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

impl TryFrom<StoredStructure> for Structure {
    type Error = LayoutError;

    fn try_from(stored: StoredStructure) -> Result<Self, Self::Error> {
        let rows = stored
            .rows
            .iter()
            .map(StoredRow::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Structure { rows })
    }
}

impl From<Structure> for StoredStructure {
    fn from(structure: Structure) -> Self {
        let rows = structure
            .rows
            .iter()
            .map(|row| StoredRow {
                columns: row.columns() as u8,
                alignment: Some(row.alignment),
                padding: Some(row.padding.into()),
                column_settings: Some(
                    row.column_settings()
                        .iter()
                        .map(|c| StoredColumnSettings {
                            horizontal_align: Some(c.horizontal_align),
                            vertical_align: Some(c.vertical_align),
                            padding: Some(c.padding.into()),
                        })
                        .collect(),
                ),
            })
            .collect();
        StoredStructure { rows }
    }
}

/// Parses an untrusted JSON value into a canonical structure.
pub fn parse_structure(value: &Value) -> Result<Structure, LayoutError> {
    let stored: StoredStructure =
        serde_json::from_value(value.clone()).map_err(|e| LayoutError::Schema(e.to_string()))?;
    Structure::try_from(stored)
}

/// True iff `rows` is a list and every row has an integer `columns` in
/// 1..=12 and, when present, a known `alignment`. Nothing else is looked at;
/// whatever passes here also parses.
pub fn validate(value: &Value) -> bool {
    let Some(rows) = value.get("rows").and_then(Value::as_array) else {
        return false;
    };
    rows.iter().all(|row| {
        let columns = row
            .get("columns")
            .and_then(Value::as_i64)
            .is_some_and(|n| ColumnCount::new(n).is_ok());
        let alignment = match row.get("alignment") {
            None | Some(Value::Null) => true,
            Some(a) => HorizontalAlign::deserialize(a).is_ok(),
        };
        columns && alignment
    })
}
