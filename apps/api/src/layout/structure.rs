//! Canonical block grid: rows of equal-width columns, each column carrying its
//! own alignment and padding.
//!
//! A `Row` owns its column settings directly, so the column count is always
//! `column_settings.len()` and can never drift from it. Legacy stored shapes
//! are resolved into this form once, at the persistence boundary (see
//! `layout::schema`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::schema::StoredStructure;

pub const MIN_COLUMNS: u8 = 1;
pub const MAX_COLUMNS: u8 = 12;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("columns must be an integer between {MIN_COLUMNS} and {MAX_COLUMNS}, got {0}")]
    ColumnsOutOfRange(i64),

    #[error("structure must contain at least one row")]
    NoRows,

    #[error("invalid structure: {0}")]
    Schema(String),

    #[error("cell ({row}, {column}) does not exist")]
    NoSuchCell { row: usize, column: usize },
}

// ────────────────────────────────────────────────────────────────────────────
// Value types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

/// Pixel padding, CSS order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Padding {
    /// Sets one side. Negative inputs clamp to zero.
    pub fn set(&mut self, side: Side, value: i64) {
        let px = value.clamp(0, i64::from(u32::MAX)) as u32;
        match side {
            Side::Top => self.top = px,
            Side::Right => self.right = px,
            Side::Bottom => self.bottom = px,
            Side::Left => self.left = px,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSettings {
    pub horizontal_align: HorizontalAlign,
    pub vertical_align: VerticalAlign,
    pub padding: Padding,
}

/// A column count already checked against `MIN_COLUMNS..=MAX_COLUMNS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnCount(u8);

impl ColumnCount {
    pub fn new(value: i64) -> Result<Self, LayoutError> {
        if (i64::from(MIN_COLUMNS)..=i64::from(MAX_COLUMNS)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(LayoutError::ColumnsOutOfRange(value))
        }
    }

    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Row / Structure
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Legacy row-wide alignment. Persisted for older readers only; rendering
    /// reads column settings.
    pub alignment: HorizontalAlign,
    pub padding: Padding,
    column_settings: Vec<ColumnSettings>,
}

impl Default for Row {
    fn default() -> Self {
        Self {
            alignment: HorizontalAlign::Left,
            padding: Padding::default(),
            column_settings: vec![ColumnSettings::default()],
        }
    }
}

impl Row {
    pub fn with_columns(
        alignment: HorizontalAlign,
        padding: Padding,
        column_settings: Vec<ColumnSettings>,
    ) -> Result<Self, LayoutError> {
        ColumnCount::new(column_settings.len() as i64)?;
        Ok(Self {
            alignment,
            padding,
            column_settings,
        })
    }

    pub fn columns(&self) -> usize {
        self.column_settings.len()
    }

    pub fn column_settings(&self) -> &[ColumnSettings] {
        &self.column_settings
    }

    pub fn column(&self, index: usize) -> Option<&ColumnSettings> {
        self.column_settings.get(index)
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut ColumnSettings> {
        self.column_settings.get_mut(index)
    }

    /// Resizes to `count` columns, keeping existing settings by index and
    /// filling new slots with defaults.
    pub fn resize(&mut self, count: ColumnCount) {
        self.column_settings
            .resize(count.get(), ColumnSettings::default());
    }

    pub(crate) fn move_column(&mut self, from: usize, to: usize) {
        let settings = self.column_settings.remove(from);
        self.column_settings.insert(to, settings);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredStructure", into = "StoredStructure")]
pub struct Structure {
    pub rows: Vec<Row>,
}

impl Default for Structure {
    fn default() -> Self {
        create_default()
    }
}

impl Structure {
    pub fn has_cell(&self, row: usize, column: usize) -> bool {
        self.rows.get(row).is_some_and(|r| column < r.columns())
    }
}

/// One row, one column, left aligned, no padding.
pub fn create_default() -> Structure {
    Structure {
        rows: vec![Row::default()],
    }
}

/// Sum of column counts over all rows. Display statistic only.
pub fn total_cells(structure: &Structure) -> usize {
    structure.rows.iter().map(Row::columns).sum()
}

/// Row-major linear index of a cell, or `None` when the address is outside the
/// grid. For stats and debugging; storage keys use the `(row, column)` pair.
pub fn cell_index(structure: &Structure, row: usize, column: usize) -> Option<usize> {
    if !structure.has_cell(row, column) {
        return None;
    }
    let preceding: usize = structure.rows[..row].iter().map(Row::columns).sum();
    Some(preceding + column)
}
