//! Structural editing engine.
//!
//! Every operation takes a `BlockDraft` by value and returns the next draft.
//! Structure and items change together, so no caller can observe a grid whose
//! items point at cells that no longer exist. Out-of-range indices are no-ops;
//! value-range checks happen in `EditOp::resolve` before a draft is touched.

use serde::{Deserialize, Serialize};

use crate::layout::structure::{
    ColumnCount, HorizontalAlign, LayoutError, Row, Side, Structure, VerticalAlign,
};
use crate::models::block::{Block, BlockItem, BlockWithItems};

/// In-memory working copy of a block: everything a save commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDraft {
    pub name: String,
    pub description: String,
    pub structure: Structure,
    pub items: Vec<BlockItem>,
}

impl From<BlockWithItems> for BlockDraft {
    fn from(loaded: BlockWithItems) -> Self {
        let Block {
            name,
            description,
            structure,
            ..
        } = loaded.block;
        Self {
            name,
            description,
            structure,
            items: loaded.items,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Index remapping
// ────────────────────────────────────────────────────────────────────────────

/// Where `index` lands after the element at `from` is moved to `to` and the
/// range in between shifts by one to close the gap.
fn shifted(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < to && index > from && index <= to {
        index - 1
    } else if to < from && index >= to && index < from {
        index + 1
    } else {
        index
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Row operations
// ────────────────────────────────────────────────────────────────────────────

/// Appends a one-column row. Existing addresses are unaffected.
pub fn add_row(mut draft: BlockDraft) -> BlockDraft {
    draft.structure.rows.push(Row::default());
    draft
}

/// Removes a row, dropping its items and pulling later rows up by one.
/// The last remaining row is never removed.
pub fn remove_row(mut draft: BlockDraft, row: usize) -> BlockDraft {
    if draft.structure.rows.len() <= 1 || row >= draft.structure.rows.len() {
        return draft;
    }
    draft.structure.rows.remove(row);
    draft.items.retain(|item| item.row_index != row);
    for item in &mut draft.items {
        if item.row_index > row {
            item.row_index -= 1;
        }
    }
    draft
}

/// Resizes a row's columns. Items in cells that disappear are dropped.
pub fn set_row_columns(mut draft: BlockDraft, row: usize, columns: ColumnCount) -> BlockDraft {
    let Some(target) = draft.structure.rows.get_mut(row) else {
        return draft;
    };
    target.resize(columns);
    let width = columns.get();
    draft
        .items
        .retain(|item| item.row_index != row || item.column_index < width);
    draft
}

pub fn move_row(mut draft: BlockDraft, from: usize, to: usize) -> BlockDraft {
    let len = draft.structure.rows.len();
    if from == to || from >= len || to >= len {
        return draft;
    }
    let moved = draft.structure.rows.remove(from);
    draft.structure.rows.insert(to, moved);
    for item in &mut draft.items {
        item.row_index = shifted(item.row_index, from, to);
    }
    draft
}

pub fn set_row_padding(mut draft: BlockDraft, row: usize, side: Side, value: i64) -> BlockDraft {
    if let Some(target) = draft.structure.rows.get_mut(row) {
        target.padding.set(side, value);
    }
    draft
}

// ────────────────────────────────────────────────────────────────────────────
// Column operations
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAlign {
    Horizontal(HorizontalAlign),
    Vertical(VerticalAlign),
}

pub fn set_column_alignment(
    mut draft: BlockDraft,
    row: usize,
    column: usize,
    align: ColumnAlign,
) -> BlockDraft {
    let Some(settings) = draft
        .structure
        .rows
        .get_mut(row)
        .and_then(|r| r.column_mut(column))
    else {
        return draft;
    };
    match align {
        ColumnAlign::Horizontal(value) => settings.horizontal_align = value,
        ColumnAlign::Vertical(value) => settings.vertical_align = value,
    }
    draft
}

pub fn set_column_padding(
    mut draft: BlockDraft,
    row: usize,
    column: usize,
    side: Side,
    value: i64,
) -> BlockDraft {
    if let Some(settings) = draft
        .structure
        .rows
        .get_mut(row)
        .and_then(|r| r.column_mut(column))
    {
        settings.padding.set(side, value);
    }
    draft
}

/// Moves a column within one row; items in other rows keep their addresses.
pub fn move_column(mut draft: BlockDraft, row: usize, from: usize, to: usize) -> BlockDraft {
    let Some(target) = draft.structure.rows.get_mut(row) else {
        return draft;
    };
    let width = target.columns();
    if from == to || from >= width || to >= width {
        return draft;
    }
    target.move_column(from, to);
    for item in draft.items.iter_mut().filter(|i| i.row_index == row) {
        item.column_index = shifted(item.column_index, from, to);
    }
    draft
}

// ────────────────────────────────────────────────────────────────────────────
// Serializable edit requests
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// An edit as sent by the editor UI. Unchecked until `resolve`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    AddRow,
    RemoveRow {
        row: usize,
    },
    SetRowColumns {
        row: usize,
        columns: i64,
    },
    SetColumnAlignment {
        row: usize,
        column: usize,
        axis: Axis,
        value: String,
    },
    SetRowPadding {
        row: usize,
        side: Side,
        value: i64,
    },
    SetColumnPadding {
        row: usize,
        column: usize,
        side: Side,
        value: i64,
    },
    MoveRow {
        from: usize,
        to: usize,
    },
    MoveColumn {
        row: usize,
        from: usize,
        to: usize,
    },
}

/// A checked edit. Applying it cannot fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edit {
    AddRow,
    RemoveRow { row: usize },
    SetRowColumns { row: usize, columns: ColumnCount },
    SetColumnAlignment { row: usize, column: usize, align: ColumnAlign },
    SetRowPadding { row: usize, side: Side, value: i64 },
    SetColumnPadding { row: usize, column: usize, side: Side, value: i64 },
    MoveRow { from: usize, to: usize },
    MoveColumn { row: usize, from: usize, to: usize },
}

impl EditOp {
    pub fn resolve(self) -> Result<Edit, LayoutError> {
        Ok(match self {
            EditOp::AddRow => Edit::AddRow,
            EditOp::RemoveRow { row } => Edit::RemoveRow { row },
            EditOp::SetRowColumns { row, columns } => Edit::SetRowColumns {
                row,
                columns: ColumnCount::new(columns)?,
            },
            EditOp::SetColumnAlignment {
                row,
                column,
                axis,
                value,
            } => Edit::SetColumnAlignment {
                row,
                column,
                align: parse_align(axis, &value)?,
            },
            EditOp::SetRowPadding { row, side, value } => Edit::SetRowPadding { row, side, value },
            EditOp::SetColumnPadding {
                row,
                column,
                side,
                value,
            } => Edit::SetColumnPadding {
                row,
                column,
                side,
                value,
            },
            EditOp::MoveRow { from, to } => Edit::MoveRow { from, to },
            EditOp::MoveColumn { row, from, to } => Edit::MoveColumn { row, from, to },
        })
    }
}

fn parse_align(axis: Axis, value: &str) -> Result<ColumnAlign, LayoutError> {
    let quoted = serde_json::Value::String(value.to_string());
    let bad = |_| LayoutError::Schema(format!("'{value}' is not a valid {axis:?} alignment"));
    Ok(match axis {
        Axis::Horizontal => ColumnAlign::Horizontal(serde_json::from_value(quoted).map_err(bad)?),
        Axis::Vertical => ColumnAlign::Vertical(serde_json::from_value(quoted).map_err(bad)?),
    })
}

impl Edit {
    pub fn apply(self, draft: BlockDraft) -> BlockDraft {
        match self {
            Edit::AddRow => add_row(draft),
            Edit::RemoveRow { row } => remove_row(draft, row),
            Edit::SetRowColumns { row, columns } => set_row_columns(draft, row, columns),
            Edit::SetColumnAlignment { row, column, align } => {
                set_column_alignment(draft, row, column, align)
            }
            Edit::SetRowPadding { row, side, value } => set_row_padding(draft, row, side, value),
            Edit::SetColumnPadding {
                row,
                column,
                side,
                value,
            } => set_column_padding(draft, row, column, side, value),
            Edit::MoveRow { from, to } => move_row(draft, from, to),
            Edit::MoveColumn { row, from, to } => move_column(draft, row, from, to),
        }
    }
}

/// Checks every op first, then applies them in order. On error the input
/// draft is returned untouched alongside the error.
pub fn apply_all(
    draft: BlockDraft,
    ops: Vec<EditOp>,
) -> Result<BlockDraft, (BlockDraft, LayoutError)> {
    let mut edits = Vec::with_capacity(ops.len());
    for op in ops {
        match op.resolve() {
            Ok(edit) => edits.push(edit),
            Err(e) => return Err((draft, e)),
        }
    }
    Ok(edits.into_iter().fold(draft, |d, edit| edit.apply(d)))
}

/// True when every item addresses an existing cell.
pub fn items_fit(structure: &Structure, items: &[BlockItem]) -> bool {
    items
        .iter()
        .all(|item| structure.has_cell(item.row_index, item.column_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::structure::{create_default, ColumnSettings, Padding};
    use crate::models::block::{ItemKind, ItemStyles};
    use chrono::Utc;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn row(columns: usize, alignment: HorizontalAlign) -> Row {
        Row::with_columns(alignment, Padding::default(), vec![ColumnSettings::default(); columns])
            .unwrap()
    }

    fn item(row: usize, column: usize, kind: ItemKind, content: &str) -> BlockItem {
        BlockItem {
            id: Uuid::new_v4(),
            block_id: Uuid::nil(),
            row_index: row,
            column_index: column,
            kind,
            content: content.to_string(),
            styles: ItemStyles::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Rows A, B, C tagged by legacy alignment so they can be told apart.
    fn abc_draft() -> BlockDraft {
        BlockDraft {
            name: "abc".to_string(),
            description: String::new(),
            structure: Structure {
                rows: vec![
                    row(1, HorizontalAlign::Left),
                    row(2, HorizontalAlign::Center),
                    row(3, HorizontalAlign::Right),
                ],
            },
            items: vec![
                item(0, 0, ItemKind::Text, "a"),
                item(1, 1, ItemKind::Text, "b"),
                item(2, 2, ItemKind::Text, "c"),
            ],
        }
    }

    fn tags(draft: &BlockDraft) -> Vec<HorizontalAlign> {
        draft.structure.rows.iter().map(|r| r.alignment).collect()
    }

    fn find<'a>(draft: &'a BlockDraft, content: &str) -> Option<&'a BlockItem> {
        draft.items.iter().find(|i| i.content == content)
    }

    use HorizontalAlign::{Center as B, Left as A, Right as C};

    #[test]
    fn test_add_row_appends_single_column() {
        let before = abc_draft();
        let draft = add_row(before.clone());
        assert_eq!(draft.structure.rows.len(), 4);
        assert_eq!(draft.structure.rows[3], Row::default());
        assert_eq!(draft.items, before.items);
    }

    #[test]
    fn test_remove_middle_row_shifts_later_items() {
        let draft = remove_row(abc_draft(), 1);
        assert_eq!(tags(&draft), vec![A, C]);
        assert!(find(&draft, "b").is_none());
        assert_eq!(find(&draft, "a").unwrap().address(), (0, 0));
        assert_eq!(find(&draft, "c").unwrap().address(), (1, 2));
    }

    #[test]
    fn test_remove_last_remaining_row_is_noop() {
        let mut draft = abc_draft();
        draft.structure = create_default();
        draft.items = vec![item(0, 0, ItemKind::Text, "only")];
        let after = remove_row(draft.clone(), 0);
        assert_eq!(after, draft);
    }

    #[test]
    fn test_remove_row_out_of_range_is_noop() {
        let d = abc_draft();
        assert_eq!(remove_row(d.clone(), 9), d);
    }

    #[test]
    fn test_set_row_columns_drops_orphaned_items() {
        let mut draft = abc_draft();
        draft.structure = Structure {
            rows: vec![row(2, A)],
        };
        draft.items = vec![
            item(0, 0, ItemKind::Text, "Hello"),
            item(0, 1, ItemKind::Image, "http://x/y.png"),
        ];
        let draft = set_row_columns(draft, 0, ColumnCount::new(1).unwrap());
        assert_eq!(draft.structure.rows[0].columns(), 1);
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].content, "Hello");
        assert_eq!(draft.items[0].column_index, 0);
    }

    #[test]
    fn test_set_row_columns_leaves_other_rows_alone() {
        let draft = set_row_columns(abc_draft(), 1, ColumnCount::new(1).unwrap());
        assert!(find(&draft, "b").is_none());
        assert_eq!(find(&draft, "c").unwrap().address(), (2, 2));
        assert_eq!(draft.structure.rows[2].columns(), 3);
    }

    #[test]
    fn test_grow_columns_fills_defaults() {
        let draft = set_column_alignment(
            abc_draft(),
            0,
            0,
            ColumnAlign::Horizontal(HorizontalAlign::Center),
        );
        let draft = set_row_columns(draft, 0, ColumnCount::new(4).unwrap());
        let settings = draft.structure.rows[0].column_settings();
        assert_eq!(settings.len(), 4);
        assert_eq!(settings[0].horizontal_align, HorizontalAlign::Center);
        assert_eq!(settings[3], ColumnSettings::default());
    }

    #[test]
    fn test_move_row_forward() {
        let draft = move_row(abc_draft(), 0, 2);
        assert_eq!(tags(&draft), vec![B, C, A]);
        assert_eq!(find(&draft, "a").unwrap().row_index, 2);
        assert_eq!(find(&draft, "b").unwrap().row_index, 0);
        assert_eq!(find(&draft, "c").unwrap().row_index, 1);
        assert!(items_fit(&draft.structure, &draft.items));
    }

    #[test]
    fn test_move_row_backward() {
        let draft = move_row(abc_draft(), 2, 0);
        assert_eq!(tags(&draft), vec![C, A, B]);
        assert_eq!(find(&draft, "c").unwrap().row_index, 0);
        assert_eq!(find(&draft, "a").unwrap().row_index, 1);
        assert_eq!(find(&draft, "b").unwrap().row_index, 2);
    }

    #[test]
    fn test_move_row_out_of_bounds_is_noop() {
        let d = abc_draft();
        assert_eq!(move_row(d.clone(), 1, 1), d);
        assert_eq!(move_row(d.clone(), 0, 3), d);
        assert_eq!(move_row(d.clone(), 7, 0), d);
    }

    #[test]
    fn test_move_column_only_touches_that_row() {
        let mut draft = abc_draft();
        draft.items.push(item(2, 0, ItemKind::Text, "c0"));
        draft.items.push(item(1, 0, ItemKind::Text, "b0"));
        let draft = set_column_alignment(
            draft,
            2,
            2,
            ColumnAlign::Vertical(VerticalAlign::Bottom),
        );
        let draft = move_column(draft, 2, 2, 0);

        assert_eq!(find(&draft, "c").unwrap().address(), (2, 0));
        assert_eq!(find(&draft, "c0").unwrap().address(), (2, 1));
        assert_eq!(find(&draft, "b0").unwrap().address(), (1, 0));
        assert_eq!(
            draft.structure.rows[2].column(0).unwrap().vertical_align,
            VerticalAlign::Bottom
        );
    }

    #[test]
    fn test_move_column_out_of_range_is_noop() {
        let d = abc_draft();
        assert_eq!(move_column(d.clone(), 1, 0, 2), d);
        assert_eq!(move_column(d.clone(), 5, 0, 1), d);
    }

    #[test]
    fn test_padding_edits_clamp_negative() {
        let before = abc_draft();
        let draft = set_row_padding(before.clone(), 0, Side::Top, -5);
        let draft = set_row_padding(draft, 0, Side::Left, 16);
        let draft = set_column_padding(draft, 1, 1, Side::Bottom, 8);
        assert_eq!(draft.structure.rows[0].padding.top, 0);
        assert_eq!(draft.structure.rows[0].padding.left, 16);
        assert_eq!(draft.structure.rows[1].column(1).unwrap().padding.bottom, 8);
        assert_eq!(draft.items, before.items);
    }

    #[test]
    fn test_set_column_alignment_unknown_column_is_noop() {
        let d = abc_draft();
        let after = set_column_alignment(d.clone(), 0, 3, ColumnAlign::Horizontal(HorizontalAlign::Right));
        assert_eq!(after, d);
    }

    #[test]
    fn test_resolve_rejects_bad_column_count() {
        let op = EditOp::SetRowColumns { row: 0, columns: 13 };
        assert_eq!(op.resolve().unwrap_err(), LayoutError::ColumnsOutOfRange(13));
    }

    #[test]
    fn test_resolve_rejects_wrong_axis_value() {
        let op = EditOp::SetColumnAlignment {
            row: 0,
            column: 0,
            axis: Axis::Vertical,
            value: "left".to_string(),
        };
        assert!(matches!(op.resolve(), Err(LayoutError::Schema(_))));
    }

    #[test]
    fn test_apply_all_returns_original_on_error() {
        let ops: Vec<EditOp> = serde_json::from_value(serde_json::json!([
            { "op": "add_row" },
            { "op": "set_row_columns", "row": 0, "columns": 0 }
        ]))
        .unwrap();
        let before = abc_draft();
        let (draft, err) = apply_all(before.clone(), ops).unwrap_err();
        assert_eq!(draft, before);
        assert_eq!(err, LayoutError::ColumnsOutOfRange(0));
    }

    #[test]
    fn test_apply_all_runs_in_order() {
        let ops: Vec<EditOp> = serde_json::from_value(serde_json::json!([
            { "op": "add_row" },
            { "op": "set_row_columns", "row": 3, "columns": 4 },
            { "op": "set_column_alignment", "row": 3, "column": 2, "axis": "horizontal", "value": "right" },
            { "op": "move_row", "from": 3, "to": 0 }
        ]))
        .unwrap();
        let draft = apply_all(abc_draft(), ops).unwrap();
        assert_eq!(draft.structure.rows[0].columns(), 4);
        assert_eq!(
            draft.structure.rows[0].column(2).unwrap().horizontal_align,
            HorizontalAlign::Right
        );
        assert_eq!(find(&draft, "a").unwrap().row_index, 1);
        assert!(items_fit(&draft.structure, &draft.items));
    }

    // ── properties ──────────────────────────────────────────────────────────

    fn arb_draft() -> impl Strategy<Value = BlockDraft> {
        prop::collection::vec(1usize..=12, 1..6).prop_flat_map(|widths| {
            let cells: Vec<(usize, usize)> = widths
                .iter()
                .enumerate()
                .flat_map(|(r, &w)| (0..w).map(move |c| (r, c)))
                .collect();
            let widths_for_rows = widths.clone();
            prop::collection::vec(prop::sample::select(cells), 0..20).prop_map(move |addrs| {
                BlockDraft {
                    name: "p".to_string(),
                    description: String::new(),
                    structure: Structure {
                        rows: widths_for_rows.iter().map(|&w| row(w, A)).collect(),
                    },
                    items: addrs
                        .into_iter()
                        .enumerate()
                        .map(|(n, (r, c))| item(r, c, ItemKind::Text, &n.to_string()))
                        .collect(),
                }
            })
        })
    }

    proptest! {
        #[test]
        fn prop_set_row_columns_keeps_settings_in_step(draft in arb_draft(), r in 0usize..6, n in 1i64..=12) {
            let before = draft.clone();
            let after = set_row_columns(draft, r, ColumnCount::new(n).unwrap());
            if r < after.structure.rows.len() {
                prop_assert_eq!(after.structure.rows[r].column_settings().len(), n as usize);
            }
            for old in &before.items {
                let kept = after.items.iter().find(|i| i.id == old.id);
                if old.row_index == r && old.column_index >= n as usize {
                    prop_assert!(kept.is_none());
                } else {
                    prop_assert_eq!(kept.map(BlockItem::address), Some(old.address()));
                }
            }
            prop_assert!(items_fit(&after.structure, &after.items));
        }

        #[test]
        fn prop_remove_row_never_dangles(draft in arb_draft(), r in 0usize..6) {
            let rows = draft.structure.rows.len();
            let after = remove_row(draft, r);
            prop_assert!(!after.structure.rows.is_empty());
            if rows > 1 && r < rows {
                prop_assert_eq!(after.structure.rows.len(), rows - 1);
            }
            prop_assert!(items_fit(&after.structure, &after.items));
        }

        #[test]
        fn prop_move_row_is_a_permutation(draft in arb_draft(), from in 0usize..6, to in 0usize..6) {
            let before = draft.clone();
            let after = move_row(draft, from, to);
            prop_assert_eq!(after.items.len(), before.items.len());
            prop_assert!(items_fit(&after.structure, &after.items));
            // Each item still sits in a row with the same shape it started in.
            for (old, new) in before.items.iter().zip(&after.items) {
                prop_assert_eq!(
                    &before.structure.rows[old.row_index],
                    &after.structure.rows[new.row_index]
                );
                prop_assert_eq!(old.column_index, new.column_index);
            }
        }

        #[test]
        fn prop_move_row_there_and_back(draft in arb_draft(), from in 0usize..6, to in 0usize..6) {
            let back = move_row(move_row(draft.clone(), from, to), to, from);
            prop_assert_eq!(back, draft);
        }

        #[test]
        fn prop_move_column_keeps_items_valid(draft in arb_draft(), r in 0usize..6, from in 0usize..12, to in 0usize..12) {
            let before = draft.clone();
            let after = move_column(draft, r, from, to);
            prop_assert_eq!(after.items.len(), before.items.len());
            prop_assert!(items_fit(&after.structure, &after.items));
            for (old, new) in before.items.iter().zip(&after.items) {
                prop_assert_eq!(old.row_index, new.row_index);
                if old.row_index != r {
                    prop_assert_eq!(old.column_index, new.column_index);
                }
            }
        }
    }
}
