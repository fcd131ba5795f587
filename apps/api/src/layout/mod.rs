// Block layout model: row/column grid, cell-addressed items, structural edits.
// Everything here is synchronous and side-effect free; persistence lives in
// `store`, projections in `render`.

pub mod cells;
pub mod editor;
pub mod schema;
pub mod structure;

pub use cells::{items_in_cell, ItemError, ItemStore};
pub use editor::{apply_all, items_fit, BlockDraft, EditOp};
pub use schema::{parse_structure, validate};
pub use structure::{
    cell_index, create_default, total_cells, ColumnSettings, HorizontalAlign, LayoutError,
    Padding, Row, Structure, VerticalAlign,
};
