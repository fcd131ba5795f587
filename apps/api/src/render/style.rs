//! The one alignment/padding → CSS mapping. Both projections (preview model
//! and HTML export) take their declarations from here.

use crate::layout::{ColumnSettings, HorizontalAlign, Padding, Row, VerticalAlign};
use crate::models::block::ItemStyles;

pub const DEFAULT_FONT_SIZE: &str = "14px";
pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_FONT_WEIGHT: &str = "normal";
pub const IMAGE_MIN_HEIGHT: &str = "1.5em";

/// Ordered list of CSS declarations, rendered as an inline `style` value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Css(Vec<(&'static str, String)>);

impl Css {
    pub fn with(mut self, property: &'static str, value: impl Into<String>) -> Self {
        self.0.push((property, value.into()));
        self
    }

    #[cfg(test)]
    pub fn get(&self, property: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_inline(&self) -> String {
        self.0
            .iter()
            .map(|(p, v)| format!("{p}: {v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn padding(p: &Padding) -> String {
    format!("{}px {}px {}px {}px", p.top, p.right, p.bottom, p.left)
}

/// Cells are column flex boxes: vertical alignment packs along the main axis.
pub fn justify_content(v: VerticalAlign) -> &'static str {
    match v {
        VerticalAlign::Top => "flex-start",
        VerticalAlign::Center => "center",
        VerticalAlign::Bottom => "flex-end",
    }
}

/// Horizontal alignment packs across the cell.
pub fn align_items(h: HorizontalAlign) -> &'static str {
    match h {
        HorizontalAlign::Left => "flex-start",
        HorizontalAlign::Center => "center",
        HorizontalAlign::Right => "flex-end",
    }
}

pub fn text_align(h: HorizontalAlign) -> &'static str {
    match h {
        HorizontalAlign::Left => "left",
        HorizontalAlign::Center => "center",
        HorizontalAlign::Right => "right",
    }
}

/// User-supplied style values may not break out of their declaration.
pub fn css_value(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '"' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn css_or(value: Option<&str>, default: &str) -> String {
    value
        .map(css_value)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub fn block_style() -> Css {
    Css::default().with("width", "100%").with("box-sizing", "border-box")
}

/// Equal-width grid, one track per column, row padding outside the cells.
pub fn row_style(row: &Row) -> Css {
    Css::default()
        .with("display", "grid")
        .with(
            "grid-template-columns",
            format!("repeat({}, minmax(0, 1fr))", row.columns()),
        )
        .with("gap", "0")
        .with("padding", padding(&row.padding))
        .with("box-sizing", "border-box")
}

pub fn cell_style(settings: &ColumnSettings) -> Css {
    Css::default()
        .with("display", "flex")
        .with("flex-direction", "column")
        .with("justify-content", justify_content(settings.vertical_align))
        .with("align-items", align_items(settings.horizontal_align))
        .with("text-align", text_align(settings.horizontal_align))
        .with("padding", padding(&settings.padding))
        .with("box-sizing", "border-box")
        .with("min-width", "0")
}

/// Text follows its column's horizontal alignment; an item-level `textAlign`
/// is ignored when rendered inside a block cell.
pub fn text_item_style(styles: &ItemStyles, column: &ColumnSettings) -> Css {
    Css::default()
        .with("margin", "0")
        .with("font-size", css_or(styles.font_size.as_deref(), DEFAULT_FONT_SIZE))
        .with("color", css_or(styles.color.as_deref(), DEFAULT_COLOR))
        .with(
            "font-weight",
            css_or(styles.font_weight.as_deref(), DEFAULT_FONT_WEIGHT),
        )
        .with("text-align", text_align(column.horizontal_align))
        .with("white-space", "pre-wrap")
}

/// `min-height` keeps room for the alt text when the image fails to load,
/// whatever height the item asks for.
pub fn image_item_style(styles: &ItemStyles) -> Css {
    Css::default()
        .with("display", "block")
        .with("width", css_or(styles.width.as_deref(), "auto"))
        .with("height", css_or(styles.height.as_deref(), "auto"))
        .with("max-width", "100%")
        .with("min-height", IMAGE_MIN_HEIGHT)
}
