//! Static HTML export. Self-contained: inline styles only, no stylesheet, no
//! script. Nesting mirrors the preview model exactly:
//!
//! ```text
//! block div
//! └── row div (grid, row padding)        one per structure row
//!     └── cell div (flex, column padding) one per column, empty or not
//!         └── item elements               in address order
//! ```

use crate::models::block::{Block, BlockItem};
use crate::models::template::{ComponentBody, Template};
use crate::render::preview::{image_fallback, preview, BlockPreview, PreviewItem};
use crate::render::style::{css_value, Css};

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn document(title: &str, body_style: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n\
         </head>\n\
         <body style=\"{}\">\n\
         {}\
         </body>\n\
         </html>\n",
        escape_html(title),
        body_style,
        body
    )
}

/// Full HTML5 document for one block.
pub fn render_block_html(block: &Block, items: &[BlockItem]) -> String {
    document(
        &block.name,
        "margin: 0; padding: 0;",
        &render_block_fragment(block, items),
    )
}

/// The block container alone, for embedding in a larger document. Empty when
/// the structure has no rows.
pub fn render_block_fragment(block: &Block, items: &[BlockItem]) -> String {
    write_preview(&preview(block, items))
}

fn write_preview(p: &BlockPreview) -> String {
    if p.rows.is_empty() {
        return String::new();
    }
    let mut out = format!(
        "<div data-block-id=\"{}\" style=\"{}\">\n",
        p.block_id,
        escape_html(&p.style)
    );
    for row in &p.rows {
        out.push_str(&format!(
            "  <div data-row=\"{}\" style=\"{}\">\n",
            row.index,
            escape_html(&row.style)
        ));
        for cell in &row.cells {
            out.push_str(&format!(
                "    <div data-cell=\"{}-{}\" style=\"{}\">",
                cell.row,
                cell.column,
                escape_html(&cell.style)
            ));
            if !cell.items.is_empty() {
                out.push('\n');
                for item in &cell.items {
                    out.push_str("      ");
                    out.push_str(&write_item(item));
                    out.push('\n');
                }
                out.push_str("    ");
            }
            out.push_str("</div>\n");
        }
        out.push_str("  </div>\n");
    }
    out.push_str("</div>\n");
    out
}

fn write_item(item: &PreviewItem) -> String {
    match item {
        PreviewItem::Text { id, content, style } => format!(
            "<div data-item-id=\"{id}\" style=\"{}\">{}</div>",
            escape_html(style),
            escape_html(content)
        ),
        // A broken URL shows the alt text, which names the URL.
        PreviewItem::Image {
            id,
            src,
            style,
            fallback,
        } => format!(
            "<img data-item-id=\"{id}\" src=\"{}\" alt=\"{}\" style=\"{}\">",
            escape_html(src),
            escape_html(fallback),
            escape_html(style)
        ),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Template export
// ────────────────────────────────────────────────────────────────────────────

const TEMPLATE_BODY_STYLE: &str =
    "margin: 0; padding: 20px; font-family: Arial, sans-serif; background-color: #f5f5f5;";
const TEMPLATE_CARD_STYLE: &str = "max-width: 600px; margin: 0 auto; background-color: white; \
     padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);";

fn or_default(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .map(css_value)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// HTML5 export of an email template. Components render in `order`; block
/// components render from their embedded snapshot.
pub fn render_template_html(template: &Template) -> String {
    let mut components: Vec<_> = template.components.iter().collect();
    components.sort_by_key(|c| c.order);

    let mut card = String::new();
    for component in components {
        let html = match &component.body {
            ComponentBody::Text {
                content,
                font_size,
                color,
                text_align,
            } => {
                let css = Css::default()
                    .with("margin-bottom", "16px")
                    .with("font-size", or_default(font_size, "16px"))
                    .with("color", or_default(color, "#000000"))
                    .with("text-align", or_default(text_align, "left"))
                    .with("width", "100%");
                format!(
                    "<div style=\"{}\">{}</div>\n",
                    escape_html(&css.to_inline()),
                    escape_html(content)
                )
            }
            ComponentBody::Image {
                content,
                width,
                height,
            } => {
                let img_css = Css::default()
                    .with("max-width", "100%")
                    .with("width", or_default(width, "auto"))
                    .with("height", or_default(height, "auto"))
                    .with("border-radius", "4px");
                let inner = if content.trim().is_empty() {
                    "<div style=\"padding: 16px; color: #9ca3af; border: 1px dashed #d1d5db;\">Image unavailable</div>".to_string()
                } else {
                    format!(
                        "<img src=\"{}\" alt=\"{}\" style=\"{}\">",
                        escape_html(content),
                        escape_html(&image_fallback(content)),
                        escape_html(&img_css.to_inline())
                    )
                };
                format!("<div style=\"margin-bottom: 16px; width: 100%; text-align: center;\">{inner}</div>\n")
            }
            ComponentBody::Block { block_data } => format!(
                "<div style=\"margin-bottom: 16px; width: 100%;\">\n{}</div>\n",
                render_block_fragment(&block_data.block, &block_data.items)
            ),
        };
        card.push_str(&html);
    }

    document(
        &template.name,
        TEMPLATE_BODY_STYLE,
        &format!("<div style=\"{TEMPLATE_CARD_STYLE}\">\n{card}</div>\n"),
    )
}
