// Projections of a block: the interactive preview model and the static HTML
// export. Both read styles from `style`, and HTML is written from the preview.

pub mod html;
pub mod preview;
pub mod style;

pub use html::{render_block_fragment, render_block_html, render_template_html};
pub use preview::{preview, BlockPreview};
