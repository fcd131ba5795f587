pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::blocks::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Blocks
        .route(
            "/api/v1/blocks",
            get(handlers::handle_list_blocks).post(handlers::handle_create_block),
        )
        .route(
            "/api/v1/blocks/:id",
            get(handlers::handle_get_block)
                .patch(handlers::handle_update_block)
                .put(handlers::handle_save_draft)
                .delete(handlers::handle_delete_block),
        )
        .route("/api/v1/blocks/:id/edits", post(handlers::handle_apply_edits))
        .route("/api/v1/blocks/:id/preview", get(handlers::handle_block_preview))
        .route("/api/v1/blocks/:id/html", get(handlers::handle_block_html))
        .route("/api/v1/blocks/:id/items", post(handlers::handle_create_item))
        // Items
        .route(
            "/api/v1/items/:id",
            patch(handlers::handle_update_item).delete(handlers::handle_delete_item),
        )
        .route(
            "/api/v1/structures/validate",
            post(handlers::handle_validate_structure),
        )
        // Rendering
        .route(
            "/api/v1/render/template",
            post(handlers::handle_render_template),
        )
        .with_state(state)
}
