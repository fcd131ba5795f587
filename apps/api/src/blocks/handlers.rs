use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::blocks::service::{
    self, ApplyEditsRequest, CreateBlockRequest, DraftSave, EditOutcome, SaveDraftRequest,
    UpdateBlockRequest,
};
use crate::blocks::stats::BlockSummary;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::layout::validate;
use crate::models::block::{Block, BlockItem, BlockWithItems, ItemPatch, NewBlockItem};
use crate::models::template::Template;
use crate::models::user::CurrentUser;
use crate::render::{render_template_html, BlockPreview};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
}

/// GET /api/v1/blocks
pub async fn handle_list_blocks(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<BlockSummary>>, AppError> {
    let blocks = service::list_blocks(state.store.as_ref(), user.id, params.q.as_deref()).await?;
    Ok(Json(blocks))
}

/// POST /api/v1/blocks
pub async fn handle_create_block(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<CreateBlockRequest>,
) -> Result<(StatusCode, Json<Block>), AppError> {
    let block = service::create_block(state.store.as_ref(), user.id, req).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

/// GET /api/v1/blocks/:id
pub async fn handle_get_block(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BlockWithItems>, AppError> {
    let block = service::get_block_with_items(state.store.as_ref(), user.id, id).await?;
    Ok(Json(block))
}

/// PATCH /api/v1/blocks/:id
pub async fn handle_update_block(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateBlockRequest>,
) -> Result<Json<Block>, AppError> {
    let block = service::update_block(state.store.as_ref(), user.id, id, req).await?;
    Ok(Json(block))
}

/// PUT /api/v1/blocks/:id
pub async fn handle_save_draft(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<SaveDraftRequest>,
) -> Result<Json<BlockWithItems>, AppError> {
    let draft = DraftSave::try_from(req)?;
    let saved =
        service::save_draft(state.store.as_ref(), &state.saves, user.id, id, draft).await?;
    Ok(Json(saved))
}

/// DELETE /api/v1/blocks/:id
pub async fn handle_delete_block(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_block(state.store.as_ref(), user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/blocks/:id/edits
pub async fn handle_apply_edits(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<ApplyEditsRequest>,
) -> Result<Json<EditOutcome>, AppError> {
    let outcome =
        service::apply_edits(state.store.as_ref(), &state.saves, user.id, id, req).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/blocks/:id/preview
pub async fn handle_block_preview(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<BlockPreview>, AppError> {
    let preview = service::block_preview(state.store.as_ref(), user.id, id).await?;
    Ok(Json(preview))
}

/// GET /api/v1/blocks/:id/html
pub async fn handle_block_html(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let html = service::block_html(state.store.as_ref(), user.id, id).await?;
    let disposition = format!("inline; filename=\"block-{id}.html\"");
    Ok(([(header::CONTENT_DISPOSITION, disposition)], Html(html)))
}

/// POST /api/v1/blocks/:id/items
pub async fn handle_create_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(block_id): Path<Uuid>,
    AppJson(req): AppJson<NewBlockItem>,
) -> Result<(StatusCode, Json<BlockItem>), AppError> {
    let item = service::create_item(state.store.as_ref(), user.id, block_id, req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PATCH /api/v1/items/:id
pub async fn handle_update_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<ItemPatch>,
) -> Result<Json<BlockItem>, AppError> {
    let item = service::update_item(state.store.as_ref(), user.id, id, req).await?;
    Ok(Json(item))
}

/// DELETE /api/v1/items/:id
pub async fn handle_delete_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_item(state.store.as_ref(), user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/render/template
///
/// Templates arrive whole from the caller; block components carry their own
/// snapshot, so nothing is read from the store.
pub async fn handle_render_template(
    _user: CurrentUser,
    AppJson(template): AppJson<Template>,
) -> Html<String> {
    Html(render_template_html(&template))
}

/// POST /api/v1/structures/validate
///
/// Lets the editor check a structure before saving it. A structure with no
/// rows is well-formed here but is still refused on save.
pub async fn handle_validate_structure(
    _user: CurrentUser,
    AppJson(structure): AppJson<Value>,
) -> Json<Value> {
    Json(json!({ "valid": validate(&structure) }))
}
