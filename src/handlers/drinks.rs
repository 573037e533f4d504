use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::database::models::Drink;
use crate::error::ApiError;
use crate::AppState;

/// Request body for POST and PATCH. Both fields are optional; no validation
/// happens here beyond JSON deserialization, missing values are passed to the
/// store and rejected only by its own constraints.
#[derive(Debug, Default, Deserialize)]
pub struct DrinkPayload {
    pub title: Option<String>,
    pub recipe: Option<Value>,
}

/// GET /drinks - public listing, short projection.
pub async fn list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let drinks = state.store.list().await?;
    let drinks = drinks
        .iter()
        .map(Drink::short)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            warn!("stored recipe is not valid JSON: {}", e);
            ApiError::Internal
        })?;

    Ok(Json(json!({ "success": true, "drinks": drinks })))
}

/// GET /drinks-detail - full listing, requires `get:drinks-detail`.
pub async fn list_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    state.auth.authorize(&headers, "get:drinks-detail").await?;

    let drinks = state.store.list().await.map_err(|_| ApiError::NotFound)?;
    let drinks = drinks
        .iter()
        .map(Drink::long)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ApiError::NotFound)?;

    Ok(Json(json!({ "success": true, "drinks": drinks })))
}

/// POST /drinks - create a drink, requires `post:drinks`.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DrinkPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    state.auth.authorize(&headers, "post:drinks").await?;

    let Json(payload) = payload.map_err(|_| ApiError::Unprocessable)?;
    let recipe = serde_json::to_string(&payload.recipe.unwrap_or(Value::Null))
        .map_err(|_| ApiError::Unprocessable)?;

    let drink = state.store.insert(payload.title.as_deref(), &recipe).await?;
    let body = drink.long().map_err(|_| ApiError::Unprocessable)?;

    Ok(Json(json!({ "success": true, "drinks": [body] })))
}

/// PATCH /drinks/:drink_id - partial update, requires `patch:drinks`.
pub async fn update(
    State(state): State<AppState>,
    Path(drink_id): Path<i64>,
    headers: HeaderMap,
    payload: Result<Json<DrinkPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    state.auth.authorize(&headers, "patch:drinks").await?;

    // Row existence is checked first so a bad body on a missing id stays 404
    let mut drink = state.store.find(drink_id).await?;

    let Json(payload) = payload.map_err(|_| ApiError::Unprocessable)?;
    apply_patch(&mut drink, payload)?;

    state.store.update(&drink).await?;
    let body = drink.long().map_err(|_| ApiError::Unprocessable)?;

    Ok(Json(json!({ "success": true, "drinks": [body] })))
}

/// Apply a partial update: only supplied fields change. The recipe value is
/// re-serialized to text exactly as the insert path stores it.
fn apply_patch(drink: &mut Drink, payload: DrinkPayload) -> Result<(), ApiError> {
    if let Some(title) = payload.title {
        drink.title = title;
    }
    if let Some(recipe) = payload.recipe {
        drink.recipe = serde_json::to_string(&recipe).map_err(|_| ApiError::Unprocessable)?;
    }
    Ok(())
}

/// DELETE /drinks/:drink_id - requires `delete:drinks`.
pub async fn remove(
    State(state): State<AppState>,
    Path(drink_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    state.auth.authorize(&headers, "delete:drinks").await?;

    state.store.find(drink_id).await?;
    state.store.delete(drink_id).await?;

    Ok(Json(json!({ "success": true, "delete": drink_id })))
}
