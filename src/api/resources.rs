//! Generic handlers for `/api/tasks`, `/api/notes` and `/api/events`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::{ApiJson, ApiResult};
use super::AppState;
use crate::entity::Resource;
use crate::error::IonixError;
use crate::service::resources;

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

/// An id that does not parse cannot name a stored record.
fn parse_id<R: Resource>(raw: &str) -> Result<Uuid, IonixError> {
    Uuid::parse_str(raw).map_err(|_| IonixError::not_found(format!("{} not found", R::LABEL)))
}

async fn list<R: Resource>(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<R>>> {
    Ok(Json(resources::list::<R>(&state.store, user.id).await?))
}

async fn create<R>(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(input): ApiJson<R::Create>,
) -> ApiResult<(StatusCode, Json<R>)>
where
    R: Resource,
    R::Create: DeserializeOwned + Send + 'static,
{
    let doc = resources::create::<R>(&state.store, user.id, input).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn update<R>(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<R::Update>,
) -> ApiResult<Json<R>>
where
    R: Resource,
    R::Update: DeserializeOwned + Send + 'static,
{
    let id = parse_id::<R>(&id)?;
    Ok(Json(resources::update::<R>(&state.store, user.id, id, input).await?))
}

async fn delete<R: Resource>(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Deleted>> {
    let id = parse_id::<R>(&id)?;
    let id = resources::delete::<R>(&state.store, user.id, id).await?;
    Ok(Json(Deleted { id }))
}

/// Mount list/create at `/{collection}` and update/delete at
/// `/{collection}/{id}`.
pub fn routes<R>(router: Router<AppState>) -> Router<AppState>
where
    R: Resource,
    R::Create: DeserializeOwned + Send + 'static,
    R::Update: DeserializeOwned + Send + 'static,
{
    let collection = format!("/{}", R::COLLECTION);
    let item = format!("/{}/{{id}}", R::COLLECTION);
    router
        .route(&collection, get(list::<R>).post(create::<R>))
        .route(&item, put(update::<R>).delete(delete::<R>))
}
