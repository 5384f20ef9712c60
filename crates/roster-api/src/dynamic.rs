//! Handlers for `/dynamic/`: one endpoint for every lookup and people
//! entity, selected by `?action=`.
//!
//! | Method   | Query                      | Notes |
//! |----------|----------------------------|-------|
//! | `GET`    | `action`, filters, paging  | Page envelope |
//! | `POST`   | `action`                   | 201 with the created record |
//! | `PATCH`  | `action`, `id`             | Partial update |
//! | `DELETE` | `action`, `id`             | 204 |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use roster_core::{
  Record, ResourceKind, query::Page, store::EntityStore,
};

use crate::{AppState, error::ApiError, json_body, param};

type Params = Vec<(String, String)>;

/// Resolve `?action=`; anything but a dynamic kind is rejected before the
/// store is touched.
fn action(params: &[(String, String)]) -> Result<ResourceKind, ApiError> {
  let raw = param(params, "action").unwrap_or_default();
  ResourceKind::from_action(raw)
    .ok_or_else(|| roster_core::Error::InvalidAction(raw.to_owned()).into())
}

/// `GET /dynamic/?action=<kind>[&field=value...][&page=&limit=&order_by=]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<Params>,
) -> Result<Json<Page<Record>>, ApiError>
where
  S: EntityStore + Clone + 'static,
{
  let kind = action(&params)?;
  let page = state.service.list(kind, &params).await?;
  Ok(Json(page))
}

/// `POST /dynamic/?action=<kind>`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<Params>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore + Clone + 'static,
{
  let kind = action(&params)?;
  let body = json_body(&body)?;
  let record = state.service.create(kind, &body).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `PATCH /dynamic/?action=<kind>&id=<id>`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<Params>,
  body: Bytes,
) -> Result<Json<Record>, ApiError>
where
  S: EntityStore + Clone + 'static,
{
  let kind = action(&params)?;
  let body = json_body(&body)?;
  let record = state.service.update(kind, param(&params, "id"), &body).await?;
  Ok(Json(record))
}

/// `DELETE /dynamic/?action=<kind>&id=<id>`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<Params>,
) -> Result<StatusCode, ApiError>
where
  S: EntityStore + Clone + 'static,
{
  let kind = action(&params)?;
  state.service.delete(kind, param(&params, "id")).await?;
  Ok(StatusCode::NO_CONTENT)
}
