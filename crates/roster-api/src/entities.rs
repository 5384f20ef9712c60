//! Handlers for the fixed-kind endpoints `/lockers/`, `/logs/` and
//! `/payments/`.
//!
//! Same dispatcher as `/dynamic/`, with one difference: `GET ?id=` returns
//! the single record (or 404) rather than a page.

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{MethodRouter, get},
};
use bytes::Bytes;
use roster_core::{ResourceKind, service::require_id, store::EntityStore};

use crate::{AppState, error::ApiError, json_body, param};

type Params = Vec<(String, String)>;

/// All four methods for `kind`, bound to one path.
pub fn routes<S>(kind: ResourceKind) -> MethodRouter<AppState<S>>
where
  S: EntityStore + Clone + 'static,
{
  get(move |state: State<AppState<S>>, params: Query<Params>| read(kind, state, params))
    .post(move |state: State<AppState<S>>, body: Bytes| create(kind, state, body))
    .patch(move |state: State<AppState<S>>, params: Query<Params>, body: Bytes| {
      update(kind, state, params, body)
    })
    .delete(move |state: State<AppState<S>>, params: Query<Params>| remove(kind, state, params))
}

/// `GET ?id=<id>` → one record; `GET` → filtered page.
pub async fn read<S>(
  kind: ResourceKind,
  State(state): State<AppState<S>>,
  Query(params): Query<Params>,
) -> Result<Response, ApiError>
where
  S: EntityStore + Clone + 'static,
{
  if let Some(raw) = param(&params, "id").filter(|s| !s.trim().is_empty()) {
    let id = require_id(Some(raw))?;
    let record = state.service.get(kind, id).await?;
    return Ok(Json(record).into_response());
  }
  let page = state.service.list(kind, &params).await?;
  Ok(Json(page).into_response())
}

pub async fn create<S>(
  kind: ResourceKind,
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore + Clone + 'static,
{
  let body = json_body(&body)?;
  let record = state.service.create(kind, &body).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update<S>(
  kind: ResourceKind,
  State(state): State<AppState<S>>,
  Query(params): Query<Params>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore + Clone + 'static,
{
  let body = json_body(&body)?;
  let record = state.service.update(kind, param(&params, "id"), &body).await?;
  Ok(Json(record))
}

pub async fn remove<S>(
  kind: ResourceKind,
  State(state): State<AppState<S>>,
  Query(params): Query<Params>,
) -> Result<StatusCode, ApiError>
where
  S: EntityStore + Clone + 'static,
{
  state.service.delete(kind, param(&params, "id")).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
  use axum::http::StatusCode;
  use serde_json::json;

  use crate::{
    ServerConfig,
    tests::{body_json, make_state, send},
  };

  #[tokio::test]
  async fn get_with_id_returns_one_record() {
    let state = make_state(ServerConfig::default()).await;
    let resp = send(&state, "POST", "/api/lockers/", Some(json!({ "is_vip": true }))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&state, "GET", "/api/lockers/?id=1", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let locker = body_json(resp).await;
    assert_eq!(locker["id"], 1);
    assert_eq!(locker["is_vip"], true);
    assert_eq!(locker["is_open"], false);

    let resp = send(&state, "GET", "/api/lockers/?id=9", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&state, "GET", "/api/lockers/?id=x", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn log_lifecycle_over_http() {
    let state = make_state(ServerConfig::default()).await;
    send(&state, "POST", "/api/dynamic/?action=member", Some(json!({ "card_no": "7" }))).await;

    let resp = send(&state, "POST", "/api/logs/", Some(json!({ "user": 1, "full_name": "A" }))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let log = body_json(resp).await;
    assert!(log["entry_time"].is_string());
    assert!(log["exit_time"].is_null());
    assert_eq!(log["is_online"], true);

    let resp = send(&state, "PATCH", "/api/logs/?id=1", Some(json!({ "is_online": false }))).await;
    let exit = body_json(resp).await["exit_time"].clone();
    assert!(exit.is_string());

    let resp = send(&state, "PATCH", "/api/logs/?id=1", Some(json!({ "is_online": false }))).await;
    assert_eq!(body_json(resp).await["exit_time"], exit);
  }

  #[tokio::test]
  async fn payments_filter_by_substring_and_paginate() {
    let state = make_state(ServerConfig::default()).await;
    for i in 0..23 {
      let method = if i % 2 == 0 { "Card" } else { "Cash" };
      let resp = send(
        &state,
        "POST",
        "/api/payments/",
        Some(json!({ "price": 1000 + i, "paid_method": method, "full_name": "John Doe" })),
      )
      .await;
      assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = send(&state, "GET", "/api/payments/?page=3&limit=10", None).await;
    let page = body_json(resp).await;
    assert_eq!(page["total_items"], 23);
    assert_eq!(page["total_pages"], 3);
    assert_eq!(page["current_page"], 3);
    let ids: Vec<i64> = page["items"]
      .as_array()
      .unwrap()
      .iter()
      .map(|item| item["id"].as_i64().unwrap())
      .collect();
    assert_eq!(ids, vec![21, 22, 23]);

    let resp = send(&state, "GET", "/api/payments/?page=4&limit=10", None).await;
    assert_eq!(body_json(resp).await["items"], json!([]));

    let resp = send(&state, "GET", "/api/payments/?paid_method=car&full_name=JOHN", None).await;
    assert_eq!(body_json(resp).await["total_items"], 12);
  }

  #[tokio::test]
  async fn deleting_a_person_keeps_the_locker() {
    let state = make_state(ServerConfig::default()).await;
    send(&state, "POST", "/api/dynamic/?action=person", Some(json!({ "full_name": "A" }))).await;
    send(&state, "POST", "/api/lockers/", Some(json!({ "user": 1, "full_name": "A" }))).await;

    let resp = send(&state, "DELETE", "/api/dynamic/?action=person&id=1", None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&state, "GET", "/api/lockers/?id=1", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_json(resp).await["user"].is_null());
  }

  #[tokio::test]
  async fn delete_requires_id() {
    let state = make_state(ServerConfig::default()).await;
    let resp = send(&state, "DELETE", "/api/payments/", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }
}
