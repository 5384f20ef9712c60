//! `POST /import-initial-data/`: pull the legacy database into the store.

use axum::{Json, extract::State};
use bytes::Bytes;
use roster_core::store::EntityStore;
use roster_import::{ConnectionParams, Reconciler, SqliteLegacySource};
use serde_json::json;

use crate::{AppState, error::ApiError, json_body};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: EntityStore + Clone + 'static,
{
  let params: ConnectionParams = serde_json::from_value(json_body(&body)?)
    .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))?;

  let legacy =
    SqliteLegacySource::connect(state.config.legacy_root.as_deref(), &params).await?;
  let summary = Reconciler::new(state.service.store().as_ref()).run(&legacy).await?;

  Ok(Json(json!({
    "message": "Data imported successfully",
    "summary": summary,
  })))
}
