//! JSON REST API for the Roster back office.
//!
//! Exposes an axum [`Router`] backed by any
//! [`EntityStore`](roster_core::store::EntityStore). Everything lives under
//! `/api`; uploaded media is served from the configured `media_url`.

pub mod dynamic;
pub mod entities;
pub mod error;
pub mod images;
pub mod import;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use bytes::Bytes;
use roster_core::{
  ResourceKind, ids::IdPolicy, service::Service, store::EntityStore,
};
use serde::Deserialize;
use serde_json::Value as Json;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use error::ApiError;

/// Upper bound for one image upload request.
const UPLOAD_LIMIT: usize = 32 * 1024 * 1024;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROSTER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  pub id_policy:       IdPolicy,
  /// Directory uploaded files are written under.
  pub media_root:      PathBuf,
  /// URL path prefix the media directory is served at.
  pub media_url:       String,
  /// Scheme and authority prefixed to returned media URLs.
  pub public_base_url: String,
  /// Directory legacy databases are resolved under, if set.
  pub legacy_root:     Option<PathBuf>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:            "127.0.0.1".to_string(),
      port:            8000,
      store_path:      PathBuf::from("roster.db"),
      id_policy:       IdPolicy::default(),
      media_root:      PathBuf::from("media"),
      media_url:       "/media/".to_string(),
      public_base_url: "http://localhost:8000".to_string(),
      legacy_root:     None,
    }
  }
}

impl ServerConfig {
  /// `media_url` as a mount path: leading slash, no trailing slash.
  pub fn media_mount(&self) -> String {
    format!("/{}", self.media_url.trim_matches('/'))
  }

  /// Absolute URL of a file stored under `media_root`.
  pub fn media_link(&self, relative: &str) -> String {
    format!(
      "{}{}/{}",
      self.public_base_url.trim_end_matches('/'),
      self.media_mount(),
      relative.trim_start_matches('/'),
    )
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: EntityStore> {
  pub service: Service<S>,
  pub config:  Arc<ServerConfig>,
}

impl<S: EntityStore> AppState<S> {
  pub fn new(store: Arc<S>, config: ServerConfig) -> Self {
    Self { service: Service::new(store, config.id_policy), config: Arc::new(config) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: EntityStore + Clone + 'static,
{
  let api = Router::new()
    .route(
      "/dynamic/",
      get(dynamic::list::<S>)
        .post(dynamic::create::<S>)
        .patch(dynamic::update::<S>)
        .delete(dynamic::remove::<S>),
    )
    .route("/lockers/", entities::routes::<S>(ResourceKind::Locker))
    .route("/logs/", entities::routes::<S>(ResourceKind::Log))
    .route("/payments/", entities::routes::<S>(ResourceKind::Payment))
    .route("/import-initial-data/", post(import::handler::<S>))
    .route(
      "/images/",
      post(images::upload::<S>).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
    );

  let media = ServeDir::new(&state.config.media_root);
  let mount = state.config.media_mount();
  let app = Router::new().nest("/api", api);
  let app = if mount == "/" {
    app.fallback_service(media)
  } else {
    app.nest_service(&mount, media)
  };
  app.layer(TraceLayer::new_for_http()).with_state(state)
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Parse a JSON request body. An empty body is an empty object.
pub(crate) fn json_body(body: &Bytes) -> Result<Json, ApiError> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Ok(Json::Object(Default::default()));
  }
  serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))
}

/// The last value given for `key`, if any.
pub(crate) fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
  params.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use roster_store_sqlite::SqliteStore;
  use serde_json::json;
  use tower::ServiceExt as _;

  pub(crate) async fn make_state(config: ServerConfig) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState::new(Arc::new(store), config)
  }

  pub(crate) async fn send(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    body: Option<Json>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  pub(crate) async fn body_json(resp: Response) -> Json {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[test]
  fn media_links() {
    let config = ServerConfig {
      public_base_url: "http://gym.local:8000/".into(),
      media_url: "media/".into(),
      ..ServerConfig::default()
    };
    assert_eq!(config.media_mount(), "/media");
    assert_eq!(
      config.media_link("images/a.png"),
      "http://gym.local:8000/media/images/a.png"
    );
  }

  #[test]
  fn empty_body_is_empty_object() {
    assert_eq!(json_body(&Bytes::from_static(b" \n")).unwrap(), json!({}));
    assert!(matches!(json_body(&Bytes::from_static(b"{")), Err(ApiError::BadRequest(_))));
  }

  #[tokio::test]
  async fn unknown_routes_are_404() {
    let state = make_state(ServerConfig::default()).await;
    let resp = send(&state, "GET", "/api/nothing/", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn store_errors_are_500_with_message() {
    let err = ApiError::Store(Box::new(std::io::Error::other("disk on fire")));
    let resp = axum::response::IntoResponse::into_response(err);
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await, json!({ "error": "disk on fire" }));
  }
}
