//! `POST /images/`: store uploaded images under `<media_root>/images/`.
//!
//! Every multipart field named `image` is written to its own file. A name
//! that is already taken gets a random suffix; nothing is overwritten.

use std::{io::ErrorKind, path::Path};

use axum::{
  Json,
  extract::{Multipart, State},
  http::StatusCode,
  response::IntoResponse,
};
use roster_core::store::EntityStore;
use serde_json::json;
use tokio::{fs, io::AsyncWriteExt as _};

use crate::{AppState, error::ApiError};

const FIELD: &str = "image";
const DIR: &str = "images";

pub async fn upload<S>(
  State(state): State<AppState<S>>,
  mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore + Clone + 'static,
{
  let dir = state.config.media_root.join(DIR);
  let mut urls = Vec::new();

  while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
    if field.name() != Some(FIELD) {
      continue;
    }
    let name = sanitize(field.file_name());
    let data = field.bytes().await.map_err(bad_upload)?;

    fs::create_dir_all(&dir).await.map_err(internal)?;
    let stored = write_unique(&dir, &name, &data).await?;
    tracing::info!(file = %stored, bytes = data.len(), "image stored");
    urls.push(state.config.media_link(&format!("{DIR}/{stored}")));
  }

  if urls.is_empty() {
    return Err(ApiError::BadRequest("No image provided".into()));
  }
  Ok((StatusCode::CREATED, Json(json!({ "image_urls": urls }))))
}

/// Write `data` to `dir/name`, or to a suffixed variant if `name` exists.
/// Returns the file name actually used.
async fn write_unique(dir: &Path, name: &str, data: &[u8]) -> Result<String, ApiError> {
  let mut candidate = name.to_owned();
  loop {
    let opened = fs::OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(dir.join(&candidate))
      .await;
    match opened {
      Ok(mut file) => {
        file.write_all(data).await.map_err(internal)?;
        file.flush().await.map_err(internal)?;
        return Ok(candidate);
      }
      Err(e) if e.kind() == ErrorKind::AlreadyExists => {
        candidate = suffixed(name);
      }
      Err(e) => return Err(internal(e)),
    }
  }
}

/// Final path segment of the client's file name, limited to a safe charset.
fn sanitize(file_name: Option<&str>) -> String {
  let base = file_name
    .unwrap_or_default()
    .rsplit(['/', '\\'])
    .next()
    .unwrap_or_default();
  let clean: String = base
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
    .collect();
  let clean = clean.trim_start_matches('.');
  if clean.is_empty() { "upload".to_owned() } else { clean.to_owned() }
}

fn suffixed(name: &str) -> String {
  let tag = uuid::Uuid::new_v4().simple().to_string();
  let tag = &tag[..8];
  match name.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{tag}.{ext}"),
    _ => format!("{name}_{tag}"),
  }
}

fn bad_upload(e: axum::extract::multipart::MultipartError) -> ApiError {
  ApiError::BadRequest(format!("Invalid upload: {e}"))
}

fn internal(e: std::io::Error) -> ApiError { ApiError::Internal(e.to_string()) }

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::json;
  use tower::ServiceExt as _;

  use super::{sanitize, suffixed};
  use crate::{
    ServerConfig, router,
    tests::{body_json, make_state, send},
  };

  const BOUNDARY: &str = "roster-boundary";

  fn multipart(parts: &[(&str, &str, &str)]) -> Body {
    let mut body = Vec::new();
    for (field, file, data) in parts {
      body.extend_from_slice(
        format!(
          "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
           filename=\"{file}\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
      );
      body.extend_from_slice(data.as_bytes());
      body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
  }

  fn upload_request(body: Body) -> Request<Body> {
    Request::builder()
      .method("POST")
      .uri("/api/images/")
      .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
      .body(body)
      .unwrap()
  }

  fn config(media: &tempfile::TempDir) -> ServerConfig {
    ServerConfig {
      media_root: media.path().to_path_buf(),
      public_base_url: "http://gym.local".into(),
      ..ServerConfig::default()
    }
  }

  #[test]
  fn file_names_are_sanitized() {
    assert_eq!(sanitize(Some("../../etc/passwd")), "passwd");
    assert_eq!(sanitize(Some("C:\\photos\\me here.png")), "me_here.png");
    assert_eq!(sanitize(Some(".hidden")), "hidden");
    assert_eq!(sanitize(None), "upload");
  }

  #[test]
  fn suffix_keeps_the_extension() {
    let name = suffixed("face.png");
    assert!(name.starts_with("face_") && name.ends_with(".png"), "{name}");
    assert_eq!(name.len(), "face_".len() + 8 + ".png".len());
  }

  #[tokio::test]
  async fn uploads_are_stored_and_served() {
    let media = tempfile::tempdir().unwrap();
    let state = make_state(config(&media)).await;

    let body = multipart(&[("image", "a.png", "one"), ("image", "b.png", "two")]);
    let resp = router(state.clone()).oneshot(upload_request(body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(
      body_json(resp).await,
      json!({ "image_urls": [
        "http://gym.local/media/images/a.png",
        "http://gym.local/media/images/b.png",
      ] })
    );
    assert_eq!(std::fs::read(media.path().join("images/a.png")).unwrap(), b"one");

    let resp = send(&state, "GET", "/media/images/b.png", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"two");
  }

  #[tokio::test]
  async fn taken_names_get_a_suffix() {
    let media = tempfile::tempdir().unwrap();
    let state = make_state(config(&media)).await;

    for data in ["first", "again"] {
      let body = multipart(&[("image", "a.png", data)]);
      let resp = router(state.clone()).oneshot(upload_request(body)).await.unwrap();
      assert_eq!(resp.status(), StatusCode::CREATED);
    }

    assert_eq!(std::fs::read(media.path().join("images/a.png")).unwrap(), b"first");
    let stored = std::fs::read_dir(media.path().join("images")).unwrap().count();
    assert_eq!(stored, 2);
  }

  #[tokio::test]
  async fn no_image_is_400() {
    let media = tempfile::tempdir().unwrap();
    let state = make_state(config(&media)).await;

    let body = multipart(&[("avatar", "a.png", "x")]);
    let resp = router(state.clone()).oneshot(upload_request(body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await, json!({ "error": "No image provided" }));
    assert!(!media.path().join("images").exists());
  }
}
