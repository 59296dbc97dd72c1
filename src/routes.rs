use axum::{
    Extension, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, Path, multipart::MultipartRejection,
        rejection::PathRejection,
    },
    http::{Method, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use std::sync::Arc;

use crate::auth::{ApiKey, ApiKeyGuard};
use crate::errors::ApiError;
use crate::status::Outcome;
use crate::storage::{PutOutcome, Storage};

pub fn router(storage: Arc<dyn Storage>, api_key: ApiKey, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root).fallback(unmatched))
        .route("/upload", put(upload).fallback(method_not_allowed))
        .route("/{*path}", get(fetch).fallback(unmatched))
        .fallback(unmatched)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(Extension(storage))
        .layer(Extension(api_key))
}

/// Fields of a `PUT /upload` form.
#[derive(Debug)]
struct UploadRequest {
    dir: String,
    name: String,
    file_name: String,
    payload: Bytes,
}

impl UploadRequest {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut dir = None;
        let mut name = None;
        let mut file = None;

        while let Some(field) = multipart.next_field().await? {
            let field_name = field.name().map(str::to_owned);
            match field_name.as_deref() {
                Some("dir") => dir = Some(field.text().await?),
                Some("name") => name = Some(field.text().await?),
                Some("file") => {
                    let file_name = field
                        .file_name()
                        .map(str::to_owned)
                        .ok_or_else(|| ApiError::Internal("file part has no filename".into()))?;
                    file = Some((file_name, field.bytes().await?));
                }
                _ => {}
            }
        }

        let missing = |field: &str| ApiError::Internal(format!("upload form is missing `{field}`"));
        let (file_name, payload) = file.ok_or_else(|| missing("file"))?;
        Ok(Self {
            dir: dir.ok_or_else(|| missing("dir"))?,
            name: name.ok_or_else(|| missing("name"))?,
            file_name,
            payload,
        })
    }

    fn storage_key(&self) -> String {
        storage_key(&self.dir, &self.name, &self.file_name)
    }
}

/// Whatever follows the last `.` of `file_name`, or nothing.
fn extension(file_name: &str) -> &str {
    file_name.rfind('.').map_or("", |dot| &file_name[dot + 1..])
}

/// `{dir}/{name}.{ext}`. An extensionless file still gets the dot.
fn storage_key(dir: &str, name: &str, file_name: &str) -> String {
    format!("{dir}/{name}.{}", extension(file_name))
}

fn looks_like_traversal(key: &str) -> bool {
    key.starts_with('/') || key.split('/').any(|segment| segment == "..")
}

async fn root() -> &'static str {
    "Hello Hono!"
}

async fn upload(
    _guard: ApiKeyGuard,
    Extension(storage): Extension<Arc<dyn Storage>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Outcome, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::Internal(format!("not a multipart body: {e}")))?;
    let request = UploadRequest::from_multipart(multipart).await?;
    let key = request.storage_key();

    if looks_like_traversal(&key) {
        tracing::warn!(%key, "storage key contains a leading slash or `..` segment");
    }

    let size = request.payload.len();
    match storage
        .put_if_absent(&key, request.payload)
        .await
        .map_err(ApiError::FailedFileSave)?
    {
        PutOutcome::Created => {
            tracing::info!(%key, size, "stored object");
            Ok(Outcome::Created)
        }
        PutOutcome::AlreadyExists => {
            tracing::info!(%key, "refused to overwrite existing object");
            Err(ApiError::Conflict)
        }
    }
}

async fn fetch(
    path: Result<Path<String>, PathRejection>,
    Extension(storage): Extension<Arc<dyn Storage>>,
) -> Result<Response, ApiError> {
    // A path that does not decode to UTF-8 can never name a stored key.
    let Path(key) = path.map_err(|e| {
        tracing::debug!(error = %e, "undecodable object path");
        ApiError::NotFound
    })?;

    let bytes = storage
        .get(&key)
        .await
        .map_err(|e| ApiError::Internal(format!("reading {key}: {e}")))?
        .ok_or(ApiError::NotFound)?;

    Ok((
        [(header::CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.to_string())],
        bytes,
    )
        .into_response())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn unmatched(method: Method, uri: Uri) -> ApiError {
    ApiError::Internal(format!("no route for {method} {uri}"))
}
