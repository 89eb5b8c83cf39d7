//! /upload, /download handlers — the relay's whole surface.

use std::path::PathBuf;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

/// Maximum upload size per file (256 MB).
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Extensions the store accepts.
const ALLOWED_EXTENSIONS: &[&str] = &["stl", "csv", "txt", "pdf", "png", "jpg", "jpeg", "gif"];

#[derive(Clone)]
pub struct RelayState {
    /// Where uploaded files live, under sanitized names.
    pub store_dir: PathBuf,
}

pub fn router(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route(
            "/upload",
            post(handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/download/{file_name}", get(handle_download))
        .with_state(state)
        .layer(cors)
}

pub async fn serve(state: RelayState, port: u16) -> anyhow::Result<()> {
    std::fs::create_dir_all(&state.store_dir)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!(port, "relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── / ─────────────────────────────────────────────────────────────────────────

async fn handle_root() -> &'static str {
    "ferry relay"
}

// ── /upload ───────────────────────────────────────────────────────────────────

pub async fn handle_upload(
    State(state): State<RelayState>,
    mut multipart: Multipart,
) -> Result<&'static str, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("upload_file") {
            continue;
        }

        let raw_name = field.file_name().unwrap_or("").to_string();
        if raw_name.is_empty() {
            tracing::warn!("upload with no file name rejected");
            return Err((StatusCode::BAD_REQUEST, "No file selected".to_string()));
        }
        if !allowed_ext(&raw_name) {
            tracing::warn!(file = raw_name, "upload with disallowed extension rejected");
            return Err((
                StatusCode::BAD_REQUEST,
                format!("file type not allowed: {}", raw_name),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

        let file_name = sanitize_filename(&raw_name);
        let path = state.store_dir.join(&file_name);
        std::fs::write(&path, &data)
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

        tracing::info!(file = file_name, bytes = data.len(), path = %path.display(), "file stored");
        return Ok("OK");
    }

    Err((StatusCode::BAD_REQUEST, "no upload_file field".to_string()))
}

// ── /download/{file_name} ─────────────────────────────────────────────────────

pub async fn handle_download(
    State(state): State<RelayState>,
    Path(file_name): Path<String>,
) -> Result<Vec<u8>, (StatusCode, String)> {
    // Sanitized before lookup so a request can never escape the store.
    let path = state.store_dir.join(sanitize_filename(&file_name));

    match std::fs::read(&path) {
        Ok(bytes) => {
            tracing::info!(file = file_name, bytes = bytes.len(), "file served");
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err((StatusCode::NOT_FOUND, format!("no such file: {}", file_name)))
        }
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Whether the file's extension is in the allow-list. A name without a dot
/// fails the check — its "extension" is the whole name.
fn allowed_ext(file_name: &str) -> bool {
    let ext = file_name.rsplit('.').next().unwrap_or("").to_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str())
}

/// Sanitize a filename: strip path components, reject traversal attempts.
fn sanitize_filename(raw: &str) -> String {
    // Take only the final path component (handles both / and \ separators)
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    // Remove leading dots (no hidden files / no ".." tricks)
    let trimmed = base.trim_start_matches('.');

    // Replace any remaining problematic characters
    let clean: String = trimmed
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if clean.is_empty() {
        "uploaded_file".to_string()
    } else {
        clean
    }
}
