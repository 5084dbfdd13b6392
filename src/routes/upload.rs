//! Image upload: multipart in, commit to the content repository, serve
//! from the frontend's public path.

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

use crate::error::ApiError;
use crate::repo::admin_logs;
use crate::routes::require_admin;
use crate::AppState;

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

lazy_static! {
    static ref UNSAFE_FILE_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9._-]+").unwrap();
}

fn sanitize_file_name(name: &str) -> String {
    let name = name.trim().replace(' ', "_");
    UNSAFE_FILE_CHARS.replace_all(&name, "").to_string()
}

/// Map the logical upload target to (repo subdirectory, public path).
fn resolve_upload_dir(v: &str) -> Option<(&'static str, &'static str)> {
    match v.trim() {
        "product" => Some(("product", "/img/product")),
        "profile" => Some(("", "/img")),
        "other" => Some(("other", "/img/other")),
        _ => None,
    }
}

fn is_image(bytes: &[u8]) -> bool {
    matches!(
        bytes,
        [0xFF, 0xD8, 0xFF, ..]                                      // JPEG
            | [0x89, 0x50, 0x4E, 0x47, ..]                          // PNG
            | [0x47, 0x49, 0x46, 0x38, ..]                          // GIF
            | [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] // WebP
            | [0x42, 0x4D, ..]                                      // BMP
    )
}

pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_admin(&state, &headers).await?;

    let Some(store) = state.github.as_deref() else {
        return Err(ApiError::Internal(
            "GitHub upload is not configured".to_string(),
        ));
    };

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut target = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::validation("Invalid multipart form"))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::validation("Failed to read file"))?;
                file = Some((name, bytes.to_vec()));
            }
            "path" => {
                target = field
                    .text()
                    .await
                    .map_err(|_| ApiError::validation("Invalid multipart form"))?;
            }
            _ => {}
        }
    }

    let (original_name, bytes) = file.ok_or_else(|| ApiError::validation("No file provided"))?;
    let (repo_dir, public_dir) =
        resolve_upload_dir(&target).ok_or_else(|| ApiError::validation("Invalid upload path"))?;

    let file_name = sanitize_file_name(&original_name);
    if file_name.is_empty() {
        return Err(ApiError::validation("Invalid file name"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::validation("File too large (max 10MB)"));
    }
    if !is_image(&bytes) {
        return Err(ApiError::validation("Only image files are allowed"));
    }

    let repo_path = if repo_dir.is_empty() {
        format!("public/img/{}", file_name)
    } else {
        format!("public/img/{}/{}", repo_dir, file_name)
    };
    let public_path = format!("{}/{}", public_dir, file_name);

    if store.file_exists(&repo_path).await? {
        return Err(ApiError::conflict("File already exists"));
    }
    let sha = store.put_file(&repo_path, &file_name, &bytes).await?;

    admin_logs::record(
        &state.pool,
        "upload",
        "image",
        "",
        "info",
        &user,
        Some(json!({
            "path": public_path,
            "fileName": file_name,
            "status": "uploaded",
        })),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "path": public_path,
        "fileName": file_name,
        "sha": sha,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name(" my photo.png "), "my_photo.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_file_name("日本語.jpg"), ".jpg");
        assert_eq!(sanitize_file_name("safe-name_01.webp"), "safe-name_01.webp");
    }

    #[test]
    fn test_resolve_upload_dir() {
        assert_eq!(resolve_upload_dir("product"), Some(("product", "/img/product")));
        assert_eq!(resolve_upload_dir("profile"), Some(("", "/img")));
        assert_eq!(resolve_upload_dir("other"), Some(("other", "/img/other")));
        assert_eq!(resolve_upload_dir("uploads"), None);
        assert_eq!(resolve_upload_dir(""), None);
    }

    #[test]
    fn test_image_sniffing() {
        assert!(is_image(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]));
        assert!(is_image(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]));
        assert!(is_image(b"RIFF\x00\x00\x00\x00WEBPVP8 "));
        assert!(!is_image(b"<!DOCTYPE html>"));
        assert!(!is_image(b"\x7fELF"));
        assert!(!is_image(b""));
    }
}
