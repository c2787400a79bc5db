//! File handlers for Web API.

use axum::{
    body::Body,
    extract::{multipart::{MultipartError, MultipartRejection}, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::{DownloadResult, UploadRequest};
use crate::web::dto::{
    ApiPath, ApiQuery, ApiResponse, FileQuery, FileResponse, SearchQuery, UpdateFileRequest,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, LinkAuthUser};

/// How the browser should treat a served file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }
}

/// Build a Content-Disposition value that can't be used for header injection.
///
/// Control characters are dropped. Non-ASCII names and names containing
/// `"` or `\` get an ASCII fallback plus an RFC 5987 `filename*`.
fn content_disposition_header(disposition: Disposition, filename: &str) -> String {
    let kind = disposition.as_str();

    if filename
        .chars()
        .all(|c| c.is_ascii() && !c.is_control() && c != '"' && c != '\\')
    {
        return format!("{kind}; filename=\"{filename}\"");
    }

    let cleaned: String = filename.chars().filter(|c| !c.is_control()).collect();
    let fallback: String = cleaned
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let encoded = urlencoding::encode(&cleaned);

    format!("{kind}; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("File too large");
    }
    tracing::debug!("Failed to read multipart field: {}", e);
    ApiError::bad_request("Invalid multipart data")
}

/// Serve file content with the given disposition.
fn file_response(result: DownloadResult, disposition: Disposition) -> Result<Response, ApiError> {
    let DownloadResult { metadata, content } = result;

    let content_type = HeaderValue::from_str(&metadata.mime_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(disposition, &metadata.name),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .header(header::CACHE_CONTROL, "private, no-cache");

    if disposition == Disposition::Inline {
        // Rendered HTML or SVG must not run scripts against this origin
        builder = builder.header(header::CONTENT_SECURITY_POLICY, "sandbox");
    }

    builder.body(Body::from(content)).map_err(|e| {
        tracing::error!(file_id = metadata.id, "Failed to build response: {}", e);
        ApiError::internal("Failed to build response")
    })
}

/// POST /api/files/upload - Upload a file.
///
/// Request body: multipart/form-data with a `file` field and an optional
/// `folder_id` field. The MIME type comes from the part's Content-Type,
/// falling back to a guess from the filename.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>), ApiError> {
    let mut multipart = multipart.map_err(|e| {
        ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
    })?;
    let mut upload: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut folder_id: Option<i64> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field
                    .content_type()
                    .filter(|ct| !ct.is_empty())
                    .map(str::to_string);
                let content = field.bytes().await.map_err(multipart_error)?.to_vec();
                upload = Some((filename, content_type, content));
            }
            "folder_id" => {
                let raw = field.text().await.map_err(multipart_error)?;
                let raw = raw.trim();
                folder_id = match raw {
                    "" | "null" => None,
                    id => Some(
                        id.parse()
                            .map_err(|_| ApiError::bad_request("Invalid folder"))?,
                    ),
                };
            }
            _ => {}
        }
    }

    let (filename, content_type, content) =
        upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let mime_type = content_type.unwrap_or_else(|| {
        mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string()
    });

    let request = UploadRequest::new(filename, mime_type, content).in_folder(folder_id);
    let file = state.file_service().upload(claims.sub, request).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(file.into()))))
}

/// GET /api/files - List the caller's files, optionally in one folder.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiQuery(query): ApiQuery<FileQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state
        .file_service()
        .list_files(claims.sub, query.folder_id)
        .await?;

    Ok(Json(ApiResponse::new(
        files.into_iter().map(FileResponse::from).collect(),
    )))
}

/// GET /api/files/search?q= - Search the caller's files by name or type.
pub async fn search_files(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state.file_service().search(claims.sub, &query.q).await?;

    Ok(Json(ApiResponse::new(
        files.into_iter().map(FileResponse::from).collect(),
    )))
}

/// GET /api/files/:id - Get file metadata.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(file_id): ApiPath<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.file_service().get_file(claims.sub, file_id).await?;
    Ok(Json(ApiResponse::new(file.into())))
}

/// PATCH /api/files/:id - Change public visibility.
pub async fn update_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(file_id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<UpdateFileRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state
        .file_service()
        .set_visibility(claims.sub, file_id, req.is_public)
        .await?;

    tracing::info!(user_id = claims.sub, file_id, is_public = req.is_public, "File visibility changed");

    Ok(Json(ApiResponse::new(file.into())))
}

/// GET /api/files/:id/download - Download as an attachment.
///
/// Also accepts `?token=` so the link can be opened directly by a browser.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    LinkAuthUser(claims): LinkAuthUser,
    ApiPath(file_id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let result = state.file_service().download(claims.sub, file_id).await?;
    file_response(result, Disposition::Attachment)
}

/// GET /api/files/:id/preview - Serve inline for the browser to render.
pub async fn preview_file(
    State(state): State<Arc<AppState>>,
    LinkAuthUser(claims): LinkAuthUser,
    ApiPath(file_id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let result = state.file_service().preview(claims.sub, file_id).await?;
    file_response(result, Disposition::Inline)
}

/// DELETE /api/files/:id - Delete a file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(file_id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.file_service().delete_file(claims.sub, file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str) -> String {
        content_disposition_header(Disposition::Attachment, name)
    }

    #[test]
    fn test_content_disposition_simple_ascii() {
        assert_eq!(attachment("document.txt"), "attachment; filename=\"document.txt\"");
        assert_eq!(
            attachment("my document.txt"),
            "attachment; filename=\"my document.txt\""
        );
    }

    #[test]
    fn test_content_disposition_inline() {
        assert_eq!(
            content_disposition_header(Disposition::Inline, "photo.png"),
            "inline; filename=\"photo.png\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let result = attachment("日本語ファイル.txt");
        assert!(result.starts_with("attachment; filename=\"_______.txt\""));
        assert!(result.contains("filename*=UTF-8''%E6%97%A5%E6%9C%AC%E8%AA%9E"));
    }

    #[test]
    fn test_content_disposition_quote_and_backslash() {
        let result = attachment("test\"file.txt");
        assert!(result.contains("filename=\"test_file.txt\""));
        assert!(result.contains("%22"));

        let result = attachment("test\\file.txt");
        assert!(result.contains("filename=\"test_file.txt\""));
        assert!(result.contains("filename*=UTF-8''"));
    }

    #[test]
    fn test_content_disposition_header_injection() {
        for name in [
            "test\r\nX-Injected: bad.txt",
            "test\x00null.txt",
            "file\"\r\nX-Evil: header\r\n\r\n<script>.txt",
        ] {
            let result = attachment(name);
            assert!(!result.contains('\r'), "{result}");
            assert!(!result.contains('\n'), "{result}");
            assert!(!result.contains('\x00'), "{result}");
            assert!(result.starts_with("attachment; filename="));
        }
    }
}
