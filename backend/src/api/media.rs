//! Media API handlers
//!
//! Signed download links for the profile image and resume, uploads into the
//! media bucket, and presigned upload URLs for blog images.

use crate::api::auth::AuthUser;
use crate::db::models::format_timestamp;
use crate::error::AppError;
use crate::services::media::{
    content_type_for, decode_file_content, file_name_from_key, MediaKind,
    PROFILE_URL_EXPIRY_SECS, RESUME_CONTENT_TYPE, RESUME_URL_EXPIRY_SECS,
    UPLOAD_URL_EXPIRY_SECS,
};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{Method, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};

/// Body accepted by the upload endpoints
#[derive(Debug, Default, Deserialize)]
pub struct UploadRequest {
    /// Base64 (or plain text) file body
    #[serde(default, alias = "fileContent")]
    pub file_content: Option<String>,
    /// Object key, used by the generic upload only
    #[serde(default, alias = "fileName")]
    pub file_name: Option<String>,
}

impl UploadRequest {
    fn content(&self) -> Result<Vec<u8>, AppError> {
        match self.file_content.as_deref() {
            Some(content) if !content.is_empty() => Ok(decode_file_content(content)),
            _ => Err(AppError::Validation("File content is required".to_string())),
        }
    }
}

/// Signed link to a media object
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUrlResponse {
    /// Human-readable message
    pub message: String,
    /// Signed image URL (profile)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Signed download URL (resume)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Download file name (resume)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// URL lifetime in seconds
    pub expires_in: u64,
    /// Last write time of the object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Response for profile image uploads
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUploadResponse {
    /// Human-readable message
    pub message: String,
    /// Signed URL of the new image
    pub image_url: String,
}

/// Response for resume uploads
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeUploadResponse {
    /// Human-readable message
    pub message: String,
    /// Signed URL of the new resume
    pub download_url: String,
    /// Last write time of the stored object
    pub last_modified: Option<String>,
}

/// Response for generic uploads
#[derive(Debug, Serialize)]
pub struct FileUploadResponse {
    /// Human-readable message
    pub message: String,
    /// Signed URL of the stored object
    pub file_url: String,
}

/// Response for presigned upload URLs
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlResponse {
    /// URL accepting a PUT of the object body
    pub presigned_url: String,
    /// Where the object can be read after upload
    pub public_url: String,
    /// Object key
    pub file_name: String,
    /// `Content-Type` the upload must be sent with
    pub content_type: String,
}

/// GET /api/media?type= - Signed URL for the profile image or resume
pub async fn get_media(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<MediaUrlResponse>, AppError> {
    let media = state.media()?;

    let requested = params
        .get("type")
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Validation("File type parameter 'type' is required.".to_string())
        })?;

    let kind = MediaKind::parse(&requested).ok_or_else(|| {
        AppError::Validation(format!(
            "Unsupported file type: {}. Supported types: {}",
            requested,
            MediaKind::SUPPORTED.join(", ")
        ))
    })?;

    let key = kind.key(&state.config.media);
    info!(kind = ?kind, key, "Looking up media file");

    let meta = media.metadata(key).await?.ok_or_else(|| {
        error!(kind = ?kind, key, "Media file not found");
        AppError::NotFound(format!("{} file not found.", kind.display_name()))
    })?;

    let url = media
        .signed_url(Method::GET, key, Duration::from_secs(kind.expires_in()))
        .await?;

    let (image_url, download_url, filename) = match kind {
        MediaKind::Profile => (Some(url), None, None),
        MediaKind::Resume => (None, Some(url), Some(file_name_from_key(key).to_string())),
    };

    Ok(Json(MediaUrlResponse {
        message: format!("{} URL generated successfully.", kind.display_name()),
        image_url,
        download_url,
        filename,
        expires_in: kind.expires_in(),
        last_modified: Some(format_timestamp(meta.last_modified)),
    }))
}

/// GET /api/media/profile - Signed URL for the profile image
pub async fn get_profile_image(
    State(state): State<AppState>,
) -> Result<Json<MediaUrlResponse>, AppError> {
    let media = state.media()?;
    let key = state.config.media.profile_image_path.as_str();

    if !media.exists(key).await? {
        return Err(AppError::NotFound("Profile image not found.".to_string()));
    }

    let url = media
        .signed_url(
            Method::GET,
            key,
            Duration::from_secs(PROFILE_URL_EXPIRY_SECS),
        )
        .await?;

    Ok(Json(MediaUrlResponse {
        message: "Profile image URL generated successfully.".to_string(),
        image_url: Some(url),
        download_url: None,
        filename: None,
        expires_in: PROFILE_URL_EXPIRY_SECS,
        last_modified: None,
    }))
}

/// GET /api/media/resume - Short-lived download URL for the resume
pub async fn download_resume(
    State(state): State<AppState>,
) -> Result<Json<MediaUrlResponse>, AppError> {
    let media = state.media()?;
    let key = state.config.media.resume_key.as_str();

    if !media.exists(key).await? {
        return Err(AppError::NotFound("Resume not found.".to_string()));
    }

    let url = media
        .signed_url(Method::GET, key, Duration::from_secs(RESUME_URL_EXPIRY_SECS))
        .await?;

    Ok(Json(MediaUrlResponse {
        message: "Resume download URL generated successfully.".to_string(),
        image_url: None,
        download_url: Some(url),
        filename: Some(file_name_from_key(key).to_string()),
        expires_in: RESUME_URL_EXPIRY_SECS,
        last_modified: None,
    }))
}

/// POST /api/media/profile - Replace the profile image
pub async fn upload_profile_image(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<ProfileUploadResponse>, AppError> {
    let media = state.media()?;
    let Json(request) = payload?;
    let content = request.content()?;

    let key = state.config.media.profile_image_path.as_str();
    info!(key, size = content.len(), user_id = %auth.user_id, "Uploading profile image");
    media.put(key, content, Some(content_type_for(key))).await?;

    let image_url = media
        .signed_url(
            Method::GET,
            key,
            Duration::from_secs(PROFILE_URL_EXPIRY_SECS),
        )
        .await?;

    Ok(Json(ProfileUploadResponse {
        message: "Profile image uploaded successfully".to_string(),
        image_url,
    }))
}

/// POST /api/media/resume - Replace the resume
pub async fn upload_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<ResumeUploadResponse>, AppError> {
    let media = state.media()?;
    let Json(request) = payload?;
    let content = request.content()?;

    let key = state.config.media.resume_key.as_str();
    info!(key, size = content.len(), user_id = %auth.user_id, "Uploading resume");

    if let Err(e) = media.delete(key).await {
        warn!(key, error = %e, "Could not delete existing resume");
    }

    media.put(key, content, Some(RESUME_CONTENT_TYPE)).await?;

    let last_modified = media
        .metadata(key)
        .await?
        .map(|meta| format_timestamp(meta.last_modified));
    let download_url = media
        .signed_url(
            Method::GET,
            key,
            Duration::from_secs(UPLOAD_URL_EXPIRY_SECS),
        )
        .await?;

    Ok(Json(ResumeUploadResponse {
        message: "Resume uploaded successfully".to_string(),
        download_url,
        last_modified,
    }))
}

/// POST /api/media/upload - Store an arbitrary file under its name
pub async fn upload_file(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FileUploadResponse>), AppError> {
    let media = state.media()?;
    let Json(request) = payload?;
    let content = request.content()?;

    let file_name = request
        .file_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::Validation("File name is required".to_string()))?;

    info!(key = file_name, size = content.len(), user_id = %auth.user_id, "Uploading file");
    media.put(file_name, content, None).await?;

    let file_url = media
        .signed_url(
            Method::GET,
            file_name,
            Duration::from_secs(UPLOAD_URL_EXPIRY_SECS),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(FileUploadResponse {
            message: "File uploaded successfully".to_string(),
            file_url,
        }),
    ))
}

/// GET /api/media/presigned-url?fileName= - URL for a direct browser upload
pub async fn presigned_upload_url(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    let media = state.media()?;

    let file_name = params
        .get("fileName")
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            AppError::Validation("fileName query parameter is required".to_string())
        })?;

    let content_type = content_type_for(file_name);
    info!(
        file_name,
        content_type,
        user_id = %auth.user_id,
        "Generating presigned upload URL"
    );

    let presigned_url = media
        .signed_url(
            Method::PUT,
            file_name,
            Duration::from_secs(UPLOAD_URL_EXPIRY_SECS),
        )
        .await?;

    Ok(Json(PresignedUrlResponse {
        presigned_url,
        public_url: media.public_url(file_name),
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DEFAULT_RESUME_KEY};
    use crate::db::Database;
    use crate::storage::MediaStore;

    const BASE: &str = "https://media.example.com";

    async fn create_test_state() -> AppState {
        let db = Database::in_memory().await.unwrap();
        AppState::new(
            db,
            Some(MediaStore::in_memory("bucket", BASE)),
            Config::default(),
        )
    }

    fn owner() -> AuthUser {
        AuthUser::new("site-owner")
    }

    fn upload(content: &str) -> Result<Json<UploadRequest>, JsonRejection> {
        Ok(Json(UploadRequest {
            file_content: Some(content.to_string()),
            file_name: None,
        }))
    }

    fn type_param(value: &str) -> Query<HashMap<String, String>> {
        let mut params = HashMap::new();
        params.insert("type".to_string(), value.to_string());
        Query(params)
    }

    #[tokio::test]
    async fn test_get_media_validation() {
        let state = create_test_state().await;

        match get_media(State(state.clone()), Query(HashMap::new())).await {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "File type parameter 'type' is required.")
            }
            other => panic!("Expected Validation error, got: {:?}", other.map(|r| r.0)),
        }

        match get_media(State(state.clone()), type_param("avatar")).await {
            Err(AppError::Validation(msg)) => assert_eq!(
                msg,
                "Unsupported file type: avatar. Supported types: profile, resume"
            ),
            other => panic!("Expected Validation error, got: {:?}", other.map(|r| r.0)),
        }

        match get_media(State(state), type_param("Resume")).await {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Resume file not found."),
            other => panic!("Expected NotFound error, got: {:?}", other.map(|r| r.0)),
        }
    }

    #[tokio::test]
    async fn test_resume_upload_then_download() {
        let state = create_test_state().await;

        // "JVBERi0=" is base64 for "%PDF-"
        let Json(uploaded) = upload_resume(State(state.clone()), owner(), upload("JVBERi0="))
            .await
            .unwrap();
        assert_eq!(uploaded.message, "Resume uploaded successfully");
        assert_eq!(uploaded.download_url, format!("{}/public/resume.pdf", BASE));
        assert!(uploaded.last_modified.is_some());

        let media = state.media().unwrap();
        assert!(media.exists(DEFAULT_RESUME_KEY).await.unwrap());

        let Json(download) = download_resume(State(state.clone())).await.unwrap();
        assert_eq!(download.filename.as_deref(), Some("resume.pdf"));
        assert_eq!(download.expires_in, 300);

        let Json(by_type) = get_media(State(state), type_param("resume")).await.unwrap();
        assert_eq!(by_type.message, "Resume URL generated successfully.");
        assert!(by_type.download_url.is_some());
        assert!(by_type.image_url.is_none());
        assert!(by_type.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_profile_upload_and_lookup() {
        let state = create_test_state().await;

        match get_profile_image(State(state.clone())).await {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Profile image not found."),
            other => panic!("Expected NotFound error, got: {:?}", other.map(|r| r.0)),
        }

        match upload_profile_image(State(state.clone()), owner(), upload("")).await {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "File content is required"),
            other => panic!("Expected Validation error, got: {:?}", other.map(|r| r.0)),
        }

        let Json(uploaded) = upload_profile_image(State(state.clone()), owner(), upload("aGVsbG8="))
            .await
            .unwrap();
        assert_eq!(uploaded.image_url, format!("{}/public/profile.jpg", BASE));

        let Json(profile) = get_profile_image(State(state)).await.unwrap();
        assert_eq!(profile.expires_in, 3600);
        assert_eq!(profile.image_url, Some(uploaded.image_url));
    }

    #[tokio::test]
    async fn test_upload_file_requires_name() {
        let state = create_test_state().await;

        match upload_file(State(state.clone()), owner(), upload("aGVsbG8=")).await {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "File name is required"),
            other => panic!("Expected Validation error, got: {:?}", other.map(|r| r.1 .0)),
        }

        let (code, Json(response)) = upload_file(
            State(state),
            owner(),
            Ok(Json(UploadRequest {
                file_content: Some("aGVsbG8=".to_string()),
                file_name: Some("blog/hello.txt".to_string()),
            })),
        )
        .await
        .unwrap();
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(response.file_url, format!("{}/blog/hello.txt", BASE));
    }

    #[tokio::test]
    async fn test_presigned_upload_url() {
        let state = create_test_state().await;

        match presigned_upload_url(State(state.clone()), owner(), Query(HashMap::new())).await {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "fileName query parameter is required")
            }
            other => panic!("Expected Validation error, got: {:?}", other.map(|r| r.0)),
        }

        let mut params = HashMap::new();
        params.insert("fileName".to_string(), "blog/my cat.png".to_string());
        let Json(response) = presigned_upload_url(State(state.clone()), owner(), Query(params))
            .await
            .unwrap();
        assert_eq!(response.file_name, "blog/my cat.png");
        assert_eq!(response.public_url, format!("{}/blog/my%20cat.png", BASE));
        assert_eq!(response.content_type, "image/png");

        let mut params = HashMap::new();
        params.insert("fileName".to_string(), "blog/diagram.svg".to_string());
        let Json(response) = presigned_upload_url(State(state.clone()), owner(), Query(params))
            .await
            .unwrap();
        assert_eq!(response.content_type, "image/svg+xml");

        let mut params = HashMap::new();
        params.insert("fileName".to_string(), "blog/photo".to_string());
        let Json(response) = presigned_upload_url(State(state), owner(), Query(params))
            .await
            .unwrap();
        assert_eq!(response.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_media_requires_bucket() {
        let db = Database::in_memory().await.unwrap();
        let state = AppState::new(db, None, Config::default());
        match get_profile_image(State(state)).await {
            Err(AppError::Configuration(msg)) => {
                assert_eq!(msg, "MEDIA_BUCKET env variable not set")
            }
            other => panic!("Expected Configuration error, got: {:?}", other.map(|r| r.0)),
        }
    }
}
