//! Media helpers
//!
//! Content-type detection, upload payload decoding and the fixed media kinds
//! served by the media endpoints.

use crate::config::MediaConfig;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Signed URL lifetime for the profile image (seconds)
pub const PROFILE_URL_EXPIRY_SECS: u64 = 3600;

/// Signed URL lifetime for blog images (seconds)
pub const IMAGE_URL_EXPIRY_SECS: u64 = 3600;

/// Signed URL lifetime for resume downloads (seconds)
pub const RESUME_URL_EXPIRY_SECS: u64 = 300;

/// Signed URL lifetime for presigned uploads (seconds)
pub const UPLOAD_URL_EXPIRY_SECS: u64 = 3600;

/// Content type stored with the resume
pub const RESUME_CONTENT_TYPE: &str = "application/pdf";

/// Image content type derived from a file name's extension
///
/// Defaults to `image/jpeg`.
pub fn content_type_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".svg") {
        "image/svg+xml"
    } else {
        "image/jpeg"
    }
}

/// Decode an uploaded file body
///
/// Clients send base64; anything that does not decode is stored as its UTF-8
/// bytes.
pub fn decode_file_content(content: &str) -> Vec<u8> {
    STANDARD
        .decode(content.trim())
        .unwrap_or_else(|_| content.as_bytes().to_vec())
}

/// Last path segment of an object key
pub fn file_name_from_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// The fixed media objects served by `GET /api/media`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Profile image
    Profile,
    /// Resume document
    Resume,
}

impl MediaKind {
    /// Names accepted in the `type` query parameter
    pub const SUPPORTED: &'static [&'static str] = &["profile", "resume"];

    /// Parse a `type` query value (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "profile" => Some(MediaKind::Profile),
            "resume" => Some(MediaKind::Resume),
            _ => None,
        }
    }

    /// Object key for this kind
    pub fn key<'a>(&self, config: &'a MediaConfig) -> &'a str {
        match self {
            MediaKind::Profile => &config.profile_image_path,
            MediaKind::Resume => &config.resume_key,
        }
    }

    /// Signed URL lifetime in seconds
    pub fn expires_in(&self) -> u64 {
        match self {
            MediaKind::Profile => PROFILE_URL_EXPIRY_SECS,
            MediaKind::Resume => RESUME_URL_EXPIRY_SECS,
        }
    }

    /// Capitalized display name used in messages
    pub fn display_name(&self) -> &'static str {
        match self {
            MediaKind::Profile => "Profile",
            MediaKind::Resume => "Resume",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.PNG"), "image/png");
        assert_eq!(content_type_for("a.gif"), "image/gif");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("logo.svg"), "image/svg+xml");
        assert_eq!(content_type_for("noext"), "image/jpeg");
    }

    #[test]
    fn test_decode_file_content() {
        assert_eq!(decode_file_content("aGVsbG8="), b"hello".to_vec());
        assert_eq!(decode_file_content("not base64!"), b"not base64!".to_vec());
    }

    #[test]
    fn test_media_kind() {
        assert_eq!(MediaKind::parse("Resume"), Some(MediaKind::Resume));
        assert_eq!(MediaKind::parse("avatar"), None);
        assert_eq!(MediaKind::Profile.expires_in(), 3600);
        assert_eq!(MediaKind::Resume.expires_in(), 300);
        assert_eq!(file_name_from_key("public/resume.pdf"), "resume.pdf");
        assert_eq!(file_name_from_key("resume.pdf"), "resume.pdf");
    }
}
