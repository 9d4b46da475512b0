//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;

/// Default object key for the profile image
pub const DEFAULT_PROFILE_IMAGE_PATH: &str = "public/profile.jpg";

/// Default object key for the resume
pub const DEFAULT_RESUME_KEY: &str = "public/resume.pdf";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Table store configuration
    pub database: DatabaseConfig,
    /// Object store configuration
    pub media: MediaConfig,
    /// Analytics configuration
    pub analytics: AnalyticsConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Table store configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

/// Which object store implementation backs the media bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaBackend {
    /// Amazon S3 (credentials and region from the environment)
    S3,
    /// Local directory
    Local,
    /// Process memory, lost on restart
    Memory,
}

impl MediaBackend {
    /// Parse a backend name, falling back to `Local` for unknown values
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "s3" => MediaBackend::S3,
            "memory" => MediaBackend::Memory,
            "local" => MediaBackend::Local,
            other => {
                tracing::warn!(backend = other, "Unknown MEDIA_BACKEND, using local");
                MediaBackend::Local
            }
        }
    }
}

/// Object store configuration
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Backend implementation
    pub backend: MediaBackend,
    /// Bucket name. Media endpoints fail when this is unset.
    pub bucket: Option<String>,
    /// Root directory for the local backend
    pub media_dir: String,
    /// Base URL used for public object links and unsigned fallbacks
    pub public_url: Option<String>,
    /// Object key of the profile image
    pub profile_image_path: String,
    /// Object key of the resume
    pub resume_key: String,
}

/// Analytics configuration
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Interval between sweeps of expired events (in seconds)
    pub purge_interval_secs: u64,
}

impl Default for Config {
    /// Built-in defaults, without reading the environment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 8080,
                host: "0.0.0.0".to_string(),
            },
            database: DatabaseConfig {
                path: "./data/portfolio.db".to_string(),
            },
            media: MediaConfig {
                backend: MediaBackend::Local,
                bucket: None,
                media_dir: "./data/media".to_string(),
                public_url: None,
                profile_image_path: DEFAULT_PROFILE_IMAGE_PATH.to_string(),
                resume_key: DEFAULT_RESUME_KEY.to_string(),
            },
            analytics: AnalyticsConfig {
                purge_interval_secs: 3600,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
                host: env::var("HOST").unwrap_or(defaults.server.host),
            },
            database: DatabaseConfig {
                path: env::var("DATABASE_PATH").unwrap_or(defaults.database.path),
            },
            media: MediaConfig {
                backend: env::var("MEDIA_BACKEND")
                    .map(|b| MediaBackend::parse(&b))
                    .unwrap_or(defaults.media.backend),
                bucket: non_empty_var("MEDIA_BUCKET"),
                media_dir: env::var("MEDIA_DIR").unwrap_or(defaults.media.media_dir),
                public_url: non_empty_var("MEDIA_PUBLIC_URL"),
                profile_image_path: env::var("PROFILE_IMAGE_PATH")
                    .unwrap_or(defaults.media.profile_image_path),
                resume_key: env::var("RESUME_KEY").unwrap_or(defaults.media.resume_key),
            },
            analytics: AnalyticsConfig {
                purge_interval_secs: env::var("ANALYTICS_PURGE_INTERVAL_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .filter(|t| *t > 0)
                    .unwrap_or(defaults.analytics.purge_interval_secs),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Base URL for public object links
    ///
    /// Uses `MEDIA_PUBLIC_URL` when set; otherwise the bucket's S3 URL for the
    /// s3 backend, or this server's `/media` route for the others.
    pub fn media_public_url(&self) -> String {
        if let Some(url) = &self.media.public_url {
            return url.trim_end_matches('/').to_string();
        }
        match (&self.media.backend, &self.media.bucket) {
            (MediaBackend::S3, Some(bucket)) => format!("https://{}.s3.amazonaws.com", bucket),
            _ => {
                let host = if self.server.host == "0.0.0.0" {
                    "localhost"
                } else {
                    self.server.host.as_str()
                };
                format!("http://{}:{}/media", host, self.server.port)
            }
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "PORT",
        "HOST",
        "DATABASE_PATH",
        "MEDIA_BACKEND",
        "MEDIA_BUCKET",
        "MEDIA_DIR",
        "MEDIA_PUBLIC_URL",
        "PROFILE_IMAGE_PATH",
        "RESUME_KEY",
        "ANALYTICS_PURGE_INTERVAL_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.database.path, "./data/portfolio.db");
        assert_eq!(config.media.backend, MediaBackend::Local);
        assert!(config.media.bucket.is_none());
        assert_eq!(config.media.profile_image_path, DEFAULT_PROFILE_IMAGE_PATH);
        assert_eq!(config.media.resume_key, DEFAULT_RESUME_KEY);
        assert_eq!(config.analytics.purge_interval_secs, 3600);
        assert_eq!(config.media_public_url(), "http://localhost:8080/media");
    }

    #[test]
    #[serial]
    fn test_s3_public_url_from_bucket() {
        clear_env();
        env::set_var("MEDIA_BACKEND", "S3");
        env::set_var("MEDIA_BUCKET", "portfolio-media");
        let config = Config::from_env();
        assert_eq!(config.media.backend, MediaBackend::S3);
        assert_eq!(
            config.media_public_url(),
            "https://portfolio-media.s3.amazonaws.com"
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_explicit_public_url_and_invalid_numbers() {
        clear_env();
        env::set_var("MEDIA_PUBLIC_URL", "https://cdn.example.com/");
        env::set_var("PORT", "not-a-port");
        env::set_var("ANALYTICS_PURGE_INTERVAL_SECS", "0");
        env::set_var("MEDIA_BUCKET", "   ");
        let config = Config::from_env();
        assert_eq!(config.media_public_url(), "https://cdn.example.com");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.analytics.purge_interval_secs, 3600);
        assert!(config.media.bucket.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_default_ignores_environment() {
        clear_env();
        env::set_var("PORT", "9999");
        env::set_var("MEDIA_BUCKET", "portfolio-media");
        env::set_var("MEDIA_PUBLIC_URL", "https://cdn.example.com");
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.media.bucket.is_none());
        assert_eq!(config.media_public_url(), "http://localhost:8080/media");
        clear_env();
    }

    #[test]
    fn test_media_backend_parse() {
        assert_eq!(MediaBackend::parse("memory"), MediaBackend::Memory);
        assert_eq!(MediaBackend::parse(" s3 "), MediaBackend::S3);
        assert_eq!(MediaBackend::parse("ftp"), MediaBackend::Local);
    }
}
