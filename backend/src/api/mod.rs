//! API module
//!
//! Contains HTTP request handlers for the blog, analytics, media and user
//! endpoints.

pub mod analytics;
pub mod auth;
pub mod blogs;
pub mod media;
pub mod users;
pub mod utils;
