//! Service layer for business logic
//!
//! This module contains the rules behind the handlers (validation, derived
//! keys, aggregation), kept free of HTTP types so they can be tested directly.

pub mod analytics;
pub mod blogs;
pub mod media;
