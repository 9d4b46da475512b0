//! Portfolio Backend Library
//!
//! This library exposes modules for testing and the maintenance binaries.
//! The server binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
/// Application state management
///
/// Handles the shared database, media bucket and configuration handles.
pub mod state;
pub mod storage;
