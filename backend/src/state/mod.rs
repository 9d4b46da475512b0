//! Application state
//!
//! Shared handles to the table store, the media bucket and configuration.

pub mod app_state;

pub use app_state::AppState;
