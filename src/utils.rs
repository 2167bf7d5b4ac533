//! Utility functions and helpers.

pub mod settings;

pub use settings::{Settings, API_URL_VAR, ORG_VAR, TOKEN_VAR};
