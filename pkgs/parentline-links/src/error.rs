//! Error types for link configuration

use thiserror::Error;

/// Errors raised while validating a [`crate::LinkConfig`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LinkError {
    #[error("Invalid app scheme: {0}")]
    InvalidScheme(String),
    #[error("Invalid universal link host: {0}")]
    InvalidHost(String),
    #[error("Universal link prefix must start with '/': {0}")]
    InvalidPrefix(String),
}
