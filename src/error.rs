//! Error types shared across the places pipeline.
//!
//! Every recognized failure is terminal and local: the operation that hit it
//! logs, aborts and leaves cached results alone. Nothing here is retried.

use std::path::PathBuf;

use thiserror::Error;

use crate::scene::AnchorId;

/// Errors raised while assembling [`crate::config::PlacesConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config TOML: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("No API key configured (set PLACES_API_KEY or api_key in places.toml)")]
    MissingApiKey,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors raised by scene lookups and mutations.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("No origin exists in the scene")]
    NoOrigin,

    #[error("Scene has {0} origins; exactly one is required")]
    MultipleOrigins(usize),

    #[error("No anchor exists in the scene to use as a template")]
    NoTemplate,

    #[error("Scene has {0} anchors; name the template explicitly")]
    AmbiguousTemplate(usize),

    #[error("{count} anchors are named '{name}'; the template name must be unique")]
    DuplicateTemplateName { name: String, count: usize },

    #[error("No anchor named '{0}' exists in the scene")]
    TemplateNotFound(String),

    #[error("Unknown anchor {0}")]
    UnknownAnchor(AnchorId),

    #[error("Failed to read scene {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scene {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write scene {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scene has no backing file to save to")]
    NoBackingFile,
}

/// Failures below the HTTP status line: the transfer itself did not finish.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("building http client: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("reading response body: {0}")]
    Body(String),

    #[error("transfer task ended abnormally: {0}")]
    Task(String),
}

/// Outcome errors for a completed search request.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Places API returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Malformed Places response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

impl SearchError {
    /// HTTP status for remote failures, if the transfer got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from starting a search.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("A Tokio runtime is required to dispatch a search")]
    NoRuntime,
}

/// Errors from turning cached results into anchors.
#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Cannot create anchors: no search results are cached")]
    NoResults,

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("Stopped after creating {created} anchors: {source}")]
    Partial {
        created: usize,
        #[source]
        source: SceneError,
    },
}
