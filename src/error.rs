//=========================================================================
// Error Types
//=========================================================================
//
// Two families of failure:
//
// - `StageError`: propagated with `?`. Engine-contract violations end the
//   transition attempt that hit them; nothing is retried.
// - `AssetError`: local to one descriptor. The loader logs it, drops the
//   descriptor and carries on with the batch.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::path::PathBuf;

//=== Internal Dependencies ===============================================

use crate::core::scene::SceneId;

//=== StageError ==========================================================

/// Errors that terminate an orchestration step.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The engine has no scene with this id.
    #[error("scene '{id}' not found in engine")]
    SceneNotFound { id: SceneId },

    /// No scene object was registered under this id.
    #[error("scene '{id}' has no registered scene object")]
    SceneNotRegistered { id: SceneId },

    /// A sound could not be played because no handle was supplied.
    #[error("audio rejected: {reason}")]
    AudioRejected { reason: String },

    /// A channel subscriber reported a failure.
    #[error("subscriber for '{topic}' failed: {detail}")]
    Subscriber { topic: &'static str, detail: String },

    /// A manifest could not be parsed.
    #[error("manifest parse error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// A configuration file could not be read or written.
    #[error("config error in {}: {detail}", file.display())]
    Config { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StageError {
    /// Shorthand for subscriber failures raised from application callbacks.
    pub fn subscriber(topic: &'static str, detail: impl Into<String>) -> Self {
        Self::Subscriber {
            topic,
            detail: detail.into(),
        }
    }
}

//=== AssetError ==========================================================

/// Per-descriptor classification failures. Never propagated out of a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// Inline payload whose MIME type is not in the supported set.
    #[error("unsupported inline media type '{mime}' for asset '{key}'")]
    UnsupportedMediaType { key: String, mime: String },

    /// Path without an extension, or with one outside the supported set.
    #[error("unsupported extension {extension:?} for asset '{key}'")]
    UnsupportedExtension {
        key: String,
        extension: Option<String>,
    },

    /// Atlas image without a `<key>_data` sibling. The atlas still loads.
    #[error("atlas '{key}' has no '{key}_data' metadata sibling")]
    MissingAtlasMetadata { key: String },
}

impl AssetError {
    /// Key of the descriptor the error refers to.
    pub fn key(&self) -> &str {
        match self {
            Self::UnsupportedMediaType { key, .. }
            | Self::UnsupportedExtension { key, .. }
            | Self::MissingAtlasMetadata { key } => key,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
