//=========================================================================
// Asset Pipeline
//=========================================================================
//
// Turns manifest entries into engine load requests.
//
// Architecture:
//   Manifest (JSON tree) ──flatten──> AssetDescriptor { key, raw }
//        ↓ classify()
//   Classification { kind, source }
//        ↓ ResourceLoader::load_batch()
//   LoadQueue::enqueue / add_inline_texture / decode_audio
//
// Components:
// - `classifier`: descriptor → asset kind, by inline MIME or extension
// - `manifest`: nested manifest tree, flattened into keyed descriptors
// - `loader`: batch loader with residency de-duplication
// - `catalog`: per-scene asset groups discovered under an asset root
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::engine::CacheKind;

//=== Module Declarations =================================================

mod catalog;
mod classifier;
mod loader;
mod manifest;

//=== Public API ==========================================================

pub use catalog::{file_stem, AssetCatalog, CatalogEntry, CommonAssets, MediaGroup};
pub use classifier::{classify, Extension, MediaFamily};
pub use loader::{LoadOptions, ResourceLoader};
pub use manifest::{FlatManifest, Manifest, ManifestNode};

//=== Asset Descriptor ====================================================

/// One flattened manifest entry: a cache key and its raw value.
///
/// `raw` is either a relative path or a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub key: String,
    pub raw: String,
}

impl AssetDescriptor {
    pub fn new(key: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            raw: raw.into(),
        }
    }
}

//=== Inline Payload ======================================================

/// A `data:` URI carried inline in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePayload {
    /// Media type from the URI header, e.g. `image/png`.
    pub mime: String,
    /// The full URI, header included.
    pub uri: String,
}

impl InlinePayload {
    /// Encoded body after the first comma. Empty if the URI has none.
    pub fn body(&self) -> &str {
        self.uri.split_once(',').map_or("", |(_, body)| body)
    }
}

//=== Asset Kind ==========================================================

/// What a descriptor loads as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    SpriteSheet { frame_width: u32, frame_height: u32 },
    Atlas,
    Audio,
    Video,
    InlineImage,
    InlineAudio,
}

impl AssetKind {
    /// Cache consulted for residency before loading.
    pub fn cache(&self) -> CacheKind {
        match self {
            Self::Image | Self::SpriteSheet { .. } | Self::Atlas | Self::InlineImage => {
                CacheKind::Texture
            }
            Self::Audio | Self::InlineAudio => CacheKind::Audio,
            Self::Video => CacheKind::Video,
        }
    }
}

//=== Classification ======================================================

/// Where a classified asset's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Relative path, resolved against a base URL at load time.
    Path { path: String, extension: Extension },
    Inline(InlinePayload),
}

/// Result of classifying one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: AssetKind,
    pub source: AssetSource,
}

//=========================================================================
// Unit Tests
//=========================================================================
