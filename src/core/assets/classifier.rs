//=========================================================================
// Asset Classifier
//=========================================================================
//
// Decides what a manifest value loads as.
//
// Rules, first match wins:
//   1. `data:image...` / `data:audio...` → inline, by MIME type
//   2. extension of the last path segment, case-insensitive
//   3. raster images: `_<W>x<H>` stem suffix → sprite sheet,
//      `_atlas` stem suffix → atlas, otherwise plain image
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::{AssetDescriptor, AssetKind, AssetSource, Classification, InlinePayload};
use crate::error::AssetError;

//=== Supported Types =====================================================

const INLINE_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "image/svg+xml"];
const INLINE_AUDIO_TYPES: [&str; 3] = ["audio/ogg", "audio/mpeg", "audio/wav"];

const ATLAS_MARKER: &str = "_atlas";

//=== Extension ===========================================================

/// Supported file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Png,
    Jpg,
    Jpeg,
    Webp,
    Svg,
    Ogg,
    Mp3,
    Wav,
    Mp4,
    Webm,
}

/// Broad media family of an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFamily {
    RasterImage,
    VectorImage,
    Audio,
    Video,
}

impl Extension {
    /// Parses an extension without its leading dot, ignoring case.
    pub fn parse(ext: &str) -> Option<Self> {
        let ext = match ext.to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" => Self::Jpg,
            "jpeg" => Self::Jpeg,
            "webp" => Self::Webp,
            "svg" => Self::Svg,
            "ogg" => Self::Ogg,
            "mp3" => Self::Mp3,
            "wav" => Self::Wav,
            "mp4" => Self::Mp4,
            "webm" => Self::Webm,
            _ => return None,
        };
        Some(ext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Svg => "svg",
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }

    pub fn family(&self) -> MediaFamily {
        match self {
            Self::Png | Self::Jpg | Self::Jpeg | Self::Webp => MediaFamily::RasterImage,
            Self::Svg => MediaFamily::VectorImage,
            Self::Ogg | Self::Mp3 | Self::Wav => MediaFamily::Audio,
            Self::Mp4 | Self::Webm => MediaFamily::Video,
        }
    }
}

//=== Classification ======================================================

/// Classifies one descriptor.
///
/// Pure: the same descriptor always yields the same result.
pub fn classify(descriptor: &AssetDescriptor) -> Result<Classification, AssetError> {
    let raw = descriptor.raw.as_str();
    if raw.starts_with("data:image") || raw.starts_with("data:audio") {
        classify_inline(&descriptor.key, raw)
    } else {
        classify_path(&descriptor.key, raw)
    }
}

fn classify_inline(key: &str, raw: &str) -> Result<Classification, AssetError> {
    let header = raw.split_once(',').map_or(raw, |(header, _)| header);
    let media = header.strip_prefix("data:").unwrap_or(header);
    let mime = media.split(';').next().unwrap_or(media);

    let kind = if INLINE_IMAGE_TYPES.contains(&mime) {
        AssetKind::InlineImage
    } else if INLINE_AUDIO_TYPES.contains(&mime) {
        AssetKind::InlineAudio
    } else {
        return Err(AssetError::UnsupportedMediaType {
            key: key.to_owned(),
            mime: mime.to_owned(),
        });
    };

    Ok(Classification {
        kind,
        source: AssetSource::Inline(InlinePayload {
            mime: mime.to_owned(),
            uri: raw.to_owned(),
        }),
    })
}

fn classify_path(key: &str, raw: &str) -> Result<Classification, AssetError> {
    let file_name = raw.rsplit('/').next().unwrap_or(raw);
    let unsupported = |extension: Option<&str>| AssetError::UnsupportedExtension {
        key: key.to_owned(),
        extension: extension.map(str::to_ascii_lowercase),
    };

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, ext),
        _ => return Err(unsupported(None)),
    };
    let extension = Extension::parse(ext).ok_or_else(|| unsupported(Some(ext)))?;

    let kind = match extension.family() {
        MediaFamily::VectorImage => AssetKind::Image,
        MediaFamily::Audio => AssetKind::Audio,
        MediaFamily::Video => AssetKind::Video,
        MediaFamily::RasterImage => {
            if let Some((frame_width, frame_height)) = sprite_dimensions(stem) {
                AssetKind::SpriteSheet {
                    frame_width,
                    frame_height,
                }
            } else if is_atlas_stem(stem) {
                AssetKind::Atlas
            } else {
                AssetKind::Image
            }
        }
    };

    Ok(Classification {
        kind,
        source: AssetSource::Path {
            path: raw.to_owned(),
            extension,
        },
    })
}

//=== Suffix Parsing ======================================================

/// Frame size from a `_<W>x<H>` stem suffix, optionally followed by a
/// `-variant` or `_variant` tag. The leftmost match wins.
pub(crate) fn sprite_dimensions(stem: &str) -> Option<(u32, u32)> {
    stem.match_indices('_')
        .find_map(|(idx, _)| parse_dimension_suffix(&stem[idx + 1..]))
}

fn parse_dimension_suffix(suffix: &str) -> Option<(u32, u32)> {
    let (width, rest) = leading_number(suffix)?;
    let rest = rest.strip_prefix('x')?;
    let (height, rest) = leading_number(rest)?;

    if width == 0 || height == 0 {
        return None;
    }
    match rest.chars().next() {
        None => Some((width, height)),
        Some('-' | '_') if rest.len() > 1 => Some((width, height)),
        _ => None,
    }
}

fn leading_number(s: &str) -> Option<(u32, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

/// True for stems ending in `_atlas` or `_atlas-<variant>`.
pub(crate) fn is_atlas_stem(stem: &str) -> bool {
    stem.match_indices(ATLAS_MARKER).any(|(idx, _)| {
        let rest = &stem[idx + ATLAS_MARKER.len()..];
        rest.is_empty() || (rest.starts_with('-') && rest.len() > 1)
    })
}

//=========================================================================
// Unit Tests
//=========================================================================
