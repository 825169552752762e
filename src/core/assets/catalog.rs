//=========================================================================
// Asset Catalog
//=========================================================================
//
// Flat index of every asset file under an asset root, grouped by media.
//
// Layout:
//   <root>/images/<Scene>/...   <root>/sounds/<Scene>/...   <root>/videos/<Scene>/...
//
// A scene's scoped manifest is every entry whose path contains
// `/<scene>/`, keyed by file stem. The loader scene additionally gets
// the configured common assets, matched by file name.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use super::{Manifest, ManifestNode};
use crate::core::scene::SceneId;
use crate::error::StageError;

//=== Media Group =========================================================

/// Top-level asset directory an entry was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaGroup {
    Images,
    Sounds,
    Videos,
}

impl MediaGroup {
    /// Merge order when building a manifest. Later groups win on key
    /// collisions.
    const MERGE_ORDER: [MediaGroup; 3] = [Self::Sounds, Self::Images, Self::Videos];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Sounds => "sounds",
            Self::Videos => "videos",
        }
    }
}

//=== Entries =============================================================

/// One asset file known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub group: MediaGroup,
    /// Path relative to the asset root, `/`-separated.
    pub path: String,
    /// Value written into manifests, relative to the load base URLs.
    pub url: String,
}

/// File-name fragments selecting the loader scene's shared assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonAssets {
    pub images: Vec<String>,
    pub sounds: Vec<String>,
    pub videos: Vec<String>,
}

impl CommonAssets {
    fn patterns(&self, group: MediaGroup) -> &[String] {
        match group {
            MediaGroup::Images => &self.images,
            MediaGroup::Sounds => &self.sounds,
            MediaGroup::Videos => &self.videos,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.sounds.is_empty() && self.videos.is_empty()
    }
}

//=== Asset Catalog =======================================================

/// Asset files grouped by media type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCatalog {
    entries: Vec<CatalogEntry>,
}

impl AssetCatalog {
    //--- Construction -----------------------------------------------------

    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry whose manifest value is the path itself.
    pub fn with_entry(mut self, group: MediaGroup, path: impl Into<String>) -> Self {
        let path = path.into();
        self.add(group, path.clone(), path);
        self
    }

    pub fn add(&mut self, group: MediaGroup, path: impl Into<String>, url: impl Into<String>) {
        self.entries.push(CatalogEntry {
            group,
            path: path.into(),
            url: url.into(),
        });
    }

    /// Indexes every file below `root/{images,sounds,videos}`.
    ///
    /// Entry paths and urls are relative to the group directory, so
    /// `root/images/Main/bg.png` becomes `Main/bg.png` under `Images`.
    pub fn scan(root: &Path) -> Result<Self, StageError> {
        let mut catalog = Self::new();
        for group in MediaGroup::MERGE_ORDER {
            let dir = root.join(group.dir_name());
            if !dir.is_dir() {
                debug!("Asset directory {} not present, skipping", dir.display());
                continue;
            }
            let mut files = Vec::new();
            collect_files(&dir, "", &mut files)?;
            files.sort();
            for relative in files {
                catalog.add(group, format!("/{relative}"), relative);
            }
        }
        debug!("Catalog indexed {} assets under {}", catalog.len(), root.display());
        Ok(catalog)
    }

    //--- Queries ----------------------------------------------------------

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Assets scoped to `scene`: every entry under a `/<scene>/` directory.
    pub fn scoped_manifest(&self, scene: &SceneId) -> Manifest {
        let marker = format!("/{}/", scene);
        self.build_manifest(|entry| entry.path.contains(&marker))
    }

    /// Shared assets whose path contains one of the configured fragments.
    pub fn common_manifest(&self, common: &CommonAssets) -> Manifest {
        self.build_manifest(|entry| {
            common
                .patterns(entry.group)
                .iter()
                .any(|fragment| entry.path.contains(fragment.as_str()))
        })
    }

    //--- Internal Helpers -------------------------------------------------

    fn build_manifest(&self, keep: impl Fn(&CatalogEntry) -> bool) -> Manifest {
        let mut manifest = Manifest::new();
        for group in MediaGroup::MERGE_ORDER {
            for entry in self.entries.iter().filter(|e| e.group == group && keep(e)) {
                manifest.insert(file_stem(&entry.path), ManifestNode::Asset(entry.url.clone()));
            }
        }
        manifest
    }
}

//=== Utilities ===========================================================

/// File name up to its first dot: `a/b/bg.min.png` → `bg`.
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.split('.').next().unwrap_or(name)
}

fn collect_files(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<(), StageError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if entry.file_type()?.is_dir() {
            collect_files(&entry.path(), &relative, out)?;
        } else {
            out.push(relative);
        }
    }
    Ok(())
}

//=========================================================================
// Unit Tests
//=========================================================================
