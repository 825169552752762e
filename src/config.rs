//=========================================================================
// Stage Configuration
//=========================================================================
//
// Settings for the orchestration layer, with safe defaults and optional
// INI persistence.
//
// File format:
// ```ini
// [stage]
// loader_scene = Preloader
// next_scene = Main
// persistent_sounds = bgm
// reserved_keys = movie
//
// [urls]
// image_base = assets/images
// sound_base = assets/sounds
// video_base = assets/videos
//
// [transport]
// timeout_ms = 0
// with_credentials = false
//
// [headers]
// x-build = 42
//
// [common]
// images = btn_ok, btn_quit
// sounds = SE_03
// videos =
// ```
//
// Lists are comma separated. `timeout_ms = 0` means no timeout. The
// `[transport]` section is only forwarded to the engine when present.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use log::info;
use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use crate::core::assets::{CommonAssets, LoadOptions};
use crate::core::scene::SceneId;
use crate::error::StageError;

//=== Defaults ============================================================

const DEFAULT_LOADER_SCENE: &str = "Preloader";
const DEFAULT_NEXT_SCENE: &str = "Main";
const DEFAULT_PERSISTENT_SOUND: &str = "bgm";
const DEFAULT_RESERVED_KEY: &str = "movie";
const DEFAULT_CONFIG_PATH: &str = "./stage.ini";

//=== Stage Config ========================================================

/// Orchestration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Scene launched first; loads shared assets and hands off to `next_scene`.
    pub loader_scene: SceneId,
    /// Scene the loader hands off to once its own load completes.
    pub next_scene: SceneId,
    /// Sound keys left playing across scene hand-offs.
    pub persistent_sounds: Vec<String>,
    /// Manifest keys skipped, subtree included, when flattening.
    pub reserved_keys: Vec<String>,
    /// Base URLs and transport settings for path assets.
    pub load_options: LoadOptions,
    /// Shared assets loaded by the loader scene.
    pub common: CommonAssets,
    /// Path of the INI file used by `load_from_file` / `save_to_file`.
    pub config_path: PathBuf,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StageConfig {
    //--- Construction -----------------------------------------------------

    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            loader_scene: SceneId::from(DEFAULT_LOADER_SCENE),
            next_scene: SceneId::from(DEFAULT_NEXT_SCENE),
            persistent_sounds: vec![DEFAULT_PERSISTENT_SOUND.to_owned()],
            reserved_keys: vec![DEFAULT_RESERVED_KEY.to_owned()],
            load_options: LoadOptions::default(),
            common: CommonAssets::default(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Creates a default configuration bound to a custom file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    //--- Builder Overrides ------------------------------------------------

    /// Sets the loader scene.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn with_loader_scene(mut self, id: impl Into<SceneId>) -> Self {
        let id = id.into();
        assert!(!id.as_str().is_empty(), "Loader scene id must not be empty");
        self.loader_scene = id;
        self
    }

    /// Sets the scene the loader hands off to.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn with_next_scene(mut self, id: impl Into<SceneId>) -> Self {
        let id = id.into();
        assert!(!id.as_str().is_empty(), "Next scene id must not be empty");
        self.next_scene = id;
        self
    }

    pub fn with_persistent_sounds<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.persistent_sounds = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reserved_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = options;
        self
    }

    pub fn with_common_assets(mut self, common: CommonAssets) -> Self {
        self.common = common;
        self
    }

    //--- Persistence ------------------------------------------------------

    /// Loads values from the INI file at `config_path`.
    ///
    /// Missing values keep their current values.
    pub fn load_from_file(&mut self) -> Result<(), StageError> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|detail| self.config_error(detail))?;

        // [stage] section
        if let Some(id) = non_empty(config.get("stage", "loader_scene")) {
            self.loader_scene = SceneId::from(id);
        }
        if let Some(id) = non_empty(config.get("stage", "next_scene")) {
            self.next_scene = SceneId::from(id);
        }
        if let Some(list) = config.get("stage", "persistent_sounds") {
            self.persistent_sounds = split_list(&list);
        }
        if let Some(list) = config.get("stage", "reserved_keys") {
            self.reserved_keys = split_list(&list);
        }

        // [urls] section
        let options = &mut self.load_options;
        if let Some(base) = config.get("urls", "image_base") {
            options.image_base_url = base;
        }
        if let Some(base) = config.get("urls", "sound_base") {
            options.sound_base_url = base;
        }
        if let Some(base) = config.get("urls", "video_base") {
            options.video_base_url = base;
        }

        // [transport] and [headers] sections
        if config.sections().iter().any(|section| section == "transport") {
            let mut transport = options.transport.take().unwrap_or_default();
            let timeout = config
                .getuint("transport", "timeout_ms")
                .map_err(|detail| self.config_error(detail))?;
            if let Some(timeout) = timeout {
                transport.timeout_ms = (timeout > 0).then_some(timeout);
            }
            let credentials = config
                .getbool("transport", "with_credentials")
                .map_err(|detail| self.config_error(detail))?;
            if let Some(credentials) = credentials {
                transport.with_credentials = credentials;
            }
            if let Some(headers) = config.get_map_ref().get("headers") {
                let mut headers: Vec<(String, String)> = headers
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone().unwrap_or_default()))
                    .collect();
                headers.sort();
                transport.headers = headers;
            }
            self.load_options.transport = Some(transport);
        }

        // [common] section
        if let Some(list) = config.get("common", "images") {
            self.common.images = split_list(&list);
        }
        if let Some(list) = config.get("common", "sounds") {
            self.common.sounds = split_list(&list);
        }
        if let Some(list) = config.get("common", "videos") {
            self.common.videos = split_list(&list);
        }

        info!(
            "Loaded stage config: loader={}, next={}, persistent={:?}, reserved={:?}",
            self.loader_scene, self.next_scene, self.persistent_sounds, self.reserved_keys
        );
        Ok(())
    }

    /// Saves the configuration to the INI file at `config_path`.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), StageError> {
        let mut config = Ini::new();

        // [stage] section
        config.set("stage", "loader_scene", Some(self.loader_scene.to_string()));
        config.set("stage", "next_scene", Some(self.next_scene.to_string()));
        config.set("stage", "persistent_sounds", Some(self.persistent_sounds.join(", ")));
        config.set("stage", "reserved_keys", Some(self.reserved_keys.join(", ")));

        // [urls] section
        let options = &self.load_options;
        config.set("urls", "image_base", Some(options.image_base_url.clone()));
        config.set("urls", "sound_base", Some(options.sound_base_url.clone()));
        config.set("urls", "video_base", Some(options.video_base_url.clone()));

        // [transport] and [headers] sections
        if let Some(transport) = &options.transport {
            let timeout = transport.timeout_ms.unwrap_or(0);
            config.set("transport", "timeout_ms", Some(timeout.to_string()));
            config.set(
                "transport",
                "with_credentials",
                Some(transport.with_credentials.to_string()),
            );
            for (name, value) in &transport.headers {
                config.set("headers", name, Some(value.clone()));
            }
        }

        // [common] section
        config.set("common", "images", Some(self.common.images.join(", ")));
        config.set("common", "sounds", Some(self.common.sounds.join(", ")));
        config.set("common", "videos", Some(self.common.videos.join(", ")));

        config
            .write(&self.config_path)
            .map_err(|err| self.config_error(err.to_string()))?;

        info!("Saved stage config to {:?}", self.config_path);
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    //--- Internal Helpers -------------------------------------------------

    fn config_error(&self, detail: String) -> StageError {
        StageError::Config {
            file: self.config_path.clone(),
            detail,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

//=========================================================================
// Unit Tests
//=========================================================================
