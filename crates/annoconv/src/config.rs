// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Layered converter configuration.
//!
//! Values are resolved from, lowest to highest priority:
//!
//! 1. Built-in defaults
//! 2. The user config file (`config.toml` in the platform config directory,
//!    e.g. `~/.config/annoconv/config.toml` on Linux)
//! 3. An explicit config file (`--config`)
//! 4. `ANNOCONV_*` environment variables, e.g. `ANNOCONV_MAX_IMAGES=100` or
//!    `ANNOCONV_CATEGORIES=person,car`

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, dispatch::ReadOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Pretty-print JSON artifacts.
    pub pretty: bool,
    /// Class manifest directory, relative to the output directory.
    pub classes_dir: String,
    /// Maximum number of images to read per input (0 = unlimited).
    pub max_images: usize,
    /// Category names to keep (COCO only, empty = all).
    pub categories: Vec<String>,
    /// Reject COCO inputs with dangling image or category references.
    pub strict: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            classes_dir: crate::dispatch::CLASSES_DIR.to_string(),
            max_images: 0,
            categories: Vec::new(),
            strict: false,
        }
    }
}

impl ConverterConfig {
    /// Location of the user config file, if the platform has a config
    /// directory.
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("ai", "Au-Zone", "annoconv").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the configuration with the user config file and an optional
    /// explicit file.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        let user = Self::user_config_path();
        if let Some(path) = &user {
            log::debug!("User config path: {:?}", path);
        }
        Self::load_from(user.as_deref(), explicit)
    }

    /// Load the configuration from the given files. The user file is
    /// optional, the explicit file must exist.
    pub fn load_from(user: Option<&Path>, explicit: Option<&Path>) -> Result<Self, Error> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("pretty", defaults.pretty)?
            .set_default("classes_dir", defaults.classes_dir)?
            .set_default("max_images", defaults.max_images as u64)?
            .set_default("categories", Vec::<String>::new())?
            .set_default("strict", defaults.strict)?;

        if let Some(user) = user {
            builder = builder.add_source(File::from(user).required(false));
        }
        if let Some(explicit) = explicit {
            builder = builder.add_source(File::from(explicit).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("ANNOCONV")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("categories"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        if config.classes_dir.trim().is_empty() {
            return Err(Error::InvalidParameters(
                "classes_dir must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            max_images: self.max_images,
            categories: self.categories.clone(),
            strict: self.strict,
        }
    }
}
