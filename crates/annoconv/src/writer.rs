// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Persists conversion artifacts to an output directory.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{Error, dispatch::Conversion};

/// Options for artifact writing.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Pretty-print JSON with indentation.
    pub pretty: bool,
    /// Class manifest directory, relative to the output directory.
    pub classes_dir: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            classes_dir: crate::dispatch::CLASSES_DIR.to_string(),
        }
    }
}

impl From<&crate::config::ConverterConfig> for WriteOptions {
    fn from(config: &crate::config::ConverterConfig) -> Self {
        Self {
            pretty: config.pretty,
            classes_dir: config.classes_dir.clone(),
        }
    }
}

/// Counts of files touched by [`ArtifactWriter::write`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub documents: usize,
    pub masks: usize,
    pub removed: usize,
}

/// Writes per-image documents, the class manifest and raster masks.
///
/// # Example
///
/// ```rust,no_run
/// use annoconv::{ArtifactWriter, coco::{CocoReader, object_detection}};
///
/// let dataset = CocoReader::new().read("instances.json")?;
/// let conversion = object_detection(&dataset)?;
/// ArtifactWriter::new().write(&conversion, "output")?;
/// # Ok::<(), annoconv::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArtifactWriter {
    options: WriteOptions,
}

impl ArtifactWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Write every artifact of `conversion` below `output_dir`.
    ///
    /// The class manifest is written even when it is empty. For pixel
    /// projects every `.png` file directly inside `output_dir` is removed
    /// before the new masks are written.
    pub fn write<P: AsRef<Path>>(
        &self,
        conversion: &Conversion,
        output_dir: P,
    ) -> Result<WriteSummary, Error> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;

        let mut summary = WriteSummary::default();
        for (path, value) in conversion.json_artifacts_in(&self.options.classes_dir)? {
            self.write_json(&output_dir.join(path), &value)?;
            summary.documents += 1;
        }

        if conversion.project_type() == crate::ProjectType::Pixel {
            summary.removed = remove_stale_masks(output_dir)?;
            for (path, mask) in conversion.mask_artifacts() {
                mask.save_with_format(output_dir.join(path), image::ImageFormat::Png)?;
                summary.masks += 1;
            }
        }

        log::debug!(
            "Wrote {} documents and {} masks to {} ({} stale masks removed)",
            summary.documents,
            summary.masks,
            output_dir.display(),
            summary.removed
        );
        Ok(summary)
    }

    fn write_json(&self, path: &Path, value: &serde_json::Value) -> Result<(), Error> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        if self.options.pretty {
            serde_json::to_writer_pretty(&mut writer, value)?;
        } else {
            serde_json::to_writer(&mut writer, value)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Remove `.png` files directly inside `dir`; returns how many were removed.
fn remove_stale_masks(dir: &Path) -> Result<usize, Error> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
