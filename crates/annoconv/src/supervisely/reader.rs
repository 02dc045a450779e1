// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use walkdir::WalkDir;

use super::types::{SuperviselyItem, SuperviselyMeta, SuperviselyProject};
use crate::Error;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Read a Supervisely project: `meta.json` plus `<dataset>/ann/*.json`.
///
/// Datasets and annotation files are visited in name order. The image name
/// is the annotation file name without its trailing `.json`.
pub fn read_supervisely_project<P: AsRef<Path>>(
    root: P,
    max_images: usize,
) -> Result<SuperviselyProject, Error> {
    let root = root.as_ref();
    let meta_path = root.join("meta.json");
    if !meta_path.is_file() {
        return Err(Error::InvalidParameters(format!(
            "{} has no meta.json",
            root.display()
        )));
    }
    let meta: SuperviselyMeta = read_json(&meta_path)?;

    let mut items = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        if max_images > 0 && items.len() >= max_images {
            break;
        }

        let path = entry.path();
        let Some(ann_dir) = path.parent() else {
            continue;
        };
        if ann_dir.file_name().is_none_or(|name| name != "ann") {
            continue;
        }
        let Some(image) = entry.file_name().to_string_lossy().strip_suffix(".json").map(str::to_string)
        else {
            continue;
        };
        let dataset = ann_dir
            .parent()
            .and_then(|d| d.file_name())
            .map(|d| d.to_string_lossy().to_string())
            .unwrap_or_default();

        items.push(SuperviselyItem {
            dataset,
            image,
            annotation: read_json(path)?,
        });
    }

    log::debug!(
        "Read {} Supervisely annotations from {}",
        items.len(),
        root.display()
    );
    Ok(SuperviselyProject { meta, items })
}
