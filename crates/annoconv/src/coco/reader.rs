// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON/ZIP readers.

use super::types::*;
use crate::Error;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Options for COCO reading.
#[derive(Debug, Clone, Default)]
pub struct CocoReadOptions {
    /// Reject datasets with dangling image or category references.
    pub validate: bool,
    /// Maximum number of images to keep (0 = unlimited).
    pub max_images: usize,
    /// Keep only these category names (empty = all).
    pub category_filter: Vec<String>,
}

/// Reader for COCO annotation files and zipped annotation bundles.
///
/// # Example
///
/// ```rust,no_run
/// use annoconv::coco::CocoReader;
///
/// let reader = CocoReader::new();
/// let dataset = reader.read("annotations/person_keypoints_val2017.json")?;
/// println!("Loaded {} images", dataset.images.len());
/// # Ok::<(), annoconv::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CocoReader {
    options: CocoReadOptions,
}

impl CocoReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CocoReadOptions) -> Self {
        Self { options }
    }

    /// Read a JSON file, or a ZIP archive when the extension is `.zip`.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let path = path.as_ref();
        if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
        {
            self.read_annotations_zip(path)
        } else {
            self.read_json(path)
        }
    }

    /// Read a COCO dataset from a JSON file.
    pub fn read_json<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(64 * 1024, file);
        let dataset: CocoDataset = serde_json::from_reader(reader)?;
        log::debug!(
            "Read {}: {} images, {} annotations, {} categories",
            path.as_ref().display(),
            dataset.images.len(),
            dataset.annotations.len(),
            dataset.categories.len()
        );

        self.finish(dataset)
    }

    /// Read every `.json` entry of a ZIP archive and merge them.
    ///
    /// Images and categories are deduplicated by id, annotations appended.
    pub fn read_annotations_zip<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let file = File::open(path.as_ref())?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut merged = CocoDataset::default();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() || !entry.name().to_lowercase().ends_with(".json") {
                continue;
            }

            let name = entry.name().to_string();
            let mut contents = String::new();
            entry.read_to_string(&mut contents)?;
            let dataset: CocoDataset = serde_json::from_str(&contents)?;
            log::debug!("Merging {} from archive", name);
            merge_datasets(&mut merged, dataset);
        }

        self.finish(merged)
    }

    fn finish(&self, dataset: CocoDataset) -> Result<CocoDataset, Error> {
        if self.options.validate {
            validate_dataset(&dataset)?;
        }
        Ok(self.apply_filters(dataset))
    }

    fn apply_filters(&self, mut dataset: CocoDataset) -> CocoDataset {
        if self.options.max_images > 0 && dataset.images.len() > self.options.max_images {
            dataset.images.truncate(self.options.max_images);
            let image_ids: HashSet<_> = dataset.images.iter().map(|i| i.id).collect();
            dataset
                .annotations
                .retain(|a| image_ids.contains(&a.image_id));
        }

        if !self.options.category_filter.is_empty() {
            dataset
                .categories
                .retain(|c| self.options.category_filter.contains(&c.name));
            let category_ids: HashSet<_> = dataset.categories.iter().map(|c| c.id).collect();
            dataset
                .annotations
                .retain(|a| category_ids.contains(&a.category_id));
        }

        dataset
    }
}

/// Check that every annotation references a known image and category.
fn validate_dataset(dataset: &CocoDataset) -> Result<(), Error> {
    let image_ids: HashSet<_> = dataset.images.iter().map(|i| i.id).collect();
    let category_ids: HashSet<_> = dataset.categories.iter().map(|c| c.id).collect();

    for ann in &dataset.annotations {
        if !image_ids.contains(&ann.image_id) {
            return Err(Error::MissingImages(format!(
                "annotation {} references image_id {}",
                ann.id, ann.image_id
            )));
        }

        if !category_ids.contains(&ann.category_id) {
            return Err(Error::MissingLabel(format!(
                "annotation {} references category_id {}",
                ann.id, ann.category_id
            )));
        }

        if let Some(bbox) = ann.bbox
            && (bbox[2] < 0.0 || bbox[3] < 0.0)
        {
            return Err(Error::InvalidAnnotation(format!(
                "annotation {} has negative bbox dimensions",
                ann.id
            )));
        }
    }

    Ok(())
}

fn merge_datasets(target: &mut CocoDataset, source: CocoDataset) {
    if target.info.description.is_none() {
        target.info = source.info;
    }

    let existing_ids: HashSet<_> = target.images.iter().map(|i| i.id).collect();
    target
        .images
        .extend(source.images.into_iter().filter(|i| !existing_ids.contains(&i.id)));

    let existing_cats: HashSet<_> = target.categories.iter().map(|c| c.id).collect();
    target.categories.extend(
        source
            .categories
            .into_iter()
            .filter(|c| !existing_cats.contains(&c.id)),
    );

    target.annotations.extend(source.annotations);
}
