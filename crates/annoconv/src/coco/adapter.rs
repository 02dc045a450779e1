// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO to canonical vector conversion.

use std::collections::HashMap;

use super::types::{CocoAnnotation, CocoCategory, CocoDataset, CocoSegmentation};
use crate::{
    Error,
    color::class_color,
    dispatch::Conversion,
    geometry::{decode_mask, extract_polygons},
    instance::{
        CanonicalInstance, ClassEntry, ImageAnnotationSet, InstanceType, RawPoints, build_instance,
    },
    report::ConversionReport,
    skeleton::remap_keypoints,
};

/// Lookup tables built once per conversion run.
struct CocoIndex<'a> {
    images: HashMap<u64, String>,
    categories: HashMap<u32, &'a CocoCategory>,
}

impl<'a> CocoIndex<'a> {
    /// Index the dataset and seed every named image with an empty list.
    fn build(
        dataset: &'a CocoDataset,
        documents: &mut ImageAnnotationSet,
        report: &mut ConversionReport,
    ) -> Self {
        let mut images = HashMap::with_capacity(dataset.images.len());
        for image in &dataset.images {
            match image.name() {
                Some(name) => {
                    documents.seed(&name);
                    images.insert(image.id, name);
                }
                None => report.skip(
                    format!("image {}", image.id),
                    None,
                    &Error::MissingImages("image has neither file_name nor coco_url".to_string()),
                ),
            }
        }

        let categories = dataset.categories.iter().map(|c| (c.id, c)).collect();

        Self { images, categories }
    }

    fn image(&self, ann: &CocoAnnotation) -> Result<&str, Error> {
        self.images
            .get(&ann.image_id)
            .map(String::as_str)
            .ok_or_else(|| Error::MissingImages(format!("image_id {}", ann.image_id)))
    }

    fn category(&self, ann: &CocoAnnotation) -> Result<&'a CocoCategory, Error> {
        self.categories
            .get(&ann.category_id)
            .copied()
            .ok_or_else(|| Error::MissingLabel(format!("category_id {}", ann.category_id)))
    }
}

/// Class manifest: categories in dataset order, keeping their ids.
fn class_manifest(dataset: &CocoDataset) -> Vec<ClassEntry> {
    dataset
        .categories
        .iter()
        .enumerate()
        .map(|(position, cat)| ClassEntry::new(cat.id, &cat.name, class_color(position)))
        .collect()
}

fn finish(
    documents: ImageAnnotationSet,
    classes: Vec<ClassEntry>,
    mut report: ConversionReport,
    task: &str,
) -> Conversion {
    report.images = documents.len();
    report.instances = documents.instance_count();
    log::info!("COCO {}: {}", task, report);
    Conversion::vector(documents, classes, report)
}

/// Route a record-level failure into the report, propagate anything else.
fn absorb<T>(
    result: Result<T, Error>,
    ann: &CocoAnnotation,
    image: Option<&str>,
    report: &mut ConversionReport,
) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_record_scoped() => {
            report.skip(ann.id, image, &err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Polygons of one annotation, from polygon lists or RLE masks, and the
/// indices of polygon-list parts with fewer than 3 points.
fn segmentation_polygons(ann: &CocoAnnotation) -> Result<(Vec<Vec<f64>>, Vec<usize>), Error> {
    let (polygons, dropped) = match &ann.segmentation {
        None => {
            return Err(Error::InvalidAnnotation(
                "annotation has no segmentation".to_string(),
            ));
        }
        Some(CocoSegmentation::Polygon(parts)) => {
            let (kept, dropped): (Vec<_>, Vec<_>) = parts
                .iter()
                .enumerate()
                .partition(|(_, p)| p.len() >= 6 && p.len() % 2 == 0);
            (
                kept.into_iter().map(|(_, p)| p.clone()).collect::<Vec<_>>(),
                dropped.into_iter().map(|(i, _)| i).collect(),
            )
        }
        Some(CocoSegmentation::Rle(rle)) => {
            let bitmap = decode_mask(&rle.counts, rle.size[0], rle.size[1])?;
            (extract_polygons(&bitmap), Vec::new())
        }
    };

    if polygons.is_empty() {
        return Err(Error::InvalidAnnotation(
            "segmentation has no polygon with at least 3 points".to_string(),
        ));
    }
    Ok((polygons, dropped))
}

struct StagedPolygons<'a> {
    id: u64,
    image: &'a str,
    class_name: &'a str,
    polygons: Vec<Vec<f64>>,
    dropped: Vec<usize>,
}

/// COCO instance segmentation to canonical polygons.
///
/// Polygon lists are used as-is and RLE masks (either encoding) are traced
/// into external contours. Polygon-list parts with fewer than 3 points are
/// skipped and counted one by one. Polygons share `groupId = annotation id` only when
/// that id appears on more than one record and yields more than one polygon
/// in total.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn instance_segmentation(dataset: &CocoDataset) -> Result<Conversion, Error> {
    let mut documents = ImageAnnotationSet::new();
    let mut report = ConversionReport::default();
    let index = CocoIndex::build(dataset, &mut documents, &mut report);

    let mut occurrences: HashMap<u64, usize> = HashMap::new();
    for ann in &dataset.annotations {
        *occurrences.entry(ann.id).or_default() += 1;
    }

    let mut staged = Vec::with_capacity(dataset.annotations.len());
    let mut polygon_totals: HashMap<u64, usize> = HashMap::new();
    for ann in &dataset.annotations {
        let image = index.image(ann).ok();
        let resolved = index.image(ann).and_then(|image| {
            let category = index.category(ann)?;
            let (polygons, dropped) = segmentation_polygons(ann)?;
            Ok(StagedPolygons {
                id: ann.id,
                image,
                class_name: category.name.as_str(),
                polygons,
                dropped,
            })
        });

        if let Some(record) = absorb(resolved, ann, image, &mut report)? {
            for part in &record.dropped {
                report.skip(
                    format!("{} part {}", ann.id, part + 1),
                    Some(record.image),
                    &Error::InvalidAnnotation("polygon has fewer than 3 points".to_string()),
                );
            }
            *polygon_totals.entry(record.id).or_default() += record.polygons.len();
            staged.push(record);
        }
    }

    for record in staged {
        let grouped = occurrences.get(&record.id).copied().unwrap_or(0) >= 2
            && polygon_totals.get(&record.id).copied().unwrap_or(0) >= 2;
        for polygon in record.polygons {
            let instance = build_instance(
                InstanceType::Polygon,
                RawPoints::Coordinates(polygon),
                vec![],
                vec![],
                record.class_name,
                None,
            )?;
            let instance = if grouped {
                instance.with_group_id(record.id)
            } else {
                instance
            };
            documents.push(record.image, instance);
        }
    }

    Ok(finish(
        documents,
        class_manifest(dataset),
        report,
        "instance segmentation",
    ))
}

fn detection_instance(index: &CocoIndex, ann: &CocoAnnotation) -> Result<CanonicalInstance, Error> {
    let category = index.category(ann)?;
    let [x, y, w, h] = ann
        .bbox
        .ok_or_else(|| Error::InvalidAnnotation("annotation has no bbox".to_string()))?;

    build_instance(
        InstanceType::Bbox,
        RawPoints::Coordinates(vec![x, y, x + w, y + h]),
        vec![],
        vec![],
        &category.name,
        None,
    )
}

/// COCO object detection: `[x, y, w, h]` boxes become corner boxes.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn object_detection(dataset: &CocoDataset) -> Result<Conversion, Error> {
    let mut documents = ImageAnnotationSet::new();
    let mut report = ConversionReport::default();
    let index = CocoIndex::build(dataset, &mut documents, &mut report);

    for ann in &dataset.annotations {
        let image = index.image(ann).ok();
        let resolved = index
            .image(ann)
            .and_then(|image| Ok((image, detection_instance(&index, ann)?)));

        if let Some((image, instance)) = absorb(resolved, ann, image, &mut report)? {
            documents.push(image, instance);
        }
    }

    Ok(finish(
        documents,
        class_manifest(dataset),
        report,
        "object detection",
    ))
}

fn keypoint_instance(index: &CocoIndex, ann: &CocoAnnotation) -> Result<CanonicalInstance, Error> {
    let category = index.category(ann)?;
    let remap = remap_keypoints(&ann.keypoints, &category.keypoints, &category.skeleton);
    if remap.points.is_empty() {
        return Err(Error::InvalidAnnotation(
            "every keypoint is at (0, 0)".to_string(),
        ));
    }
    if !remap.bad_points.is_empty() {
        log::debug!(
            "Annotation {} dropped keypoints {:?}",
            ann.id,
            remap.bad_points
        );
    }

    build_instance(
        InstanceType::Template,
        RawPoints::Keypoints(remap.points),
        vec![],
        remap.connections,
        &category.name,
        Some(remap.point_labels),
    )
}

/// COCO keypoint detection to canonical templates.
///
/// Records without labelled keypoints are counted as skipped without a
/// warning. Keypoints at `(0, 0)` are dropped and the rest renumbered
/// against the category skeleton.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn keypoint_detection(dataset: &CocoDataset) -> Result<Conversion, Error> {
    let mut documents = ImageAnnotationSet::new();
    let mut report = ConversionReport::default();
    let index = CocoIndex::build(dataset, &mut documents, &mut report);

    for ann in &dataset.annotations {
        if ann.keypoint_count() == 0 {
            report.skip_silently(ann.id);
            continue;
        }

        let image = index.image(ann).ok();
        let resolved = index
            .image(ann)
            .and_then(|image| Ok((image, keypoint_instance(&index, ann)?)));

        if let Some((image, instance)) = absorb(resolved, ann, image, &mut report)? {
            documents.push(image, instance);
        }
    }

    Ok(finish(
        documents,
        class_manifest(dataset),
        report,
        "keypoint detection",
    ))
}
