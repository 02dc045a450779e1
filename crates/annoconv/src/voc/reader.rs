// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Reader for a VOC root directory.
//!
//! ```text
//! VOC2012/
//! ├── Annotations/<stem>.xml
//! ├── SegmentationObject/<stem>.png   (optional)
//! └── SegmentationClass/<stem>.png    (optional)
//! ```

use std::path::Path;

use image::DynamicImage;
use walkdir::WalkDir;

use super::types::{LabelMap, VocAnnotation, VocDataset, VocImage};
use crate::{Error, color::palette_lookup};

/// Read every `Annotations/*.xml` of a VOC root, in file-name order.
///
/// `max_images` limits the number of images read (0 = unlimited).
pub fn read_voc_dataset<P: AsRef<Path>>(root: P, max_images: usize) -> Result<VocDataset, Error> {
    let root = root.as_ref();
    let annotations_dir = root.join("Annotations");
    if !annotations_dir.is_dir() {
        return Err(Error::InvalidParameters(format!(
            "{} has no Annotations directory",
            root.display()
        )));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(&annotations_dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "xml"))
    {
        if max_images > 0 && images.len() >= max_images {
            break;
        }

        let stem = match entry.path().file_stem() {
            Some(stem) => stem.to_string_lossy().to_string(),
            None => continue,
        };
        let xml = std::fs::read_to_string(entry.path())?;
        let annotation: VocAnnotation = quick_xml::de::from_str(&xml)?;

        let object_mask = read_label_map(&root.join("SegmentationObject").join(format!("{}.png", stem)))?;
        let class_mask = read_label_map(&root.join("SegmentationClass").join(format!("{}.png", stem)))?;

        images.push(VocImage {
            stem,
            annotation,
            object_mask,
            class_mask,
        });
    }

    log::debug!("Read {} VOC images from {}", images.len(), root.display());
    Ok(VocDataset { images })
}

/// Read a segmentation PNG as palette indices, `None` if the file is absent.
///
/// Grayscale PNGs already hold indices. Palette PNGs are expanded to RGB by
/// the decoder and mapped back through the VOC palette; colors outside the
/// palette become background.
pub fn read_label_map(path: &Path) -> Result<Option<LabelMap>, Error> {
    if !path.is_file() {
        return Ok(None);
    }

    let decoded = image::open(path)?;
    let (width, height) = (decoded.width() as usize, decoded.height() as usize);
    let data = match decoded {
        DynamicImage::ImageLuma8(gray) => gray.into_raw(),
        other => {
            let lookup = palette_lookup();
            other
                .to_rgb8()
                .pixels()
                .map(|p| lookup.get(&p.0).copied().unwrap_or(0))
                .collect()
        }
    };

    LabelMap::new(width, height, data).map(Some).ok_or_else(|| {
        Error::InvalidParameters(format!("{} has an unexpected pixel layout", path.display()))
    })
}
