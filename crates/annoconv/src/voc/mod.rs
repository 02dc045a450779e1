// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # Pascal VOC Support
//!
//! Object detection from the `Annotations` XML files, and instance
//! segmentation from the `SegmentationObject` / `SegmentationClass` PNG
//! masks, to either vector polygons or a pixel project.

mod adapter;
mod reader;
mod types;

pub use adapter::{instance_segmentation, object_detection, pixel_instance_segmentation};
pub use reader::{read_label_map, read_voc_dataset};
pub use types::{
    LabelMap, VOC_CLASSES, VOID_INDEX, VocAnnotation, VocBndbox, VocDataset, VocImage, VocObject,
    VocSize,
};
