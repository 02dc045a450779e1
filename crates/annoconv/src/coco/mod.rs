// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # COCO Dataset Format Support
//!
//! Reads COCO (Common Objects in Context) annotation files and converts them
//! to canonical vector instances.
//!
//! ## Supported Tasks
//!
//! - **Instance segmentation**: polygon lists and RLE masks (counts array or
//!   compressed string) become polygon instances
//! - **Object detection**: `[x, y, w, h]` boxes become bbox instances
//! - **Keypoint detection**: keypoints and category skeletons become
//!   template instances
//!
//! ## Example
//!
//! ```rust,no_run
//! use annoconv::coco::{CocoReader, instance_segmentation};
//!
//! let dataset = CocoReader::new().read("annotations/instances_val2017.json")?;
//! let conversion = instance_segmentation(&dataset)?;
//! println!("{}", conversion.report);
//! # Ok::<(), annoconv::Error>(())
//! ```

mod adapter;
mod reader;
mod types;

pub use adapter::{instance_segmentation, keypoint_detection, object_detection};
pub use reader::{CocoReadOptions, CocoReader};
pub use types::{CocoAnnotation, CocoCategory, CocoDataset, CocoImage, CocoInfo, CocoRle, CocoSegmentation};
