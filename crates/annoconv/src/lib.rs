// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # Annotation Dataset Converter
//!
//! Converts annotated image datasets from COCO, Pascal VOC and Supervisely
//! into a canonical per-image annotation schema with a project-wide class
//! manifest and, for pixel projects, RGB instance masks.
//!
//! ## Features
//!
//! - **COCO**: object detection, instance segmentation (polygons and RLE)
//!   and keypoint detection with skeleton remapping
//! - **Pascal VOC**: object detection, instance segmentation from label
//!   rasters and pixel-level instance masks
//! - **Supervisely**: vector annotations with object and image tags
//! - **Dispatch**: a static table of strategies keyed by source format,
//!   project type and task
//! - **Artifacts**: per-image JSON documents, `classes/classes.json` and
//!   `___save.png` masks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use annoconv::{
//!     ArtifactWriter, Converter, Direction, Error, ProjectType, ReadOptions, SourceDataset,
//!     SourceFormat, Task,
//! };
//!
//! fn main() -> Result<(), Error> {
//!     let converter = Converter::select(
//!         SourceFormat::Coco,
//!         ProjectType::Vector,
//!         Task::ObjectDetection,
//!         Direction::ToCanonical,
//!     )?;
//!     let source = SourceDataset::read(
//!         SourceFormat::Coco,
//!         "instances_val2017.json",
//!         &ReadOptions::default(),
//!     )?;
//!     let conversion = converter.to_canonical(&source)?;
//!     println!("{}", conversion.report);
//!
//!     ArtifactWriter::new().write(&conversion, "output")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: Emits tracing spans around adapter entry points

pub mod coco;
pub mod color;
pub mod config;
pub mod dispatch;
mod error;
pub mod geometry;
pub mod instance;
pub mod report;
pub mod skeleton;
pub mod supervisely;
pub mod voc;
pub mod writer;

pub use crate::{
    config::ConverterConfig,
    dispatch::{
        Conversion, Converter, Direction, Documents, ProjectType, ReadOptions, STRATEGIES,
        SourceDataset, SourceFormat, Strategy, Task,
    },
    error::Error,
    instance::{CanonicalInstance, ClassEntry, ImageAnnotationSet, InstanceType, PixelInstance},
    report::{ConversionReport, ConversionWarning},
    writer::{ArtifactWriter, WriteOptions, WriteSummary},
};
