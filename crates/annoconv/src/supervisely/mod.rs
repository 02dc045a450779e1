// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # Supervisely Project Support
//!
//! Converts Supervisely vector annotations (rectangles, polygons, lines,
//! points and tags) to canonical vector instances.

mod adapter;
mod reader;
mod types;

pub use adapter::vector_annotation;
pub use reader::read_supervisely_project;
pub use types::{
    SuperviselyAnnotation, SuperviselyClass, SuperviselyItem, SuperviselyMeta, SuperviselyObject,
    SuperviselyPoints, SuperviselyProject, SuperviselySize, SuperviselyTag, SuperviselyTagMeta,
};
