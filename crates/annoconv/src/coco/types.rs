// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON data structures for serde deserialization.
//!
//! Covers the fields used by instance segmentation, object detection and
//! keypoint detection annotation files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geometry::RunLengths;

/// Top-level COCO dataset structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoDataset {
    #[serde(default)]
    pub info: CocoInfo,
    #[serde(default)]
    pub images: Vec<CocoImage>,
    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,
    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

/// Dataset metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoInfo {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
}

/// Image metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Path of the image relative to the images folder.
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub coco_url: Option<String>,
}

impl CocoImage {
    /// Image name used to key the canonical documents.
    ///
    /// The final path component of `file_name`, falling back to the last
    /// segment of `coco_url`.
    pub fn name(&self) -> Option<String> {
        let from_file = self
            .file_name
            .as_deref()
            .and_then(|f| Path::new(f).file_name())
            .map(|f| f.to_string_lossy().to_string());

        from_file.or_else(|| {
            self.coco_url
                .as_deref()
                .and_then(|url| url.rsplit('/').next())
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
        })
    }
}

/// Category definition, with the keypoint skeleton for keypoint datasets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub supercategory: Option<String>,
    /// Ordered keypoint names.
    #[serde(default)]
    pub keypoints: Vec<String>,
    /// Edges between keypoints, 1-based indices into `keypoints`.
    #[serde(default)]
    pub skeleton: Vec<[usize; 2]>,
}

/// One annotation record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoAnnotation {
    #[serde(default)]
    pub id: u64,
    pub image_id: u64,
    pub category_id: u32,
    /// `[x, y, width, height]` in pixels.
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub iscrowd: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<CocoSegmentation>,
    /// Flat `(x, y, visibility)` triples.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keypoints: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_keypoints: Option<u32>,
}

impl CocoAnnotation {
    /// Declared keypoint count, or the number of triples with visibility > 0
    /// when the field is absent.
    pub fn keypoint_count(&self) -> usize {
        match self.num_keypoints {
            Some(n) => n as usize,
            None => self
                .keypoints
                .chunks_exact(3)
                .filter(|triple| triple[2] > 0.0)
                .count(),
        }
    }
}

/// Segmentation: polygon list or RLE (counts array or compressed string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CocoSegmentation {
    /// `[[x1, y1, x2, y2, ...], ...]`, one list per disjoint part.
    Polygon(Vec<Vec<f64>>),
    Rle(CocoRle),
}

/// Column-major run-length encoded mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoRle {
    pub counts: RunLengths,
    /// `[height, width]`.
    pub size: [u32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segmentation_forms() {
        let seg: CocoSegmentation =
            serde_json::from_str("[[100.0, 200.0, 150.0, 250.0, 100.0, 250.0]]").unwrap();
        assert!(matches!(seg, CocoSegmentation::Polygon(ref p) if p[0].len() == 6));

        let seg: CocoSegmentation =
            serde_json::from_str(r#"{"counts": [10, 20, 30, 40], "size": [10, 10]}"#).unwrap();
        match seg {
            CocoSegmentation::Rle(rle) => {
                assert_eq!(rle.counts, RunLengths::Counts(vec![10, 20, 30, 40]));
                assert_eq!(rle.size, [10, 10]);
            }
            _ => panic!("Expected RLE segmentation"),
        }

        let seg: CocoSegmentation =
            serde_json::from_str(r#"{"counts": "324O", "size": [2, 5]}"#).unwrap();
        assert!(matches!(
            seg,
            CocoSegmentation::Rle(CocoRle { counts: RunLengths::Compressed(_), .. })
        ));
    }

    #[test]
    fn test_keypoint_annotation() {
        let ann: CocoAnnotation = serde_json::from_str(
            r#"{"id": 5, "image_id": 1, "category_id": 1,
                "keypoints": [10, 20, 2, 0, 0, 0, 30, 40, 1], "num_keypoints": 2}"#,
        )
        .unwrap();
        assert_eq!(ann.keypoints.len(), 9);
        assert_eq!(ann.keypoint_count(), 2);
        assert!(ann.bbox.is_none());

        let ann = CocoAnnotation {
            keypoints: vec![10.0, 20.0, 2.0, 0.0, 0.0, 0.0, 30.0, 40.0, 1.0],
            ..Default::default()
        };
        assert_eq!(ann.keypoint_count(), 2);
    }

    #[test]
    fn test_image_name() {
        let image = CocoImage {
            id: 1,
            file_name: Some("train2017/000000000009.jpg".to_string()),
            ..Default::default()
        };
        assert_eq!(image.name().as_deref(), Some("000000000009.jpg"));

        let image = CocoImage {
            id: 2,
            coco_url: Some("http://images.cocodataset.org/val2017/000000000139.jpg".to_string()),
            ..Default::default()
        };
        assert_eq!(image.name().as_deref(), Some("000000000139.jpg"));

        let image = CocoImage {
            id: 3,
            ..Default::default()
        };
        assert_eq!(image.name(), None);
    }

    #[test]
    fn test_category_skeleton() {
        let cat: CocoCategory = serde_json::from_str(
            r#"{"id": 1, "name": "person", "keypoints": ["nose", "eye"], "skeleton": [[1, 2]]}"#,
        )
        .unwrap();
        assert_eq!(cat.keypoints, vec!["nose", "eye"]);
        assert_eq!(cat.skeleton, vec![[1, 2]]);
    }
}
