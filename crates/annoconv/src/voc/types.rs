// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Pascal VOC data structures.
//!
//! ```xml
//! <annotation>
//!   <filename>2007_000032.jpg</filename>
//!   <size><width>500</width><height>281</height><depth>3</depth></size>
//!   <object>
//!     <name>aeroplane</name>
//!     <pose>Frontal</pose>
//!     <truncated>0</truncated>
//!     <difficult>0</difficult>
//!     <bndbox><xmin>104</xmin><ymin>78</ymin><xmax>375</xmax><ymax>183</ymax></bndbox>
//!   </object>
//! </annotation>
//! ```

use serde::{Deserialize, Serialize};

/// The 20 VOC object classes; class mask index `i` maps to entry `i - 1`.
pub const VOC_CLASSES: [&str; 20] = [
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

/// Mask index of the void (boundary/ignore) label.
pub const VOID_INDEX: u8 = 255;

/// Per-image annotation XML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "annotation")]
pub struct VocAnnotation {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size: Option<VocSize>,
    #[serde(rename = "object", default)]
    pub objects: Vec<VocObject>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocSize {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub depth: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocObject {
    pub name: String,
    #[serde(default)]
    pub pose: Option<String>,
    #[serde(default)]
    pub truncated: Option<u8>,
    #[serde(default)]
    pub difficult: Option<u8>,
    #[serde(default)]
    pub bndbox: Option<VocBndbox>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VocBndbox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Single-channel label image holding palette indices, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl LabelMap {
    /// Returns `None` when `data` does not hold `width * height` entries.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Object indices present in the map, ascending, without background
    /// and void.
    pub fn instance_indices(&self) -> Vec<u8> {
        let mut present = [false; 256];
        for &value in &self.data {
            present[value as usize] = true;
        }
        (1..VOID_INDEX).filter(|&i| present[i as usize]).collect()
    }

    /// Most frequent non-background, non-void value of `other` under the
    /// pixels where this map equals `index`.
    pub fn majority_under(&self, index: u8, other: &LabelMap) -> Option<u8> {
        if other.width != self.width || other.height != self.height {
            return None;
        }

        let mut histogram = [0usize; 256];
        for (value, label) in self.data.iter().zip(&other.data) {
            if *value == index && *label != 0 && *label != VOID_INDEX {
                histogram[*label as usize] += 1;
            }
        }

        // Ties resolve to the lowest label.
        let (label, count) = histogram
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|(_, count)| **count)?;
        (*count > 0).then_some(label as u8)
    }
}

/// One image of a VOC dataset with its optional segmentation masks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VocImage {
    /// File stem shared by the XML and mask files.
    pub stem: String,
    pub annotation: VocAnnotation,
    /// Instance index per pixel (`SegmentationObject`).
    pub object_mask: Option<LabelMap>,
    /// VOC class index per pixel (`SegmentationClass`).
    pub class_mask: Option<LabelMap>,
}

impl VocImage {
    /// Image name, from the XML `filename` or `<stem>.jpg`.
    pub fn name(&self) -> String {
        self.annotation
            .filename
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.jpg", self.stem))
    }
}

/// A VOC dataset: images in file-name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VocDataset {
    pub images: Vec<VocImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_annotation_xml() {
        let xml = r#"
            <annotation>
                <folder>VOC2012</folder>
                <filename>2007_000032.jpg</filename>
                <size><width>500</width><height>281</height><depth>3</depth></size>
                <segmented>1</segmented>
                <object>
                    <name>aeroplane</name>
                    <pose>Frontal</pose>
                    <truncated>0</truncated>
                    <difficult>0</difficult>
                    <bndbox><xmin>104</xmin><ymin>78</ymin><xmax>375</xmax><ymax>183.5</ymax></bndbox>
                </object>
                <object>
                    <name>person</name>
                    <bndbox><xmin>195</xmin><ymin>180</ymin><xmax>213</xmax><ymax>229</ymax></bndbox>
                </object>
            </annotation>"#;

        let annotation: VocAnnotation = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(annotation.filename.as_deref(), Some("2007_000032.jpg"));
        assert_eq!(annotation.size.unwrap().width, 500);
        assert_eq!(annotation.objects.len(), 2);
        assert_eq!(annotation.objects[0].pose.as_deref(), Some("Frontal"));
        assert_eq!(annotation.objects[0].bndbox.unwrap().ymax, 183.5);
        assert_eq!(annotation.objects[1].truncated, None);
    }

    #[test]
    fn test_label_map_indices_and_majority() {
        let objects = LabelMap::new(4, 2, vec![0, 1, 1, 255, 2, 2, 2, 0]).unwrap();
        let classes = LabelMap::new(4, 2, vec![0, 15, 12, 255, 7, 7, 3, 0]).unwrap();

        assert_eq!(objects.instance_indices(), vec![1, 2]);
        assert_eq!(objects.majority_under(2, &classes), Some(7));
        // Tie between 15 and 12 resolves to the lower label.
        assert_eq!(objects.majority_under(1, &classes), Some(12));
        assert_eq!(objects.majority_under(9, &classes), None);

        assert!(LabelMap::new(3, 3, vec![0; 4]).is_none());
    }

    #[test]
    fn test_image_name_fallback() {
        let image = VocImage {
            stem: "2008_000001".to_string(),
            ..Default::default()
        };
        assert_eq!(image.name(), "2008_000001.jpg");
    }
}
