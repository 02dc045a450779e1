// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Supervisely project structures.

use serde::{Deserialize, Serialize};

/// `meta.json`: project classes and tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuperviselyMeta {
    #[serde(default)]
    pub classes: Vec<SuperviselyClass>,
    #[serde(default)]
    pub tags: Vec<SuperviselyTagMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuperviselyClass {
    pub title: String,
    #[serde(default)]
    pub shape: String,
    /// Hex color, e.g. `#FF0000`.
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuperviselyTagMeta {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A tag on an image or object; `value` is absent for flag tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuperviselyTag {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl SuperviselyTag {
    /// Attribute value: the tag value as text, or the tag name for flags.
    pub fn value_text(&self) -> String {
        match &self.value {
            None | Some(serde_json::Value::Null) => self.name.clone(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperviselySize {
    pub height: u32,
    pub width: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuperviselyPoints {
    #[serde(default)]
    pub exterior: Vec<[f64; 2]>,
    #[serde(default)]
    pub interior: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperviselyObject {
    #[serde(default)]
    pub id: Option<u64>,
    pub class_title: String,
    pub geometry_type: String,
    #[serde(default)]
    pub points: Option<SuperviselyPoints>,
    #[serde(default)]
    pub tags: Vec<SuperviselyTag>,
}

/// Per-image annotation file (`<dataset>/ann/<image>.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuperviselyAnnotation {
    #[serde(default)]
    pub size: Option<SuperviselySize>,
    #[serde(default)]
    pub tags: Vec<SuperviselyTag>,
    #[serde(default)]
    pub objects: Vec<SuperviselyObject>,
}

/// One annotated image of a project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuperviselyItem {
    pub dataset: String,
    pub image: String,
    pub annotation: SuperviselyAnnotation,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuperviselyProject {
    pub meta: SuperviselyMeta,
    pub items: Vec<SuperviselyItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_annotation() {
        let ann: SuperviselyAnnotation = serde_json::from_str(
            r#"{
                "description": "",
                "size": {"height": 800, "width": 1200},
                "tags": [{"name": "night", "value": null}],
                "objects": [{
                    "id": 17,
                    "classTitle": "car",
                    "geometryType": "rectangle",
                    "tags": [{"name": "color", "value": "red"}],
                    "points": {"exterior": [[10, 20], [40, 60]], "interior": []}
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(ann.size.unwrap().width, 1200);
        assert_eq!(ann.objects[0].class_title, "car");
        assert_eq!(ann.objects[0].points.as_ref().unwrap().exterior[1], [40.0, 60.0]);
        assert_eq!(ann.objects[0].tags[0].value_text(), "red");
        assert_eq!(ann.tags[0].value_text(), "night");
    }

    #[test]
    fn test_numeric_tag_value() {
        let tag = SuperviselyTag {
            name: "age".to_string(),
            value: Some(serde_json::json!(3)),
        };
        assert_eq!(tag.value_text(), "3");
    }
}
