// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Canonical annotation instances.
//!
//! Every adapter produces [`CanonicalInstance`] values (vector projects) or
//! [`PixelInstance`] values (pixel projects), collected per image in an
//! [`ImageAnnotationSet`]. The class manifest is a list of [`ClassEntry`].

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Map of local point index (`local id - 1`) to keypoint name.
pub type PointLabels = BTreeMap<usize, String>;

/// Kind of a canonical vector instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    Polygon,
    Bbox,
    Template,
    Tag,
    Point,
    Polyline,
    Ellipse,
    Cuboid,
}

impl InstanceType {
    /// All supported instance kinds.
    pub const ALL: [InstanceType; 8] = [
        InstanceType::Polygon,
        InstanceType::Bbox,
        InstanceType::Template,
        InstanceType::Tag,
        InstanceType::Point,
        InstanceType::Polyline,
        InstanceType::Ellipse,
        InstanceType::Cuboid,
    ];
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            InstanceType::Polygon => "polygon",
            InstanceType::Bbox => "bbox",
            InstanceType::Template => "template",
            InstanceType::Tag => "tag",
            InstanceType::Point => "point",
            InstanceType::Polyline => "polyline",
            InstanceType::Ellipse => "ellipse",
            InstanceType::Cuboid => "cuboid",
        };
        write!(f, "{}", value)
    }
}

impl TryFrom<&str> for InstanceType {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        InstanceType::ALL
            .into_iter()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| Error::UnsupportedInstanceType(s.to_string()))
    }
}

impl std::str::FromStr for InstanceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.try_into()
    }
}

/// Keypoint of a template instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemplatePoint {
    /// Local point id, starting at 1.
    pub id: usize,
    pub x: f64,
    pub y: f64,
}

/// Edge between two template points, by local point id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: usize,
    pub from: usize,
    pub to: usize,
}

/// Instance attribute, e.g. `{name: "Left", groupName: "pose"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    pub group_name: String,
}

impl Attribute {
    pub fn new(group_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_name: group_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BboxCorners {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct XY {
    pub x: f64,
    pub y: f64,
}

/// Front (`f1`, `f2`) and rear (`r1`, `r2`) corners of a cuboid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CuboidCorners {
    pub f1: XY,
    pub f2: XY,
    pub r1: XY,
    pub r2: XY,
}

/// Geometry payload; its JSON fields are inlined into the instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Geometry {
    /// Polygon or polyline vertices, flat `[x1, y1, x2, y2, ...]`.
    Vertices { points: Vec<f64> },
    Bbox { points: BboxCorners },
    Template {
        points: Vec<TemplatePoint>,
        connections: Vec<Connection>,
    },
    Point { x: f64, y: f64 },
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        angle: f64,
    },
    Cuboid { points: CuboidCorners },
    Tag {},
}

/// Raw geometry handed to [`build_instance`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawPoints {
    /// Flat coordinate list; its required length depends on the type.
    Coordinates(Vec<f64>),
    /// Keypoints of a template.
    Keypoints(Vec<TemplatePoint>),
    /// No geometry (tags).
    None,
}

/// Canonical vector annotation instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalInstance {
    #[serde(rename = "type")]
    kind: InstanceType,
    #[serde(flatten)]
    geometry: Geometry,
    class_name: String,
    #[serde(skip_serializing_if = "is_ungrouped")]
    group_id: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    point_labels: PointLabels,
    attributes: Vec<Attribute>,
}

fn is_ungrouped(group_id: &u64) -> bool {
    *group_id == 0
}

impl CanonicalInstance {
    pub fn kind(&self) -> InstanceType {
        self.kind
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Group id, `0` when ungrouped.
    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    pub fn point_labels(&self) -> &PointLabels {
        &self.point_labels
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Template connections; empty for other kinds.
    pub fn connections(&self) -> &[Connection] {
        match &self.geometry {
            Geometry::Template { connections, .. } => connections,
            _ => &[],
        }
    }

    /// Attach a group id. Grouping is decided by the adapter, never here.
    pub fn with_group_id(self, group_id: u64) -> Self {
        Self { group_id, ..self }
    }
}

/// Build a canonical instance from raw geometry.
///
/// Only shape checks are performed: the coordinate count must fit `kind`,
/// keypoints are only valid for templates and connections only for
/// templates. A mismatch is an adapter bug and reported as
/// [`Error::UnsupportedInstanceType`].
///
/// # Example
/// ```
/// use annoconv::instance::{InstanceType, RawPoints, build_instance};
///
/// let bbox = build_instance(
///     InstanceType::Bbox,
///     RawPoints::Coordinates(vec![10.0, 20.0, 40.0, 60.0]),
///     vec![],
///     vec![],
///     "car",
///     None,
/// )?;
/// assert_eq!(bbox.class_name(), "car");
/// assert_eq!(bbox.group_id(), 0);
/// # Ok::<(), annoconv::Error>(())
/// ```
pub fn build_instance(
    kind: InstanceType,
    points: RawPoints,
    attributes: Vec<Attribute>,
    connections: Vec<Connection>,
    class_name: &str,
    point_labels: Option<PointLabels>,
) -> Result<CanonicalInstance, Error> {
    if kind != InstanceType::Template && !connections.is_empty() {
        return Err(Error::UnsupportedInstanceType(format!(
            "{} instance cannot carry connections",
            kind
        )));
    }

    let geometry = match (kind, points) {
        (InstanceType::Template, RawPoints::Keypoints(points)) => Geometry::Template {
            points,
            connections,
        },
        (InstanceType::Tag, RawPoints::None) => Geometry::Tag {},
        (InstanceType::Tag, RawPoints::Coordinates(c)) if c.is_empty() => Geometry::Tag {},
        (kind, RawPoints::Coordinates(c)) => coordinates_geometry(kind, c)?,
        (kind, RawPoints::Keypoints(_)) => {
            return Err(Error::UnsupportedInstanceType(format!(
                "{} instance cannot be built from keypoints",
                kind
            )));
        }
        (kind, RawPoints::None) => {
            return Err(Error::UnsupportedInstanceType(format!(
                "{} instance requires geometry",
                kind
            )));
        }
    };

    Ok(CanonicalInstance {
        kind,
        geometry,
        class_name: class_name.to_string(),
        group_id: 0,
        point_labels: point_labels.unwrap_or_default(),
        attributes,
    })
}

fn coordinates_geometry(kind: InstanceType, c: Vec<f64>) -> Result<Geometry, Error> {
    let len = c.len();
    let shape_error = |expected: &str| {
        Error::UnsupportedInstanceType(format!(
            "{} instance requires {}, got {} coordinates",
            kind, expected, len
        ))
    };

    match kind {
        InstanceType::Polygon if len >= 6 && len % 2 == 0 => Ok(Geometry::Vertices { points: c }),
        InstanceType::Polygon => Err(shape_error("at least 3 points")),
        InstanceType::Polyline if len >= 4 && len % 2 == 0 => {
            Ok(Geometry::Vertices { points: c })
        }
        InstanceType::Polyline => Err(shape_error("at least 2 points")),
        InstanceType::Bbox => match c[..] {
            [x1, y1, x2, y2] => Ok(Geometry::Bbox {
                points: BboxCorners { x1, y1, x2, y2 },
            }),
            _ => Err(shape_error("4 coordinates")),
        },
        InstanceType::Point => match c[..] {
            [x, y] => Ok(Geometry::Point { x, y }),
            _ => Err(shape_error("2 coordinates")),
        },
        InstanceType::Ellipse => match c[..] {
            [cx, cy, rx, ry, angle] => Ok(Geometry::Ellipse {
                cx,
                cy,
                rx,
                ry,
                angle,
            }),
            _ => Err(shape_error("5 values (cx, cy, rx, ry, angle)")),
        },
        InstanceType::Cuboid => match c[..] {
            [f1x, f1y, f2x, f2y, r1x, r1y, r2x, r2y] => Ok(Geometry::Cuboid {
                points: CuboidCorners {
                    f1: XY { x: f1x, y: f1y },
                    f2: XY { x: f2x, y: f2y },
                    r1: XY { x: r1x, y: r1y },
                    r2: XY { x: r2x, y: r2y },
                },
            }),
            _ => Err(shape_error("8 coordinates")),
        },
        InstanceType::Template => Err(shape_error("keypoints")),
        InstanceType::Tag => Err(shape_error("no coordinates")),
    }
}

/// Colored region of a pixel instance in the image's mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    /// Hex color, `#rrggbb`.
    pub color: String,
}

/// Instance of a pixel project, referencing its region by mask color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelInstance {
    class_name: String,
    class_id: u32,
    parts: Vec<Part>,
    attributes: Vec<Attribute>,
}

impl PixelInstance {
    pub fn new(class_name: &str, class_id: u32, color: String, attributes: Vec<Attribute>) -> Self {
        Self {
            class_name: class_name.to_string(),
            class_id,
            parts: vec![Part { color }],
            attributes,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

/// Ordered map from image name to its ordered instance list.
///
/// Both image order and instance order are insertion order. An image that
/// was [`seed`](Self::seed)ed but received no instances keeps an empty list,
/// so "no instances" stays distinguishable from "not processed".
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnnotationSet<I = CanonicalInstance> {
    images: IndexMap<String, Vec<I>>,
}

impl<I> Default for ImageAnnotationSet<I> {
    fn default() -> Self {
        Self {
            images: IndexMap::new(),
        }
    }
}

impl<I> ImageAnnotationSet<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image with an empty instance list if not yet present.
    pub fn seed(&mut self, image: &str) {
        if !self.images.contains_key(image) {
            self.images.insert(image.to_string(), Vec::new());
        }
    }

    /// Append an instance to an image, creating its entry on first use.
    pub fn push(&mut self, image: &str, instance: I) {
        match self.images.get_mut(image) {
            Some(instances) => instances.push(instance),
            None => {
                self.images.insert(image.to_string(), vec![instance]);
            }
        }
    }

    pub fn get(&self, image: &str) -> Option<&[I]> {
        self.images.get(image).map(|v| v.as_slice())
    }

    /// Iterate `(image, instances)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[I])> {
        self.images.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterate every instance of every image in insertion order.
    pub fn instances(&self) -> impl Iterator<Item = &I> {
        self.images.values().flatten()
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Total number of instances across all images.
    pub fn instance_count(&self) -> usize {
        self.images.values().map(Vec::len).sum()
    }
}

/// Class manifest entry (`classes/classes.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub id: u32,
    pub name: String,
    /// Hex color, `#rrggbb`.
    pub color: String,
    #[serde(default)]
    pub attribute_groups: Vec<AttributeGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeGroup {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<ClassAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassAttribute {
    pub name: String,
}

impl ClassEntry {
    pub fn new(id: u32, name: &str, color: String) -> Self {
        Self {
            id,
            name: name.to_string(),
            color,
            attribute_groups: Vec::new(),
        }
    }

    /// Record an attribute value under its group, keeping first-seen order.
    pub fn add_attribute(&mut self, attribute: &Attribute) {
        let group = match self
            .attribute_groups
            .iter_mut()
            .position(|g| g.name == attribute.group_name)
        {
            Some(idx) => &mut self.attribute_groups[idx],
            None => {
                self.attribute_groups.push(AttributeGroup {
                    name: attribute.group_name.clone(),
                    attributes: Vec::new(),
                });
                let last = self.attribute_groups.len() - 1;
                &mut self.attribute_groups[last]
            }
        };

        if !group.attributes.iter().any(|a| a.name == attribute.name) {
            group.attributes.push(ClassAttribute {
                name: attribute.name.clone(),
            });
        }
    }
}
