// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use std::collections::{HashMap, HashSet};

use super::types::{SuperviselyObject, SuperviselyProject, SuperviselyTag};
use crate::{
    Error,
    color::class_color,
    dispatch::Conversion,
    instance::{
        Attribute, CanonicalInstance, ClassEntry, ImageAnnotationSet, InstanceType, RawPoints,
        build_instance,
    },
    report::ConversionReport,
};

fn object_attributes(tags: &[SuperviselyTag]) -> Vec<Attribute> {
    tags.iter()
        .map(|tag| Attribute::new(tag.name.as_str(), tag.value_text()))
        .collect()
}

/// Map a Supervisely geometry onto a canonical type and flat coordinates.
fn object_geometry(object: &SuperviselyObject) -> Result<(InstanceType, Vec<f64>), Error> {
    let exterior = object
        .points
        .as_ref()
        .map(|p| p.exterior.as_slice())
        .unwrap_or_default();
    let flat = || exterior.iter().flatten().copied().collect::<Vec<f64>>();
    let invalid = |reason: &str| {
        Error::InvalidAnnotation(format!(
            "{} object {}: {}",
            object.geometry_type, object.class_title, reason
        ))
    };

    match object.geometry_type.as_str() {
        "rectangle" => match exterior {
            [[ax, ay], [bx, by]] => Ok((
                InstanceType::Bbox,
                vec![ax.min(*bx), ay.min(*by), ax.max(*bx), ay.max(*by)],
            )),
            _ => Err(invalid("expected 2 corner points")),
        },
        "polygon" if exterior.len() >= 3 => Ok((InstanceType::Polygon, flat())),
        "polygon" => Err(invalid("fewer than 3 points")),
        "line" if exterior.len() >= 2 => Ok((InstanceType::Polyline, flat())),
        "line" => Err(invalid("fewer than 2 points")),
        "point" => match exterior {
            [[x, y]] => Ok((InstanceType::Point, vec![*x, *y])),
            _ => Err(invalid("expected 1 point")),
        },
        other => Err(Error::InvalidAnnotation(format!(
            "geometry type {} is not converted",
            other
        ))),
    }
}

/// Class manifest: meta classes then tag names, ids `1..=n`.
fn class_manifest(project: &SuperviselyProject) -> Vec<ClassEntry> {
    let names = project
        .meta
        .classes
        .iter()
        .map(|c| (c.title.as_str(), c.color.as_deref()))
        .chain(
            project
                .meta
                .tags
                .iter()
                .map(|t| (t.name.as_str(), t.color.as_deref())),
        );

    names
        .enumerate()
        .map(|(position, (name, color))| {
            let color = color
                .map(str::to_lowercase)
                .unwrap_or_else(|| class_color(position));
            ClassEntry::new(position as u32 + 1, name, color)
        })
        .collect()
}

/// Supervisely project to canonical vector instances.
///
/// Objects become bbox, polygon (exterior ring), polyline or point
/// instances with their tags as attributes; image tags follow as tag
/// instances. Other geometry types, unknown classes and image tags missing
/// from the project meta are skipped with a warning.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn vector_annotation(project: &SuperviselyProject) -> Result<Conversion, Error> {
    let mut documents: ImageAnnotationSet<CanonicalInstance> = ImageAnnotationSet::new();
    let mut classes = class_manifest(project);
    let mut report = ConversionReport::default();

    let class_positions: HashMap<&str, usize> = project
        .meta
        .classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.title.as_str(), i))
        .collect();
    let tag_names: HashSet<&str> = project.meta.tags.iter().map(|t| t.name.as_str()).collect();

    for item in &project.items {
        documents.seed(&item.image);

        for (i, object) in item.annotation.objects.iter().enumerate() {
            let record = match object.id {
                Some(id) => id.to_string(),
                None => format!("{}/{} object {}", item.dataset, item.image, i + 1),
            };

            let Some(&position) = class_positions.get(object.class_title.as_str()) else {
                report.skip(
                    record,
                    Some(&item.image),
                    &Error::MissingLabel(format!("class {}", object.class_title)),
                );
                continue;
            };

            let (kind, coordinates) = match object_geometry(object) {
                Ok(geometry) => geometry,
                Err(err) if err.is_record_scoped() => {
                    report.skip(record, Some(&item.image), &err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            let attributes = object_attributes(&object.tags);
            for attribute in &attributes {
                classes[position].add_attribute(attribute);
            }
            let instance = build_instance(
                kind,
                RawPoints::Coordinates(coordinates),
                attributes,
                vec![],
                &object.class_title,
                None,
            )?;
            documents.push(&item.image, instance);
        }

        for tag in &item.annotation.tags {
            if !tag_names.contains(tag.name.as_str()) {
                report.skip(
                    format!("{}/{} tag {}", item.dataset, item.image, tag.name),
                    Some(&item.image),
                    &Error::MissingLabel(format!("tag {}", tag.name)),
                );
                continue;
            }
            let instance = build_instance(
                InstanceType::Tag,
                RawPoints::None,
                vec![],
                vec![],
                &tag.name,
                None,
            )?;
            documents.push(&item.image, instance);
        }
    }

    report.images = documents.len();
    report.instances = documents.instance_count();
    log::info!("Supervisely vector annotation: {}", report);
    Ok(Conversion::vector(documents, classes, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        instance::Geometry,
        supervisely::types::{
            SuperviselyAnnotation, SuperviselyClass, SuperviselyItem, SuperviselyMeta,
            SuperviselyPoints, SuperviselyTagMeta,
        },
    };

    fn object(class: &str, geometry: &str, exterior: Vec<[f64; 2]>) -> SuperviselyObject {
        SuperviselyObject {
            id: None,
            class_title: class.to_string(),
            geometry_type: geometry.to_string(),
            points: Some(SuperviselyPoints {
                exterior,
                interior: vec![],
            }),
            tags: vec![],
        }
    }

    fn class(title: &str, shape: &str) -> SuperviselyClass {
        SuperviselyClass {
            title: title.to_string(),
            shape: shape.to_string(),
            color: None,
        }
    }

    fn project(objects: Vec<SuperviselyObject>, tags: Vec<SuperviselyTag>) -> SuperviselyProject {
        SuperviselyProject {
            meta: SuperviselyMeta {
                classes: vec![
                    SuperviselyClass {
                        color: Some("#FF0000".to_string()),
                        ..class("car", "rectangle")
                    },
                    class("road", "polygon"),
                    class("lane", "line"),
                    class("sign", "point"),
                ],
                tags: vec![SuperviselyTagMeta {
                    name: "night".to_string(),
                    color: None,
                }],
            },
            items: vec![SuperviselyItem {
                dataset: "ds0".to_string(),
                image: "frame.png".to_string(),
                annotation: SuperviselyAnnotation {
                    size: None,
                    tags,
                    objects,
                },
            }],
        }
    }

    #[test]
    fn test_geometry_mapping() {
        let mut car = object("car", "rectangle", vec![[40.0, 60.0], [10.0, 20.0]]);
        car.tags = vec![SuperviselyTag {
            name: "color".to_string(),
            value: Some(serde_json::json!("red")),
        }];
        let project = project(
            vec![
                car,
                object("road", "polygon", vec![[0.0, 0.0], [5.0, 0.0], [5.0, 5.0]]),
                object("lane", "line", vec![[0.0, 0.0], [9.0, 9.0]]),
                object("sign", "point", vec![[3.0, 4.0]]),
            ],
            vec![SuperviselyTag {
                name: "night".to_string(),
                value: None,
            }],
        );

        let conversion = vector_annotation(&project).unwrap();
        let instances = conversion.vector_documents().unwrap().get("frame.png").unwrap();

        let kinds: Vec<_> = instances.iter().map(|i| i.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                InstanceType::Bbox,
                InstanceType::Polygon,
                InstanceType::Polyline,
                InstanceType::Point,
                InstanceType::Tag,
            ]
        );
        assert_eq!(
            serde_json::to_value(&instances[0]).unwrap()["points"],
            serde_json::json!({"x1": 10.0, "y1": 20.0, "x2": 40.0, "y2": 60.0})
        );
        assert_eq!(instances[0].attributes(), &[Attribute::new("color", "red")]);
        assert_eq!(instances[3].geometry(), &Geometry::Point { x: 3.0, y: 4.0 });
        assert_eq!(instances[4].class_name(), "night");

        let manifest: Vec<_> = conversion
            .classes
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect();
        assert_eq!(
            manifest,
            vec![(1, "car"), (2, "road"), (3, "lane"), (4, "sign"), (5, "night")]
        );
        assert_eq!(conversion.classes[0].color, "#ff0000");
        assert_eq!(conversion.classes[0].attribute_groups[0].name, "color");
    }

    #[test]
    fn test_image_tag_missing_from_meta_skipped() {
        let project = project(
            vec![],
            vec![
                SuperviselyTag {
                    name: "night".to_string(),
                    value: None,
                },
                SuperviselyTag {
                    name: "foggy".to_string(),
                    value: None,
                },
            ],
        );

        let conversion = vector_annotation(&project).unwrap();
        let instances = conversion.vector_documents().unwrap().get("frame.png").unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].class_name(), "night");
        assert_eq!(conversion.report.skipped, 1);
        assert!(conversion.report.warnings[0].message.contains("foggy"));
        assert!(conversion.classes.iter().all(|c| c.name != "foggy"));
    }

    #[test]
    fn test_unsupported_geometry_and_unknown_class_skipped() {
        let project = project(
            vec![
                object("road", "bitmap", vec![]),
                object("truck", "rectangle", vec![[0.0, 0.0], [1.0, 1.0]]),
                object("road", "polygon", vec![[0.0, 0.0], [1.0, 1.0]]),
                object("car", "rectangle", vec![[0.0, 0.0], [1.0, 1.0]]),
            ],
            vec![],
        );

        let conversion = vector_annotation(&project).unwrap();
        assert_eq!(conversion.report.skipped, 3);
        assert_eq!(conversion.report.instances, 1);
        assert_eq!(conversion.report.images, 1);
    }
}
