// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! VOC to canonical conversion (vector and pixel projects).

use image::{Rgb, RgbImage};
use indexmap::IndexMap;

use super::types::{LabelMap, VOC_CLASSES, VocDataset, VocImage, VocObject};
use crate::{
    Error,
    color::{class_color, label_color, to_hex},
    dispatch::Conversion,
    geometry::{Bitmap, extract_polygons},
    instance::{
        Attribute, ClassEntry, ImageAnnotationSet, InstanceType, PixelInstance, RawPoints,
        build_instance,
    },
    report::ConversionReport,
};

/// Classes in first-encounter order with ids `1..=n`.
#[derive(Debug, Default)]
struct ClassCollector {
    entries: IndexMap<String, ClassEntry>,
}

impl ClassCollector {
    /// Register a class and the attributes seen with it; returns its id.
    fn register(&mut self, name: &str, attributes: &[Attribute]) -> u32 {
        let position = self.entries.len();
        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| ClassEntry::new(position as u32 + 1, name, class_color(position)));
        for attribute in attributes {
            entry.add_attribute(attribute);
        }
        entry.id
    }

    fn into_manifest(self) -> Vec<ClassEntry> {
        self.entries.into_values().collect()
    }
}

fn object_attributes(object: &VocObject) -> Vec<Attribute> {
    let mut attributes = Vec::new();
    if let Some(pose) = object.pose.as_deref().map(str::trim)
        && !pose.is_empty()
        && pose != "Unspecified"
    {
        attributes.push(Attribute::new("pose", pose));
    }
    if let Some(truncated) = object.truncated {
        attributes.push(Attribute::new("truncated", truncated.to_string()));
    }
    if let Some(difficult) = object.difficult {
        attributes.push(Attribute::new("difficult", difficult.to_string()));
    }
    attributes
}

fn record_id(image: &VocImage, kind: &str, index: usize) -> String {
    format!("{} {} {}", image.stem, kind, index)
}

/// Skip a record-scoped failure, propagate the rest.
fn absorb<T>(
    result: Result<T, Error>,
    record: String,
    image: &str,
    report: &mut ConversionReport,
) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_record_scoped() => {
            report.skip(record, Some(image), &err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// VOC object detection: every `<object>` with a `<bndbox>` becomes a bbox.
///
/// `pose` (unless `Unspecified`), `truncated` and `difficult` are carried as
/// attributes grouped under their field name.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn object_detection(dataset: &VocDataset) -> Result<Conversion, Error> {
    let mut documents = ImageAnnotationSet::new();
    let mut classes = ClassCollector::default();
    let mut report = ConversionReport::default();

    for image in &dataset.images {
        let name = image.name();
        documents.seed(&name);

        for (i, object) in image.annotation.objects.iter().enumerate() {
            let attributes = object_attributes(object);
            let instance = object
                .bndbox
                .ok_or_else(|| Error::InvalidAnnotation("object has no bndbox".to_string()))
                .and_then(|b| {
                    build_instance(
                        InstanceType::Bbox,
                        RawPoints::Coordinates(vec![b.xmin, b.ymin, b.xmax, b.ymax]),
                        attributes.clone(),
                        vec![],
                        &object.name,
                        None,
                    )
                });

            if let Some(instance) = absorb(instance, record_id(image, "object", i + 1), &name, &mut report)? {
                classes.register(&object.name, &attributes);
                documents.push(&name, instance);
            }
        }
    }

    report.images = documents.len();
    report.instances = documents.instance_count();
    log::info!("VOC object detection: {}", report);
    Ok(Conversion::vector(documents, classes.into_manifest(), report))
}

/// Class of the instance with mask `index`: the matching XML object, else
/// the majority VOC class under the instance.
fn instance_class(image: &VocImage, objects: &LabelMap, index: u8) -> Result<String, Error> {
    if let Some(object) = image.annotation.objects.get(index as usize - 1) {
        return Ok(object.name.clone());
    }

    image
        .class_mask
        .as_ref()
        .and_then(|classes| objects.majority_under(index, classes))
        .and_then(|label| VOC_CLASSES.get(label as usize - 1))
        .map(|name| name.to_string())
        .ok_or_else(|| Error::MissingLabel(format!("no class for instance {}", index)))
}

fn instance_bitmap(objects: &LabelMap, index: u8) -> Bitmap {
    Bitmap::from_fn(objects.width(), objects.height(), |x, y| objects.get(x, y) == index)
}

/// VOC instance segmentation to canonical polygons.
///
/// Instance indices of the object mask are visited in ascending order.
/// When one instance yields several polygons they share `groupId = index`.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn instance_segmentation(dataset: &VocDataset) -> Result<Conversion, Error> {
    let mut documents = ImageAnnotationSet::new();
    let mut classes = ClassCollector::default();
    let mut report = ConversionReport::default();

    for image in &dataset.images {
        let name = image.name();
        documents.seed(&name);

        let Some(objects) = &image.object_mask else {
            log::debug!("{} has no object mask", name);
            continue;
        };

        for index in objects.instance_indices() {
            let polygons = instance_class(image, objects, index).and_then(|class_name| {
                let polygons = extract_polygons(&instance_bitmap(objects, index));
                if polygons.is_empty() {
                    return Err(Error::InvalidAnnotation(
                        "instance has no region with at least 3 points".to_string(),
                    ));
                }
                Ok((class_name, polygons))
            });

            let record = record_id(image, "instance", index as usize);
            let Some((class_name, polygons)) = absorb(polygons, record, &name, &mut report)? else {
                continue;
            };

            classes.register(&class_name, &[]);
            let grouped = polygons.len() > 1;
            for polygon in polygons {
                let instance = build_instance(
                    InstanceType::Polygon,
                    RawPoints::Coordinates(polygon),
                    vec![],
                    vec![],
                    &class_name,
                    None,
                )?;
                let instance = if grouped {
                    instance.with_group_id(index as u64)
                } else {
                    instance
                };
                documents.push(&name, instance);
            }
        }
    }

    report.images = documents.len();
    report.instances = documents.instance_count();
    log::info!("VOC instance segmentation: {}", report);
    Ok(Conversion::vector(documents, classes.into_manifest(), report))
}

/// VOC instance segmentation to a pixel project.
///
/// Every instance is painted into the image's RGB mask with a color unique
/// within that image and described by one [`PixelInstance`]. Images without
/// an object mask get a blank mask when their size is known.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn pixel_instance_segmentation(dataset: &VocDataset) -> Result<Conversion, Error> {
    let mut documents: ImageAnnotationSet<PixelInstance> = ImageAnnotationSet::new();
    let mut masks = IndexMap::new();
    let mut classes = ClassCollector::default();
    let mut report = ConversionReport::default();

    for image in &dataset.images {
        let name = image.name();
        documents.seed(&name);

        let Some(objects) = &image.object_mask else {
            if let Some(size) = image.annotation.size
                && size.width > 0
                && size.height > 0
            {
                masks.insert(name, RgbImage::new(size.width, size.height));
            }
            continue;
        };

        let mut mask = RgbImage::new(objects.width() as u32, objects.height() as u32);
        let mut painted = 0u32;
        for index in objects.instance_indices() {
            let record = record_id(image, "instance", index as usize);
            let Some(class_name) =
                absorb(instance_class(image, objects, index), record, &name, &mut report)?
            else {
                continue;
            };

            painted += 1;
            let color = label_color(painted);
            for (x, y, pixel) in mask.enumerate_pixels_mut() {
                if objects.get(x as usize, y as usize) == index {
                    *pixel = Rgb(color);
                }
            }

            let class_id = classes.register(&class_name, &[]);
            documents.push(
                &name,
                PixelInstance::new(&class_name, class_id, to_hex(color), vec![]),
            );
        }
        masks.insert(name, mask);
    }

    report.images = documents.len();
    report.instances = documents.instance_count();
    log::info!("VOC pixel instance segmentation: {}", report);
    Ok(Conversion::pixel(documents, classes.into_manifest(), masks, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        instance::{CanonicalInstance, Geometry},
        voc::types::{VocAnnotation, VocBndbox, VocSize},
    };

    fn object(name: &str, bndbox: Option<VocBndbox>) -> VocObject {
        VocObject {
            name: name.to_string(),
            bndbox,
            ..Default::default()
        }
    }

    fn bndbox(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Option<VocBndbox> {
        Some(VocBndbox {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }

    /// 6x5 mask: instance 1 is two separate blocks, instance 2 one block,
    /// with a void border pixel.
    fn segmented_image(objects: Vec<VocObject>, with_classes: bool) -> VocImage {
        #[rustfmt::skip]
        let object_data = vec![
            1, 1, 0, 0, 1, 1,
            1, 1, 0, 0, 1, 1,
            0, 0, 0, 0, 0, 255,
            2, 2, 2, 0, 0, 0,
            2, 2, 2, 0, 0, 0,
        ];
        #[rustfmt::skip]
        let class_data = vec![
            8, 8, 0, 0, 8, 8,
            8, 8, 0, 0, 8, 8,
            0, 0, 0, 0, 0, 255,
            15, 15, 12, 0, 0, 0,
            15, 15, 12, 0, 0, 0,
        ];
        VocImage {
            stem: "2007_000033".to_string(),
            annotation: VocAnnotation {
                filename: Some("2007_000033.jpg".to_string()),
                size: Some(VocSize {
                    width: 6,
                    height: 5,
                    depth: 3,
                }),
                objects,
            },
            object_mask: LabelMap::new(6, 5, object_data),
            class_mask: if with_classes {
                LabelMap::new(6, 5, class_data)
            } else {
                None
            },
        }
    }

    fn vector(conversion: &Conversion) -> &ImageAnnotationSet<CanonicalInstance> {
        conversion.vector_documents().unwrap()
    }

    #[test]
    fn test_object_detection_with_attributes() {
        let mut dog = object("dog", bndbox(48.0, 240.0, 195.0, 371.0));
        dog.pose = Some("Left".to_string());
        dog.truncated = Some(1);
        dog.difficult = Some(0);
        let mut person = object("person", bndbox(8.0, 12.0, 352.0, 498.0));
        person.pose = Some("Unspecified".to_string());

        let dataset = VocDataset {
            images: vec![
                VocImage {
                    stem: "000001".to_string(),
                    annotation: VocAnnotation {
                        filename: Some("000001.jpg".to_string()),
                        size: None,
                        objects: vec![dog, person, object("cat", None)],
                    },
                    ..Default::default()
                },
                VocImage {
                    stem: "000002".to_string(),
                    ..Default::default()
                },
            ],
        };

        let conversion = object_detection(&dataset).unwrap();
        let documents = vector(&conversion);
        let instances = documents.get("000001.jpg").unwrap();

        assert_eq!(instances.len(), 2);
        assert_eq!(
            serde_json::to_value(&instances[0]).unwrap(),
            serde_json::json!({
                "type": "bbox",
                "points": {"x1": 48.0, "y1": 240.0, "x2": 195.0, "y2": 371.0},
                "className": "dog",
                "attributes": [
                    {"name": "Left", "groupName": "pose"},
                    {"name": "1", "groupName": "truncated"},
                    {"name": "0", "groupName": "difficult"}
                ]
            })
        );
        assert!(instances[1].attributes().is_empty());
        assert_eq!(documents.get("000002.jpg"), Some(&[][..]));
        assert_eq!(conversion.report.skipped, 1);

        let names: Vec<_> = conversion.classes.iter().map(|c| (c.id, c.name.as_str())).collect();
        assert_eq!(names, vec![(1, "dog"), (2, "person")]);
        assert_eq!(conversion.classes[0].attribute_groups.len(), 3);
    }

    #[test]
    fn test_instance_segmentation_groups_split_instances() {
        let dataset = VocDataset {
            images: vec![segmented_image(
                vec![object("cat", None), object("person", None)],
                false,
            )],
        };

        let conversion = instance_segmentation(&dataset).unwrap();
        let instances = vector(&conversion).get("2007_000033.jpg").unwrap();

        let summary: Vec<_> = instances
            .iter()
            .map(|i| (i.class_name().to_string(), i.group_id()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("cat".to_string(), 1),
                ("cat".to_string(), 1),
                ("person".to_string(), 0),
            ]
        );
        assert_eq!(
            instances[0].geometry(),
            &Geometry::Vertices {
                points: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]
            }
        );
    }

    #[test]
    fn test_instance_class_falls_back_to_class_mask() {
        let dataset = VocDataset {
            images: vec![segmented_image(vec![], true)],
        };

        let conversion = instance_segmentation(&dataset).unwrap();
        let classes: Vec<_> = vector(&conversion)
            .instances()
            .map(|i| i.class_name().to_string())
            .collect();
        assert_eq!(classes, vec!["cat", "cat", "person"]);
    }

    #[test]
    fn test_instance_without_class_skipped() {
        let dataset = VocDataset {
            images: vec![segmented_image(vec![], false)],
        };

        let conversion = instance_segmentation(&dataset).unwrap();
        assert_eq!(vector(&conversion).instance_count(), 0);
        assert_eq!(conversion.report.skipped, 2);
    }

    #[test]
    fn test_pixel_instance_segmentation() {
        let mut plain = VocImage {
            stem: "2007_000040".to_string(),
            ..Default::default()
        };
        plain.annotation.size = Some(VocSize {
            width: 3,
            height: 2,
            depth: 3,
        });

        let dataset = VocDataset {
            images: vec![
                segmented_image(vec![object("cat", None), object("person", None)], false),
                plain,
            ],
        };

        let conversion = pixel_instance_segmentation(&dataset).unwrap();
        let documents = conversion.pixel_documents().unwrap();
        let instances = documents.get("2007_000033.jpg").unwrap();

        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].parts()[0].color, "#800000");
        assert_eq!(instances[1].parts()[0].color, "#008000");
        assert_eq!(instances[1].class_name(), "person");
        assert_eq!(instances[1].class_id(), 2);

        let mask = &conversion.masks["2007_000033.jpg"];
        assert_eq!(mask.get_pixel(0, 0).0, [128, 0, 0]);
        assert_eq!(mask.get_pixel(5, 1).0, [128, 0, 0]);
        assert_eq!(mask.get_pixel(1, 3).0, [0, 128, 0]);
        assert_eq!(mask.get_pixel(5, 2).0, [0, 0, 0]);

        assert_eq!(documents.get("2007_000040.jpg"), Some(&[][..]));
        assert_eq!(conversion.masks["2007_000040.jpg"].dimensions(), (3, 2));
    }
}
