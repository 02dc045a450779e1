// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end conversions: read a dataset from disk, convert it and write
//! the artifacts.

use annoconv::{
    ArtifactWriter, Converter, Direction, Error, ProjectType, ReadOptions, SourceDataset,
    SourceFormat, Task, WriteOptions,
};
use image::{GrayImage, Luma};
use std::path::Path;

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn convert(
    format: SourceFormat,
    project_type: ProjectType,
    task: Task,
    input: &Path,
    options: &ReadOptions,
) -> Result<annoconv::Conversion, Error> {
    let converter = Converter::select(format, project_type, task, Direction::ToCanonical)?;
    let source = SourceDataset::read(format, input, options)?;
    converter.to_canonical(&source)
}

#[test]
fn test_coco_instance_segmentation_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("instances.json");
    let dataset = serde_json::json!({
        "images": [
            {"id": 1, "file_name": "train/a.jpg", "width": 8, "height": 8},
            {"id": 2, "file_name": "train/b.jpg", "width": 8, "height": 8}
        ],
        "categories": [
            {"id": 1, "name": "person"},
            {"id": 2, "name": "dog"}
        ],
        "annotations": [
            {"id": 1, "image_id": 1, "category_id": 1,
             "segmentation": [[0, 0, 4, 0, 4, 4]]},
            {"id": 1, "image_id": 1, "category_id": 1,
             "segmentation": [[5, 5, 7, 5, 7, 7]]},
            {"id": 2, "image_id": 1, "category_id": 2},
            {"id": 3, "image_id": 2, "category_id": 2,
             "segmentation": {"counts": [0, 2, 6, 2, 54], "size": [8, 8]}}
        ]
    });
    std::fs::write(&input, serde_json::to_vec(&dataset).unwrap()).unwrap();

    let conversion = convert(
        SourceFormat::Coco,
        ProjectType::Vector,
        Task::InstanceSegmentation,
        &input,
        &ReadOptions::default(),
    )
    .unwrap();
    assert_eq!(conversion.report.skipped, 1);
    assert_eq!(conversion.report.images, 2);

    let output = dir.path().join("out");
    let summary = ArtifactWriter::new().write(&conversion, &output).unwrap();
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.masks, 0);

    let a = read_json(&output.join("a.jpg___objects.json"));
    let a = a.as_array().unwrap();
    assert_eq!(a.len(), 2);
    assert!(a.iter().all(|i| i["type"] == "polygon" && i["groupId"] == 1));

    let b = read_json(&output.join("b.jpg___objects.json"));
    assert_eq!(b.as_array().unwrap().len(), 1);
    assert_eq!(b[0]["className"], "dog");
    assert_eq!(b[0]["points"].as_array().unwrap().len(), 8);
    assert!(b[0].get("groupId").is_none());

    let classes = read_json(&output.join("classes/classes.json"));
    let names: Vec<_> = classes
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["person", "dog"]);
}

#[test]
fn test_coco_category_filter() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("instances.json");
    let dataset = serde_json::json!({
        "images": [{"id": 1, "file_name": "a.jpg", "width": 100, "height": 100}],
        "categories": [{"id": 1, "name": "person"}, {"id": 2, "name": "car"}],
        "annotations": [
            {"id": 1, "image_id": 1, "category_id": 1, "bbox": [0, 0, 5, 5]},
            {"id": 2, "image_id": 1, "category_id": 2, "bbox": [1, 1, 5, 5]}
        ]
    });
    std::fs::write(&input, serde_json::to_vec(&dataset).unwrap()).unwrap();

    let options = ReadOptions {
        categories: vec!["car".to_string()],
        ..Default::default()
    };
    let conversion = convert(
        SourceFormat::Coco,
        ProjectType::Vector,
        Task::ObjectDetection,
        &input,
        &options,
    )
    .unwrap();

    let documents = conversion.vector_documents().unwrap();
    let instances = documents.get("a.jpg").unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].class_name(), "car");
}

#[test]
fn test_voc_pixel_pipeline_replaces_stale_masks() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("VOC2012");
    std::fs::create_dir_all(root.join("Annotations")).unwrap();
    std::fs::create_dir_all(root.join("SegmentationObject")).unwrap();
    std::fs::write(
        root.join("Annotations/2007_000033.xml"),
        r#"<annotation>
            <filename>2007_000033.jpg</filename>
            <size><width>4</width><height>3</height><depth>3</depth></size>
            <object><name>aeroplane</name><pose>Frontal</pose></object>
            <object><name>person</name></object>
        </annotation>"#,
    )
    .unwrap();

    // Rows: two instances separated by a void border.
    let labels = [
        [1, 1, 255, 2],
        [1, 1, 255, 2],
        [0, 0, 0, 0],
    ];
    let mask = GrayImage::from_fn(4, 3, |x, y| Luma([labels[y as usize][x as usize]]));
    mask.save(root.join("SegmentationObject/2007_000033.png"))
        .unwrap();

    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("stale___save.png"), b"stale").unwrap();

    let conversion = convert(
        SourceFormat::Voc,
        ProjectType::Pixel,
        Task::InstanceSegmentation,
        &root,
        &ReadOptions::default(),
    )
    .unwrap();
    let summary = ArtifactWriter::with_options(WriteOptions {
        pretty: false,
        ..Default::default()
    })
    .write(&conversion, &output)
    .unwrap();

    assert_eq!(summary.removed, 1);
    assert_eq!(summary.masks, 1);
    assert!(!output.join("stale___save.png").exists());

    let written = image::open(output.join("2007_000033.jpg___save.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(written.get_pixel(0, 0).0, [128, 0, 0]);
    assert_eq!(written.get_pixel(3, 1).0, [0, 128, 0]);
    assert_eq!(written.get_pixel(2, 0).0, [0, 0, 0]);

    let document = read_json(&output.join("2007_000033.jpg___pixel.json"));
    assert_eq!(document[0]["className"], "aeroplane");
    assert_eq!(document[1]["parts"][0]["color"], "#008000");
}

#[test]
fn test_supervisely_project_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("project");
    std::fs::create_dir_all(root.join("ds0/ann")).unwrap();
    std::fs::write(
        root.join("meta.json"),
        r##"{
            "classes": [{"title": "car", "shape": "rectangle", "color": "#00FF00"}],
            "tags": [{"name": "sunny"}]
        }"##,
    )
    .unwrap();
    std::fs::write(
        root.join("ds0/ann/frame_001.png.json"),
        r#"{
            "size": {"height": 480, "width": 640},
            "tags": [{"name": "sunny", "value": null}],
            "objects": [{
                "id": 11,
                "classTitle": "car",
                "geometryType": "rectangle",
                "points": {"exterior": [[5, 5], [50, 40]], "interior": []},
                "tags": [{"name": "occluded", "value": "yes"}]
            }]
        }"#,
    )
    .unwrap();

    let conversion = convert(
        SourceFormat::Supervisely,
        ProjectType::Vector,
        Task::VectorAnnotation,
        &root,
        &ReadOptions::default(),
    )
    .unwrap();

    let output = dir.path().join("out");
    ArtifactWriter::new().write(&conversion, &output).unwrap();

    let document = read_json(&output.join("frame_001.png___objects.json"));
    assert_eq!(document[0]["type"], "bbox");
    assert_eq!(document[0]["attributes"][0]["groupName"], "occluded");
    assert_eq!(document[0]["attributes"][0]["name"], "yes");
    assert_eq!(document[1]["type"], "tag");

    let classes = read_json(&output.join("classes/classes.json"));
    assert_eq!(classes[0]["color"], "#00ff00");
    assert_eq!(classes[1]["name"], "sunny");
}

#[test]
fn test_missing_input_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = SourceDataset::read(
        SourceFormat::Voc,
        dir.path().join("absent"),
        &ReadOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidParameters(_)));
}
