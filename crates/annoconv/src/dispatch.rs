// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Conversion strategy selection.
//!
//! A conversion is keyed by (source format, project type, task, direction).
//! The supported keys form a fixed table of adapter functions; everything
//! else is rejected with [`Error::NotSupported`] before any work starts.

use std::path::{Path, PathBuf};

use image::RgbImage;
use indexmap::IndexMap;

use crate::{
    Error,
    coco::{self, CocoDataset, CocoReadOptions, CocoReader},
    instance::{CanonicalInstance, ClassEntry, ImageAnnotationSet, PixelInstance},
    report::ConversionReport,
    supervisely::{self, SuperviselyProject},
    voc::{self, VocDataset},
};

/// Directory holding the class manifest, relative to the output directory.
pub const CLASSES_DIR: &str = "classes";
/// File name of the class manifest.
pub const CLASSES_FILE: &str = "classes.json";

/// Source dataset format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Coco,
    Voc,
    Supervisely,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            SourceFormat::Coco => "coco",
            SourceFormat::Voc => "voc",
            SourceFormat::Supervisely => "supervisely",
        };
        write!(f, "{}", value)
    }
}

impl TryFrom<&str> for SourceFormat {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "coco" => Ok(SourceFormat::Coco),
            "voc" | "pascal_voc" | "pascalvoc" => Ok(SourceFormat::Voc),
            "supervisely" | "sly" => Ok(SourceFormat::Supervisely),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.try_into()
    }
}

/// Target project type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectType {
    Vector,
    Pixel,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectType::Vector => write!(f, "vector"),
            ProjectType::Pixel => write!(f, "pixel"),
        }
    }
}

impl TryFrom<&str> for ProjectType {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "vector" => Ok(ProjectType::Vector),
            "pixel" => Ok(ProjectType::Pixel),
            _ => Err(Error::InvalidParameters(format!("unknown project type {}", s))),
        }
    }
}

impl std::str::FromStr for ProjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.try_into()
    }
}

/// Annotation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    InstanceSegmentation,
    ObjectDetection,
    KeypointDetection,
    VectorAnnotation,
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Task::InstanceSegmentation => "instance_segmentation",
            Task::ObjectDetection => "object_detection",
            Task::KeypointDetection => "keypoint_detection",
            Task::VectorAnnotation => "vector_annotation",
        };
        write!(f, "{}", value)
    }
}

impl TryFrom<&str> for Task {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        // Accept both snake_case and kebab-case spellings.
        match s.to_lowercase().replace('-', "_").as_str() {
            "instance_segmentation" => Ok(Task::InstanceSegmentation),
            "object_detection" => Ok(Task::ObjectDetection),
            "keypoint_detection" => Ok(Task::KeypointDetection),
            "vector_annotation" => Ok(Task::VectorAnnotation),
            _ => Err(Error::InvalidParameters(format!("unknown task {}", s))),
        }
    }
}

impl std::str::FromStr for Task {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.try_into()
    }
}

/// Conversion direction relative to the canonical schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    ToCanonical,
    FromCanonical,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ToCanonical => write!(f, "to-canonical"),
            Direction::FromCanonical => write!(f, "from-canonical"),
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "to-canonical" | "import" => Ok(Direction::ToCanonical),
            "from-canonical" | "export" => Ok(Direction::FromCanonical),
            _ => Err(Error::InvalidParameters(format!("unknown direction {}", s))),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.try_into()
    }
}

/// An in-memory source dataset.
#[derive(Debug, Clone)]
pub enum SourceDataset {
    Coco(CocoDataset),
    Voc(VocDataset),
    Supervisely(SuperviselyProject),
}

/// Options applied while reading a source dataset.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Maximum number of images to read (0 = unlimited).
    pub max_images: usize,
    /// Keep only these category names (COCO only, empty = all).
    pub categories: Vec<String>,
    /// Reject COCO datasets with dangling references.
    pub strict: bool,
}

impl SourceDataset {
    /// Read a dataset of `format` from `path`.
    ///
    /// COCO reads a JSON file or ZIP archive, VOC a VOC root directory and
    /// Supervisely a project directory.
    pub fn read<P: AsRef<Path>>(
        format: SourceFormat,
        path: P,
        options: &ReadOptions,
    ) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::InvalidParameters(format!(
                "input {} does not exist",
                path.display()
            )));
        }

        match format {
            SourceFormat::Coco => {
                let reader = CocoReader::with_options(CocoReadOptions {
                    validate: options.strict,
                    max_images: options.max_images,
                    category_filter: options.categories.clone(),
                });
                Ok(SourceDataset::Coco(reader.read(path)?))
            }
            SourceFormat::Voc => Ok(SourceDataset::Voc(voc::read_voc_dataset(
                path,
                options.max_images,
            )?)),
            SourceFormat::Supervisely => Ok(SourceDataset::Supervisely(
                supervisely::read_supervisely_project(path, options.max_images)?,
            )),
        }
    }

    pub fn format(&self) -> SourceFormat {
        match self {
            SourceDataset::Coco(_) => SourceFormat::Coco,
            SourceDataset::Voc(_) => SourceFormat::Voc,
            SourceDataset::Supervisely(_) => SourceFormat::Supervisely,
        }
    }

    fn mismatch(&self, expected: SourceFormat) -> Error {
        Error::InvalidParameters(format!(
            "{} adapter received a {} dataset",
            expected,
            self.format()
        ))
    }

    fn coco(&self) -> Result<&CocoDataset, Error> {
        match self {
            SourceDataset::Coco(dataset) => Ok(dataset),
            other => Err(other.mismatch(SourceFormat::Coco)),
        }
    }

    fn voc(&self) -> Result<&VocDataset, Error> {
        match self {
            SourceDataset::Voc(dataset) => Ok(dataset),
            other => Err(other.mismatch(SourceFormat::Voc)),
        }
    }

    fn supervisely(&self) -> Result<&SuperviselyProject, Error> {
        match self {
            SourceDataset::Supervisely(project) => Ok(project),
            other => Err(other.mismatch(SourceFormat::Supervisely)),
        }
    }
}

/// Per-image documents of a conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Documents {
    Vector(ImageAnnotationSet<CanonicalInstance>),
    Pixel(ImageAnnotationSet<PixelInstance>),
}

/// Result of one adapter run.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub documents: Documents,
    pub classes: Vec<ClassEntry>,
    /// Image name to RGB mask, pixel projects only.
    pub masks: IndexMap<String, RgbImage>,
    pub report: ConversionReport,
}

impl Conversion {
    pub fn vector(
        documents: ImageAnnotationSet<CanonicalInstance>,
        classes: Vec<ClassEntry>,
        report: ConversionReport,
    ) -> Self {
        Self {
            documents: Documents::Vector(documents),
            classes,
            masks: IndexMap::new(),
            report,
        }
    }

    pub fn pixel(
        documents: ImageAnnotationSet<PixelInstance>,
        classes: Vec<ClassEntry>,
        masks: IndexMap<String, RgbImage>,
        report: ConversionReport,
    ) -> Self {
        Self {
            documents: Documents::Pixel(documents),
            classes,
            masks,
            report,
        }
    }

    pub fn vector_documents(&self) -> Option<&ImageAnnotationSet<CanonicalInstance>> {
        match &self.documents {
            Documents::Vector(documents) => Some(documents),
            Documents::Pixel(_) => None,
        }
    }

    pub fn pixel_documents(&self) -> Option<&ImageAnnotationSet<PixelInstance>> {
        match &self.documents {
            Documents::Pixel(documents) => Some(documents),
            Documents::Vector(_) => None,
        }
    }

    pub fn project_type(&self) -> ProjectType {
        match self.documents {
            Documents::Vector(_) => ProjectType::Vector,
            Documents::Pixel(_) => ProjectType::Pixel,
        }
    }

    /// Per-image documents and the class manifest under `classes/`.
    pub fn json_artifacts(&self) -> Result<Vec<(PathBuf, serde_json::Value)>, Error> {
        self.json_artifacts_in(CLASSES_DIR)
    }

    /// Per-image documents, then the class manifest under `classes_dir`.
    ///
    /// Vector documents are named `<image>___objects.json`, pixel documents
    /// `<image>___pixel.json`.
    pub fn json_artifacts_in(
        &self,
        classes_dir: &str,
    ) -> Result<Vec<(PathBuf, serde_json::Value)>, Error> {
        let mut artifacts = match &self.documents {
            Documents::Vector(documents) => document_artifacts(documents, "objects")?,
            Documents::Pixel(documents) => document_artifacts(documents, "pixel")?,
        };
        artifacts.push((
            Path::new(classes_dir).join(CLASSES_FILE),
            serde_json::to_value(&self.classes)?,
        ));
        Ok(artifacts)
    }

    /// `<image>___save.png` raster masks, pixel projects only.
    pub fn mask_artifacts(&self) -> Vec<(PathBuf, &RgbImage)> {
        self.masks
            .iter()
            .map(|(image, mask)| (PathBuf::from(format!("{}___save.png", image)), mask))
            .collect()
    }
}

fn document_artifacts<I: serde::Serialize>(
    documents: &ImageAnnotationSet<I>,
    suffix: &str,
) -> Result<Vec<(PathBuf, serde_json::Value)>, Error> {
    documents
        .iter()
        .map(|(image, instances)| {
            Ok((
                PathBuf::from(format!("{}___{}.json", image, suffix)),
                serde_json::to_value(instances)?,
            ))
        })
        .collect()
}

type Adapter = fn(&SourceDataset) -> Result<Conversion, Error>;

/// One supported (format, project type, task) combination.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub format: SourceFormat,
    pub project_type: ProjectType,
    pub task: Task,
    adapter: Adapter,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.format, self.project_type, self.task)
    }
}

fn coco_instance_segmentation(source: &SourceDataset) -> Result<Conversion, Error> {
    coco::instance_segmentation(source.coco()?)
}

fn coco_object_detection(source: &SourceDataset) -> Result<Conversion, Error> {
    coco::object_detection(source.coco()?)
}

fn coco_keypoint_detection(source: &SourceDataset) -> Result<Conversion, Error> {
    coco::keypoint_detection(source.coco()?)
}

fn voc_object_detection(source: &SourceDataset) -> Result<Conversion, Error> {
    voc::object_detection(source.voc()?)
}

fn voc_instance_segmentation(source: &SourceDataset) -> Result<Conversion, Error> {
    voc::instance_segmentation(source.voc()?)
}

fn voc_pixel_instance_segmentation(source: &SourceDataset) -> Result<Conversion, Error> {
    voc::pixel_instance_segmentation(source.voc()?)
}

fn supervisely_vector_annotation(source: &SourceDataset) -> Result<Conversion, Error> {
    supervisely::vector_annotation(source.supervisely()?)
}

const fn strategy(
    format: SourceFormat,
    project_type: ProjectType,
    task: Task,
    adapter: Adapter,
) -> Strategy {
    Strategy {
        format,
        project_type,
        task,
        adapter,
    }
}

/// Every supported to-canonical combination.
pub static STRATEGIES: [Strategy; 7] = [
    strategy(
        SourceFormat::Coco,
        ProjectType::Vector,
        Task::InstanceSegmentation,
        coco_instance_segmentation,
    ),
    strategy(
        SourceFormat::Coco,
        ProjectType::Vector,
        Task::ObjectDetection,
        coco_object_detection,
    ),
    strategy(
        SourceFormat::Coco,
        ProjectType::Vector,
        Task::KeypointDetection,
        coco_keypoint_detection,
    ),
    strategy(
        SourceFormat::Voc,
        ProjectType::Vector,
        Task::ObjectDetection,
        voc_object_detection,
    ),
    strategy(
        SourceFormat::Voc,
        ProjectType::Vector,
        Task::InstanceSegmentation,
        voc_instance_segmentation,
    ),
    strategy(
        SourceFormat::Voc,
        ProjectType::Pixel,
        Task::InstanceSegmentation,
        voc_pixel_instance_segmentation,
    ),
    strategy(
        SourceFormat::Supervisely,
        ProjectType::Vector,
        Task::VectorAnnotation,
        supervisely_vector_annotation,
    ),
];

/// A selected conversion strategy.
///
/// # Example
///
/// ```rust,no_run
/// use annoconv::{Converter, Direction, ProjectType, ReadOptions, SourceDataset, SourceFormat, Task};
///
/// let converter = Converter::select(
///     SourceFormat::Coco,
///     ProjectType::Vector,
///     Task::ObjectDetection,
///     Direction::ToCanonical,
/// )?;
/// let source = SourceDataset::read(SourceFormat::Coco, "instances.json", &ReadOptions::default())?;
/// let conversion = converter.to_canonical(&source)?;
/// println!("{}", conversion.report);
/// # Ok::<(), annoconv::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    strategy: &'static Strategy,
}

impl Converter {
    /// Look up the adapter for a conversion key.
    ///
    /// The from-canonical direction has no adapters; it fails with
    /// [`Error::NotSupported`] naming the direction, like any combination
    /// missing from [`STRATEGIES`].
    pub fn select(
        format: SourceFormat,
        project_type: ProjectType,
        task: Task,
        direction: Direction,
    ) -> Result<Self, Error> {
        if direction == Direction::FromCanonical {
            return Err(Error::NotSupported(format!(
                "direction {} for {} {} {}",
                direction, format, project_type, task
            )));
        }

        STRATEGIES
            .iter()
            .find(|s| s.format == format && s.project_type == project_type && s.task == task)
            .map(|strategy| Self { strategy })
            .ok_or_else(|| {
                Error::NotSupported(format!(
                    "{} {} {} is not a supported combination",
                    format, project_type, task
                ))
            })
    }

    pub fn strategy(&self) -> &Strategy {
        self.strategy
    }

    /// Convert a source dataset to canonical documents.
    pub fn to_canonical(&self, source: &SourceDataset) -> Result<Conversion, Error> {
        log::debug!("Converting with {}", self.strategy);
        (self.strategy.adapter)(source)
    }

    /// Export canonical documents back to the source format. Not implemented
    /// for any format.
    pub fn from_canonical(&self, _conversion: &Conversion) -> Result<SourceDataset, Error> {
        Err(Error::NotSupported(format!(
            "direction {} for {}",
            Direction::FromCanonical,
            self.strategy
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coco::{CocoAnnotation, CocoCategory, CocoImage};

    fn small_coco() -> SourceDataset {
        SourceDataset::Coco(CocoDataset {
            images: vec![
                CocoImage {
                    id: 1,
                    file_name: Some("a.jpg".to_string()),
                    ..Default::default()
                },
                CocoImage {
                    id: 2,
                    file_name: Some("b.jpg".to_string()),
                    ..Default::default()
                },
            ],
            categories: vec![CocoCategory {
                id: 1,
                name: "car".to_string(),
                ..Default::default()
            }],
            annotations: vec![CocoAnnotation {
                id: 1,
                image_id: 1,
                category_id: 1,
                bbox: Some([10.0, 20.0, 30.0, 40.0]),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("coco".parse::<SourceFormat>().unwrap(), SourceFormat::Coco);
        assert_eq!("VOC".parse::<SourceFormat>().unwrap(), SourceFormat::Voc);
        assert!(matches!(
            "yolo".parse::<SourceFormat>(),
            Err(Error::UnsupportedFormat(_))
        ));
        assert_eq!("pixel".parse::<ProjectType>().unwrap(), ProjectType::Pixel);
        assert_eq!(
            "keypoint-detection".parse::<Task>().unwrap(),
            Task::KeypointDetection
        );
        assert_eq!(
            "from_canonical".parse::<Direction>().unwrap(),
            Direction::FromCanonical
        );
        for task in [
            Task::InstanceSegmentation,
            Task::ObjectDetection,
            Task::KeypointDetection,
            Task::VectorAnnotation,
        ] {
            assert_eq!(task.to_string().parse::<Task>().unwrap(), task);
        }
    }

    #[test]
    fn test_every_strategy_selectable() {
        for s in &STRATEGIES {
            let converter =
                Converter::select(s.format, s.project_type, s.task, Direction::ToCanonical)
                    .unwrap();
            assert_eq!(converter.strategy().task, s.task);
        }
    }

    #[test]
    fn test_from_canonical_not_supported() {
        let err = Converter::select(
            SourceFormat::Coco,
            ProjectType::Vector,
            Task::ObjectDetection,
            Direction::FromCanonical,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotSupported(ref s) if s.contains("from-canonical")));

        let converter = Converter::select(
            SourceFormat::Coco,
            ProjectType::Vector,
            Task::ObjectDetection,
            Direction::ToCanonical,
        )
        .unwrap();
        let conversion = converter.to_canonical(&small_coco()).unwrap();
        let err = converter.from_canonical(&conversion).unwrap_err();
        assert!(matches!(err, Error::NotSupported(ref s) if s.contains("from-canonical")));
    }

    #[test]
    fn test_unknown_combination_not_supported() {
        let err = Converter::select(
            SourceFormat::Coco,
            ProjectType::Pixel,
            Task::ObjectDetection,
            Direction::ToCanonical,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotSupported(ref s) if s.contains("coco pixel object_detection")));

        assert!(
            Converter::select(
                SourceFormat::Voc,
                ProjectType::Vector,
                Task::KeypointDetection,
                Direction::ToCanonical,
            )
            .is_err()
        );
    }

    #[test]
    fn test_dataset_mismatch_rejected() {
        let converter = Converter::select(
            SourceFormat::Voc,
            ProjectType::Vector,
            Task::ObjectDetection,
            Direction::ToCanonical,
        )
        .unwrap();
        assert!(matches!(
            converter.to_canonical(&small_coco()),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_json_artifacts() {
        let converter = Converter::select(
            SourceFormat::Coco,
            ProjectType::Vector,
            Task::ObjectDetection,
            Direction::ToCanonical,
        )
        .unwrap();
        let conversion = converter.to_canonical(&small_coco()).unwrap();
        let artifacts = conversion.json_artifacts().unwrap();

        let paths: Vec<_> = artifacts
            .iter()
            .map(|(p, _)| p.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            paths,
            vec!["a.jpg___objects.json", "b.jpg___objects.json", "classes/classes.json"]
        );
        assert_eq!(artifacts[1].1, serde_json::json!([]));
        assert_eq!(artifacts[2].1[0]["name"], "car");
        assert!(conversion.mask_artifacts().is_empty());
        assert_eq!(conversion.project_type(), ProjectType::Vector);
    }
}
