// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

/// Error type for annotation conversion.
///
/// Variants fall into two groups. Record-scoped errors
/// ([`Error::is_record_scoped`]) describe a single malformed source record;
/// format adapters log and count them and keep going. Every other variant
/// aborts the conversion call that produced it.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// VOC XML deserialization error.
    XmlError(quick_xml::DeError),
    /// PNG decoding or encoding error.
    ImageError(image::ImageError),
    /// ZIP archive error while reading zipped annotations.
    ZipError(zip::result::ZipError),
    /// Malformed mask data for one record (bad run lengths or RLE string).
    GeometryDecodeError(String),
    /// Instance type outside the canonical set, or a geometry payload that
    /// does not fit the requested type. Indicates an adapter bug.
    UnsupportedInstanceType(String),
    /// Declared but unimplemented format/task/direction combination.
    NotSupported(String),
    /// Record references a category that is not defined.
    MissingLabel(String),
    /// Record references an image that is not part of the dataset.
    MissingImages(String),
    /// Record carries no usable geometry for the selected task.
    InvalidAnnotation(String),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
    /// Unsupported or unrecognised input format.
    UnsupportedFormat(String),
}

impl Error {
    /// Returns true for errors that only invalidate a single source record.
    ///
    /// Format adapters skip the offending record, record a warning and
    /// continue with the rest of the dataset.
    pub fn is_record_scoped(&self) -> bool {
        matches!(
            self,
            Error::GeometryDecodeError(_)
                | Error::MissingLabel(_)
                | Error::MissingImages(_)
                | Error::InvalidAnnotation(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<quick_xml::DeError> for Error {
    fn from(err: quick_xml::DeError) -> Self {
        Error::XmlError(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::XmlError(e) => write!(f, "XML error: {}", e),
            Error::ImageError(e) => write!(f, "Image error: {}", e),
            Error::ZipError(e) => write!(f, "ZIP error: {}", e),
            Error::GeometryDecodeError(s) => write!(f, "Geometry decode error: {}", s),
            Error::UnsupportedInstanceType(s) => write!(f, "Unsupported instance type: {}", s),
            Error::NotSupported(s) => write!(f, "Not supported: {}", s),
            Error::MissingLabel(s) => write!(f, "Missing label: {}", s),
            Error::MissingImages(s) => write!(f, "Missing images: {}", s),
            Error::InvalidAnnotation(s) => write!(f, "Invalid annotation: {}", s),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
            Error::UnsupportedFormat(s) => write!(f, "Unsupported format: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::XmlError(e) => Some(e),
            Error::ImageError(e) => Some(e),
            Error::ZipError(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_scoped_classification() {
        assert!(Error::GeometryDecodeError("bad".into()).is_record_scoped());
        assert!(Error::MissingLabel("7".into()).is_record_scoped());
        assert!(Error::MissingImages("3".into()).is_record_scoped());
        assert!(Error::InvalidAnnotation("no bbox".into()).is_record_scoped());

        assert!(!Error::UnsupportedInstanceType("mesh".into()).is_record_scoped());
        assert!(!Error::NotSupported("from canonical".into()).is_record_scoped());
    }

    #[test]
    fn test_display() {
        let err = Error::NotSupported("coco export".to_string());
        assert_eq!(err.to_string(), "Not supported: coco export");
    }
}
