// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use crate::Error;

/// A source record that was skipped during conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionWarning {
    /// Source record identifier (annotation id, object index, ...).
    pub record: String,
    /// Image the record refers to, when known.
    pub image: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.image {
            Some(image) => write!(f, "record {} ({}): {}", self.record, image, self.message),
            None => write!(f, "record {}: {}", self.record, self.message),
        }
    }
}

/// Counts of one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub images: usize,
    pub instances: usize,
    pub skipped: usize,
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionReport {
    /// Record a skipped source record and log it.
    pub fn skip(&mut self, record: impl ToString, image: Option<&str>, reason: &Error) {
        let warning = ConversionWarning {
            record: record.to_string(),
            image: image.map(str::to_string),
            message: reason.to_string(),
        };
        log::warn!("Skipping {}", warning);
        self.skipped += 1;
        self.warnings.push(warning);
    }

    /// Count a record that carries nothing to convert, without a warning.
    pub fn skip_silently(&mut self, record: impl ToString) {
        log::debug!("Skipping record {} without content", record.to_string());
        self.skipped += 1;
    }
}

impl std::fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} images, {} instances, {} records skipped",
            self.images, self.instances, self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_counts_and_formats() {
        let mut report = ConversionReport::default();
        report.skip(7, Some("a.jpg"), &Error::MissingLabel("category 9".into()));
        report.skip_silently(8);

        assert_eq!(report.skipped, 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0].to_string(),
            "record 7 (a.jpg): Missing label: category 9"
        );
    }

    #[test]
    fn test_summary() {
        let report = ConversionReport {
            images: 2,
            instances: 5,
            skipped: 1,
            warnings: vec![],
        };
        assert_eq!(report.to_string(), "2 images, 5 instances, 1 records skipped");
    }
}
