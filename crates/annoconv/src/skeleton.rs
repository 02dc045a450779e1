// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Keypoint filtering and renumbering against a category skeleton.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use crate::instance::{Connection, PointLabels, TemplatePoint};

/// Result of remapping one keypoint record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeypointRemap {
    /// Surviving points with compact local ids `1..=k`.
    pub points: Vec<TemplatePoint>,
    /// 1-based original indices dropped because they sit at `(0, 0)`.
    pub bad_points: BTreeSet<usize>,
    /// Original 1-based index to local id, survivors only.
    pub id_mapping: BTreeMap<usize, usize>,
    /// Skeleton edges whose endpoints both survived.
    pub connections: Vec<Connection>,
    /// `local id - 1` to keypoint name.
    pub point_labels: PointLabels,
}

/// Remap `(x, y, visibility)` keypoint triples against a skeleton.
///
/// `names` are the category's keypoint names and `skeleton` its edge list of
/// 1-based keypoint indices. An edge at position `i` becomes connection id
/// `i + 1`, so ids stay stable when other edges are dropped.
///
/// # Example
/// ```
/// use annoconv::skeleton::remap_keypoints;
///
/// let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
/// let remap = remap_keypoints(
///     &[10.0, 20.0, 2.0, 0.0, 0.0, 0.0, 30.0, 40.0, 2.0],
///     &names,
///     &[[1, 2], [2, 3], [1, 3]],
/// );
///
/// assert_eq!(remap.points.len(), 2);
/// assert_eq!(remap.connections.len(), 1);
/// assert_eq!(remap.connections[0].id, 3);
/// assert_eq!(remap.point_labels[&1], "c");
/// ```
pub fn remap_keypoints(keypoints: &[f64], names: &[String], skeleton: &[[usize; 2]]) -> KeypointRemap {
    let mut remap = KeypointRemap::default();

    for (index, (x, y, _visibility)) in keypoints.iter().copied().tuples().enumerate() {
        let original = index + 1;
        if x == 0.0 && y == 0.0 {
            remap.bad_points.insert(original);
            continue;
        }

        let local = remap.points.len() + 1;
        remap.points.push(TemplatePoint { id: local, x, y });
        remap.id_mapping.insert(original, local);
        if let Some(name) = names.get(index) {
            remap.point_labels.insert(local - 1, name.clone());
        }
    }

    remap.connections = skeleton
        .iter()
        .enumerate()
        .filter_map(|(i, [a, b])| {
            let from = *remap.id_mapping.get(a)?;
            let to = *remap.id_mapping.get(b)?;
            Some(Connection { id: i + 1, from, to })
        })
        .collect();

    remap
}
