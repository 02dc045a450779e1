// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Mask decoding and contour extraction.
//!
//! ## Conventions
//!
//! - **RLE**: alternating background/foreground runs, starting with
//!   background, laid out **column-major** (pycocotools order).
//! - **Bitmap**: row-major, one byte per pixel, `0` or `1`.
//! - **Polygons**: flat `[x1, y1, x2, y2, ...]` in pixel coordinates.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Run-length data of a mask, in either of the two COCO encodings.
///
/// Both variants describe the same runs; [`decode_mask`] produces identical
/// bitmaps for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunLengths {
    /// Explicit run lengths: `[bg_run, fg_run, bg_run, ...]`.
    Counts(Vec<u32>),
    /// Compressed pycocotools string form.
    Compressed(String),
}

/// Dense binary mask in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Bitmap {
    /// Create an all-background bitmap.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Create a bitmap by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y) as u8);
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel value at `(x, y)`; out-of-bounds reads are background.
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x] != 0
    }

    /// Raw row-major pixel values.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Number of foreground pixels.
    pub fn count_ones(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    fn get_signed(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && self.get(x as usize, y as usize)
    }
}

// =============================================================================
// RLE Decoding
// =============================================================================

/// Decode run-length data into a `height × width` bitmap.
///
/// Fails with [`Error::GeometryDecodeError`] when the runs do not add up to
/// `height × width` or the compressed string is malformed.
///
/// # Example
/// ```
/// use annoconv::geometry::{RunLengths, decode_mask};
///
/// // 2x2 mask, column-major: bg, fg, fg, bg
/// let bitmap = decode_mask(&RunLengths::Counts(vec![1, 2, 1]), 2, 2)?;
/// assert!(!bitmap.get(0, 0));
/// assert!(bitmap.get(0, 1));
/// assert!(bitmap.get(1, 0));
/// # Ok::<(), annoconv::Error>(())
/// ```
pub fn decode_mask(run_lengths: &RunLengths, height: u32, width: u32) -> Result<Bitmap, Error> {
    let counts: Cow<'_, [u32]> = match run_lengths {
        RunLengths::Counts(counts) => Cow::Borrowed(counts.as_slice()),
        RunLengths::Compressed(s) => Cow::Owned(decode_counts_string(s)?),
    };

    let (h, w) = (height as usize, width as usize);
    let total_pixels = h * w;
    let counts_sum: u64 = counts.iter().map(|&c| c as u64).sum();
    if counts_sum != total_pixels as u64 {
        return Err(Error::GeometryDecodeError(format!(
            "RLE counts sum {} does not match mask size {}x{} = {}",
            counts_sum, width, height, total_pixels
        )));
    }

    let mut bitmap = Bitmap::new(w, h);
    let mut pos = 0usize;
    for (i, &count) in counts.iter().enumerate() {
        let count = count as usize;
        if i % 2 == 1 {
            for idx in pos..pos + count {
                bitmap.data[(idx % h) * w + idx / h] = 1;
            }
        }
        pos += count;
    }

    Ok(bitmap)
}

/// Decode the compressed pycocotools counts string.
///
/// Each count is stored as 5-bit groups in characters offset by 48, with
/// `0x20` as the continuation bit and `0x10` of the last group as the sign.
/// From the fourth count on, values are deltas against the count two
/// positions earlier.
fn decode_counts_string(s: &str) -> Result<Vec<u32>, Error> {
    let bytes = s.as_bytes();
    let mut counts: Vec<i64> = Vec::new();
    let mut p = 0usize;

    while p < bytes.len() {
        let mut x: i64 = 0;
        let mut k = 0u32;
        loop {
            if k > 11 {
                return Err(Error::GeometryDecodeError(format!(
                    "RLE string count at byte {} exceeds 64 bits",
                    p
                )));
            }
            let byte = *bytes.get(p).ok_or_else(|| {
                Error::GeometryDecodeError("RLE string ends inside a count".to_string())
            })?;
            if !(48..112).contains(&byte) {
                return Err(Error::GeometryDecodeError(format!(
                    "Invalid RLE character {:?} at byte {}",
                    byte as char, p
                )));
            }
            let c = (byte - 48) as i64;
            x |= (c & 0x1f) << (5 * k);
            p += 1;
            k += 1;
            if c & 0x20 == 0 {
                if c & 0x10 != 0 {
                    x |= -1i64 << (5 * k);
                }
                break;
            }
        }
        if counts.len() > 2 {
            x += counts[counts.len() - 2];
        }
        counts.push(x);
    }

    counts
        .into_iter()
        .map(|c| {
            u32::try_from(c).map_err(|_| {
                Error::GeometryDecodeError(format!("Invalid RLE run length {}", c))
            })
        })
        .collect()
}

/// Encode a bitmap into explicit column-major run lengths.
pub fn encode_mask(bitmap: &Bitmap) -> Vec<u32> {
    let mut counts = Vec::new();
    let mut current = 0u8;
    let mut run = 0u32;
    for x in 0..bitmap.width {
        for y in 0..bitmap.height {
            let value = bitmap.get(x, y) as u8;
            if value != current {
                counts.push(run);
                run = 0;
                current = value;
            }
            run += 1;
        }
    }
    counts.push(run);
    counts
}

/// Compress explicit run lengths into the pycocotools string form.
pub fn compress_counts(counts: &[u32]) -> String {
    let mut out = String::new();
    for (i, &count) in counts.iter().enumerate() {
        let mut x = count as i64;
        if i > 2 {
            x -= counts[i - 2] as i64;
        }
        loop {
            let mut c = (x & 0x1f) as u8;
            x >>= 5;
            let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
            if more {
                c |= 0x20;
            }
            out.push((c + 48) as char);
            if !more {
                break;
            }
        }
    }
    out
}

// =============================================================================
// Contour Extraction
// =============================================================================

/// Neighbour steps in clockwise screen order: E, SE, S, SW, W, NW, N, NE.
const STEPS: [(isize, isize); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const WEST: usize = 4;

/// Extract the external contours of every foreground region.
///
/// Foreground is 8-connected and background 4-connected. Regions lying in a
/// hole of another region are not reported and holes are not represented.
/// Each contour is reduced to its corner points; contours with fewer than
/// three distinct points (single pixels, straight lines) are dropped.
///
/// Output order follows the raster position (topmost, then leftmost) of
/// each region's first pixel.
///
/// # Example
/// ```
/// use annoconv::geometry::{Bitmap, extract_polygons};
///
/// let bitmap = Bitmap::from_fn(6, 5, |x, y| (1..4).contains(&x) && (1..3).contains(&y));
/// let polygons = extract_polygons(&bitmap);
/// assert_eq!(polygons, vec![vec![1.0, 1.0, 3.0, 1.0, 3.0, 2.0, 1.0, 2.0]]);
/// ```
pub fn extract_polygons(bitmap: &Bitmap) -> Vec<Vec<f64>> {
    let (w, h) = (bitmap.width, bitmap.height);
    let outside = outer_background(bitmap);
    let mut labelled = vec![false; w * h];
    let mut polygons = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if bitmap.data[idx] == 0 || labelled[idx] {
                continue;
            }

            label_region(bitmap, x, y, &mut labelled);

            // The pixel above a region's first pixel is background; the region
            // is external only when that background reaches the border.
            if y > 0 && !outside[idx - w] {
                continue;
            }

            let corners = compress_chain(&trace_boundary(bitmap, x, y));
            if distinct_points(&corners) >= 3 {
                polygons.push(
                    corners
                        .iter()
                        .flat_map(|&(px, py)| [px as f64, py as f64])
                        .collect(),
                );
            }
        }
    }

    polygons
}

/// Mark background pixels 4-connected to the bitmap border.
fn outer_background(bitmap: &Bitmap) -> Vec<bool> {
    let (w, h) = (bitmap.width, bitmap.height);
    let mut outside = vec![false; w * h];
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let on_border = x == 0 || y == 0 || x + 1 == w || y + 1 == h;
            if on_border && bitmap.data[y * w + x] == 0 {
                outside[y * w + x] = true;
                stack.push((x, y));
            }
        }
    }

    while let Some((x, y)) = stack.pop() {
        for (dx, dy) in [(1isize, 0isize), (-1, 0), (0, 1), (0, -1)] {
            let (nx, ny) = (x as isize + dx, y as isize + dy);
            if nx < 0 || ny < 0 || nx as usize >= w || ny as usize >= h {
                continue;
            }
            let nidx = ny as usize * w + nx as usize;
            if bitmap.data[nidx] == 0 && !outside[nidx] {
                outside[nidx] = true;
                stack.push((nx as usize, ny as usize));
            }
        }
    }

    outside
}

/// Flood-fill the 8-connected region containing `(x, y)`.
fn label_region(bitmap: &Bitmap, x: usize, y: usize, labelled: &mut [bool]) {
    let w = bitmap.width;
    let mut stack = vec![(x, y)];
    labelled[y * w + x] = true;

    while let Some((cx, cy)) = stack.pop() {
        for (dx, dy) in STEPS {
            let (nx, ny) = (cx as isize + dx, cy as isize + dy);
            if bitmap.get_signed(nx, ny) {
                let nidx = ny as usize * w + nx as usize;
                if !labelled[nidx] {
                    labelled[nidx] = true;
                    stack.push((nx as usize, ny as usize));
                }
            }
        }
    }
}

/// Moore-neighbour tracing of the outer boundary starting at a region's
/// topmost-leftmost pixel. Returns the boundary pixels in clockwise order;
/// pixels on one-pixel-wide parts appear once per visit.
fn trace_boundary(bitmap: &Bitmap, sx: usize, sy: usize) -> Vec<(usize, usize)> {
    let start = (sx, sy);
    let mut boundary = vec![start];

    let Some((first_dir, first)) = next_boundary_pixel(bitmap, start, WEST) else {
        return boundary;
    };

    let (mut current, mut dir) = (first, first_dir);
    let max_steps = 4 * bitmap.width * bitmap.height + 8;

    for _ in 0..max_steps {
        // Direction from `current` to the last background cell examined.
        let backtrack = if dir % 2 == 0 {
            (dir + 6) % 8
        } else {
            (dir + 5) % 8
        };
        let Some((next_dir, next)) = next_boundary_pixel(bitmap, current, backtrack) else {
            break;
        };
        if current == start && next == first {
            break;
        }
        boundary.push(current);
        current = next;
        dir = next_dir;
    }

    boundary
}

/// First foreground neighbour of `p`, scanning clockwise after `backtrack`.
fn next_boundary_pixel(
    bitmap: &Bitmap,
    p: (usize, usize),
    backtrack: usize,
) -> Option<(usize, (usize, usize))> {
    (1..8).map(|i| (backtrack + i) % 8).find_map(|dir| {
        let (dx, dy) = STEPS[dir];
        let (nx, ny) = (p.0 as isize + dx, p.1 as isize + dy);
        bitmap
            .get_signed(nx, ny)
            .then_some((dir, (nx as usize, ny as usize)))
    })
}

/// Keep only the points where the step direction changes.
fn compress_chain(boundary: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let n = boundary.len();
    if n < 3 {
        return boundary.to_vec();
    }

    let step = |a: (usize, usize), b: (usize, usize)| {
        (b.0 as isize - a.0 as isize, b.1 as isize - a.1 as isize)
    };

    (0..n)
        .filter(|&i| {
            let prev = boundary[(i + n - 1) % n];
            let next = boundary[(i + 1) % n];
            step(prev, boundary[i]) != step(boundary[i], next)
        })
        .map(|i| boundary[i])
        .collect()
}

fn distinct_points(points: &[(usize, usize)]) -> usize {
    let mut sorted = points.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}
