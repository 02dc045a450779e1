// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Deterministic colors for class manifests and pixel masks.

/// Label color of `index` in the VOC palette.
///
/// The palette interleaves the index bits into the high bits of the three
/// channels. Indices `0..256` reproduce the VOC segmentation palette
/// (`0` is black background, `255` the void color); larger indices up to
/// `2^24 - 1` keep extending it, and every index maps to a distinct color.
pub fn label_color(index: u32) -> [u8; 3] {
    let mut rgb = [0u8; 3];
    let mut cid = index;
    for j in 0..8 {
        for (channel, value) in rgb.iter_mut().enumerate() {
            *value |= (((cid >> channel) & 1) as u8) << (7 - j);
        }
        cid >>= 3;
    }
    rgb
}

/// Lookup table mapping packed RGB to palette index for fast mask decoding.
pub fn palette_lookup() -> std::collections::HashMap<[u8; 3], u8> {
    (0..=255u8).map(|i| (label_color(i as u32), i)).collect()
}

/// Format an RGB triple as `#rrggbb`.
pub fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Manifest color for the class at position `index`.
///
/// Hues step by the golden ratio so neighbouring classes stay apart.
pub fn class_color(index: usize) -> String {
    let golden_ratio = (5.0_f32.sqrt() - 1.0) / 2.0;
    let h = (index as f32 * golden_ratio).fract() * 360.0;
    let (r, g, b) = hsv_to_rgb(h, 0.85, 0.9);
    to_hex([
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    ])
}

/// Convert HSV (`h` in degrees, `s` and `v` in `0.0..=1.0`) to RGB in
/// `0.0..=1.0`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}
