//! Row classifiers: decide which rows of a strip are blank background.

use std::collections::HashMap;

use image::RgbImage;
use rayon::prelude::*;

use super::palette::Rgb8;

/// Classifies every row of an image as blank (`true`) or content (`false`).
pub trait RowClassifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Classify a single row given its pixels.
    fn is_blank_row(&self, row: &[Rgb8]) -> bool;

    /// Classify all rows of `image`, in parallel.
    fn classify_rows(&self, image: &RgbImage) -> Vec<bool> {
        let width = image.width() as usize;
        if width == 0 {
            return vec![false; image.height() as usize];
        }

        image
            .as_raw()
            .par_chunks_exact(width * 3)
            .map(|bytes| {
                let row: Vec<Rgb8> = bytes
                    .chunks_exact(3)
                    .map(|px| [px[0], px[1], px[2]])
                    .collect();
                self.is_blank_row(&row)
            })
            .collect()
    }
}

/// Squared Euclidean distance between two colours.
fn distance_sq(a: Rgb8, b: Rgb8) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = i32::from(x) - i32::from(y);
            (d * d) as u32
        })
        .sum()
}

/// Returns true if `a` and `b` are within `tolerance` in RGB space.
///
/// A tolerance of zero requires exact equality.
pub fn colors_close(a: Rgb8, b: Rgb8, tolerance: u32) -> bool {
    if tolerance == 0 {
        return a == b;
    }
    distance_sq(a, b) <= tolerance * tolerance
}

/// Solid-band classifier.
///
/// A row is blank when its first pixel is close to one of the palette
/// swatches and every other pixel is close to that first pixel.
#[derive(Clone, Debug)]
pub struct SolidBandClassifier {
    palette: Vec<Rgb8>,
    tolerance: u32,
}

impl SolidBandClassifier {
    pub fn new(palette: &[Rgb8], tolerance: u32) -> Self {
        Self {
            palette: palette.to_vec(),
            tolerance,
        }
    }
}

impl RowClassifier for SolidBandClassifier {
    fn name(&self) -> &'static str {
        "solid-band"
    }

    fn is_blank_row(&self, row: &[Rgb8]) -> bool {
        let Some(&first) = row.first() else {
            return false;
        };

        if !self
            .palette
            .iter()
            .any(|&swatch| colors_close(first, swatch, self.tolerance))
        {
            return false;
        }

        row[1..]
            .iter()
            .all(|&px| colors_close(px, first, self.tolerance))
    }
}

/// Quantized-histogram classifier.
///
/// Colours are bucketed by dividing each channel by `quantization`. A row
/// is blank when its center region holds few distinct buckets and the same
/// dominant bucket also dominates both margins.
#[derive(Clone, Debug)]
pub struct HistogramClassifier {
    quantization: u8,
    max_unique_colors: usize,
    edge_margin: f64,
}

/// Dominant quantized colour and number of distinct colours in a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionStats {
    pub dominant: Rgb8,
    pub unique: usize,
}

impl HistogramClassifier {
    /// `quantization` of 0 is treated as 1. `edge_margin` is a fraction of
    /// the row width and is clamped to `[0, 0.5)`.
    pub fn new(quantization: u8, max_unique_colors: usize, edge_margin: f64) -> Self {
        let edge_margin = if edge_margin.is_finite() {
            edge_margin.clamp(0.0, 0.49)
        } else {
            0.0
        };
        Self {
            quantization: quantization.max(1),
            max_unique_colors,
            edge_margin,
        }
    }

    fn quantize(&self, px: Rgb8) -> Rgb8 {
        [
            px[0] / self.quantization,
            px[1] / self.quantization,
            px[2] / self.quantization,
        ]
    }

    /// Histogram a region. Ties for dominant colour go to the smallest
    /// quantized colour so results do not depend on hash order.
    pub fn region_stats(&self, pixels: &[Rgb8]) -> Option<RegionStats> {
        if pixels.is_empty() {
            return None;
        }

        let mut counts: HashMap<Rgb8, usize> = HashMap::new();
        for &px in pixels {
            *counts.entry(self.quantize(px)).or_insert(0) += 1;
        }

        let (dominant, _) = counts
            .iter()
            .max_by(|(color_a, count_a), (color_b, count_b)| {
                count_a.cmp(count_b).then_with(|| color_b.cmp(color_a))
            })
            .map(|(color, count)| (*color, *count))?;

        Some(RegionStats {
            dominant,
            unique: counts.len(),
        })
    }

    fn margin_agrees(&self, pixels: &[Rgb8], center: Rgb8) -> bool {
        match self.region_stats(pixels) {
            Some(stats) => stats.unique <= self.max_unique_colors && stats.dominant == center,
            // Rows under 1/edge_margin pixels wide have empty margins, which
            // pass: the center alone decides.
            None => true,
        }
    }
}

impl RowClassifier for HistogramClassifier {
    fn name(&self) -> &'static str {
        "histogram"
    }

    fn is_blank_row(&self, row: &[Rgb8]) -> bool {
        let margin = (row.len() as f64 * self.edge_margin) as usize;
        let center = &row[margin..row.len() - margin];

        let Some(center_stats) = self.region_stats(center) else {
            return false;
        };
        if center_stats.unique > self.max_unique_colors {
            return false;
        }

        self.margin_agrees(&row[..margin], center_stats.dominant)
            && self.margin_agrees(&row[row.len() - margin..], center_stats.dominant)
    }
}
