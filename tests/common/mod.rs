#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};

/// An image with no uniform row: every row varies along x.
pub fn textured(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 13 % 251) as u8,
            (y * 7 % 253) as u8,
            ((x + 2 * y) % 256) as u8,
        ])
    })
}

/// A textured page with a white band of `band` rows starting at `band_start`.
pub fn page_with_band(width: u32, height: u32, band_start: u32, band: u32) -> RgbImage {
    let mut img = textured(width, height);
    for y in band_start..(band_start + band).min(height) {
        for x in 0..width {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    img
}

pub fn write_png(path: &Path, img: &RgbImage) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    img.save(path).expect("write png file");
}

pub fn pdf_page_count(path: &Path) -> usize {
    lopdf::Document::load(path)
        .expect("load pdf")
        .get_pages()
        .len()
}
