//! PDF assembly: one JPEG page per image, and page-level concatenation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, warn};

use crate::error::StripcutError;
use crate::progress::{ProgressReporter, Stage};

/// Largest side a page image may have; JPEG cannot encode beyond this.
pub const MAX_PAGE_SIDE: u32 = 65_500;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Encoding options for [`create_pdf_from_images`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PdfOptions {
    /// Images wider than this are downscaled to it. `None` keeps sizes.
    pub target_width: Option<u32>,
    pub jpeg_quality: u8,
    pub dpi: u32,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            target_width: Some(1500),
            jpeg_quality: 85,
            dpi: 300,
        }
    }
}

/// A PDF written to disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdfSummary {
    pub path: PathBuf,
    pub pages: usize,
}

struct EncodedPage {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
}

fn points(pixels: u32, dpi: u32) -> f32 {
    pixels as f32 * 72.0 / dpi.max(1) as f32
}

fn encode_page(path: &Path, options: &PdfOptions) -> Result<EncodedPage, StripcutError> {
    let size = imagesize::size(path).map_err(|source| StripcutError::ImageProbe {
        path: path.to_path_buf(),
        source,
    })?;
    let width = u32::try_from(size.width).unwrap_or(u32::MAX);
    let height = u32::try_from(size.height).unwrap_or(u32::MAX);
    if width > MAX_PAGE_SIDE || height > MAX_PAGE_SIDE {
        return Err(StripcutError::ImageTooLarge {
            path: path.to_path_buf(),
            width,
            height,
            limit: MAX_PAGE_SIDE,
        });
    }

    let mut rgb: RgbImage = crate::stitch::open_rgb(path)?;
    if let Some(target) = options.target_width {
        if target > 0 && rgb.width() > target {
            let height = ((u64::from(rgb.height()) * u64::from(target)) / u64::from(rgb.width()))
                .max(1) as u32;
            rgb = imageops::resize(&rgb, target, height, FilterType::Lanczos3);
        }
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, options.jpeg_quality.clamp(1, 100))
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|source| StripcutError::ImageSave {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(EncodedPage {
        jpeg,
        width: rgb.width(),
        height: rgb.height(),
    })
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    page: EncodedPage,
    dpi: u32,
) -> Result<ObjectId, lopdf::Error> {
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(page.width),
            "Height" => i64::from(page.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        page.jpeg,
    ));

    let width_pt = points(page.width, dpi);
    let height_pt = points(page.height, dpi);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(width_pt),
                    0.into(),
                    0.into(),
                    Object::Real(height_pt),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), Object::Real(width_pt), Object::Real(height_pt)],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "Contents" => content_id,
    }))
}

fn finish_document(doc: &mut Document, pages_id: ObjectId, kids: Vec<Object>) {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
}

fn save_document(doc: &mut Document, out_path: &Path) -> Result<(), StripcutError> {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| StripcutError::io_at(parent, err))?;
    }
    doc.save(out_path)
        .map_err(|err| StripcutError::pdf(out_path, err))?;
    Ok(())
}

/// Build a PDF with one page per image, in the given order.
///
/// Oversized and undecodable images are skipped with a warning. Returns
/// `Ok(None)` without writing anything when no page was produced.
pub fn create_pdf_from_images(
    paths: &[PathBuf],
    out_path: &Path,
    options: &PdfOptions,
    reporter: &dyn ProgressReporter,
) -> Result<Option<PdfSummary>, StripcutError> {
    if paths.is_empty() {
        info!("No images available to create {}", out_path.display());
        return Ok(None);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(paths.len());

    reporter.on_stage_start(Stage::Pdf, paths.len());
    for (idx, path) in paths.iter().enumerate() {
        match encode_page(path, options) {
            Ok(page) => {
                let page_id = add_image_page(&mut doc, pages_id, page, options.dpi)
                    .map_err(|err| StripcutError::pdf(out_path, err))?;
                kids.push(page_id.into());
            }
            Err(err) => warn!("Skipping page: {err}"),
        }
        reporter.on_stage_progress(Stage::Pdf, idx + 1);
    }
    reporter.on_stage_complete(Stage::Pdf);

    if kids.is_empty() {
        warn!("No usable pages for {}", out_path.display());
        return Ok(None);
    }

    let pages = kids.len();
    finish_document(&mut doc, pages_id, kids);
    save_document(&mut doc, out_path)?;
    info!("Created {} ({pages} page(s))", out_path.display());

    Ok(Some(PdfSummary {
        path: out_path.to_path_buf(),
        pages,
    }))
}

fn object_type(object: &Object) -> Option<&[u8]> {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return None,
    };
    dict.get(b"Type").and_then(Object::as_name).ok()
}

fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded walk; malformed trees can contain cycles.
    for _ in 0..64 {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Fuzz-only entrypoint: load a PDF from memory and resolve every page's
/// inherited attributes.
#[cfg(feature = "fuzzing")]
pub fn fuzz_collect_pages(data: &[u8]) -> usize {
    let Ok(doc) = Document::load_mem(data) else {
        return 0;
    };
    let mut resolved = 0;
    for page_id in doc.get_pages().into_values() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        for key in INHERITABLE_KEYS {
            if page.has(key) || inherited_attribute(&doc, page, key).is_some() {
                resolved += 1;
            }
        }
    }
    resolved
}

/// Concatenate the pages of `inputs` into `out_path`.
///
/// Unreadable inputs are logged and skipped. Returns the number of pages
/// written, or `None` (and writes nothing) when no page was collected.
pub fn merge_pdfs(inputs: &[PathBuf], out_path: &Path) -> Result<Option<usize>, StripcutError> {
    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for input in inputs {
        let mut doc = match Document::load(input) {
            Ok(doc) => doc,
            Err(err) => {
                warn!("Skipping unreadable PDF {}: {err}", input.display());
                continue;
            }
        };
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        debug!(pages = page_ids.len(), "loaded {}", input.display());
        for page_id in page_ids {
            let Ok(dict) = doc.get_dictionary(page_id) else {
                continue;
            };
            let mut dict = dict.clone();
            for key in INHERITABLE_KEYS {
                if !dict.has(key) {
                    if let Some(value) = inherited_attribute(&doc, &dict, key) {
                        dict.set(key, value);
                    }
                }
            }
            pages.push((page_id, dict));
        }

        for (id, object) in doc.objects {
            match object_type(&object) {
                Some(b"Catalog") | Some(b"Pages") | Some(b"Page") | Some(b"Outlines")
                | Some(b"Outline") => {}
                _ => {
                    objects.insert(id, object);
                }
            }
        }
    }

    if pages.is_empty() {
        warn!("No pages collected for {}", out_path.display());
        return Ok(None);
    }

    let mut doc = Document::with_version("1.5");
    doc.objects = objects;
    doc.max_id = next_id;

    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    for (page_id, mut dict) in pages {
        dict.set("Parent", pages_id);
        doc.objects.insert(page_id, Object::Dictionary(dict));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len();
    finish_document(&mut doc, pages_id, kids);
    doc.renumber_objects();
    save_document(&mut doc, out_path)?;
    info!("Merged {count} page(s) into {}", out_path.display());

    Ok(Some(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use image::Rgb;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn points_follow_dpi() {
        assert!((points(300, 300) - 72.0).abs() < f32::EPSILON);
        assert!((points(150, 72) - 150.0).abs() < f32::EPSILON);
    }

    #[test]
    fn one_page_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a, 40, 60);
        write_png(&b, 40, 30);

        let out = dir.path().join("out").join("book.pdf");
        let summary =
            create_pdf_from_images(&[a, b], &out, &PdfOptions::default(), &SilentReporter)
                .unwrap()
                .unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(Document::load(&out).unwrap().get_pages().len(), 2);
    }

    #[test]
    fn undecodable_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("bad.png");
        write_png(&good, 10, 10);
        fs::write(&bad, b"garbage").unwrap();

        let out = dir.path().join("book.pdf");
        let summary =
            create_pdf_from_images(&[bad, good], &out, &PdfOptions::default(), &SilentReporter)
                .unwrap()
                .unwrap();
        assert_eq!(summary.pages, 1);
    }

    #[test]
    fn nothing_written_without_pages() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.png");
        fs::write(&bad, b"garbage").unwrap();

        let out = dir.path().join("book.pdf");
        let summary =
            create_pdf_from_images(&[bad], &out, &PdfOptions::default(), &SilentReporter).unwrap();
        assert!(summary.is_none());
        assert!(!out.exists());
    }

    #[test]
    fn merge_concatenates_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("p.png");
        write_png(&img, 20, 20);

        let first = dir.path().join("1.pdf");
        let second = dir.path().join("2.pdf");
        let options = PdfOptions::default();
        create_pdf_from_images(&[img.clone(), img.clone()], &first, &options, &SilentReporter)
            .unwrap();
        create_pdf_from_images(&[img], &second, &options, &SilentReporter).unwrap();

        let junk = dir.path().join("junk.pdf");
        fs::write(&junk, b"%PDF-nope").unwrap();

        let merged = dir.path().join("merged.pdf");
        let pages = merge_pdfs(&[first, junk, second], &merged).unwrap();
        assert_eq!(pages, Some(3));
        assert_eq!(Document::load(&merged).unwrap().get_pages().len(), 3);
    }

    #[test]
    fn merge_without_readable_inputs_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("junk.pdf");
        fs::write(&junk, b"nope").unwrap();
        let merged = dir.path().join("merged.pdf");
        assert_eq!(merge_pdfs(&[junk], &merged).unwrap(), None);
        assert!(!merged.exists());
    }
}
