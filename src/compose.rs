// SPDX-License-Identifier: MPL-2.0
//! Page composition: the rotation/placement decision and the PDF export.
//!
//! The decision procedure in [`plan_page`] is a pure function of the raw
//! pixel dimensions, the EXIF orientation code and the export options, so it
//! can be exercised directly in tests. [`compose_album`] performs the actual
//! sequential export with `printpdf`, then rewrites the document catalog with
//! `lopdf` to open on page 1 in Fit view.

use crate::error::Result;
use crate::image_list::ImageEntry;
use image_rs::DynamicImage;
use lopdf::Object;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::BufWriter;
use std::path::Path;

/// Margin kept free on all four page edges, in PostScript points.
pub const PAGE_MARGIN_PT: f32 = 16.0;

const A4_SHORT_MM: f32 = 210.0;
const A4_LONG_MM: f32 = 297.0;

/// Pixels map 1:1 to points before scaling, which keeps the placement
/// arithmetic in a single unit.
const PLACEMENT_DPI: f32 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    Portrait,
    #[default]
    Landscape,
}

/// The two user-facing export options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub orientation: PageOrientation,
    pub auto_rotate: bool,
}

/// Outcome of the per-image decision procedure.
///
/// `rotation_degrees` is the raw additive angle (counter-clockwise positive),
/// one of −90, 0, 90, 180 or 270. The rectangle is the placed image in page
/// coordinates, with `(x, y)` the bottom-left corner in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlan {
    pub rotation_degrees: i32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A4 page size in points for the given orientation.
pub fn page_size_pt(orientation: PageOrientation) -> (f32, f32) {
    let short = Mm(A4_SHORT_MM).into_pt().0;
    let long = Mm(A4_LONG_MM).into_pt().0;
    match orientation {
        PageOrientation::Portrait => (short, long),
        PageOrientation::Landscape => (long, short),
    }
}

/// Decides rotation and placement for one image.
///
/// EXIF codes 3/4 share the 180° treatment, 5/6 and 7/8 share ±90°; the
/// mirrored variants are corrected by rotation only, never flipped. When
/// auto-rotate is on and the (possibly flipped) shape disagrees with the page
/// orientation, a further 90° is added on top of the EXIF angle. Square
/// images never auto-rotate.
pub fn plan_page(
    width_px: u32,
    height_px: u32,
    exif_code: u32,
    options: &ExportOptions,
) -> PagePlan {
    let is_square = width_px == height_px;
    let mut is_portrait = height_px > width_px;

    let mut rotation: i32 = 0;
    match exif_code {
        3 | 4 => rotation = 180,
        5 | 6 => {
            rotation = -90;
            is_portrait = !is_portrait;
        }
        7 | 8 => {
            rotation = 90;
            is_portrait = !is_portrait;
        }
        _ => {}
    }

    if options.auto_rotate && !is_square {
        let page_is_portrait = options.orientation == PageOrientation::Portrait;
        if page_is_portrait != is_portrait {
            rotation += 90;
        }
    }

    let swaps_axes = rotation.rem_euclid(180) == 90;
    let (w, h) = if swaps_axes {
        (height_px as f32, width_px as f32)
    } else {
        (width_px as f32, height_px as f32)
    };

    let (page_w, page_h) = page_size_pt(options.orientation);
    let avail_w = page_w - 2.0 * PAGE_MARGIN_PT;
    let avail_h = page_h - 2.0 * PAGE_MARGIN_PT;

    // Uniform scale-to-fit; small images are allowed to upscale.
    let scale = (avail_w / w).min(avail_h / h);
    let placed_w = w * scale;
    let placed_h = h * scale;

    PagePlan {
        rotation_degrees: rotation,
        x: (page_w - placed_w) / 2.0,
        y: (page_h - placed_h) / 2.0,
        width: placed_w,
        height: placed_h,
    }
}

/// Applies the planned angle as a lossless raster rotation.
///
/// Positive angles are counter-clockwise; the `image` crate rotations are
/// clockwise, so the mapping is inverted.
fn apply_rotation(img: DynamicImage, degrees: i32) -> DynamicImage {
    match degrees.rem_euclid(360) {
        90 => img.rotate270(),
        180 => img.rotate180(),
        270 => img.rotate90(),
        _ => img,
    }
}

/// Composes one page per entry, in list order, into a PDF at `output`.
///
/// The destination file is opened before anything is composed: a locked or
/// invalid path aborts the export before the first page exists, with the
/// underlying I/O message. The handle stays open for the whole export and is
/// dropped when the function returns, success or error. There is no retry
/// and no temp-file dance; whatever was flushed before a later failure stays
/// on disk as-is.
pub fn compose_album(
    entries: &[ImageEntry],
    options: &ExportOptions,
    output: &Path,
) -> Result<()> {
    let file = fs::File::create(output)?;

    let (page_w_mm, page_h_mm) = match options.orientation {
        PageOrientation::Portrait => (Mm(A4_SHORT_MM), Mm(A4_LONG_MM)),
        PageOrientation::Landscape => (Mm(A4_LONG_MM), Mm(A4_SHORT_MM)),
    };

    let title = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("album");
    let mut doc = PdfDocument::new(title);
    let mut pages: Vec<PdfPage> = Vec::with_capacity(entries.len());

    for entry in entries {
        let bytes = fs::read(&entry.path)?;
        let decoded = image_rs::load_from_memory(&bytes)?;
        let plan = plan_page(decoded.width(), decoded.height(), entry.orientation, options);
        let rotated = apply_rotation(decoded, plan.rotation_degrees);

        let rgb = rotated.to_rgb8();
        let (px_w, px_h) = rgb.dimensions();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: px_w as usize,
            height: px_h as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let image_id = doc.add_image(&raw);

        // At PLACEMENT_DPI the image's native size equals its pixel count in
        // points, so the plan width converts directly into a scale factor.
        let scale = plan.width / px_w as f32;
        let ops = vec![Op::UseXobject {
            id: image_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(plan.x)),
                translate_y: Some(Pt(plan.y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(PLACEMENT_DPI),
                rotate: None,
            },
        }];
        pages.push(PdfPage::new(page_w_mm, page_h_mm, ops));
    }

    doc.with_pages(pages);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);

    write_with_open_action(&bytes, file)
}

/// Adds an `OpenAction` pointing at page 1 in Fit view, then writes the
/// document through the already-open handle.
fn write_with_open_action(bytes: &[u8], file: fs::File) -> Result<()> {
    let mut doc = lopdf::Document::load_mem(bytes)?;

    if let Some(&first_page) = doc.get_pages().get(&1) {
        let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
        let action = Object::Array(vec![
            Object::Reference(first_page),
            Object::Name(b"Fit".to_vec()),
        ]);
        doc.get_object_mut(catalog_id)?
            .as_dict_mut()?
            .set("OpenAction", action);
    }

    let mut writer = BufWriter::new(file);
    doc.save_to(&mut writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::image_list::ImageList;
    use image_rs::{DynamicImage, ImageBuffer, Rgb};
    use std::path::Path;
    use tempfile::tempdir;

    fn landscape_options() -> ExportOptions {
        ExportOptions {
            orientation: PageOrientation::Landscape,
            auto_rotate: false,
        }
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb([200u8, 80, 40]));
        DynamicImage::ImageRgb8(buffer)
            .save(path)
            .expect("failed to write png fixture");
    }

    #[test]
    fn unknown_code_without_auto_rotate_stays_level() {
        for code in [0, 1, 2, 9, 42] {
            let plan = plan_page(800, 600, code, &landscape_options());
            assert_eq!(plan.rotation_degrees, 0, "code {}", code);
        }
    }

    #[test]
    fn codes_three_and_four_turn_upside_down() {
        for code in [3, 4] {
            let plan = plan_page(800, 600, code, &landscape_options());
            assert_eq!(plan.rotation_degrees, 180);
            // Classification unchanged: a landscape raster still fills the
            // landscape page width-first.
            assert!(plan.width > plan.height);
        }
    }

    #[test]
    fn code_six_rotates_landscape_raster_into_portrait() {
        let options = ExportOptions {
            orientation: PageOrientation::Portrait,
            auto_rotate: false,
        };
        let plan = plan_page(800, 600, 6, &options);
        assert_eq!(plan.rotation_degrees, -90);
        // Effective shape is portrait, so the placed rect is taller than wide.
        assert!(plan.height > plan.width);
    }

    #[test]
    fn codes_seven_and_eight_rotate_the_other_way() {
        for code in [7, 8] {
            let plan = plan_page(800, 600, code, &landscape_options());
            assert_eq!(plan.rotation_degrees, 90);
        }
    }

    #[test]
    fn auto_rotate_adds_ninety_on_shape_mismatch() {
        let options = ExportOptions {
            orientation: PageOrientation::Landscape,
            auto_rotate: true,
        };
        // Portrait raster on a landscape page.
        let plan = plan_page(600, 800, 0, &options);
        assert_eq!(plan.rotation_degrees, 90);
    }

    #[test]
    fn auto_rotate_is_additive_with_exif_angle() {
        let options = ExportOptions {
            orientation: PageOrientation::Landscape,
            auto_rotate: true,
        };
        // Code 3 keeps the portrait classification, so the mismatch adds 90
        // on top of the 180.
        let plan = plan_page(600, 800, 3, &options);
        assert_eq!(plan.rotation_degrees, 270);
    }

    #[test]
    fn auto_rotate_can_cancel_the_exif_angle() {
        let options = ExportOptions {
            orientation: PageOrientation::Landscape,
            auto_rotate: true,
        };
        // Code 6 flips an 800×600 raster to effective portrait; the
        // landscape page then disagrees and adds 90, cancelling the −90.
        let plan = plan_page(800, 600, 6, &options);
        assert_eq!(plan.rotation_degrees, 0);
    }

    #[test]
    fn square_images_never_auto_rotate() {
        for orientation in [PageOrientation::Portrait, PageOrientation::Landscape] {
            let options = ExportOptions {
                orientation,
                auto_rotate: true,
            };
            let plan = plan_page(500, 500, 0, &options);
            assert_eq!(plan.rotation_degrees, 0);
        }
    }

    #[test]
    fn placement_fits_margins_and_preserves_aspect() {
        let options = landscape_options();
        let plan = plan_page(800, 600, 0, &options);
        let (page_w, page_h) = page_size_pt(PageOrientation::Landscape);

        assert!(plan.width <= page_w - 2.0 * PAGE_MARGIN_PT + 0.01);
        assert!(plan.height <= page_h - 2.0 * PAGE_MARGIN_PT + 0.01);
        let aspect = plan.width / plan.height;
        assert!((aspect - 800.0 / 600.0).abs() < 0.001);
    }

    #[test]
    fn placement_is_centered_on_the_page() {
        let plan = plan_page(800, 600, 0, &landscape_options());
        let (page_w, page_h) = page_size_pt(PageOrientation::Landscape);
        assert!((plan.x - (page_w - plan.width) / 2.0).abs() < 0.01);
        assert!((plan.y - (page_h - plan.height) / 2.0).abs() < 0.01);
    }

    #[test]
    fn small_images_upscale_to_fit() {
        let plan = plan_page(80, 60, 0, &landscape_options());
        assert!(plan.width > 80.0);
    }

    #[test]
    fn rotation_swaps_raster_axes() {
        let buffer = ImageBuffer::from_pixel(4, 2, Rgb([0u8, 0, 0]));
        let img = DynamicImage::ImageRgb8(buffer);

        let turned = apply_rotation(img.clone(), -90);
        assert_eq!((turned.width(), turned.height()), (2, 4));

        let level = apply_rotation(img.clone(), 0);
        assert_eq!((level.width(), level.height()), (4, 2));

        let flipped = apply_rotation(img, 180);
        assert_eq!((flipped.width(), flipped.height()), (4, 2));
    }

    #[test]
    fn compose_album_writes_one_page_per_image() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let a = temp_dir.path().join("a.png");
        let b = temp_dir.path().join("b.png");
        let c = temp_dir.path().join("c.png");
        write_png(&a, 8, 6);
        write_png(&b, 6, 8);
        write_png(&c, 5, 5);

        let mut list = ImageList::default();
        list.add_batch(vec![a, b, c]);

        let output = temp_dir.path().join("out.pdf");
        compose_album(list.entries(), &landscape_options(), &output)
            .expect("compose should succeed");

        let doc = lopdf::Document::load(&output).expect("output should parse");
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn compose_album_sets_fit_open_action_on_page_one() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let img = temp_dir.path().join("only.png");
        write_png(&img, 8, 6);

        let mut list = ImageList::default();
        list.add_batch(vec![img]);

        let output = temp_dir.path().join("out.pdf");
        compose_album(list.entries(), &landscape_options(), &output)
            .expect("compose should succeed");

        let doc = lopdf::Document::load(&output).expect("output should parse");
        let catalog_id = doc
            .trailer
            .get(b"Root")
            .and_then(|obj| obj.as_reference())
            .expect("catalog reference");
        let catalog = doc
            .get_object(catalog_id)
            .and_then(|obj| obj.as_dict())
            .expect("catalog dictionary");
        let action = catalog
            .get(b"OpenAction")
            .and_then(|obj| obj.as_array())
            .expect("open action array");
        assert_eq!(action.len(), 2);
        assert_eq!(action[1].as_name().expect("view name"), &b"Fit"[..]);
    }

    #[test]
    fn locked_destination_aborts_before_composing() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let img = temp_dir.path().join("only.png");
        write_png(&img, 8, 6);

        let mut list = ImageList::default();
        list.add_batch(vec![img]);

        // A directory at the destination path makes the create call fail.
        let output = temp_dir.path().join("blocked.pdf");
        std::fs::create_dir(&output).expect("create blocking dir");

        let result = compose_album(list.entries(), &landscape_options(), &output);
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(output.is_dir(), "nothing should have replaced the path");
    }

    #[test]
    fn vanished_source_file_surfaces_as_io_error() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let img = temp_dir.path().join("gone.png");
        write_png(&img, 8, 6);

        let mut list = ImageList::default();
        list.add_batch(vec![img.clone()]);
        std::fs::remove_file(&img).expect("remove source");

        let output = temp_dir.path().join("out.pdf");
        let result = compose_album(list.entries(), &landscape_options(), &output);
        assert!(result.is_err());
    }
}
