use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use tracing::debug;

use super::font::{BASE_FONT_HEIGHT, BitmapFace, GlyphFace};
use super::position::{image_anchor, text_anchor};
use super::types::{WatermarkKind, WatermarkSpec};

/// Height of the scratch buffer text is rasterised into
const SCRATCH_HEIGHT: u32 = 20;
/// Baseline row inside the scratch buffer
const SCRATCH_BASELINE: i32 = 13;
/// Scratch width reserved per glyph
const SCRATCH_ADVANCE: u32 = 8;

/// Draw the watermark described by `spec` over `source` using the built-in bitmap face.
///
/// `asset` is the decoded watermark image for image watermarks. When it is absent
/// the source is returned unchanged.
pub fn composite(
    source: &DynamicImage,
    spec: &WatermarkSpec,
    asset: Option<&DynamicImage>,
) -> DynamicImage {
    composite_with_face(source, spec, asset, &BitmapFace)
}

/// Same as [`composite`] but renders text with the given face
pub fn composite_with_face(
    source: &DynamicImage,
    spec: &WatermarkSpec,
    asset: Option<&DynamicImage>,
    face: &dyn GlyphFace,
) -> DynamicImage {
    match spec.kind {
        WatermarkKind::Text => {
            let mut canvas = source.to_rgba8();
            draw_text_watermark(&mut canvas, spec, face);
            DynamicImage::ImageRgba8(canvas)
        }
        WatermarkKind::Image => match asset {
            Some(asset) => {
                let mut canvas = source.to_rgba8();
                draw_image_watermark(&mut canvas, spec, asset);
                DynamicImage::ImageRgba8(canvas)
            }
            None => {
                debug!("No watermark image available, leaving source untouched");
                source.clone()
            }
        },
    }
}

/// Estimated layout box of the text, before any scaling of the glyph raster
pub fn estimated_text_box(text: &str, font_size: u32) -> (u32, u32) {
    let glyphs = text.chars().count() as u32;
    (glyphs.saturating_mul(font_size) / 2, font_size)
}

/// Scale factor applied to the base-size glyph raster
pub fn text_scale(font_size: u32) -> f64 {
    (f64::from(font_size) / f64::from(BASE_FONT_HEIGHT)).max(1.0)
}

/// Rasterise the spec's text at base size and upscale it to the requested font size
pub fn text_raster(spec: &WatermarkSpec, face: &dyn GlyphFace) -> RgbaImage {
    let text = spec.resolved_text();
    let glyphs = text.chars().count() as u32;

    let width = glyphs
        .saturating_mul(SCRATCH_ADVANCE.max(face.advance()))
        .max(1);
    let mut scratch = RgbaImage::new(width, SCRATCH_HEIGHT);
    face.draw(
        &mut scratch,
        0,
        SCRATCH_BASELINE,
        spec.effective_color().to_rgba(),
        text,
    );

    let scale = text_scale(spec.font_size);
    let scaled_width = ((f64::from(width) * scale) as u32).max(1);
    let scaled_height = ((f64::from(SCRATCH_HEIGHT) * scale) as u32).max(1);

    if (scaled_width, scaled_height) == scratch.dimensions() {
        scratch
    } else {
        resize_premultiplied(scratch, scaled_width, scaled_height)
    }
}

fn draw_text_watermark(canvas: &mut RgbaImage, spec: &WatermarkSpec, face: &dyn GlyphFace) {
    let text = spec.resolved_text();

    // Placement uses the estimated box, the raster is scaled independently
    let text_box = estimated_text_box(text, spec.font_size);
    let (x, baseline) = text_anchor(canvas.dimensions(), text_box, spec.position);
    let x = x + spec.offset_x;
    let baseline = baseline + spec.offset_y;

    let raster = text_raster(spec, face);
    let top = baseline - raster.height() as i32;

    debug!(
        "Text watermark '{}' at ({}, {}) raster {}x{}",
        text,
        x,
        baseline,
        raster.width(),
        raster.height()
    );

    draw_raster(canvas, raster, x, top, spec.rotation);
}

fn draw_image_watermark(canvas: &mut RgbaImage, spec: &WatermarkSpec, asset: &DynamicImage) {
    let (cw, ch) = canvas.dimensions();
    let mut mark = fit_watermark(asset.to_rgba8(), cw.min(ch) / 4);

    if spec.opacity < 100 {
        apply_opacity(&mut mark, spec.opacity);
    }

    let (x, y) = image_anchor((cw, ch), mark.dimensions(), spec.position);
    let x = x + spec.offset_x;
    let y = y + spec.offset_y;

    debug!(
        "Image watermark {}x{} at ({}, {})",
        mark.width(),
        mark.height(),
        x,
        y
    );

    draw_raster(canvas, mark, x, y, spec.rotation);
}

/// Downscale `mark` so neither side exceeds `max_size`, preserving aspect ratio
pub fn fit_watermark(mark: RgbaImage, max_size: u32) -> RgbaImage {
    let (width, height) = mark.dimensions();
    if width <= max_size && height <= max_size {
        return mark;
    }

    let max_size = max_size.max(1);
    let scale = f64::from(max_size) / f64::from(width.max(height));
    let (new_width, new_height) = if width >= height {
        (max_size, ((f64::from(height) * scale) as u32).max(1))
    } else {
        (((f64::from(width) * scale) as u32).max(1), max_size)
    };

    debug!(
        "Scaling watermark {}x{} -> {}x{}",
        width, height, new_width, new_height
    );
    resize_premultiplied(mark, new_width, new_height)
}

/// Lanczos3 resize that weights colour by alpha, so transparent pixels do not
/// bleed their colour into the edges of opaque ones
fn resize_premultiplied(mut raster: RgbaImage, width: u32, height: u32) -> RgbaImage {
    premultiply(&mut raster);
    let mut resized = imageops::resize(&raster, width, height, FilterType::Lanczos3);
    unpremultiply(&mut resized);
    resized
}

fn premultiply(raster: &mut RgbaImage) {
    for pixel in raster.pixels_mut() {
        let alpha = u16::from(pixel[3]);
        for channel in 0..3 {
            pixel[channel] = ((u16::from(pixel[channel]) * alpha + 127) / 255) as u8;
        }
    }
}

fn unpremultiply(raster: &mut RgbaImage) {
    for pixel in raster.pixels_mut() {
        let alpha = u16::from(pixel[3]);
        if alpha == 0 {
            *pixel = Rgba([0, 0, 0, 0]);
            continue;
        }
        for channel in 0..3 {
            // Filter overshoot can leave a channel above its alpha
            let value = (u16::from(pixel[channel]) * 255 + alpha / 2) / alpha;
            pixel[channel] = value.min(255) as u8;
        }
    }
}

/// Multiply every pixel's alpha by `opacity / 100`
pub fn apply_opacity(raster: &mut RgbaImage, opacity: u8) {
    let factor = f64::from(opacity.min(100)) / 100.0;
    for pixel in raster.pixels_mut() {
        pixel[3] = (f64::from(pixel[3]) * factor) as u8;
    }
}

/// Source-over blend `raster` with its top-left corner at `(x, y)`.
///
/// A non-zero rotation turns the raster about its own centre, keeping that
/// centre where the unrotated raster would have had it.
fn draw_raster(canvas: &mut RgbaImage, raster: RgbaImage, x: i32, y: i32, rotation: f32) {
    let degrees = rotation.rem_euclid(360.0);
    if degrees == 0.0 {
        imageops::overlay(canvas, &raster, i64::from(x), i64::from(y));
        return;
    }

    let rotated = rotate_expanded(&raster, degrees);
    let dx = (rotated.width() as i32 - raster.width() as i32) / 2;
    let dy = (rotated.height() as i32 - raster.height() as i32) / 2;
    imageops::overlay(canvas, &rotated, i64::from(x - dx), i64::from(y - dy));
}

/// Rotate clockwise by `degrees` on a canvas large enough to hold every corner
pub fn rotate_expanded(raster: &RgbaImage, degrees: f32) -> RgbaImage {
    let (width, height) = raster.dimensions();
    let side = f64::from(width).hypot(f64::from(height)).ceil() as u32;

    let mut padded = RgbaImage::new(side, side);
    imageops::replace(
        &mut padded,
        raster,
        i64::from((side - width) / 2),
        i64::from((side - height) / 2),
    );

    premultiply(&mut padded);
    let mut rotated = rotate_about_center(
        &padded,
        degrees.to_radians(),
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
    );
    unpremultiply(&mut rotated);
    rotated
}
