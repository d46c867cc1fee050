use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use embedded_graphics::mono_font::{MonoTextStyle, iso_8859_1::FONT_7X13};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use std::convert::Infallible;
use std::path::Path;
use tracing::debug;

use crate::error::WatermarkError;

/// Pixel height glyphs are rasterised at before scaling
pub const BASE_FONT_HEIGHT: f32 = 13.0;

/// A fixed-size glyph source used to rasterise watermark text
pub trait GlyphFace {
    /// Horizontal distance between successive glyph origins, in pixels
    fn advance(&self) -> u32;

    /// Distance from the baseline to the top of the tallest glyph, in pixels
    fn ascent(&self) -> u32;

    /// Draw `text` with its first glyph origin at `(x, baseline)`
    fn draw(&self, canvas: &mut RgbaImage, x: i32, baseline: i32, color: Rgba<u8>, text: &str);
}

/// Built-in 7x13 bitmap face covering ASCII and Latin-1.
///
/// Each glyph cell is 13 rows: 11 above the baseline and 2 below it.
/// Characters outside Latin-1 render as `?`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapFace;

impl BitmapFace {
    const ASCENT: u32 = 11;
}

/// Adapts an RGBA canvas to a one-bit draw target, painting lit pixels in `color`
struct MonoCanvas<'a> {
    image: &'a mut RgbaImage,
    color: Rgba<u8>,
}

impl OriginDimensions for MonoCanvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

impl DrawTarget for MonoCanvas<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.image.dimensions();
        for Pixel(point, color) in pixels {
            if color.is_off() || point.x < 0 || point.y < 0 {
                continue;
            }
            let (px, py) = (point.x as u32, point.y as u32);
            if px < width && py < height {
                self.image.put_pixel(px, py, self.color);
            }
        }
        Ok(())
    }
}

impl GlyphFace for BitmapFace {
    fn advance(&self) -> u32 {
        FONT_7X13.character_size.width + FONT_7X13.character_spacing
    }

    fn ascent(&self) -> u32 {
        Self::ASCENT
    }

    fn draw(&self, canvas: &mut RgbaImage, x: i32, baseline: i32, color: Rgba<u8>, text: &str) {
        let top = baseline - Self::ASCENT as i32;
        let style = MonoTextStyle::new(&FONT_7X13, BinaryColor::On);
        let mut target = MonoCanvas {
            image: canvas,
            color,
        };
        let Ok(_) =
            Text::with_baseline(text, Point::new(x, top), style, Baseline::Top).draw(&mut target);
    }
}

/// TrueType/OpenType face rendered at the base font height
pub struct TrueTypeFace {
    font: FontVec,
    scale: PxScale,
}

impl TrueTypeFace {
    pub fn from_file(path: &Path) -> Result<Self, WatermarkError> {
        let data = std::fs::read(path)?;
        let font = FontVec::try_from_vec(data)
            .map_err(|e| WatermarkError::FontError(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded TrueType face from {:?}", path);
        Ok(Self {
            font,
            scale: PxScale::from(BASE_FONT_HEIGHT),
        })
    }
}

impl GlyphFace for TrueTypeFace {
    fn advance(&self) -> u32 {
        let scaled = self.font.as_scaled(self.scale);
        scaled.h_advance(self.font.glyph_id('0')).ceil() as u32
    }

    fn ascent(&self) -> u32 {
        self.font.as_scaled(self.scale).ascent().ceil() as u32
    }

    fn draw(&self, canvas: &mut RgbaImage, x: i32, baseline: i32, color: Rgba<u8>, text: &str) {
        let top = baseline - self.ascent() as i32;
        draw_text_mut(canvas, color, x, top, self.scale, &self.font, text);
    }
}
