// Watermark compositing - text and image watermarks blended over a source image
pub mod compositor;
pub mod font;
pub mod position;
mod types;

pub use compositor::{composite, composite_with_face};
pub use font::{BitmapFace, GlyphFace, TrueTypeFace};
pub use types::{DEFAULT_TEXT, MAX_FONT_SIZE, Position, RgbaColor, WatermarkKind, WatermarkSpec};
