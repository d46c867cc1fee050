use super::types::Position;

/// Distance kept between the watermark and the canvas edge
pub const MARGIN: i32 = 10;

/// Anchor for a text watermark.
///
/// The returned `y` is the text baseline, i.e. the bottom edge of the drawn glyph
/// raster. Vertically centered anchors use the canvas midpoint regardless of the
/// text height.
pub fn text_anchor(
    canvas: (u32, u32),
    text_box: (u32, u32),
    position: Position,
) -> (i32, i32) {
    let (cw, ch) = (canvas.0 as i32, canvas.1 as i32);
    let (bw, bh) = (text_box.0 as i32, text_box.1 as i32);

    let x = horizontal(cw, bw, position);
    let y = match position {
        Position::TopLeft | Position::TopCenter | Position::TopRight => MARGIN + bh,
        Position::CenterLeft | Position::Center | Position::CenterRight => ch / 2,
        Position::BottomLeft | Position::BottomCenter | Position::BottomRight => ch - MARGIN,
    };

    (x, y)
}

/// Anchor for an image watermark. The returned `y` is the top edge of the image.
pub fn image_anchor(
    canvas: (u32, u32),
    image_box: (u32, u32),
    position: Position,
) -> (i32, i32) {
    let (cw, ch) = (canvas.0 as i32, canvas.1 as i32);
    let (bw, bh) = (image_box.0 as i32, image_box.1 as i32);

    let x = horizontal(cw, bw, position);
    let y = match position {
        Position::TopLeft | Position::TopCenter | Position::TopRight => MARGIN,
        Position::CenterLeft | Position::Center | Position::CenterRight => (ch - bh) / 2,
        Position::BottomLeft | Position::BottomCenter | Position::BottomRight => ch - bh - MARGIN,
    };

    (x, y)
}

fn horizontal(cw: i32, bw: i32, position: Position) -> i32 {
    match position {
        Position::TopLeft | Position::CenterLeft | Position::BottomLeft => MARGIN,
        Position::TopCenter | Position::Center | Position::BottomCenter => (cw - bw) / 2,
        Position::TopRight | Position::CenterRight | Position::BottomRight => cw - bw - MARGIN,
    }
}
