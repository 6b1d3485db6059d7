//! Slide geometry in EMU (English Metric Units)

/// Length in EMU, the unit every DrawingML offset and extent uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Emu(pub i64);

/// Position and size of a shape on a slide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub left: Emu,
    pub top: Emu,
    pub width: Emu,
    pub height: Emu,
}

impl Frame {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left: Emu(left),
            top: Emu(top),
            width: Emu(width),
            height: Emu(height),
        }
    }
}

/// Place an image across the full width of `frame`, centred vertically
///
/// The height follows the image aspect ratio, so a wide chart in a tall
/// placeholder leaves equal gaps above and below it. A tall image may
/// overflow the frame; only the width is binding.
pub fn fit_width(frame: &Frame, image_width: u32, image_height: u32) -> Frame {
    if image_width == 0 {
        return *frame;
    }
    let width = frame.width.0;
    let height = (width as i128 * image_height as i128 / image_width as i128) as i64;
    let top = frame.top.0 + (frame.height.0 - height).div_euclid(2);

    Frame::new(frame.left.0, top, width, height)
}

/// Scale an image to fit inside `frame` with its aspect ratio kept, centred
pub fn fit_within(frame: &Frame, image_width: u32, image_height: u32) -> Frame {
    if image_width == 0 || image_height == 0 {
        return *frame;
    }
    let scale = f64::min(
        frame.width.0 as f64 / image_width as f64,
        frame.height.0 as f64 / image_height as f64,
    );
    let width = (image_width as f64 * scale) as i64;
    let height = (image_height as f64 * scale) as i64;

    Frame::new(
        frame.left.0 + (frame.width.0 - width).div_euclid(2),
        frame.top.0 + (frame.height.0 - height).div_euclid(2),
        width,
        height,
    )
}
