//! Frame annotation: detection boxes, labels, and the per-frame info band.
//!
//! All drawing happens directly on the frame's RGB buffer with a built-in
//! 5x7 bitmap font, so annotated output is byte-for-byte deterministic for a
//! given frame and detection set.

use image::{Rgb, RgbImage};
use pvision_models::{Detection, DetectionSet};

use crate::frame::Frame;

/// Height in pixels of the translucent info band at the top of each frame.
pub const INFO_BAND_HEIGHT: u32 = 80;

/// Outline thickness for detection boxes.
const BOX_THICKNESS: u32 = 2;

/// Padding around label text inside its background strip.
const LABEL_PADDING: i32 = 3;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SCALE: u32 = 2;
/// Horizontal advance per character, including inter-glyph spacing.
const GLYPH_ADVANCE: u32 = (GLYPH_WIDTH + 1) * GLYPH_SCALE;
/// Rendered text height.
const TEXT_HEIGHT: u32 = GLYPH_HEIGHT * GLYPH_SCALE;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Box color for a detection class: people green, the ball red, everything
/// else yellow.
pub fn class_color(class_name: &str) -> Rgb<u8> {
    match class_name {
        "person" => Rgb([0, 255, 0]),
        "sports ball" => Rgb([255, 0, 0]),
        _ => Rgb([255, 255, 0]),
    }
}

/// Per-frame numbers rendered into the info band.
#[derive(Debug, Clone, Copy)]
pub struct OverlayInfo {
    /// Index of the frame in input order (skipped frames included).
    pub frame_index: u64,
    pub detection_count: usize,
    /// Detection time for this frame, in seconds.
    pub frame_time: f64,
}

impl OverlayInfo {
    fn fps_text(&self) -> String {
        if self.frame_time > 0.0 {
            format!("FPS: {:.1}", 1.0 / self.frame_time)
        } else {
            "FPS: --".to_string()
        }
    }
}

/// Draw boxes and labels for every detection onto the frame.
pub fn annotate(frame: &mut Frame, detections: &DetectionSet) {
    let img = frame.image_mut();
    for det in detections {
        draw_detection(img, det);
    }
}

/// Blend a translucent stats band over the top rows of the frame.
///
/// The band is composited at 70% frame / 30% overlay, matching the look of
/// an alpha-blended black strip with white text.
pub fn draw_info_band(frame: &mut Frame, info: &OverlayInfo) {
    let width = frame.width();
    let band_height = INFO_BAND_HEIGHT.min(frame.height());
    if width == 0 || band_height == 0 {
        return;
    }

    let mut overlay = frame.image().clone();
    fill_rect(&mut overlay, 0, 0, width as i32, band_height as i32, BLACK);
    draw_text(
        &mut overlay,
        &format!("Frame: {}", info.frame_index),
        10,
        20,
        WHITE,
        None,
    );
    draw_text(
        &mut overlay,
        &format!("Detections: {}", info.detection_count),
        10,
        45,
        WHITE,
        None,
    );
    draw_text(
        &mut overlay,
        &format!("Process Time: {:.3}s", info.frame_time),
        250,
        20,
        WHITE,
        None,
    );
    draw_text(&mut overlay, &info.fps_text(), 250, 45, WHITE, None);

    // The overlay matches the frame outside the band, so only band rows
    // change under blending.
    let img = frame.image_mut();
    for y in 0..band_height {
        for x in 0..width {
            let a = img.get_pixel(x, y);
            let b = overlay.get_pixel(x, y);
            img.put_pixel(
                x,
                y,
                Rgb([
                    blend_channel(a[0], b[0]),
                    blend_channel(a[1], b[1]),
                    blend_channel(a[2], b[2]),
                ]),
            );
        }
    }
}

/// Integer 70/30 blend of one channel. Exact for equal inputs, so blending
/// identical pixels is a no-op.
#[inline]
fn blend_channel(frame: u8, overlay: u8) -> u8 {
    ((frame as u16 * 7 + overlay as u16 * 3) / 10) as u8
}

fn draw_detection(img: &mut RgbImage, det: &Detection) {
    let color = class_color(&det.class_name);
    let x1 = det.bbox.x1 as i32;
    let y1 = det.bbox.y1 as i32;
    let x2 = det.bbox.x2 as i32;
    let y2 = det.bbox.y2 as i32;

    draw_rect(img, x1, y1, x2, y2, color, BOX_THICKNESS);

    let label = det.label();
    let (label_width, label_height) = text_size(&label);
    let top = (y1 - label_height as i32 - 2 * LABEL_PADDING).max(0);
    fill_rect(
        img,
        x1,
        top,
        x1 + label_width as i32 + 2 * LABEL_PADDING,
        y1,
        color,
    );
    draw_text(img, &label, x1 + LABEL_PADDING, y1 - LABEL_PADDING, WHITE, None);
}

/// Pixel size of rendered text.
pub fn text_size(text: &str) -> (u32, u32) {
    let chars = text.chars().count() as u32;
    let width = (chars * GLYPH_ADVANCE).saturating_sub(GLYPH_SCALE);
    (width, TEXT_HEIGHT)
}

/// Render text with its baseline at `y`, left edge at `x`. An optional
/// background fills the text extent first. Pixels outside the image clip.
pub fn draw_text(
    img: &mut RgbImage,
    text: &str,
    x: i32,
    y: i32,
    fg: Rgb<u8>,
    bg: Option<Rgb<u8>>,
) {
    let top = y - TEXT_HEIGHT as i32;
    if let Some(bg) = bg {
        let (w, h) = text_size(text);
        fill_rect(img, x, top, x + w as i32, top + h as i32, bg);
    }

    let mut pen_x = x;
    for ch in text.chars() {
        let rows = glyph(ch);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                    let px = pen_x + (col * GLYPH_SCALE) as i32;
                    let py = top + (row as u32 * GLYPH_SCALE) as i32;
                    fill_block(img, px, py, GLYPH_SCALE, fg);
                }
            }
        }
        pen_x += GLYPH_ADVANCE as i32;
    }
}

/// Stroke the border of the half-open rectangle `[x1, x2) x [y1, y2)`.
pub fn draw_rect(img: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgb<u8>, thickness: u32) {
    for t in 0..thickness as i32 {
        let (left, top) = (x1 + t, y1 + t);
        let (right, bottom) = (x2 - 1 - t, y2 - 1 - t);
        if left > right || top > bottom {
            break;
        }
        for x in left..=right {
            put_pixel_clipped(img, x, top, color);
            put_pixel_clipped(img, x, bottom, color);
        }
        for y in top..=bottom {
            put_pixel_clipped(img, left, y, color);
            put_pixel_clipped(img, right, y, color);
        }
    }
}

/// Fill the half-open rectangle `[x1, x2) x [y1, y2)`, clipped to the image.
pub fn fill_rect(img: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgb<u8>) {
    let left = x1.max(0) as u32;
    let top = y1.max(0) as u32;
    let right = (x2.max(0) as u32).min(img.width());
    let bottom = (y2.max(0) as u32).min(img.height());
    for y in top..bottom {
        for x in left..right {
            img.put_pixel(x, y, color);
        }
    }
}

fn fill_block(img: &mut RgbImage, x: i32, y: i32, size: u32, color: Rgb<u8>) {
    for dy in 0..size as i32 {
        for dx in 0..size as i32 {
            put_pixel_clipped(img, x + dx, y + dy, color);
        }
    }
}

#[inline]
fn put_pixel_clipped(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// 5x7 glyph bitmaps, one 5-bit row per byte, most significant bit leftmost.
/// Unknown characters render as a filled block.
fn glyph(c: char) -> [u8; 7] {
    match c {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        'a' => [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F],
        'b' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x1E],
        'c' => [0x00, 0x00, 0x0E, 0x10, 0x10, 0x11, 0x0E],
        'd' => [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        'f' => [0x06, 0x09, 0x08, 0x1C, 0x08, 0x08, 0x08],
        'g' => [0x00, 0x0F, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'h' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x11],
        'i' => [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E],
        'j' => [0x02, 0x00, 0x06, 0x02, 0x02, 0x12, 0x0C],
        'k' => [0x10, 0x10, 0x12, 0x14, 0x18, 0x14, 0x12],
        'l' => [0x0C, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'm' => [0x00, 0x00, 0x1A, 0x15, 0x15, 0x11, 0x11],
        'n' => [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11],
        'o' => [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E],
        'p' => [0x00, 0x00, 0x1E, 0x11, 0x1E, 0x10, 0x10],
        'q' => [0x00, 0x00, 0x0D, 0x13, 0x0F, 0x01, 0x01],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        's' => [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E],
        't' => [0x08, 0x08, 0x1C, 0x08, 0x08, 0x09, 0x06],
        'u' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D],
        'v' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'w' => [0x00, 0x00, 0x11, 0x11, 0x15, 0x15, 0x0A],
        'x' => [0x00, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11],
        'y' => [0x00, 0x00, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'z' => [0x00, 0x00, 0x1F, 0x02, 0x04, 0x08, 0x1F],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        _ => [0x1F, 0x1F, 0x1F, 0x1F, 0x1F, 0x1F, 0x1F],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvision_models::BBox;

    fn solid_frame(width: u32, height: u32, value: u8) -> Frame {
        let img = RgbImage::from_pixel(width, height, Rgb([value, value, value]));
        Frame::from_image(img)
    }

    #[test]
    fn test_class_colors() {
        assert_eq!(class_color("person"), Rgb([0, 255, 0]));
        assert_eq!(class_color("sports ball"), Rgb([255, 0, 0]));
        assert_eq!(class_color("skateboard"), Rgb([255, 255, 0]));
        assert_eq!(class_color("surfboard"), Rgb([255, 255, 0]));
    }

    #[test]
    fn test_fps_text() {
        let timed = OverlayInfo {
            frame_index: 1,
            detection_count: 0,
            frame_time: 0.025,
        };
        assert_eq!(timed.fps_text(), "FPS: 40.0");

        let untimed = OverlayInfo {
            frame_index: 1,
            detection_count: 0,
            frame_time: 0.0,
        };
        assert_eq!(untimed.fps_text(), "FPS: --");
    }

    #[test]
    fn test_text_size() {
        let (w, h) = text_size("ab");
        assert_eq!(w, 2 * GLYPH_ADVANCE - GLYPH_SCALE);
        assert_eq!(h, TEXT_HEIGHT);
        assert_eq!(text_size("").0, 0);
    }

    #[test]
    fn test_band_blends_only_top_rows() {
        let mut frame = solid_frame(400, 200, 100);
        let info = OverlayInfo {
            frame_index: 1,
            detection_count: 0,
            frame_time: 0.0,
        };
        draw_info_band(&mut frame, &info);

        // Inside the band, away from any text: 70% of 100 over black.
        assert_eq!(*frame.image().get_pixel(50, 60), Rgb([70, 70, 70]));
        // Below the band: untouched.
        assert_eq!(*frame.image().get_pixel(50, 90), Rgb([100, 100, 100]));
    }

    #[test]
    fn test_band_text_pixels_blend_toward_white() {
        let mut frame = solid_frame(400, 200, 100);
        let info = OverlayInfo {
            frame_index: 1,
            detection_count: 0,
            frame_time: 0.0,
        };
        draw_info_band(&mut frame, &info);

        // "Frame: 1" starts at x=10 with baseline y=20; the top row of the
        // leading 'F' sits at y=6. Blend of 100 under white is 146.
        assert_eq!(*frame.image().get_pixel(10, 6), Rgb([146, 146, 146]));
    }

    #[test]
    fn test_band_is_deterministic() {
        let info = OverlayInfo {
            frame_index: 42,
            detection_count: 3,
            frame_time: 0.0315,
        };
        let mut first = solid_frame(320, 240, 100);
        let mut second = solid_frame(320, 240, 100);
        draw_info_band(&mut first, &info);
        draw_info_band(&mut second, &info);
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn test_band_on_short_frame_does_not_panic() {
        let mut frame = solid_frame(64, 40, 100);
        let info = OverlayInfo {
            frame_index: 0,
            detection_count: 0,
            frame_time: 0.0,
        };
        draw_info_band(&mut frame, &info);
        assert_eq!(frame.height(), 40);
    }

    #[test]
    fn test_annotate_draws_box_edges() {
        let mut frame = solid_frame(64, 64, 0);
        let det = pvision_models::Detection::new(0, "person", 0.9, BBox::new(8.0, 30.0, 40.0, 60.0));
        annotate(&mut frame, &vec![det].into());

        // Left edge of the outline is green, interior stays black.
        assert_eq!(*frame.image().get_pixel(8, 45), Rgb([0, 255, 0]));
        assert_eq!(*frame.image().get_pixel(9, 45), Rgb([0, 255, 0]));
        assert_eq!(*frame.image().get_pixel(20, 45), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_annotate_label_strip_above_box() {
        let mut frame = solid_frame(200, 100, 0);
        let det = pvision_models::Detection::new(0, "person", 0.9, BBox::new(8.0, 50.0, 80.0, 90.0));
        annotate(&mut frame, &vec![det].into());

        // The label background fills the rows just above y1.
        assert_eq!(*frame.image().get_pixel(9, 48), Rgb([0, 255, 0]));
        // Rows well above the strip are untouched.
        assert_eq!(*frame.image().get_pixel(9, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_annotate_empty_set_leaves_frame_unchanged() {
        let mut frame = solid_frame(64, 64, 100);
        let before = frame.as_raw().to_vec();
        annotate(&mut frame, &pvision_models::DetectionSet::empty());
        assert_eq!(frame.as_raw(), &before[..]);
    }

    #[test]
    fn test_fill_rect_clips_to_image() {
        let mut img = RgbImage::new(10, 10);
        fill_rect(&mut img, -5, -5, 20, 20, Rgb([1, 2, 3]));
        assert_eq!(*img.get_pixel(0, 0), Rgb([1, 2, 3]));
        assert_eq!(*img.get_pixel(9, 9), Rgb([1, 2, 3]));
    }
}
