//! Status overlay rendering
//!
//! Draws one `StatusData` sample into an RGBA `VideoFrame` using the
//! built-in bitmap font. The layout is laid out for 640×480 and scales
//! with the frame height.

pub mod font;
pub mod format;

use crate::domain::{LocationPrecision, StatusData, VideoFrame};

use font::GLYPH_WIDTH;
use format::*;

const BACKGROUND: [u8; 4] = [16, 18, 24, 255];
const FOREGROUND: [u8; 4] = [235, 235, 235, 255];
const DIM: [u8; 4] = [150, 150, 160, 255];
const TX_RED: [u8; 4] = [220, 40, 40, 255];
const RX_GREEN: [u8; 4] = [40, 190, 70, 255];

/// Reference height the layout below is expressed in
const BASE_HEIGHT: u32 = 480;

pub struct StatusRenderer {
    precision: LocationPrecision,
}

impl StatusRenderer {
    pub fn new(precision: LocationPrecision) -> Self {
        Self { precision }
    }

    pub fn render(&self, status: &StatusData, frame: &mut VideoFrame) {
        frame.fill(BACKGROUND);
        let unit = (frame.height / BASE_HEIGHT).max(1) as i32;
        let radio = &status.radio;

        draw_text(frame, 24 * unit, 24 * unit, 3 * unit, &radio.rig, DIM);
        draw_text(frame, 24 * unit, 80 * unit, 6 * unit, &format_freq(radio.freq), FOREGROUND);
        draw_text(frame, 24 * unit, 150 * unit, 4 * unit, format_mode(radio.mode), FOREGROUND);
        draw_text(frame, 360 * unit, 150 * unit, 4 * unit, &format_power(radio.power), FOREGROUND);

        let (label, color) = if radio.tx {
            ("TX", TX_RED)
        } else {
            ("RX", RX_GREEN)
        };
        let (cx, cy) = indicator_center(frame);
        fill_circle(frame, cx, cy, 18 * unit, color);
        draw_text(frame, cx - 90 * unit, cy - 10 * unit, 3 * unit, label, color);

        let utc = format!("{} UTC", format_utc(&status.timestamp));
        draw_text(frame, 24 * unit, 220 * unit, 3 * unit, &utc, FOREGROUND);

        let qth = format!("QTH {}", format_qth(&status.location, self.precision));
        draw_text(frame, 24 * unit, 300 * unit, 4 * unit, &qth, FOREGROUND);
        let detail = format_gnss_detail(&status.location, self.precision);
        draw_text(frame, 24 * unit, 360 * unit, 2 * unit, &detail, DIM);
    }
}

/// Center of the TX/RX indicator, top right.
pub fn indicator_center(frame: &VideoFrame) -> (i32, i32) {
    let unit = (frame.height / BASE_HEIGHT).max(1) as i32;
    (frame.width as i32 - 48 * unit, 48 * unit)
}

fn draw_text(frame: &mut VideoFrame, x: i32, y: i32, scale: i32, text: &str, color: [u8; 4]) {
    let advance = (GLYPH_WIDTH as i32 + 1) * scale;
    for (i, c) in text.chars().enumerate() {
        let ox = x + i as i32 * advance;
        for (row, bits) in font::glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) != 0 {
                    fill_rect(
                        frame,
                        ox + col as i32 * scale,
                        y + row as i32 * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
    }
}

fn fill_rect(frame: &mut VideoFrame, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
    for py in y..y + h {
        for px in x..x + w {
            frame.put(px, py, color);
        }
    }
}

fn fill_circle(frame: &mut VideoFrame, cx: i32, cy: i32, r: i32, color: [u8; 4]) {
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                frame.put(cx + dx, cy + dy, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LocationState, Mode, OperatingState};

    fn status(tx: bool) -> StatusData {
        let radio = OperatingState::new("Yaesu FT-891", 14_250_000, Mode::Usb, tx, 40);
        StatusData::new(radio, LocationState::default())
    }

    #[test]
    fn tx_indicator_is_red() {
        let mut frame = VideoFrame::new(640, 480);
        StatusRenderer::new(LocationPrecision::FullLocation).render(&status(true), &mut frame);
        let (cx, cy) = indicator_center(&frame);
        assert_eq!(frame.pixel(cx as u32, cy as u32), TX_RED);
    }

    #[test]
    fn rx_indicator_is_green() {
        let mut frame = VideoFrame::new(640, 480);
        StatusRenderer::new(LocationPrecision::FullLocation).render(&status(false), &mut frame);
        let (cx, cy) = indicator_center(&frame);
        assert_eq!(frame.pixel(cx as u32, cy as u32), RX_GREEN);
    }

    #[test]
    fn text_is_drawn_over_background() {
        let mut frame = VideoFrame::new(640, 480);
        StatusRenderer::new(LocationPrecision::FullLocation).render(&status(false), &mut frame);
        let lit = frame
            .pixels
            .chunks_exact(4)
            .filter(|px| *px == FOREGROUND)
            .count();
        assert!(lit > 1000, "only {lit} foreground pixels");
        assert_eq!(frame.pixel(0, 479), BACKGROUND);
    }

    #[test]
    fn small_frames_do_not_panic() {
        let mut frame = VideoFrame::new(64, 48);
        StatusRenderer::new(LocationPrecision::LocatorSquare).render(&status(true), &mut frame);
        assert_eq!(frame.pixels.len(), 64 * 48 * 4);
    }

    #[test]
    fn overlay_text_has_glyphs() {
        let s = status(false);
        let texts = [
            format_freq(s.radio.freq),
            format_utc(&s.timestamp),
            "Acquiring…".to_string(),
            "GNSS location disabled".to_string(),
            "15/30 0.12346N 50.12346E ±16.6m".to_string(),
            s.radio.rig.clone(),
        ];
        for text in texts {
            assert!(text.chars().all(font::has_glyph), "{text}");
        }
    }
}
