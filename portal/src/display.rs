//! Host-backed display.

use xtc_core::display::{Color, Display, FontId};

use crate::host;

pub struct HostDisplay {
    width: u32,
    height: u32,
}

impl HostDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

fn font_id(font: FontId) -> i32 {
    match font {
        FontId::Small => 0,
        FontId::Body => 1,
        FontId::Title => 2,
    }
}

impl Display for HostDisplay {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_screen(&mut self, color: Color) {
        unsafe { host::display_fill(color.0 as i32) }
    }

    fn draw_hline(&mut self, x: i32, y: i32, w: u32, color: Color) {
        unsafe { host::display_hline(x, y, w as i32, color.0 as i32) }
    }

    fn draw_vline(&mut self, x: i32, y: i32, h: u32, color: Color) {
        unsafe { host::display_vline(x, y, h as i32, color.0 as i32) }
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        unsafe { host::display_fill_rect(x, y, w as i32, h as i32, color.0 as i32) }
    }

    fn draw_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        unsafe { host::display_draw_rect(x, y, w as i32, h as i32, color.0 as i32) }
    }

    fn push_1bpp(&mut self, x: i32, y: i32, w: u32, h: u32, bits: &[u8], palette: [Color; 2]) {
        unsafe {
            host::display_push_1bpp(
                x,
                y,
                w as i32,
                h as i32,
                bits.as_ptr(),
                bits.len() as i32,
                palette[0].0 as i32,
                palette[1].0 as i32,
            )
        }
    }

    fn push_xth_centered(&mut self, blob: &[u8]) {
        let rc = unsafe { host::display_push_xth(blob.as_ptr(), blob.len() as i32) };
        if rc < 0 {
            log::warn!("host rejected XTH blob ({rc})");
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: FontId, fg: Color, bg: Color) {
        unsafe {
            host::display_text(
                x,
                y,
                text.as_ptr(),
                text.len() as i32,
                font_id(font),
                fg.0 as i32,
                bg.0 as i32,
            )
        }
    }

    fn text_width(&mut self, text: &str, font: FontId) -> u32 {
        let w = unsafe { host::display_text_width(text.as_ptr(), text.len() as i32, font_id(font)) };
        w.max(0) as u32
    }

    fn present(&mut self) {
        unsafe { host::display_update() }
    }
}
