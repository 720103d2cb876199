//! Page render pipeline.
//!
//! Pages can be larger than the panel and device memory is small, so the
//! 1-bpp path streams the payload row by row instead of decoding a whole
//! page. The display only accepts tightly packed images, which forces the
//! split into a byte-aligned main region and an 8-pixel tail strip for the
//! rightmost fractional bits.

use alloc::vec::Vec;

use embedded_io::{Read, Seek};

use crate::bits;
use crate::display::{Color, Display};
use crate::error::AppError;
use crate::xtc::{Reader, PAGE_HEADER_SIZE};

/// Chunk size used when streaming page payloads.
pub const STREAM_CHUNK: usize = 2048;

/// Grow-on-demand byte buffer shared by all renders. Many pages in a book
/// share a size, so the buffer is kept at its high-water mark and never
/// shrunk.
#[derive(Default)]
pub struct Scratch {
    buf: Vec<u8>,
}

impl Scratch {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn get(&mut self, len: usize) -> &mut [u8] {
        if self.buf.len() < len {
            self.buf.resize(len, 0);
        }
        &mut self.buf[..len]
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

/// Per-book reading state owned by the shell.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadingState {
    pub page_count: u16,
    pub page: u16,
    /// Set when `page` was restored from the position store and has not yet
    /// been validated against the container.
    pub restore_pending: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderedPage {
    pub width: u16,
    pub height: u16,
    /// The page covered the panel exactly; chrome overlays should stay off.
    pub exact_fit: bool,
}

/// Renders the current page of `state` from `stream` to `display`.
pub fn render_page<S, D>(
    state: &mut ReadingState,
    stream: &mut S,
    display: &mut D,
    scratch: &mut Scratch,
) -> Result<RenderedPage, AppError>
where
    S: Read + Seek,
    D: Display,
{
    let mut reader = Reader::open(stream)?;
    state.page_count = reader.page_count();
    if state.page >= state.page_count {
        state.page = state.page_count - 1;
    }
    state.restore_pending = false;

    let screen_w = display.width();
    let screen_h = display.height();

    let (entry, header, payload_size) = reader.page_info(state.page)?;
    if header.width != entry.width || header.height != entry.height {
        return Err(AppError::InvalidPageHeader);
    }
    let w = entry.width as u32;
    let h = entry.height as u32;
    let exact_fit = w == screen_w && h == screen_h;

    if reader.bit_depth() == 2 {
        // XTH pages arrive panel-ready; hand the whole blob to the host.
        let blob_size = PAGE_HEADER_SIZE + payload_size;
        let blob = scratch.get(blob_size);
        reader.read_exact_at(entry.data_offset, blob)?;
        if !exact_fit {
            display.fill_screen(Color::WHITE);
        }
        display.push_xth_centered(blob);
    } else if w % 8 == 0 && w <= screen_w && h <= screen_h {
        // Byte-aligned pages that fit the panel go straight from the file
        // to the display.
        let buf = scratch.get(payload_size);
        reader.read_exact_at(entry.data_offset + PAGE_HEADER_SIZE as u64, buf)?;
        if !exact_fit {
            display.fill_screen(Color::WHITE);
        }
        let x0 = (screen_w as i32 - w as i32) / 2;
        let y0 = (screen_h as i32 - h as i32) / 2;
        display.push_1bpp(x0, y0, w, h, buf, [Color::BLACK, Color::WHITE]);
    } else {
        render_xtg_cropped(&mut reader, state.page, display, scratch, w, h, exact_fit)?;
    }

    Ok(RenderedPage {
        width: entry.width,
        height: entry.height,
        exact_fit,
    })
}

/// Everything else is streamed row by row, cropped to the visible rectangle
/// and re-packed tightly.
fn render_xtg_cropped<S, D>(
    reader: &mut Reader<'_, S>,
    page: u16,
    display: &mut D,
    scratch: &mut Scratch,
    w: u32,
    h: u32,
    exact_fit: bool,
) -> Result<(), AppError>
where
    S: Read + Seek,
    D: Display,
{
    let screen_w = display.width();
    let screen_h = display.height();
    let x0 = (screen_w as i32 - w as i32) / 2;
    let y0 = (screen_h as i32 - h as i32) / 2;

    let x_vis_start = (-x0).max(0) as u32;
    let x_vis_end = (screen_w as i32 - x0).min(w as i32).max(0) as u32;
    let y_vis_start = (-y0).max(0) as u32;
    let y_vis_end = (screen_h as i32 - y0).min(h as i32).max(0) as u32;
    if x_vis_end <= x_vis_start || y_vis_end <= y_vis_start {
        display.fill_screen(Color::WHITE);
        return Ok(());
    }
    let vis_w = x_vis_end - x_vis_start;
    let vis_h = y_vis_end - y_vis_start;
    let main_w = vis_w & !7;
    let tail_w = vis_w - main_w;

    let row_bytes = (w as usize).div_ceil(8);
    let main_row_bytes = (main_w / 8) as usize;
    let main_len = main_row_bytes * vis_h as usize;
    let tail_len = if tail_w > 0 { vis_h as usize } else { 0 };

    let buf = scratch.get(STREAM_CHUNK + row_bytes + main_len + tail_len);
    let (chunk, rest) = buf.split_at_mut(STREAM_CHUNK);
    let (row, rest) = rest.split_at_mut(row_bytes);
    let (main, tail) = rest.split_at_mut(main_len);
    main.fill(0xFF);
    tail.fill(0xFF);

    let mut row_fill = 0usize;
    let mut rows_done = 0u32;
    reader.stream_page(page, chunk, |mut data, _offset| {
        while !data.is_empty() {
            let take = (row_bytes - row_fill).min(data.len());
            row[row_fill..row_fill + take].copy_from_slice(&data[..take]);
            row_fill += take;
            data = &data[take..];
            if row_fill < row_bytes {
                continue;
            }
            row_fill = 0;
            let r = rows_done;
            rows_done += 1;
            if r < y_vis_start || r >= y_vis_end {
                continue;
            }
            let vis_row = (r - y_vis_start) as usize;
            if main_row_bytes > 0 {
                let out = &mut main[vis_row * main_row_bytes..(vis_row + 1) * main_row_bytes];
                if x_vis_start % 8 == 0 {
                    let start = (x_vis_start / 8) as usize;
                    out.copy_from_slice(&row[start..start + main_row_bytes]);
                } else {
                    bits::crop_row_1bpp_msb(out, row, x_vis_start as usize, main_w as usize);
                }
            }
            if tail_w > 0 {
                bits::crop_row_1bpp_msb(
                    &mut tail[vis_row..vis_row + 1],
                    row,
                    (x_vis_start + main_w) as usize,
                    tail_w as usize,
                );
            }
        }
    })?;
    if rows_done != h || row_fill != 0 {
        return Err(AppError::InvalidPageHeader);
    }

    if !exact_fit {
        display.fill_screen(Color::WHITE);
    }
    let dst_x = x0.max(0);
    let dst_y = y0.max(0);
    if main_w > 0 {
        display.push_1bpp(dst_x, dst_y, main_w, vis_h, main, [Color::BLACK, Color::WHITE]);
    }
    if tail_w > 0 {
        display.push_1bpp(
            dst_x + main_w as i32,
            dst_y,
            8,
            vis_h,
            tail,
            [Color::BLACK, Color::WHITE],
        );
    }
    Ok(())
}
