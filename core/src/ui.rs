//! Shared view chrome: list rows, headers, footers, the error screen.
//!
//! Pure drawing over the [`Display`] trait; no state lives here. Geometry
//! constants are shared with tap dispatch so rows hit where they draw.

use alloc::format;

use crate::display::{Color, Display, FontId};
use crate::library::Library;
use crate::strbuf::StrBuf;

pub const HEADER_Y: i32 = 16;
pub const LIST_TOP: i32 = 64;
pub const ROW_HEIGHT: i32 = 56;
pub const MARGIN_X: i32 = 16;
pub const FOOTER_H: i32 = 28;

/// A chapter row shown in the table of contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChapterEntry {
    pub name: StrBuf<80>,
    pub start_page: u16,
    pub end_page: u16,
}

pub fn rows_per_page(screen_h: u32) -> usize {
    ((screen_h as i32 - LIST_TOP - FOOTER_H) / ROW_HEIGHT).max(1) as usize
}

/// Maps a tap's y coordinate to a visible row index.
pub fn row_at(y: i32, screen_h: u32) -> Option<usize> {
    if y < LIST_TOP {
        return None;
    }
    let row = ((y - LIST_TOP) / ROW_HEIGHT) as usize;
    (row < rows_per_page(screen_h)).then_some(row)
}

fn draw_header(display: &mut impl Display, title: &str) {
    display.draw_text(MARGIN_X, HEADER_Y, title, FontId::Title, Color::BLACK, Color::WHITE);
    display.draw_hline(0, LIST_TOP - 8, display.width(), Color::BLACK);
}

fn draw_right_aligned(display: &mut impl Display, y: i32, text: &str, font: FontId) {
    let w = display.text_width(text, font);
    let x = display.width() as i32 - MARGIN_X - w as i32;
    display.draw_text(x, y, text, font, Color::BLACK, Color::WHITE);
}

pub fn draw_book_list(display: &mut impl Display, library: &Library, cursor: usize) {
    display.fill_screen(Color::WHITE);
    draw_header(display, "Books");

    if library.entries.is_empty() {
        display.draw_text(
            MARGIN_X,
            LIST_TOP + 8,
            "No books in /sdcard/books",
            FontId::Body,
            Color::BLACK,
            Color::WHITE,
        );
        return;
    }

    let rows = rows_per_page(display.height());
    let end = (cursor + rows).min(library.entries.len());
    for (slot, entry) in library.entries[cursor..end].iter().enumerate() {
        let y = LIST_TOP + slot as i32 * ROW_HEIGHT;
        display.draw_text(MARGIN_X, y + 6, entry.title.as_str(), FontId::Body, Color::BLACK, Color::WHITE);
        display.draw_text(MARGIN_X, y + 30, entry.author.as_str(), FontId::Small, Color::BLACK, Color::WHITE);
        if entry.progress > 0 {
            draw_right_aligned(display, y + 30, &format!("{}%", entry.progress), FontId::Small);
        }
        display.draw_hline(0, y + ROW_HEIGHT - 1, display.width(), Color::BLACK);
    }

    let total_pages = library.entries.len().div_ceil(rows).max(1);
    let current = cursor / rows + 1;
    let footer_y = display.height() as i32 - FOOTER_H + 4;
    draw_right_aligned(display, footer_y, &format!("{current}/{total_pages}"), FontId::Small);
    if library.overflowed {
        display.draw_text(MARGIN_X, footer_y, "list truncated", FontId::Small, Color::BLACK, Color::WHITE);
    }
}

pub fn draw_toc(
    display: &mut impl Display,
    book_title: &str,
    chapters: &[ChapterEntry],
    current: usize,
    cursor: usize,
) {
    display.fill_screen(Color::WHITE);
    draw_header(display, book_title);

    if chapters.is_empty() {
        display.draw_text(
            MARGIN_X,
            LIST_TOP + 8,
            "No table of contents",
            FontId::Body,
            Color::BLACK,
            Color::WHITE,
        );
        return;
    }

    let rows = rows_per_page(display.height());
    let end = (cursor + rows).min(chapters.len());
    for (slot, chapter) in chapters[cursor..end].iter().enumerate() {
        let index = cursor + slot;
        let y = LIST_TOP + slot as i32 * ROW_HEIGHT;
        if index == current {
            display.draw_text(2, y + 6, ">", FontId::Body, Color::BLACK, Color::WHITE);
        }
        display.draw_text(MARGIN_X, y + 6, chapter.name.as_str(), FontId::Body, Color::BLACK, Color::WHITE);
        draw_right_aligned(
            display,
            y + 6,
            &format!("{}", chapter.start_page + 1),
            FontId::Small,
        );
        display.draw_hline(0, y + ROW_HEIGHT - 1, display.width(), Color::BLACK);
    }
}

pub fn draw_error(display: &mut impl Display, message: &str) {
    display.fill_screen(Color::WHITE);
    let mid = display.height() as i32 / 2;
    display.draw_text(MARGIN_X, mid - 40, "Error", FontId::Title, Color::BLACK, Color::WHITE);
    display.draw_text(MARGIN_X, mid, message, FontId::Body, Color::BLACK, Color::WHITE);
    display.draw_text(
        MARGIN_X,
        mid + 32,
        "Tap anywhere to rescan books",
        FontId::Small,
        Color::BLACK,
        Color::WHITE,
    );
}

/// The `current/total` footer in the reading view.
pub fn draw_page_footer(display: &mut impl Display, page: u16, page_count: u16) {
    let footer_y = display.height() as i32 - FOOTER_H + 4;
    draw_right_aligned(
        display,
        footer_y,
        &format!("{}/{page_count}", page as u32 + 1),
        FontId::Small,
    );
}
