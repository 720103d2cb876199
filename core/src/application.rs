//! Application shell.
//!
//! One `State`, one pending-tap slot, one grow-on-demand scratch. The host
//! drives the shell through `init`, `tick` and `on_tap`; a tick dispatches
//! at most one tap and performs at most one redraw, so no call blocks the
//! host for longer than a single page render.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::display::Display;
use crate::error::AppError;
use crate::fs::{Filesystem, Mode};
use crate::input::{tap_region, Tap, TapRegion};
use crate::library::{self, Library};
use crate::nvs::Nvs;
use crate::positions;
use crate::render::{self, ReadingState, Scratch};
use crate::strbuf::StrBuf;
use crate::ui::{self, ChapterEntry};
use crate::xtc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    BookList,
    Toc,
    Reading,
    Error,
}

pub struct State {
    pub screen: Screen,
    pub library: Library,
    /// Index into `library.entries` of the open book.
    pub selected: usize,
    /// First visible row of the book list.
    pub list_cursor: usize,
    pub current_book: Option<StrBuf<255>>,
    pub reading: ReadingState,
    pub chapters: Vec<ChapterEntry>,
    pub toc_cursor: usize,
    pub pending_tap: Option<Tap>,
    pub needs_redraw: bool,
    pub error_message: Option<String>,
}

impl State {
    fn new() -> Self {
        Self {
            screen: Screen::BookList,
            library: Library::default(),
            selected: 0,
            list_cursor: 0,
            current_book: None,
            reading: ReadingState::default(),
            chapters: Vec::new(),
            toc_cursor: 0,
            pending_tap: None,
            needs_redraw: true,
            error_message: None,
        }
    }
}

pub struct App<F: Filesystem, N: Nvs> {
    fs: F,
    nvs: N,
    state: State,
    scratch: Scratch,
}

impl<F: Filesystem, N: Nvs> App<F, N> {
    pub fn new(fs: F, nvs: N) -> Self {
        Self {
            fs,
            nvs,
            state: State::new(),
            scratch: Scratch::new(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Mounts storage and loads the library. Failures land on the error
    /// screen rather than failing initialisation.
    pub fn init(&mut self) {
        if !self.fs.is_mounted() {
            if let Err(err) = self.fs.mount() {
                self.set_error("SD mount", err.into());
                return;
            }
        }
        self.reload_books(false);
    }

    /// Records a tap; it is acted on at the next tick.
    pub fn on_tap(&mut self, tap: Tap) {
        self.state.pending_tap = Some(tap);
    }

    /// One cooperative tick: dispatch a pending tap, then redraw if needed.
    pub fn tick<D: Display>(&mut self, display: &mut D) {
        if let Some(tap) = self.state.pending_tap.take() {
            self.dispatch_tap(tap, display.width(), display.height());
        }
        if self.state.needs_redraw {
            self.draw(display);
        }
    }

    fn reload_books(&mut self, rescan: bool) {
        let result = if rescan {
            library::refresh_books(&mut self.fs, &mut self.nvs)
        } else {
            library::load_books(&mut self.fs, &mut self.nvs)
        };
        match result {
            Ok(library) => {
                self.state.library = library;
                self.state.screen = Screen::BookList;
                self.state.list_cursor = 0;
                self.state.error_message = None;
                self.state.needs_redraw = true;
            }
            Err(err) => self.set_error("Books", err),
        }
    }

    fn dispatch_tap(&mut self, tap: Tap, screen_w: u32, screen_h: u32) {
        match self.state.screen {
            Screen::BookList => self.tap_book_list(tap, screen_w, screen_h),
            Screen::Toc => self.tap_toc(tap, screen_w, screen_h),
            Screen::Reading => self.tap_reading(tap, screen_w, screen_h),
            Screen::Error => self.reload_books(true),
        }
    }

    fn tap_book_list(&mut self, tap: Tap, screen_w: u32, screen_h: u32) {
        let rows = ui::rows_per_page(screen_h);
        match tap_region(tap.x, screen_w) {
            TapRegion::Left => {
                if self.state.list_cursor > 0 {
                    self.state.list_cursor = self.state.list_cursor.saturating_sub(rows);
                    self.state.needs_redraw = true;
                }
            }
            TapRegion::Right => {
                if self.state.list_cursor + rows < self.state.library.entries.len() {
                    self.state.list_cursor += rows;
                    self.state.needs_redraw = true;
                }
            }
            TapRegion::Centre => {
                if let Some(row) = ui::row_at(tap.y, screen_h) {
                    let index = self.state.list_cursor + row;
                    if index < self.state.library.entries.len() {
                        self.open_book(index);
                    }
                }
            }
        }
    }

    fn tap_toc(&mut self, tap: Tap, screen_w: u32, screen_h: u32) {
        match tap_region(tap.x, screen_w) {
            TapRegion::Left => {
                self.state.screen = Screen::BookList;
                self.state.needs_redraw = true;
            }
            TapRegion::Right => {
                self.state.screen = Screen::Reading;
                self.state.needs_redraw = true;
            }
            TapRegion::Centre => {
                if let Some(row) = ui::row_at(tap.y, screen_h) {
                    let index = self.state.toc_cursor + row;
                    if let Some(chapter) = self.state.chapters.get(index) {
                        let page = chapter.start_page;
                        self.state.screen = Screen::Reading;
                        self.go_to_page(page);
                    }
                }
            }
        }
    }

    fn tap_reading(&mut self, tap: Tap, screen_w: u32, screen_h: u32) {
        match tap_region(tap.x, screen_w) {
            TapRegion::Left => {
                if self.state.reading.page > 0 {
                    let page = self.state.reading.page - 1;
                    self.go_to_page(page);
                }
            }
            TapRegion::Right => {
                if self.state.reading.page + 1 < self.state.reading.page_count {
                    let page = self.state.reading.page + 1;
                    self.go_to_page(page);
                }
            }
            TapRegion::Centre => self.enter_toc(ui::rows_per_page(screen_h)),
        }
    }

    fn open_book(&mut self, index: usize) {
        let entry = &self.state.library.entries[index];
        let filename = entry.filename.clone();
        let saved = positions::load(&mut self.nvs, filename.as_str());
        self.state.selected = index;
        self.state.reading = ReadingState {
            page_count: entry.page_count,
            page: saved.unwrap_or(0).min(u16::MAX as u32) as u16,
            restore_pending: saved.is_some(),
        };
        self.state.current_book = Some(filename);
        self.state.chapters.clear();
        self.state.screen = Screen::Reading;
        self.state.needs_redraw = true;
    }

    /// Every page change persists the position before the next redraw, so a
    /// crash right after a page turn resumes on the page being shown.
    fn go_to_page(&mut self, page: u16) {
        self.state.reading.page = page;
        if let Some(name) = &self.state.current_book {
            positions::store(&mut self.nvs, name.as_str(), page as u32);
        }
        self.state.needs_redraw = true;
    }

    fn enter_toc(&mut self, rows: usize) {
        let Some(name) = self.state.current_book.clone() else {
            return;
        };
        let result = (|| -> Result<Vec<ChapterEntry>, AppError> {
            let path = library::book_path(name.as_str())?;
            let mut file = self.fs.open(path.as_str(), Mode::Read)?;
            let mut reader = xtc::Reader::open(&mut file)?;
            let mut chapters = Vec::new();
            reader.for_each_chapter(|chapter| {
                chapters.push(ChapterEntry {
                    name: StrBuf::from_bytes(chapter.name),
                    start_page: chapter.start_page,
                    end_page: chapter.end_page,
                });
            })?;
            Ok(chapters)
        })();
        match result {
            Ok(chapters) => {
                self.state.chapters = chapters;
                let current = self.current_chapter();
                self.state.toc_cursor = (current / rows.max(1)) * rows.max(1);
                self.state.screen = Screen::Toc;
                self.state.needs_redraw = true;
            }
            Err(err) => self.set_error("TOC", err),
        }
    }

    /// Index of the chapter containing the current page.
    fn current_chapter(&self) -> usize {
        let page = self.state.reading.page;
        let mut current = 0;
        for (index, chapter) in self.state.chapters.iter().enumerate() {
            if chapter.start_page <= page {
                current = index;
            } else {
                break;
            }
        }
        current
    }

    fn set_error(&mut self, prefix: &str, err: AppError) {
        log::warn!("{prefix}: {err}");
        self.state.error_message = Some(format!("{prefix}: {err}"));
        self.state.screen = Screen::Error;
        self.state.needs_redraw = true;
    }

    fn draw<D: Display>(&mut self, display: &mut D) {
        self.state.needs_redraw = false;
        let (prefix, result) = match self.state.screen {
            Screen::BookList => {
                ui::draw_book_list(display, &self.state.library, self.state.list_cursor);
                display.present();
                return;
            }
            Screen::Toc => ("TOC", self.draw_toc_view(display)),
            Screen::Reading => ("Page", self.draw_reading(display)),
            Screen::Error => {
                let message = self.state.error_message.as_deref().unwrap_or("unknown");
                ui::draw_error(display, message);
                display.present();
                return;
            }
        };
        if let Err(err) = result {
            self.set_error(prefix, err);
            let message = self.state.error_message.as_deref().unwrap_or("unknown");
            ui::draw_error(display, message);
            display.present();
            self.state.needs_redraw = false;
        }
    }

    fn draw_toc_view<D: Display>(&mut self, display: &mut D) -> Result<(), AppError> {
        let title = self
            .state
            .library
            .entries
            .get(self.state.selected)
            .map(|entry| entry.title.as_str())
            .unwrap_or("Contents");
        ui::draw_toc(
            display,
            title,
            &self.state.chapters,
            self.current_chapter(),
            self.state.toc_cursor,
        );
        display.present();
        Ok(())
    }

    fn draw_reading<D: Display>(&mut self, display: &mut D) -> Result<(), AppError> {
        let Some(name) = self.state.current_book.clone() else {
            return Err(AppError::UnsupportedFormat);
        };
        let path = library::book_path(name.as_str())?;
        let mut file = self.fs.open(path.as_str(), Mode::Read)?;
        let rendered =
            render::render_page(&mut self.state.reading, &mut file, display, &mut self.scratch)?;
        if !rendered.exact_fit {
            ui::draw_page_footer(display, self.state.reading.page, self.state.reading.page_count);
        }
        display.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ContainerBuilder, DrawOp, MockDisplay, MockFilesystem, MockNvs, PageSpec};
    use crate::positions;

    const SCREEN_W: u32 = 540;
    const SCREEN_H: u32 = 960;

    fn book_with_chapters() -> Vec<u8> {
        ContainerBuilder::xtc()
            .metadata("Chaptered", "Author")
            .page(PageSpec::xtg(8, 2))
            .page(PageSpec::xtg(8, 2))
            .page(PageSpec::xtg(8, 2))
            .chapter("One", 1, 2)
            .chapter("Two", 3, 3)
            .build()
    }

    fn app_with_book() -> App<MockFilesystem, MockNvs> {
        let mut fs = MockFilesystem::mounted();
        fs.add_dir(library::BOOKS_DIR);
        fs.add_file("/sdcard/books/story.xtc", book_with_chapters());
        let mut app = App::new(fs, MockNvs::default());
        app.init();
        app
    }

    fn centre_tap_on_row(row: usize) -> Tap {
        Tap {
            x: SCREEN_W as i32 / 2,
            y: ui::LIST_TOP + row as i32 * ui::ROW_HEIGHT + 4,
        }
    }

    #[test]
    fn init_lands_on_book_list() {
        let mut app = app_with_book();
        assert_eq!(app.state.screen, Screen::BookList);
        assert_eq!(app.state.library.entries.len(), 1);

        let mut display = MockDisplay::new(SCREEN_W, SCREEN_H);
        app.tick(&mut display);
        assert!(!app.state.needs_redraw);
        assert!(display.ops.iter().any(|op| matches!(
            op,
            DrawOp::Text { text, .. } if text == "Chaptered"
        )));
        assert!(display.ops.last() == Some(&DrawOp::Present));
    }

    #[test]
    fn centre_tap_opens_book_and_renders() {
        let mut app = app_with_book();
        let mut display = MockDisplay::new(SCREEN_W, SCREEN_H);
        app.tick(&mut display);

        app.on_tap(centre_tap_on_row(0));
        let mut display = MockDisplay::new(SCREEN_W, SCREEN_H);
        app.tick(&mut display);

        assert_eq!(app.state.screen, Screen::Reading);
        assert_eq!(app.state.reading.page, 0);
        assert_eq!(app.state.reading.page_count, 3);
        assert!(!display.pushes_1bpp().is_empty());
        // Letterboxed page gets the page-number footer.
        assert!(display.ops.iter().any(|op| matches!(
            op,
            DrawOp::Text { text, .. } if text == "1/3"
        )));
    }

    #[test]
    fn page_turns_persist_position_before_redraw() {
        let mut app = app_with_book();
        let mut display = MockDisplay::new(SCREEN_W, SCREEN_H);
        app.tick(&mut display);
        app.on_tap(centre_tap_on_row(0));
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));

        // Next page: right third.
        app.on_tap(Tap { x: SCREEN_W as i32 - 10, y: 100 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.reading.page, 1);
        assert_eq!(positions::load(&mut app.nvs, "story.xtc"), Some(1));
        assert!(app.nvs.commits >= 1);

        // Previous page: left third.
        app.on_tap(Tap { x: 10, y: 100 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.reading.page, 0);
        assert_eq!(positions::load(&mut app.nvs, "story.xtc"), Some(0));
    }

    #[test]
    fn page_turn_stops_at_ends() {
        let mut app = app_with_book();
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        app.on_tap(centre_tap_on_row(0));
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));

        app.on_tap(Tap { x: 5, y: 100 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.reading.page, 0);

        for _ in 0..5 {
            app.on_tap(Tap { x: SCREEN_W as i32 - 5, y: 100 });
            app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        }
        assert_eq!(app.state.reading.page, 2);
    }

    #[test]
    fn centre_tap_in_reading_opens_toc_with_chapters() {
        let mut app = app_with_book();
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        app.on_tap(centre_tap_on_row(0));
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));

        app.on_tap(Tap { x: SCREEN_W as i32 / 2, y: 400 });
        let mut display = MockDisplay::new(SCREEN_W, SCREEN_H);
        app.tick(&mut display);

        assert_eq!(app.state.screen, Screen::Toc);
        assert_eq!(app.state.chapters.len(), 2);
        assert_eq!(app.state.chapters[0].name.as_str(), "One");
        assert_eq!(app.state.chapters[0].start_page, 0);
        assert!(display.ops.iter().any(|op| matches!(
            op,
            DrawOp::Text { text, .. } if text == "Two"
        )));
    }

    #[test]
    fn toc_jump_moves_to_chapter_start() {
        let mut app = app_with_book();
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        app.on_tap(centre_tap_on_row(0));
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        app.on_tap(Tap { x: SCREEN_W as i32 / 2, y: 400 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));

        // Second row: chapter "Two" starting at 0-based page 2.
        app.on_tap(centre_tap_on_row(1));
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.screen, Screen::Reading);
        assert_eq!(app.state.reading.page, 2);
        assert_eq!(positions::load(&mut app.nvs, "story.xtc"), Some(2));
    }

    #[test]
    fn toc_left_returns_to_list_and_right_resumes() {
        let mut app = app_with_book();
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        app.on_tap(centre_tap_on_row(0));
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        app.on_tap(Tap { x: SCREEN_W as i32 / 2, y: 400 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));

        app.on_tap(Tap { x: SCREEN_W as i32 - 5, y: 400 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.screen, Screen::Reading);
        assert_eq!(app.state.reading.page, 0);

        app.on_tap(Tap { x: SCREEN_W as i32 / 2, y: 400 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        app.on_tap(Tap { x: 5, y: 400 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.screen, Screen::BookList);
    }

    #[test]
    fn saved_position_is_restored_on_open() {
        let mut app = app_with_book();
        positions::store(&mut app.nvs, "story.xtc", 2);
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        app.on_tap(centre_tap_on_row(0));
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.reading.page, 2);
        assert!(!app.state.reading.restore_pending);
    }

    #[test]
    fn mount_failure_shows_error_screen_with_prefixed_message() {
        let fs = MockFilesystem {
            fail_mount: true,
            ..MockFilesystem::default()
        };
        let mut app = App::new(fs, MockNvs::default());
        app.init();
        assert_eq!(app.state.screen, Screen::Error);
        assert_eq!(app.state.error_message.as_deref(), Some("SD mount: NotFound"));

        let mut display = MockDisplay::new(SCREEN_W, SCREEN_H);
        app.tick(&mut display);
        assert!(display.ops.iter().any(|op| matches!(
            op,
            DrawOp::Text { text, .. } if text == "SD mount: NotFound"
        )));
    }

    #[test]
    fn error_screen_tap_rescans() {
        let fs = MockFilesystem {
            fail_mount: true,
            ..MockFilesystem::default()
        };
        let mut app = App::new(fs, MockNvs::default());
        app.init();
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));

        // Storage comes back before the retry tap.
        app.fs.fail_mount = false;
        app.fs.add_dir(library::BOOKS_DIR);
        app.fs.add_file("/sdcard/books/late.xtc", book_with_chapters());

        app.on_tap(Tap { x: 10, y: 10 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.screen, Screen::BookList);
        assert_eq!(app.state.library.entries.len(), 1);
    }

    #[test]
    fn render_failure_lands_on_error_screen() {
        let mut app = app_with_book();
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        app.on_tap(centre_tap_on_row(0));
        // Corrupt the book between open and draw.
        app.fs.files.insert("/sdcard/books/story.xtc".into(), b"zap".to_vec());
        let mut display = MockDisplay::new(SCREEN_W, SCREEN_H);
        app.tick(&mut display);

        assert_eq!(app.state.screen, Screen::Error);
        assert_eq!(app.state.error_message.as_deref(), Some("Page: EndOfStream"));
        assert!(display.ops.iter().any(|op| matches!(
            op,
            DrawOp::Text { text, .. } if text == "Page: EndOfStream"
        )));
    }

    #[test]
    fn list_pagination_via_side_taps() {
        let mut fs = MockFilesystem::mounted();
        fs.add_dir(library::BOOKS_DIR);
        let bytes = ContainerBuilder::xtc().page(PageSpec::xtg(8, 1)).build();
        for i in 0..20 {
            fs.add_file(&format!("/sdcard/books/book{i:02}.xtc"), bytes.clone());
        }
        let mut app = App::new(fs, MockNvs::default());
        app.init();
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));

        let rows = ui::rows_per_page(SCREEN_H);
        app.on_tap(Tap { x: SCREEN_W as i32 - 5, y: 100 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.list_cursor, rows);

        // Already on the last list page; a further right tap is a no-op.
        app.on_tap(Tap { x: SCREEN_W as i32 - 5, y: 100 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.list_cursor, rows);

        app.on_tap(Tap { x: 5, y: 100 });
        app.tick(&mut MockDisplay::new(SCREEN_W, SCREEN_H));
        assert_eq!(app.state.list_cursor, 0);
    }

    #[test]
    fn pending_tap_slot_keeps_latest_tap() {
        let mut app = app_with_book();
        app.on_tap(Tap { x: 1, y: 1 });
        app.on_tap(Tap { x: 2, y: 2 });
        assert_eq!(app.state.pending_tap, Some(Tap { x: 2, y: 2 }));
    }
}
