//! Test doubles shared by the unit tests: an in-memory stream, a synthetic
//! container builder, and mock implementations of the filesystem, NVS and
//! display seams. The display mock records every draw call so tests can
//! assert on exactly what would reach the panel.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

use embedded_io_adapters::std::FromStd;

use crate::display::{Color, Display, FontId};
use crate::fs::{DirEntry, Directory, File, Filesystem, FsError, Mode};
use crate::nvs::{Nvs, NvsError, NvsMode, NvsNamespace};
use crate::strbuf::StrBuf;
use crate::xtc::{XTCH_MAGIC, XTC_MAGIC, XTG_MAGIC, XTH_MAGIC};

pub fn mem_stream(bytes: Vec<u8>) -> FromStd<Cursor<Vec<u8>>> {
    FromStd::new(Cursor::new(bytes))
}

// ---------------------------------------------------------------------------
// Synthetic containers

pub struct PageSpec {
    pub width: u16,
    pub height: u16,
    pub payload: Vec<u8>,
    pub magic: Option<u32>,
    pub color_mode: u8,
    pub compression: u8,
    pub data_size: Option<u32>,
}

impl PageSpec {
    /// A 1-bpp page with an all-white payload of the natural size.
    pub fn xtg(width: u16, height: u16) -> Self {
        let payload = vec![0xFF; (width as usize).div_ceil(8) * height as usize];
        Self::with_payload(width, height, payload)
    }

    /// A 2-bpp page; the payload is both planes concatenated.
    pub fn xth(width: u16, height: u16, planes: Vec<u8>) -> Self {
        Self::with_payload(width, height, planes)
    }

    pub fn with_payload(width: u16, height: u16, payload: Vec<u8>) -> Self {
        Self {
            width,
            height,
            payload,
            magic: None,
            color_mode: 0,
            compression: 0,
            data_size: None,
        }
    }
}

pub struct ContainerBuilder {
    magic: u32,
    version: (u8, u8),
    pages: Vec<PageSpec>,
    metadata: Option<(String, String)>,
    chapters: Vec<(Vec<u8>, u16, u16)>,
    page_count_override: Option<u16>,
    page_table_offset_override: Option<u64>,
}

impl ContainerBuilder {
    pub fn xtc() -> Self {
        Self::new(XTC_MAGIC)
    }

    pub fn xtch() -> Self {
        Self::new(XTCH_MAGIC)
    }

    fn new(magic: u32) -> Self {
        Self {
            magic,
            version: (1, 0),
            pages: Vec::new(),
            metadata: None,
            chapters: Vec::new(),
            page_count_override: None,
            page_table_offset_override: None,
        }
    }

    pub fn version(mut self, major: u8, minor: u8) -> Self {
        self.version = (major, minor);
        self
    }

    pub fn page(mut self, page: PageSpec) -> Self {
        self.pages.push(page);
        self
    }

    pub fn metadata(mut self, title: &str, author: &str) -> Self {
        self.metadata = Some((title.to_string(), author.to_string()));
        self
    }

    pub fn chapter(mut self, name: &str, start_1based: u16, end_1based: u16) -> Self {
        self.chapters
            .push((name.as_bytes().to_vec(), start_1based, end_1based));
        self
    }

    /// Appends an all-zero terminator record at this point in the chapter
    /// list.
    pub fn chapter_terminator(mut self) -> Self {
        self.chapters.push((Vec::new(), 0, 0));
        self
    }

    pub fn page_count_override(mut self, count: u16) -> Self {
        self.page_count_override = Some(count);
        self
    }

    pub fn page_table_offset_override(mut self, offset: u64) -> Self {
        self.page_table_offset_override = Some(offset);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let meta_len: usize = if self.metadata.is_some() { 128 + 64 } else { 0 };
        let chapter_len = self.chapters.len() * 96;
        let has_chapters = !self.chapters.is_empty();
        let chapter_offset: u32 = if has_chapters { (56 + meta_len) as u32 } else { 0 };
        let page_table_offset = (56 + meta_len + chapter_len) as u64;
        let data_offset = page_table_offset + self.pages.len() as u64 * 16;

        let mut out = Vec::new();
        out.extend_from_slice(&self.magic.to_le_bytes());
        out.push(self.version.0);
        out.push(self.version.1);
        let page_count = self
            .page_count_override
            .unwrap_or(self.pages.len() as u16);
        out.extend_from_slice(&page_count.to_le_bytes());
        out.push(0); // read_direction
        out.push(u8::from(self.metadata.is_some()));
        out.push(0); // has_thumbnails
        out.push(u8::from(has_chapters));
        out.extend_from_slice(&0u32.to_le_bytes()); // current_page
        let metadata_offset: u64 = if self.metadata.is_some() { 0x38 } else { 0 };
        out.extend_from_slice(&metadata_offset.to_le_bytes());
        let pto = self.page_table_offset_override.unwrap_or(page_table_offset);
        out.extend_from_slice(&pto.to_le_bytes());
        out.extend_from_slice(&data_offset.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes()); // thumb_offset
        out.extend_from_slice(&chapter_offset.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        assert_eq!(out.len(), 56);

        if let Some((title, author)) = &self.metadata {
            let mut slot = [0u8; 128];
            let n = title.len().min(127);
            slot[..n].copy_from_slice(&title.as_bytes()[..n]);
            out.extend_from_slice(&slot);
            let mut slot = [0u8; 64];
            let n = author.len().min(63);
            slot[..n].copy_from_slice(&author.as_bytes()[..n]);
            out.extend_from_slice(&slot);
        }

        for (name, start, end) in &self.chapters {
            let mut record = [0u8; 96];
            let n = name.len().min(79);
            record[..n].copy_from_slice(&name[..n]);
            record[0x50..0x52].copy_from_slice(&start.to_le_bytes());
            record[0x52..0x54].copy_from_slice(&end.to_le_bytes());
            out.extend_from_slice(&record);
        }

        let page_magic_default = if self.magic == XTCH_MAGIC { XTH_MAGIC } else { XTG_MAGIC };
        let mut blob_offset = data_offset;
        for page in &self.pages {
            out.extend_from_slice(&blob_offset.to_le_bytes());
            out.extend_from_slice(&(page.payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&page.width.to_le_bytes());
            out.extend_from_slice(&page.height.to_le_bytes());
            blob_offset += 22 + page.payload.len() as u64;
        }

        for page in &self.pages {
            let magic = page.magic.unwrap_or(page_magic_default);
            out.extend_from_slice(&magic.to_le_bytes());
            out.extend_from_slice(&page.width.to_le_bytes());
            out.extend_from_slice(&page.height.to_le_bytes());
            out.push(page.color_mode);
            out.push(page.compression);
            let data_size = page.data_size.unwrap_or(page.payload.len() as u32);
            out.extend_from_slice(&data_size.to_le_bytes());
            out.extend_from_slice(&0u64.to_le_bytes()); // md5_8
            out.extend_from_slice(&page.payload);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Filesystem

#[derive(Default)]
pub struct MockFilesystem {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeSet<String>,
    pub mounted: bool,
    pub fail_mount: bool,
    pub fail_writes: bool,
}

impl MockFilesystem {
    pub fn mounted() -> Self {
        Self {
            mounted: true,
            ..Self::default()
        }
    }

    pub fn add_file(&mut self, path: &str, data: Vec<u8>) {
        if let Some(idx) = path.rfind('/') {
            self.dirs.insert(path[..idx].to_string());
        }
        self.files.insert(path.to_string(), data);
    }

    pub fn add_dir(&mut self, path: &str) {
        self.dirs.insert(path.to_string());
    }
}

pub struct MockFile<'a> {
    data: &'a mut Vec<u8>,
    pos: u64,
    fail_writes: bool,
}

impl embedded_io::ErrorType for MockFile<'_> {
    type Error = FsError;
}

impl embedded_io::Read for MockFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let pos = self.pos.min(self.data.len() as u64) as usize;
        let n = buf.len().min(self.data.len() - pos);
        buf[..n].copy_from_slice(&self.data[pos..pos + n]);
        self.pos = (pos + n) as u64;
        Ok(n)
    }
}

impl embedded_io::Write for MockFile<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        if self.fail_writes {
            return Err(FsError::Io);
        }
        let pos = self.pos as usize;
        if pos + buf.len() > self.data.len() {
            self.data.resize(pos + buf.len(), 0);
        }
        self.data[pos..pos + buf.len()].copy_from_slice(buf);
        self.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), FsError> {
        Ok(())
    }
}

impl embedded_io::Seek for MockFile<'_> {
    fn seek(&mut self, pos: embedded_io::SeekFrom) -> Result<u64, FsError> {
        let len = self.data.len() as i64;
        let target = match pos {
            embedded_io::SeekFrom::Start(offset) => offset as i64,
            embedded_io::SeekFrom::End(offset) => len + offset,
            embedded_io::SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if target < 0 {
            return Err(FsError::SeekTooLarge);
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

impl File for MockFile<'_> {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

pub struct MockDir {
    entries: Vec<DirEntry>,
    next: usize,
}

impl Directory for MockDir {
    fn next_entry(&mut self) -> Result<Option<DirEntry>, FsError> {
        let entry = self.entries.get(self.next).cloned();
        self.next += 1;
        Ok(entry)
    }
}

impl Filesystem for MockFilesystem {
    type File<'a>
        = MockFile<'a>
    where
        Self: 'a;
    type Dir<'a>
        = MockDir
    where
        Self: 'a;

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn mount(&mut self) -> Result<(), FsError> {
        if self.fail_mount {
            return Err(FsError::NotFound);
        }
        self.mounted = true;
        Ok(())
    }

    fn open(&mut self, path: &str, mode: Mode) -> Result<Self::File<'_>, FsError> {
        if !self.mounted {
            return Err(FsError::NotMounted);
        }
        let fail_writes = self.fail_writes;
        if mode == Mode::Write {
            if fail_writes {
                return Err(FsError::Io);
            }
            self.files.insert(path.to_string(), Vec::new());
        }
        match self.files.get_mut(path) {
            Some(data) => Ok(MockFile {
                data,
                pos: 0,
                fail_writes,
            }),
            None => Err(FsError::NotFound),
        }
    }

    fn open_dir(&mut self, path: &str) -> Result<Self::Dir<'_>, FsError> {
        if !self.mounted {
            return Err(FsError::NotMounted);
        }
        if !self.dirs.contains(path) {
            return Err(FsError::NotFound);
        }
        let prefix = alloc::format!("{path}/");
        let mut entries = Vec::new();
        for name in self.files.keys() {
            if let Some(rest) = name.strip_prefix(&prefix) {
                if !rest.contains('/') {
                    entries.push(DirEntry {
                        name: StrBuf::from_bytes(rest.as_bytes()),
                        is_dir: false,
                    });
                }
            }
        }
        for name in self.dirs.iter() {
            if let Some(rest) = name.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    entries.push(DirEntry {
                        name: StrBuf::from_bytes(rest.as_bytes()),
                        is_dir: true,
                    });
                }
            }
        }
        Ok(MockDir { entries, next: 0 })
    }

    fn remove(&mut self, path: &str) -> Result<(), FsError> {
        if self.files.remove(path).is_none() {
            return Err(FsError::NotFound);
        }
        Ok(())
    }

    fn create_dir_all(&mut self, path: &str) -> Result<(), FsError> {
        let mut built = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            built.push('/');
            built.push_str(part);
            self.dirs.insert(built.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NVS

#[derive(Default)]
pub struct MockNvs {
    pub values: BTreeMap<(String, String), u32>,
    pub commits: usize,
    pub fail_open: bool,
    pub fail_write: bool,
}

pub struct MockNamespace<'a> {
    store: &'a mut MockNvs,
    namespace: String,
    writable: bool,
}

impl NvsNamespace for MockNamespace<'_> {
    fn get_u32(&mut self, key: &str) -> Result<Option<u32>, NvsError> {
        Ok(self
            .store
            .values
            .get(&(self.namespace.clone(), key.to_string()))
            .copied())
    }

    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), NvsError> {
        if !self.writable || self.store.fail_write {
            return Err(NvsError::WriteFailed);
        }
        self.store
            .values
            .insert((self.namespace.clone(), key.to_string()), value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), NvsError> {
        self.store.commits += 1;
        Ok(())
    }
}

impl Nvs for MockNvs {
    type Namespace<'a>
        = MockNamespace<'a>
    where
        Self: 'a;

    fn open(&mut self, namespace: &str, mode: NvsMode) -> Result<Self::Namespace<'_>, NvsError> {
        if self.fail_open {
            return Err(NvsError::OpenFailed);
        }
        Ok(MockNamespace {
            namespace: namespace.to_string(),
            writable: mode == NvsMode::ReadWrite,
            store: self,
        })
    }
}

// ---------------------------------------------------------------------------
// Display

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    FillScreen(Color),
    HLine { x: i32, y: i32, w: u32, color: Color },
    VLine { x: i32, y: i32, h: u32, color: Color },
    FillRect { x: i32, y: i32, w: u32, h: u32, color: Color },
    DrawRect { x: i32, y: i32, w: u32, h: u32, color: Color },
    Push1bpp { x: i32, y: i32, w: u32, h: u32, bits: Vec<u8>, palette: [Color; 2] },
    PushXth { blob: Vec<u8> },
    Text { x: i32, y: i32, text: String, font: FontId },
    Present,
}

pub struct MockDisplay {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<DrawOp>,
}

impl MockDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn pushes_1bpp(&self) -> Vec<&DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Push1bpp { .. }))
            .collect()
    }

    pub fn fill_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::FillScreen(_)))
            .count()
    }
}

impl Display for MockDisplay {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_screen(&mut self, color: Color) {
        self.ops.push(DrawOp::FillScreen(color));
    }

    fn draw_hline(&mut self, x: i32, y: i32, w: u32, color: Color) {
        self.ops.push(DrawOp::HLine { x, y, w, color });
    }

    fn draw_vline(&mut self, x: i32, y: i32, h: u32, color: Color) {
        self.ops.push(DrawOp::VLine { x, y, h, color });
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        self.ops.push(DrawOp::FillRect { x, y, w, h, color });
    }

    fn draw_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        self.ops.push(DrawOp::DrawRect { x, y, w, h, color });
    }

    fn push_1bpp(&mut self, x: i32, y: i32, w: u32, h: u32, bits: &[u8], palette: [Color; 2]) {
        self.ops.push(DrawOp::Push1bpp {
            x,
            y,
            w,
            h,
            bits: bits.to_vec(),
            palette,
        });
    }

    fn push_xth_centered(&mut self, blob: &[u8]) {
        self.ops.push(DrawOp::PushXth { blob: blob.to_vec() });
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: FontId, _fg: Color, _bg: Color) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            font,
        });
    }

    fn text_width(&mut self, text: &str, _font: FontId) -> u32 {
        text.len() as u32 * 8
    }

    fn present(&mut self) {
        self.ops.push(DrawOp::Present);
    }
}

/// Decodes a whole XTH blob (page header + two planes) into row-major 8-bit
/// luma, the way the panel interprets it: the first plane holds the high
/// bit, the second the low bit, plane bits are addressed by
/// `bit_linear = (w - 1 - x) * h + y`, and the two bits select one of four
/// gray levels.
pub fn decode_xth_blob(blob: &[u8]) -> (u16, u16, Vec<u8>) {
    assert!(blob.len() >= 22);
    let w = u16::from_le_bytes([blob[4], blob[5]]);
    let h = u16::from_le_bytes([blob[6], blob[7]]);
    let plane = (w as usize * h as usize).div_ceil(8);
    assert!(blob.len() >= 22 + 2 * plane);
    let msb = &blob[22..22 + plane];
    let lsb = &blob[22 + plane..22 + 2 * plane];

    let mut pixels = vec![0u8; w as usize * h as usize];
    for y in 0..h as usize {
        for x in 0..w as usize {
            let bit_linear = (w as usize - 1 - x) * h as usize + y;
            let byte = bit_linear / 8;
            let bit = 7 - (bit_linear % 8);
            let hi = (msb[byte] >> bit) & 0x01;
            let lo = (lsb[byte] >> bit) & 0x01;
            pixels[y * w as usize + x] = match (hi << 1) | lo {
                0 => 255,
                1 => 85,
                2 => 170,
                _ => 0,
            };
        }
    }
    (w, h, pixels)
}
