//! Book library.
//!
//! Startup prefers the on-disk catalog because probing every container on
//! an SD card is slow. A scan walks the books directory, probes each file
//! through the container reader for its page count and metadata, and then
//! rewrites the catalog so the next start is fast again. Progress is always
//! recomputed from the reading-position store; the catalog's stored value
//! is only a fallback for display before positions exist.

use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

use embedded_io::Read as _;

use crate::catalog;
use crate::error::AppError;
use crate::fs::{Directory as _, File as _, Filesystem, FsError, Mode, MAX_PATH};
use crate::nvs::Nvs;
use crate::positions;
use crate::strbuf::StrBuf;
use crate::xtc;

pub const BOOKS_DIR: &str = "/sdcard/books";
pub const CATALOG_DIR: &str = "/sdcard/portal/.xtcreader";
pub const CATALOG_PATH: &str = "/sdcard/portal/.xtcreader/catalog.bin";
pub const MAX_BOOKS: usize = 128;

const CATALOG_MAX_BYTES: usize = catalog::HEADER_SIZE + MAX_BOOKS * catalog::RECORD_SIZE;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookEntry {
    pub filename: StrBuf<255>,
    pub title: StrBuf<95>,
    pub author: StrBuf<63>,
    pub page_count: u16,
    pub progress: u8,
}

#[derive(Default, Debug)]
pub struct Library {
    pub entries: heapless::Vec<BookEntry, MAX_BOOKS>,
    /// More candidate files existed than the entry array holds.
    pub overflowed: bool,
}

/// Loads the library: catalog fast path if present and valid, full
/// directory scan otherwise.
pub fn load_books<F, N>(fs: &mut F, nvs: &mut N) -> Result<Library, AppError>
where
    F: Filesystem,
    N: Nvs,
{
    if !fs.is_mounted() {
        fs.mount()?;
    }
    if let Some(library) = try_load_catalog(fs, nvs) {
        return Ok(library);
    }
    scan_books(fs, nvs)
}

/// Drops the catalog and rescans the books directory.
pub fn refresh_books<F, N>(fs: &mut F, nvs: &mut N) -> Result<Library, AppError>
where
    F: Filesystem,
    N: Nvs,
{
    if !fs.is_mounted() {
        fs.mount()?;
    }
    match fs.remove(CATALOG_PATH) {
        Ok(()) | Err(FsError::NotFound) => {}
        Err(err) => log::warn!("catalog delete failed: {err}"),
    }
    scan_books(fs, nvs)
}

/// `min(100, saved * 100 / (page_count - 1))`, or 0 without a saved
/// position or with a single-page book.
pub fn compute_progress(saved: Option<u32>, page_count: u16) -> u8 {
    match saved {
        Some(page) if page_count >= 2 => {
            let pct = page as u64 * 100 / (page_count as u64 - 1);
            pct.min(100) as u8
        }
        _ => 0,
    }
}

pub fn is_book_name(name: &[u8]) -> bool {
    if name.first() == Some(&b'.') {
        return false;
    }
    ends_with_ci(name, b".xtc") || ends_with_ci(name, b".xtch")
}

pub fn book_path(name: &str) -> Result<heapless::String<MAX_PATH>, AppError> {
    let mut path = heapless::String::new();
    path.push_str(BOOKS_DIR).map_err(|_| AppError::PathTooLong)?;
    path.push('/').map_err(|_| AppError::PathTooLong)?;
    path.push_str(name).map_err(|_| AppError::PathTooLong)?;
    Ok(path)
}

fn try_load_catalog<F, N>(fs: &mut F, nvs: &mut N) -> Option<Library>
where
    F: Filesystem,
    N: Nvs,
{
    let mut file = fs.open(CATALOG_PATH, Mode::Read).ok()?;
    let size = file.size() as usize;
    if size < catalog::HEADER_SIZE || size > CATALOG_MAX_BYTES {
        return None;
    }
    let mut bytes = vec![0u8; size];
    file.read_exact(&mut bytes).ok()?;

    let mut records: Vec<catalog::Record> = Vec::new();
    records.resize_with(MAX_BOOKS, Default::default);
    let count = match catalog::decode(&bytes, &mut records) {
        Ok(count) => count,
        Err(err) => {
            log::warn!("catalog rejected: {err:?}");
            return None;
        }
    };

    let mut library = Library::default();
    for record in &records[..count] {
        let mut entry = BookEntry {
            filename: record.filename.clone(),
            title: record.title.clone(),
            author: record.author.clone(),
            page_count: record.page_count,
            progress: record.progress,
        };
        finish_entry(&mut entry, nvs);
        let _ = library.entries.push(entry);
    }
    sort_entries(&mut library);
    Some(library)
}

fn scan_books<F, N>(fs: &mut F, nvs: &mut N) -> Result<Library, AppError>
where
    F: Filesystem,
    N: Nvs,
{
    let mut names: Vec<StrBuf<255>> = Vec::new();
    {
        let mut dir = fs.open_dir(BOOKS_DIR)?;
        while let Some(entry) = dir.next_entry()? {
            if entry.is_dir || !is_book_name(entry.name.as_bytes()) {
                continue;
            }
            names.push(entry.name);
        }
    }

    let mut library = Library::default();
    for name in &names {
        if library.entries.is_full() {
            library.overflowed = true;
            log::warn!("book list full, ignoring remaining files");
            break;
        }
        let mut entry = probe_book(fs, name);
        finish_entry(&mut entry, nvs);
        let _ = library.entries.push(entry);
    }
    sort_entries(&mut library);

    write_catalog(fs, &library);
    Ok(library)
}

/// Opens one container to pull its page count and metadata. Any failure
/// degrades to a filename-only entry; a broken file must not break the
/// whole list.
fn probe_book<F: Filesystem>(fs: &mut F, name: &StrBuf<255>) -> BookEntry {
    let mut entry = BookEntry {
        filename: name.clone(),
        ..BookEntry::default()
    };
    let probe = (|| -> Result<(), AppError> {
        let path = book_path(name.as_str())?;
        let mut file = fs.open(path.as_str(), Mode::Read)?;
        let mut reader = xtc::Reader::open(&mut file)?;
        entry.page_count = reader.page_count();
        let meta = reader.read_metadata()?;
        entry.title.set(meta.title.as_bytes());
        entry.author.set(meta.author.as_bytes());
        Ok(())
    })();
    if let Err(err) = probe {
        log::warn!("probe failed for {}: {err}", name.as_str());
    }
    entry
}

fn finish_entry<N: Nvs>(entry: &mut BookEntry, nvs: &mut N) {
    if entry.title.is_empty() {
        entry.title.set(entry.filename.as_bytes());
    }
    let saved = positions::load(nvs, entry.filename.as_str());
    entry.progress = compute_progress(saved, entry.page_count);
}

fn sort_entries(library: &mut Library) {
    library.entries.sort_unstable_by(|a, b| {
        cmp_ci(a.author.as_bytes(), b.author.as_bytes())
            .then_with(|| cmp_ci(a.title.as_bytes(), b.title.as_bytes()))
            .then_with(|| cmp_ci(a.filename.as_bytes(), b.filename.as_bytes()))
    });
}

fn write_catalog<F: Filesystem>(fs: &mut F, library: &Library) {
    let mut records: Vec<catalog::Record> = Vec::with_capacity(library.entries.len());
    for entry in library.entries.iter() {
        records.push(catalog::Record {
            title: entry.title.clone(),
            author: entry.author.clone(),
            page_count: entry.page_count,
            progress: entry.progress,
            tags: heapless::Vec::new(),
            filename: entry.filename.clone(),
        });
    }
    let mut bytes = vec![0u8; catalog::HEADER_SIZE + records.len() * catalog::RECORD_SIZE];
    let written = catalog::encode(&mut bytes, &records);
    if written == 0 {
        log::warn!("catalog encode produced no output");
        return;
    }

    let result = (|| -> Result<(), FsError> {
        fs.create_dir_all(CATALOG_DIR)?;
        let mut file = fs.open(CATALOG_PATH, Mode::Write)?;
        embedded_io::Write::write_all(&mut file, &bytes[..written])
    })();
    if let Err(err) = result {
        log::warn!("catalog write failed: {err}");
    }
}

fn ends_with_ci(name: &[u8], suffix: &[u8]) -> bool {
    name.len() >= suffix.len()
        && name[name.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

fn cmp_ci(a: &[u8], b: &[u8]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}
