use std::fs;
use std::path::Path;

use embedded_io_adapters::std::FromStd;
use image::GrayImage;
use thiserror::Error;
use xtc_core::xtc::{self, Reader, PAGE_HEADER_SIZE, XTCH_MAGIC, XTG_MAGIC};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("container error: {0}")]
    Container(xtc::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("{0}")]
    Invalid(String),
}

impl From<xtc::Error> for CliError {
    fn from(err: xtc::Error) -> Self {
        CliError::Container(err)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterSpec {
    pub name: String,
    pub start_1based: u16,
    pub end_1based: u16,
}

/// `NAME@START` or `NAME@START-END`, pages 1-based.
pub fn parse_chapter_spec(raw: &str) -> Result<ChapterSpec, CliError> {
    let (name, range) = raw
        .rsplit_once('@')
        .ok_or_else(|| CliError::Invalid(format!("chapter spec missing '@': {raw}")))?;
    if name.is_empty() {
        return Err(CliError::Invalid(format!("chapter name is empty: {raw}")));
    }
    let (start, end) = match range.split_once('-') {
        Some((start, end)) => (start, end),
        None => (range, range),
    };
    let start: u16 = start
        .parse()
        .map_err(|_| CliError::Invalid(format!("bad chapter start page: {raw}")))?;
    let end: u16 = end
        .parse()
        .map_err(|_| CliError::Invalid(format!("bad chapter end page: {raw}")))?;
    if start == 0 || end < start {
        return Err(CliError::Invalid(format!("bad chapter range: {raw}")));
    }
    Ok(ChapterSpec {
        name: name.to_string(),
        start_1based: start,
        end_1based: end,
    })
}

#[derive(Clone, Debug, Default)]
pub struct PackOptions {
    pub title: Option<String>,
    pub author: Option<String>,
    pub chapters: Vec<ChapterSpec>,
}

pub struct PackedPage {
    pub width: u16,
    pub height: u16,
    pub bits: Vec<u8>,
}

fn open_stream(path: &Path) -> Result<FromStd<fs::File>, CliError> {
    Ok(FromStd::new(fs::File::open(path)?))
}

pub fn info(path: &Path) -> Result<(), CliError> {
    let mut stream = open_stream(path)?;
    let mut reader = Reader::open(&mut stream)?;
    let header = reader.header().clone();

    let kind = if header.magic == XTCH_MAGIC { "XTCH (2-bpp)" } else { "XTC (1-bpp)" };
    println!("{}: {kind}", path.display());
    println!("  version        {}.{}", header.version_major, header.version_minor);
    println!("  pages          {}", header.page_count);
    println!("  read direction {}", header.read_direction);
    println!(
        "  sections       metadata={} thumbnails={} chapters={}",
        header.has_metadata, header.has_thumbnails, header.has_chapters
    );
    println!("  page table     0x{:x}", header.page_table_offset);
    println!("  data           0x{:x}", header.data_offset);
    if header.has_chapters {
        println!("  chapters       0x{:x}", header.chapter_offset);
    }

    let meta = reader.read_metadata()?;
    if !meta.title.is_empty() {
        println!("  title          {}", meta.title);
    }
    if !meta.author.is_empty() {
        println!("  author         {}", meta.author);
    }

    for index in 0..header.page_count {
        let (entry, _, payload) = reader.page_info(index)?;
        println!(
            "  page {index:4}     {}x{} ({payload} bytes at 0x{:x})",
            entry.width, entry.height, entry.data_offset
        );
    }
    Ok(())
}

pub fn toc(path: &Path) -> Result<(), CliError> {
    let mut stream = open_stream(path)?;
    let mut reader = Reader::open(&mut stream)?;
    let mut count = 0usize;
    reader.for_each_chapter(|chapter| {
        count += 1;
        let name = String::from_utf8_lossy(chapter.name);
        println!(
            "{name}: pages {}..{}",
            chapter.start_page + 1,
            chapter.end_page + 1
        );
    })?;
    if count == 0 {
        println!("no chapters");
    }
    Ok(())
}

pub fn unpack(path: &Path, out_dir: &Path) -> Result<(), CliError> {
    let mut stream = open_stream(path)?;
    let mut reader = Reader::open(&mut stream)?;
    fs::create_dir_all(out_dir)?;

    let extension = if reader.bit_depth() == 2 { "xth" } else { "xtg" };
    for index in 0..reader.page_count() {
        let (_, header, payload_size) = reader.page_info(index)?;
        let mut payload = vec![0u8; payload_size];
        reader.load_page(index, &mut payload)?;

        let mut blob = Vec::with_capacity(PAGE_HEADER_SIZE + payload_size);
        blob.extend_from_slice(&header.magic.to_le_bytes());
        blob.extend_from_slice(&header.width.to_le_bytes());
        blob.extend_from_slice(&header.height.to_le_bytes());
        blob.push(header.color_mode);
        blob.push(header.compression);
        blob.extend_from_slice(&header.data_size.to_le_bytes());
        blob.extend_from_slice(&header.md5_8.to_le_bytes());
        blob.extend_from_slice(&payload);

        let name = format!("page_{index:04}.{extension}");
        fs::write(out_dir.join(&name), blob)?;
        log::info!("wrote {name} ({payload_size} bytes)");
    }
    Ok(())
}

pub fn pack(output: &Path, inputs: &[String], options: &PackOptions) -> Result<(), CliError> {
    let mut pages = Vec::with_capacity(inputs.len());
    for input in inputs {
        let img = image::open(input)?.to_luma8();
        let page = dither_page(&img);
        log::info!("{input}: {}x{}", page.width, page.height);
        pages.push(page);
    }
    let bytes = build_container(&pages, options)?;
    fs::write(output, &bytes)?;
    log::info!("wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

/// Bayer 4x4 ordered dither to MSB-first 1-bpp rows, 0 = black.
pub fn dither_page(img: &GrayImage) -> PackedPage {
    const BAYER: [[u8; 4]; 4] = [
        [0, 8, 2, 10],
        [12, 4, 14, 6],
        [3, 11, 1, 9],
        [15, 7, 13, 5],
    ];
    let width = img.width().min(u16::MAX as u32) as u16;
    let height = img.height().min(u16::MAX as u32) as u16;
    let row_bytes = (width as usize).div_ceil(8);
    let mut bits = vec![0u8; row_bytes * height as usize];
    for y in 0..height as u32 {
        for x in 0..width as u32 {
            let lum = img.get_pixel(x, y).0[0];
            let threshold = BAYER[(y & 3) as usize][(x & 3) as usize] * 16 + 8;
            if lum >= threshold {
                let idx = y as usize * row_bytes * 8 + x as usize;
                bits[idx / 8] |= 1 << (7 - (idx % 8));
            }
        }
    }
    PackedPage { width, height, bits }
}

/// Serialises a 1-bpp XTC container.
pub fn build_container(pages: &[PackedPage], options: &PackOptions) -> Result<Vec<u8>, CliError> {
    if pages.is_empty() {
        return Err(CliError::Invalid("need at least one page".into()));
    }
    if pages.len() > u16::MAX as usize {
        return Err(CliError::Invalid("too many pages".into()));
    }
    for page in pages {
        let expected = (page.width as usize).div_ceil(8) * page.height as usize;
        if page.bits.len() != expected {
            return Err(CliError::Invalid("page bitmap size mismatch".into()));
        }
    }

    let has_metadata = options.title.is_some() || options.author.is_some();
    let meta_len: usize = if has_metadata { 128 + 64 } else { 0 };
    let has_chapters = !options.chapters.is_empty();
    // Chapter records plus one all-zero terminator.
    let chapter_len = if has_chapters { (options.chapters.len() + 1) * 96 } else { 0 };
    let chapter_offset: u32 = if has_chapters { (56 + meta_len) as u32 } else { 0 };
    let page_table_offset = (56 + meta_len + chapter_len) as u64;
    let data_offset = page_table_offset + pages.len() as u64 * 16;

    let mut out = Vec::new();
    out.extend_from_slice(&xtc::XTC_MAGIC.to_le_bytes());
    out.push(1); // version_major
    out.push(0); // version_minor
    out.extend_from_slice(&(pages.len() as u16).to_le_bytes());
    out.push(0); // read_direction
    out.push(u8::from(has_metadata));
    out.push(0); // has_thumbnails
    out.push(u8::from(has_chapters));
    out.extend_from_slice(&0u32.to_le_bytes()); // current_page
    let metadata_offset: u64 = if has_metadata { 0x38 } else { 0 };
    out.extend_from_slice(&metadata_offset.to_le_bytes());
    out.extend_from_slice(&page_table_offset.to_le_bytes());
    out.extend_from_slice(&data_offset.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes()); // thumb_offset
    out.extend_from_slice(&chapter_offset.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);

    if has_metadata {
        let mut slot = [0u8; 128];
        copy_truncated(&mut slot, options.title.as_deref().unwrap_or(""));
        out.extend_from_slice(&slot);
        let mut slot = [0u8; 64];
        copy_truncated(&mut slot, options.author.as_deref().unwrap_or(""));
        out.extend_from_slice(&slot);
    }

    if has_chapters {
        for chapter in &options.chapters {
            let mut record = [0u8; 96];
            copy_truncated(&mut record[..80], &chapter.name);
            record[0x50..0x52].copy_from_slice(&chapter.start_1based.to_le_bytes());
            record[0x52..0x54].copy_from_slice(&chapter.end_1based.to_le_bytes());
            out.extend_from_slice(&record);
        }
        out.extend_from_slice(&[0u8; 96]);
    }

    let mut blob_offset = data_offset;
    for page in pages {
        out.extend_from_slice(&blob_offset.to_le_bytes());
        out.extend_from_slice(&(page.bits.len() as u32).to_le_bytes());
        out.extend_from_slice(&page.width.to_le_bytes());
        out.extend_from_slice(&page.height.to_le_bytes());
        blob_offset += (PAGE_HEADER_SIZE + page.bits.len()) as u64;
    }

    for page in pages {
        out.extend_from_slice(&XTG_MAGIC.to_le_bytes());
        out.extend_from_slice(&page.width.to_le_bytes());
        out.extend_from_slice(&page.height.to_le_bytes());
        out.push(0); // color_mode
        out.push(0); // compression
        out.extend_from_slice(&(page.bits.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes()); // md5_8, unused by readers
        out.extend_from_slice(&page.bits);
    }
    Ok(out)
}

/// Fills a NUL-padded fixed slot, truncating at one byte short of the slot
/// so a terminator always fits.
fn copy_truncated(slot: &mut [u8], value: &str) {
    let take = value.len().min(slot.len() - 1);
    slot[..take].copy_from_slice(&value.as_bytes()[..take]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn chapter_spec_parsing() {
        assert_eq!(
            parse_chapter_spec("Intro@1").unwrap(),
            ChapterSpec {
                name: "Intro".into(),
                start_1based: 1,
                end_1based: 1
            }
        );
        assert_eq!(
            parse_chapter_spec("Body@2-9").unwrap(),
            ChapterSpec {
                name: "Body".into(),
                start_1based: 2,
                end_1based: 9
            }
        );
        assert_eq!(
            parse_chapter_spec("a@b@3").unwrap().name,
            "a@b",
        );
        assert!(parse_chapter_spec("NoRange").is_err());
        assert!(parse_chapter_spec("@3").is_err());
        assert!(parse_chapter_spec("X@0").is_err());
        assert!(parse_chapter_spec("X@5-2").is_err());
        assert!(parse_chapter_spec("X@abc").is_err());
    }

    #[test]
    fn dither_known_pixels() {
        let img = GrayImage::from_raw(2, 2, vec![0, 255, 128, 64]).unwrap();
        let page = dither_page(&img);
        assert_eq!((page.width, page.height), (2, 2));
        assert_eq!(page.bits, vec![0x40, 0x00]);
    }

    #[test]
    fn packed_container_reads_back() {
        let pages = vec![
            PackedPage {
                width: 16,
                height: 2,
                bits: vec![0xAA; 4],
            },
            PackedPage {
                width: 8,
                height: 1,
                bits: vec![0x0F],
            },
        ];
        let options = PackOptions {
            title: Some("Packed".into()),
            author: Some("xtci".into()),
            chapters: vec![ChapterSpec {
                name: "All".into(),
                start_1based: 1,
                end_1based: 2,
            }],
        };
        let bytes = build_container(&pages, &options).unwrap();

        let mut stream = FromStd::new(Cursor::new(bytes));
        let mut reader = Reader::open(&mut stream).unwrap();
        assert_eq!(reader.page_count(), 2);
        assert_eq!(reader.bit_depth(), 1);

        let meta = reader.read_metadata().unwrap();
        assert_eq!(meta.title.as_str(), "Packed");
        assert_eq!(meta.author.as_str(), "xtci");

        let entry = reader.read_page_entry(0).unwrap();
        assert_eq!((entry.width, entry.height), (16, 2));
        let mut buf = [0u8; 8];
        assert_eq!(reader.load_page(0, &mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], &[0xAA; 4]);
        assert_eq!(reader.load_page(1, &mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0x0F);

        let mut chapters = Vec::new();
        reader
            .for_each_chapter(|chapter| {
                chapters.push((chapter.name.to_vec(), chapter.start_page, chapter.end_page))
            })
            .unwrap();
        assert_eq!(chapters, vec![(b"All".to_vec(), 0, 1)]);
    }

    #[test]
    fn empty_pack_is_rejected() {
        assert!(build_container(&[], &PackOptions::default()).is_err());
    }
}
