//! Filesystem seam.
//!
//! The host owns the actual storage (SD card behind the Portal SDK, plain
//! directories in tests and tools); the core only needs to open files and
//! walk one directory. Files implement the `embedded_io` traits so the
//! container reader can consume them directly.

use crate::strbuf::StrBuf;

/// Longest path the application ever builds (books dir + 255-byte name).
pub const MAX_PATH: usize = 288;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsError {
    NotMounted,
    NotFound,
    PathTooLong,
    SeekTooLarge,
    Io,
}

impl core::fmt::Display for FsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            FsError::NotMounted => "NotMounted",
            FsError::NotFound => "NotFound",
            FsError::PathTooLong => "PathTooLong",
            FsError::SeekTooLarge => "SeekTooLarge",
            FsError::Io => "Io",
        };
        f.write_str(name)
    }
}

impl embedded_io::Error for FsError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            FsError::NotMounted => embedded_io::ErrorKind::NotConnected,
            FsError::NotFound => embedded_io::ErrorKind::NotFound,
            FsError::PathTooLong => embedded_io::ErrorKind::InvalidInput,
            FsError::SeekTooLarge => embedded_io::ErrorKind::InvalidInput,
            FsError::Io => embedded_io::ErrorKind::Other,
        }
    }
}

pub trait File:
    embedded_io::Read + embedded_io::Write + embedded_io::Seek + embedded_io::ErrorType<Error = FsError>
{
    fn size(&self) -> u64;
}

#[derive(Clone, Debug, Default)]
pub struct DirEntry {
    pub name: StrBuf<255>,
    pub is_dir: bool,
}

pub trait Directory {
    fn next_entry(&mut self) -> Result<Option<DirEntry>, FsError>;
}

pub trait Filesystem {
    type File<'a>: File
    where
        Self: 'a;
    type Dir<'a>: Directory
    where
        Self: 'a;

    fn is_mounted(&self) -> bool;
    fn mount(&mut self) -> Result<(), FsError>;
    fn open(&mut self, path: &str, mode: Mode) -> Result<Self::File<'_>, FsError>;
    fn open_dir(&mut self, path: &str) -> Result<Self::Dir<'_>, FsError>;
    fn remove(&mut self, path: &str) -> Result<(), FsError>;
    fn create_dir_all(&mut self, path: &str) -> Result<(), FsError>;
}
