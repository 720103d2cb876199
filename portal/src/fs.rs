//! Host-backed filesystem.
//!
//! The Portal filesystem addresses files with 32-bit offsets; seeks past
//! that range are rejected before they reach the host.

use xtc_core::fs::{DirEntry, Directory, File, Filesystem, FsError, Mode, MAX_PATH};
use xtc_core::strbuf::StrBuf;

use crate::host;

const MAX_SEEK: u64 = u32::MAX as u64;

pub struct HostFilesystem;

pub struct HostFile {
    handle: i32,
    pos: u64,
}

impl Drop for HostFile {
    fn drop(&mut self) {
        unsafe { host::fs_close(self.handle) }
    }
}

impl embedded_io::ErrorType for HostFile {
    type Error = FsError;
}

impl embedded_io::Read for HostFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = unsafe { host::fs_read(self.handle, buf.as_mut_ptr(), buf.len() as i32) };
        if n < 0 {
            return Err(FsError::Io);
        }
        self.pos += n as u64;
        Ok(n as usize)
    }
}

impl embedded_io::Write for HostFile {
    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = unsafe { host::fs_write(self.handle, buf.as_ptr(), buf.len() as i32) };
        if n <= 0 {
            return Err(FsError::Io);
        }
        self.pos += n as u64;
        Ok(n as usize)
    }

    fn flush(&mut self) -> Result<(), FsError> {
        Ok(())
    }
}

impl embedded_io::Seek for HostFile {
    fn seek(&mut self, pos: embedded_io::SeekFrom) -> Result<u64, FsError> {
        let target: i64 = match pos {
            embedded_io::SeekFrom::Start(offset) => {
                if offset > MAX_SEEK {
                    return Err(FsError::SeekTooLarge);
                }
                offset as i64
            }
            embedded_io::SeekFrom::End(offset) => {
                let size = unsafe { host::fs_size(self.handle) };
                if size < 0 {
                    return Err(FsError::Io);
                }
                size + offset
            }
            embedded_io::SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if target < 0 || target as u64 > MAX_SEEK {
            return Err(FsError::SeekTooLarge);
        }
        let new_pos = unsafe { host::fs_seek(self.handle, target) };
        if new_pos < 0 {
            return Err(FsError::Io);
        }
        self.pos = new_pos as u64;
        Ok(self.pos)
    }
}

impl File for HostFile {
    fn size(&self) -> u64 {
        let size = unsafe { host::fs_size(self.handle) };
        size.max(0) as u64
    }
}

pub struct HostDir {
    handle: i32,
}

impl Drop for HostDir {
    fn drop(&mut self) {
        unsafe { host::fs_dir_close(self.handle) }
    }
}

impl Directory for HostDir {
    fn next_entry(&mut self) -> Result<Option<DirEntry>, FsError> {
        let mut name = [0u8; 256];
        let mut is_dir: i32 = 0;
        let n = unsafe {
            host::fs_dir_next(self.handle, name.as_mut_ptr(), name.len() as i32, &mut is_dir)
        };
        if n < 0 {
            return Err(FsError::Io);
        }
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(DirEntry {
            name: StrBuf::from_bytes(&name[..n as usize]),
            is_dir: is_dir != 0,
        }))
    }
}

fn check_path(path: &str) -> Result<(), FsError> {
    if path.len() > MAX_PATH {
        return Err(FsError::PathTooLong);
    }
    Ok(())
}

fn map_handle(rc: i32) -> Result<i32, FsError> {
    match rc {
        handle if handle >= 0 => Ok(handle),
        host::ERR_NOT_FOUND => Err(FsError::NotFound),
        host::ERR_TOO_LARGE => Err(FsError::PathTooLong),
        _ => Err(FsError::Io),
    }
}

impl Filesystem for HostFilesystem {
    type File<'a>
        = HostFile
    where
        Self: 'a;
    type Dir<'a>
        = HostDir
    where
        Self: 'a;

    fn is_mounted(&self) -> bool {
        unsafe { host::fs_mounted() != 0 }
    }

    fn mount(&mut self) -> Result<(), FsError> {
        match unsafe { host::fs_mount() } {
            0 => Ok(()),
            host::ERR_NOT_FOUND => Err(FsError::NotFound),
            _ => Err(FsError::Io),
        }
    }

    fn open(&mut self, path: &str, mode: Mode) -> Result<Self::File<'_>, FsError> {
        check_path(path)?;
        let write = i32::from(mode == Mode::Write);
        let handle =
            map_handle(unsafe { host::fs_open(path.as_ptr(), path.len() as i32, write) })?;
        Ok(HostFile { handle, pos: 0 })
    }

    fn open_dir(&mut self, path: &str) -> Result<Self::Dir<'_>, FsError> {
        check_path(path)?;
        let handle = map_handle(unsafe { host::fs_dir_open(path.as_ptr(), path.len() as i32) })?;
        Ok(HostDir { handle })
    }

    fn remove(&mut self, path: &str) -> Result<(), FsError> {
        check_path(path)?;
        match unsafe { host::fs_remove(path.as_ptr(), path.len() as i32) } {
            0 => Ok(()),
            host::ERR_NOT_FOUND => Err(FsError::NotFound),
            _ => Err(FsError::Io),
        }
    }

    fn create_dir_all(&mut self, path: &str) -> Result<(), FsError> {
        check_path(path)?;
        match unsafe { host::fs_mkdirp(path.as_ptr(), path.len() as i32) } {
            0 => Ok(()),
            _ => Err(FsError::Io),
        }
    }
}
