//! Host-backed non-volatile storage.

use xtc_core::nvs::{Nvs, NvsError, NvsMode, NvsNamespace};

use crate::host;

pub struct HostNvs;

pub struct HostNamespace {
    handle: i32,
}

impl Drop for HostNamespace {
    fn drop(&mut self) {
        unsafe { host::nvs_close(self.handle) }
    }
}

impl NvsNamespace for HostNamespace {
    fn get_u32(&mut self, key: &str) -> Result<Option<u32>, NvsError> {
        let mut value: u32 = 0;
        let rc = unsafe {
            host::nvs_get_u32(self.handle, key.as_ptr(), key.len() as i32, &mut value)
        };
        match rc {
            1 => Ok(Some(value)),
            0 => Ok(None),
            _ => Err(NvsError::ReadFailed),
        }
    }

    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), NvsError> {
        let rc = unsafe {
            host::nvs_set_u32(self.handle, key.as_ptr(), key.len() as i32, value as i32)
        };
        if rc < 0 {
            return Err(NvsError::WriteFailed);
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), NvsError> {
        if unsafe { host::nvs_commit(self.handle) } < 0 {
            return Err(NvsError::WriteFailed);
        }
        Ok(())
    }
}

impl Nvs for HostNvs {
    type Namespace<'a>
        = HostNamespace
    where
        Self: 'a;

    fn open(&mut self, namespace: &str, mode: NvsMode) -> Result<Self::Namespace<'_>, NvsError> {
        let rw = i32::from(mode == NvsMode::ReadWrite);
        let handle =
            unsafe { host::nvs_open(namespace.as_ptr(), namespace.len() as i32, rw) };
        if handle < 0 {
            return Err(NvsError::OpenFailed);
        }
        Ok(HostNamespace { handle })
    }
}
