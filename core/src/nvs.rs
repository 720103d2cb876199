//! Non-volatile key-value seam.
//!
//! Models the host SDK's NVS capability: open a namespace read-only or
//! read-write, get/set `u32` values, commit. Handles release their host
//! resources on drop.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NvsMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NvsError {
    OpenFailed,
    ReadFailed,
    WriteFailed,
}

pub trait NvsNamespace {
    /// `Ok(None)` when the key does not exist.
    fn get_u32(&mut self, key: &str) -> Result<Option<u32>, NvsError>;
    fn set_u32(&mut self, key: &str, value: u32) -> Result<(), NvsError>;
    fn commit(&mut self) -> Result<(), NvsError>;
}

pub trait Nvs {
    type Namespace<'a>: NvsNamespace
    where
        Self: 'a;

    fn open(&mut self, namespace: &str, mode: NvsMode) -> Result<Self::Namespace<'_>, NvsError>;
}
