//! Per-book reading positions.
//!
//! Positions are keyed by a deterministic hash of the filename so the key
//! fits the KV store's length limit regardless of how long the name is.
//! Persistence is best-effort: a lost write costs a resume position, never
//! a failure the user sees.

use crate::nvs::{Nvs, NvsMode, NvsNamespace};

pub const NAMESPACE: &str = "xtc_reader";

/// `"p"` + 8 lowercase hex digits, NUL-terminated for the host ABI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionKey {
    buf: [u8; 10],
}

impl PositionKey {
    pub fn as_str(&self) -> &str {
        // Always ASCII by construction.
        core::str::from_utf8(&self.buf[..9]).unwrap_or("p00000000")
    }

    pub fn as_bytes_with_nul(&self) -> &[u8; 10] {
        &self.buf
    }
}

/// Jenkins one-at-a-time over the raw filename bytes.
pub fn jenkins_hash(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &b in bytes {
        hash = hash.wrapping_add(b as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);
    hash
}

pub fn build_key(name: &str) -> PositionKey {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let hash = jenkins_hash(name.as_bytes());
    let mut buf = [0u8; 10];
    buf[0] = b'p';
    for i in 0..8 {
        let nibble = (hash >> (28 - 4 * i)) & 0xF;
        buf[1 + i] = HEX[nibble as usize];
    }
    PositionKey { buf }
}

/// Returns the saved 0-based page index, or `None` when the name is empty,
/// the store cannot be opened, or no position was ever saved.
pub fn load<N: Nvs>(nvs: &mut N, name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    let key = build_key(name);
    let mut ns = nvs.open(NAMESPACE, NvsMode::ReadOnly).ok()?;
    ns.get_u32(key.as_str()).ok().flatten()
}

/// Persists `page_index` under the hashed key and commits. Failures are
/// swallowed; the next start simply will not find a position.
pub fn store<N: Nvs>(nvs: &mut N, name: &str, page_index: u32) {
    if name.is_empty() {
        return;
    }
    let key = build_key(name);
    let Ok(mut ns) = nvs.open(NAMESPACE, NvsMode::ReadWrite) else {
        return;
    };
    if ns.set_u32(key.as_str(), page_index).is_ok() {
        let _ = ns.commit();
    }
}
