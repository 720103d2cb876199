//! Raw host imports.
//!
//! Everything the Portal runtime offers arrives through the `pp` import
//! module as flat C ABI calls. Negative return values are error codes; the
//! safe wrappers in the sibling modules translate them.

pub const ERR_FAIL: i32 = -1;
pub const ERR_NOT_FOUND: i32 = -2;
pub const ERR_TOO_LARGE: i32 = -3;

#[link(wasm_import_module = "pp")]
extern "C" {
    pub fn log_write(level: i32, ptr: *const u8, len: i32);

    pub fn display_fill(color: i32);
    pub fn display_hline(x: i32, y: i32, w: i32, color: i32);
    pub fn display_vline(x: i32, y: i32, h: i32, color: i32);
    pub fn display_fill_rect(x: i32, y: i32, w: i32, h: i32, color: i32);
    pub fn display_draw_rect(x: i32, y: i32, w: i32, h: i32, color: i32);
    pub fn display_push_1bpp(
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        ptr: *const u8,
        len: i32,
        color0: i32,
        color1: i32,
    );
    pub fn display_push_xth(ptr: *const u8, len: i32) -> i32;
    pub fn display_text(x: i32, y: i32, ptr: *const u8, len: i32, font: i32, fg: i32, bg: i32);
    pub fn display_text_width(ptr: *const u8, len: i32, font: i32) -> i32;
    pub fn display_update();

    pub fn fs_mounted() -> i32;
    pub fn fs_mount() -> i32;
    /// Returns a handle, or a negative error.
    pub fn fs_open(path_ptr: *const u8, path_len: i32, write: i32) -> i32;
    pub fn fs_read(handle: i32, ptr: *mut u8, len: i32) -> i32;
    pub fn fs_write(handle: i32, ptr: *const u8, len: i32) -> i32;
    /// Absolute seek; returns the new position or a negative error.
    pub fn fs_seek(handle: i32, offset: i64) -> i64;
    pub fn fs_size(handle: i32) -> i64;
    pub fn fs_close(handle: i32);
    pub fn fs_dir_open(path_ptr: *const u8, path_len: i32) -> i32;
    /// Writes the entry name into the buffer; returns its length, 0 at the
    /// end of the directory, or a negative error.
    pub fn fs_dir_next(handle: i32, name_ptr: *mut u8, cap: i32, is_dir_ptr: *mut i32) -> i32;
    pub fn fs_dir_close(handle: i32);
    pub fn fs_remove(path_ptr: *const u8, path_len: i32) -> i32;
    pub fn fs_mkdirp(path_ptr: *const u8, path_len: i32) -> i32;

    pub fn nvs_open(ns_ptr: *const u8, ns_len: i32, rw: i32) -> i32;
    /// Returns 1 when the key exists, 0 when missing, negative on error.
    pub fn nvs_get_u32(handle: i32, key_ptr: *const u8, key_len: i32, out_ptr: *mut u32) -> i32;
    pub fn nvs_set_u32(handle: i32, key_ptr: *const u8, key_len: i32, value: i32) -> i32;
    pub fn nvs_commit(handle: i32) -> i32;
    pub fn nvs_close(handle: i32);
}
