//! The binary-file short-circuit shared by the diff and merge engines
//! (§4.8, §4.7.3): a NUL byte in the first 8000 bytes means binary.

/// How many leading bytes are inspected for a NUL byte.
pub const SNIFF_WINDOW: usize = 8000;

/// True if `data` should be treated as binary.
#[must_use]
pub fn looks_binary(data: &[u8]) -> bool {
    let window = &data[..data.len().min(SNIFF_WINDOW)];
    window.contains(&0)
}
