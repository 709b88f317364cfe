//! Cache key for memoized layouts.

use core::fmt;

use crate::drawables::Size;

/// Identity of one layout: source content, configuration version and width.
///
/// The content hash is CRC32; the length guards against the rare collision
/// between inputs of different sizes. `config_version` comes from
/// [`crate::ConfigStack::version`] and changes on every configuration
/// mutation, so a stale configuration can never hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub content_hash: u32,
    pub content_len: usize,
    pub config_version: u64,
    /// `f32::to_bits` of the layout width.
    pub width_bits: u32,
}

impl CacheKey {
    pub fn new(text: &str, config_version: u64, bounds: Size) -> Self {
        Self {
            content_hash: crc32fast::hash(text.as_bytes()),
            content_len: text.len(),
            config_version,
            width_bits: bounds.width.max(0.0).to_bits(),
        }
    }

    /// Layout width the key was built for.
    pub fn width(&self) -> f32 {
        f32::from_bits(self.width_bits)
    }
}

/// Stable, filename-safe rendering (`hash-len-version-width`, hex).
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:x}-{:x}-{:08x}",
            self.content_hash, self.content_len, self.config_version, self.width_bits
        )
    }
}
