use jiff::SignedDuration;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheParams {
    /// Maximum number of cached paths before eviction kicks in
    pub capacity: usize,
    pub ttl: SignedDuration,
    /// Side length, in cells, of the square regions used for invalidation
    pub region_size: i32,
    /// Invalidated paths are queued for background recomputation
    pub refresh_on_invalidate: bool,
    pub refresh_threads: usize,
}

impl Default for CacheParams {
    fn default() -> Self {
        CacheParams {
            capacity: 10_000,
            ttl: SignedDuration::from_hours(1),
            region_size: 10,
            refresh_on_invalidate: true,
            refresh_threads: 1,
        }
    }
}
