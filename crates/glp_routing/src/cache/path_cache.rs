use std::{
    collections::BTreeSet,
    sync::Arc,
    time::{Duration, Instant},
};

use fxhash::{FxHashMap, FxHashSet};
use parking_lot::Mutex;
use tracing::debug;

use crate::point::Point;

use super::{
    cache_params::CacheParams,
    cache_statistics::CacheStatistics,
    refresh_queue::{RefreshQueue, RefreshRequest},
};

pub type CacheKey = (Point, Point);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId {
    pub x: i32,
    pub y: i32,
}

struct CacheEntry {
    path: Arc<[Point]>,
    regions: Vec<RegionId>,
    created_at: Instant,
    access_count: u64,
    last_access: u64,
}

impl CacheEntry {
    fn eviction_key(&self, key: CacheKey) -> (u64, u64, CacheKey) {
        (self.access_count, self.last_access, key)
    }
}

#[derive(Default)]
struct CacheInner {
    entries: FxHashMap<CacheKey, CacheEntry>,
    /// Ordered by (access count, last access tick); the first element is the
    /// least frequently used, least recently used among equals.
    eviction_order: BTreeSet<(u64, u64, CacheKey)>,
    region_index: FxHashMap<RegionId, FxHashSet<CacheKey>>,
    tick: u64,
}

impl CacheInner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.eviction_order.remove(&entry.eviction_key(*key));
        for region in &entry.regions {
            if let Some(keys) = self.region_index.get_mut(region) {
                keys.remove(key);
                if keys.is_empty() {
                    self.region_index.remove(region);
                }
            }
        }
        Some(entry)
    }

    fn candidates_in_regions(&self, regions: impl Iterator<Item = RegionId>) -> Vec<CacheKey> {
        let mut candidates = FxHashSet::default();
        for region in regions {
            if let Some(keys) = self.region_index.get(&region) {
                candidates.extend(keys.iter().copied());
            }
        }
        candidates.into_iter().collect()
    }
}

/// Memoizes origin -> destination paths.
///
/// Entries are tagged with the grid regions their polyline crosses so that an
/// obstacle change only invalidates the paths around it.
pub struct PathCache {
    params: CacheParams,
    ttl: Duration,
    inner: Mutex<CacheInner>,
    refresh_queue: RefreshQueue,
    statistics: Arc<CacheStatistics>,
}

impl PathCache {
    pub fn new(params: CacheParams, statistics: Arc<CacheStatistics>) -> Self {
        PathCache {
            ttl: params.ttl.unsigned_abs(),
            params: CacheParams {
                region_size: params.region_size.max(1),
                ..params
            },
            inner: Mutex::new(CacheInner::default()),
            refresh_queue: RefreshQueue::new(),
            statistics,
        }
    }

    pub fn params(&self) -> &CacheParams {
        &self.params
    }

    pub fn statistics(&self) -> &Arc<CacheStatistics> {
        &self.statistics
    }

    pub fn refresh_queue(&self) -> &RefreshQueue {
        &self.refresh_queue
    }

    pub fn region_of(&self, point: &Point) -> RegionId {
        RegionId {
            x: point.x.div_euclid(self.params.region_size),
            y: point.y.div_euclid(self.params.region_size),
        }
    }

    fn regions_of(&self, path: &[Point]) -> Vec<RegionId> {
        let mut regions: Vec<RegionId> = path.iter().map(|point| self.region_of(point)).collect();
        regions.sort_unstable();
        regions.dedup();
        regions
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lookup(&self, origin: Point, destination: Point) -> Option<Arc<[Point]>> {
        let key = (origin, destination);
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(&key) {
            None => {
                self.statistics.record_miss();
                return None;
            }
            Some(entry) => entry.created_at.elapsed() > self.ttl,
        };

        if expired {
            inner.remove(&key);
            self.statistics.record_expiration();
            self.statistics.record_miss();
            return None;
        }

        let tick = inner.next_tick();
        let inner = &mut *inner;
        let entry = inner.entries.get_mut(&key)?;
        inner.eviction_order.remove(&entry.eviction_key(key));
        entry.access_count += 1;
        entry.last_access = tick;
        inner.eviction_order.insert(entry.eviction_key(key));

        self.statistics.record_hit();
        Some(Arc::clone(&entry.path))
    }

    pub fn store(&self, origin: Point, destination: Point, path: impl Into<Arc<[Point]>>) {
        if self.params.capacity == 0 {
            return;
        }

        let key = (origin, destination);
        let path = path.into();
        let regions = self.regions_of(&path);

        let mut inner = self.inner.lock();
        inner.remove(&key);

        while inner.entries.len() >= self.params.capacity {
            let Some(&(_, _, victim)) = inner.eviction_order.first() else {
                break;
            };
            inner.remove(&victim);
            self.statistics.record_eviction();
        }

        for region in &regions {
            inner.region_index.entry(*region).or_default().insert(key);
        }

        let tick = inner.next_tick();
        let entry = CacheEntry {
            path,
            regions,
            created_at: Instant::now(),
            access_count: 1,
            last_access: tick,
        };
        inner.eviction_order.insert(entry.eviction_key(key));
        inner.entries.insert(key, entry);

        self.statistics.record_store();
    }

    pub fn contains(&self, origin: Point, destination: Point) -> bool {
        self.inner.lock().entries.contains_key(&(origin, destination))
    }

    /// Removes every cached path whose polyline contains `point`.
    pub fn invalidate_point(&self, point: Point) -> usize {
        let region = self.region_of(&point);
        self.invalidate_matching(std::iter::once(region), |path| path.contains(&point))
    }

    /// Removes every cached path passing within `radius` cells (Chebyshev) of `center`.
    pub fn invalidate_region(&self, center: Point, radius: u32) -> usize {
        let radius_cells = radius.min(i32::MAX as u32) as i32;
        let low = self.region_of(&Point::new(
            center.x.saturating_sub(radius_cells),
            center.y.saturating_sub(radius_cells),
        ));
        let high = self.region_of(&Point::new(
            center.x.saturating_add(radius_cells),
            center.y.saturating_add(radius_cells),
        ));

        let regions =
            (low.x..=high.x).flat_map(move |x| (low.y..=high.y).map(move |y| RegionId { x, y }));

        self.invalidate_matching(regions, |path| {
            path.iter()
                .any(|point| point.chebyshev_distance(&center) <= radius)
        })
    }

    fn invalidate_matching(
        &self,
        regions: impl Iterator<Item = RegionId>,
        matches: impl Fn(&[Point]) -> bool,
    ) -> usize {
        let mut removed = Vec::new();
        {
            let mut inner = self.inner.lock();
            for key in inner.candidates_in_regions(regions) {
                let hit = inner
                    .entries
                    .get(&key)
                    .is_some_and(|entry| matches(&entry.path));
                if !hit {
                    continue;
                }
                if let Some(entry) = inner.remove(&key) {
                    removed.push((key, entry.access_count));
                }
            }
        }

        if removed.is_empty() {
            return 0;
        }

        self.statistics.record_invalidations(removed.len());
        debug!(count = removed.len(), "Invalidated cached paths");

        if self.params.refresh_on_invalidate {
            for ((origin, destination), priority) in &removed {
                self.refresh_queue.push(RefreshRequest {
                    priority: *priority,
                    origin: *origin,
                    destination: *destination,
                });
            }
        }

        removed.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let count = inner.entries.len();
        *inner = CacheInner::default();
        self.statistics.record_invalidations(count);
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    fn straight_path(from: Point, to: Point) -> Vec<Point> {
        let mut path = Vec::new();
        let mut current = from;
        path.push(current);
        while current != to {
            current.x += (to.x - current.x).signum();
            if current.x == to.x {
                current.y += (to.y - current.y).signum();
            }
            path.push(current);
        }
        path
    }

    fn cache_with(params: CacheParams) -> PathCache {
        PathCache::new(params, Arc::new(CacheStatistics::default()))
    }

    #[test]
    fn test_store_then_lookup() {
        let cache = cache_with(CacheParams::default());
        let path = straight_path(Point::new(0, 0), Point::new(5, 5));
        cache.store(Point::new(0, 0), Point::new(5, 5), path.clone());

        let cached = cache.lookup(Point::new(0, 0), Point::new(5, 5)).unwrap();
        assert_eq!(&*cached, path.as_slice());
        assert!(cache.lookup(Point::new(5, 5), Point::new(0, 0)).is_none());

        let snapshot = cache.statistics().snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 1);
    }

    #[test]
    fn test_evicts_least_frequently_used() {
        let cache = cache_with(CacheParams {
            capacity: 2,
            ..CacheParams::default()
        });
        let a = (Point::new(0, 0), Point::new(0, 3));
        let b = (Point::new(1, 0), Point::new(1, 3));
        let c = (Point::new(2, 0), Point::new(2, 3));

        cache.store(a.0, a.1, straight_path(a.0, a.1));
        cache.store(b.0, b.1, straight_path(b.0, b.1));
        cache.lookup(a.0, a.1);

        cache.store(c.0, c.1, straight_path(c.0, c.1));

        assert!(cache.contains(a.0, a.1));
        assert!(!cache.contains(b.0, b.1));
        assert!(cache.contains(c.0, c.1));
        assert_eq!(cache.statistics().snapshot().evictions, 1);
    }

    #[test]
    fn test_evicts_least_recent_among_equal_frequency() {
        let cache = cache_with(CacheParams {
            capacity: 2,
            ..CacheParams::default()
        });
        let a = (Point::new(0, 0), Point::new(0, 3));
        let b = (Point::new(1, 0), Point::new(1, 3));
        let c = (Point::new(2, 0), Point::new(2, 3));

        cache.store(a.0, a.1, straight_path(a.0, a.1));
        cache.store(b.0, b.1, straight_path(b.0, b.1));
        cache.store(c.0, c.1, straight_path(c.0, c.1));

        assert!(!cache.contains(a.0, a.1));
        assert!(cache.contains(b.0, b.1));
    }

    #[test]
    fn test_expired_entries_are_misses() {
        let cache = cache_with(CacheParams {
            ttl: SignedDuration::ZERO,
            ..CacheParams::default()
        });
        cache.store(Point::new(0, 0), Point::new(0, 1), vec![
            Point::new(0, 0),
            Point::new(0, 1),
        ]);
        std::thread::sleep(Duration::from_millis(2));

        assert!(cache.lookup(Point::new(0, 0), Point::new(0, 1)).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.statistics().snapshot().expirations, 1);
    }

    #[test]
    fn test_invalidate_point_only_removes_paths_through_it() {
        let cache = cache_with(CacheParams {
            refresh_on_invalidate: false,
            ..CacheParams::default()
        });
        let through = straight_path(Point::new(0, 5), Point::new(20, 5));
        let beside = straight_path(Point::new(0, 6), Point::new(20, 6));
        let far = straight_path(Point::new(50, 50), Point::new(60, 50));

        cache.store(Point::new(0, 5), Point::new(20, 5), through);
        cache.store(Point::new(0, 6), Point::new(20, 6), beside);
        cache.store(Point::new(50, 50), Point::new(60, 50), far);

        let removed = cache.invalidate_point(Point::new(12, 5));

        assert_eq!(removed, 1);
        assert!(!cache.contains(Point::new(0, 5), Point::new(20, 5)));
        assert!(cache.contains(Point::new(0, 6), Point::new(20, 6)));
        assert!(cache.contains(Point::new(50, 50), Point::new(60, 50)));
    }

    #[test]
    fn test_invalidate_region_enqueues_refresh() {
        let cache = cache_with(CacheParams::default());
        cache.store(
            Point::new(0, 0),
            Point::new(30, 0),
            straight_path(Point::new(0, 0), Point::new(30, 0)),
        );
        cache.store(
            Point::new(0, 40),
            Point::new(30, 40),
            straight_path(Point::new(0, 40), Point::new(30, 40)),
        );

        let removed = cache.invalidate_region(Point::new(15, 3), 3);

        assert_eq!(removed, 1);
        assert!(cache.contains(Point::new(0, 40), Point::new(30, 40)));
        let request = cache.refresh_queue().try_pop().unwrap();
        assert_eq!(request.origin, Point::new(0, 0));
        assert_eq!(request.destination, Point::new(30, 0));
    }

    #[test]
    fn test_region_index_handles_negative_coordinates() {
        let cache = cache_with(CacheParams::default());
        assert_eq!(cache.region_of(&Point::new(-1, -1)), RegionId { x: -1, y: -1 });
        assert_eq!(cache.region_of(&Point::new(9, 10)), RegionId { x: 0, y: 1 });
    }
}
