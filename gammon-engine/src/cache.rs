//! Evaluation Cache.

use std::cell::UnsafeCell;
use std::fmt;
use std::hint;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "cache-stats")]
use std::sync::atomic::AtomicU32;

use log::{debug, warn};

use crate::coretypes::NUM_OUTPUTS;
use crate::error::{self, ErrorKind};
use crate::hash::{hash_key, HashKind};
use crate::key::PackedKey;

/// Floats stored per entry: the evaluation outputs followed by one cubeful equity.
pub const NUM_CACHED: usize = NUM_OUTPUTS + 1;

/// Largest number of entries a cache may be asked for.
pub const MAX_REQUEST: usize = 1 << 31;

/// Entry holds the result of one evaluation of a position under one context.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Entry {
    pub key: PackedKey,              // Position evaluated.
    pub context: u32,                // Evaluation settings the result depends on.
    pub outputs: [f32; NUM_CACHED], // Outputs, last slot is the cubeful equity.
}

impl Entry {
    /// Returns new Entry from provided information.
    pub fn new(key: PackedKey, context: u32, outputs: [f32; NUM_OUTPUTS], cubeful: f32) -> Self {
        let mut cached = [0.0; NUM_CACHED];
        cached[..NUM_OUTPUTS].copy_from_slice(&outputs);
        cached[NUM_OUTPUTS] = cubeful;
        Self {
            key,
            context,
            outputs: cached,
        }
    }

    /// Returns a new Entry matching no position.
    pub const fn illegal() -> Self {
        Self {
            key: PackedKey::EMPTY,
            context: 0,
            outputs: [0.0; NUM_CACHED],
        }
    }

    #[inline(always)]
    fn matches(&self, key: &PackedKey, context: u32) -> bool {
        self.context == context && self.key == *key
    }

    fn evaluation(&self) -> Evaluation {
        let mut outputs = [0.0; NUM_OUTPUTS];
        outputs.copy_from_slice(&self.outputs[..NUM_OUTPUTS]);
        Evaluation {
            outputs,
            cubeful: self.outputs[NUM_OUTPUTS],
        }
    }
}

/// Cached result returned by a hit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Evaluation {
    pub outputs: [f32; NUM_OUTPUTS],
    pub cubeful: f32,
}

/// Bucket a missed lookup belongs to. Pass it back to insert the computed result
/// without hashing the key again.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MissToken(HashKind);

impl MissToken {
    pub const fn bucket(&self) -> HashKind {
        self.0
    }
}

/// Result of a cache lookup.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Lookup {
    Hit(Evaluation),
    Miss(MissToken),
}

/// Snapshot of the cache counters. All zero unless the `cache-stats` feature is on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct CacheStats {
    pub lookups: u32,
    pub hits: u32,
    pub added: u32,
}

/// Counters updated with relaxed atomics, compiled out without `cache-stats`.
#[derive(Debug, Default)]
struct Counters {
    #[cfg(feature = "cache-stats")]
    lookups: AtomicU32,
    #[cfg(feature = "cache-stats")]
    hits: AtomicU32,
    #[cfg(feature = "cache-stats")]
    added: AtomicU32,
}

impl Counters {
    #[inline(always)]
    fn lookup(&self) {
        #[cfg(feature = "cache-stats")]
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    fn hit(&self) {
        #[cfg(feature = "cache-stats")]
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    fn add(&self) {
        #[cfg(feature = "cache-stats")]
        self.added.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        #[cfg(feature = "cache-stats")]
        {
            CacheStats {
                lookups: self.lookups.load(Ordering::Relaxed),
                hits: self.hits.load(Ordering::Relaxed),
                added: self.added.load(Ordering::Relaxed),
            }
        }
        #[cfg(not(feature = "cache-stats"))]
        {
            CacheStats::default()
        }
    }
}

/// The two entries of a bucket, most recently used first.
#[derive(Debug, Copy, Clone)]
struct Slots {
    primary: Entry,
    secondary: Entry,
}

impl Slots {
    /// Find an entry, promoting a secondary hit to primary.
    fn probe(&mut self, key: &PackedKey, context: u32) -> Option<Evaluation> {
        if self.primary.matches(key, context) {
            return Some(self.primary.evaluation());
        }
        if self.secondary.matches(key, context) {
            mem::swap(&mut self.primary, &mut self.secondary);
            return Some(self.primary.evaluation());
        }
        None
    }

    /// Insert as primary, demoting the old primary and dropping the old secondary.
    fn push(&mut self, entry: Entry) {
        self.secondary = self.primary;
        self.primary = entry;
    }

    fn invalidate(&mut self) {
        self.primary.key.invalidate();
        self.secondary.key.invalidate();
    }
}

/// A bucket guarded by a spinlock. Critical sections only copy a few dozen bytes.
struct Bucket {
    lock: AtomicBool,
    slots: UnsafeCell<Slots>,
}

// SAFETY: `slots` is only reached through a BucketGuard, which holds `lock`,
// or through `&mut Bucket`, which excludes every other access.
unsafe impl Sync for Bucket {}

impl Bucket {
    fn flushed() -> Self {
        Self {
            lock: AtomicBool::new(false),
            slots: UnsafeCell::new(Slots {
                primary: Entry::illegal(),
                secondary: Entry::illegal(),
            }),
        }
    }

    #[inline]
    fn lock(&self) -> BucketGuard<'_> {
        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.lock.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
        BucketGuard { bucket: self }
    }

    fn get_mut(&mut self) -> &mut Slots {
        self.slots.get_mut()
    }
}

/// Holds a bucket's lock, released on drop.
struct BucketGuard<'a> {
    bucket: &'a Bucket,
}

impl Deref for BucketGuard<'_> {
    type Target = Slots;
    fn deref(&self) -> &Self::Target {
        // SAFETY: the guard holds the bucket lock.
        unsafe { &*self.bucket.slots.get() }
    }
}

impl DerefMut for BucketGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the guard holds the bucket lock.
        unsafe { &mut *self.bucket.slots.get() }
    }
}

impl Drop for BucketGuard<'_> {
    fn drop(&mut self) {
        self.bucket.lock.store(false, Ordering::Release);
    }
}

// Entries held by a cache created for `requested` entries.
fn rounded_size(requested: usize) -> usize {
    requested.max(2).next_power_of_two()
}

/// A 2-way set associative cache of evaluations, keyed by PackedKey and context.
/// The cache is safely sharable between threads as immutable.
/// Buckets may be updated from an immutable reference as each bucket has its own spinlock.
/// The `_unlocked` variants skip the lock and require exclusive access instead.
///
/// Example:
/// ```rust
/// # use gammon_engine::board::Board;
/// # use gammon_engine::cache::{EvalCache, Entry, Lookup};
/// # use gammon_engine::coretypes::Variation;
/// # use gammon_engine::key::PackedKey;
/// let cache = EvalCache::with_capacity(1024).unwrap();
/// let key = PackedKey::from(&Board::start_position(Variation::Standard));
///
/// match cache.lookup(&key, 0) {
///     Lookup::Miss(token) => cache.insert(Entry::new(key, 0, [0.5; 5], 0.0), token),
///     Lookup::Hit(_) => unreachable!(),
/// }
/// assert!(matches!(cache.lookup(&key, 0), Lookup::Hit(_)));
/// ```
/// Only entries whose key and context match exactly are returned.
/// Bucket collisions evict, they never return a wrong result.
///
/// Fields:
/// * size -> Number of entries, always a power of two and at least 2.
/// * hash_mask -> Mask applied to a hash to select one of `size / 2` buckets.
/// * buckets -> Every bucket, allocated once.
pub struct EvalCache {
    size: u32,
    hash_mask: HashKind,
    buckets: Box<[Bucket]>,
    counters: Counters,
}

impl EvalCache {
    /// Returns a new, empty cache with room for at least `requested` entries.
    /// The size is rounded up to a power of two of at least 2.
    /// Fails if `requested` is 0 or above 2^31, or the memory cannot be allocated.
    pub fn with_capacity(requested: usize) -> error::Result<Self> {
        if requested == 0 || requested > MAX_REQUEST {
            warn!("rejected evaluation cache of {requested} entries");
            let message = format!("{requested} entries, expected 1..={MAX_REQUEST}");
            return Err((ErrorKind::CacheSizeInvalid, message).into());
        }

        let size = rounded_size(requested);
        let bucket_count = size / 2;

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(bucket_count)
            .map_err(|err| error::Error::new(ErrorKind::CacheAllocation, err))?;
        buckets.extend((0..bucket_count).map(|_| Bucket::flushed()));

        debug!(
            "evaluation cache of {size} entries, {} bytes",
            bucket_count * mem::size_of::<Bucket>()
        );

        Ok(Self {
            size: size as u32,
            hash_mask: (bucket_count - 1) as HashKind,
            buckets: buckets.into_boxed_slice(),
            counters: Counters::default(),
        })
    }

    /// Returns the number of entries.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns the mask selecting a bucket from a hash.
    pub fn hash_mask(&self) -> HashKind {
        self.hash_mask
    }

    /// Bytes taken by one bucket of two entries.
    pub const fn bucket_bytes() -> usize {
        mem::size_of::<Bucket>()
    }

    /// Bytes taken by the buckets of this cache.
    pub fn bytes(&self) -> usize {
        self.buckets.len() * Self::bucket_bytes()
    }

    /// Returns the token of the bucket `key` and `context` map to.
    pub fn token(&self, key: &PackedKey, context: u32) -> MissToken {
        MissToken(hash_key(self.hash_mask, key, context))
    }

    #[inline(always)]
    fn bucket(&self, token: MissToken) -> &Bucket {
        &self.buckets[(token.0 & self.hash_mask) as usize]
    }

    #[inline(always)]
    fn bucket_mut(&mut self, token: MissToken) -> &mut Bucket {
        let index = (token.0 & self.hash_mask) as usize;
        &mut self.buckets[index]
    }

    /// Look up an evaluation, holding the bucket lock while its entries are read.
    /// A hit in the secondary slot moves it to the primary slot.
    pub fn lookup(&self, key: &PackedKey, context: u32) -> Lookup {
        let token = self.token(key, context);
        self.counters.lookup();

        let found = { self.bucket(token).lock().probe(key, context) };
        self.finish_lookup(found, token)
    }

    /// Same as lookup, without locking.
    pub fn lookup_unlocked(&mut self, key: &PackedKey, context: u32) -> Lookup {
        let token = self.token(key, context);
        self.counters.lookup();

        let found = self.bucket_mut(token).get_mut().probe(key, context);
        self.finish_lookup(found, token)
    }

    #[inline(always)]
    fn finish_lookup(&self, found: Option<Evaluation>, token: MissToken) -> Lookup {
        match found {
            Some(evaluation) => {
                self.counters.hit();
                Lookup::Hit(evaluation)
            }
            None => Lookup::Miss(token),
        }
    }

    /// Insert an entry into the bucket named by `token`, holding the bucket lock.
    /// The entry becomes primary, the old primary becomes secondary, the old secondary is dropped.
    pub fn insert(&self, entry: Entry, token: MissToken) {
        {
            self.bucket(token).lock().push(entry);
        }
        self.counters.add();
    }

    /// Same as insert, without locking.
    pub fn insert_unlocked(&mut self, entry: Entry, token: MissToken) {
        self.bucket_mut(token).get_mut().push(entry);
        self.counters.add();
    }

    /// Invalidate every entry and release every lock.
    /// Since the cache is uniquely borrowed, no other thread can hold a bucket.
    pub fn flush(&mut self) {
        for bucket in self.buckets.iter_mut() {
            *bucket.lock.get_mut() = false;
            bucket.get_mut().invalidate();
        }
        debug!("evaluation cache flushed");
    }

    /// Replace self with an empty cache sized for `requested` entries.
    /// Returns the new size. Nothing changes when the rounded size is already current
    /// or the new cache cannot be created.
    ///
    /// Requests are compared after rounding, so `resize(100)` on a 128 entry
    /// cache keeps its contents.
    pub fn resize(&mut self, requested: usize) -> error::Result<u32> {
        if (1..=MAX_REQUEST).contains(&requested) && rounded_size(requested) == self.size as usize {
            return Ok(self.size);
        }

        let old_size = self.size;
        *self = Self::with_capacity(requested)?;
        debug!("evaluation cache resized from {old_size} to {} entries", self.size);
        Ok(self.size)
    }

    /// Returns the lookup, hit and insert counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

impl fmt::Debug for EvalCache {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EvalCache")
            .field("size", &self.size)
            .field("hash_mask", &self.hash_mask)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::coretypes::{Side, Variation};

    fn start_key() -> PackedKey {
        PackedKey::from(&Board::start_position(Variation::Standard))
    }

    fn miss(lookup: Lookup) -> MissToken {
        match lookup {
            Lookup::Miss(token) => token,
            Lookup::Hit(evaluation) => panic!("unexpected hit {evaluation:?}"),
        }
    }

    fn hit(lookup: Lookup) -> Evaluation {
        match lookup {
            Lookup::Hit(evaluation) => evaluation,
            Lookup::Miss(token) => panic!("unexpected miss {token:?}"),
        }
    }

    #[test]
    fn sizes_round_up() {
        let cases = [(1, 2), (2, 2), (3, 4), (1000, 1024), (1024, 1024), (1025, 2048)];
        for (requested, size) in cases {
            let cache = EvalCache::with_capacity(requested).unwrap();
            assert_eq!(cache.size(), size);
            assert_eq!(cache.hash_mask(), size / 2 - 1);
        }
    }

    #[test]
    fn invalid_sizes_rejected() {
        for requested in [0, MAX_REQUEST + 1] {
            let err = EvalCache::with_capacity(requested).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CacheSizeInvalid);
        }
    }

    #[test]
    fn miss_then_hit() {
        let cache = EvalCache::with_capacity(1 << 10).unwrap();
        let key = start_key();

        let token = miss(cache.lookup(&key, 7));
        assert_eq!(token, cache.token(&key, 7));
        cache.insert(Entry::new(key, 7, [0.1, 0.2, 0.3, 0.4, 0.5], 0.6), token);

        let evaluation = hit(cache.lookup(&key, 7));
        assert_eq!(evaluation.outputs, [0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(evaluation.cubeful, 0.6);

        // A different context is a different entry.
        miss(cache.lookup(&key, 8));
    }

    #[test]
    fn single_bucket_keeps_two_entries() {
        // Two entries, one bucket: every key collides.
        let mut cache = EvalCache::with_capacity(2).unwrap();
        let keys: Vec<PackedKey> = (1..=3)
            .map(|n| {
                let mut board = Board::empty();
                board[(Side::OnRoll, 0)] = n;
                PackedKey::from(&board)
            })
            .collect();

        for (n, key) in keys.iter().enumerate() {
            let token = miss(cache.lookup_unlocked(key, 0));
            cache.insert_unlocked(Entry::new(*key, 0, [n as f32; 5], 0.0), token);
        }

        // Oldest was evicted, the two most recent remain.
        miss(cache.lookup_unlocked(&keys[0], 0));
        assert_eq!(hit(cache.lookup_unlocked(&keys[1], 0)).outputs, [1.0; 5]);
        assert_eq!(hit(cache.lookup_unlocked(&keys[2], 0)).outputs, [2.0; 5]);
    }

    #[test]
    fn secondary_hit_is_promoted() {
        let mut cache = EvalCache::with_capacity(2).unwrap();
        let a = start_key();
        let b = PackedKey::from(&Board::start_position(Variation::Nackgammon));
        let c = PackedKey::from(&Board::empty());

        for key in [a, b] {
            let token = cache.token(&key, 0);
            cache.insert_unlocked(Entry::new(key, 0, [0.0; 5], 0.0), token);
        }
        // a is secondary, a hit promotes it so inserting c evicts b.
        hit(cache.lookup_unlocked(&a, 0));
        let token = cache.token(&c, 0);
        cache.insert_unlocked(Entry::new(c, 0, [0.0; 5], 0.0), token);

        hit(cache.lookup_unlocked(&a, 0));
        hit(cache.lookup_unlocked(&c, 0));
        miss(cache.lookup_unlocked(&b, 0));
    }

    #[test]
    fn flush_empties() {
        let mut cache = EvalCache::with_capacity(64).unwrap();
        let key = start_key();
        let token = cache.token(&key, 0);
        cache.insert(Entry::new(key, 0, [0.25; 5], 0.0), token);
        hit(cache.lookup(&key, 0));

        cache.flush();
        miss(cache.lookup(&key, 0));
    }

    #[test]
    fn resize_replaces_contents() {
        let mut cache = EvalCache::with_capacity(64).unwrap();
        let key = start_key();
        let token = cache.token(&key, 0);
        cache.insert(Entry::new(key, 0, [0.25; 5], 0.0), token);

        // Same size keeps contents.
        assert_eq!(cache.resize(64).unwrap(), 64);
        hit(cache.lookup(&key, 0));

        assert_eq!(cache.resize(100).unwrap(), 128);
        assert_eq!(cache.hash_mask(), 63);
        miss(cache.lookup(&key, 0));

        // Requests that round to the current size keep contents too.
        let token = cache.token(&key, 0);
        cache.insert(Entry::new(key, 0, [0.25; 5], 0.0), token);
        for requested in [65, 100, 127, 128] {
            assert_eq!(cache.resize(requested).unwrap(), 128);
            hit(cache.lookup(&key, 0));
        }

        // A failed resize keeps the old cache.
        assert!(cache.resize(0).is_err());
        assert_eq!(cache.size(), 128);
    }

    #[test]
    fn stale_token_is_masked() {
        let cache = EvalCache::with_capacity(4).unwrap();
        let key = start_key();
        assert_eq!(cache.hash_mask(), 1);
        // The start key hashes to an odd value, so it lives in bucket 1.
        cache.insert(Entry::new(key, 0, [0.0; 5], 0.0), MissToken(u32::MAX));
        hit(cache.lookup(&key, 0));
    }

    #[cfg(feature = "cache-stats")]
    #[test]
    fn counters_track_usage() {
        let cache = EvalCache::with_capacity(16).unwrap();
        let key = start_key();
        let token = miss(cache.lookup(&key, 0));
        cache.insert(Entry::new(key, 0, [0.0; 5], 0.0), token);
        hit(cache.lookup(&key, 0));

        let stats = cache.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.added, 1);
    }

    #[cfg(not(feature = "cache-stats"))]
    #[test]
    fn counters_disabled() {
        let cache = EvalCache::with_capacity(16).unwrap();
        let key = start_key();
        miss(cache.lookup(&key, 0));
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
