//! Engine struct acts as a simplified API for evaluating positions through the evaluation cache.

use std::sync::Arc;

use log::{debug, info};

use crate::board::Board;
use crate::cache::{CacheStats, Entry, EvalCache, Lookup};
use crate::coretypes::{Variation, NUM_OUTPUTS};
use crate::error::{self, ErrorKind};
use crate::evalcontext::{eval_key, CubeInfo, EvalContext};
use crate::key::PackedKey;

/// Cache size setting used when none is given, 2^19 entries.
pub const CACHE_SIZE_DEFAULT: u32 = 3;
/// Largest cache size setting, 2^23 entries.
pub const CACHE_SIZE_MAX: u32 = 7;

const MIB: usize = 1 << 20;

/// Entries of a cache size setting, 0 for a disabled cache.
pub const fn setting_to_entries(setting: u32) -> usize {
    match setting {
        0 => 0,
        n => 1 << (n + 16),
    }
}

/// Megabytes taken by the cache of a size setting.
pub fn cache_megabytes(setting: u32) -> usize {
    match setting {
        0 => 0,
        n => (1usize << (n + 15)) * EvalCache::bucket_bytes() / MIB,
    }
}

/// Evaluator produces the outputs of a position, typically from a neural net.
/// Outputs are win, win gammon, win backgammon, lose gammon, lose backgammon,
/// from the perspective of the side on roll.
pub trait Evaluator {
    fn evaluate(
        &mut self,
        board: &Board,
        cube_info: &CubeInfo,
        context: &EvalContext,
        plies: u8,
    ) -> error::Result<[f32; NUM_OUTPUTS]>;
}

/// Any closure with the signature of `Evaluator::evaluate` is an Evaluator.
impl<F> Evaluator for F
where
    F: FnMut(&Board, &CubeInfo, &EvalContext, u8) -> error::Result<[f32; NUM_OUTPUTS]>,
{
    fn evaluate(
        &mut self,
        board: &Board,
        cube_info: &CubeInfo,
        context: &EvalContext,
        plies: u8,
    ) -> error::Result<[f32; NUM_OUTPUTS]> {
        self(board, cube_info, context, plies)
    }
}

/// EngineBuilder allows for parameters of an Engine to be set and built once,
/// avoiding repeating costly initialization steps of making then changing an Engine.
///
/// Default values:
///
/// * `cache_entries`: 2^19
/// * `variation`: Standard
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EngineBuilder {
    cache_entries: usize,
    variation: Variation,
}

impl EngineBuilder {
    /// Create a new default EngineBuilder.
    pub fn new() -> Self {
        Self {
            cache_entries: setting_to_entries(CACHE_SIZE_DEFAULT),
            variation: Variation::Standard,
        }
    }

    /// Create and return a new Engine.
    /// Fails if the cache size is invalid or its memory cannot be allocated.
    pub fn build(&self) -> error::Result<Engine> {
        let cache = match self.cache_entries {
            0 => None,
            entries => Some(Arc::new(EvalCache::with_capacity(entries)?)),
        };
        info!(
            "engine ready: {} variation, {} cache entries",
            self.variation,
            cache.as_ref().map_or(0, |cache| cache.size())
        );

        Ok(Engine {
            cache,
            variation: self.variation,
        })
    }

    /// Set the engine's initial cache capacity in entries. 0 disables the cache.
    pub fn cache_entries(mut self, cache_entries: usize) -> Self {
        self.cache_entries = cache_entries;
        self
    }

    /// Set the engine's initial cache capacity from a size setting.
    pub fn cache_size_setting(mut self, setting: u32) -> Self {
        self.cache_entries = setting_to_entries(setting);
        self
    }

    /// Set the engine's variation.
    pub fn variation(mut self, variation: Variation) -> Self {
        self.variation = variation;
        self
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine evaluates positions through a shared evaluation cache.
/// The cache may be handed to worker threads, which evaluate concurrently.
/// Resizing or flushing needs every handed out reference to be dropped first.
#[derive(Debug)]
pub struct Engine {
    cache: Option<Arc<EvalCache>>,
    variation: Variation,
}

impl Engine {
    /// Returns the engine's variation.
    pub fn variation(&self) -> Variation {
        self.variation
    }

    /// Set the engine's variation.
    pub fn set_variation(&mut self, variation: Variation) {
        self.variation = variation;
    }

    /// Starting board of the engine's variation.
    pub fn start_position(&self) -> Board {
        Board::start_position(self.variation)
    }

    /// Returns reference to engine's evaluation cache, None if it is disabled.
    pub fn cache(&self) -> Option<&EvalCache> {
        self.cache.as_deref()
    }

    /// Returns a new reference to the evaluation cache for use by another thread.
    pub fn cache_handle(&self) -> Option<Arc<EvalCache>> {
        self.cache.clone()
    }

    /// Number of cache entries, 0 when disabled.
    pub fn cache_entries(&self) -> u32 {
        self.cache().map_or(0, EvalCache::size)
    }

    /// Returns the cache counters, all zero when disabled.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache().map(EvalCache::stats).unwrap_or_default()
    }

    /// Size setting matching the current cache, None if the size is not one of the settings.
    pub fn cache_size_setting(&self) -> Option<u32> {
        let entries = self.cache_entries() as usize;
        (0..=CACHE_SIZE_MAX).find(|&setting| setting_to_entries(setting) == entries)
    }

    /// Evaluate a board, answering from the cache where possible.
    /// Noisy contexts and a disabled cache always call the evaluator.
    /// On a miss the result is stored with its cubeful equity zeroed.
    pub fn evaluate<E>(
        &self,
        evaluator: &mut E,
        board: &Board,
        cube_info: &CubeInfo,
        context: &EvalContext,
    ) -> error::Result<[f32; NUM_OUTPUTS]>
    where
        E: Evaluator + ?Sized,
    {
        let plies = context.plies;
        let cache = match &self.cache {
            Some(cache) if !context.is_noisy() => cache,
            _ => return evaluator.evaluate(board, cube_info, context, plies),
        };

        let key = PackedKey::from(board);
        let context_id = eval_key(context, plies, cube_info, false);

        match cache.lookup(&key, context_id) {
            Lookup::Hit(evaluation) => Ok(evaluation.outputs),
            Lookup::Miss(token) => {
                let outputs = evaluator.evaluate(board, cube_info, context, plies)?;
                cache.insert(Entry::new(key, context_id, outputs, 0.0), token);
                Ok(outputs)
            }
        }
    }

    /// Attempt to set a new cache capacity in entries, 0 disables the cache.
    /// The cache is replaced only if there is exactly one reference to it.
    /// Returns Ok(new size) on success or Err if no change was made.
    pub fn try_resize_cache(&mut self, entries: usize) -> error::Result<u32> {
        if let Some(cache) = self.cache.as_mut() {
            let cache = Arc::get_mut(cache).ok_or(ErrorKind::EngineCacheInUse)?;
            if entries > 0 {
                return cache.resize(entries);
            }
        }

        self.cache = match entries {
            0 => None,
            entries => Some(Arc::new(EvalCache::with_capacity(entries)?)),
        };
        debug!("engine cache set to {} entries", self.cache_entries());
        Ok(self.cache_entries())
    }

    /// Attempt to set the cache capacity from a size setting.
    pub fn try_set_cache_size_setting(&mut self, setting: u32) -> error::Result<u32> {
        if setting > CACHE_SIZE_MAX {
            let message = format!("setting {setting}, expected 0..={CACHE_SIZE_MAX}");
            return Err((ErrorKind::CacheSizeInvalid, message).into());
        }
        self.try_resize_cache(setting_to_entries(setting))
    }

    /// Attempt to flush the cache. The cache is flushed only if there
    /// are no other Arcs to it.
    /// Returns Ok on success or Err if the cache was not flushed.
    pub fn try_flush_cache(&mut self) -> error::Result<()> {
        match self.cache.as_mut() {
            Some(cache) => Arc::get_mut(cache)
                .map(EvalCache::flush)
                .ok_or(ErrorKind::EngineCacheInUse.into()),
            None => Ok(()),
        }
    }
}
