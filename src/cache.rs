use std::mem::size_of;
use tracing::{debug, info, trace};
use crate::address::{Address, AddressIndexer};
use crate::backing::BackingStore;
use crate::config::{Associativity, CacheConfig, Geometry};
use crate::error::ConfigurationError;
use crate::line::{CacheLine, CacheSet, LineEntry};
use crate::replacement_policies::{Replacement, ReplacementPolicy};
use crate::stats::{MemoryReport, Statistics};

/// Outcome of [`Cache::read_back`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    /// The line was resident and its data has been copied to the destination
    Success,
    /// The address isn't cached, nothing was read or changed
    Miss,
}

/// A set-associative cache of backing store resources, parameterised by a replacement policy
///
/// The cache avoids creating a backing resource for an address which already has one in the
/// cache. Every line table entry pairs an address (compared by identity, see [`Address`]) with the
/// handle the backing store produced for it.
///
/// The line table is sized once at construction and never grows. Handles are released back to the
/// store when their line is repopulated, and when the cache is torn down or dropped.
///
/// Not thread safe. Callers sharing a cache between threads must serialise access themselves.
///
/// # Examples
///
/// ```
/// use devcache::address::Address;
/// use devcache::backing::HostMemory;
/// use devcache::cache::{Cache, ReadStatus};
/// use devcache::config::{Associativity, CacheConfig, ReplacementPolicyConfig};
///
/// let config = CacheConfig::new(4, 64, Associativity::DirectMapped, ReplacementPolicyConfig::default());
/// let mut cache = Cache::new(&config, HostMemory::default()).unwrap();
///
/// let data = [7u8; 64];
/// let key = Address::of(data.as_ptr());
/// cache.resolve(key, 64, Some(&data), false).unwrap();
/// // Already resident, nothing is created
/// cache.resolve(key, 64, None, false).unwrap();
/// assert_eq!(cache.statistics().mem_copies, 1);
///
/// let mut out = [0u8; 64];
/// assert_eq!(cache.read_back(key, 64, &mut out, true).unwrap(), ReadStatus::Success);
/// assert_eq!(out, data);
/// cache.teardown();
/// ```
pub struct Cache<B: BackingStore, R: ReplacementPolicy = Replacement> {
    indexer: AddressIndexer,
    geometry: Geometry,
    kind: Associativity,
    line_size: usize,
    tag_size: usize,
    sets: Vec<CacheSet<B::Handle>>,
    replacement_policy: R,
    statistics: Statistics,
    backing: B,
}

impl<B: BackingStore> Cache<B> {
    /// Builds a cache using the replacement policy named in the configuration
    ///
    /// # Arguments
    ///
    /// * `config`: The cache configuration, usually resulting from parsing JSON
    /// * `backing`: The store resources are created in
    ///
    /// returns: Result<Cache<B>, ConfigurationError>
    pub fn new(config: &CacheConfig, backing: B) -> Result<Self, ConfigurationError> {
        Self::with_policy(config, Replacement::for_config(config), backing)
    }
}

impl<B: BackingStore, R: ReplacementPolicy> Cache<B, R> {
    /// Builds a cache with a caller-provided replacement policy. The configured policy is ignored.
    pub fn with_policy(config: &CacheConfig, replacement_policy: R, backing: B) -> Result<Self, ConfigurationError> {
        let geometry = config.geometry()?;
        let cache = Self {
            indexer: AddressIndexer::new(geometry.address_bit_shift, geometry.index_bit_mask),
            geometry,
            kind: config.kind,
            line_size: config.line_size,
            tag_size: config.tag_size,
            sets: (0..geometry.number_of_sets).map(|_| CacheSet::new(geometry.lines_per_set)).collect(),
            replacement_policy,
            statistics: Statistics::default(),
            backing,
        };
        let report = cache.memory_report();
        if config.report_memory_usage {
            info!(
                configuration = cache.kind.describe(),
                usable_bytes = report.total_usable_bytes,
                allocated_bytes = report.total_allocated_bytes,
                "cache memory allocation"
            );
        }
        if config.report_memory_percentage {
            info!(percentage = report.usable_percentage(), "usable share of cache memory");
        }
        Ok(cache)
    }

    /// Gets the set an address maps into
    #[inline]
    pub fn index_of(&self, address: Address) -> usize {
        self.indexer.index_of(address)
    }

    /// Looks for the way holding `address` in a set, returning `None` on a miss
    ///
    /// A hit is reported to the replacement policy, so it can update its bookkeeping. A set index
    /// outside the cache is a miss.
    ///
    /// # Arguments
    ///
    /// * `address`: The key to look for
    /// * `set_index`: The set to search, as given by `index_of`
    ///
    /// returns: Option<usize>
    pub fn lookup(&mut self, address: Address, set_index: usize) -> Option<usize> {
        match self.find(address, set_index) {
            Some(way) => {
                self.record_hit(set_index, way);
                trace!(%address, set = set_index, way, "cache hit");
                Some(way)
            }
            None => {
                trace!(%address, set = set_index, "cache miss");
                None
            }
        }
    }

    /// Way holding `address`, without telling the replacement policy
    fn find(&self, address: Address, set_index: usize) -> Option<usize> {
        self.sets.get(set_index).and_then(|set| set.find(address))
    }

    // `way` must come from `find` on the same set
    fn record_hit(&mut self, set_index: usize, way: usize) {
        self.replacement_policy.update_on_hit(&mut self.sets[set_index], way);
    }

    /// Chooses the way to populate in a set after a miss
    pub(crate) fn select_way(&mut self, set_index: usize) -> usize {
        self.replacement_policy.select_victim(&self.sets[set_index])
    }

    /// Makes sure `address` has a backing resource in the cache, and returns its handle
    ///
    /// If the address is resident, it is only recreated when `host_content` is given (the caller
    /// wants the resource refreshed from it) or `force_overwrite` is set. Otherwise a way is chosen
    /// by the replacement policy, and whatever it held is released once the new resource exists.
    ///
    /// Backing store errors are returned as they are, and leave the line, its replacement
    /// bookkeeping and the counters untouched
    ///
    /// # Arguments
    ///
    /// * `address`: The key the resource is cached under
    /// * `size`: Size of the resource in bytes
    /// * `host_content`: Data to seed the resource with, counted as a write transfer
    /// * `force_overwrite`: Recreate the resource even if it is resident
    ///
    /// returns: Result<B::Handle, B::Error>
    pub fn resolve(&mut self, address: Address, size: usize, host_content: Option<&[u8]>, force_overwrite: bool) -> Result<B::Handle, B::Error> {
        let set_index = self.index_of(address);
        let refresh = force_overwrite || host_content.is_some();
        // A refreshed line only counts as used once the new resource exists
        let hit = if refresh {
            self.find(address, set_index)
        } else {
            self.lookup(address, set_index)
        };
        if let (Some(way), false) = (hit, refresh) {
            if let Some(entry) = &self.sets[set_index].lines[way].entry {
                return Ok(entry.handle.clone());
            }
        }
        let way = match hit {
            Some(way) => way,
            None => self.select_way(set_index),
        };
        let handle = match self.backing.create(size, host_content) {
            Ok(handle) => handle,
            Err(e) => {
                debug!(%address, set = set_index, way, "backing store create failed");
                return Err(e);
            }
        };
        self.statistics.record_create(host_content.is_some());
        let set = &mut self.sets[set_index];
        let previous = set.lines[way].entry.replace(LineEntry {
            tag: address,
            handle: handle.clone(),
        });
        match hit {
            Some(_) => {
                self.replacement_policy.update_on_hit(set, way);
                trace!(%address, set = set_index, way, "line refreshed");
            }
            None => self.replacement_policy.update_on_populate(set, way),
        }
        if let Some(previous) = previous {
            if hit.is_none() {
                debug!(%address, evicted = %previous.tag, set = set_index, way, "evicting line");
            }
            self.backing.release(previous.handle);
        }
        Ok(handle)
    }

    /// Copies the resource cached for `address` back into `destination`
    ///
    /// Never populates or evicts anything. On a miss nothing is touched and [`ReadStatus::Miss`]
    /// is returned, it's up to the caller to go to the source directly
    ///
    /// # Arguments
    ///
    /// * `address`: The key the resource is cached under
    /// * `size`: The number of bytes to copy
    /// * `destination`: Host memory to copy into
    /// * `blocking`: Passed through to the backing store
    ///
    /// returns: Result<ReadStatus, B::Error>
    pub fn read_back(&mut self, address: Address, size: usize, destination: &mut [u8], blocking: bool) -> Result<ReadStatus, B::Error> {
        let set_index = self.index_of(address);
        let Some(way) = self.find(address, set_index) else {
            trace!(%address, set = set_index, "cache miss");
            return Ok(ReadStatus::Miss);
        };
        let Some(entry) = &self.sets[set_index].lines[way].entry else {
            return Ok(ReadStatus::Miss);
        };
        if let Err(e) = self.backing.read(&entry.handle, destination, size, blocking) {
            debug!(%address, set = set_index, way, "backing store read failed");
            return Err(e);
        }
        self.record_hit(set_index, way);
        trace!(%address, set = set_index, way, "cache hit");
        self.statistics.record_read();
        Ok(ReadStatus::Success)
    }

    /// Releases every backing resource and frees the cache
    ///
    /// Dropping the cache does the same, this just makes the end of its life explicit
    pub fn teardown(mut self) {
        let released = self.release_all();
        debug!(released, "cache torn down");
    }

    fn release_all(&mut self) -> usize {
        let mut released = 0;
        for set in &mut self.sets {
            for line in &mut set.lines {
                if let Some(entry) = line.entry.take() {
                    self.backing.release(entry.handle);
                    released += 1;
                }
            }
        }
        released
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// Gets the usable and total allocated byte counts of this cache
    pub fn memory_report(&self) -> MemoryReport {
        let total_lines = self.geometry.number_of_sets * self.geometry.lines_per_set;
        let usable = total_lines * self.line_size;
        let allocated = size_of::<Self>()
            + self.geometry.number_of_sets * size_of::<CacheSet<B::Handle>>()
            + total_lines * (size_of::<CacheLine<B::Handle>>() + self.line_size);
        MemoryReport {
            total_usable_bytes: usable as u64,
            total_allocated_bytes: allocated as u64,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn kind(&self) -> Associativity {
        self.kind
    }

    pub fn line_size(&self) -> usize {
        self.line_size
    }

    pub fn tag_size(&self) -> usize {
        self.tag_size
    }

    pub fn set(&self, set_index: usize) -> Option<&CacheSet<B::Handle>> {
        self.sets.get(set_index)
    }

    pub fn line(&self, set_index: usize, way: usize) -> Option<&CacheLine<B::Handle>> {
        self.sets.get(set_index).and_then(|set| set.lines.get(way))
    }

    pub fn valid_line_count(&self) -> usize {
        self.sets.iter().flat_map(|set| set.lines.iter()).filter(|line| line.is_valid()).count()
    }

    /// Gets the number of lines never populated. Useful for analysing cache behaviour or debugging
    pub fn uninitialised_line_count(&self) -> usize {
        self.sets.iter().map(|set| set.ways()).sum::<usize>() - self.valid_line_count()
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    pub fn backing_mut(&mut self) -> &mut B {
        &mut self.backing
    }
}

impl<B: BackingStore, R: ReplacementPolicy> Drop for Cache<B, R> {
    fn drop(&mut self) {
        self.release_all();
    }
}
