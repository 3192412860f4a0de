use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::config::{Associativity, CacheConfig, ReplacementPolicyConfig};
use crate::line::CacheSet;

/// A generic trait for implementing new replacement policies. Can be used to parameterise a Cache.
///
/// Policies keep their state in the set itself (the per-line `accessed_order` and the set cursor),
/// so one policy value serves every set of a cache.
pub trait ReplacementPolicy {
    /// Updates the policy when a lookup hits a line
    ///
    /// Not applicable for some policies, a default which does nothing is provided
    ///
    /// # Arguments
    ///
    /// * `set`: The set containing the line which was hit
    /// * `way`: The way of the line within the set
    ///
    /// returns: ()
    fn update_on_hit<H>(&mut self, _set: &mut CacheSet<H>, _way: usize) {}

    /// Used by the cache to choose a way when a new line needs to be populated in a set.
    ///
    /// Selection must not touch the lines themselves. Whatever has to change once the way is
    /// actually replaced belongs in `update_on_populate`, which the cache only calls after the
    /// backing store has produced the new line
    ///
    /// # Arguments
    ///
    /// * `set`: The set to choose a way in
    ///
    /// returns: usize
    fn select_victim<H>(&mut self, set: &CacheSet<H>) -> usize;

    /// Updates the policy after a way chosen by `select_victim` has been repopulated
    ///
    /// # Arguments
    ///
    /// * `set`: The set containing the new line
    /// * `way`: The way which was replaced
    ///
    /// returns: ()
    fn update_on_populate<H>(&mut self, _set: &mut CacheSet<H>, _way: usize) {}
}

#[derive(Default)]
/// NoPolicy is used for direct mapped caches. It does nothing on a hit, and always returns the
/// first (only) way when a new line is requested
///
/// Also the fallback when no replacement is wanted at all, in which case way 0 is always replaced
pub struct NoPolicy;

impl ReplacementPolicy for NoPolicy {
    fn select_victim<H>(&mut self, _set: &CacheSet<H>) -> usize {
        0
    }
}

/// Fills empty ways first, then evicts a uniformly random way
pub struct RandomReplacement {
    rng: StdRng,
}

impl RandomReplacement {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        }
    }
}

impl ReplacementPolicy for RandomReplacement {
    fn select_victim<H>(&mut self, set: &CacheSet<H>) -> usize {
        match set.first_invalid_way() {
            Some(way) => way,
            None => self.rng.gen_range(0..set.ways()),
        }
    }
}

/// Round robin over the ways of each set
///
/// The cursor advances on every replacement, even if the set still has empty ways, so a freshly
/// built set is filled starting from way 1. Hits never move the cursor.
#[derive(Default)]
pub struct FirstInFirstOut;

impl ReplacementPolicy for FirstInFirstOut {
    fn select_victim<H>(&mut self, set: &CacheSet<H>) -> usize {
        ((set.cursor + 1) % set.ways() as u64) as usize
    }

    fn update_on_populate<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        set.cursor = way as u64;
    }
}

/// Least Recently Used replacement policy
///
/// Each set's cursor is a logical clock, and every hit or population stamps the line with the
/// next tick. Empty lines still carry a zero stamp, so they are always picked before any line in
/// use.
#[derive(Default)]
pub struct LeastRecentlyUsed;

impl ReplacementPolicy for LeastRecentlyUsed {
    fn update_on_hit<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        set.stamp(way);
    }

    fn select_victim<H>(&mut self, set: &CacheSet<H>) -> usize {
        set.min_order_way()
    }

    fn update_on_populate<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        set.stamp(way);
    }
}

/// Most Recently Used replacement policy, evicting the line touched last
#[derive(Default)]
pub struct MostRecentlyUsed;

impl ReplacementPolicy for MostRecentlyUsed {
    fn update_on_hit<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        set.stamp(way);
    }

    fn select_victim<H>(&mut self, set: &CacheSet<H>) -> usize {
        set.first_invalid_way().unwrap_or_else(|| set.max_order_way())
    }

    fn update_on_populate<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        set.stamp(way);
    }
}

/// Least frequently used replacement policy
///
/// A freshly populated line starts with a count of one, so empty lines (count zero) win first.
#[derive(Default)]
pub struct LeastFrequentlyUsed;

impl ReplacementPolicy for LeastFrequentlyUsed {
    fn update_on_hit<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        set.lines[way].usage.accessed_order += 1;
    }

    fn select_victim<H>(&mut self, set: &CacheSet<H>) -> usize {
        set.min_order_way()
    }

    fn update_on_populate<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        set.lines[way].usage.accessed_order = 1;
    }
}

/// Most frequently used replacement policy
#[derive(Default)]
pub struct MostFrequentlyUsed;

impl ReplacementPolicy for MostFrequentlyUsed {
    fn update_on_hit<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        set.lines[way].usage.accessed_order += 1;
    }

    fn select_victim<H>(&mut self, set: &CacheSet<H>) -> usize {
        set.first_invalid_way().unwrap_or_else(|| set.max_order_way())
    }

    fn update_on_populate<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        set.lines[way].usage.accessed_order = 1;
    }
}

/// Enum over all the provided policies, chosen once when a cache is built
///
/// Branching explicitly over the concrete types keeps everything visible to the compiler, which
/// can then inline the policy functions into the lookup and allocation paths. A trait object
/// would hide them behind a vtable on every access.
pub enum Replacement {
    Direct(NoPolicy),
    Random(RandomReplacement),
    FirstInFirstOut(FirstInFirstOut),
    LeastRecentlyUsed(LeastRecentlyUsed),
    MostRecentlyUsed(MostRecentlyUsed),
    LeastFrequentlyUsed(LeastFrequentlyUsed),
    MostFrequentlyUsed(MostFrequentlyUsed),
}

impl Replacement {
    /// Resolves the policy for a configuration. Direct mapped caches always get [`NoPolicy`].
    pub fn for_config(config: &CacheConfig) -> Self {
        if config.kind == Associativity::DirectMapped {
            return Replacement::Direct(NoPolicy);
        }
        match config.replacement_policy {
            ReplacementPolicyConfig::Random => Replacement::Random(RandomReplacement::new(config.seed)),
            ReplacementPolicyConfig::FirstInFirstOut => Replacement::FirstInFirstOut(FirstInFirstOut),
            ReplacementPolicyConfig::LeastRecentlyUsed => Replacement::LeastRecentlyUsed(LeastRecentlyUsed),
            ReplacementPolicyConfig::MostRecentlyUsed => Replacement::MostRecentlyUsed(MostRecentlyUsed),
            ReplacementPolicyConfig::LeastFrequentlyUsed => Replacement::LeastFrequentlyUsed(LeastFrequentlyUsed),
            ReplacementPolicyConfig::MostFrequentlyUsed => Replacement::MostFrequentlyUsed(MostFrequentlyUsed),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Replacement::Direct(_) => "direct",
            Replacement::Random(_) => "random",
            Replacement::FirstInFirstOut(_) => "fifo",
            Replacement::LeastRecentlyUsed(_) => "lru",
            Replacement::MostRecentlyUsed(_) => "mru",
            Replacement::LeastFrequentlyUsed(_) => "lfu",
            Replacement::MostFrequentlyUsed(_) => "mfu",
        }
    }
}

impl ReplacementPolicy for Replacement {
    fn update_on_hit<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        match self {
            Replacement::Direct(p) => p.update_on_hit(set, way),
            Replacement::Random(p) => p.update_on_hit(set, way),
            Replacement::FirstInFirstOut(p) => p.update_on_hit(set, way),
            Replacement::LeastRecentlyUsed(p) => p.update_on_hit(set, way),
            Replacement::MostRecentlyUsed(p) => p.update_on_hit(set, way),
            Replacement::LeastFrequentlyUsed(p) => p.update_on_hit(set, way),
            Replacement::MostFrequentlyUsed(p) => p.update_on_hit(set, way),
        }
    }

    fn select_victim<H>(&mut self, set: &CacheSet<H>) -> usize {
        match self {
            Replacement::Direct(p) => p.select_victim(set),
            Replacement::Random(p) => p.select_victim(set),
            Replacement::FirstInFirstOut(p) => p.select_victim(set),
            Replacement::LeastRecentlyUsed(p) => p.select_victim(set),
            Replacement::MostRecentlyUsed(p) => p.select_victim(set),
            Replacement::LeastFrequentlyUsed(p) => p.select_victim(set),
            Replacement::MostFrequentlyUsed(p) => p.select_victim(set),
        }
    }

    fn update_on_populate<H>(&mut self, set: &mut CacheSet<H>, way: usize) {
        match self {
            Replacement::Direct(p) => p.update_on_populate(set, way),
            Replacement::Random(p) => p.update_on_populate(set, way),
            Replacement::FirstInFirstOut(p) => p.update_on_populate(set, way),
            Replacement::LeastRecentlyUsed(p) => p.update_on_populate(set, way),
            Replacement::MostRecentlyUsed(p) => p.update_on_populate(set, way),
            Replacement::LeastFrequentlyUsed(p) => p.update_on_populate(set, way),
            Replacement::MostFrequentlyUsed(p) => p.update_on_populate(set, way),
        }
    }
}
