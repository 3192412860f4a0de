use serde::Deserialize;
use crate::error::ConfigurationError;

/// A configuration for a single cache
///
/// # Examples
///
/// ```
/// use devcache::config::{Associativity, CacheConfig, ReplacementPolicyConfig};
/// let config: CacheConfig = serde_json::from_str(r#"{
///     "total_lines": 8,
///     "line_size": 64,
///     "kind": "2way",
///     "replacement_policy": "lru"
/// }"#).unwrap();
/// assert_eq!(config.kind, Associativity::TwoWay);
/// assert_eq!(config.replacement_policy, ReplacementPolicyConfig::LeastRecentlyUsed);
/// assert_eq!(config.geometry().unwrap().number_of_sets, 4);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Total number of cache lines, must be a power of two
    pub total_lines: usize,
    /// Bytes of data represented by each line
    pub line_size: usize,
    /// Bytes needed to store a tag. Informational only, tags are always full addresses
    #[serde(default = "default_tag_size")]
    pub tag_size: usize,
    pub kind: Associativity,
    #[serde(default = "ReplacementPolicyConfig::default")]
    pub replacement_policy: ReplacementPolicyConfig,
    /// Log the usable and allocated byte counts when the cache is built
    #[serde(default)]
    pub report_memory_usage: bool,
    /// Log the usable share of the allocated bytes when the cache is built
    #[serde(default)]
    pub report_memory_percentage: bool,
    /// Seed for the random replacement policy, taken from the OS when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Tags are full 64 bit addresses
fn default_tag_size() -> usize {
    std::mem::size_of::<u64>()
}

impl CacheConfig {
    pub fn new(total_lines: usize, line_size: usize, kind: Associativity, replacement_policy: ReplacementPolicyConfig) -> Self {
        Self {
            total_lines,
            line_size,
            tag_size: default_tag_size(),
            kind,
            replacement_policy,
            report_memory_usage: false,
            report_memory_percentage: false,
            seed: None,
        }
    }

    /// Validates the configuration and derives the layout of the line table and the indexing
    /// constants
    pub fn geometry(&self) -> Result<Geometry, ConfigurationError> {
        if !self.total_lines.is_power_of_two() {
            return Err(ConfigurationError::LineCountNotPowerOfTwo(self.total_lines));
        }
        if self.line_size == 0 {
            return Err(ConfigurationError::ZeroLineSize);
        }
        let lines_per_set = self.kind.lines_per_set(self.total_lines);
        if lines_per_set > self.total_lines {
            return Err(ConfigurationError::AssociativityExceedsLines {
                lines_per_set,
                total_lines: self.total_lines,
            });
        }
        let number_of_sets = self.total_lines / lines_per_set;
        // Both counts are powers of two, so the index width is exact
        let index_bit_width = self.total_lines.trailing_zeros() - lines_per_set.trailing_zeros();
        let index_bit_mask = (1u64 << index_bit_width) - 1;
        Ok(Geometry {
            lines_per_set,
            number_of_sets,
            address_bit_shift: self.line_size.trailing_zeros(),
            index_bit_mask,
        })
    }
}

/// The derived shape of a cache
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Geometry {
    pub lines_per_set: usize,
    pub number_of_sets: usize,
    pub address_bit_shift: u32,
    /// Zero for a fully associative cache, which only has one set
    pub index_bit_mask: u64,
}

/// The kind of cache - direct, 2way, 4way, or full
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum Associativity {
    #[serde(alias = "direct")]
    DirectMapped,
    #[serde(alias = "2way")]
    TwoWay,
    #[serde(alias = "4way")]
    FourWay,
    #[serde(alias = "full")]
    FullyAssociative,
}

impl Associativity {
    pub fn lines_per_set(&self, total_lines: usize) -> usize {
        match self {
            Associativity::DirectMapped => 1,
            Associativity::TwoWay => 2,
            Associativity::FourWay => 4,
            Associativity::FullyAssociative => total_lines,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Associativity::DirectMapped => "direct mapped",
            Associativity::TwoWay => "two way associative",
            Associativity::FourWay => "four way associative",
            Associativity::FullyAssociative => "fully associative",
        }
    }
}

/// The replacement policy used once a set is full. Defaults to random.
///
/// Ignored for direct mapped caches, which only ever have one candidate line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum ReplacementPolicyConfig {
    #[serde(alias = "random")]
    Random,
    #[serde(alias = "fifo")]
    FirstInFirstOut,
    #[serde(alias = "lru")]
    LeastRecentlyUsed,
    #[serde(alias = "mru")]
    MostRecentlyUsed,
    #[serde(alias = "lfu")]
    LeastFrequentlyUsed,
    #[serde(alias = "mfu")]
    MostFrequentlyUsed,
}

impl Default for ReplacementPolicyConfig {
    fn default() -> Self {
        ReplacementPolicyConfig::Random
    }
}
