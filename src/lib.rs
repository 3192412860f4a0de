//! # DevCache
//!
//! DevCache is a software managed, set-associative cache for expensive backing resources, such as
//! buffers allocated on an accelerator and filled from host memory
//!
//! It keeps a fixed table of cache lines, each pairing a caller-supplied address with the handle
//! of the resource created for it. Resolving an address that is already resident hands back the
//! existing handle instead of creating and transferring the data again. Direct mapped, 2 way, 4 way
//! and fully associative layouts are supported, with random, FIFO, LRU, MRU, LFU and MFU
//! replacement
//!
//! The backing store is injected through the [`backing::BackingStore`] trait, so the cache itself
//! knows nothing about devices or transports

/// Contains the address key type and the indexer mapping addresses onto sets
pub mod address;

/// Contains the backing store interface, and a host memory implementation of it
pub mod backing;

/// Contains the implementation of the cache
pub mod cache;

/// Contains the cache configuration, which can be deserialised from JSON
pub mod config;

pub mod error;

/// Contains trace file helpers
pub mod io;

/// Contains the line table types
pub mod line;

/// Contains the provided replacement policies, with a trait for implementing custom replacement
/// policies
pub mod replacement_policies;

/// Contains the trace replayer used to drive a cache without a real backing store
pub mod simulator;

pub mod stats;

#[cfg(test)]
mod test;

pub use address::Address;
pub use backing::BackingStore;
pub use cache::{Cache, ReadStatus};
pub use config::{Associativity, CacheConfig, ReplacementPolicyConfig};
pub use error::ConfigurationError;
pub use stats::Statistics;
