use serde::{Deserialize, Serialize};

/// Transfer counters for one cache. Each only ever increases.
///
/// `mem_copies` counts every successful backing store create or read, `write_transfers` the creates
/// which were seeded from host content, and `read_transfers` the successful reads back to the host.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Statistics {
    pub mem_copies: u64,
    pub read_transfers: u64,
    pub write_transfers: u64,
}

impl Statistics {
    pub(crate) fn record_create(&mut self, seeded: bool) {
        self.mem_copies += 1;
        if seeded {
            self.write_transfers += 1;
        }
    }

    pub(crate) fn record_read(&mut self) {
        self.mem_copies += 1;
        self.read_transfers += 1;
    }
}

/// How much of the memory a cache occupies is usable line data
///
/// Purely diagnostic. The allocated figure is the size of the cache's own bookkeeping plus the
/// line data it represents, the backing store's own overhead is not known to the cache.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct MemoryReport {
    pub total_usable_bytes: u64,
    pub total_allocated_bytes: u64,
}

impl MemoryReport {
    pub fn usable_percentage(&self) -> f64 {
        if self.total_allocated_bytes == 0 {
            return 0.0;
        }
        self.total_usable_bytes as f64 / self.total_allocated_bytes as f64 * 100.0
    }
}
