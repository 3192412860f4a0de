use crate::address::Address;

/// Per-line bookkeeping used by the replacement policies
///
/// For LRU and MRU `accessed_order` is a timestamp drawn from the set's cursor, for LFU and MFU it
/// is a hit counter. Random and FIFO leave it at zero.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct UsageMetadata {
    pub accessed_order: u64,
}

/// What a populated line holds: the key it was populated for and the backing resource
#[derive(Debug)]
pub struct LineEntry<H> {
    pub tag: Address,
    pub handle: H,
}

/// A single cache line
///
/// A line without an entry has never been populated and is invalid. Once valid, a line stays
/// valid; replacing it swaps the entry in place.
#[derive(Debug)]
pub struct CacheLine<H> {
    pub(crate) entry: Option<LineEntry<H>>,
    pub(crate) usage: UsageMetadata,
}

impl<H> CacheLine<H> {
    pub(crate) fn empty() -> Self {
        Self {
            entry: None,
            usage: UsageMetadata::default(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.entry.is_some()
    }

    pub fn tag(&self) -> Option<Address> {
        self.entry.as_ref().map(|e| e.tag)
    }

    pub fn handle(&self) -> Option<&H> {
        self.entry.as_ref().map(|e| &e.handle)
    }

    pub fn usage(&self) -> UsageMetadata {
        self.usage
    }

    #[inline]
    pub(crate) fn holds(&self, address: Address) -> bool {
        matches!(&self.entry, Some(entry) if entry.tag == address)
    }
}

/// A group of lines an address can map into, plus the set's replacement cursor
///
/// The cursor is the FIFO next-victim pointer, and the timestamp source for LRU and MRU.
#[derive(Debug)]
pub struct CacheSet<H> {
    pub(crate) lines: Vec<CacheLine<H>>,
    pub(crate) cursor: u64,
}

impl<H> CacheSet<H> {
    pub(crate) fn new(lines_per_set: usize) -> Self {
        Self {
            lines: (0..lines_per_set).map(|_| CacheLine::empty()).collect(),
            cursor: 0,
        }
    }

    pub fn lines(&self) -> &[CacheLine<H>] {
        &self.lines
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn ways(&self) -> usize {
        self.lines.len()
    }

    /// Way holding `address`, if any
    pub(crate) fn find(&self, address: Address) -> Option<usize> {
        self.lines.iter().position(|line| line.holds(address))
    }

    /// First way which has never been populated, if any
    pub(crate) fn first_invalid_way(&self) -> Option<usize> {
        self.lines.iter().position(|line| !line.is_valid())
    }

    // Manual loops, ties must go to the lowest way

    /// Lowest way holding the smallest `accessed_order`
    pub(crate) fn min_order_way(&self) -> usize {
        let mut min_index = 0;
        let mut way = 1;
        while way < self.lines.len() {
            if self.lines[way].usage.accessed_order < self.lines[min_index].usage.accessed_order {
                min_index = way;
            }
            way += 1;
        }
        min_index
    }

    /// Lowest way holding the largest `accessed_order`
    pub(crate) fn max_order_way(&self) -> usize {
        let mut max_index = 0;
        let mut way = 1;
        while way < self.lines.len() {
            if self.lines[way].usage.accessed_order > self.lines[max_index].usage.accessed_order {
                max_index = way;
            }
            way += 1;
        }
        max_index
    }

    /// Advances the cursor and stamps the way with the new value
    pub(crate) fn stamp(&mut self, way: usize) {
        self.cursor += 1;
        self.lines[way].usage.accessed_order = self.cursor;
    }
}
