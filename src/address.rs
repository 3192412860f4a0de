use std::fmt;

/// An opaque, caller-supplied key identifying the data a cache line holds
///
/// Keys are compared by identity only. Two addresses referring to identical bytes are still two
/// different keys, and the cache never looks at what an address points to.
///
/// Reusing an address value after the memory behind it has been freed (and possibly handed out
/// again for unrelated data) will produce a false hit if the old entry is still resident. Callers
/// which recycle host buffers must force an overwrite, or pick keys that are never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(u64);

impl Address {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Takes the identity of a host pointer as the key
    ///
    /// # Examples
    ///
    /// ```
    /// use devcache::address::Address;
    /// let buffer = vec![0u8; 64];
    /// let key = Address::of(buffer.as_ptr());
    /// assert_eq!(key, Address::of(buffer.as_ptr()));
    /// ```
    pub fn of<T>(pointer: *const T) -> Self {
        Self(pointer as usize as u64)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Maps an address onto a set index
///
/// The shift discards the bits that address bytes within one line's worth of data, and the mask
/// keeps as many of the remaining low bits as are needed to pick a set. Both are fixed at
/// construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AddressIndexer {
    address_bit_shift: u32,
    index_bit_mask: u64,
}

impl AddressIndexer {
    pub fn new(address_bit_shift: u32, index_bit_mask: u64) -> Self {
        Self {
            address_bit_shift,
            index_bit_mask,
        }
    }

    /// Gets the set index for an address
    ///
    /// # Examples
    ///
    /// ```
    /// use devcache::address::{Address, AddressIndexer};
    /// let indexer = AddressIndexer::new(6, 3);
    /// assert_eq!(indexer.index_of(Address::new(192)), 3);
    /// assert_eq!(indexer.index_of(Address::new(256)), 0);
    /// ```
    #[inline]
    pub fn index_of(&self, address: Address) -> usize {
        ((address.get() >> self.address_bit_shift) & self.index_bit_mask) as usize
    }

    pub fn address_bit_shift(&self) -> u32 {
        self.address_bit_shift
    }

    pub fn index_bit_mask(&self) -> u64 {
        self.index_bit_mask
    }
}
