use thiserror::Error;

/// The resource the cache sits in front of
///
/// The cache never interprets handles or errors; it only decides when to call these methods and
/// keeps the handles it gets back. Each populated line owns exactly one handle, which is passed to
/// `release` when the line is repopulated or the cache is torn down. Handles are cloned out to
/// callers, so a clone must not outlive the release of its original.
pub trait BackingStore {
    type Handle: Clone;
    type Error;

    /// Creates a resource of `size` bytes, seeded from `host_content` when given
    fn create(&mut self, size: usize, host_content: Option<&[u8]>) -> Result<Self::Handle, Self::Error>;

    /// Copies `size` bytes of a resource into `destination`
    ///
    /// `blocking` is passed through untouched, the cache waits for the call to return either way
    fn read(&mut self, handle: &Self::Handle, destination: &mut [u8], size: usize, blocking: bool) -> Result<(), Self::Error>;

    /// Frees a resource. Called at most once per handle.
    fn release(&mut self, handle: Self::Handle);
}

/// Handle into a [`HostMemory`] store
///
/// Slots are reused once released, the generation tells a stale handle apart from the buffer now
/// living in its slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferId {
    index: usize,
    generation: u64,
}

impl BufferId {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostMemoryError {
    #[error("buffer {0} has already been released")]
    Released(usize),
    #[error("read of {requested} bytes from a buffer of {available} bytes")]
    OutOfBounds { requested: usize, available: usize },
    #[error("host content of {provided} bytes doesn't fit in a buffer of {size} bytes")]
    ContentTooLarge { provided: usize, size: usize },
}

/// A backing store that keeps every resource in a host-side `Vec<u8>`
///
/// Useful wherever the cache has to be driven without a device, for trace replay and testing.
/// Released buffers are dropped and their slot goes back on a free list for the next create, so the
/// slot table never grows past the peak number of live buffers. A stale handle is detected rather
/// than silently reading someone else's data.
///
/// # Examples
///
/// ```
/// use devcache::backing::{BackingStore, HostMemory};
/// let mut store = HostMemory::default();
/// let handle = store.create(4, Some(&[1, 2, 3, 4])).unwrap();
/// let mut out = [0u8; 4];
/// store.read(&handle, &mut out, 4, true).unwrap();
/// assert_eq!(out, [1, 2, 3, 4]);
/// store.release(handle);
/// assert_eq!(store.live_buffers(), 0);
/// ```
#[derive(Debug, Default)]
pub struct HostMemory {
    slots: Vec<Slot>,
    free: Vec<usize>,
    created: u64,
    released: u64,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    buffer: Option<Vec<u8>>,
}

impl HostMemory {
    pub fn live_buffers(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of slots ever allocated, live or free
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn released(&self) -> u64 {
        self.released
    }

    /// Bytes currently held by live buffers
    pub fn resident_bytes(&self) -> usize {
        self.slots.iter().filter_map(|slot| slot.buffer.as_ref()).map(|b| b.len()).sum()
    }
}

impl BackingStore for HostMemory {
    type Handle = BufferId;
    type Error = HostMemoryError;

    fn create(&mut self, size: usize, host_content: Option<&[u8]>) -> Result<BufferId, HostMemoryError> {
        let mut buffer = vec![0u8; size];
        if let Some(content) = host_content {
            if content.len() > size {
                return Err(HostMemoryError::ContentTooLarge { provided: content.len(), size });
            }
            buffer[..content.len()].copy_from_slice(content);
        }
        self.created += 1;
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.buffer = Some(buffer);
        Ok(BufferId { index, generation: slot.generation })
    }

    fn read(&mut self, handle: &BufferId, destination: &mut [u8], size: usize, _blocking: bool) -> Result<(), HostMemoryError> {
        let buffer = self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.buffer.as_ref())
            .ok_or(HostMemoryError::Released(handle.index))?;
        let available = buffer.len().min(destination.len());
        if size > available {
            return Err(HostMemoryError::OutOfBounds { requested: size, available });
        }
        destination[..size].copy_from_slice(&buffer[..size]);
        Ok(())
    }

    fn release(&mut self, handle: BufferId) {
        let Some(slot) = self.slots.get_mut(handle.index) else {
            return;
        };
        if slot.generation == handle.generation && slot.buffer.take().is_some() {
            slot.generation += 1;
            self.free.push(handle.index);
            self.released += 1;
        }
    }
}
