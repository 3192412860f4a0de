use std::cell::RefCell;
use std::rc::Rc;
use crate::backing::BackingStore;
use crate::config::{Associativity, CacheConfig, ReplacementPolicyConfig};

mod policy_tests;

/// Everything a [`RecordingStore`] has been asked to do
#[derive(Debug, Default)]
pub struct StoreLog {
    pub created: Vec<(usize, usize, bool)>,
    pub reads: Vec<usize>,
    pub released: Vec<usize>,
    pub fail_create: bool,
    pub fail_read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreFailure;

/// Backing store which hands out numbered handles and logs every call
pub struct RecordingStore {
    log: Rc<RefCell<StoreLog>>,
    next: usize,
}

impl RecordingStore {
    pub fn new() -> (Self, Rc<RefCell<StoreLog>>) {
        let log = Rc::new(RefCell::new(StoreLog::default()));
        (Self { log: log.clone(), next: 0 }, log)
    }
}

impl BackingStore for RecordingStore {
    type Handle = usize;
    type Error = StoreFailure;

    fn create(&mut self, size: usize, host_content: Option<&[u8]>) -> Result<usize, StoreFailure> {
        let mut log = self.log.borrow_mut();
        if log.fail_create {
            return Err(StoreFailure);
        }
        let handle = self.next;
        self.next += 1;
        log.created.push((handle, size, host_content.is_some()));
        Ok(handle)
    }

    fn read(&mut self, handle: &usize, destination: &mut [u8], size: usize, _blocking: bool) -> Result<(), StoreFailure> {
        let mut log = self.log.borrow_mut();
        if log.fail_read {
            return Err(StoreFailure);
        }
        log.reads.push(*handle);
        destination[..size].fill(*handle as u8);
        Ok(())
    }

    fn release(&mut self, handle: usize) {
        self.log.borrow_mut().released.push(handle);
    }
}

pub fn config(total_lines: usize, kind: Associativity, policy: ReplacementPolicyConfig) -> CacheConfig {
    let mut config = CacheConfig::new(total_lines, 64, kind, policy);
    config.seed = Some(7);
    config
}
