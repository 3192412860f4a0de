use std::cell::RefCell;
use std::rc::Rc;
use crate::address::Address;
use crate::cache::{Cache, ReadStatus};
use crate::config::{Associativity, ReplacementPolicyConfig};
use crate::line::{CacheSet, LineEntry};
use crate::replacement_policies::{
    FirstInFirstOut, LeastFrequentlyUsed, LeastRecentlyUsed, MostFrequentlyUsed, MostRecentlyUsed, NoPolicy, ReplacementPolicy,
};
use crate::test::{config, RecordingStore, StoreLog};

const ALL_POLICIES: [ReplacementPolicyConfig; 6] = [
    ReplacementPolicyConfig::Random,
    ReplacementPolicyConfig::FirstInFirstOut,
    ReplacementPolicyConfig::LeastRecentlyUsed,
    ReplacementPolicyConfig::MostRecentlyUsed,
    ReplacementPolicyConfig::LeastFrequentlyUsed,
    ReplacementPolicyConfig::MostFrequentlyUsed,
];

fn line_address(i: u64) -> Address {
    Address::new(i * 64)
}

/// A single set of four ways
fn fully_associative(policy: ReplacementPolicyConfig) -> (Cache<RecordingStore>, Rc<RefCell<StoreLog>>) {
    let (store, log) = RecordingStore::new();
    (Cache::new(&config(4, Associativity::FullyAssociative, policy), store).unwrap(), log)
}

fn fill<R: ReplacementPolicy>(cache: &mut Cache<RecordingStore, R>, count: u64) {
    for i in 0..count {
        cache.resolve(line_address(i), 64, None, false).unwrap();
    }
}

fn is_resident(cache: &mut Cache<RecordingStore>, address: Address) -> bool {
    let mut out = [0u8; 64];
    cache.read_back(address, 64, &mut out, true).unwrap() == ReadStatus::Success
}

#[test]
fn one_more_than_the_ways_evicts_exactly_once() {
    for policy in ALL_POLICIES {
        let (store, log) = RecordingStore::new();
        // Two sets of four ways, bit 6 of the address picks the set
        let mut cache = Cache::new(&config(8, Associativity::FourWay, policy), store).unwrap();
        for i in 0..4u64 {
            let address = Address::new(i * 128);
            assert_eq!(cache.index_of(address), 0);
            cache.resolve(address, 64, None, false).unwrap();
        }
        assert_eq!(cache.valid_line_count(), 4, "{policy:?}");
        assert!(log.borrow().released.is_empty(), "{policy:?}");

        cache.resolve(Address::new(4 * 128), 64, None, false).unwrap();
        assert_eq!(log.borrow().released.len(), 1, "{policy:?}");
        assert_eq!(cache.valid_line_count(), 4, "{policy:?}");
        assert_eq!(cache.set(1).unwrap().lines().iter().filter(|l| l.is_valid()).count(), 0);
    }
}

#[test]
fn fifo_evicts_in_insertion_order() {
    let (mut cache, log) = fully_associative(ReplacementPolicyConfig::FirstInFirstOut);
    fill(&mut cache, 4);
    // The cursor moves before every fill, so the first line lands in way 1
    assert_eq!(cache.line(0, 1).unwrap().tag(), Some(line_address(0)));
    assert_eq!(cache.line(0, 0).unwrap().tag(), Some(line_address(3)));

    // Hits never move the cursor
    for _ in 0..3 {
        cache.resolve(line_address(0), 64, None, false).unwrap();
        assert!(is_resident(&mut cache, line_address(0)));
    }
    for i in 4..8 {
        cache.resolve(line_address(i), 64, None, false).unwrap();
    }
    assert_eq!(log.borrow().released, vec![0, 1, 2, 3]);
    for i in 0..4 {
        assert!(!is_resident(&mut cache, line_address(i)));
    }
}

#[test]
fn fifo_cursor_wraps() {
    let (mut cache, _) = fully_associative(ReplacementPolicyConfig::FirstInFirstOut);
    fill(&mut cache, 4);
    assert_eq!(cache.set(0).unwrap().cursor(), 0);
    cache.resolve(line_address(4), 64, None, false).unwrap();
    assert_eq!(cache.set(0).unwrap().cursor(), 1);
    assert_eq!(cache.line(0, 1).unwrap().tag(), Some(line_address(4)));
}

#[test]
fn lru_keeps_the_line_just_used() {
    let (mut cache, log) = fully_associative(ReplacementPolicyConfig::LeastRecentlyUsed);
    fill(&mut cache, 4);
    let orders: Vec<u64> = cache.set(0).unwrap().lines().iter().map(|l| l.usage().accessed_order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);

    cache.resolve(line_address(0), 64, None, false).unwrap();
    assert_eq!(cache.line(0, 0).unwrap().usage().accessed_order, 5);
    cache.resolve(line_address(4), 64, None, false).unwrap();

    assert_eq!(log.borrow().released, vec![1]);
    assert!(is_resident(&mut cache, line_address(0)));
    assert!(!is_resident(&mut cache, line_address(1)));
}

#[test]
fn lru_read_back_counts_as_use() {
    let (mut cache, _) = fully_associative(ReplacementPolicyConfig::LeastRecentlyUsed);
    fill(&mut cache, 4);
    assert!(is_resident(&mut cache, line_address(0)));
    assert!(is_resident(&mut cache, line_address(1)));
    cache.resolve(line_address(4), 64, None, false).unwrap();
    assert_eq!(cache.line(0, 2).unwrap().tag(), Some(line_address(4)));
}

#[test]
fn mru_evicts_the_line_just_used() {
    let (mut cache, log) = fully_associative(ReplacementPolicyConfig::MostRecentlyUsed);
    fill(&mut cache, 4);
    cache.resolve(line_address(1), 64, None, false).unwrap();
    cache.resolve(line_address(4), 64, None, false).unwrap();

    assert_eq!(log.borrow().released, vec![1]);
    assert_eq!(cache.line(0, 1).unwrap().tag(), Some(line_address(4)));
    assert!(is_resident(&mut cache, line_address(0)));
    assert!(!is_resident(&mut cache, line_address(1)));
}

#[test]
fn lfu_counts_hits_and_evicts_the_least_used() {
    let (mut cache, log) = fully_associative(ReplacementPolicyConfig::LeastFrequentlyUsed);
    fill(&mut cache, 4);
    let mut last = cache.line(0, 2).unwrap().usage().accessed_order;
    assert_eq!(last, 1);
    for _ in 0..3 {
        cache.resolve(line_address(2), 64, None, false).unwrap();
        let count = cache.line(0, 2).unwrap().usage().accessed_order;
        assert_eq!(count, last + 1);
        last = count;
    }
    cache.resolve(line_address(0), 64, None, false).unwrap();

    // Ways 1 and 3 tie at one hit, the lower way goes
    cache.resolve(line_address(4), 64, None, false).unwrap();
    assert_eq!(log.borrow().released, vec![1]);
    assert_eq!(cache.line(0, 1).unwrap().tag(), Some(line_address(4)));
    assert_eq!(cache.line(0, 1).unwrap().usage().accessed_order, 1);
}

#[test]
fn mfu_evicts_the_most_used() {
    let (mut cache, log) = fully_associative(ReplacementPolicyConfig::MostFrequentlyUsed);
    fill(&mut cache, 4);
    for _ in 0..3 {
        cache.resolve(line_address(2), 64, None, false).unwrap();
    }
    assert_eq!(cache.line(0, 2).unwrap().usage().accessed_order, 4);
    cache.resolve(line_address(4), 64, None, false).unwrap();

    assert_eq!(log.borrow().released, vec![2]);
    assert_eq!(cache.line(0, 2).unwrap().tag(), Some(line_address(4)));
    assert_eq!(cache.line(0, 2).unwrap().usage().accessed_order, 1);
}

#[test]
fn mru_and_mfu_fill_empty_ways_first() {
    for policy in [ReplacementPolicyConfig::MostRecentlyUsed, ReplacementPolicyConfig::MostFrequentlyUsed] {
        let (mut cache, _) = fully_associative(policy);
        fill(&mut cache, 2);
        cache.resolve(line_address(0), 64, None, false).unwrap();
        cache.resolve(line_address(2), 64, None, false).unwrap();
        assert_eq!(cache.line(0, 2).unwrap().tag(), Some(line_address(2)), "{policy:?}");
        assert_eq!(cache.valid_line_count(), 3);
    }
}

#[test]
fn mfu_tie_evicts_the_lowest_way() {
    let (mut cache, log) = fully_associative(ReplacementPolicyConfig::MostFrequentlyUsed);
    fill(&mut cache, 4);
    cache.resolve(line_address(4), 64, None, false).unwrap();
    assert_eq!(log.borrow().released, vec![0]);
    assert_eq!(cache.line(0, 0).unwrap().tag(), Some(line_address(4)));
}

/// A full set whose lines carry the given `accessed_order` values
fn full_set(orders: &[u64]) -> CacheSet<usize> {
    let mut set = CacheSet::new(orders.len());
    for (way, (line, order)) in set.lines.iter_mut().zip(orders).enumerate() {
        line.entry = Some(LineEntry { tag: line_address(way as u64), handle: way });
        line.usage.accessed_order = *order;
    }
    set
}

#[test]
fn ties_go_to_the_lowest_way() {
    let equal = full_set(&[3, 3, 3, 3]);
    assert_eq!(MostRecentlyUsed.select_victim(&equal), 0);
    assert_eq!(MostFrequentlyUsed.select_victim(&equal), 0);
    assert_eq!(LeastRecentlyUsed.select_victim(&equal), 0);
    assert_eq!(LeastFrequentlyUsed.select_victim(&equal), 0);

    let split = full_set(&[2, 5, 2, 5]);
    assert_eq!(MostRecentlyUsed.select_victim(&split), 1);
    assert_eq!(MostFrequentlyUsed.select_victim(&split), 1);
    assert_eq!(LeastRecentlyUsed.select_victim(&split), 0);
    assert_eq!(LeastFrequentlyUsed.select_victim(&split), 0);
}

#[test]
fn random_fills_empty_ways_then_evicts_one() {
    let (mut cache, log) = fully_associative(ReplacementPolicyConfig::Random);
    fill(&mut cache, 4);
    for way in 0..4u64 {
        assert_eq!(cache.line(0, way as usize).unwrap().tag(), Some(line_address(way)));
    }
    cache.resolve(line_address(4), 64, None, false).unwrap();
    assert_eq!(log.borrow().released.len(), 1);
    let evicted = (0..4).filter(|&i| !is_resident(&mut cache, line_address(i))).count();
    assert_eq!(evicted, 1);
    assert!(is_resident(&mut cache, line_address(4)));
}

#[test]
fn seeded_random_is_reproducible() {
    let victims = || {
        let (mut cache, log) = fully_associative(ReplacementPolicyConfig::Random);
        fill(&mut cache, 16);
        let released = log.borrow().released.clone();
        released
    };
    assert_eq!(victims(), victims());
}

#[test]
fn custom_policies_can_be_plugged_in() {
    let (store, log) = RecordingStore::new();
    let config = config(4, Associativity::FullyAssociative, ReplacementPolicyConfig::Random);
    let mut cache = Cache::with_policy(&config, NoPolicy, store).unwrap();
    fill(&mut cache, 3);
    // Without replacement every miss lands in way 0
    assert_eq!(cache.valid_line_count(), 1);
    assert_eq!(log.borrow().released, vec![0, 1]);
}

#[test]
fn policies_select_without_touching_lines() {
    let (mut cache, _) = fully_associative(ReplacementPolicyConfig::LeastRecentlyUsed);
    fill(&mut cache, 4);
    let set = cache.set(0).unwrap();
    let before: Vec<u64> = set.lines().iter().map(|l| l.usage().accessed_order).collect();
    let mut lru = LeastRecentlyUsed;
    let mut fifo = FirstInFirstOut;
    assert_eq!(lru.select_victim(set), 0);
    assert_eq!(fifo.select_victim(set), 1);
    let after: Vec<u64> = set.lines().iter().map(|l| l.usage().accessed_order).collect();
    assert_eq!(before, after);
    assert_eq!(cache.select_way(0), 0);
}
