use ahash::AHashSet;
use kset::{KSet, successor};
use rand::{Rng, thread_rng};
use serde::{Deserialize, Serialize};
use shumai::{ShumaiBench, config};
use std::{cell::UnsafeCell, collections::BTreeSet, fmt::Display, ops::Bound};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Serialize, Clone, Copy, Debug, Deserialize)]
pub enum Workload {
    ReadOnly,
    Successor,
    InsertOnly,
}

impl Display for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Serialize, Clone, Copy, Debug, Deserialize)]
pub enum IndexType {
    SingleHashSet,
    BTree,
    KSet,
}

impl Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[config(path = "bench/benchmark.toml")]
pub struct Basic {
    pub name: String,
    pub threads: Vec<usize>,
    pub time: usize,
    #[matrix]
    pub workload: Workload,
    #[matrix]
    pub index_type: IndexType,
}

struct TestBench<Index: SetIndex> {
    index: Index,
    initial_cnt: usize,
}

/// All indexes here are single threaded; the benchmark must run with one thread.
trait SetIndex: Send + Sync {
    fn insert(&self, key: i64);
    fn contains(&self, key: i64) -> bool;
    fn successor(&self, key: i64) -> Option<i64>;
}

struct BTreeSetWrapper {
    set: UnsafeCell<BTreeSet<i64>>, // only allow single thread access
}

unsafe impl Send for BTreeSetWrapper {}
unsafe impl Sync for BTreeSetWrapper {}

impl SetIndex for BTreeSetWrapper {
    fn insert(&self, key: i64) {
        unsafe {
            (*self.set.get()).insert(key);
        }
    }

    fn contains(&self, key: i64) -> bool {
        unsafe { (*self.set.get()).contains(&key) }
    }

    fn successor(&self, key: i64) -> Option<i64> {
        unsafe {
            (*self.set.get())
                .range((Bound::Excluded(key), Bound::Unbounded))
                .next()
                .copied()
        }
    }
}

/// The best a single thread can do for point lookups, without any order.
struct SingleThreadHashSet {
    set: UnsafeCell<AHashSet<i64>>, // only allow single thread access
}

unsafe impl Send for SingleThreadHashSet {}
unsafe impl Sync for SingleThreadHashSet {}

impl SetIndex for SingleThreadHashSet {
    fn insert(&self, key: i64) {
        unsafe {
            (*self.set.get()).insert(key);
        }
    }

    fn contains(&self, key: i64) -> bool {
        unsafe { (*self.set.get()).contains(&key) }
    }

    fn successor(&self, _key: i64) -> Option<i64> {
        unimplemented!("SingleThreadHashSet has no order")
    }
}

struct KSetWrapper {
    set: UnsafeCell<KSet>, // only allow single thread access
}

unsafe impl Send for KSetWrapper {}
unsafe impl Sync for KSetWrapper {}

impl SetIndex for KSetWrapper {
    fn insert(&self, key: i64) {
        unsafe {
            (*self.set.get()).insert(key).unwrap();
        }
    }

    fn contains(&self, key: i64) -> bool {
        unsafe { (*self.set.get()).contains(key) }
    }

    fn successor(&self, key: i64) -> Option<i64> {
        let set = unsafe { &*self.set.get() };
        let (node, idx, found) = set.find(key);
        if !found {
            return None;
        }
        successor(node, idx).map(|(_, _, v)| v)
    }
}

impl<Index: SetIndex> ShumaiBench for TestBench<Index> {
    type Config = Basic;
    type Result = usize;

    fn load(&mut self) -> Option<serde_json::Value> {
        // ascending keys would only grow the rightmost spine
        for i in 0..self.initial_cnt {
            self.index.insert(hash_key(i));
        }
        None
    }

    fn run(&self, context: shumai::Context<Self::Config>) -> Self::Result {
        let mut op_cnt = 0;
        let mut rng = thread_rng();

        context.wait_for_start();

        let mut i = 0;
        while context.is_running() {
            match context.config.workload {
                Workload::ReadOnly => {
                    if i == self.initial_cnt {
                        i = 0;
                    }
                    assert!(self.index.contains(hash_key(i)));
                    i += 1;
                }
                Workload::Successor => {
                    let key = hash_key(rng.gen_range(0..self.initial_cnt));
                    if let Some(next) = self.index.successor(key) {
                        assert!(next > key);
                    }
                }
                Workload::InsertOnly => {
                    self.index.insert(rng.r#gen::<i64>());
                }
            }

            op_cnt += 1;
        }
        op_cnt
    }

    fn cleanup(&mut self) -> Option<serde_json::Value> {
        None
    }
}

fn hash_key(key: usize) -> i64 {
    const MULTIPLIER: u64 = 0x9e3779b97f4a7c15;
    (key as u64).wrapping_mul(MULTIPLIER) as i64
}

fn main() {
    let config = Basic::load().expect("Failed to parse config!");
    let repeat = 3;
    let initial_cnt = 10_000_000;

    for c in config.iter() {
        if c.threads.len() > 1 || c.threads[0] != 1 {
            panic!("{} only supports a single thread!", c.index_type);
        }
        match c.index_type {
            IndexType::BTree => {
                let mut test_bench = TestBench {
                    index: BTreeSetWrapper {
                        set: UnsafeCell::new(BTreeSet::new()),
                    },
                    initial_cnt,
                };
                let result = shumai::run(&mut test_bench, c, repeat);
                result.write_json().unwrap();
            }
            IndexType::SingleHashSet => {
                if let Workload::Successor = c.workload {
                    continue;
                }
                let mut test_bench = TestBench {
                    index: SingleThreadHashSet {
                        set: UnsafeCell::new(AHashSet::with_capacity(initial_cnt)),
                    },
                    initial_cnt,
                };
                let result = shumai::run(&mut test_bench, c, repeat);
                result.write_json().unwrap();
            }
            IndexType::KSet => {
                let mut test_bench = TestBench {
                    index: KSetWrapper {
                        set: UnsafeCell::new(KSet::default()),
                    },
                    initial_cnt,
                };
                let result = shumai::run(&mut test_bench, c, repeat);
                result.write_json().unwrap();
            }
        }
    }
}
