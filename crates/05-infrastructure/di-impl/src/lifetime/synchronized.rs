//! 同步构建槽
//!
//! 同一个键同一时刻只允许一个线程构建值，其它线程等待构建完成；不同的键互不阻塞。
//! 构建线程可以重入，使循环依赖表现为循环错误而不是死锁。

use infrastructure_common::Instance;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::HashMap;
use std::hash::Hash;
use std::thread::{self, ThreadId};

struct Guarded<S, K> {
    storage: S,
    /// 正在构建的键: 构建线程与重入次数
    building: HashMap<K, (ThreadId, usize)>,
}

pub(crate) struct Synchronized<S, K = ()> {
    state: Mutex<Guarded<S, K>>,
    ready: Condvar,
}

impl<S, K: Eq + Hash + Clone> Synchronized<S, K> {
    pub(crate) fn new(storage: S) -> Self {
        Self {
            state: Mutex::new(Guarded {
                storage,
                building: HashMap::new(),
            }),
            ready: Condvar::new(),
        }
    }

    /// 查看值，不参与构建协调
    pub(crate) fn peek(&self, lookup: impl Fn(&S) -> Option<Instance>) -> Option<Instance> {
        lookup(&self.state.lock().storage)
    }

    /// 修改存储，不参与构建协调
    pub(crate) fn update<R>(&self, change: impl FnOnce(&mut S) -> R) -> R {
        change(&mut self.state.lock().storage)
    }

    /// 获取值；没有值时取得 `key` 的构建权并返回 `None`
    pub(crate) fn acquire(&self, key: &K, lookup: impl Fn(&S) -> Option<Instance>) -> Option<Instance> {
        let current = thread::current().id();
        let mut guard = self.state.lock();
        loop {
            if let Some(value) = lookup(&guard.storage) {
                return Some(value);
            }
            match guard.building.get(key).copied() {
                None => {
                    guard.building.insert(key.clone(), (current, 1));
                    return None;
                }
                Some((owner, depth)) if owner == current => {
                    guard.building.insert(key.clone(), (owner, depth + 1));
                    return None;
                }
                Some(_) => self.ready.wait(&mut guard),
            }
        }
    }

    /// 写入值并交还一层构建权
    pub(crate) fn publish(&self, key: &K, store: impl FnOnce(&mut S)) {
        let mut guard = self.state.lock();
        store(&mut guard.storage);
        Self::leave(&mut guard, key);
        drop(guard);
        self.ready.notify_all();
    }

    /// 构建失败时交还一层构建权
    pub(crate) fn release(&self, key: &K) {
        let mut guard = self.state.lock();
        if Self::leave(&mut guard, key) {
            drop(guard);
            self.ready.notify_all();
        }
    }

    /// 当前线程交还一层构建权，完全交还时返回 `true`
    fn leave(guard: &mut MutexGuard<'_, Guarded<S, K>>, key: &K) -> bool {
        let current = thread::current().id();
        match guard.building.get(key).copied() {
            Some((owner, depth)) if owner == current && depth > 1 => {
                guard.building.insert(key.clone(), (owner, depth - 1));
                false
            }
            Some((owner, _)) if owner == current => {
                guard.building.remove(key);
                true
            }
            _ => false,
        }
    }
}
