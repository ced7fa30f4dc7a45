//! 按作用域保存值的开放寻址表
//!
//! 表满时扩容到下一个素数大小，线性探测；删除时重新放置同一探测簇中后面的条目。

use infrastructure_common::Instance;
use uuid::Uuid;

const INITIAL_CAPACITY: usize = 3;

struct Entry {
    key: Uuid,
    value: Instance,
}

pub(crate) struct ScopeTable {
    entries: Vec<Option<Entry>>,
    count: usize,
}

impl ScopeTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: Self::allocate(INITIAL_CAPACITY),
            count: 0,
        }
    }

    fn allocate(capacity: usize) -> Vec<Option<Entry>> {
        std::iter::repeat_with(|| None).take(capacity).collect()
    }

    fn bucket(key: &Uuid, capacity: usize) -> usize {
        let value = key.as_u128();
        let folded = (value >> 64) as u64 ^ value as u64;
        // 取模结果小于 capacity
        (folded % capacity as u64) as usize
    }

    pub(crate) fn get(&self, key: &Uuid) -> Option<Instance> {
        let index = self.position(key)?;
        self.entries[index].as_ref().map(|entry| entry.value.clone())
    }

    pub(crate) fn insert(&mut self, key: Uuid, value: Instance) {
        if let Some(entry) = self.find_mut(&key) {
            entry.value = value;
            return;
        }
        if self.count == self.entries.len() {
            self.grow();
        }
        Self::place(&mut self.entries, Entry { key, value });
        self.count += 1;
    }

    /// 移除作用域的值
    pub(crate) fn remove(&mut self, key: &Uuid) -> Option<Instance> {
        let index = self.position(key)?;
        let removed = self.entries[index].take()?;
        self.count -= 1;

        let capacity = self.entries.len();
        let mut next = (index + 1) % capacity;
        while let Some(entry) = self.entries[next].take() {
            Self::place(&mut self.entries, entry);
            next = (next + 1) % capacity;
        }
        Some(removed.value)
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, key: &Uuid) -> Option<usize> {
        let capacity = self.entries.len();
        let start = Self::bucket(key, capacity);
        (0..capacity)
            .map(|offset| (start + offset) % capacity)
            .take_while(|index| self.entries[*index].is_some())
            .find(|index| self.entries[*index].as_ref().is_some_and(|entry| entry.key == *key))
    }

    fn find_mut(&mut self, key: &Uuid) -> Option<&mut Entry> {
        let index = self.position(key)?;
        self.entries[index].as_mut()
    }

    fn place(entries: &mut [Option<Entry>], entry: Entry) {
        let capacity = entries.len();
        let start = Self::bucket(&entry.key, capacity);
        for offset in 0..capacity {
            let slot = &mut entries[(start + offset) % capacity];
            if slot.is_none() {
                *slot = Some(entry);
                return;
            }
        }
    }

    fn grow(&mut self) {
        let capacity = next_prime(self.entries.len() * 2 + 1);
        let old = std::mem::replace(&mut self.entries, Self::allocate(capacity));
        for entry in old.into_iter().flatten() {
            Self::place(&mut self.entries, entry);
        }
    }
}

fn next_prime(from: usize) -> usize {
    let is_prime = |candidate: usize| {
        candidate >= 2
            && (2..)
                .take_while(|divisor| divisor * divisor <= candidate)
                .all(|divisor| candidate % divisor != 0)
    };
    (from..).find(|candidate| is_prime(*candidate)).unwrap_or(from)
}
