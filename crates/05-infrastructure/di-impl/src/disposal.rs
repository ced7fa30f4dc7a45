//! 释放列表
//!
//! 生命周期管理器缓存值时把实例登记到持有注册的容器；容器释放时每个实例至多释放一次。

use di_abstractions::DisposeOrder;
use infrastructure_common::{catalog, instance_address, Disposer, Instance};
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::trace;

struct Entry {
    instance: Instance,
    disposer: Disposer,
}

/// 需要随作用域释放的实例
#[derive(Default)]
pub(crate) struct DisposalList {
    entries: Mutex<Vec<Entry>>,
    seen: Mutex<HashSet<usize>>,
}

impl DisposalList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 登记实例；类型没有声明释放函数或已登记时忽略
    pub(crate) fn register(&self, instance: &Instance) {
        let Some(descriptor) = catalog::descriptor_of_instance(instance) else {
            return;
        };
        let Some(disposer) = descriptor.disposer() else {
            return;
        };
        if !self.seen.lock().insert(instance_address(instance)) {
            return;
        }
        trace!("登记待释放实例: {}", descriptor.handle());
        self.entries.lock().push(Entry {
            instance: instance.clone(),
            disposer: disposer.clone(),
        });
    }

    /// 已登记的实例数
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// 按顺序释放全部实例，返回释放个数
    pub(crate) fn dispose(&self, order: DisposeOrder) -> usize {
        let mut entries = std::mem::take(&mut *self.entries.lock());
        if order == DisposeOrder::Reverse {
            entries.reverse();
        }
        for entry in &entries {
            (entry.disposer)(&entry.instance);
        }
        entries.len()
    }
}
