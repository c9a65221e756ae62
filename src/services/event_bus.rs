//! 事件总线 - 业务能力层
//!
//! 两种订阅方式：
//! - `subscribe()` 拿到 broadcast 接收端，适合在独立任务里消费
//! - `register()` 注册监听器，事件发出时同步回调

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

use crate::models::SearchEvent;

const DEFAULT_CAPACITY: usize = 256;

/// 事件监听器
pub trait SearchEventListener: Send + Sync {
    fn on_event(&self, event: &SearchEvent);
}

impl<F> SearchEventListener for F
where
    F: Fn(&SearchEvent) + Send + Sync,
{
    fn on_event(&self, event: &SearchEvent) {
        self(event)
    }
}

/// 监听器句柄，用于注销
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct EventBus {
    sender: broadcast::Sender<SearchEvent>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn SearchEventListener>)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 订阅事件流
    pub fn subscribe(&self) -> broadcast::Receiver<SearchEvent> {
        self.sender.subscribe()
    }

    /// 注册监听器
    pub fn register(&self, listener: Arc<dyn SearchEventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// 注销监听器，返回是否存在
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// 发出事件
    pub fn emit(&self, event: SearchEvent) {
        trace!("发出事件: {}", event.name());

        // 先复制一份监听器列表，回调里注销自身也不会死锁
        let listeners: Vec<_> = self.listeners.read().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener.on_event(&event);
        }

        // 没有接收端时 send 返回 Err，属正常情况
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
