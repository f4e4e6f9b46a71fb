//! 连接、进度与会话记录监听器

use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::info;

/// 连接状态变化通知
pub trait ConnectionListener: Send + Sync {
    fn connection_will_open(&self) {}
    fn connection_did_open(&self) {}
    fn connection_will_close(&self) {}
    fn connection_did_close(&self) {}
}

/// 状态栏消息
pub trait ProgressListener: Send + Sync {
    fn message(&self, message: &str);
}

/// 协议请求/响应记录
pub trait TranscriptListener: Send + Sync {
    fn log(&self, request: bool, message: &str);
}

/// 监听器集合，只持有弱引用
///
/// 广播时先取快照再回调，回调中注销自己不会影响本次遍历。
pub struct ListenerSet<L: ?Sized> {
    listeners: Mutex<Vec<Weak<L>>>,
}

impl<L: ?Sized> ListenerSet<L> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn same(weak: &Weak<L>, listener: &Arc<L>) -> bool {
        weak.as_ptr().cast::<()>() == Arc::as_ptr(listener).cast::<()>()
    }

    /// 重复添加同一个监听器只保留一份
    pub fn add(&self, listener: &Arc<L>) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|w| w.strong_count() > 0);
        if !listeners.iter().any(|w| Self::same(w, listener)) {
            listeners.push(Arc::downgrade(listener));
        }
    }

    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|w| !Self::same(w, listener));
        listeners.len() != before
    }

    /// 当前仍存活的监听器快照，顺带清理已释放的
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|w| w.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

/// 会话记录，克隆后共享同一组监听器
#[derive(Clone, Default)]
pub struct Transcript {
    listeners: Arc<ListenerSet<dyn TranscriptListener>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: &Arc<dyn TranscriptListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn TranscriptListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub fn log(&self, request: bool, message: &str) {
        info!("{} {}", if request { ">" } else { "<" }, message);
        for listener in self.listeners.snapshot() {
            listener.log(request, message);
        }
    }
}
