/// 应用全局状态

use crate::ws::{BroadcastHandle, ConnectionRegistry};

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 聊天连接注册表
    pub registry: ConnectionRegistry,
    /// 广播队列生产端
    pub broadcaster: BroadcastHandle,
}

impl AppState {
    pub fn new(registry: ConnectionRegistry, broadcaster: BroadcastHandle) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// 获取连接注册表
    pub fn registry(&self) -> ConnectionRegistry {
        self.registry.clone()
    }

    /// 获取广播队列生产端
    pub fn broadcaster(&self) -> BroadcastHandle {
        self.broadcaster.clone()
    }
}
