/// 连接注册表
/// 
/// 记录当前所有存活的客户端连接，支持并发注册、注销与快照

use super::ClientConnection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// 连接注册表
#[derive(Clone)]
pub struct ConnectionRegistry {
    /// 所有连接的映射：connection_id -> ClientConnection
    connections: Arc<RwLock<HashMap<String, Arc<ClientConnection>>>>,
}

impl ConnectionRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册连接，同一 ID 重复注册会覆盖旧条目
    pub async fn register(&self, connection: Arc<ClientConnection>) {
        let id = connection.id().to_string();
        let mut connections = self.connections.write().await;
        connections.insert(id.clone(), connection);

        info!("聊天连接已注册: {} (在线 {})", id, connections.len());
    }

    /// 注销连接
    ///
    /// 不存在时为空操作。返回本次调用是否真正移除了条目。
    /// 不负责关闭底层连接。
    pub async fn deregister(&self, connection_id: &str) -> bool {
        let mut connections = self.connections.write().await;
        if connections.remove(connection_id).is_some() {
            info!("聊天连接已注销: {} (在线 {})", connection_id, connections.len());
            true
        } else {
            false
        }
    }

    /// 获取当前所有连接的快照
    pub async fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        let connections = self.connections.read().await;
        connections.values().cloned().collect()
    }

    /// 获取连接数量
    pub async fn count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    /// 检查连接是否在线
    pub async fn contains(&self, connection_id: &str) -> bool {
        let connections = self.connections.read().await;
        connections.contains_key(connection_id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
