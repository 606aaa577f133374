/// 广播器
/// 
/// 全局唯一的消费者：按入队顺序逐条取出消息，写入注册表快照中的每个连接，
/// 并剔除写入失败的连接。

use super::{ClientConnection, ConnectionRegistry};
use axum::extract::ws::Message as AxumWsMessage;
use common::{ChatMessage, Error, Result};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 广播队列的生产端
#[derive(Clone)]
pub struct BroadcastHandle {
    sender: mpsc::UnboundedSender<ChatMessage>,
}

impl BroadcastHandle {
    /// 提交消息到广播队列，不会阻塞
    ///
    /// 只有广播任务已经退出时才会失败。
    pub fn submit(&self, message: ChatMessage) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| Error::Internal("广播任务已停止".to_string()))
    }
}

/// 单轮广播结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOutReport {
    /// 写入成功的连接数
    pub delivered: usize,
    /// 因写入失败被剔除的连接数
    pub dropped: usize,
}

/// 广播器
pub struct Broadcaster {
    registry: ConnectionRegistry,
    receiver: mpsc::UnboundedReceiver<ChatMessage>,
    write_timeout: Duration,
}

impl Broadcaster {
    /// 创建广播器及其生产端
    pub fn new(registry: ConnectionRegistry, write_timeout: Duration) -> (Self, BroadcastHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let broadcaster = Self {
            registry,
            receiver,
            write_timeout,
        };
        (broadcaster, BroadcastHandle { sender })
    }

    /// 在后台启动广播循环
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// 广播循环
    ///
    /// 所有生产端都被丢弃且队列清空后返回。
    pub async fn run(mut self) {
        info!("广播任务已启动 (写入超时 {:?})", self.write_timeout);

        while let Some(message) = self.receiver.recv().await {
            let report = self.fan_out(&message).await;
            debug!(
                "广播完成: from={}, delivered={}, dropped={}",
                message.username, report.delivered, report.dropped
            );
        }

        info!("广播任务已结束");
    }

    /// 将一条消息写入当前快照中的所有连接
    pub async fn fan_out(&self, message: &ChatMessage) -> FanOutReport {
        let frame = match message.to_json() {
            Ok(json) => AxumWsMessage::Text(json),
            Err(e) => {
                error!("序列化聊天消息失败: {}", e);
                return FanOutReport::default();
            }
        };

        let connections = self.registry.snapshot().await;
        let writes = connections
            .iter()
            .map(|connection| self.deliver(connection, frame.clone()));
        let results = join_all(writes).await;

        let delivered = results.iter().filter(|ok| **ok).count();
        FanOutReport {
            delivered,
            dropped: results.len() - delivered,
        }
    }

    /// 向单个连接写入，失败时注销并关闭该连接
    ///
    /// Close 帧在后台发送，本轮广播不等待失败连接的写端。
    async fn deliver(&self, connection: &Arc<ClientConnection>, frame: AxumWsMessage) -> bool {
        let result = match tokio::time::timeout(self.write_timeout, connection.write(frame)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!("{:?}", self.write_timeout))),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("向聊天连接 {} 广播失败: {}", connection.id(), e);
                self.registry.deregister(connection.id()).await;
                connection.close_detached();
                false
            }
        }
    }
}

/// 不带广播循环的生产端，测试读取任务时直接检查队列
#[cfg(test)]
pub(crate) fn detached_handle() -> (BroadcastHandle, mpsc::UnboundedReceiver<ChatMessage>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (BroadcastHandle { sender }, receiver)
}
