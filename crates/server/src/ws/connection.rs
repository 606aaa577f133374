/// 客户端连接
/// 
/// 封装单个 WebSocket 连接的写端、关闭状态与取消令牌。
/// 读端由该连接的读取任务独占，写端只由广播器使用。

use async_trait::async_trait;
use axum::extract::ws::Message as AxumWsMessage;
use chrono::{DateTime, Utc};
use common::{utils::generate_id, Error, Result};
use futures_util::{Sink, SinkExt};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

/// 关闭连接时发送 Close 帧的最长等待时间
const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

/// 连接写端
#[async_trait]
pub trait MessageWriter: Send {
    /// 写入一帧
    async fn write(&mut self, frame: AxumWsMessage) -> Result<()>;

    /// 关闭写端
    async fn close(&mut self) -> Result<()>;
}

/// 基于 `Sink` 的写端，生产环境中包装 WebSocket 的 SplitSink
pub struct SinkWriter<S>(pub S);

#[async_trait]
impl<S> MessageWriter for SinkWriter<S>
where
    S: Sink<AxumWsMessage> + Unpin + Send,
    S::Error: Display,
{
    async fn write(&mut self, frame: AxumWsMessage) -> Result<()> {
        self.0
            .send(frame)
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.0
            .close()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }
}

/// 客户端连接
pub struct ClientConnection {
    /// 连接 ID（注册表键）
    id: String,

    /// 连接时间
    connected_at: DateTime<Utc>,

    /// 写端
    writer: Mutex<Box<dyn MessageWriter>>,

    /// 是否已关闭
    closed: AtomicBool,

    /// 关闭时取消，用于唤醒读取任务
    cancel: CancellationToken,
}

impl ClientConnection {
    /// 创建新的连接，分配唯一 ID
    pub fn new(writer: impl MessageWriter + 'static) -> Self {
        Self {
            id: generate_id(),
            connected_at: Utc::now(),
            writer: Mutex::new(Box::new(writer)),
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 写入一帧，已关闭的连接直接返回错误
    pub async fn write(&self, frame: AxumWsMessage) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Connection("连接已关闭".to_string()));
        }
        let mut writer = self.writer.lock().await;
        writer.write(frame).await
    }

    /// 关闭连接
    ///
    /// 幂等：只有第一次调用会真正执行关闭并返回 true。
    /// 关闭时先取消令牌唤醒读取任务，再尽力发送 Close 帧。
    pub async fn close(&self) -> bool {
        if !self.mark_closed() {
            return false;
        }
        self.send_close_frame().await;
        true
    }

    /// 关闭连接，Close 帧在后台任务中发送，调用方不等待写端
    ///
    /// 与 `close` 共享同一个关闭标记，两者合计只会生效一次。
    pub fn close_detached(self: &Arc<Self>) -> bool {
        if !self.mark_closed() {
            return false;
        }
        let connection = self.clone();
        tokio::spawn(async move { connection.send_close_frame().await });
        true
    }

    fn mark_closed(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cancel.cancel();
        true
    }

    async fn send_close_frame(&self) {
        let shutdown = async {
            let mut writer = self.writer.lock().await;
            writer.close().await
        };
        match tokio::time::timeout(CLOSE_FRAME_TIMEOUT, shutdown).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("关闭连接 {} 写端失败: {}", self.id, e),
            Err(_) => debug!("关闭连接 {} 写端超时", self.id),
        }
    }

    /// 等待连接被关闭
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("connected_at", &self.connected_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::testing::{ChannelWriter, FailingWriter, StalledWriter};

    #[tokio::test]
    async fn test_write_delivers_frame() {
        let (writer, mut rx) = ChannelWriter::new();
        let conn = ClientConnection::new(writer);

        conn.write(AxumWsMessage::Text("hello".to_string())).await.unwrap();

        match rx.recv().await {
            Some(AxumWsMessage::Text(text)) => assert_eq!(text, "hello"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (writer, _rx) = ChannelWriter::new();
        let conn = ClientConnection::new(writer);

        assert!(!conn.is_closed());
        assert!(conn.close().await);
        assert!(!conn.close().await);
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let (writer, _rx) = ChannelWriter::new();
        let conn = ClientConnection::new(writer);
        conn.close().await;

        let err = conn
            .write(AxumWsMessage::Text("late".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn test_close_wakes_waiters() {
        let conn = Arc::new(ClientConnection::new(FailingWriter));
        let waiter = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.cancelled().await })
        };

        conn.close().await;
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter was not woken")
            .unwrap();
    }

    #[tokio::test]
    async fn test_unique_ids() {
        let a = ClientConnection::new(FailingWriter);
        let b = ClientConnection::new(FailingWriter);
        assert_ne!(a.id(), b.id());
        assert!(a.connected_at() <= Utc::now());
    }

    #[tokio::test]
    async fn test_close_detached_does_not_wait_for_writer() {
        let conn = Arc::new(ClientConnection::new(StalledWriter));

        let started = std::time::Instant::now();
        assert!(conn.close_detached());
        assert!(started.elapsed() < CLOSE_FRAME_TIMEOUT / 2);

        assert!(conn.is_closed());
        assert!(!conn.close_detached());
        assert!(!conn.close().await);
        tokio::time::timeout(Duration::from_millis(100), conn.cancelled())
            .await
            .expect("cancellation not signalled");
    }
}
