/// 测试用写端

use super::connection::MessageWriter;
use async_trait::async_trait;
use axum::extract::ws::Message as AxumWsMessage;
use common::{ChatMessage, Error, Result};
use std::time::Duration;
use tokio::sync::mpsc;

/// 把写入的帧转发到通道，接收端被丢弃后写入失败
pub struct ChannelWriter(mpsc::UnboundedSender<AxumWsMessage>);

impl ChannelWriter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AxumWsMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

#[async_trait]
impl MessageWriter for ChannelWriter {
    async fn write(&mut self, frame: AxumWsMessage) -> Result<()> {
        self.0
            .send(frame)
            .map_err(|_| Error::Connection("对端已断开".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// 每次写入都失败
pub struct FailingWriter;

#[async_trait]
impl MessageWriter for FailingWriter {
    async fn write(&mut self, _frame: AxumWsMessage) -> Result<()> {
        Err(Error::Connection("connection reset".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        Err(Error::Connection("connection reset".to_string()))
    }
}

/// 写入与关闭都永远不会完成
pub struct StalledWriter;

#[async_trait]
impl MessageWriter for StalledWriter {
    async fn write(&mut self, _frame: AxumWsMessage) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// 从通道中读取下一条聊天消息
pub async fn expect_chat(rx: &mut mpsc::UnboundedReceiver<AxumWsMessage>) -> ChatMessage {
    let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("writer channel closed");
    match frame {
        AxumWsMessage::Text(text) => ChatMessage::from_json(&text).unwrap(),
        other => panic!("unexpected frame: {:?}", other),
    }
}
