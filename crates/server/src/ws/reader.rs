/// 入站读取任务
/// 
/// 每个连接一个实例：解码客户端消息并提交到广播队列，
/// 任何读取失败都会注销并关闭自己的连接后退出。

use super::{BroadcastHandle, ClientConnection, ConnectionRegistry};
use axum::extract::ws::Message as AxumWsMessage;
use common::{utils::truncate_for_log, ChatMessage, Error, Result};
use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

/// 读取任务退出原因
#[derive(Debug)]
pub enum ReaderExit {
    /// 客户端关闭连接或流结束
    Closed,
    /// 连接已被其他一方（广播器）关闭
    Cancelled,
    /// 读取或解码失败
    Failed(Error),
}

/// 运行读取循环，直到连接结束
pub async fn run_reader<S, E>(
    connection: Arc<ClientConnection>,
    mut stream: S,
    registry: ConnectionRegistry,
    broadcaster: BroadcastHandle,
) -> ReaderExit
where
    S: Stream<Item = std::result::Result<AxumWsMessage, E>> + Unpin,
    E: Display,
{
    let exit = loop {
        let next = tokio::select! {
            _ = connection.cancelled() => break ReaderExit::Cancelled,
            next = stream.next() => next,
        };

        let frame = match next {
            None => break ReaderExit::Closed,
            Some(Err(e)) => break ReaderExit::Failed(Error::Connection(e.to_string())),
            Some(Ok(frame)) => frame,
        };

        match frame {
            AxumWsMessage::Close(_) => break ReaderExit::Closed,
            AxumWsMessage::Ping(_) | AxumWsMessage::Pong(_) => continue,
            frame => match decode_frame(&frame) {
                Ok(message) => {
                    debug!(
                        "收到聊天消息: conn={}, user={}, body={}",
                        connection.id(),
                        message.username,
                        truncate_for_log(&message.message, 64)
                    );
                    if let Err(e) = broadcaster.submit(message) {
                        warn!("提交广播消息失败: {}", e);
                    }
                }
                Err(e) => break ReaderExit::Failed(e),
            },
        }
    };

    if let ReaderExit::Failed(ref e) = exit {
        warn!("聊天连接 {} 读取失败: {}", connection.id(), e);
    }

    registry.deregister(connection.id()).await;
    connection.close().await;
    exit
}

/// 解码文本帧或二进制帧中的 JSON 消息
fn decode_frame(frame: &AxumWsMessage) -> Result<ChatMessage> {
    match frame {
        AxumWsMessage::Text(text) => ChatMessage::from_json(text),
        AxumWsMessage::Binary(bytes) => ChatMessage::from_slice(bytes),
        other => Err(Error::Decode(format!("不支持的帧类型: {:?}", other))),
    }
}
