/// 聊天 WebSocket 接入
/// 
/// 完成升级握手后注册连接，并在该连接的任务中运行读取循环

use super::{run_reader, ClientConnection, ReaderExit, SinkWriter};
use crate::app_state::AppState;
use axum::extract::ws::WebSocket;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chrono::Utc;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::info;

/// WebSocket 升级处理器
pub async fn handle_chat_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_chat_connection(socket, state))
}

/// 处理聊天 WebSocket 连接
async fn handle_chat_connection(socket: WebSocket, state: AppState) {
    let (ws_sender, ws_receiver) = socket.split();

    let connection = Arc::new(ClientConnection::new(SinkWriter(ws_sender)));
    info!("新的聊天 WebSocket 连接: {}", connection.id());

    state.registry().register(connection.clone()).await;

    let exit = run_reader(
        connection.clone(),
        ws_receiver,
        state.registry(),
        state.broadcaster(),
    )
    .await;

    let duration = Utc::now() - connection.connected_at();
    match exit {
        ReaderExit::Failed(_) => info!(
            "聊天连接因错误关闭: {} (持续 {}s)",
            connection.id(),
            duration.num_seconds()
        ),
        _ => info!(
            "聊天连接已关闭: {} (持续 {}s)",
            connection.id(),
            duration.num_seconds()
        ),
    }
}
