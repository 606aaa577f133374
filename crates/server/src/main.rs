/// Chat Relay - Server
/// 
/// 实时广播中继：客户端通过 WebSocket 提交消息，服务端转发给所有在线连接，
/// 同时提供静态页面

mod app_state;
mod config;
mod routes;
mod ws;

use axum::Router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};
use crate::{
    app_state::AppState,
    ws::{Broadcaster, ConnectionRegistry},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let cfg = config::Config::from_env()?;

    // 初始化日志，RUST_LOG 优先于 LOG_LEVEL
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    info!("🚀 启动 Chat Relay Server...");
    info!("✅ 配置加载成功: {:?}", cfg);

    // 初始化连接注册表与广播器
    let registry = ConnectionRegistry::new();
    let (broadcaster, handle) = Broadcaster::new(registry.clone(), cfg.write_timeout);
    let broadcaster_task = broadcaster.spawn();
    info!("✅ 广播任务已启动");

    // 创建应用状态
    let app_state = AppState::new(registry, handle);

    // 构建应用路由
    let app = routes::build_router(app_state, &cfg.static_dir);

    // 启动服务器
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server_port));
    info!("🎯 服务器监听在 http://{} (静态目录: {})", addr, cfg.static_dir);

    let listener = TcpListener::bind(addr).await?;
    serve(listener, app, broadcaster_task).await
}

/// 运行 HTTP 服务，广播任务一旦结束即返回错误
///
/// AppState 持有生产端，广播任务在服务期间结束只可能是异常退出，
/// 此时继续接受连接已没有意义。
async fn serve(
    listener: TcpListener,
    app: Router,
    broadcaster_task: JoinHandle<()>,
) -> anyhow::Result<()> {
    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            result?;
            Ok(())
        }
        result = broadcaster_task => {
            match result {
                Ok(()) => error!("广播任务意外结束"),
                Err(e) => error!("广播任务异常退出: {}", e),
            }
            anyhow::bail!("广播任务已停止")
        }
    }
}
