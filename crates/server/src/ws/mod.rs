/// WebSocket 模块
/// 
/// 连接注册表、入站读取任务、广播器以及 WebSocket 接入

pub mod broadcaster;
pub mod connection;
pub mod handler;
pub mod reader;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcaster::{BroadcastHandle, Broadcaster};
pub use connection::{ClientConnection, SinkWriter};
pub use handler::handle_chat_websocket;
pub use reader::{run_reader, ReaderExit};
pub use registry::ConnectionRegistry;
