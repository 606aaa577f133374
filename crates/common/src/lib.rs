/// Chat Relay - 公共库
/// 
/// 提供服务端与客户端共享的消息模型、错误处理、工具函数等

pub mod errors;
pub mod models;
pub mod utils;

// 重新导出常用类型
pub use errors::{Error, Result};
pub use models::ChatMessage;
