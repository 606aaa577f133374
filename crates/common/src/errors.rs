use thiserror::Error;

/// 统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    #[error("消息解码失败: {0}")]
    Decode(String),

    #[error("连接错误: {0}")]
    Connection(String),

    #[error("写入超时: {0}")]
    Timeout(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl Error {
    /// 是否为解码错误（协议违规）
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, Error>;
