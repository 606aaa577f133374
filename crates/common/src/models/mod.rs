/// 共享数据模型
/// 
/// 定义在连接上传输的聊天消息结构

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// 聊天消息
///
/// 三个字段对服务端都是不透明的，空字符串同样合法。
/// 解码时三个字段均为必需，多余字段会被忽略。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// 发送者标识
    pub email: String,

    /// 显示名称
    pub username: String,

    /// 消息正文
    pub message: String,
}

impl ChatMessage {
    /// 创建聊天消息
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            message: message.into(),
        }
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 从 JSON 字符串解码
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Decode(e.to_string()))
    }

    /// 从 JSON 字节解码（二进制帧）
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}
