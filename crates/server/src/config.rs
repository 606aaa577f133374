/// 配置管理

use common::{Error, Result};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub static_dir: String,
    pub write_timeout: Duration,
    pub log_level: String,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_port = parse_var(&lookup, "SERVER_PORT", 8000u16)?;

        let static_dir = lookup("STATIC_DIR").unwrap_or_else(|| "public".to_string());

        let write_timeout_ms = parse_var(&lookup, "WRITE_TIMEOUT_MS", 5000u64)?;
        if write_timeout_ms == 0 {
            return Err(Error::Config("WRITE_TIMEOUT_MS 必须大于 0".to_string()));
        }

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            server_port,
            static_dir,
            write_timeout: Duration::from_millis(write_timeout_ms),
            log_level,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{} 无效 ({}): {}", key, raw, e))),
        None => Ok(default),
    }
}
