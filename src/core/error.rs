//! 错误类型
//!
//! InvokeError 只属于单个 Agent 的响应，永不中断整批调用；
//! StoreError 返回给持久化调用方，由驱动层决定如何处理。

use std::path::PathBuf;

use thiserror::Error;

/// 单次 Agent 调用的失败原因
#[derive(Error, Debug, Clone)]
pub enum InvokeError {
    /// URL 未通过校验，未发起任何网络请求
    #[error("invalid snake URL: {0}")]
    InvalidUrl(String),

    /// 请求体无法编码，未发起任何网络请求
    #[error("request serialization failed: {0}")]
    Serialization(String),

    /// 连接拒绝、DNS 失败、超时、读取响应体失败
    #[error("transport failure: {message}")]
    Transport { message: String, timed_out: bool },
}

impl InvokeError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            timed_out: true,
        }
    }

    /// 稳定的错误标签，供规则引擎与日志使用
    pub fn tag(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid-url",
            Self::Serialization(_) => "serialization-failure",
            Self::Transport { .. } => "transport-failure",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { timed_out: true, .. })
    }
}

/// 持久化失败原因
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create save directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record encode/decode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid game id: {0:?}")]
    InvalidGameId(String),

    #[error("game {0} already has a game info record")]
    GameExists(String),

    #[error("game {0} has no game info record")]
    UnknownGame(String),

    #[error("game {game_id}: frame for turn {turn} after turn {last}")]
    OutOfOrder { game_id: String, last: u32, turn: u32 },
}

impl StoreError {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Directory { .. } => "directory-failure",
            Self::Write { .. } => "write-failure",
            Self::Read { .. } => "read-failure",
            Self::Encode(_) => "encode-failure",
            Self::InvalidGameId(_) => "invalid-game-id",
            Self::GameExists(_) => "game-exists",
            Self::UnknownGame(_) => "unknown-game",
            Self::OutOfOrder { .. } => "out-of-order",
        }
    }
}
