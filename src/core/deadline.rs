//! 调用截止时间令牌
//!
//! 每次 Agent 调用持有一个 Deadline：到期时间 + 取消令牌。
//! 目前 Gatherer 为每个调用单独创建（互不影响）；以后可由同一回合的父 Deadline 派生。

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 到期后等待结果的 future 被放弃
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expired {
    /// 到达截止时间
    TimedOut,
    /// 令牌被显式取消
    Cancelled,
}

/// 截止时间 + 取消令牌
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    token: CancellationToken,
}

impl Deadline {
    /// 从现在起 `timeout` 后到期
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
            token: CancellationToken::new(),
        }
    }

    /// 派生子截止时间：取两者中更早的到期时间，父令牌取消时子令牌一并取消
    pub fn child(&self, timeout: Duration) -> Self {
        let at = (Instant::now() + timeout).min(self.at);
        Self {
            at,
            token: self.token.child_token(),
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// 剩余时间（已过期返回 0）
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.at
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// 在截止时间内运行 future；超时或取消时丢弃该 future
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Expired> {
        tokio::select! {
            out = fut => Ok(out),
            _ = tokio::time::sleep_until(self.at) => Err(Expired::TimedOut),
            _ = self.token.cancelled() => Err(Expired::Cancelled),
        }
    }
}
