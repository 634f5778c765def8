//! Arena - 回合制多人对战引擎核心
//!
//! 模块划分：
//! - **agent**: 并发调用各参赛 Agent（单次调用 + 回合内收集）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与调用截止时间
//! - **model**: 对局、蛇、回合快照
//! - **observability**: 日志初始化
//! - **store**: 追加式对局记录（内存 / JSONL 文件）

pub mod agent;
pub mod config;
pub mod core;
pub mod model;
pub mod observability;
pub mod store;

pub use agent::{gather, AgentResponse, Selection};
pub use store::{open_store, Store};
