//! Agent 通信层：请求体投影、单次调用、并发收集

pub mod gather;
pub mod invoker;
pub mod request;

pub use gather::{gather, gather_within, Selection};
pub use invoker::{invoke, AgentResponse};
pub use request::{build_snake_request, SnakeRequest};
