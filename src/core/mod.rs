//! 核心基础：错误类型与调用截止时间

pub mod deadline;
pub mod error;

pub use deadline::{Deadline, Expired};
pub use error::{InvokeError, StoreError};
