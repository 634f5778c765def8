//! 对局记录：追加式日志抽象层
//!
//! 定义统一的 Store 接口，支持内存（不落盘）和文件（每局一个 JSONL 文件）两种实现。
//! 由驱动层在构造时注入具体实现，同一局的记录同一时刻只有一个写入者。

pub mod file;
pub mod memory;
pub mod records;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StoreBackend, StoreSection};
use crate::core::StoreError;
use crate::model::{Game, GameTick, Snake};

pub use file::FileStore;
pub use memory::InMemStore;
pub use records::{FrameRecord, GameInfoRecord, SnakeInfo, SnakeState};

/// 对局日志接口
#[async_trait]
pub trait Store: Send + Sync {
    /// 写入对局描述；每局只能写一次
    async fn write_game_info(&self, game: &Game, snakes: &[Snake]) -> Result<(), StoreError>;

    /// 追加一个回合帧；回合号必须严格递增
    async fn write_frame(&self, game_id: &str, tick: &GameTick) -> Result<(), StoreError>;

    /// 读取对局描述，未记录过返回 None
    async fn read_game_info(&self, game_id: &str) -> Result<Option<GameInfoRecord>, StoreError>;

    /// 按写入顺序读取全部回合帧（回放用）
    async fn read_frames(&self, game_id: &str) -> Result<Vec<FrameRecord>, StoreError>;

    /// 对局结束：释放该局的写入状态。之后仍可读取；再次写入会重新建立状态。
    /// 调用方需保证此时没有该局的写入正在进行。
    async fn close_game(&self, _game_id: &str) {}

    /// 后端名称，用于日志
    fn backend(&self) -> &'static str;
}

/// 对局 ID 会成为文件名的一部分，拒绝空串、路径分隔符与 `..`
pub fn validate_game_id(id: &str) -> Result<(), StoreError> {
    let bad = id.is_empty()
        || id == "."
        || id.contains("..")
        || id.contains('/')
        || id.contains('\\')
        || id.chars().any(|c| c.is_control());
    if bad {
        return Err(StoreError::InvalidGameId(id.to_string()));
    }
    Ok(())
}

/// 两次写入之间的回合号检查
pub(crate) fn check_turn_order(game_id: &str, last: Option<u32>, turn: u32) -> Result<(), StoreError> {
    match last {
        Some(last) if turn <= last => Err(StoreError::OutOfOrder {
            game_id: game_id.to_string(),
            last,
            turn,
        }),
        _ => Ok(()),
    }
}

/// 按配置选择后端；文件后端在首次写入时才创建目录
pub fn open_store(section: &StoreSection) -> Arc<dyn Store> {
    match section.backend {
        StoreBackend::Inmem => Arc::new(InMemStore::new()),
        StoreBackend::File => Arc::new(FileStore::new(section.resolved_save_dir())),
    }
}
