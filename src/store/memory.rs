//! 内存 Store：进程内记录序列，不落盘（测试与无需回放的对局）

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::records::{FrameRecord, GameInfoRecord};
use super::{check_turn_order, validate_game_id, Store};
use crate::core::StoreError;
use crate::model::{Game, GameTick, Snake};

struct GameLog {
    info: GameInfoRecord,
    frames: Vec<FrameRecord>,
}

#[derive(Default)]
pub struct InMemStore {
    games: RwLock<HashMap<String, GameLog>>,
}

impl InMemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录的对局数
    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }
}

#[async_trait]
impl Store for InMemStore {
    async fn write_game_info(&self, game: &Game, snakes: &[Snake]) -> Result<(), StoreError> {
        validate_game_id(&game.id)?;
        let mut games = self.games.write().await;
        if games.contains_key(&game.id) {
            return Err(StoreError::GameExists(game.id.clone()));
        }
        games.insert(
            game.id.clone(),
            GameLog {
                info: GameInfoRecord::new(game, snakes),
                frames: Vec::new(),
            },
        );
        Ok(())
    }

    async fn write_frame(&self, game_id: &str, tick: &GameTick) -> Result<(), StoreError> {
        let mut games = self.games.write().await;
        let log = games
            .get_mut(game_id)
            .ok_or_else(|| StoreError::UnknownGame(game_id.to_string()))?;
        check_turn_order(game_id, log.frames.last().map(|f| f.turn), tick.turn)?;
        log.frames.push(FrameRecord::from(tick));
        Ok(())
    }

    async fn read_game_info(&self, game_id: &str) -> Result<Option<GameInfoRecord>, StoreError> {
        Ok(self.games.read().await.get(game_id).map(|l| l.info.clone()))
    }

    async fn read_frames(&self, game_id: &str) -> Result<Vec<FrameRecord>, StoreError> {
        self.games
            .read()
            .await
            .get(game_id)
            .map(|l| l.frames.clone())
            .ok_or_else(|| StoreError::UnknownGame(game_id.to_string()))
    }

    fn backend(&self) -> &'static str {
        "inmem"
    }
}
