//! 文件 Store：每局一个 JSONL 文件，只追加
//!
//! - 保存目录在首次写入时创建（幂等；失败后下次写入会重试）
//! - 每次写入单独打开文件，写完即 flush + 关闭；已写入的行不会被改写
//! - 追加前先截掉末尾没有换行的残行（崩溃或写失败留下的），只丢失那一条记录
//! - 同一局的写入通过每局一把锁串行化，不同对局互不影响；对局结束后调用 `close_game` 释放锁

use std::collections::HashMap;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{Mutex as AsyncMutex, OnceCell};

use super::records::{encode_line, FrameRecord, GameInfoRecord};
use super::{check_turn_order, validate_game_id, Store};
use crate::core::StoreError;
use crate::model::{Game, GameTick, Snake};

/// 每局的写入状态：本实例写过的最后回合号
type GameSlot = Arc<AsyncMutex<Option<u32>>>;

pub struct FileStore {
    root: PathBuf,
    ready: OnceCell<()>,
    games: Mutex<HashMap<String, GameSlot>>,
}

/// 追加前日志文件的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogState {
    Missing,
    /// 文件存在但没有完整的第一行（game info 未写完）
    NoGameInfo,
    Ready,
}

const TAIL_CHUNK: u64 = 4096;

/// 对局日志路径：`<root>/<game_id>.jsonl`
pub fn game_log_path(root: &Path, game_id: &str) -> PathBuf {
    root.join(format!("{}.jsonl", game_id))
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ready: OnceCell::new(),
            games: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, game_id: &str) -> PathBuf {
        game_log_path(&self.root, game_id)
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        self.ready
            .get_or_try_init(|| async {
                fs::create_dir_all(&self.root)
                    .await
                    .map_err(|source| StoreError::Directory {
                        path: self.root.clone(),
                        source,
                    })?;
                tracing::info!(path = %self.root.display(), "game save directory ready");
                Ok::<(), StoreError>(())
            })
            .await
            .map(|_| ())
    }

    fn slot(&self, game_id: &str) -> GameSlot {
        let mut games = self.games.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(games.entry(game_id.to_string()).or_default())
    }

    /// 当前持有写入锁的对局数
    pub fn open_games(&self) -> usize {
        self.games.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    async fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>, StoreError> {
        let text = match fs::read_to_string(path).await {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        // 没有换行结尾的最后一段是崩溃时未写完的记录，忽略
        let complete = match text.rfind('\n') {
            Some(end) => &text[..end],
            None => "",
        };
        let mut out = Vec::new();
        for line in complete.lines().filter(|l| !l.trim().is_empty()) {
            out.push(serde_json::from_str(line)?);
        }
        Ok(Some(out))
    }
}

/// 从文件末尾向前找最后一个换行符的位置
async fn last_newline(file: &mut fs::File, len: u64) -> std::io::Result<Option<u64>> {
    let mut buf = vec![0u8; TAIL_CHUNK as usize];
    let mut end = len;
    while end > 0 {
        let start = end.saturating_sub(TAIL_CHUNK);
        let n = (end - start) as usize;
        file.seek(SeekFrom::Start(start)).await?;
        file.read_exact(&mut buf[..n]).await?;
        if let Some(i) = buf[..n].iter().rposition(|b| *b == b'\n') {
            return Ok(Some(start + i as u64));
        }
        end = start;
    }
    Ok(None)
}

/// 截掉最后一个换行符之后的残行，返回日志状态
async fn repair_tail(path: &Path) -> std::io::Result<LogState> {
    let mut file = match OpenOptions::new().read(true).write(true).open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LogState::Missing),
        Err(e) => return Err(e),
    };
    let len = file.metadata().await?.len();
    let keep = last_newline(&mut file, len).await?.map_or(0, |pos| pos + 1);
    if keep < len {
        tracing::warn!(
            path = %path.display(),
            dropped_bytes = len - keep,
            "truncating incomplete record at end of game log"
        );
        file.set_len(keep).await?;
        file.sync_data().await?;
    }
    Ok(if keep == 0 { LogState::NoGameInfo } else { LogState::Ready })
}

/// 写入一整行并 flush；任何退出路径上文件都会被关闭
async fn write_record(file: &mut fs::File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await?;
    file.sync_data().await
}

#[async_trait]
impl Store for FileStore {
    async fn write_game_info(&self, game: &Game, snakes: &[Snake]) -> Result<(), StoreError> {
        validate_game_id(&game.id)?;
        let line = encode_line(&GameInfoRecord::new(game, snakes))?;
        self.ensure_dir().await?;

        let slot = self.slot(&game.id);
        let mut last_turn = slot.lock().await;
        let path = self.path_for(&game.id);

        match repair_tail(&path).await {
            Ok(LogState::Ready) => return Err(StoreError::GameExists(game.id.clone())),
            Ok(LogState::Missing | LogState::NoGameInfo) => {}
            Err(source) => return Err(StoreError::Write { path, source }),
        }

        let mut file = match OpenOptions::new().append(true).create(true).open(&path).await {
            Ok(f) => f,
            Err(source) => return Err(StoreError::Write { path, source }),
        };

        if let Err(source) = write_record(&mut file, &line).await {
            tracing::warn!(path = %path.display(), error = %source, "failed to write game info");
            return Err(StoreError::Write { path, source });
        }
        *last_turn = None;
        Ok(())
    }

    async fn write_frame(&self, game_id: &str, tick: &GameTick) -> Result<(), StoreError> {
        validate_game_id(game_id)?;
        let line = encode_line(&FrameRecord::from(tick))?;
        self.ensure_dir().await?;

        let slot = self.slot(game_id);
        let mut last_turn = slot.lock().await;
        check_turn_order(game_id, *last_turn, tick.turn)?;
        let path = self.path_for(game_id);

        // 没有 game info 的日志不允许出现帧
        match repair_tail(&path).await {
            Ok(LogState::Ready) => {}
            Ok(LogState::Missing | LogState::NoGameInfo) => {
                return Err(StoreError::UnknownGame(game_id.to_string()))
            }
            Err(source) => return Err(StoreError::Write { path, source }),
        }

        let mut file = match OpenOptions::new().append(true).open(&path).await {
            Ok(f) => f,
            Err(source) => return Err(StoreError::Write { path, source }),
        };

        if let Err(source) = write_record(&mut file, &line).await {
            tracing::warn!(path = %path.display(), turn = tick.turn, error = %source, "failed to append frame");
            return Err(StoreError::Write { path, source });
        }
        *last_turn = Some(tick.turn);
        Ok(())
    }

    async fn read_game_info(&self, game_id: &str) -> Result<Option<GameInfoRecord>, StoreError> {
        validate_game_id(game_id)?;
        let slot = self.slot(game_id);
        let _guard = slot.lock().await;
        let path = self.path_for(game_id);
        let Some(lines) = Self::read_lines::<serde_json::Value>(&path).await? else {
            return Ok(None);
        };
        match lines.into_iter().next() {
            Some(first) => Ok(Some(serde_json::from_value(first)?)),
            None => Ok(None),
        }
    }

    async fn read_frames(&self, game_id: &str) -> Result<Vec<FrameRecord>, StoreError> {
        validate_game_id(game_id)?;
        let slot = self.slot(game_id);
        let _guard = slot.lock().await;
        let path = self.path_for(game_id);
        let lines = Self::read_lines::<serde_json::Value>(&path)
            .await?
            .filter(|lines| !lines.is_empty())
            .ok_or_else(|| StoreError::UnknownGame(game_id.to_string()))?;
        lines
            .into_iter()
            .skip(1)
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }

    async fn close_game(&self, game_id: &str) {
        let mut games = self.games.lock().unwrap_or_else(|p| p.into_inner());
        games.remove(game_id);
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
