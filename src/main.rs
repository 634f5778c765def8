//! Arena - 回合制多人对战引擎核心
//!
//! 入口：初始化日志、加载配置、按配置打开 Store，
//! 读取对局描述文件，记录 game info 与第 0 回合，并向所有 Agent 发送 start 通知。
//!
//! 用法：`arena <game.json> [config.toml]`

use std::path::PathBuf;

use anyhow::Context;
use arena::config::load_config;
use arena::model::{Game, GameTick};
use arena::{gather, observability, open_store, Selection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let mut args = std::env::args().skip(1);
    let game_path = PathBuf::from(args.next().context("usage: arena <game.json> [config.toml]")?);
    let config_path = args.next().map(PathBuf::from);

    let cfg = load_config(config_path).context("Failed to load config")?;
    let store = open_store(&cfg.store);

    let raw = tokio::fs::read_to_string(&game_path)
        .await
        .with_context(|| format!("Failed to read {}", game_path.display()))?;
    let game: Game = serde_json::from_str(&raw).context("Invalid game descriptor")?;
    let tick = GameTick::initial(&game, Vec::new());

    tracing::info!(
        game_id = %game.id,
        snakes = game.snakes.len(),
        backend = store.backend(),
        "starting game"
    );

    // 持久化失败只影响回放，不中断对局
    if let Err(e) = store.write_game_info(&game, &game.snakes).await {
        tracing::warn!(error = %e, kind = e.tag(), "failed to record game info");
    }

    let responses = gather(
        &cfg.agents.start_path,
        cfg.agents.timeout(),
        &game,
        &tick,
        Selection::All,
    )
    .await;
    for resp in &responses {
        match resp.error() {
            None => tracing::info!(
                snake_id = %resp.snake_id(),
                status = resp.status,
                elapsed_ms = resp.elapsed.as_millis() as u64,
                "agent ready"
            ),
            Some(e) => tracing::warn!(snake_id = %resp.snake_id(), kind = e.tag(), error = %e, "agent unavailable"),
        }
    }

    if let Err(e) = store.write_frame(&game.id, &tick).await {
        tracing::warn!(error = %e, kind = e.tag(), "failed to record frame");
    }
    store.close_game(&game.id).await;

    Ok(())
}
