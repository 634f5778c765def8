//! 响应收集：并发调用选中的 Agent，等待全部完成后一次性返回
//!
//! 每个 Agent 一个任务，由 JoinSet 作为汇合点；结果经一个容量等于分发数的 channel 汇总。
//! 任一调用失败或超时都不会取消其他调用；返回时没有任务仍在运行。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::agent::invoker::{invoke, AgentResponse};
use crate::core::{Deadline, InvokeError};
use crate::model::{Game, GameTick, Snake};

/// 本回合联系哪些蛇
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Selection {
    /// 所有蛇（start / end 等生命周期通知）
    #[default]
    All,
    /// 仅存活的蛇（move）
    AliveOnly,
}

impl Selection {
    pub fn select(self, tick: &GameTick) -> Vec<Snake> {
        match self {
            Selection::All => tick.snakes.clone(),
            Selection::AliveOnly => tick.alive_snakes().cloned().collect(),
        }
    }
}

/// 每个调用各自从现在起计时 `timeout`，互不影响
pub async fn gather(
    path: &str,
    timeout: Duration,
    game: &Game,
    tick: &GameTick,
    selection: Selection,
) -> Vec<AgentResponse> {
    fan_out(path, game, tick, selection, || Deadline::after(timeout)).await
}

/// 同 gather，但每个调用的截止时间不晚于回合级的 `turn_deadline`
pub async fn gather_within(
    path: &str,
    timeout: Duration,
    turn_deadline: &Deadline,
    game: &Game,
    tick: &GameTick,
    selection: Selection,
) -> Vec<AgentResponse> {
    fan_out(path, game, tick, selection, || turn_deadline.child(timeout)).await
}

async fn fan_out(
    path: &str,
    game: &Game,
    tick: &GameTick,
    selection: Selection,
    deadline_for: impl Fn() -> Deadline,
) -> Vec<AgentResponse> {
    let snakes = selection.select(tick);
    if snakes.is_empty() {
        return Vec::new();
    }

    let started = Instant::now();
    let dispatched = snakes.len();
    let path: Arc<str> = Arc::from(path);
    let game = Arc::new(game.clone());
    let tick = Arc::new(tick.clone());

    // 容量等于分发数：任务发送结果永不阻塞
    let (tx, mut rx) = mpsc::channel::<(usize, AgentResponse)>(dispatched);
    let mut tasks = JoinSet::new();

    for (idx, snake) in snakes.iter().cloned().enumerate() {
        let tx = tx.clone();
        let path = Arc::clone(&path);
        let game = Arc::clone(&game);
        let tick = Arc::clone(&tick);
        let deadline = deadline_for();
        tasks.spawn(async move {
            let resp = invoke(&path, &snake, &game, &tick, &deadline).await;
            let _ = tx.send((idx, resp)).await;
        });
    }
    drop(tx);

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, path = %path, "agent task failed");
        }
    }

    let mut slots: Vec<Option<AgentResponse>> = vec![None; dispatched];
    while let Some((idx, resp)) = rx.recv().await {
        slots[idx] = Some(resp);
    }

    // 任务 panic 时没有发送结果，补一个 transport-failure，保证一蛇一条
    let elapsed = started.elapsed();
    let responses: Vec<AgentResponse> = slots
        .into_iter()
        .zip(snakes)
        .map(|(slot, snake)| {
            slot.unwrap_or_else(|| {
                AgentResponse::failed(snake, InvokeError::transport("agent task aborted"), elapsed)
            })
        })
        .collect();

    let failed = responses.iter().filter(|r| !r.is_ok()).count();
    tracing::debug!(
        turn = tick.turn,
        path = %path,
        dispatched,
        failed,
        elapsed_ms = elapsed.as_millis() as u64,
        "gathered agent responses"
    );
    responses
}
