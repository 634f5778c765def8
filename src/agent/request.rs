//! Agent 请求体：对局 + 当前回合 + 自身身份的投影
//!
//! 每个 Agent 收到的内容相同，只有 `you` 不同。只做序列化，借用原数据不拷贝。

use serde::Serialize;

use crate::model::{Game, GameTick, Point, Snake};

#[derive(Debug, Serialize)]
pub struct SnakeRequest<'a> {
    pub game: GameRef<'a>,
    pub turn: u32,
    pub board: Board<'a>,
    pub you: SnakeView<'a>,
}

#[derive(Debug, Serialize)]
pub struct GameRef<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Board<'a> {
    pub width: u32,
    pub height: u32,
    pub food: &'a [Point],
    pub snakes: Vec<SnakeView<'a>>,
}

/// 对 Agent 公开的蛇信息（不含 url）
#[derive(Debug, Serialize)]
pub struct SnakeView<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub health: i32,
    pub body: &'a [Point],
}

impl<'a> From<&'a Snake> for SnakeView<'a> {
    fn from(s: &'a Snake) -> Self {
        Self {
            id: &s.id,
            name: &s.name,
            health: s.health,
            body: &s.body,
        }
    }
}

/// 为 `you` 构建请求；棋盘上只列出存活的蛇
pub fn build_snake_request<'a>(game: &'a Game, tick: &'a GameTick, you: &'a Snake) -> SnakeRequest<'a> {
    SnakeRequest {
        game: GameRef { id: &game.id },
        turn: tick.turn,
        board: Board {
            width: game.width,
            height: game.height,
            food: &tick.food,
            snakes: tick.alive_snakes().map(SnakeView::from).collect(),
        },
        you: SnakeView::from(you),
    }
}
