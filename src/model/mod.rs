//! 对局数据模型：Game / Snake / Death / Point / GameTick
//!
//! 由外部规则引擎创建与推进；本 crate 只读取它们来构建 Agent 请求与持久化记录。

use serde::{Deserialize, Serialize};

/// 棋盘坐标（不可变值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 死亡记录：原因（自由标签）+ 发生回合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Death {
    pub cause: String,
    pub turn: u32,
}

/// 一条蛇（一个参赛 Agent）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    pub id: String,
    /// Agent 服务的根地址，如 `http://127.0.0.1:8080`
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    pub health: i32,
    #[serde(default)]
    pub body: Vec<Point>,
    #[serde(default)]
    pub death: Option<Death>,
}

impl Snake {
    pub fn new(id: impl Into<String>, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            name: name.into(),
            color: String::new(),
            health: 100,
            body: Vec::new(),
            death: None,
        }
    }

    /// 没有死亡记录即视为存活
    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }

    pub fn head(&self) -> Option<Point> {
        self.body.first().copied()
    }
}

/// 对局描述：创建后不变（蛇的逐回合状态在 GameTick 中）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub snakes: Vec<Snake>,
}

impl Game {
    /// 新建对局，id 使用 UUID v4
    pub fn new(width: u32, height: u32, snakes: Vec<Snake>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            width,
            height,
            snakes,
        }
    }
}

/// 一个回合的完整快照：回合号、所有蛇、食物
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameTick {
    pub turn: u32,
    #[serde(default)]
    pub snakes: Vec<Snake>,
    #[serde(default)]
    pub food: Vec<Point>,
}

impl GameTick {
    /// 第 0 回合：直接取对局的初始蛇
    pub fn initial(game: &Game, food: Vec<Point>) -> Self {
        Self {
            turn: 0,
            snakes: game.snakes.clone(),
            food,
        }
    }

    pub fn alive_snakes(&self) -> impl Iterator<Item = &Snake> {
        self.snakes.iter().filter(|s| s.is_alive())
    }

    pub fn snake(&self, id: &str) -> Option<&Snake> {
        self.snakes.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alive_snakes_skips_dead() {
        let mut dead = Snake::new("b", "http://b", "B");
        dead.death = Some(Death {
            cause: "starvation".into(),
            turn: 3,
        });
        let tick = GameTick {
            turn: 4,
            snakes: vec![Snake::new("a", "http://a", "A"), dead],
            food: vec![],
        };
        let alive: Vec<_> = tick.alive_snakes().map(|s| s.id.as_str()).collect();
        assert_eq!(alive, vec!["a"]);
        assert!(!tick.snake("b").unwrap().is_alive());
    }

    #[test]
    fn test_game_new_generates_distinct_ids() {
        let a = Game::new(11, 11, vec![]);
        let b = Game::new(11, 11, vec![]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_snake_deserialize_defaults() {
        let s: Snake = serde_json::from_str(
            r#"{"id":"s1","url":"http://localhost:1","name":"one","health":90}"#,
        )
        .unwrap();
        assert!(s.body.is_empty());
        assert!(s.is_alive());
        assert_eq!(s.color, "");
    }
}
