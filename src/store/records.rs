//! 持久化记录：GameInfoRecord（每局一次）与 FrameRecord（每回合一次）
//!
//! 日志文件第一行是 GameInfoRecord，之后每行一个 FrameRecord。

use serde::{Deserialize, Serialize};

use crate::model::{Death, Game, GameTick, Point, Snake};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnakeInfo {
    pub id: String,
    pub name: String,
    pub color: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfoRecord {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub snakes: Vec<SnakeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnakeState {
    pub id: String,
    pub body: Vec<Point>,
    pub health: i32,
    /// 存活时序列化为 null
    pub death: Option<Death>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub turn: u32,
    pub snakes: Vec<SnakeState>,
    pub food: Vec<Point>,
}

impl From<&Snake> for SnakeInfo {
    fn from(s: &Snake) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            color: s.color.clone(),
            url: s.url.clone(),
        }
    }
}

impl From<&Snake> for SnakeState {
    fn from(s: &Snake) -> Self {
        Self {
            id: s.id.clone(),
            body: s.body.clone(),
            health: s.health,
            death: s.death.clone(),
        }
    }
}

impl GameInfoRecord {
    pub fn new(game: &Game, snakes: &[Snake]) -> Self {
        Self {
            id: game.id.clone(),
            width: game.width,
            height: game.height,
            snakes: snakes.iter().map(SnakeInfo::from).collect(),
        }
    }
}

impl From<&GameTick> for FrameRecord {
    fn from(tick: &GameTick) -> Self {
        Self {
            turn: tick.turn,
            snakes: tick.snakes.iter().map(SnakeState::from).collect(),
            food: tick.food.clone(),
        }
    }
}

/// 序列化为单行 JSON 并追加换行符
pub fn encode_line<T: Serialize>(record: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_wire_shape() {
        let mut a = Snake::new("a", "http://a", "A");
        a.body = vec![Point::new(0, 1)];
        a.health = 88;
        let tick = GameTick {
            turn: 3,
            snakes: vec![a],
            food: vec![Point::new(4, 5)],
        };
        let line = encode_line(&FrameRecord::from(&tick)).unwrap();
        assert_eq!(*line.last().unwrap(), b'\n');
        assert_eq!(line.iter().filter(|b| **b == b'\n').count(), 1);

        let v: serde_json::Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(v["turn"], 3);
        assert_eq!(v["snakes"][0]["health"], 88);
        assert_eq!(v["snakes"][0]["body"][0]["y"], 1);
        assert!(v["snakes"][0]["death"].is_null());
        assert_eq!(v["food"][0]["x"], 4);
    }

    #[test]
    fn test_game_info_wire_shape() {
        let mut s = Snake::new("a", "http://a", "A");
        s.color = "#ff0000".into();
        let game = Game {
            id: "g1".into(),
            width: 11,
            height: 13,
            snakes: vec![s.clone()],
        };
        let v = serde_json::to_value(GameInfoRecord::new(&game, &game.snakes)).unwrap();
        assert_eq!(v["id"], "g1");
        assert_eq!(v["height"], 13);
        assert_eq!(v["snakes"][0]["color"], "#ff0000");
        assert_eq!(v["snakes"][0]["url"], "http://a");
        assert!(v["snakes"][0].get("health").is_none());
    }
}
