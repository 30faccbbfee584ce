use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::rule::MAX_PLAYERS;
use crate::utils::channel::PlayerChannel;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub enum RoomStatus {
    Open,
    InProgress,
    Closed,
}

#[derive(Clone, Serialize)]
pub struct Room {
    pub room_id: String,
    // 最初に参加した人がオーナー
    pub owner: Option<String>,
    // 参加順
    pub players: Vec<String>,
    pub max_players: usize,
    pub status: RoomStatus,
    #[serde(skip)]
    pub channels: HashMap<String, Arc<dyn PlayerChannel>>,
}

impl Room {
    pub fn new(room_id: String) -> Self {
        Room {
            room_id,
            owner: None,
            players: Vec::new(),
            max_players: MAX_PLAYERS,
            status: RoomStatus::Open,
            channels: HashMap::new(),
        }
    }

    pub fn is_owner(&self, name: &str) -> bool {
        self.owner.as_deref() == Some(name)
    }
}
