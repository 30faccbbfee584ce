use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use crate::models::{config::GameConfig, room::Room};
use crate::services::match_engine::MatchEngine;
use crate::utils::channel::RoomHub;

#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<Mutex<HashMap<String, Room>>>,
    // 進行中の試合。キーはルームID
    pub games: Arc<Mutex<HashMap<String, MatchEngine>>>,
    pub hub: Arc<RoomHub>,
    pub config: Arc<GameConfig>,
}

impl AppState {
    pub fn new(config: GameConfig) -> Self {
        AppState {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            games: Arc::new(Mutex::new(HashMap::new())),
            hub: Arc::new(RoomHub::new()),
            config: Arc::new(config),
        }
    }
}
