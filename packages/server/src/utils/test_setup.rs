use dotenvy::dotenv;
use std::sync::{Mutex, Once};
use std::time::Duration;

use crate::models::{
    config::{DebugConfig, GameConfig},
    game::Game,
    role::Role,
};
use crate::utils::channel::{MatchBroadcaster, PlayerChannel};

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// 役職を固定したゲームを作る
pub fn game_with_roles(players: &[(&str, Role)]) -> Game {
    Game::new(
        "test-room".to_string(),
        players
            .iter()
            .map(|(name, role)| (name.to_string(), *role))
            .collect(),
    )
}

/// テスト用の設定。デバッグ操作を有効にする
pub fn test_config() -> GameConfig {
    GameConfig {
        night_duration: Duration::from_secs(30),
        day_duration: Duration::from_secs(30),
        vote_duration: Duration::from_secs(20),
        settle_delay: Duration::from_secs(5),
        listen_addr: "127.0.0.1:0".to_string(),
        http_addr: "127.0.0.1:0".to_string(),
        debug: DebugConfig {
            enabled: true,
            show_player_roles: true,
        },
    }
}

/// 送られた行を記録するだけのチャンネル
#[derive(Default)]
pub struct RecordingChannel {
    lines: Mutex<Vec<String>>,
}

impl RecordingChannel {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl PlayerChannel for RecordingChannel {
    fn send(&self, line: String) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).push(line);
    }
}

/// 全体配信を記録するだけのブロードキャスター
#[derive(Default)]
pub struct RecordingBroadcaster {
    lines: Mutex<Vec<String>>,
}

impl RecordingBroadcaster {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl MatchBroadcaster for RecordingBroadcaster {
    fn broadcast(&self, _room_id: &str, line: String) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).push(line);
    }
}
