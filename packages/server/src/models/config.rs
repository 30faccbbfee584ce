use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub night_duration: Duration,
    pub day_duration: Duration,
    pub vote_duration: Duration,
    // 投票結果の発表から次の夜までの待ち時間
    pub settle_delay: Duration,
    // 行単位プロトコルの待ち受けアドレス
    pub listen_addr: String,
    pub http_addr: String,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    // 進行中でも状態APIに役職を含めるかどうか
    pub show_player_roles: bool,
}

// 環境変数は`from_env`だけが読む
impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
            show_player_roles: cfg!(debug_assertions),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            night_duration: Duration::from_secs(30),
            day_duration: Duration::from_secs(30),
            vote_duration: Duration::from_secs(20),
            settle_delay: Duration::from_secs(5),
            listen_addr: "127.0.0.1:7000".to_string(),
            http_addr: "127.0.0.1:8080".to_string(),
            debug: DebugConfig::default(),
        }
    }
}

fn seconds(var: &str, default: Duration) -> Duration {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl DebugConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let enabled = env::var("DEBUG_ENABLED")
            .map(|v| v == "true")
            .unwrap_or(defaults.enabled);
        let show_player_roles = env::var("DEBUG_SHOW_PLAYER_ROLES")
            .map(|v| v == "true")
            .unwrap_or(enabled);

        Self {
            enabled,
            show_player_roles,
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            night_duration: seconds("NIGHT_DURATION_SECONDS", defaults.night_duration),
            day_duration: seconds("DAY_DURATION_SECONDS", defaults.day_duration),
            vote_duration: seconds("VOTE_DURATION_SECONDS", defaults.vote_duration),
            settle_delay: seconds("SETTLE_DELAY_SECONDS", defaults.settle_delay),
            listen_addr: env::var("GAME_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            http_addr: env::var("HTTP_LISTEN_ADDR").unwrap_or(defaults.http_addr),
            debug: DebugConfig::from_env(),
        }
    }
}
