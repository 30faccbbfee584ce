use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{
    chat,
    config::GameConfig,
    game::{Game, GamePhase, GameResult, GameSnapshot},
    message::{Command, Notice, ServerMessage},
    rule::assign_roles,
};
use crate::services::{night_resolver, vote_resolver, win_evaluator, GameError};
use crate::utils::channel::{MatchBroadcaster, PlayerChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerControl {
    // 現在のフェーズのタイマーを即座に満了させる
    Advance,
    Shutdown,
}

/// 1試合を進行させるエンジン。
///
/// `Game`は1つの`Mutex`で守られ、行動の受付・解決・フェーズ遷移はすべてこのロックの下で行う。
/// フェーズの待ち時間は`tokio::time::sleep`で、制御チャンネルから早送りや停止ができる。
#[derive(Clone)]
pub struct MatchEngine {
    room_id: String,
    game: Arc<Mutex<Game>>,
    channels: Arc<HashMap<String, Arc<dyn PlayerChannel>>>,
    broadcaster: Arc<dyn MatchBroadcaster>,
    control: mpsc::UnboundedSender<SchedulerControl>,
    task: Arc<Mutex<Option<JoinHandle<GameResult>>>>,
}

impl MatchEngine {
    /// 役職を割り当てて試合を開始する。プレイヤーは参加順に渡す。
    pub fn start<R: Rng>(
        room_id: String,
        players: Vec<(String, Arc<dyn PlayerChannel>)>,
        broadcaster: Arc<dyn MatchBroadcaster>,
        config: GameConfig,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let roles = assign_roles(players.len(), rng)?;
        let assignments = players
            .iter()
            .map(|(name, _)| name.clone())
            .zip(roles)
            .collect();
        let game = Game::new(room_id, assignments);
        Ok(Self::with_game(
            game,
            players.into_iter().collect(),
            broadcaster,
            config,
        ))
    }

    /// 役職が決まった`Game`からスケジューラを起動する
    pub fn with_game(
        game: Game,
        channels: HashMap<String, Arc<dyn PlayerChannel>>,
        broadcaster: Arc<dyn MatchBroadcaster>,
        config: GameConfig,
    ) -> Self {
        let (control, control_rx) = mpsc::unbounded_channel();
        let engine = MatchEngine {
            room_id: game.room_id.clone(),
            game: Arc::new(Mutex::new(game)),
            channels: Arc::new(channels),
            broadcaster,
            control,
            task: Arc::new(Mutex::new(None)),
        };

        let handle = tokio::spawn(engine.clone().run(control_rx, config));
        // 起動直後なのでロックは空いている
        if let Ok(mut task) = engine.task.try_lock() {
            *task = Some(handle);
        }
        engine
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    fn deliver(&self, notices: Vec<Notice>) {
        for notice in notices {
            match notice {
                Notice::Broadcast(message) => {
                    self.broadcaster.broadcast(&self.room_id, message.to_string())
                }
                Notice::Private(to, message) => self.send_to(&to, message),
            }
        }
    }

    fn send_to(&self, name: &str, message: ServerMessage) {
        match self.channels.get(name) {
            Some(channel) => channel.send(message.to_string()),
            None => debug!("no channel for {} in room {}", name, self.room_id),
        }
    }

    async fn run(
        self,
        mut control: mpsc::UnboundedReceiver<SchedulerControl>,
        config: GameConfig,
    ) -> GameResult {
        {
            let game = self.game.lock().await;
            info!(
                "match {} started in room {} with {} players",
                game.match_id,
                self.room_id,
                game.players.len()
            );
            self.deliver(game.role_notices());
        }

        loop {
            self.enter(Game::enter_night).await;
            if !wait(config.night_duration, &mut control).await {
                return self.abort().await;
            }
            if let Some(result) = self
                .settle(|game| {
                    game.close_phase();
                    night_resolver::resolve_night(game)
                })
                .await
            {
                return result;
            }

            // 蘇生が適用されるので昼の開始時にも判定する
            if let Some(result) = self.settle(Game::enter_day).await {
                return result;
            }
            if !wait(config.day_duration, &mut control).await {
                return self.abort().await;
            }

            self.enter(Game::enter_vote).await;
            if !wait(config.vote_duration, &mut control).await {
                return self.abort().await;
            }
            if let Some(result) = self
                .settle(|game| {
                    game.close_phase();
                    vote_resolver::resolve_votes(game)
                })
                .await
            {
                return result;
            }

            if !wait(config.settle_delay, &mut control).await {
                return self.abort().await;
            }
        }
    }

    async fn enter<F>(&self, transition: F)
    where
        F: FnOnce(&mut Game) -> Vec<Notice>,
    {
        let mut game = self.game.lock().await;
        let notices = transition(&mut *game);
        debug!(
            "room {} entered {} (day {}, night {})",
            self.room_id,
            game.phase.as_str(),
            game.day_count,
            game.night_count
        );
        self.deliver(notices);
    }

    /// 状態を変更したあと勝敗を判定する。決着したら終了処理まで行う。
    async fn settle<F>(&self, transition: F) -> Option<GameResult>
    where
        F: FnOnce(&mut Game) -> Vec<Notice>,
    {
        let mut game = self.game.lock().await;
        let notices = transition(&mut *game);
        self.deliver(notices);

        match win_evaluator::check(&game) {
            GameResult::InProgress => None,
            result => {
                info!(
                    "match {} in room {} finished: {:?}",
                    game.match_id, self.room_id, result
                );
                let notices = game.finish(result);
                self.deliver(notices);
                Some(result)
            }
        }
    }

    async fn abort(&self) -> GameResult {
        let mut game = self.game.lock().await;
        warn!("match {} in room {} torn down", game.match_id, self.room_id);
        let notices = game.finish(GameResult::InProgress);
        self.deliver(notices);
        GameResult::InProgress
    }

    /// プレイヤーから届いた1行を処理する。拒否した場合は本人にだけ理由を返す。
    pub async fn handle_line(&self, sender: &str, line: &str) -> Result<(), GameError> {
        let result = match Command::parse(line) {
            Ok(Command::Chat(text)) => self.chat(sender, text).await,
            Ok(Command::NightAction { role, target }) => {
                let mut game = self.game.lock().await;
                let submitted =
                    night_resolver::submit_night_action(&mut game, sender, role, &target);
                submitted.map(|notices| self.deliver(notices))
            }
            Ok(Command::Vote { target }) => {
                let mut game = self.game.lock().await;
                let submitted = vote_resolver::submit_vote(&mut game, sender, &target);
                submitted.map(|notices| self.deliver(notices))
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            debug!("rejected line from {} in room {}: {}", sender, self.room_id, e);
            self.send_to(sender, ServerMessage::system(e.to_string()));
        }
        result
    }

    async fn chat(&self, sender: &str, text: String) -> Result<(), GameError> {
        let game = self.game.lock().await;
        let recipients = chat::recipients(&game, sender).ok_or(GameError::ChatUnavailable)?;
        for name in recipients {
            self.send_to(
                &name,
                ServerMessage::Chat {
                    from: sender.to_string(),
                    text: text.clone(),
                },
            );
        }
        Ok(())
    }

    /// 接続が切れたプレイヤーを記録する。全員いなくなったら試合を止めて`true`を返す。
    pub async fn disconnect(&self, name: &str) -> bool {
        let everyone_gone = {
            let mut game = self.game.lock().await;
            if let Some(player) = game.player_mut(name) {
                player.connected = false;
            }
            game.players.iter().all(|p| !p.connected)
        };
        if everyone_gone {
            self.shutdown();
        }
        everyone_gone
    }

    pub fn advance(&self) {
        let _ = self.control.send(SchedulerControl::Advance);
    }

    pub fn shutdown(&self) {
        let _ = self.control.send(SchedulerControl::Shutdown);
    }

    pub async fn phase(&self) -> GamePhase {
        self.game.lock().await.phase
    }

    pub async fn snapshot(&self, show_roles: bool) -> GameSnapshot {
        self.game.lock().await.snapshot(show_roles)
    }

    pub async fn verdict(&self) -> GameResult {
        win_evaluator::check(&*self.game.lock().await)
    }

    /// スケジューラの終了を待つ。2回目以降は`None`。
    pub async fn join(&self) -> Option<GameResult> {
        let handle = self.task.lock().await.take()?;
        match handle.await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("scheduler for room {} failed: {}", self.room_id, e);
                None
            }
        }
    }
}

/// タイマー満了か早送りで`true`、停止要求で`false`
async fn wait(duration: Duration, control: &mut mpsc::UnboundedReceiver<SchedulerControl>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        message = control.recv() => matches!(message, Some(SchedulerControl::Advance)),
    }
}
