use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::{
    models::{
        game::{GamePhase, GameResult, GameSnapshot},
        message::{Command, ServerMessage},
        role::Role,
        room::RoomStatus,
    },
    services::{match_engine::MatchEngine, room_service},
    state::AppState,
    utils::channel::{MatchBroadcaster, PlayerChannel},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("プレイヤー数は4〜8人である必要があります（現在{0}人）")]
    InvalidPlayerCount(usize),
    #[error("{action}は{}フェーズでは実行できません", .phase.as_str())]
    IllegalPhaseAction {
        action: &'static str,
        phase: GamePhase,
    },
    #[error("対象プレイヤーが見つかりません: {0}")]
    UnknownTarget(String),
    #[error("この能力はもう使えません")]
    AbilityAlreadyUsed,
    #[error("死亡したプレイヤーは行動できません")]
    DeadActorNotPermitted,
    #[error("このゲームに参加していません: {0}")]
    UnknownPlayer(String),
    #[error("{0}の夜の能力は使えません")]
    NoNightAbility(Role),
    #[error("{0}はすでに死亡しています")]
    DeadTarget(String),
    #[error("{0}は対象にできません")]
    InvalidTarget(String),
    #[error("{0}の能力は今夜は使えません")]
    AbilityUnavailable(Role),
    #[error("誘惑されているため能力を使えません")]
    Seduced,
    #[error("ギャングに脅されているため投票できません")]
    VoteBanned,
    #[error("コマンドの形式が不正です: {0}")]
    MalformedCommand(String),
    #[error("いまは発言できません")]
    ChatUnavailable,
    #[error("ゲームが見つかりません: {0}")]
    GameNotFound(String),
    #[error("デバッグモードが無効です")]
    DebugDisabled,
    #[error(transparent)]
    Room(#[from] room_service::RoomError),
}

/// ルームの試合を開始する。`requester`があればオーナーか確認する。
pub async fn start_game(
    state: AppState,
    room_id: &str,
    requester: Option<&str>,
) -> Result<String, GameError> {
    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| room_service::RoomError::RoomNotFound(room_id.to_string()))?;

    if let Some(name) = requester {
        if !room.is_owner(name) {
            return Err(room_service::RoomError::NotRoomOwner.into());
        }
    }
    if room.status != RoomStatus::Open {
        return Err(room_service::RoomError::AlreadyStarted.into());
    }

    let players: Vec<(String, Arc<dyn PlayerChannel>)> = room
        .players
        .iter()
        .filter_map(|name| {
            room.channels
                .get(name)
                .map(|channel| (name.clone(), channel.clone()))
        })
        .collect();
    let broadcaster: Arc<dyn MatchBroadcaster> = state.hub.clone();
    let engine = MatchEngine::start(
        room_id.to_string(),
        players,
        broadcaster,
        (*state.config).clone(),
        &mut StdRng::from_entropy(),
    )?;

    room.status = RoomStatus::InProgress;
    state
        .games
        .lock()
        .await
        .insert(room_id.to_string(), engine.clone());
    drop(rooms);

    watch_match(state.clone(), room_id.to_string(), engine);

    Ok("Game started successfully".to_string())
}

/// 試合が終わったらエンジンを片付けてルームを閉じる
fn watch_match(state: AppState, room_id: String, engine: MatchEngine) {
    tokio::spawn(async move {
        let result = engine.join().await;
        info!("room {} closed: {:?}", room_id, result);
        state.games.lock().await.remove(&room_id);
        if let Some(room) = state.rooms.lock().await.get_mut(&room_id) {
            room.status = RoomStatus::Closed;
        }
    });
}

async fn engine_for(state: &AppState, room_id: &str) -> Result<MatchEngine, GameError> {
    state
        .games
        .lock()
        .await
        .get(room_id)
        .cloned()
        .ok_or_else(|| GameError::GameNotFound(room_id.to_string()))
}

pub async fn get_game_state(state: AppState, room_id: String) -> Result<GameSnapshot, GameError> {
    let engine = engine_for(&state, &room_id).await?;
    Ok(engine.snapshot(state.config.debug.show_player_roles).await)
}

/// デバッグ用：現在のフェーズのタイマーを即座に満了させる
pub async fn advance_game_phase(state: AppState, room_id: &str) -> Result<String, GameError> {
    if !state.config.debug.enabled {
        return Err(GameError::DebugDisabled);
    }
    let engine = engine_for(&state, room_id).await?;
    if engine.phase().await == GamePhase::Ended {
        return Err(GameError::IllegalPhaseAction {
            action: "ADVANCE",
            phase: GamePhase::Ended,
        });
    }
    engine.advance();
    Ok("Phase advance requested".to_string())
}

pub async fn check_winner(state: AppState, room_id: &str) -> Result<GameResult, GameError> {
    let engine = engine_for(&state, room_id).await?;
    Ok(engine.verdict().await)
}

/// 試合を止めてルームを片付ける
pub async fn end_game(state: AppState, room_id: String) -> Result<String, GameError> {
    let engine = state
        .games
        .lock()
        .await
        .remove(&room_id)
        .ok_or_else(|| GameError::GameNotFound(room_id.clone()))?;
    engine.shutdown();
    if let Some(room) = state.rooms.lock().await.get_mut(&room_id) {
        room.status = RoomStatus::Closed;
    }
    Ok("Game ended successfully".to_string())
}

/// 接続から届いた1行を振り分ける
pub async fn handle_player_line(
    state: &AppState,
    room_id: &str,
    sender: &str,
    line: &str,
    reply: &dyn PlayerChannel,
) {
    if line == "START" {
        if let Err(e) = start_game(state.clone(), room_id, Some(sender)).await {
            reply.send(ServerMessage::system(e.to_string()).to_string());
        }
        return;
    }

    if let Ok(engine) = engine_for(state, room_id).await {
        // 拒否理由はエンジンが本人に返す
        let _ = engine.handle_line(sender, line).await;
        return;
    }

    // 開始前のロビー
    match Command::parse(line) {
        Ok(Command::Chat(text)) => state.hub.broadcast(
            room_id,
            ServerMessage::Chat {
                from: sender.to_string(),
                text,
            }
            .to_string(),
        ),
        Ok(_) => reply.send(
            ServerMessage::system(
                GameError::IllegalPhaseAction {
                    action: "ACTION",
                    phase: GamePhase::Waiting,
                }
                .to_string(),
            )
            .to_string(),
        ),
        Err(e) => reply.send(ServerMessage::system(e.to_string()).to_string()),
    }
}

/// 切断処理。試合中は生存扱いのまま記録し、全員切断したら試合を片付ける。
pub async fn player_disconnected(state: &AppState, room_id: &str, name: &str) {
    let engine = state.games.lock().await.get(room_id).cloned();
    match engine {
        Some(engine) => {
            if engine.disconnect(name).await {
                warn!("everyone left room {}; tearing down match", room_id);
                state.games.lock().await.remove(room_id);
                state.rooms.lock().await.remove(room_id);
                state.hub.remove(room_id);
            }
        }
        None => {
            room_service::leave_room(state, room_id, name).await;
        }
    }
}
