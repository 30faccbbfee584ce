use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::{
    models::{
        game::GamePhase,
        message::ServerMessage,
        room::{Room, RoomStatus},
    },
    state::AppState,
    utils::channel::{MatchBroadcaster, PlayerChannel},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("ルームが見つかりません: {0}")]
    RoomNotFound(String),
    #[error("ルームのオーナーだけが開始できます")]
    NotRoomOwner,
    #[error("ゲームはすでに開始しています")]
    AlreadyStarted,
    #[error("ルームが満員です")]
    RoomFull,
    #[error("その名前はすでに使われています: {0}")]
    NameTaken(String),
    #[error("名前に使えない文字が含まれています: {0}")]
    InvalidName(String),
}

fn lobby_roster(room: &Room) -> ServerMessage {
    ServerMessage::Players(room.players.iter().map(|name| (name.clone(), true)).collect())
}

/// ルームに参加する。ルームがなければ作成し、最初の参加者をオーナーにする。
///
/// 戻り値はルーム全体への配信を受け取るレシーバー。
pub async fn join_room(
    state: &AppState,
    room_id: &str,
    name: &str,
    channel: Arc<dyn PlayerChannel>,
) -> Result<broadcast::Receiver<String>, RoomError> {
    // 名前は行プロトコルの区切り文字を含められない
    if name.is_empty() || name.contains([':', ',']) || name.starts_with("[DEAD]") {
        return Err(RoomError::InvalidName(name.to_string()));
    }

    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .entry(room_id.to_string())
        .or_insert_with(|| Room::new(room_id.to_string()));

    if room.status != RoomStatus::Open {
        return Err(RoomError::AlreadyStarted);
    }
    if room.players.len() >= room.max_players {
        return Err(RoomError::RoomFull);
    }
    if room.players.iter().any(|p| p == name) {
        return Err(RoomError::NameTaken(name.to_string()));
    }

    room.players.push(name.to_string());
    room.channels.insert(name.to_string(), channel.clone());
    if room.owner.is_none() {
        room.owner = Some(name.to_string());
    }

    let receiver = state.hub.subscribe(room_id);
    channel.send(ServerMessage::Phase(GamePhase::Waiting).to_string());
    state.hub.broadcast(room_id, lobby_roster(room).to_string());
    state.hub.broadcast(
        room_id,
        ServerMessage::system(format!("{}が参加しました", name)).to_string(),
    );
    info!(
        "{} joined room {} ({}/{})",
        name,
        room_id,
        room.players.len(),
        room.max_players
    );

    Ok(receiver)
}

/// 開始前のルームから抜ける。空になったルームは削除する。
pub async fn leave_room(state: &AppState, room_id: &str, name: &str) -> bool {
    let mut rooms = state.rooms.lock().await;

    let Some(room) = rooms.get_mut(room_id) else {
        return false;
    };
    let Some(index) = room.players.iter().position(|p| p == name) else {
        return false;
    };

    room.players.remove(index);
    room.channels.remove(name);

    if room.players.is_empty() {
        rooms.remove(room_id);
        state.hub.remove(room_id);
        info!("room {} removed", room_id);
        return true;
    }

    if room.is_owner(name) {
        // 次に古い参加者がオーナーを引き継ぐ
        room.owner = room.players.first().cloned();
    }
    state.hub.broadcast(room_id, lobby_roster(room).to_string());
    state.hub.broadcast(
        room_id,
        ServerMessage::system(format!("{}が退出しました", name)).to_string(),
    );
    true
}

pub async fn get_rooms(state: &AppState) -> HashMap<String, Room> {
    state.rooms.lock().await.clone()
}
