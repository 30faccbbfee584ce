use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

/// 1人のプレイヤーへ1行を届ける
pub trait PlayerChannel: Send + Sync {
    fn send(&self, line: String);
}

/// ルーム内の全員へ1行を届ける
pub trait MatchBroadcaster: Send + Sync {
    fn broadcast(&self, room_id: &str, line: String);
}

impl PlayerChannel for mpsc::UnboundedSender<String> {
    fn send(&self, line: String) {
        // 切断済みの接続には届かなくてよい
        if mpsc::UnboundedSender::send(self, line).is_err() {
            debug!("player channel closed; dropping line");
        }
    }
}

/// ルームごとの`broadcast`チャンネル
#[derive(Default)]
pub struct RoomHub {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, room_id: &str) -> broadcast::Receiver<String> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(room_id.to_string())
            .or_insert_with(|| broadcast::channel(1000).0)
            .subscribe()
    }

    pub fn remove(&self, room_id: &str) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.remove(room_id);
    }
}

impl MatchBroadcaster for RoomHub {
    fn broadcast(&self, room_id: &str, line: String) {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = channels.get(room_id) {
            if let Err(e) = tx.send(line) {
                debug!("no listeners in room {}: {}", room_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hub_delivers_only_to_the_named_room() {
        let hub = RoomHub::new();
        let mut a = hub.subscribe("a");
        let mut b = hub.subscribe("b");

        hub.broadcast("a", "PHASE:NIGHT".to_string());

        assert_eq!(a.recv().await.unwrap(), "PHASE:NIGHT");
        assert!(b.try_recv().is_err());
    }
}
