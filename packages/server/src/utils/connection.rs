use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::models::message::ServerMessage;
use crate::services::{game_service, room_service};
use crate::state::AppState;
use crate::utils::channel::PlayerChannel;

/// 行単位プロトコルの待ち受けループ
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("connection from {}", peer);
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                warn!("connection {} closed with error: {}", peer, e);
            }
        });
    }
}

/// `JOIN:<ルームID>:<名前>`
fn parse_join(line: &str) -> Option<(String, String)> {
    let rest = line.trim_end_matches(['\r', '\n']).strip_prefix("JOIN:")?;
    let (room_id, name) = rest.split_once(':')?;
    let (room_id, name) = (room_id.trim(), name.trim());
    if room_id.is_empty() || name.is_empty() {
        return None;
    }
    Some((room_id.to_string(), name.to_string()))
}

async fn reject(writer: &mut (impl AsyncWriteExt + Unpin), reason: String) -> std::io::Result<()> {
    writer
        .write_all(format!("{}\n", ServerMessage::system(reason)).as_bytes())
        .await
}

pub async fn handle_connection(stream: TcpStream, state: AppState) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let Some(first) = lines.next_line().await? else {
        return Ok(());
    };
    let Some((room_id, name)) = parse_join(&first) else {
        return reject(
            &mut writer,
            "最初に JOIN:<ルームID>:<名前> を送ってください".to_string(),
        )
        .await;
    };

    let (tx, mut private_rx) = mpsc::unbounded_channel::<String>();
    let channel: Arc<dyn PlayerChannel> = Arc::new(tx);
    let mut room_rx = match room_service::join_room(&state, &room_id, &name, channel.clone()).await
    {
        Ok(rx) => rx,
        Err(e) => return reject(&mut writer, e.to_string()).await,
    };
    info!("{} connected to room {}", name, room_id);

    // 本人宛てとルーム全体宛ての両方を1本の接続に書き出す
    let writer_room = room_id.clone();
    let writer_task = tokio::spawn(async move {
        let mut room_open = true;
        loop {
            let line = tokio::select! {
                biased;
                line = private_rx.recv() => match line {
                    Some(line) => line,
                    None => break,
                },
                received = room_rx.recv(), if room_open => match received {
                    Ok(line) => line,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("client in room {} lagged; {} lines skipped", writer_room, skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        room_open = false;
                        continue;
                    }
                },
            };
            if writer.write_all(format!("{}\n", line).as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let read_result = async {
        while let Some(line) = lines.next_line().await? {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            game_service::handle_player_line(&state, &room_id, &name, line, channel.as_ref())
                .await;
        }
        Ok::<(), std::io::Error>(())
    }
    .await;

    info!("{} disconnected from room {}", name, room_id);
    game_service::player_disconnected(&state, &room_id, &name).await;
    writer_task.abort();
    read_result
}
