use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::{services::room_service, state::AppState};

pub fn routes(state: AppState) -> Router {
    Router::new()
        // ルーム一覧取得
        // curl http://localhost:8080/api/room/rooms
        .route("/rooms", get(get_rooms))
        // 特定のルーム情報取得
        // curl http://localhost:8080/api/room/{roomid}
        .route("/:roomid", get(get_room_info))
        .with_state(state)
}

async fn get_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = room_service::get_rooms(&state).await;
    (StatusCode::OK, Json(rooms))
}

async fn get_room_info(State(state): State<AppState>, Path(room_id): Path<String>) -> Response {
    match room_service::get_rooms(&state).await.remove(&room_id) {
        Some(room) => (StatusCode::OK, Json(room)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(format!("Room {} not found", room_id)),
        )
            .into_response(),
    }
}
