use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::state::AppState;
use crate::{
    models::game::GameResult,
    services::{game_service, room_service::RoomError, GameError},
};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:roomid",
            Router::new()
                // ゲームの基本操作
                .route("/start", post(start_game))
                .route("/end", post(end_game_handler))
                .route("/state", get(get_game_state))
                // ゲーム進行の管理（デバッグ用）
                .route("/phase/next", post(advance_phase_handler))
                .route("/check-winner", get(check_winner_handler)),
        )
        .with_state(state)
}

fn error_response(e: GameError) -> Response {
    let status = match e {
        GameError::GameNotFound(_) | GameError::Room(RoomError::RoomNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        GameError::DebugDisabled => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(e.to_string())).into_response()
}

pub async fn start_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Response {
    match game_service::start_game(state, &room_id, None).await {
        Ok(message) => (StatusCode::OK, Json(message)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_game_state(
    Path(room_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match game_service::get_game_state(state, room_id).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn end_game_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Response {
    match game_service::end_game(state, room_id).await {
        Ok(message) => (StatusCode::OK, Json(message)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn advance_phase_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Response {
    match game_service::advance_game_phase(state, &room_id).await {
        Ok(message) => (StatusCode::OK, Json(message)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn check_winner_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    match game_service::check_winner(state, &room_id).await {
        Ok(winner) => match winner {
            GameResult::InProgress => (StatusCode::OK, Json("ゲーム進行中".to_string())),
            GameResult::CitizenWin => (StatusCode::OK, Json("市民陣営の勝利".to_string())),
            GameResult::MafiaWin => (StatusCode::OK, Json("マフィア陣営の勝利".to_string())),
        }
        .into_response(),
        Err(e) => error_response(e),
    }
}
