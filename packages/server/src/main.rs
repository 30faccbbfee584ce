use std::future::IntoFuture;

use anyhow::Context;
use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::{Builder, Env};
use log::LevelFilter;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use mafia_server::{app, models::config::GameConfig, state::AppState, utils::connection};

// ログ設定。RUST_LOGがなければinfo
fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("tower_http", LevelFilter::Debug)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数をロード
    if let Err(e) = dotenv() {
        eprintln!("Warning: .envファイルの読み込みに失敗しました: {}", e);
    }

    init_logger(); // ロガーの初期化

    let config = GameConfig::from_env();
    log::info!("設定: {:?}", config);
    let state = AppState::new(config.clone());

    // 行単位プロトコルのサーバー
    let game_listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    log::info!("ゲームサーバーを起動しました: {}", config.listen_addr);
    let game_server = tokio::spawn(connection::serve(game_listener, state.clone()));

    // CORSレイヤーの設定
    let cors = CorsLayer::new()
        .allow_origin([HeaderValue::from_static("http://localhost:3000")])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    // ルーティングの設定
    let app = app::create_app(state)
        .layer(cors) // CORSレイヤーを追加
        .layer(
            TraceLayer::new_for_http() // HTTPトレースログを有効化
                .make_span_with(|request: &http::Request<_>| {
                    tracing::info_span!(
                        "HTTP request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
        );

    let http_listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    log::info!("HTTPサーバーを起動しました: http://{}", config.http_addr);

    tokio::select! {
        served = axum::serve(http_listener, app).into_future() => served.context("http server stopped")?,
        stopped = game_server => stopped.context("game server task panicked")?.context("game server stopped")?,
    }
    Ok(())
}
