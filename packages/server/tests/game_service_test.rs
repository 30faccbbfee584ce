use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;

use mafia_server::{
    models::{
        game::{GamePhase, GameResult},
        role::Role,
        room::RoomStatus,
    },
    services::{game_service, match_engine::MatchEngine, room_service, GameError},
    state::AppState,
    utils::{
        channel::PlayerChannel,
        test_setup::{
            game_with_roles, setup_test_env, test_config, RecordingBroadcaster, RecordingChannel,
        },
    },
};

// 既定の時間配分: 夜 0-30s, 昼 30-60s, 投票 60-80s, 待機 80-85s, 2夜目 85-115s
struct Table {
    engine: MatchEngine,
    channels: HashMap<String, Arc<RecordingChannel>>,
    broadcaster: Arc<RecordingBroadcaster>,
    started: Instant,
}

impl Table {
    fn new(roles: &[(&str, Role)]) -> Self {
        setup_test_env();
        let channels: HashMap<String, Arc<RecordingChannel>> = roles
            .iter()
            .map(|(name, _)| (name.to_string(), Arc::new(RecordingChannel::default())))
            .collect();
        let player_channels: HashMap<String, Arc<dyn PlayerChannel>> = channels
            .iter()
            .map(|(name, channel)| (name.clone(), channel.clone() as Arc<dyn PlayerChannel>))
            .collect();
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let started = Instant::now();
        let engine = MatchEngine::with_game(
            game_with_roles(roles),
            player_channels,
            broadcaster.clone(),
            test_config(),
        );
        Table {
            engine,
            channels,
            broadcaster,
            started,
        }
    }

    async fn at(&self, seconds: u64) {
        tokio::time::sleep_until(self.started + Duration::from_secs(seconds)).await;
    }

    fn lines(&self, name: &str) -> Vec<String> {
        self.channels[name].lines()
    }

    async fn send(&self, name: &str, line: &str) -> Result<(), GameError> {
        self.engine.handle_line(name, line).await
    }
}

fn four_players() -> Vec<(&'static str, Role)> {
    vec![
        ("m", Role::Mafia),
        ("d", Role::Doctor),
        ("p", Role::Police),
        ("c", Role::Citizen),
    ]
}

#[tokio::test(start_paused = true)]
async fn citizens_win_by_voting_out_the_mafia() {
    let table = Table::new(&four_players());

    table.at(1).await;
    assert_eq!(table.engine.phase().await, GamePhase::Night);
    table.send("m", "NIGHT_ACTION:MAFIA:c").await.unwrap();
    table.send("d", "NIGHT_ACTION:DOCTOR:c").await.unwrap();

    table.at(31).await;
    assert_eq!(table.engine.phase().await, GamePhase::Day);
    let snapshot = table.engine.snapshot(false).await;
    assert!(snapshot.players.iter().all(|p| p.alive));

    table.at(61).await;
    assert_eq!(table.engine.phase().await, GamePhase::Vote);
    for voter in ["d", "p", "c"] {
        table.send(voter, "VOTE:m").await.unwrap();
    }

    assert_eq!(table.engine.join().await, Some(GameResult::CitizenWin));
    assert_eq!(table.engine.phase().await, GamePhase::Ended);

    let public = table.broadcaster.lines();
    assert!(public.contains(&"SYSTEM:mが投票で処刑されました".to_string()));
    assert!(public.contains(&"SYSTEM:市民陣営の勝利".to_string()));
    assert!(public.contains(&"SYSTEM:m: MAFIA".to_string()));
    assert!(table.lines("m").contains(&"DEAD:true".to_string()));
}

#[tokio::test(start_paused = true)]
async fn mafia_wins_on_the_second_night() {
    let table = Table::new(&four_players());

    table.at(1).await;
    table.send("m", "NIGHT_ACTION:MAFIA:c").await.unwrap();

    // 投票なしの昼を経て2夜目
    table.at(86).await;
    assert_eq!(table.engine.phase().await, GamePhase::Night);
    let snapshot = table.engine.snapshot(false).await;
    assert_eq!(snapshot.night_count, 2);
    table.send("m", "NIGHT_ACTION:MAFIA:d").await.unwrap();

    assert_eq!(table.engine.join().await, Some(GameResult::MafiaWin));
    let public = table.broadcaster.lines();
    assert!(public.contains(&"SYSTEM:処刑は行われませんでした".to_string()));
    assert!(public.contains(&"SYSTEM:マフィア陣営の勝利".to_string()));
}

#[tokio::test(start_paused = true)]
async fn rejected_commands_are_answered_privately() {
    let table = Table::new(&four_players());
    table.at(1).await;

    let rejected = table.send("c", "VOTE:m").await;
    assert!(matches!(
        rejected,
        Err(GameError::IllegalPhaseAction {
            phase: GamePhase::Night,
            ..
        })
    ));

    let reply = table.lines("c").last().cloned().unwrap();
    assert!(reply.starts_with("SYSTEM:"));
    assert!(!table.lines("m").contains(&reply));
    assert!(!table.broadcaster.lines().contains(&reply));
}

#[tokio::test(start_paused = true)]
async fn night_chat_stays_with_the_mafia() {
    let table = Table::new(&[
        ("m1", Role::Mafia),
        ("m2", Role::Mafia),
        ("d", Role::Doctor),
        ("p", Role::Police),
        ("c1", Role::Citizen),
        ("c2", Role::Citizen),
    ]);
    table.at(1).await;

    table.send("m1", "target c1").await.unwrap();
    assert!(table.lines("m2").contains(&"CHAT:m1:target c1".to_string()));
    assert!(!table.lines("c1").contains(&"CHAT:m1:target c1".to_string()));

    assert_eq!(
        table.send("c1", "hello?").await,
        Err(GameError::ChatUnavailable)
    );
}

#[tokio::test(start_paused = true)]
async fn role_notices_open_the_match() {
    let table = Table::new(&four_players());
    table.at(1).await;

    assert_eq!(table.lines("d")[..2], ["ROLE:DOCTOR", "DEAD:false"]);
    assert_eq!(table.lines("m")[..2], ["ROLE:MAFIA", "DEAD:false"]);
    assert_eq!(
        table.broadcaster.lines()[..2],
        ["PHASE:NIGHT", "PLAYERS:m,d,p,c"]
    );
}

#[tokio::test(start_paused = true)]
async fn advance_skips_the_remaining_timer() {
    let table = Table::new(&four_players());
    table.at(1).await;

    table.engine.advance();
    table.at(2).await;

    assert_eq!(table.engine.phase().await, GamePhase::Day);
    assert!(table
        .broadcaster
        .lines()
        .contains(&"SYSTEM:昨夜は誰も死にませんでした".to_string()));
}

#[tokio::test(start_paused = true)]
async fn everyone_leaving_stops_the_match() {
    let table = Table::new(&four_players());
    table.at(1).await;

    for name in ["m", "d", "p"] {
        assert!(!table.engine.disconnect(name).await);
    }
    assert!(table.engine.disconnect("c").await);

    assert_eq!(table.engine.join().await, Some(GameResult::InProgress));
    assert_eq!(table.engine.phase().await, GamePhase::Ended);
}

#[tokio::test(start_paused = true)]
async fn seeded_start_deals_every_player_a_role() {
    setup_test_env();
    let channels: Vec<Arc<RecordingChannel>> =
        (0..5).map(|_| Arc::new(RecordingChannel::default())).collect();
    let players: Vec<(String, Arc<dyn PlayerChannel>)> = channels
        .iter()
        .enumerate()
        .map(|(i, channel)| (format!("p{}", i), channel.clone() as Arc<dyn PlayerChannel>))
        .collect();

    let engine = MatchEngine::start(
        "seeded".to_string(),
        players,
        Arc::new(RecordingBroadcaster::default()),
        test_config(),
        &mut StdRng::seed_from_u64(7),
    )
    .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let snapshot = engine.snapshot(true).await;
    let mafia = snapshot
        .players
        .iter()
        .filter(|p| p.role == Some(Role::Mafia))
        .count();
    assert_eq!(mafia, 2);
    for channel in &channels {
        assert!(channel.lines()[0].starts_with("ROLE:"));
    }
    engine.shutdown();
}

#[tokio::test(start_paused = true)]
async fn too_few_players_cannot_start() {
    let players: Vec<(String, Arc<dyn PlayerChannel>)> = (0..3)
        .map(|i| {
            (
                format!("p{}", i),
                Arc::new(RecordingChannel::default()) as Arc<dyn PlayerChannel>,
            )
        })
        .collect();

    let started = MatchEngine::start(
        "small".to_string(),
        players,
        Arc::new(RecordingBroadcaster::default()),
        test_config(),
        &mut StdRng::seed_from_u64(1),
    );
    assert_eq!(started.err(), Some(GameError::InvalidPlayerCount(3)));
}

async fn lobby(state: &AppState, names: &[&str]) {
    for name in names {
        room_service::join_room(state, "r1", name, Arc::new(RecordingChannel::default()))
            .await
            .unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn owner_start_and_teardown_through_the_service() {
    setup_test_env();
    let state = AppState::new(test_config());
    lobby(&state, &["alice", "bob", "carol", "dave"]).await;

    assert_eq!(
        game_service::start_game(state.clone(), "r1", Some("bob")).await,
        Err(GameError::Room(room_service::RoomError::NotRoomOwner))
    );
    game_service::start_game(state.clone(), "r1", Some("alice"))
        .await
        .unwrap();
    assert_eq!(
        game_service::start_game(state.clone(), "r1", Some("alice")).await,
        Err(GameError::Room(room_service::RoomError::AlreadyStarted))
    );
    assert_eq!(
        game_service::check_winner(state.clone(), "r1").await,
        Ok(GameResult::InProgress)
    );

    // 開始後の参加は拒否される
    let late = room_service::join_room(&state, "r1", "eve", Arc::new(RecordingChannel::default()))
        .await;
    assert_eq!(late.err(), Some(room_service::RoomError::AlreadyStarted));

    for name in ["alice", "bob", "carol", "dave"] {
        game_service::player_disconnected(&state, "r1", name).await;
    }
    assert!(state.games.lock().await.is_empty());
    assert!(state.rooms.lock().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn ended_match_closes_the_room() {
    setup_test_env();
    let state = AppState::new(test_config());
    lobby(&state, &["alice", "bob", "carol", "dave"]).await;
    game_service::start_game(state.clone(), "r1", None)
        .await
        .unwrap();

    game_service::end_game(state.clone(), "r1".to_string())
        .await
        .unwrap();
    assert_eq!(
        game_service::get_game_state(state.clone(), "r1".to_string())
            .await
            .err(),
        Some(GameError::GameNotFound("r1".to_string()))
    );
    assert_eq!(
        state.rooms.lock().await["r1"].status,
        RoomStatus::Closed
    );
}
