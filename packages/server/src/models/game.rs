use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionLog;
use super::message::{Notice, ServerMessage};
use super::player::Player;
use super::role::Role;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GamePhase {
    Waiting, // ゲーム開始前
    Night,   // 夜フェーズ
    Day,     // 昼（議論）フェーズ
    Vote,    // 投票フェーズ
    Ended,   // ゲーム終了
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Waiting => "WAITING",
            GamePhase::Night => "NIGHT",
            GamePhase::Day => "DAY",
            GamePhase::Vote => "VOTE",
            GamePhase::Ended => "END",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameResult {
    InProgress,
    CitizenWin, // 市民陣営勝利
    MafiaWin,   // マフィア陣営勝利
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FactionContact {
    pub spy_contacted: bool,
    pub madame_contacted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub name: String,
    pub alive: bool,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// 状態APIで返すスナップショット
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub match_id: String,
    pub room_id: String,
    pub phase: GamePhase,
    pub day_count: u32,
    pub night_count: u32,
    pub result: GameResult,
    pub started_at: DateTime<Utc>,
    pub players: Vec<PlayerView>,
}

/// 1試合ぶんの状態。ルームごとに1つ作られ、`MatchEngine`が所有する。
#[derive(Debug, Clone)]
pub struct Game {
    pub match_id: String,
    pub room_id: String,
    pub phase: GamePhase,
    pub day_count: u32,
    pub night_count: u32,
    // 参加順
    pub players: Vec<Player>,
    pub actions: ActionLog,
    pub scheduled_reporter_reveal: Option<(String, Role)>,
    pub scheduled_revival: Option<String>,
    pub contact: FactionContact,
    // 屍鬼が初夜に役職を奪った相手
    pub ghoul_victim: Option<String>,
    pub ghoul_transformed: bool,
    pub result: GameResult,
    pub started_at: DateTime<Utc>,
}

impl Game {
    /// 参加者と役職を対応付けてゲームを作る
    pub fn new(room_id: String, assignments: Vec<(String, Role)>) -> Self {
        Game {
            match_id: uuid::Uuid::new_v4().to_string(),
            room_id,
            phase: GamePhase::Waiting,
            day_count: 0,
            night_count: 0,
            players: assignments
                .into_iter()
                .map(|(name, role)| Player::new(name, role))
                .collect(),
            actions: ActionLog::default(),
            scheduled_reporter_reveal: None,
            scheduled_revival: None,
            contact: FactionContact::default(),
            ghoul_victim: None,
            ghoul_transformed: false,
            result: GameResult::InProgress,
            started_at: Utc::now(),
        }
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    pub fn players_with_role(&self, role: Role) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(move |p| p.role == role)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    /// 勝敗判定でマフィア側に数えるか
    pub fn counts_as_mafia(&self, player: &Player) -> bool {
        match player.role {
            Role::Mafia | Role::Spy => true,
            Role::Madame => self.contact.madame_contacted,
            _ => false,
        }
    }

    /// 夜のマフィアチャットに参加できるか
    pub fn in_mafia_chat(&self, player: &Player) -> bool {
        match player.role {
            Role::Mafia => true,
            Role::Spy => self.contact.spy_contacted,
            Role::Madame => self.contact.madame_contacted,
            _ => false,
        }
    }

    pub fn mafia_names(&self) -> Vec<String> {
        self.players_with_role(Role::Mafia)
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn roster(&self) -> ServerMessage {
        ServerMessage::Players(
            self.players
                .iter()
                .map(|p| (p.name.clone(), p.alive))
                .collect(),
        )
    }

    /// 役職は`show_roles`か試合終了後のみ含める
    pub fn snapshot(&self, show_roles: bool) -> GameSnapshot {
        let reveal = show_roles || self.phase == GamePhase::Ended;
        GameSnapshot {
            match_id: self.match_id.clone(),
            room_id: self.room_id.clone(),
            phase: self.phase,
            day_count: self.day_count,
            night_count: self.night_count,
            result: self.result,
            started_at: self.started_at,
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    name: p.name.clone(),
                    alive: p.alive,
                    connected: p.connected,
                    role: reveal.then_some(p.role),
                })
                .collect(),
        }
    }

    fn enter(&mut self, phase: GamePhase) -> Vec<Notice> {
        self.phase = phase;
        self.actions.reopen();
        vec![
            Notice::Broadcast(ServerMessage::Phase(phase)),
            Notice::Broadcast(self.roster()),
        ]
    }

    /// ゲーム開始時の役職通知
    pub fn role_notices(&self) -> Vec<Notice> {
        let mafia = self.mafia_names();
        let mut notices = Vec::new();
        for player in &self.players {
            notices.push(Notice::private(&player.name, ServerMessage::Role(player.role)));
            notices.push(Notice::private(&player.name, ServerMessage::Dead(false)));
            if player.role == Role::Mafia && mafia.len() > 1 {
                notices.push(Notice::private(
                    &player.name,
                    ServerMessage::system(format!("マフィアの仲間: {}", mafia.join(", "))),
                ));
            }
        }
        notices
    }

    pub fn enter_night(&mut self) -> Vec<Notice> {
        self.day_count += 1;
        self.night_count += 1;
        self.actions.take_night_actions();
        self.enter(GamePhase::Night)
    }

    /// 昼の開始。誘惑を解除し、前夜に予約された蘇生と記者の報道を適用する。
    pub fn enter_day(&mut self) -> Vec<Notice> {
        for player in &mut self.players {
            player.is_seduced = false;
        }

        let mut notices = self.enter(GamePhase::Day);

        if let Some(name) = self.scheduled_revival.take() {
            let was_ghoul_victim = self.ghoul_victim.as_deref() == Some(name.as_str());
            if let Some(player) = self.player_mut(&name) {
                player.alive = true;
                notices.push(Notice::announce(format!("{}が蘇生しました", name)));
                notices.push(Notice::private(&name, ServerMessage::Dead(false)));
                // 屍鬼に役職を奪われていた場合は市民として復活
                if was_ghoul_victim {
                    player.role = Role::Citizen;
                    notices.push(Notice::private(&name, ServerMessage::Role(Role::Citizen)));
                }
                notices.push(Notice::Broadcast(self.roster()));
            }
        }

        if let Some((name, role)) = self.scheduled_reporter_reveal.take() {
            notices.push(Notice::announce(format!(
                "特ダネ: {}の役職は{}です",
                name, role
            )));
        }

        notices
    }

    pub fn enter_vote(&mut self) -> Vec<Notice> {
        self.actions.take_votes();
        self.enter(GamePhase::Vote)
    }

    /// フェーズのタイマー満了。以降の行動は受け付けない。
    pub fn close_phase(&mut self) {
        self.actions.close();
    }

    /// 勝敗確定。全員の役職を公開する。
    pub fn finish(&mut self, result: GameResult) -> Vec<Notice> {
        self.result = result;
        let mut notices = self.enter(GamePhase::Ended);
        self.actions.close();
        let winner = match result {
            GameResult::CitizenWin => "市民陣営の勝利",
            GameResult::MafiaWin => "マフィア陣営の勝利",
            GameResult::InProgress => "ゲームは中断されました",
        };
        notices.push(Notice::announce(winner));
        for player in &self.players {
            notices.push(Notice::announce(format!("{}: {}", player.name, player.role)));
        }
        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> Game {
        Game::new(
            "room".to_string(),
            vec![
                ("alice".to_string(), Role::Mafia),
                ("bob".to_string(), Role::Soldier),
                ("carol".to_string(), Role::Doctor),
                ("dave".to_string(), Role::Police),
            ],
        )
    }

    #[test]
    fn soldier_starts_with_shield() {
        let game = game();
        assert!(game.player("bob").unwrap().has_shield);
        assert!(!game.player("alice").unwrap().has_shield);
    }

    #[test]
    fn entering_night_increments_both_counters() {
        let mut game = game();
        let notices = game.enter_night();
        assert_eq!(game.phase, GamePhase::Night);
        assert_eq!((game.day_count, game.night_count), (1, 1));
        assert_eq!(
            notices[0],
            Notice::Broadcast(ServerMessage::Phase(GamePhase::Night))
        );
        game.enter_night();
        assert_eq!((game.day_count, game.night_count), (2, 2));
    }

    #[test]
    fn day_clears_seduction_and_applies_revival() {
        let mut game = game();
        game.player_mut("carol").unwrap().alive = false;
        game.player_mut("dave").unwrap().is_seduced = true;
        game.scheduled_revival = Some("carol".to_string());

        let notices = game.enter_day();

        assert!(game.player("carol").unwrap().alive);
        assert!(!game.player("dave").unwrap().is_seduced);
        assert!(game.scheduled_revival.is_none());
        assert!(notices.contains(&Notice::private("carol", ServerMessage::Dead(false))));
    }

    #[test]
    fn reporter_reveal_is_published_at_day() {
        let mut game = game();
        game.scheduled_reporter_reveal = Some(("alice".to_string(), Role::Mafia));
        let notices = game.enter_day();
        assert!(notices.contains(&Notice::announce("特ダネ: aliceの役職はMAFIAです")));
    }

    #[test]
    fn finish_reveals_every_role() {
        let mut game = game();
        let notices = game.finish(GameResult::CitizenWin);
        assert_eq!(game.phase, GamePhase::Ended);
        assert!(notices.contains(&Notice::announce("alice: MAFIA")));
        assert!(notices.contains(&Notice::announce("dave: POLICE")));
    }
}
