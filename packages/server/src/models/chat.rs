use serde::{Deserialize, Serialize};

use super::game::{Game, GamePhase};
use super::player::Player;
use super::role::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatChannel {
    Public, // 全体チャット（昼）
    Mafia,  // マフィアチャット（夜）
    Dead,   // 死者チャット
}

/// 発言者がいま話せるチャンネル。話せなければ`None`。
pub fn channel_for(game: &Game, sender: &Player) -> Option<ChatChannel> {
    if !sender.alive {
        // 成仏した死者は話せない
        return (!sender.is_blessed).then_some(ChatChannel::Dead);
    }
    match game.phase {
        GamePhase::Night => game.in_mafia_chat(sender).then_some(ChatChannel::Mafia),
        _ => Some(ChatChannel::Public),
    }
}

/// チャンネルの発言を聞けるか
pub fn can_hear(game: &Game, channel: ChatChannel, listener: &Player) -> bool {
    match channel {
        ChatChannel::Public => true,
        ChatChannel::Mafia => listener.alive && game.in_mafia_chat(listener),
        // 霊媒師は死者の声が聞こえる
        ChatChannel::Dead => {
            (!listener.alive && !listener.is_blessed) || listener.role == Role::Shaman
        }
    }
}

/// 発言を届ける相手（発言者自身を含む）
pub fn recipients(game: &Game, sender: &str) -> Option<Vec<String>> {
    let speaker = game.player(sender)?;
    let channel = channel_for(game, speaker)?;
    Some(
        game.players
            .iter()
            .filter(|p| p.name == sender || can_hear(game, channel, p))
            .map(|p| p.name.clone())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_setup::game_with_roles;

    fn game() -> Game {
        game_with_roles(&[
            ("m", Role::Mafia),
            ("spy", Role::Spy),
            ("sh", Role::Shaman),
            ("a", Role::Citizen),
            ("b", Role::Citizen),
        ])
    }

    #[test]
    fn day_chat_is_public() {
        let mut game = game();
        game.enter_day();
        assert_eq!(recipients(&game, "a").unwrap().len(), 5);
    }

    #[test]
    fn night_chat_is_mafia_only_and_spy_needs_contact() {
        let mut game = game();
        game.enter_night();
        assert_eq!(recipients(&game, "a"), None);
        assert_eq!(recipients(&game, "m").unwrap(), vec!["m".to_string()]);

        game.contact.spy_contacted = true;
        assert_eq!(
            recipients(&game, "m").unwrap(),
            vec!["m".to_string(), "spy".to_string()]
        );
    }

    #[test]
    fn dead_chat_reaches_shaman_but_not_blessed() {
        let mut game = game();
        game.enter_day();
        game.player_mut("a").unwrap().alive = false;
        game.player_mut("b").unwrap().alive = false;

        assert_eq!(
            recipients(&game, "a").unwrap(),
            vec!["sh".to_string(), "a".to_string(), "b".to_string()]
        );

        game.player_mut("b").unwrap().is_blessed = true;
        assert_eq!(
            recipients(&game, "a").unwrap(),
            vec!["sh".to_string(), "a".to_string()]
        );
        assert_eq!(recipients(&game, "b"), None);
    }
}
