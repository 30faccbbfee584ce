use std::fmt;

use super::game::GamePhase;
use super::role::Role;
use crate::services::GameError;

/// プレイヤーから届く1行コマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    NightAction { role: Role, target: String },
    Vote { target: String },
    Chat(String),
}

impl Command {
    /// 1行をコマンドとして解釈する。既知のプレフィックス以外はチャット扱い。
    pub fn parse(line: &str) -> Result<Self, GameError> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(rest) = line.strip_prefix("NIGHT_ACTION:") {
            let (role, target) = rest
                .split_once(':')
                .ok_or_else(|| GameError::MalformedCommand(line.to_string()))?;
            let role = role
                .parse::<Role>()
                .map_err(|_| GameError::MalformedCommand(line.to_string()))?;
            let target = non_empty(target, line)?;
            return Ok(Command::NightAction { role, target });
        }

        if let Some(target) = line.strip_prefix("VOTE:") {
            let target = non_empty(target, line)?;
            return Ok(Command::Vote { target });
        }

        Ok(Command::Chat(line.to_string()))
    }
}

fn non_empty(target: &str, line: &str) -> Result<String, GameError> {
    let target = target.trim();
    if target.is_empty() {
        Err(GameError::MalformedCommand(line.to_string()))
    } else {
        Ok(target.to_string())
    }
}

/// サーバーから送る1行メッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Role(Role),
    Phase(GamePhase),
    // (名前, 生存)
    Players(Vec<(String, bool)>),
    Dead(bool),
    System(String),
    Chat { from: String, text: String },
}

impl ServerMessage {
    pub fn system(text: impl Into<String>) -> Self {
        ServerMessage::System(text.into())
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Role(role) => write!(f, "ROLE:{}", role),
            ServerMessage::Phase(phase) => write!(f, "PHASE:{}", phase.as_str()),
            ServerMessage::Players(players) => {
                let roster: Vec<String> = players
                    .iter()
                    .map(|(name, alive)| {
                        if *alive {
                            name.clone()
                        } else {
                            format!("[DEAD]{}", name)
                        }
                    })
                    .collect();
                write!(f, "PLAYERS:{}", roster.join(","))
            }
            ServerMessage::Dead(dead) => write!(f, "DEAD:{}", dead),
            ServerMessage::System(text) => write!(f, "SYSTEM:{}", text),
            ServerMessage::Chat { from, text } => write!(f, "CHAT:{}:{}", from, text),
        }
    }
}

/// 状態遷移の結果として配信すべきメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Broadcast(ServerMessage),
    Private(String, ServerMessage),
}

impl Notice {
    pub fn private(to: &str, message: ServerMessage) -> Self {
        Notice::Private(to.to_string(), message)
    }

    pub fn announce(text: impl Into<String>) -> Self {
        Notice::Broadcast(ServerMessage::system(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_night_action() {
        assert_eq!(
            Command::parse("NIGHT_ACTION:DOCTOR:alice\r\n").unwrap(),
            Command::NightAction {
                role: Role::Doctor,
                target: "alice".to_string()
            }
        );
    }

    #[test]
    fn parse_vote_and_chat() {
        assert_eq!(
            Command::parse("VOTE:bob").unwrap(),
            Command::Vote {
                target: "bob".to_string()
            }
        );
        assert_eq!(
            Command::parse("bob is lying").unwrap(),
            Command::Chat("bob is lying".to_string())
        );
    }

    #[test]
    fn malformed_commands_are_rejected() {
        for line in ["NIGHT_ACTION:DOCTOR", "NIGHT_ACTION:WIZARD:bob", "VOTE:", "VOTE:  "] {
            assert!(
                matches!(Command::parse(line), Err(GameError::MalformedCommand(_))),
                "{line}"
            );
        }
    }

    #[test]
    fn roster_line_marks_dead_players() {
        let msg = ServerMessage::Players(vec![
            ("alice".to_string(), true),
            ("bob".to_string(), false),
            ("carol".to_string(), true),
        ]);
        assert_eq!(msg.to_string(), "PLAYERS:alice,[DEAD]bob,carol");
        assert_eq!(ServerMessage::Phase(GamePhase::Ended).to_string(), "PHASE:END");
        assert_eq!(ServerMessage::Dead(true).to_string(), "DEAD:true");
    }
}
