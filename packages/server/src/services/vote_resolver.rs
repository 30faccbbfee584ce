use std::collections::HashMap;

use tracing::debug;

use crate::models::{
    game::{Game, GamePhase},
    message::{Notice, ServerMessage},
    role::Role,
};
use crate::services::GameError;

/// 投票を受け付ける。マダムの投票は対象を誘惑する。
pub fn submit_vote(game: &mut Game, voter: &str, target: &str) -> Result<Vec<Notice>, GameError> {
    if game.phase != GamePhase::Vote || game.actions.is_closed() {
        return Err(GameError::IllegalPhaseAction {
            action: "VOTE",
            phase: game.phase,
        });
    }

    let ballot = game
        .player(voter)
        .ok_or_else(|| GameError::UnknownPlayer(voter.to_string()))?;
    if !ballot.alive {
        return Err(GameError::DeadActorNotPermitted);
    }
    if ballot.is_vote_banned {
        return Err(GameError::VoteBanned);
    }
    let voter_role = ballot.role;

    let subject = game
        .player(target)
        .ok_or_else(|| GameError::UnknownTarget(target.to_string()))?;
    if !subject.alive {
        return Err(GameError::DeadTarget(target.to_string()));
    }
    let target_role = subject.role;

    let previous = game.actions.record_vote(voter, target);
    if let Some(previous) = &previous {
        debug!("{} changed vote: {} -> {}", voter, previous, target);
    }
    let mut notices = vec![Notice::private(
        voter,
        ServerMessage::system(format!("{}に投票しました", target)),
    )];

    if voter_role == Role::Madame {
        // 誘惑は最後の投票先だけに残る
        if let Some(previous) = previous.filter(|p| p != target) {
            notices.extend(release(game, &previous));
        }
        notices.extend(seduce(game, voter, target, target_role));
    }

    Ok(notices)
}

// 誘惑と接触は独立に起こる
fn seduce(game: &mut Game, madame: &str, target: &str, target_role: Role) -> Vec<Notice> {
    let mut notices = Vec::new();
    if let Some(player) = game.player_mut(target) {
        if !player.is_seduced {
            player.is_seduced = true;
            notices.push(Notice::private(
                target,
                ServerMessage::system("マダムに誘惑されました"),
            ));
        }
    }
    if target_role == Role::Mafia {
        notices.extend(contact_madame(game, madame));
    }
    notices
}

fn release(game: &mut Game, target: &str) -> Vec<Notice> {
    match game.player_mut(target) {
        Some(player) if player.is_seduced => {
            player.is_seduced = false;
            vec![Notice::private(
                target,
                ServerMessage::system("マダムの誘惑が解けました"),
            )]
        }
        _ => Vec::new(),
    }
}

fn contact_madame(game: &mut Game, madame: &str) -> Vec<Notice> {
    if game.contact.madame_contacted {
        return Vec::new();
    }
    game.contact.madame_contacted = true;

    let mafia = game.mafia_names();
    let mut notices = vec![Notice::private(
        madame,
        ServerMessage::system(format!("マフィアと接触しました: {}", mafia.join(", "))),
    )];
    for name in mafia {
        notices.push(Notice::private(
            &name,
            ServerMessage::system(format!("マダム{}が接触しました", madame)),
        ));
    }
    notices
}

/// 得票数を数える。投票禁止者や死者の票は数えない。
pub fn tally(game: &Game, votes: &HashMap<String, String>) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for (voter, target) in votes {
        let Some(ballot) = game.player(voter) else {
            continue;
        };
        if !ballot.alive || ballot.is_vote_banned || game.player(target).is_none() {
            continue;
        }
        *counts.entry(target.clone()).or_insert(0) += ballot.ballot_weight();
    }
    counts
}

/// 投票を締め切って処刑を決める
pub fn resolve_votes(game: &mut Game) -> Vec<Notice> {
    let votes = game.actions.take_votes();
    let counts = tally(game, &votes);
    let mut notices = Vec::new();

    let mut summary: Vec<(&String, &u32)> = counts.iter().collect();
    summary.sort();
    if !summary.is_empty() {
        let line: Vec<String> = summary
            .iter()
            .map(|(name, count)| format!("{}={}", name, count))
            .collect();
        notices.push(Notice::announce(format!("投票結果: {}", line.join(", "))));
    }

    let max = counts.values().copied().max().unwrap_or(0);
    let leaders: Vec<&String> = counts
        .iter()
        .filter(|(_, count)| **count == max)
        .map(|(name, _)| name)
        .collect();

    if max == 0 || leaders.len() != 1 {
        notices.push(Notice::announce("処刑は行われませんでした"));
    } else {
        let top = leaders[0].clone();
        notices.extend(eliminate(game, &top, &votes));
    }

    // 投票禁止は1回の投票だけ
    for player in &mut game.players {
        player.is_vote_banned = false;
    }

    notices
}

fn eliminate(game: &mut Game, top: &str, votes: &HashMap<String, String>) -> Vec<Notice> {
    let mut notices = Vec::new();
    let Some((role, seduced)) = game.player(top).map(|p| (p.role, p.is_seduced)) else {
        return notices;
    };

    if role == Role::Madame {
        let mafia_voted = votes.iter().any(|(voter, target)| {
            target == top
                && game
                    .player(voter)
                    .map(|p| p.role == Role::Mafia)
                    .unwrap_or(false)
        });
        if mafia_voted {
            notices.extend(contact_madame(game, top));
        }
    }

    if role == Role::Politician && !seduced {
        notices.push(Notice::announce(format!(
            "政治家{}は投票では処刑されません",
            top
        )));
        return notices;
    }

    if let Some(player) = game.player_mut(top) {
        player.alive = false;
    }
    notices.push(Notice::announce(format!("{}が投票で処刑されました", top)));
    notices.push(Notice::private(top, ServerMessage::Dead(true)));
    notices
}
