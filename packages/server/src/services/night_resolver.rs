use tracing::debug;

use crate::models::{
    game::{Game, GamePhase},
    message::{Notice, ServerMessage},
    role::Role,
};
use crate::services::GameError;

// 記者が能力を使える夜
const REPORTER_NIGHTS: std::ops::RangeInclusive<u32> = 2..=8;

/// 夜の行動を受け付ける。警察とスパイの調査結果はその場で本人に返す。
pub fn submit_night_action(
    game: &mut Game,
    sender: &str,
    role: Role,
    target: &str,
) -> Result<Vec<Notice>, GameError> {
    if game.phase != GamePhase::Night || game.actions.is_closed() {
        return Err(GameError::IllegalPhaseAction {
            action: "NIGHT_ACTION",
            phase: game.phase,
        });
    }

    let actor = game
        .player(sender)
        .ok_or_else(|| GameError::UnknownPlayer(sender.to_string()))?;
    if actor.role != role || !role.has_night_ability() {
        return Err(GameError::NoNightAbility(role));
    }
    if !actor.alive && !role.acts_while_dead() {
        return Err(GameError::DeadActorNotPermitted);
    }
    if actor.is_seduced {
        return Err(GameError::Seduced);
    }
    let used_one_shot = actor.used_one_shot_ability;

    let subject = game
        .player(target)
        .ok_or_else(|| GameError::UnknownTarget(target.to_string()))?;

    match role {
        Role::Shaman => {
            if subject.alive || subject.is_blessed {
                return Err(GameError::InvalidTarget(target.to_string()));
            }
        }
        Role::Priest => {
            if used_one_shot {
                return Err(GameError::AbilityAlreadyUsed);
            }
            if subject.alive || subject.is_blessed {
                return Err(GameError::InvalidTarget(target.to_string()));
            }
        }
        Role::Reporter if !REPORTER_NIGHTS.contains(&game.night_count) => {
            return Err(GameError::AbilityUnavailable(role));
        }
        _ => {
            if !subject.alive {
                return Err(GameError::DeadTarget(target.to_string()));
            }
        }
    }

    if matches!(role, Role::Police | Role::Spy) {
        if !game.actions.mark_investigated(role) {
            return Err(GameError::AbilityAlreadyUsed);
        }
        game.actions.record_night_action(role, target);
        return Ok(investigate(game, sender, role, target));
    }

    if let Some(previous) = game.actions.record_night_action(role, target) {
        debug!(
            "{} overwrote {} night action: {} -> {}",
            sender, role, previous, target
        );
    }

    let mut notices = vec![Notice::private(
        sender,
        ServerMessage::system(format!("{}を対象に選びました", target)),
    )];
    if role == Role::Mafia {
        for name in game.mafia_names() {
            if name != sender {
                notices.push(Notice::private(
                    &name,
                    ServerMessage::system(format!("{}が{}を狙っています", sender, target)),
                ));
            }
        }
    }
    Ok(notices)
}

/// 警察・スパイの調査。生死や役職の変化は起こさない。
fn investigate(game: &mut Game, actor: &str, role: Role, target: &str) -> Vec<Notice> {
    let Some(target_role) = game.player(target).map(|p| p.role) else {
        return Vec::new();
    };
    let mut notices = Vec::new();

    match role {
        Role::Police => {
            let verdict = if target_role.reads_as_mafia() {
                "マフィアです"
            } else {
                "マフィアではありません"
            };
            notices.push(Notice::private(
                actor,
                ServerMessage::system(format!("{}は{}", target, verdict)),
            ));
        }
        Role::Spy => {
            notices.push(Notice::private(
                actor,
                ServerMessage::system(format!("{}の役職は{}です", target, target_role)),
            ));
            if target_role == Role::Mafia && !game.contact.spy_contacted {
                game.contact.spy_contacted = true;
                notices.push(Notice::private(
                    actor,
                    ServerMessage::system(format!(
                        "マフィアと接触しました: {}",
                        game.mafia_names().join(", ")
                    )),
                ));
                for name in game.mafia_names() {
                    notices.push(Notice::private(
                        &name,
                        ServerMessage::system(format!("スパイ{}が接触しました", actor)),
                    ));
                }
            }
        }
        _ => {}
    }

    // 軍人は自分を調べた者を知る
    if target_role == Role::Soldier {
        notices.push(Notice::private(
            target,
            ServerMessage::system(format!("{}({})があなたを調べました", actor, role)),
        ));
    }

    notices
}

fn actor_name(game: &Game, role: Role) -> Option<String> {
    game.players_with_role(role).next().map(|p| p.name.clone())
}

/// 夜の行動をまとめて解決する
pub fn resolve_night(game: &mut Game) -> Vec<Notice> {
    let actions = game.actions.take_night_actions();
    let mut notices = Vec::new();

    // 1. ギャング: 次の投票を封じる
    if let Some(target) = actions.get(&Role::Gangster) {
        if let Some(player) = game.player_mut(target) {
            player.is_vote_banned = true;
            notices.push(Notice::private(
                target,
                ServerMessage::system("ギャングに脅されました。次の投票はできません"),
            ));
        }
    }

    // 2. マフィアの襲撃
    let doctor_target = actions.get(&Role::Doctor).map(String::as_str);
    let victim = actions
        .get(&Role::Mafia)
        .and_then(|target| attack(game, target, doctor_target, &mut notices));
    if victim.is_none() {
        notices.push(Notice::announce("昨夜は誰も死にませんでした"));
    }

    // 3. 屍鬼: 初夜だけ変身する
    if game.night_count == 1 && !game.ghoul_transformed {
        if let Some(ghoul) = actor_name(game, Role::Ghoul) {
            let new_role = match &victim {
                Some((name, role)) if *name != ghoul => {
                    game.ghoul_victim = Some(name.clone());
                    *role
                }
                _ => Role::Citizen,
            };
            game.ghoul_transformed = true;
            if let Some(player) = game.player_mut(&ghoul) {
                player.role = new_role;
                player.has_shield = new_role == Role::Soldier;
            }
            notices.push(Notice::private(&ghoul, ServerMessage::Role(new_role)));
            notices.push(Notice::private(
                &ghoul,
                ServerMessage::system(format!("あなたは{}になりました", new_role)),
            ));
        }
    }

    // 4. 警察・スパイは受付時に処理済み

    // 5. 霊媒師: 成仏させて役職を知る
    if let Some(target) = actions.get(&Role::Shaman) {
        let shaman = actor_name(game, Role::Shaman);
        if let Some(player) = game.player_mut(target) {
            if !player.alive {
                player.is_blessed = true;
                let role = player.role;
                if let Some(shaman) = shaman {
                    notices.push(Notice::private(
                        &shaman,
                        ServerMessage::system(format!(
                            "{}を成仏させました。役職は{}です",
                            target, role
                        )),
                    ));
                }
            }
        }
    }

    // 6. 記者: 次の昼に公開
    if let Some(target) = actions.get(&Role::Reporter) {
        if REPORTER_NIGHTS.contains(&game.night_count) {
            if let Some(role) = game.player(target).map(|p| p.role) {
                game.scheduled_reporter_reveal = Some((target.clone(), role));
            }
        }
    }

    // 7. 聖職者: 次の昼に蘇生
    if let Some(target) = actions.get(&Role::Priest) {
        if let Some(priest) = actor_name(game, Role::Priest) {
            notices.extend(schedule_revival(game, &priest, target));
        }
    }

    notices
}

/// 襲撃を処理し、死亡した場合は(名前, 死亡時の役職)を返す
fn attack(
    game: &mut Game,
    target: &str,
    doctor_target: Option<&str>,
    notices: &mut Vec<Notice>,
) -> Option<(String, Role)> {
    let player = game.player_mut(target)?;
    if !player.alive {
        return None;
    }

    // 軍人が狙われた時点で防弾は消費される
    let shielded = player.has_shield;
    player.has_shield = false;

    if doctor_target == Some(target) {
        notices.push(Notice::announce(format!(
            "医者が{}の治療に成功しました",
            target
        )));
        return None;
    }
    if shielded && !player.is_seduced {
        notices.push(Notice::announce(format!(
            "軍人{}がマフィアの襲撃を耐え抜きました",
            target
        )));
        return None;
    }

    player.alive = false;
    let role = player.role;
    notices.push(Notice::announce(format!("{}がマフィアに殺されました", target)));
    notices.push(Notice::private(target, ServerMessage::Dead(true)));
    Some((target.to_string(), role))
}

fn schedule_revival(game: &mut Game, priest: &str, target: &str) -> Vec<Notice> {
    let revivable = game
        .player(target)
        .map(|p| !p.alive && !p.is_blessed)
        .unwrap_or(false);
    let used = game
        .player(priest)
        .map(|p| p.used_one_shot_ability)
        .unwrap_or(true);

    if used || !revivable {
        return vec![Notice::private(
            priest,
            ServerMessage::system(format!("{}を蘇生できませんでした", target)),
        )];
    }

    if let Some(player) = game.player_mut(priest) {
        player.used_one_shot_ability = true;
    }
    game.scheduled_revival = Some(target.to_string());
    vec![Notice::private(
        priest,
        ServerMessage::system(format!("{}は次の昼に蘇生します", target)),
    )]
}
