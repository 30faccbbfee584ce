use crate::models::game::{Game, GameResult};

/// (マフィア側の人数, 市民側の戦力)
pub fn strength(game: &Game) -> (u32, u32) {
    game.alive_players()
        .fold((0, 0), |(mafia, citizens), player| {
            if game.counts_as_mafia(player) {
                (mafia + 1, citizens)
            } else {
                (mafia, citizens + player.citizen_power())
            }
        })
}

/// 勝敗判定。死亡・蘇生のたびにキャッシュせず計算し直す。
pub fn check(game: &Game) -> GameResult {
    let (mafia, citizens) = strength(game);
    if mafia == 0 {
        GameResult::CitizenWin
    } else if mafia >= citizens {
        GameResult::MafiaWin
    } else {
        GameResult::InProgress
    }
}
