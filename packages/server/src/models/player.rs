use serde::{Deserialize, Serialize};

use super::role::Role;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub role: Role,
    pub alive: bool,
    // 軍人の防弾（一度きり）
    pub has_shield: bool,
    // マダムに誘惑されている（昼の開始でリセット）
    pub is_seduced: bool,
    // 霊媒師に成仏させられた（蘇生不可）
    pub is_blessed: bool,
    // 次の投票で投票できない
    pub is_vote_banned: bool,
    pub used_one_shot_ability: bool,
    // 接続が切れていても生存扱い
    pub connected: bool,
}

impl Player {
    pub fn new(name: String, role: Role) -> Self {
        Self {
            name,
            role,
            alive: true,
            has_shield: role == Role::Soldier,
            is_seduced: false,
            is_blessed: false,
            is_vote_banned: false,
            used_one_shot_ability: false,
            connected: true,
        }
    }

    /// 投票の重み（政治家は2票）
    pub fn ballot_weight(&self) -> u32 {
        if self.role == Role::Politician && self.alive && !self.is_vote_banned {
            2
        } else {
            1
        }
    }

    /// 勝敗判定における市民側の戦力
    pub fn citizen_power(&self) -> u32 {
        if self.role == Role::Politician {
            2
        } else {
            1
        }
    }
}
