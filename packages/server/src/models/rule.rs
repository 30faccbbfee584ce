use rand::seq::SliceRandom;
use rand::Rng;

use super::role::Role;
use crate::services::GameError;

pub const MIN_PLAYERS: usize = 4;
pub const MAX_PLAYERS: usize = 8;

// 8人部屋の追加役職候補
const EIGHT_PLAYER_POOL: [Role; 7] = [
    Role::Politician,
    Role::Reporter,
    Role::Soldier,
    Role::Shaman,
    Role::Ghoul,
    Role::Gangster,
    Role::Priest,
];

/// 人数に応じた役職の組み合わせを返す。
///
/// 選択役職（政治家/軍人、スパイ/マダム、8人部屋の追加役職）だけがランダムで、
/// 返す前にシャッフルされる。呼び出し側は参加順のプレイヤーとzipする。
pub fn assign_roles<R: Rng>(
    player_count: usize,
    rng: &mut R,
) -> Result<Vec<Role>, GameError> {
    let mut roles = match player_count {
        4 => vec![Role::Mafia, Role::Doctor, Role::Police, Role::Citizen],
        5 => vec![
            Role::Mafia,
            Role::Mafia,
            Role::Doctor,
            Role::Police,
            pick(rng, Role::Politician, Role::Soldier),
        ],
        6 | 7 => {
            let mut roles = vec![
                Role::Mafia,
                pick(rng, Role::Spy, Role::Madame),
                Role::Doctor,
                Role::Police,
                Role::Politician,
                Role::Soldier,
            ];
            if player_count == 7 {
                roles.push(Role::Shaman);
            }
            roles
        }
        8 => {
            let mut roles = vec![
                Role::Mafia,
                Role::Mafia,
                pick(rng, Role::Spy, Role::Madame),
                Role::Doctor,
                Role::Police,
            ];
            roles.extend(EIGHT_PLAYER_POOL.choose_multiple(rng, 3).copied());
            roles
        }
        n => return Err(GameError::InvalidPlayerCount(n)),
    };

    roles.shuffle(rng);
    Ok(roles)
}

fn pick<R: Rng>(rng: &mut R, a: Role, b: Role) -> Role {
    if rng.gen_bool(0.5) {
        a
    } else {
        b
    }
}
