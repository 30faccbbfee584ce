use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Mafia,      // マフィア
    Spy,        // スパイ
    Madame,     // マダム
    Doctor,     // 医者
    Police,     // 警察
    Politician, // 政治家
    Soldier,    // 軍人
    Shaman,     // 霊媒師
    Reporter,   // 記者
    Ghoul,      // 屍鬼
    Gangster,   // ギャング
    Priest,     // 聖職者
    Citizen,    // 市民
}

impl Role {
    pub const ALL: [Role; 13] = [
        Role::Mafia,
        Role::Spy,
        Role::Madame,
        Role::Doctor,
        Role::Police,
        Role::Politician,
        Role::Soldier,
        Role::Shaman,
        Role::Reporter,
        Role::Ghoul,
        Role::Gangster,
        Role::Priest,
        Role::Citizen,
    ];

    /// プロトコル上の役職名
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Mafia => "MAFIA",
            Role::Spy => "SPY",
            Role::Madame => "MADAME",
            Role::Doctor => "DOCTOR",
            Role::Police => "POLICE",
            Role::Politician => "POLITICIAN",
            Role::Soldier => "SOLDIER",
            Role::Shaman => "SHAMAN",
            Role::Reporter => "REPORTER",
            Role::Ghoul => "GHOUL",
            Role::Gangster => "GANGSTER",
            Role::Priest => "PRIEST",
            Role::Citizen => "CITIZEN",
        }
    }

    /// 夜に能力を使える役職かどうか
    pub fn has_night_ability(&self) -> bool {
        matches!(
            self,
            Role::Mafia
                | Role::Spy
                | Role::Doctor
                | Role::Police
                | Role::Shaman
                | Role::Reporter
                | Role::Gangster
                | Role::Priest
        )
    }

    /// 死亡後も夜の能力を使える役職
    pub fn acts_while_dead(&self) -> bool {
        matches!(self, Role::Shaman | Role::Priest)
    }

    /// 警察の調査で「マフィア」と判定される役職
    pub fn reads_as_mafia(&self) -> bool {
        matches!(self, Role::Mafia | Role::Spy)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == upper)
            .ok_or(UnknownRole(s.to_string()))
    }
}
