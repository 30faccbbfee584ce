use std::collections::{HashMap, HashSet};

use super::role::Role;

/// 1回の夜・投票ぶんの行動記録
///
/// 夜の行動は役職ごとに1件で、後から届いたものが上書きする。
/// 投票は投票者ごとに1件。
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    night_actions: HashMap<Role, String>,
    // 今夜すでに調査した役職（警察・スパイ）
    investigated: HashSet<Role>,
    votes: HashMap<String, String>,
    // タイマー満了後は受け付けない
    closed: bool,
}

impl ActionLog {
    /// 夜の行動を記録し、上書きされた対象があれば返す
    pub fn record_night_action(&mut self, role: Role, target: &str) -> Option<String> {
        self.night_actions.insert(role, target.to_string())
    }

    pub fn night_target(&self, role: Role) -> Option<&str> {
        self.night_actions.get(&role).map(String::as_str)
    }

    pub fn mark_investigated(&mut self, role: Role) -> bool {
        self.investigated.insert(role)
    }

    pub fn record_vote(&mut self, voter: &str, target: &str) -> Option<String> {
        self.votes.insert(voter.to_string(), target.to_string())
    }

    pub fn votes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.votes.iter().map(|(v, t)| (v.as_str(), t.as_str()))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// 夜の行動を取り出して空にする
    pub fn take_night_actions(&mut self) -> HashMap<Role, String> {
        self.investigated.clear();
        std::mem::take(&mut self.night_actions)
    }

    pub fn take_votes(&mut self) -> HashMap<String, String> {
        std::mem::take(&mut self.votes)
    }

    /// 新しいフェーズの受付を開始する
    pub fn reopen(&mut self) {
        self.closed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_night_action_overwrites() {
        let mut log = ActionLog::default();
        assert_eq!(log.record_night_action(Role::Mafia, "alice"), None);
        assert_eq!(
            log.record_night_action(Role::Mafia, "bob"),
            Some("alice".to_string())
        );
        assert_eq!(log.night_target(Role::Mafia), Some("bob"));

        let actions = log.take_night_actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(log.night_target(Role::Mafia), None);
    }

    #[test]
    fn investigation_is_tracked_until_night_is_taken() {
        let mut log = ActionLog::default();
        assert!(log.mark_investigated(Role::Police));
        assert!(!log.mark_investigated(Role::Police));
        log.take_night_actions();
        assert!(log.mark_investigated(Role::Police));
    }
}
