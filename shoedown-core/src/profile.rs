//! Cross-run meta state: lifetime totals, relic collection, history.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::RUN_HISTORY_CAP;
use crate::state::Run;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunResult {
    Victory,
    Defeat,
}

impl RunResult {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Victory => "victory",
            Self::Defeat => "defeat",
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunResult {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "victory" => Ok(Self::Victory),
            "defeat" => Ok(Self::Defeat),
            _ => Err(()),
        }
    }
}

/// End-of-run summary kept in the capped history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub result: RunResult,
    pub floor: u32,
    pub room: u32,
    #[serde(default)]
    pub enemies_defeated: u32,
    #[serde(default)]
    pub hands: u32,
    #[serde(default)]
    pub blackjacks: u32,
    #[serde(default)]
    pub chips_earned: u32,
    #[serde(default)]
    pub max_streak: i32,
    #[serde(default)]
    pub ended_at: i64,
}

/// Persisted independently of any single run; never destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Profile {
    #[serde(default)]
    pub runs_played: u32,
    #[serde(default)]
    pub victories: u32,
    #[serde(default)]
    pub lifetime_hands: u32,
    #[serde(default)]
    pub lifetime_blackjacks: u32,
    #[serde(default)]
    pub lifetime_splits: u32,
    #[serde(default)]
    pub lifetime_enemies: u32,
    #[serde(default)]
    pub lifetime_chips: u64,
    #[serde(default)]
    pub best_floor: u32,
    #[serde(default)]
    pub best_streak: i32,
    /// Times each relic has ever been collected, for unlock gating and
    /// the collection view.
    #[serde(default)]
    pub relic_counts: BTreeMap<String, u32>,
    #[serde(default)]
    pub history: Vec<RunRecord>,
}

impl Profile {
    /// Fold a finished run into lifetime totals and the history list.
    pub fn record_run(&mut self, run: &Run, result: RunResult, ended_at: i64) {
        self.runs_played = self.runs_played.saturating_add(1);
        if result == RunResult::Victory {
            self.victories = self.victories.saturating_add(1);
        }
        self.lifetime_hands = self.lifetime_hands.saturating_add(run.total_hands);
        self.lifetime_blackjacks = self.lifetime_blackjacks.saturating_add(run.blackjacks);
        self.lifetime_splits = self.lifetime_splits.saturating_add(run.splits_used);
        self.lifetime_enemies = self.lifetime_enemies.saturating_add(run.enemies_defeated);
        self.lifetime_chips = self
            .lifetime_chips
            .saturating_add(u64::from(run.chips_earned_run));
        self.best_floor = self.best_floor.max(run.floor);
        self.best_streak = self.best_streak.max(run.max_streak);

        self.history.push(RunRecord {
            result,
            floor: run.floor,
            room: run.room,
            enemies_defeated: run.enemies_defeated,
            hands: run.total_hands,
            blackjacks: run.blackjacks,
            chips_earned: run.chips_earned_run,
            max_streak: run.max_streak,
            ended_at,
        });
        if self.history.len() > RUN_HISTORY_CAP {
            let overflow = self.history.len() - RUN_HISTORY_CAP;
            self.history.drain(0..overflow);
        }
    }

    /// Bump the collection counter for a relic the player just picked up.
    pub fn note_relic(&mut self, relic_id: &str) {
        let count = self.relic_counts.entry(relic_id.to_string()).or_insert(0);
        *count = count.saturating_add(1);
    }

    #[must_use]
    pub fn relic_collected(&self, relic_id: &str) -> u32 {
        self.relic_counts.get(relic_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_run_updates_watermarks_and_history() {
        let mut profile = Profile::default();
        let mut run = Run::default();
        run.floor = 2;
        run.total_hands = 14;
        run.blackjacks = 3;
        run.max_streak = 5;
        run.chips_earned_run = 120;

        profile.record_run(&run, RunResult::Defeat, 1_700_000_000_000);
        assert_eq!(profile.runs_played, 1);
        assert_eq!(profile.victories, 0);
        assert_eq!(profile.best_floor, 2);
        assert_eq!(profile.best_streak, 5);
        assert_eq!(profile.lifetime_blackjacks, 3);
        assert_eq!(profile.history.len(), 1);

        profile.record_run(&run, RunResult::Victory, 1_700_000_000_001);
        assert_eq!(profile.victories, 1);
    }

    #[test]
    fn history_is_capped() {
        let mut profile = Profile::default();
        let run = Run::default();
        for i in 0..(RUN_HISTORY_CAP + 5) {
            profile.record_run(&run, RunResult::Defeat, i as i64);
        }
        assert_eq!(profile.history.len(), RUN_HISTORY_CAP);
        // Oldest entries fall off the front.
        assert_eq!(profile.history[0].ended_at, 5);
    }

    #[test]
    fn relic_collection_counts_accumulate() {
        let mut profile = Profile::default();
        assert_eq!(profile.relic_collected("loaded_dice"), 0);
        profile.note_relic("loaded_dice");
        profile.note_relic("loaded_dice");
        assert_eq!(profile.relic_collected("loaded_dice"), 2);
    }
}
