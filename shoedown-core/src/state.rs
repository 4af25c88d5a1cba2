//! Run-scoped mutable state: the player record and the `Run` ledger.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    BASE_BUST_GUARDS, CRIT_CHANCE_MAX, DEFAULT_MAX_FLOOR, DEFAULT_ROOMS_PER_FLOOR, EVENT_LOG_CAP,
    GOLD_MULT_MAX, GOLD_MULT_MIN, LOG_CAP, LOG_TTL_SECS, MIN_ROOMS_PER_FLOOR, STARTING_GOLD,
    STARTING_HP,
};

/// Top-level session mode, restricted on load to this fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Playing,
    Reward,
    Shop,
    GameOver,
    Victory,
}

impl Mode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Reward => "reward",
            Self::Shop => "shop",
            Self::GameOver => "game_over",
            Self::Victory => "victory",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "playing" => Ok(Self::Playing),
            "reward" => Ok(Self::Reward),
            "shop" => Ok(Self::Shop),
            "game_over" | "gameover" => Ok(Self::GameOver),
            "victory" => Ok(Self::Victory),
            _ => Err(()),
        }
    }
}

/// Flat record of every relic-granted modifier. Rebuilt key-by-key by
/// the sanitizer and clamped after every relic application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(default)]
    pub flat_damage: i32,
    #[serde(default)]
    pub block: i32,
    #[serde(default)]
    pub crit_chance: f32,
    #[serde(default = "default_gold_mult")]
    pub gold_mult: f32,
    #[serde(default)]
    pub heal_on_win_hand: i32,
    #[serde(default)]
    pub blackjack_heal: i32,
    #[serde(default)]
    pub chips_on_win_hand: i32,
    #[serde(default)]
    pub chips_on_push: i32,
    #[serde(default)]
    pub streak_bonus: i32,
    #[serde(default)]
    pub first_hand_bonus: i32,
    #[serde(default)]
    pub split_bonus: i32,
    #[serde(default)]
    pub elite_bonus: i32,
    #[serde(default)]
    pub double_win_bonus: i32,
    #[serde(default)]
    pub stand_win_bonus: i32,
    #[serde(default)]
    pub double_loss_block: i32,
    #[serde(default)]
    pub low_hp_bonus: i32,
    #[serde(default)]
    pub max_hp_bonus: i32,
    #[serde(default)]
    pub bust_guards: i32,
}

fn default_gold_mult() -> f32 {
    1.0
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            flat_damage: 0,
            block: 0,
            crit_chance: 0.0,
            gold_mult: 1.0,
            heal_on_win_hand: 0,
            blackjack_heal: 0,
            chips_on_win_hand: 0,
            chips_on_push: 0,
            streak_bonus: 0,
            first_hand_bonus: 0,
            split_bonus: 0,
            elite_bonus: 0,
            double_win_bonus: 0,
            stand_win_bonus: 0,
            double_loss_block: 0,
            low_hp_bonus: 0,
            max_hp_bonus: 0,
            bust_guards: 0,
        }
    }
}

impl PlayerStats {
    pub fn clamp(&mut self) {
        self.flat_damage = self.flat_damage.clamp(0, 50);
        self.block = self.block.clamp(0, 20);
        self.crit_chance = self.crit_chance.clamp(0.0, CRIT_CHANCE_MAX);
        self.gold_mult = self.gold_mult.clamp(GOLD_MULT_MIN, GOLD_MULT_MAX);
        self.heal_on_win_hand = self.heal_on_win_hand.clamp(0, 20);
        self.blackjack_heal = self.blackjack_heal.clamp(0, 20);
        self.chips_on_win_hand = self.chips_on_win_hand.clamp(0, 50);
        self.chips_on_push = self.chips_on_push.clamp(0, 50);
        self.streak_bonus = self.streak_bonus.clamp(0, 4);
        self.first_hand_bonus = self.first_hand_bonus.clamp(0, 20);
        self.split_bonus = self.split_bonus.clamp(0, 20);
        self.elite_bonus = self.elite_bonus.clamp(0, 20);
        self.double_win_bonus = self.double_win_bonus.clamp(0, 20);
        self.stand_win_bonus = self.stand_win_bonus.clamp(0, 20);
        self.double_loss_block = self.double_loss_block.clamp(0, 20);
        self.low_hp_bonus = self.low_hp_bonus.clamp(0, 20);
        self.max_hp_bonus = self.max_hp_bonus.clamp(0, 60);
        self.bust_guards = self.bust_guards.clamp(0, 5);
    }
}

/// Player record embedded in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub gold: i32,
    #[serde(default)]
    pub streak: i32,
    #[serde(default)]
    pub damage_dealt: u32,
    #[serde(default)]
    pub damage_taken: u32,
    #[serde(default)]
    pub bust_guards_left: i32,
    #[serde(default)]
    pub relics: BTreeMap<String, u32>,
    #[serde(default)]
    pub stats: PlayerStats,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            hp: STARTING_HP,
            max_hp: STARTING_HP,
            gold: STARTING_GOLD,
            streak: 0,
            damage_dealt: 0,
            damage_taken: 0,
            bust_guards_left: BASE_BUST_GUARDS,
            relics: BTreeMap::new(),
            stats: PlayerStats::default(),
        }
    }
}

impl PlayerState {
    #[must_use]
    pub fn effective_max_hp(&self) -> i32 {
        self.max_hp + self.stats.max_hp_bonus
    }

    pub fn heal(&mut self, amount: i32) {
        if amount > 0 {
            self.hp = (self.hp + amount).min(self.effective_max_hp());
        }
    }

    pub fn take_damage(&mut self, amount: i32) {
        if amount > 0 {
            self.hp = (self.hp - amount).max(0);
            self.damage_taken = self
                .damage_taken
                .saturating_add(u32::try_from(amount).unwrap_or(0));
        }
    }

    /// True below half of effective max HP; feeds the low-HP relic bonus.
    #[must_use]
    pub fn is_low_hp(&self) -> bool {
        self.hp * 2 < self.effective_max_hp()
    }

    pub fn clamp(&mut self) {
        self.stats.clamp();
        self.max_hp = self.max_hp.clamp(1, 999);
        self.hp = self.hp.clamp(0, self.effective_max_hp());
        self.gold = self.gold.clamp(0, 999_999);
        self.streak = self.streak.clamp(0, 999);
        self.bust_guards_left = self.bust_guards_left.clamp(0, 9);
    }
}

/// Transient UI log line with a time-to-live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub text: String,
    #[serde(default)]
    pub ttl: f32,
}

/// One playthrough: floor/room cursor, lifetime-of-run counters, and
/// the embedded player record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub floor: u32,
    pub max_floor: u32,
    pub room: u32,
    pub rooms_per_floor: u32,
    #[serde(default)]
    pub enemies_defeated: u32,
    #[serde(default)]
    pub total_hands: u32,
    #[serde(default)]
    pub resolved_hands: u32,
    #[serde(default)]
    pub chips_earned_run: u32,
    #[serde(default)]
    pub chips_spent_run: u32,
    #[serde(default)]
    pub max_streak: i32,
    #[serde(default)]
    pub blackjacks: u32,
    #[serde(default)]
    pub doubles_won: u32,
    #[serde(default)]
    pub splits_used: u32,
    #[serde(default)]
    pub pushes: u32,
    #[serde(default)]
    pub shop_purchase_made: bool,
    #[serde(default)]
    pub player: PlayerState,
    #[serde(default)]
    pub log: Vec<LogLine>,
    #[serde(default)]
    pub event_log: Vec<String>,
    #[serde(default)]
    pub seed: u64,
    #[serde(skip)]
    pub rng: Option<ChaCha20Rng>,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            floor: 1,
            max_floor: DEFAULT_MAX_FLOOR,
            room: 1,
            rooms_per_floor: DEFAULT_ROOMS_PER_FLOOR,
            enemies_defeated: 0,
            total_hands: 0,
            resolved_hands: 0,
            chips_earned_run: 0,
            chips_spent_run: 0,
            max_streak: 0,
            blackjacks: 0,
            doubles_won: 0,
            splits_used: 0,
            pushes: 0,
            shop_purchase_made: false,
            player: PlayerState::default(),
            log: Vec::new(),
            event_log: Vec::new(),
            seed: 0,
            rng: None,
        }
    }
}

impl Run {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = Some(ChaCha20Rng::seed_from_u64(seed));
        self
    }

    /// Re-attach the RNG after deserialization. The stream restarts
    /// from the seed, which keeps loads deterministic.
    #[must_use]
    pub fn rehydrate(mut self) -> Self {
        self.rng = Some(ChaCha20Rng::seed_from_u64(self.seed));
        self
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha20Rng {
        let seed = self.seed;
        self.rng.get_or_insert_with(|| ChaCha20Rng::seed_from_u64(seed))
    }

    /// Append a transient UI log line, keeping the window bounded.
    pub fn push_log(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.event_log.push(text.clone());
        if self.event_log.len() > EVENT_LOG_CAP {
            let overflow = self.event_log.len() - EVENT_LOG_CAP;
            self.event_log.drain(0..overflow);
        }
        self.log.push(LogLine {
            text,
            ttl: LOG_TTL_SECS,
        });
        if self.log.len() > LOG_CAP {
            let overflow = self.log.len() - LOG_CAP;
            self.log.drain(0..overflow);
        }
    }

    /// Age transient log lines, dropping expired ones.
    pub fn tick_logs(&mut self, dt: f32) {
        for line in &mut self.log {
            line.ttl -= dt;
        }
        self.log.retain(|line| line.ttl > 0.0);
    }

    pub fn gain_chips(&mut self, amount: i32) {
        if amount > 0 {
            self.player.gold = (self.player.gold + amount).min(999_999);
            self.chips_earned_run = self
                .chips_earned_run
                .saturating_add(u32::try_from(amount).unwrap_or(0));
        }
    }

    /// Spend chips if affordable. Returns false without mutation when
    /// the player cannot pay.
    pub fn spend_chips(&mut self, amount: i32) -> bool {
        if amount < 0 || self.player.gold < amount {
            return false;
        }
        self.player.gold -= amount;
        self.chips_spent_run = self
            .chips_spent_run
            .saturating_add(u32::try_from(amount).unwrap_or(0));
        true
    }

    pub fn note_streak(&mut self) {
        self.max_streak = self.max_streak.max(self.player.streak);
    }

    /// Enforce the structural invariants on the run shape.
    pub fn clamp(&mut self) {
        self.floor = self.floor.clamp(1, 99);
        self.max_floor = self.max_floor.clamp(1, 99);
        self.room = self.room.max(1);
        self.rooms_per_floor = self.rooms_per_floor.max(MIN_ROOMS_PER_FLOOR);
        self.player.clamp();
        if self.log.len() > LOG_CAP {
            self.log.truncate(LOG_CAP);
        }
        if self.event_log.len() > EVENT_LOG_CAP {
            self.event_log.truncate(EVENT_LOG_CAP);
        }
    }
}
