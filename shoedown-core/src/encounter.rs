//! Encounter factory and the live encounter record.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::cards::{Card, Hand, Shoe, hand_total};
use crate::constants::{
    BASE_BUST_GUARDS, ENEMY_ATTACK_BONUS_BOSS, ENEMY_ATTACK_BONUS_ELITE, ENEMY_ATTACK_BONUS_NORMAL,
    ENEMY_BASE_GOLD, ENEMY_BASE_HP, ENEMY_GOLD_BONUS_BOSS, ENEMY_GOLD_BONUS_ELITE,
    ENEMY_GOLD_PER_FLOOR, ENEMY_GOLD_PER_ROOM, ENEMY_HP_BONUS_BOSS, ENEMY_HP_BONUS_ELITE,
    ENEMY_HP_PER_FLOOR, ENEMY_HP_PER_ROOM, INTRO_CHARS_PER_SEC, INTRO_RETRY_LIMIT,
};
use crate::progression::{EnemyKind, resolve_room_type};
use crate::showdown::ResultTone;
use crate::state::Run;

const NORMAL_NAMES: &[&str] = &[
    "Back-Alley Sharper",
    "Tipsy Gambler",
    "Velvet Hustler",
    "Chip Runner",
    "Marked Man",
    "Felt Rat",
];

const ELITE_NAMES: &[&str] = &[
    "Pit Boss Marlowe",
    "The Countess",
    "Iron-Eyed Croupier",
    "Baron of Busts",
];

const BOSS_NAMES: &[&str] = &["The House", "Dealer Prime", "The Midnight Banker"];

/// Opener line plus a flag marking it as standalone (no closer appended).
struct IntroOpener {
    text: &'static str,
    verbatim: bool,
}

const NORMAL_OPENERS: &[IntroOpener] = &[
    IntroOpener { text: "Fresh blood at my table.", verbatim: false },
    IntroOpener { text: "Cards don't lie, friend.", verbatim: false },
    IntroOpener { text: "Sit. Deal. Bleed.", verbatim: true },
    IntroOpener { text: "You smell like borrowed chips.", verbatim: false },
];

const ELITE_OPENERS: &[IntroOpener] = &[
    IntroOpener { text: "I've broken better players than you.", verbatim: false },
    IntroOpener { text: "The pit answers to me.", verbatim: false },
    IntroOpener { text: "House rules. My rules.", verbatim: true },
];

const BOSS_OPENERS: &[IntroOpener] = &[
    IntroOpener { text: "Every chip in this place is already mine.", verbatim: false },
    IntroOpener { text: "The odds were settled before you walked in.", verbatim: false },
    IntroOpener { text: "Welcome to the last table.", verbatim: true },
];

const NORMAL_CLOSERS: &[&str] = &[
    "Let's see your hand.",
    "Ante up.",
    "Don't cry when you bust.",
];

const ELITE_CLOSERS: &[&str] = &[
    "Show me something worth my time.",
    "Twenty-one or the door.",
];

const BOSS_CLOSERS: &[&str] = &[
    "Play your best. It won't matter.",
    "The shoe favors no one but me.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Player,
    Dealer,
    Resolve,
    Done,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Dealer => "dealer",
            Self::Resolve => "resolve",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(Self::Player),
            "dealer" => Ok(Self::Dealer),
            "resolve" => Ok(Self::Resolve),
            "done" => Ok(Self::Done),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlayerAction {
    #[default]
    None,
    Hit,
    Stand,
    Double,
    Split,
}

impl PlayerAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Hit => "hit",
            Self::Stand => "stand",
            Self::Double => "double",
            Self::Split => "split",
        }
    }
}

impl FromStr for PlayerAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "hit" => Ok(Self::Hit),
            "stand" => Ok(Self::Stand),
            "double" => Ok(Self::Double),
            "split" => Ok(Self::Split),
            _ => Err(()),
        }
    }
}

/// Typed-dialogue reveal shown before the first hand of an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IntroState {
    #[serde(default)]
    pub text: String,
    /// Characters revealed so far, fractional while typing.
    #[serde(default)]
    pub revealed: f32,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub done: bool,
}

impl IntroState {
    #[must_use]
    pub fn new(text: String) -> Self {
        Self {
            text,
            revealed: 0.0,
            active: true,
            done: false,
        }
    }

    #[must_use]
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    #[must_use]
    pub fn fully_revealed(&self) -> bool {
        self.revealed >= crate::numbers::i32_to_f32(
            i32::try_from(self.char_count()).unwrap_or(i32::MAX),
        )
    }

    /// The prefix of the line revealed so far.
    #[must_use]
    pub fn visible_text(&self) -> String {
        let take = crate::numbers::floor_f64_to_u32(f64::from(self.revealed)) as usize;
        self.text.chars().take(take).collect()
    }

    pub fn tick(&mut self, dt: f32) {
        if self.active && !self.fully_revealed() {
            self.revealed += INTRO_CHARS_PER_SEC * dt;
        }
    }

    pub fn reveal_all(&mut self) {
        self.revealed = crate::numbers::i32_to_f32(
            i32::try_from(self.char_count()).unwrap_or(i32::MAX),
        );
    }

    pub fn finish(&mut self) {
        self.reveal_all();
        self.active = false;
        self.done = true;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Enemy {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: EnemyKind,
    #[serde(default)]
    pub hp: i32,
    #[serde(default)]
    pub max_hp: i32,
    #[serde(default)]
    pub attack: i32,
    #[serde(default)]
    pub gold_drop: i32,
    /// Asset key derived from the name.
    #[serde(default)]
    pub avatar: String,
}

/// One enemy engagement; replaced wholesale for each new fight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    #[serde(default)]
    pub enemy: Enemy,
    #[serde(default)]
    pub shoe: Shoe,
    #[serde(default)]
    pub player_hand: Hand,
    #[serde(default)]
    pub dealer_hand: Hand,
    /// Seed cards for pending split hands, oldest first.
    #[serde(default)]
    pub split_queue: VecDeque<Card>,
    #[serde(default)]
    pub split_used: bool,
    #[serde(default = "default_split_hands_total")]
    pub split_hands_total: u32,
    #[serde(default)]
    pub split_hands_resolved: u32,
    /// Dealer drawn once per encounter while a split is active, so all
    /// split hands face one dealer result.
    #[serde(default)]
    pub dealer_resolved: bool,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub result_text: String,
    #[serde(default)]
    pub result_tone: ResultTone,
    /// Pacing delay before the next deal becomes available.
    #[serde(default)]
    pub resolve_timer: f32,
    #[serde(default)]
    pub next_deal_prompted: bool,
    #[serde(default)]
    pub bust_guard_triggered: bool,
    #[serde(default)]
    pub crit_triggered: bool,
    #[serde(default)]
    pub doubled: bool,
    #[serde(default)]
    pub is_split_hand: bool,
    #[serde(default)]
    pub last_player_action: PlayerAction,
    #[serde(default)]
    pub hand_index: u32,
    #[serde(default)]
    pub intro: IntroState,
}

fn default_split_hands_total() -> u32 {
    1
}

impl Default for Encounter {
    fn default() -> Self {
        Self {
            enemy: Enemy::default(),
            shoe: Shoe::default(),
            player_hand: Hand::new(),
            dealer_hand: Hand::new(),
            split_queue: VecDeque::new(),
            split_used: false,
            split_hands_total: 1,
            split_hands_resolved: 0,
            dealer_resolved: false,
            phase: Phase::Player,
            result_text: String::new(),
            result_tone: ResultTone::Info,
            resolve_timer: 0.0,
            next_deal_prompted: false,
            bust_guard_triggered: false,
            crit_triggered: false,
            doubled: false,
            is_split_hand: false,
            last_player_action: PlayerAction::None,
            hand_index: 0,
            intro: IntroState::default(),
        }
    }
}

impl Encounter {
    /// Player total with the bust-guard forcing applied.
    #[must_use]
    pub fn player_total(&self) -> i32 {
        let raw = hand_total(&self.player_hand);
        if self.bust_guard_triggered && raw > 21 {
            21
        } else {
            raw
        }
    }

    #[must_use]
    pub fn dealer_total(&self) -> i32 {
        hand_total(&self.dealer_hand)
    }

    #[must_use]
    pub fn first_hand(&self) -> bool {
        self.hand_index == 0
    }
}

/// Asset key derived by slugifying a display name.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Deterministic enemy stats from floor/room/kind; only the name is
/// sampled so balance stays reproducible.
#[must_use]
pub fn create_enemy<R: Rng>(floor: u32, room: u32, kind: EnemyKind, rng: &mut R) -> Enemy {
    let floor_i = i32::try_from(floor).unwrap_or(1);
    let room_i = i32::try_from(room).unwrap_or(1);

    let hp_bonus = match kind {
        EnemyKind::Normal => 0,
        EnemyKind::Elite => ENEMY_HP_BONUS_ELITE,
        EnemyKind::Boss => ENEMY_HP_BONUS_BOSS,
    };
    let hp = ENEMY_BASE_HP + ENEMY_HP_PER_FLOOR * floor_i + ENEMY_HP_PER_ROOM * room_i + hp_bonus;

    let attack_bonus = match kind {
        EnemyKind::Normal => ENEMY_ATTACK_BONUS_NORMAL,
        EnemyKind::Elite => ENEMY_ATTACK_BONUS_ELITE,
        EnemyKind::Boss => ENEMY_ATTACK_BONUS_BOSS,
    };
    let attack = (floor_i + attack_bonus).max(1);

    let gold_bonus = match kind {
        EnemyKind::Normal => 0,
        EnemyKind::Elite => ENEMY_GOLD_BONUS_ELITE,
        EnemyKind::Boss => ENEMY_GOLD_BONUS_BOSS,
    };
    let gold_drop =
        ENEMY_BASE_GOLD + ENEMY_GOLD_PER_FLOOR * floor_i + ENEMY_GOLD_PER_ROOM * room_i + gold_bonus;

    let pool = match kind {
        EnemyKind::Normal => NORMAL_NAMES,
        EnemyKind::Elite => ELITE_NAMES,
        EnemyKind::Boss => BOSS_NAMES,
    };
    let name = (*pool.choose(rng).unwrap_or(&"Stranger")).to_string();
    let avatar = slugify(&name);

    Enemy {
        name,
        kind,
        hp,
        max_hp: hp,
        attack,
        gold_drop,
        avatar,
    }
}

/// Compose the intro line from per-kind opener and closer pools,
/// retrying a few times to avoid repeating the previous encounter's
/// line. Verbatim openers stand alone.
#[must_use]
pub fn build_enemy_intro_dialogue<R: Rng>(
    kind: EnemyKind,
    previous: Option<&str>,
    rng: &mut R,
) -> String {
    let (openers, closers) = match kind {
        EnemyKind::Normal => (NORMAL_OPENERS, NORMAL_CLOSERS),
        EnemyKind::Elite => (ELITE_OPENERS, ELITE_CLOSERS),
        EnemyKind::Boss => (BOSS_OPENERS, BOSS_CLOSERS),
    };

    let mut line = String::new();
    for _ in 0..=INTRO_RETRY_LIMIT {
        let Some(opener) = openers.choose(rng) else {
            break;
        };
        line = if opener.verbatim {
            opener.text.to_string()
        } else {
            let closer = closers.choose(rng).copied().unwrap_or("");
            format!("{} {}", opener.text, closer)
        };
        if previous != Some(line.as_str()) {
            break;
        }
    }
    line
}

/// Sole constructor of a live `Encounter`: resolves the room type,
/// builds the enemy, shuffles a fresh shoe, refills the per-encounter
/// bust guards, and seeds the intro reveal with zero hands dealt.
#[must_use]
pub fn create_encounter(run: &mut Run, previous_intro: Option<&str>) -> Encounter {
    let kind = resolve_room_type(run.room, run.rooms_per_floor);
    let enemy = create_enemy(run.floor, run.room, kind, run.rng_mut());
    let shoe = Shoe::fresh(run.rng_mut());
    let intro_line = build_enemy_intro_dialogue(kind, previous_intro, run.rng_mut());

    run.player.bust_guards_left = BASE_BUST_GUARDS + run.player.stats.bust_guards;
    run.push_log(format!("{} takes the dealer's seat.", enemy.name));

    Encounter {
        enemy,
        shoe,
        intro: IntroState::new(intro_line),
        ..Encounter::default()
    }
}
