//! Centralized balance and tuning constants for Shoedown game logic.
//!
//! These values define the deterministic math for the combat and
//! progression engine. Keeping them together ensures that balance can
//! only be adjusted via code changes reviewed in version control,
//! rather than through external JSON assets.

// Logging ------------------------------------------------------------------
pub(crate) const DEBUG_ENV_VAR: &str = "SHOEDOWN_DEBUG_LOGS";

// Shoe and hands -----------------------------------------------------------
pub const DECKS_PER_SHOE: usize = 4;
pub const SHOE_RESHUFFLE_MIN: usize = 6;
pub const MAX_SPLIT_HANDS: u32 = 4;
pub const DEALER_STAND_TOTAL: i32 = 17;

// Run shape ----------------------------------------------------------------
pub const DEFAULT_ROOMS_PER_FLOOR: u32 = 5;
pub const MIN_ROOMS_PER_FLOOR: u32 = 3;
pub const DEFAULT_MAX_FLOOR: u32 = 3;
pub const ELITE_ROOM: u32 = 3;

// Player baseline ----------------------------------------------------------
pub const STARTING_HP: i32 = 30;
pub const STARTING_GOLD: i32 = 25;
pub const BASE_BUST_GUARDS: i32 = 1;

// Enemy scaling ------------------------------------------------------------
pub(crate) const ENEMY_BASE_HP: i32 = 14;
pub(crate) const ENEMY_HP_PER_FLOOR: i32 = 4;
pub(crate) const ENEMY_HP_PER_ROOM: i32 = 2;
pub(crate) const ENEMY_HP_BONUS_ELITE: i32 = 12;
pub(crate) const ENEMY_HP_BONUS_BOSS: i32 = 30;
pub(crate) const ENEMY_ATTACK_BONUS_NORMAL: i32 = 2;
pub(crate) const ENEMY_ATTACK_BONUS_ELITE: i32 = 4;
pub(crate) const ENEMY_ATTACK_BONUS_BOSS: i32 = 6;
pub(crate) const ENEMY_BASE_GOLD: i32 = 8;
pub(crate) const ENEMY_GOLD_PER_FLOOR: i32 = 3;
pub(crate) const ENEMY_GOLD_PER_ROOM: i32 = 2;
pub(crate) const ENEMY_GOLD_BONUS_ELITE: i32 = 10;
pub(crate) const ENEMY_GOLD_BONUS_BOSS: i32 = 24;
pub(crate) const INTRO_RETRY_LIMIT: u32 = 4;

// Combat math --------------------------------------------------------------
pub(crate) const OUTGOING_BASE_BLACKJACK: i32 = 12;
pub(crate) const OUTGOING_BASE_DEALER_BUST: i32 = 9;
pub(crate) const OUTGOING_BASE_WIN: i32 = 8;
pub(crate) const INCOMING_EXTRA_PLAYER_BUST: i32 = 2;
pub(crate) const INCOMING_EXTRA_DEALER_BLACKJACK: i32 = 4;
pub(crate) const STREAK_BONUS_CAP: i32 = 4;
pub(crate) const STREAK_CHIP_CAP: i32 = 6;
pub(crate) const INCOMING_DAMAGE_FLOOR: i32 = 1;

// Stat clamps --------------------------------------------------------------
pub(crate) const CRIT_CHANCE_MAX: f32 = 0.6;
pub(crate) const GOLD_MULT_MIN: f32 = 0.5;
pub(crate) const GOLD_MULT_MAX: f32 = 2.35;

// Progression --------------------------------------------------------------
pub(crate) const BOSS_CLEAR_HEAL: i32 = 8;
pub const MAX_RELIC_STACKS: u32 = 3;
pub const REWARD_DRAFT_SIZE: usize = 3;

// Camp shop ----------------------------------------------------------------
pub(crate) const SHOP_HEAL_AMOUNT: i32 = 8;
pub(crate) const SHOP_HEAL_COST: i32 = 12;
pub(crate) const SHOP_GUARD_COST: i32 = 18;
pub(crate) const SHOP_MAXHP_AMOUNT: i32 = 4;
pub(crate) const SHOP_MAXHP_COST: i32 = 20;
pub(crate) const SHOP_PRICE_PER_FLOOR: i32 = 2;

// Pacing timers (seconds) --------------------------------------------------
pub const RESOLVE_DELAY_SECS: f32 = 0.65;
pub const PENDING_TRANSITION_SECS: f32 = 0.9;
pub const INTRO_CHARS_PER_SEC: f32 = 28.0;
pub const ANNOUNCEMENT_SECS: f32 = 2.5;
pub const LOG_TTL_SECS: f32 = 4.0;

// Bounded histories --------------------------------------------------------
pub const LOG_CAP: usize = 6;
pub const EVENT_LOG_CAP: usize = 240;
pub const RUN_HISTORY_CAP: usize = 24;

// Persistence --------------------------------------------------------------
pub const SNAPSHOT_VERSION: u32 = 2;
