//! Shoedown Rules Engine
//!
//! Platform-agnostic core logic for Shoedown, a blackjack roguelike
//! card battler. Hands resolve as combat exchanges against a dealer
//! enemy; this crate owns the encounter state machine, the damage and
//! economy formulas, run progression, and the sanitizing persistence
//! layer. It contains no rendering, input, or audio code.

pub mod camp;
pub mod cards;
pub mod constants;
pub mod encounter;
pub mod numbers;
pub mod profile;
pub mod progression;
pub mod relics;
pub mod resolve;
pub mod sanitize;
pub mod save;
pub mod session;
pub mod showdown;
pub mod state;
pub mod turn;
pub mod view;

// Re-export commonly used types
pub use camp::{
    CampError, ShopItem, ShopItemKind, build_shop_stock, buy, claim_reward, enter_camp,
    roll_reward_options,
};
pub use cards::{
    Card, Hand, Rank, Shoe, Suit, can_double_down, can_split_hand, hand_total, is_blackjack,
};
pub use encounter::{
    Encounter, Enemy, IntroState, Phase, PlayerAction, build_enemy_intro_dialogue, create_encounter,
    create_enemy, slugify,
};
pub use profile::{Profile, RunRecord, RunResult};
pub use progression::{CampKind, EnemyKind, camp_kind_for_room, resolve_room_type};
pub use relics::{
    RELICS, Rarity, RelicDef, RelicEffect, Unlock, apply_relic_effect, find_relic, grant_relic,
    is_unlocked, unlock_progress_for,
};
pub use resolve::{FinalizeSignal, HandResolution, apply_showdown};
pub use sanitize::{sanitize_encounter, sanitize_mode, sanitize_run};
pub use save::{
    MemoryStore, PROFILE_SAVE_KEY, RUN_SAVE_KEY, SavedSnapshot, SnapshotStore, clear_snapshot,
    decode_snapshot, encode_snapshot, load_profile, load_snapshot, save_best_effort,
    save_profile_best_effort, try_load_snapshot, try_save_snapshot,
};
pub use session::{Cue, GameSession};
pub use showdown::{Outcome, ResultTone, resolve_showdown_outcome};
pub use state::{LogLine, Mode, PlayerState, PlayerStats, Run};
pub use turn::{
    ActionError, advance_to_next_deal, can_player_act, double_down, hit, split, stand, start_hand,
};
pub use view::{ActionKind, EnemyView, HandView, SessionView};
