//! Relic catalog, effects, and unlock gating.
//!
//! Relic effects are tagged variants dispatched through a pure
//! function over `PlayerStats`, so every effect can be tested and
//! serialized without closures in the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::MAX_RELIC_STACKS;
use crate::profile::Profile;
use crate::state::{PlayerStats, Run};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
}

impl Rarity {
    /// Draft sampling weight.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::Common => 6,
            Self::Uncommon => 3,
            Self::Rare => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "common" => Ok(Self::Common),
            "uncommon" => Ok(Self::Uncommon),
            "rare" => Ok(Self::Rare),
            _ => Err(()),
        }
    }
}

/// What a relic does, as data. Magnitudes live in the catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelicEffect {
    FlatDamage { amount: i32 },
    Block { amount: i32 },
    CritChance { amount: f32 },
    GoldMult { amount: f32 },
    HealOnWin { amount: i32 },
    BlackjackHeal { amount: i32 },
    ChipsOnWin { amount: i32 },
    ChipsOnPush { amount: i32 },
    StreakBonus { amount: i32 },
    FirstHandBonus { amount: i32 },
    SplitBonus { amount: i32 },
    EliteBonus { amount: i32 },
    DoubleWinBonus { amount: i32 },
    StandWinBonus { amount: i32 },
    DoubleLossBlock { amount: i32 },
    LowHpBonus { amount: i32 },
    MaxHp { amount: i32 },
    BustGuard { amount: i32 },
}

/// Fold one relic effect into the stat record. Pure; clamping is the
/// caller's job so stacked applications accumulate before bounding.
pub fn apply_relic_effect(effect: RelicEffect, stats: &mut PlayerStats) {
    match effect {
        RelicEffect::FlatDamage { amount } => stats.flat_damage += amount,
        RelicEffect::Block { amount } => stats.block += amount,
        RelicEffect::CritChance { amount } => stats.crit_chance += amount,
        RelicEffect::GoldMult { amount } => stats.gold_mult += amount,
        RelicEffect::HealOnWin { amount } => stats.heal_on_win_hand += amount,
        RelicEffect::BlackjackHeal { amount } => stats.blackjack_heal += amount,
        RelicEffect::ChipsOnWin { amount } => stats.chips_on_win_hand += amount,
        RelicEffect::ChipsOnPush { amount } => stats.chips_on_push += amount,
        RelicEffect::StreakBonus { amount } => stats.streak_bonus += amount,
        RelicEffect::FirstHandBonus { amount } => stats.first_hand_bonus += amount,
        RelicEffect::SplitBonus { amount } => stats.split_bonus += amount,
        RelicEffect::EliteBonus { amount } => stats.elite_bonus += amount,
        RelicEffect::DoubleWinBonus { amount } => stats.double_win_bonus += amount,
        RelicEffect::StandWinBonus { amount } => stats.stand_win_bonus += amount,
        RelicEffect::DoubleLossBlock { amount } => stats.double_loss_block += amount,
        RelicEffect::LowHpBonus { amount } => stats.low_hp_bonus += amount,
        RelicEffect::MaxHp { amount } => stats.max_hp_bonus += amount,
        RelicEffect::BustGuard { amount } => stats.bust_guards += amount,
    }
}

/// Unlock gate evaluated against lifetime profile totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlock {
    Always,
    LifetimeHands(u32),
    LifetimeBlackjacks(u32),
    LifetimeSplits(u32),
    LifetimeEnemies(u32),
    Victories(u32),
}

/// Static catalog entry for one relic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelicDef {
    pub id: &'static str,
    pub name: &'static str,
    pub desc: &'static str,
    pub rarity: Rarity,
    pub cost: i32,
    pub effect: RelicEffect,
    pub unlock: Unlock,
}

pub const RELICS: &[RelicDef] = &[
    RelicDef {
        id: "loaded_dice",
        name: "Loaded Dice",
        desc: "+2 damage on every winning hand.",
        rarity: Rarity::Common,
        cost: 18,
        effect: RelicEffect::FlatDamage { amount: 2 },
        unlock: Unlock::Always,
    },
    RelicDef {
        id: "felt_padding",
        name: "Felt Padding",
        desc: "Blocks 2 incoming damage.",
        rarity: Rarity::Common,
        cost: 18,
        effect: RelicEffect::Block { amount: 2 },
        unlock: Unlock::Always,
    },
    RelicDef {
        id: "lucky_chip",
        name: "Lucky Chip",
        desc: "+3 chips whenever you win a hand.",
        rarity: Rarity::Common,
        cost: 16,
        effect: RelicEffect::ChipsOnWin { amount: 3 },
        unlock: Unlock::Always,
    },
    RelicDef {
        id: "bar_towel",
        name: "Bar Towel",
        desc: "Heal 2 HP on every winning hand.",
        rarity: Rarity::Common,
        cost: 20,
        effect: RelicEffect::HealOnWin { amount: 2 },
        unlock: Unlock::Always,
    },
    RelicDef {
        id: "sleeve_ace",
        name: "Sleeve Ace",
        desc: "+1 bust guard each encounter.",
        rarity: Rarity::Common,
        cost: 22,
        effect: RelicEffect::BustGuard { amount: 1 },
        unlock: Unlock::LifetimeHands(20),
    },
    RelicDef {
        id: "counters_visor",
        name: "Counter's Visor",
        desc: "+10% crit chance.",
        rarity: Rarity::Uncommon,
        cost: 28,
        effect: RelicEffect::CritChance { amount: 0.10 },
        unlock: Unlock::Always,
    },
    RelicDef {
        id: "velvet_rope",
        name: "Velvet Rope",
        desc: "+4 chips on every push.",
        rarity: Rarity::Uncommon,
        cost: 24,
        effect: RelicEffect::ChipsOnPush { amount: 4 },
        unlock: Unlock::LifetimeHands(40),
    },
    RelicDef {
        id: "brass_knuckles",
        name: "Brass Knuckles",
        desc: "+3 damage when a stand wins the hand.",
        rarity: Rarity::Uncommon,
        cost: 26,
        effect: RelicEffect::StandWinBonus { amount: 3 },
        unlock: Unlock::Always,
    },
    RelicDef {
        id: "double_down_ring",
        name: "Double-Down Ring",
        desc: "+4 damage when a double wins the hand.",
        rarity: Rarity::Uncommon,
        cost: 28,
        effect: RelicEffect::DoubleWinBonus { amount: 4 },
        unlock: Unlock::Always,
    },
    RelicDef {
        id: "pit_boss_badge",
        name: "Pit Boss Badge",
        desc: "+4 damage against elites and bosses.",
        rarity: Rarity::Uncommon,
        cost: 30,
        effect: RelicEffect::EliteBonus { amount: 4 },
        unlock: Unlock::LifetimeEnemies(15),
    },
    RelicDef {
        id: "opening_book",
        name: "Opening Book",
        desc: "+3 damage on the first hand of each fight.",
        rarity: Rarity::Uncommon,
        cost: 24,
        effect: RelicEffect::FirstHandBonus { amount: 3 },
        unlock: Unlock::Always,
    },
    RelicDef {
        id: "split_band",
        name: "Split Band",
        desc: "+3 damage while playing split hands.",
        rarity: Rarity::Uncommon,
        cost: 26,
        effect: RelicEffect::SplitBonus { amount: 3 },
        unlock: Unlock::LifetimeSplits(5),
    },
    RelicDef {
        id: "royal_flourish",
        name: "Royal Flourish",
        desc: "Heal 4 HP on every blackjack.",
        rarity: Rarity::Rare,
        cost: 38,
        effect: RelicEffect::BlackjackHeal { amount: 4 },
        unlock: Unlock::LifetimeBlackjacks(10),
    },
    RelicDef {
        id: "golden_horseshoe",
        name: "Golden Horseshoe",
        desc: "+25% gold from enemies.",
        rarity: Rarity::Rare,
        cost: 40,
        effect: RelicEffect::GoldMult { amount: 0.25 },
        unlock: Unlock::Always,
    },
    RelicDef {
        id: "desperado_grit",
        name: "Desperado's Grit",
        desc: "+4 damage while below half HP.",
        rarity: Rarity::Rare,
        cost: 36,
        effect: RelicEffect::LowHpBonus { amount: 4 },
        unlock: Unlock::LifetimeEnemies(30),
    },
    RelicDef {
        id: "hot_hand_charm",
        name: "Hot Hand Charm",
        desc: "+1 damage per win streak (capped).",
        rarity: Rarity::Rare,
        cost: 38,
        effect: RelicEffect::StreakBonus { amount: 1 },
        unlock: Unlock::LifetimeHands(80),
    },
    RelicDef {
        id: "hedged_bet",
        name: "Hedged Bet",
        desc: "Blocks 3 extra damage when a double loses.",
        rarity: Rarity::Rare,
        cost: 34,
        effect: RelicEffect::DoubleLossBlock { amount: 3 },
        unlock: Unlock::Always,
    },
    RelicDef {
        id: "oak_heart",
        name: "Oak Heart",
        desc: "+8 max HP.",
        rarity: Rarity::Rare,
        cost: 42,
        effect: RelicEffect::MaxHp { amount: 8 },
        unlock: Unlock::Victories(1),
    },
];

#[must_use]
pub fn find_relic(id: &str) -> Option<&'static RelicDef> {
    RELICS.iter().find(|def| def.id == id)
}

/// Unlock progress as (current, required). Required 0 means always
/// unlocked.
#[must_use]
pub fn unlock_progress_for(def: &RelicDef, profile: &Profile) -> (u32, u32) {
    match def.unlock {
        Unlock::Always => (0, 0),
        Unlock::LifetimeHands(req) => (profile.lifetime_hands.min(req), req),
        Unlock::LifetimeBlackjacks(req) => (profile.lifetime_blackjacks.min(req), req),
        Unlock::LifetimeSplits(req) => (profile.lifetime_splits.min(req), req),
        Unlock::LifetimeEnemies(req) => (profile.lifetime_enemies.min(req), req),
        Unlock::Victories(req) => (profile.victories.min(req), req),
    }
}

#[must_use]
pub fn is_unlocked(def: &RelicDef, profile: &Profile) -> bool {
    let (current, required) = unlock_progress_for(def, profile);
    current >= required
}

/// Grant a relic to the run: bump the stack counter, re-apply the
/// effect, and clamp. Returns false (no mutation) for unknown ids or a
/// relic already at max stacks.
pub fn grant_relic(run: &mut Run, relic_id: &str) -> bool {
    let Some(def) = find_relic(relic_id) else {
        return false;
    };
    let stacks = run.player.relics.get(relic_id).copied().unwrap_or(0);
    if stacks >= MAX_RELIC_STACKS {
        return false;
    }
    run.player.relics.insert(relic_id.to_string(), stacks + 1);
    apply_relic_effect(def.effect, &mut run.player.stats);

    // Run-level grants beyond the stat record.
    match def.effect {
        RelicEffect::MaxHp { amount } => run.player.heal(amount),
        RelicEffect::BustGuard { amount } => {
            run.player.bust_guards_left += amount.max(0);
        }
        _ => {}
    }
    run.player.clamp();
    run.push_log(format!("Picked up {}.", def.name));
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        for (i, a) in RELICS.iter().enumerate() {
            for b in &RELICS[i + 1..] {
                assert_ne!(a.id, b.id, "duplicate relic id {}", a.id);
            }
        }
    }

    #[test]
    fn every_effect_moves_exactly_one_stat() {
        for def in RELICS {
            let mut stats = PlayerStats::default();
            let before = stats.clone();
            apply_relic_effect(def.effect, &mut stats);
            assert_ne!(stats, before, "relic {} had no effect", def.id);
        }
    }

    #[test]
    fn granting_stacks_and_caps() {
        let mut run = Run::default();
        assert!(grant_relic(&mut run, "loaded_dice"));
        assert!(grant_relic(&mut run, "loaded_dice"));
        assert!(grant_relic(&mut run, "loaded_dice"));
        assert!(!grant_relic(&mut run, "loaded_dice"));
        assert_eq!(run.player.relics.get("loaded_dice"), Some(&3));
        assert_eq!(run.player.stats.flat_damage, 6);
    }

    #[test]
    fn unknown_relic_is_rejected() {
        let mut run = Run::default();
        assert!(!grant_relic(&mut run, "cursed_monkey_paw"));
        assert!(run.player.relics.is_empty());
    }

    #[test]
    fn crit_stacking_respects_clamp() {
        let mut run = Run::default();
        run.player.stats.crit_chance = 0.55;
        assert!(grant_relic(&mut run, "counters_visor"));
        assert!(run.player.stats.crit_chance <= 0.6 + f32::EPSILON);
    }

    #[test]
    fn unlock_progress_tracks_profile() {
        let def = find_relic("royal_flourish").unwrap();
        let mut profile = Profile::default();
        assert!(!is_unlocked(def, &profile));
        assert_eq!(unlock_progress_for(def, &profile), (0, 10));
        profile.lifetime_blackjacks = 12;
        assert!(is_unlocked(def, &profile));
        assert_eq!(unlock_progress_for(def, &profile), (10, 10));
    }

    #[test]
    fn max_hp_relic_heals_on_pickup() {
        let mut run = Run::default();
        run.player.hp = 10;
        assert!(grant_relic(&mut run, "oak_heart"));
        assert_eq!(run.player.stats.max_hp_bonus, 8);
        assert_eq!(run.player.hp, 18);
    }
}
