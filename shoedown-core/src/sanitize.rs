//! Untrusted-input sanitizers for persisted state.
//!
//! A snapshot read back from storage may be corrupted, hand-edited, or
//! built by an older build. Every field here is coerced independently
//! with a safe fallback, enum strings are whitelisted through their
//! `FromStr` impls, arrays are truncated to their caps, and nested
//! records are rebuilt key by key. A sanitizer never panics: it returns
//! `None` only when the anchor value is not an object at all.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::Value;

use crate::cards::{Card, Hand, Shoe};
use crate::constants::{
    EVENT_LOG_CAP, LOG_CAP, MAX_RELIC_STACKS, MAX_SPLIT_HANDS, STARTING_GOLD, STARTING_HP,
};
use crate::encounter::{Encounter, Enemy, IntroState, Phase, PlayerAction, slugify};
use crate::numbers::{clamp_f64_to_f32, floor_f64_to_u32, round_f64_to_i32, usize_to_u32};
use crate::progression::EnemyKind;
use crate::showdown::ResultTone;
use crate::state::{LogLine, Mode, PlayerState, PlayerStats, Run};

fn finite(v: &Value) -> Option<f64> {
    v.as_f64().filter(|n| n.is_finite())
}

fn coerce_i32(obj: &Value, key: &str, fallback: i32) -> i32 {
    obj.get(key).and_then(finite).map_or(fallback, round_f64_to_i32)
}

fn coerce_i32_in(obj: &Value, key: &str, fallback: i32, min: i32, max: i32) -> i32 {
    coerce_i32(obj, key, fallback).clamp(min, max)
}

fn coerce_u32(obj: &Value, key: &str, fallback: u32) -> u32 {
    obj.get(key).and_then(finite).map_or(fallback, floor_f64_to_u32)
}

fn coerce_u64(obj: &Value, key: &str) -> u64 {
    match obj.get(key) {
        Some(v) => v.as_u64().or_else(|| finite(v).map(|n| n.max(0.0) as u64)).unwrap_or(0),
        None => 0,
    }
}

fn coerce_f32_in(obj: &Value, key: &str, fallback: f32, min: f32, max: f32) -> f32 {
    obj.get(key)
        .and_then(finite)
        .map_or(fallback, clamp_f64_to_f32)
        .clamp(min, max)
}

fn coerce_bool(obj: &Value, key: &str, fallback: bool) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(fallback)
}

fn coerce_string(obj: &Value, key: &str, max_len: usize) -> String {
    let raw = obj.get(key).and_then(Value::as_str).unwrap_or("");
    if raw.len() <= max_len {
        raw.to_string()
    } else {
        raw.chars().take(max_len).collect()
    }
}

fn coerce_enum<T: FromStr + Default>(obj: &Value, key: &str) -> T {
    obj.get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Top-level session mode, restricted to the known set.
pub fn sanitize_mode(value: Option<&Value>) -> Mode {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// A card survives only if both rank and suit parse against the fixed
/// vocabularies; everything else is dropped from its hand.
pub fn sanitize_card(value: &Value) -> Option<Card> {
    let rank = value.get("rank")?.as_str()?.parse().ok()?;
    let suit = value.get("suit")?.as_str()?.parse().ok()?;
    Some(Card::new(rank, suit))
}

fn sanitize_hand(value: Option<&Value>) -> Hand {
    value
        .and_then(Value::as_array)
        .map(|cards| cards.iter().filter_map(sanitize_card).collect())
        .unwrap_or_default()
}

fn sanitize_card_pile(value: Option<&Value>) -> Vec<Card> {
    value
        .and_then(Value::as_array)
        .map(|cards| cards.iter().filter_map(sanitize_card).collect())
        .unwrap_or_default()
}

/// Rebuild the relic map, dropping ids outside the catalog and
/// clamping stack counts.
pub fn sanitize_relics(value: Option<&Value>) -> BTreeMap<String, u32> {
    let mut relics = BTreeMap::new();
    let Some(map) = value.and_then(Value::as_object) else {
        return relics;
    };
    for (id, count) in map {
        if crate::relics::find_relic(id).is_none() {
            continue;
        }
        let count = finite(count).map_or(0, floor_f64_to_u32);
        if count > 0 {
            relics.insert(id.clone(), count.min(MAX_RELIC_STACKS));
        }
    }
    relics
}

/// Rebuild the stat record key by key; the struct-level clamp applies
/// the balance bounds afterward.
pub fn sanitize_stats(value: Option<&Value>) -> PlayerStats {
    let defaults = PlayerStats::default();
    let Some(obj) = value.filter(|v| v.is_object()) else {
        return defaults;
    };
    let mut stats = PlayerStats {
        flat_damage: coerce_i32(obj, "flat_damage", defaults.flat_damage),
        block: coerce_i32(obj, "block", defaults.block),
        crit_chance: coerce_f32_in(obj, "crit_chance", defaults.crit_chance, 0.0, 1.0),
        gold_mult: coerce_f32_in(obj, "gold_mult", defaults.gold_mult, 0.0, 10.0),
        heal_on_win_hand: coerce_i32(obj, "heal_on_win_hand", defaults.heal_on_win_hand),
        blackjack_heal: coerce_i32(obj, "blackjack_heal", defaults.blackjack_heal),
        chips_on_win_hand: coerce_i32(obj, "chips_on_win_hand", defaults.chips_on_win_hand),
        chips_on_push: coerce_i32(obj, "chips_on_push", defaults.chips_on_push),
        streak_bonus: coerce_i32(obj, "streak_bonus", defaults.streak_bonus),
        first_hand_bonus: coerce_i32(obj, "first_hand_bonus", defaults.first_hand_bonus),
        split_bonus: coerce_i32(obj, "split_bonus", defaults.split_bonus),
        elite_bonus: coerce_i32(obj, "elite_bonus", defaults.elite_bonus),
        double_win_bonus: coerce_i32(obj, "double_win_bonus", defaults.double_win_bonus),
        stand_win_bonus: coerce_i32(obj, "stand_win_bonus", defaults.stand_win_bonus),
        double_loss_block: coerce_i32(obj, "double_loss_block", defaults.double_loss_block),
        low_hp_bonus: coerce_i32(obj, "low_hp_bonus", defaults.low_hp_bonus),
        max_hp_bonus: coerce_i32(obj, "max_hp_bonus", defaults.max_hp_bonus),
        bust_guards: coerce_i32(obj, "bust_guards", defaults.bust_guards),
    };
    stats.clamp();
    stats
}

fn sanitize_player(value: Option<&Value>) -> PlayerState {
    let Some(obj) = value.filter(|v| v.is_object()) else {
        return PlayerState::default();
    };
    let mut player = PlayerState {
        hp: coerce_i32(obj, "hp", STARTING_HP),
        max_hp: coerce_i32(obj, "max_hp", STARTING_HP),
        gold: coerce_i32(obj, "gold", STARTING_GOLD),
        streak: coerce_i32(obj, "streak", 0),
        damage_dealt: coerce_u32(obj, "damage_dealt", 0),
        damage_taken: coerce_u32(obj, "damage_taken", 0),
        bust_guards_left: coerce_i32(obj, "bust_guards_left", 0),
        relics: sanitize_relics(obj.get("relics")),
        stats: sanitize_stats(obj.get("stats")),
    };
    player.clamp();
    player
}

fn sanitize_log(value: Option<&Value>) -> Vec<LogLine> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let text = item.get("text")?.as_str()?;
            if text.is_empty() {
                return None;
            }
            Some(LogLine {
                text: text.chars().take(200).collect(),
                ttl: coerce_f32_in(item, "ttl", 0.0, 0.0, 30.0),
            })
        })
        .take(LOG_CAP)
        .collect()
}

fn sanitize_event_log(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| s.chars().take(200).collect())
        .take(EVENT_LOG_CAP)
        .collect()
}

/// Coerce an arbitrary value into a well-formed run. Returns `None`
/// when the value is not an object; every missing or malformed field
/// inside an object falls back independently.
pub fn sanitize_run(value: &Value) -> Option<Run> {
    if !value.is_object() {
        return None;
    }
    let obj = value;
    let mut run = Run {
        floor: coerce_u32(obj, "floor", 1),
        max_floor: coerce_u32(obj, "max_floor", Run::default().max_floor),
        room: coerce_u32(obj, "room", 1),
        rooms_per_floor: coerce_u32(obj, "rooms_per_floor", Run::default().rooms_per_floor),
        enemies_defeated: coerce_u32(obj, "enemies_defeated", 0),
        total_hands: coerce_u32(obj, "total_hands", 0),
        resolved_hands: coerce_u32(obj, "resolved_hands", 0),
        chips_earned_run: coerce_u32(obj, "chips_earned_run", 0),
        chips_spent_run: coerce_u32(obj, "chips_spent_run", 0),
        max_streak: coerce_i32_in(obj, "max_streak", 0, 0, 999),
        blackjacks: coerce_u32(obj, "blackjacks", 0),
        doubles_won: coerce_u32(obj, "doubles_won", 0),
        splits_used: coerce_u32(obj, "splits_used", 0),
        pushes: coerce_u32(obj, "pushes", 0),
        shop_purchase_made: coerce_bool(obj, "shop_purchase_made", false),
        player: sanitize_player(obj.get("player")),
        log: sanitize_log(obj.get("log")),
        event_log: sanitize_event_log(obj.get("event_log")),
        seed: coerce_u64(obj, "seed"),
        rng: None,
    };
    run.clamp();
    Some(run)
}

fn sanitize_enemy(value: Option<&Value>) -> Enemy {
    // A missing enemy goes through the same coercions as an empty one
    // so a second sanitize pass is a fixed point.
    let empty = Value::Object(serde_json::Map::new());
    let obj = value.filter(|v| v.is_object()).unwrap_or(&empty);
    let kind: EnemyKind = coerce_enum(obj, "kind");
    let name = coerce_string(obj, "name", 64);
    let max_hp = coerce_i32_in(obj, "max_hp", 1, 1, 9_999);
    let mut avatar = coerce_string(obj, "avatar", 64);
    if avatar.is_empty() && !name.is_empty() {
        avatar = slugify(&name);
    }
    Enemy {
        hp: coerce_i32_in(obj, "hp", max_hp, 0, max_hp),
        max_hp,
        attack: coerce_i32_in(obj, "attack", 1, 1, 99),
        gold_drop: coerce_i32_in(obj, "gold_drop", 0, 0, 9_999),
        name,
        kind,
        avatar,
    }
}

fn sanitize_intro(value: Option<&Value>) -> IntroState {
    let Some(obj) = value.filter(|v| v.is_object()) else {
        return IntroState::default();
    };
    let text = coerce_string(obj, "text", 400);
    let char_cap = usize_to_u32(text.chars().count()) as f32;
    let mut intro = IntroState {
        revealed: coerce_f32_in(obj, "revealed", 0.0, 0.0, char_cap),
        active: coerce_bool(obj, "active", false),
        done: coerce_bool(obj, "done", false),
        text,
    };
    if intro.done {
        intro.active = false;
        intro.revealed = char_cap;
    }
    intro
}

/// Coerce an arbitrary value into a well-formed encounter. The split
/// queue is capped below the split-hand maximum and resolved-hand
/// counters are pinned inside the total.
pub fn sanitize_encounter(value: &Value) -> Option<Encounter> {
    if !value.is_object() {
        return None;
    }
    let obj = value;
    let split_hands_total = coerce_u32(obj, "split_hands_total", 1).clamp(1, MAX_SPLIT_HANDS);
    let mut split_queue: Vec<Card> = sanitize_card_pile(obj.get("split_queue"));
    split_queue.truncate(MAX_SPLIT_HANDS as usize - 1);
    let phase: Phase = coerce_enum(obj, "phase");
    let tone: ResultTone = coerce_enum(obj, "result_tone");
    let action: PlayerAction = coerce_enum(obj, "last_player_action");

    Some(Encounter {
        enemy: sanitize_enemy(obj.get("enemy")),
        shoe: Shoe {
            cards: sanitize_card_pile(obj.get("shoe").and_then(|s| s.get("cards"))),
            discard: sanitize_card_pile(obj.get("shoe").and_then(|s| s.get("discard"))),
        },
        player_hand: sanitize_hand(obj.get("player_hand")),
        dealer_hand: sanitize_hand(obj.get("dealer_hand")),
        split_queue: split_queue.into_iter().collect(),
        split_used: coerce_bool(obj, "split_used", false),
        split_hands_total,
        split_hands_resolved: coerce_u32(obj, "split_hands_resolved", 0).min(split_hands_total),
        dealer_resolved: coerce_bool(obj, "dealer_resolved", false),
        phase,
        result_text: coerce_string(obj, "result_text", 200),
        result_tone: tone,
        resolve_timer: coerce_f32_in(obj, "resolve_timer", 0.0, 0.0, 10.0),
        next_deal_prompted: coerce_bool(obj, "next_deal_prompted", false),
        bust_guard_triggered: coerce_bool(obj, "bust_guard_triggered", false),
        crit_triggered: coerce_bool(obj, "crit_triggered", false),
        doubled: coerce_bool(obj, "doubled", false),
        is_split_hand: coerce_bool(obj, "is_split_hand", false),
        last_player_action: action,
        hand_index: coerce_u32(obj, "hand_index", 0).min(9_999),
        intro: sanitize_intro(obj.get("intro")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn non_objects_are_rejected_wholesale() {
        assert!(sanitize_run(&Value::Null).is_none());
        assert!(sanitize_run(&json!("run")).is_none());
        assert!(sanitize_run(&json!(42)).is_none());
        assert!(sanitize_encounter(&Value::Null).is_none());
        assert!(sanitize_encounter(&json!([1, 2])).is_none());
    }

    #[test]
    fn empty_object_yields_defaults() {
        let run = sanitize_run(&json!({})).unwrap();
        assert_eq!(run.floor, 1);
        assert_eq!(run.room, 1);
        assert_eq!(run.player.hp, STARTING_HP);
        assert_eq!(run.player.gold, STARTING_GOLD);
    }

    #[test]
    fn string_hp_falls_back_and_clamps() {
        let run = sanitize_run(&json!({
            "player": { "hp": "NaN", "max_hp": 40, "gold": -12.5 }
        }))
        .unwrap();
        assert_eq!(run.player.max_hp, 40);
        // The fallback starting HP is within [0, max_hp] already.
        assert_eq!(run.player.hp, STARTING_HP);
        assert_eq!(run.player.gold, 0);
    }

    #[test]
    fn out_of_range_numbers_are_clamped() {
        let run = sanitize_run(&json!({
            "floor": 1e12,
            "rooms_per_floor": 0,
            "player": {
                "hp": 9999, "max_hp": 50,
                "stats": { "crit_chance": 7.5, "gold_mult": -3, "flat_damage": 1e9 }
            }
        }))
        .unwrap();
        assert_eq!(run.floor, 99);
        assert_eq!(run.rooms_per_floor, 3);
        assert_eq!(run.player.hp, 50);
        assert!((run.player.stats.crit_chance - 0.6).abs() < f32::EPSILON);
        assert!((run.player.stats.gold_mult - 0.5).abs() < f32::EPSILON);
        assert_eq!(run.player.stats.flat_damage, 50);
    }

    #[test]
    fn unknown_relic_ids_and_enum_strings_are_dropped() {
        let run = sanitize_run(&json!({
            "player": { "relics": { "loaded_dice": 2, "gamer_chair": 9, "felt_padding": 99 } }
        }))
        .unwrap();
        assert_eq!(run.player.relics.get("loaded_dice"), Some(&2));
        assert_eq!(run.player.relics.get("felt_padding"), Some(&MAX_RELIC_STACKS));
        assert!(!run.player.relics.contains_key("gamer_chair"));

        let enc = sanitize_encounter(&json!({
            "phase": "quantum", "result_tone": "sparkly", "last_player_action": "yeet"
        }))
        .unwrap();
        assert_eq!(enc.phase, Phase::Player);
        assert_eq!(enc.result_tone, ResultTone::Info);
        assert_eq!(enc.last_player_action, PlayerAction::None);
    }

    #[test]
    fn invalid_cards_are_dropped_not_fatal() {
        let enc = sanitize_encounter(&json!({
            "player_hand": [
                { "rank": "A", "suit": "spades" },
                { "rank": "11", "suit": "spades" },
                { "rank": "K", "suit": "stars" },
                "not a card",
                { "rank": "9", "suit": "hearts" }
            ]
        }))
        .unwrap();
        assert_eq!(enc.player_hand.len(), 2);
    }

    #[test]
    fn split_queue_is_capped_below_the_hand_maximum() {
        let card = json!({ "rank": "8", "suit": "clubs" });
        let enc = sanitize_encounter(&json!({
            "split_queue": [card, card, card, card, card],
            "split_hands_total": 99,
            "split_hands_resolved": 17
        }))
        .unwrap();
        assert_eq!(enc.split_queue.len(), MAX_SPLIT_HANDS as usize - 1);
        assert_eq!(enc.split_hands_total, MAX_SPLIT_HANDS);
        assert_eq!(enc.split_hands_resolved, MAX_SPLIT_HANDS);
    }

    #[test]
    fn log_caps_hold() {
        let lines: Vec<Value> = (0..40).map(|i| json!({ "text": format!("line {i}") })).collect();
        let events: Vec<Value> = (0..500).map(|i| json!(format!("event {i}"))).collect();
        let run = sanitize_run(&json!({ "log": lines, "event_log": events })).unwrap();
        assert_eq!(run.log.len(), LOG_CAP);
        assert_eq!(run.event_log.len(), EVENT_LOG_CAP);
    }

    #[test]
    fn finished_intro_is_normalized() {
        let enc = sanitize_encounter(&json!({
            "intro": { "text": "Deal me in.", "revealed": 2.0, "active": true, "done": true }
        }))
        .unwrap();
        assert!(!enc.intro.active);
        assert!(enc.intro.fully_revealed());
    }

    #[test]
    fn sanitize_run_is_idempotent() {
        let corrupted = json!({
            "floor": -2,
            "room": "third",
            "max_streak": 4000,
            "shop_purchase_made": "yes",
            "player": {
                "hp": 1e9, "max_hp": 55, "gold": "plenty",
                "relics": { "oak_heart": 1, "bogus": 3 },
                "stats": { "crit_chance": "high", "block": 400 }
            },
            "log": [{ "text": "kept", "ttl": 99 }, { "ttl": 1 }],
            "seed": 77
        });
        let first = sanitize_run(&corrupted).unwrap();
        let reserialized = serde_json::to_value(&first).unwrap();
        let second = sanitize_run(&reserialized).unwrap();
        assert_eq!(
            serde_json::to_value(&second).unwrap(),
            reserialized,
            "second pass must be a fixed point"
        );
    }

    #[test]
    fn sanitize_encounter_is_idempotent() {
        let corrupted = json!({
            "enemy": { "name": "Pit Fiend", "kind": "elite", "hp": 900, "max_hp": 40, "attack": -2 },
            "player_hand": [{ "rank": "A", "suit": "spades" }, { "rank": "Z", "suit": "moons" }],
            "phase": "dealer",
            "resolve_timer": -4.0,
            "hand_index": 3.9
        });
        let first = sanitize_encounter(&corrupted).unwrap();
        let reserialized = serde_json::to_value(&first).unwrap();
        let second = sanitize_encounter(&reserialized).unwrap();
        assert_eq!(serde_json::to_value(&second).unwrap(), reserialized);
        assert_eq!(first.enemy.hp, 40);
        assert_eq!(first.enemy.attack, 1);
        assert_eq!(first.hand_index, 3);
    }
}
