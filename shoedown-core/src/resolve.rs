//! Combat resolution: turns a showdown outcome into damage, healing,
//! and chip deltas, then decides what happens to the encounter.
//!
//! The formula order is a balance contract: base, then additive relic
//! bonuses, then the crit multiply (outgoing only), then block
//! subtraction with a floor of 1 (incoming only).

use rand::Rng;

#[cfg(debug_assertions)]
use crate::constants::DEBUG_ENV_VAR;
use crate::constants::{
    INCOMING_DAMAGE_FLOOR, INCOMING_EXTRA_DEALER_BLACKJACK, INCOMING_EXTRA_PLAYER_BUST,
    OUTGOING_BASE_BLACKJACK, OUTGOING_BASE_DEALER_BUST, OUTGOING_BASE_WIN, RESOLVE_DELAY_SECS,
    STREAK_BONUS_CAP,
};
use crate::encounter::{Encounter, Phase, PlayerAction};
use crate::progression::EnemyKind;
use crate::showdown::Outcome;
use crate::state::Run;

#[cfg(debug_assertions)]
fn debug_log_enabled() -> bool {
    matches!(std::env::var(DEBUG_ENV_VAR), Ok(val) if val != "0")
}

#[cfg(not(debug_assertions))]
const fn debug_log_enabled() -> bool {
    false
}

/// What the finalize hook decided after applying a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeSignal {
    /// Encounter continues; the next deal unlocks after the pacing delay.
    NextDeal,
    EnemyDefeated,
    PlayerDefeated,
}

/// Everything one hand resolution did, for cue generation and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct HandResolution {
    pub outcome: Outcome,
    pub outgoing: i32,
    pub incoming: i32,
    pub crit: bool,
    pub healed: i32,
    pub chips: i32,
    pub signal: FinalizeSignal,
}

fn outgoing_for(run: &Run, enc: &Encounter, outcome: Outcome) -> i32 {
    let base = match outcome {
        Outcome::Blackjack => OUTGOING_BASE_BLACKJACK,
        Outcome::DealerBust => OUTGOING_BASE_DEALER_BUST,
        Outcome::PlayerWin => OUTGOING_BASE_WIN,
        Outcome::PlayerBust | Outcome::DealerBlackjack | Outcome::DealerWin | Outcome::Push => {
            return 0;
        }
    };
    let stats = &run.player.stats;
    let mut total = base + stats.flat_damage;
    if run.player.is_low_hp() {
        total += stats.low_hp_bonus;
    }
    total += (stats.streak_bonus * run.player.streak).min(STREAK_BONUS_CAP);
    if enc.first_hand() {
        total += stats.first_hand_bonus;
    }
    if enc.split_used {
        total += stats.split_bonus;
    }
    if enc.enemy.kind != EnemyKind::Normal {
        total += stats.elite_bonus;
    }
    match enc.last_player_action {
        PlayerAction::Double => total += stats.double_win_bonus,
        PlayerAction::Stand => total += stats.stand_win_bonus,
        _ => {}
    }
    total.max(0)
}

fn incoming_for(run: &Run, enc: &Encounter, outcome: Outcome) -> i32 {
    if !outcome.is_player_loss() {
        return 0;
    }
    let extra = match outcome {
        Outcome::PlayerBust => INCOMING_EXTRA_PLAYER_BUST,
        Outcome::DealerBlackjack => INCOMING_EXTRA_DEALER_BLACKJACK,
        _ => 0,
    };
    let stats = &run.player.stats;
    let raw = enc.enemy.attack + extra;
    let mut block = stats.block;
    if enc.last_player_action == PlayerAction::Double {
        block += stats.double_loss_block;
    }
    (raw - block).max(INCOMING_DAMAGE_FLOOR)
}

fn result_line(enc: &Encounter, outcome: Outcome, outgoing: i32, incoming: i32) -> String {
    let p = enc.player_total();
    let d = enc.dealer_total();
    match outcome {
        Outcome::Blackjack => format!("Blackjack! {p} over {d} for {outgoing}."),
        Outcome::DealerBust => format!("Dealer busts at {d}. You deal {outgoing}."),
        Outcome::PlayerWin => format!("{p} beats {d}. You deal {outgoing}."),
        Outcome::PlayerBust => format!("Busted at {p}. You take {incoming}."),
        Outcome::DealerBlackjack => format!("Dealer blackjack. You take {incoming}."),
        Outcome::DealerWin => format!("{d} beats {p}. You take {incoming}."),
        Outcome::Push => format!("Push at {p}."),
    }
}

/// Apply a terminal outcome to the run and encounter. The streak used
/// by the streak bonus is the count entering this hand; the win itself
/// increments it afterwards.
pub fn apply_showdown(run: &mut Run, enc: &mut Encounter, outcome: Outcome) -> HandResolution {
    let mut outgoing = outgoing_for(run, enc, outcome);
    let mut crit = false;
    if outgoing > 0 {
        let roll: f32 = run.rng_mut().random();
        if roll < run.player.stats.crit_chance {
            outgoing *= 2;
            crit = true;
        }
    }
    enc.crit_triggered = crit;

    let incoming = incoming_for(run, enc, outcome);

    enc.enemy.hp = (enc.enemy.hp - outgoing).max(0);
    run.player.damage_dealt = run
        .player
        .damage_dealt
        .saturating_add(u32::try_from(outgoing).unwrap_or(0));

    if incoming > 0 {
        run.player.take_damage(incoming);
        run.player.streak = 0;
    }

    let mut healed = 0;
    let mut chips = 0;
    let stats = run.player.stats.clone();
    if outcome.is_player_win() {
        run.player.streak += 1;
        run.note_streak();
        healed += stats.heal_on_win_hand;
        chips += stats.chips_on_win_hand;
        if outcome == Outcome::Blackjack {
            run.blackjacks += 1;
            healed += stats.blackjack_heal;
        }
        if enc.doubled {
            run.doubles_won += 1;
        }
    } else if outcome == Outcome::Push {
        run.pushes += 1;
        chips += stats.chips_on_push;
    }
    if healed > 0 {
        let before = run.player.hp;
        run.player.heal(healed);
        healed = run.player.hp - before;
    }
    if chips > 0 {
        run.gain_chips(chips);
    }

    run.total_hands += 1;
    run.resolved_hands += 1;
    if enc.split_used {
        enc.split_hands_resolved += 1;
    }

    enc.result_text = result_line(enc, outcome, outgoing, incoming);
    enc.result_tone = outcome.tone();
    run.push_log(enc.result_text.clone());

    if debug_log_enabled() {
        println!(
            "Hand {}: {} | out {} in {} crit {} | enemy {}/{} player {}/{}",
            enc.hand_index,
            outcome,
            outgoing,
            incoming,
            crit,
            enc.enemy.hp,
            enc.enemy.max_hp,
            run.player.hp,
            run.player.effective_max_hp()
        );
    }

    let signal = if run.player.hp <= 0 {
        enc.phase = Phase::Done;
        FinalizeSignal::PlayerDefeated
    } else if enc.enemy.hp <= 0 {
        enc.phase = Phase::Done;
        FinalizeSignal::EnemyDefeated
    } else {
        enc.phase = Phase::Resolve;
        enc.resolve_timer = RESOLVE_DELAY_SECS;
        enc.next_deal_prompted = false;
        FinalizeSignal::NextDeal
    };

    HandResolution {
        outcome,
        outgoing,
        incoming,
        crit,
        healed,
        chips,
        signal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, Rank, Suit};
    use crate::encounter::create_encounter;

    fn battle() -> (Run, Encounter) {
        let mut run = Run::default().with_seed(11);
        let enc = create_encounter(&mut run, None);
        (run, enc)
    }

    fn set_hands(enc: &mut Encounter, player: &[Rank], dealer: &[Rank]) {
        enc.player_hand.clear();
        enc.dealer_hand.clear();
        for &rank in player {
            enc.player_hand.push(Card::new(rank, Suit::Clubs));
        }
        for &rank in dealer {
            enc.dealer_hand.push(Card::new(rank, Suit::Hearts));
        }
    }

    #[test]
    fn blackjack_base_damage_is_twelve() {
        let (mut run, mut enc) = battle();
        set_hands(&mut enc, &[Rank::Ace, Rank::King], &[Rank::Ten, Rank::Ten]);
        let enemy_hp = enc.enemy.hp;

        let res = apply_showdown(&mut run, &mut enc, Outcome::Blackjack);
        assert_eq!(res.outgoing, 12);
        assert_eq!(res.incoming, 0);
        assert_eq!(enc.enemy.hp, enemy_hp - 12);
        assert_eq!(run.blackjacks, 1);
        assert!(enc.result_text.contains("Blackjack"));
        assert_eq!(run.player.streak, 1);
    }

    #[test]
    fn losses_zero_outgoing_and_floor_incoming_at_one() {
        let (mut run, mut enc) = battle();
        run.player.stats.block = 19;
        set_hands(&mut enc, &[Rank::Ten, Rank::King, Rank::Five], &[Rank::Ten, Rank::Nine]);
        let enemy_hp = enc.enemy.hp;

        let res = apply_showdown(&mut run, &mut enc, Outcome::PlayerBust);
        assert_eq!(res.outgoing, 0);
        assert_eq!(res.incoming, 1);
        assert_eq!(enc.enemy.hp, enemy_hp);
        assert_eq!(run.player.streak, 0);
    }

    #[test]
    fn streak_bonus_is_capped() {
        let (mut run, mut enc) = battle();
        run.player.stats.streak_bonus = 1;
        run.player.streak = 9;
        set_hands(&mut enc, &[Rank::Ten, Rank::Nine], &[Rank::Ten, Rank::Eight]);
        let res = apply_showdown(&mut run, &mut enc, Outcome::PlayerWin);
        // 8 base + capped streak bonus of 4, no crit possible at 0%.
        assert_eq!(res.outgoing, 8 + 4);
    }

    #[test]
    fn crit_doubles_after_additives() {
        // The roll is seed dependent, so probe seeds until one crits.
        // At the 0.6 cap this terminates almost immediately.
        let mut saw_crit = false;
        for seed in 0..64u64 {
            let mut run = Run::default().with_seed(seed);
            run.player.stats.crit_chance = 0.6;
            run.player.stats.flat_damage = 3;
            let mut enc = create_encounter(&mut run, None);
            set_hands(&mut enc, &[Rank::Ten, Rank::Nine], &[Rank::Ten, Rank::Eight]);
            let res = apply_showdown(&mut run, &mut enc, Outcome::PlayerWin);
            if res.crit {
                assert_eq!(res.outgoing, (8 + 3) * 2);
                assert!(enc.crit_triggered);
                saw_crit = true;
                break;
            }
        }
        assert!(saw_crit, "no crit observed across seeds");
    }

    #[test]
    fn push_grants_push_chips_and_counter() {
        let (mut run, mut enc) = battle();
        run.player.stats.chips_on_push = 4;
        let gold = run.player.gold;
        set_hands(&mut enc, &[Rank::Ten, Rank::Nine], &[Rank::Ten, Rank::Nine]);
        let res = apply_showdown(&mut run, &mut enc, Outcome::Push);
        assert_eq!(run.pushes, 1);
        assert_eq!(res.chips, 4);
        assert_eq!(run.player.gold, gold + 4);
        assert_eq!(res.outgoing, 0);
        assert_eq!(res.incoming, 0);
    }

    #[test]
    fn win_heals_respect_max_hp() {
        let (mut run, mut enc) = battle();
        run.player.stats.heal_on_win_hand = 5;
        run.player.hp = run.player.effective_max_hp() - 2;
        set_hands(&mut enc, &[Rank::Ten, Rank::Nine], &[Rank::Ten, Rank::Eight]);
        let res = apply_showdown(&mut run, &mut enc, Outcome::PlayerWin);
        assert_eq!(res.healed, 2);
        assert_eq!(run.player.hp, run.player.effective_max_hp());
    }

    #[test]
    fn defeat_signals_fire_before_phase_advances() {
        let (mut run, mut enc) = battle();
        enc.enemy.hp = 5;
        set_hands(&mut enc, &[Rank::Ten, Rank::Nine], &[Rank::Ten, Rank::Eight]);
        let res = apply_showdown(&mut run, &mut enc, Outcome::PlayerWin);
        assert_eq!(res.signal, FinalizeSignal::EnemyDefeated);
        assert_eq!(enc.phase, Phase::Done);

        let (mut run2, mut enc2) = battle();
        run2.player.hp = 1;
        set_hands(&mut enc2, &[Rank::Ten, Rank::King, Rank::Five], &[Rank::Ten, Rank::Nine]);
        let res2 = apply_showdown(&mut run2, &mut enc2, Outcome::PlayerBust);
        assert_eq!(res2.signal, FinalizeSignal::PlayerDefeated);
    }

    #[test]
    fn survivable_hand_enters_resolve_with_timer() {
        let (mut run, mut enc) = battle();
        set_hands(&mut enc, &[Rank::Ten, Rank::Nine], &[Rank::Ten, Rank::Eight]);
        let res = apply_showdown(&mut run, &mut enc, Outcome::PlayerWin);
        assert_eq!(res.signal, FinalizeSignal::NextDeal);
        assert_eq!(enc.phase, Phase::Resolve);
        assert!(enc.resolve_timer > 0.0);
        assert_eq!(run.total_hands, 1);
    }
}
