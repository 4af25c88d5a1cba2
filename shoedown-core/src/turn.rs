//! Player actions and the dealer's scripted reply. Every verb here is
//! a guarded transition on the encounter phase machine; the showdown
//! math itself lives in [`crate::resolve`].

use thiserror::Error;

use crate::cards::{Hand, can_double_down, can_split_hand, hand_total, is_blackjack};
use crate::constants::DEALER_STAND_TOTAL;
use crate::encounter::{Encounter, Phase, PlayerAction};
use crate::resolve::{HandResolution, apply_showdown};
use crate::showdown::resolve_showdown_outcome;
use crate::state::Run;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("player input is not accepted right now")]
    NotPlayerTurn,
    #[error("double down is not available for this hand")]
    DoubleUnavailable,
    #[error("split is not available for this hand")]
    SplitUnavailable,
    #[error("the previous hand is still resolving")]
    ResolvePending,
}

/// True while the player may hit, stand, double, or split.
#[must_use]
pub fn can_player_act(enc: &Encounter) -> bool {
    enc.phase == Phase::Player && !enc.intro.active
}

/// Deal a fresh hand to both sides, clearing all split state. Returns
/// a resolution immediately when either side is dealt a natural.
pub fn start_hand(run: &mut Run, enc: &mut Encounter) -> Option<HandResolution> {
    let mut old = std::mem::take(&mut enc.player_hand);
    enc.shoe.muck(&mut old);
    let mut old = std::mem::take(&mut enc.dealer_hand);
    enc.shoe.muck(&mut old);
    let mut leftovers: Hand = enc.split_queue.drain(..).collect();
    enc.shoe.muck(&mut leftovers);
    enc.split_used = false;
    enc.is_split_hand = false;
    enc.split_hands_total = 1;
    enc.split_hands_resolved = 0;
    enc.dealer_resolved = false;
    reset_hand_flags(enc);

    for _ in 0..2 {
        let card = enc.shoe.draw(run.rng_mut());
        enc.player_hand.push(card);
        let card = enc.shoe.draw(run.rng_mut());
        enc.dealer_hand.push(card);
    }
    enc.phase = Phase::Player;

    if is_blackjack(&enc.player_hand) || is_blackjack(&enc.dealer_hand) {
        return Some(resolve_dealer_then_showdown(run, enc, true));
    }
    None
}

fn reset_hand_flags(enc: &mut Encounter) {
    enc.doubled = false;
    enc.bust_guard_triggered = false;
    enc.crit_triggered = false;
    enc.last_player_action = PlayerAction::None;
    enc.result_text.clear();
    enc.result_tone = Default::default();
    enc.resolve_timer = 0.0;
    enc.next_deal_prompted = false;
}

/// Draw one card. A bust consumes a guard when one is left, pinning
/// the hand at 21; otherwise the hand resolves as a player bust.
pub fn hit(run: &mut Run, enc: &mut Encounter) -> Result<Option<HandResolution>, ActionError> {
    if !can_player_act(enc) {
        return Err(ActionError::NotPlayerTurn);
    }
    enc.last_player_action = PlayerAction::Hit;
    let card = enc.shoe.draw(run.rng_mut());
    enc.player_hand.push(card);
    after_player_draw(run, enc)
}

pub fn stand(run: &mut Run, enc: &mut Encounter) -> Result<Option<HandResolution>, ActionError> {
    if !can_player_act(enc) {
        return Err(ActionError::NotPlayerTurn);
    }
    enc.last_player_action = PlayerAction::Stand;
    Ok(Some(resolve_dealer_then_showdown(run, enc, false)))
}

/// One card, then an immediate stand.
pub fn double_down(
    run: &mut Run,
    enc: &mut Encounter,
) -> Result<Option<HandResolution>, ActionError> {
    if !can_player_act(enc) {
        return Err(ActionError::NotPlayerTurn);
    }
    if !can_double_down(&enc.player_hand, enc.doubled, enc.is_split_hand) {
        return Err(ActionError::DoubleUnavailable);
    }
    enc.last_player_action = PlayerAction::Double;
    enc.doubled = true;
    let card = enc.shoe.draw(run.rng_mut());
    enc.player_hand.push(card);
    maybe_guard_bust(run, enc);
    Ok(Some(resolve_dealer_then_showdown(run, enc, false)))
}

/// Break a pair into two hands. The second card waits in the split
/// queue; the current hand redraws its companion and play continues.
pub fn split(run: &mut Run, enc: &mut Encounter) -> Result<Option<HandResolution>, ActionError> {
    if !can_player_act(enc) {
        return Err(ActionError::NotPlayerTurn);
    }
    if !can_split_hand(&enc.player_hand, enc.doubled, enc.split_hands_total) {
        return Err(ActionError::SplitUnavailable);
    }
    let second = enc.player_hand.pop().ok_or(ActionError::SplitUnavailable)?;
    enc.split_queue.push_back(second);
    enc.split_used = true;
    enc.is_split_hand = true;
    enc.split_hands_total += 1;
    run.splits_used += 1;
    enc.last_player_action = PlayerAction::Split;
    let card = enc.shoe.draw(run.rng_mut());
    enc.player_hand.push(card);
    run.push_log("Pair split into two hands.".to_string());
    after_player_draw(run, enc)
}

/// Shared post-draw check for hit and split redraws.
fn after_player_draw(
    run: &mut Run,
    enc: &mut Encounter,
) -> Result<Option<HandResolution>, ActionError> {
    maybe_guard_bust(run, enc);
    if hand_total(&enc.player_hand) > 21 || enc.player_total() == 21 {
        return Ok(Some(resolve_dealer_then_showdown(run, enc, false)));
    }
    Ok(None)
}

/// Consume a bust guard when the raw total just went over 21. The
/// guarded hand reads as exactly 21 for the rest of the showdown.
fn maybe_guard_bust(run: &mut Run, enc: &mut Encounter) {
    if hand_total(&enc.player_hand) <= 21 || enc.bust_guard_triggered {
        return;
    }
    if run.player.bust_guards_left > 0 {
        run.player.bust_guards_left -= 1;
        enc.bust_guard_triggered = true;
        run.push_log("Bust guard holds the hand at 21.".to_string());
    }
}

/// Play out the dealer and classify the showdown. The dealer stays put
/// when the player busted outright, when either side holds a natural,
/// or when a split already resolved the dealer's hand.
pub fn resolve_dealer_then_showdown(
    run: &mut Run,
    enc: &mut Encounter,
    natural_check: bool,
) -> HandResolution {
    enc.phase = Phase::Dealer;
    let dealer_natural = is_blackjack(&enc.dealer_hand);
    let player_natural = natural_check && !enc.is_split_hand && is_blackjack(&enc.player_hand);
    let player_busted = hand_total(&enc.player_hand) > 21 && !enc.bust_guard_triggered;

    let dealer_locked = enc.split_used && enc.dealer_resolved;
    if !dealer_locked && !player_busted && !player_natural && !dealer_natural {
        while enc.dealer_total() < DEALER_STAND_TOTAL {
            let card = enc.shoe.draw(run.rng_mut());
            enc.dealer_hand.push(card);
        }
        if enc.split_used {
            enc.dealer_resolved = true;
        }
    }

    let outcome = resolve_showdown_outcome(
        enc.player_total(),
        enc.dealer_total(),
        player_natural,
        dealer_natural,
    );
    apply_showdown(run, enc, outcome)
}

/// Move past a resolved hand once the pacing delay has elapsed. Pops
/// the next split hand when one is queued, otherwise deals fresh.
pub fn advance_to_next_deal(
    run: &mut Run,
    enc: &mut Encounter,
) -> Result<Option<HandResolution>, ActionError> {
    if enc.phase != Phase::Resolve || enc.resolve_timer > 0.0 {
        return Err(ActionError::ResolvePending);
    }
    enc.hand_index += 1;

    if let Some(seed_card) = enc.split_queue.pop_front() {
        let mut old = std::mem::take(&mut enc.player_hand);
        enc.shoe.muck(&mut old);
        reset_hand_flags(enc);
        enc.is_split_hand = true;
        enc.player_hand.push(seed_card);
        let card = enc.shoe.draw(run.rng_mut());
        enc.player_hand.push(card);
        enc.phase = Phase::Player;
        if hand_total(&enc.player_hand) == 21 {
            return Ok(Some(resolve_dealer_then_showdown(run, enc, false)));
        }
        return Ok(None);
    }

    Ok(start_hand(run, enc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, Rank, Suit};
    use crate::encounter::create_encounter;
    use crate::resolve::FinalizeSignal;
    use crate::showdown::Outcome;

    fn battle(seed: u64) -> (Run, Encounter) {
        let mut run = Run::default().with_seed(seed);
        let mut enc = create_encounter(&mut run, None);
        enc.intro.finish();
        enc.enemy.hp = 500;
        enc.enemy.max_hp = 500;
        (run, enc)
    }

    /// Arrange the top of the shoe so draws come out in `ranks` order.
    fn stack(enc: &mut Encounter, ranks: &[Rank]) {
        for &rank in ranks.iter().rev() {
            enc.shoe.cards.push(Card::new(rank, Suit::Clubs));
        }
    }

    #[test]
    fn start_hand_deals_two_each() {
        let (mut run, mut enc) = battle(1);
        stack(
            &mut enc,
            &[Rank::Five, Rank::Nine, Rank::Seven, Rank::Eight],
        );
        let res = start_hand(&mut run, &mut enc);
        assert!(res.is_none());
        assert_eq!(enc.player_hand.len(), 2);
        assert_eq!(enc.dealer_hand.len(), 2);
        assert_eq!(enc.player_total(), 12);
        assert_eq!(enc.phase, Phase::Player);
    }

    #[test]
    fn natural_deal_resolves_immediately() {
        let (mut run, mut enc) = battle(2);
        stack(&mut enc, &[Rank::Ace, Rank::Nine, Rank::King, Rank::Eight]);
        let res = start_hand(&mut run, &mut enc).expect("natural should resolve");
        assert_eq!(res.outcome, Outcome::Blackjack);
        assert_eq!(res.outgoing, 12);
        assert!(enc.result_text.contains("Blackjack"));
    }

    #[test]
    fn hit_past_21_consumes_guard_and_pins_total() {
        let (mut run, mut enc) = battle(3);
        run.player.bust_guards_left = 1;
        stack(
            &mut enc,
            &[Rank::Ten, Rank::Nine, Rank::Nine, Rank::Eight, Rank::Five],
        );
        assert!(start_hand(&mut run, &mut enc).is_none());
        let res = hit(&mut run, &mut enc).unwrap().expect("guarded 21 resolves");
        assert!(enc.bust_guard_triggered);
        assert_eq!(run.player.bust_guards_left, 0);
        assert_eq!(enc.player_total(), 21);
        assert_ne!(res.outcome, Outcome::PlayerBust);
    }

    #[test]
    fn hit_past_21_without_guard_busts() {
        let (mut run, mut enc) = battle(4);
        run.player.bust_guards_left = 0;
        stack(
            &mut enc,
            &[Rank::Ten, Rank::Nine, Rank::Nine, Rank::Eight, Rank::Five],
        );
        assert!(start_hand(&mut run, &mut enc).is_none());
        let dealer_cards = enc.dealer_hand.len();
        let res = hit(&mut run, &mut enc).unwrap().expect("bust resolves");
        assert_eq!(res.outcome, Outcome::PlayerBust);
        // Dealer never plays out a hand the player already lost.
        assert_eq!(enc.dealer_hand.len(), dealer_cards);
    }

    #[test]
    fn stand_plays_dealer_to_seventeen() {
        let (mut run, mut enc) = battle(5);
        stack(&mut enc, &[Rank::Ten, Rank::Two, Rank::Nine, Rank::Three]);
        assert!(start_hand(&mut run, &mut enc).is_none());
        stand(&mut run, &mut enc).unwrap().expect("stand resolves");
        assert!(enc.dealer_total() >= DEALER_STAND_TOTAL || enc.dealer_total() > 21);
        assert!(enc.dealer_hand.len() > 2);
    }

    #[test]
    fn double_is_single_card_then_stand() {
        let (mut run, mut enc) = battle(6);
        stack(
            &mut enc,
            &[Rank::Five, Rank::Ten, Rank::Six, Rank::Seven, Rank::Nine],
        );
        assert!(start_hand(&mut run, &mut enc).is_none());
        let res = double_down(&mut run, &mut enc).unwrap();
        assert!(res.is_some());
        assert!(enc.doubled);
        assert_eq!(enc.player_hand.len(), 3);
        // A second double on the same hand is rejected up front.
        assert_eq!(
            double_down(&mut run, &mut enc).unwrap_err(),
            ActionError::NotPlayerTurn
        );
    }

    #[test]
    fn double_rejected_after_a_hit() {
        let (mut run, mut enc) = battle(7);
        stack(
            &mut enc,
            &[Rank::Two, Rank::Ten, Rank::Three, Rank::Seven, Rank::Two],
        );
        assert!(start_hand(&mut run, &mut enc).is_none());
        assert!(hit(&mut run, &mut enc).unwrap().is_none());
        assert_eq!(
            double_down(&mut run, &mut enc).unwrap_err(),
            ActionError::DoubleUnavailable
        );
    }

    #[test]
    fn split_queues_second_card_and_replays_both() {
        let (mut run, mut enc) = battle(8);
        stack(
            &mut enc,
            &[
                Rank::Eight,
                Rank::Ten,
                Rank::Eight,
                Rank::Seven,
                // Redraw for the first split hand, then its stand.
                Rank::Five,
            ],
        );
        assert!(start_hand(&mut run, &mut enc).is_none());
        assert!(split(&mut run, &mut enc).unwrap().is_none());
        assert!(enc.split_used);
        assert_eq!(enc.split_queue.len(), 1);
        assert_eq!(enc.split_hands_total, 2);
        assert_eq!(run.splits_used, 1);
        assert_eq!(enc.player_hand[0].rank, Rank::Eight);

        stand(&mut run, &mut enc).unwrap().expect("first hand resolves");
        assert!(enc.dealer_resolved);
        let dealer_total = enc.dealer_total();

        enc.resolve_timer = 0.0;
        let second = advance_to_next_deal(&mut run, &mut enc).unwrap();
        assert!(second.is_none());
        assert!(enc.is_split_hand);
        assert_eq!(enc.player_hand[0].rank, Rank::Eight);

        stand(&mut run, &mut enc).unwrap().expect("second hand resolves");
        // The dealer's hand is frozen across split hands.
        assert_eq!(enc.dealer_total(), dealer_total);
        assert_eq!(enc.split_hands_resolved, 2);
    }

    #[test]
    fn split_rejected_on_mismatched_pair() {
        let (mut run, mut enc) = battle(9);
        stack(&mut enc, &[Rank::Eight, Rank::Ten, Rank::Nine, Rank::Seven]);
        assert!(start_hand(&mut run, &mut enc).is_none());
        assert_eq!(
            split(&mut run, &mut enc).unwrap_err(),
            ActionError::SplitUnavailable
        );
    }

    #[test]
    fn advance_waits_for_the_resolve_timer() {
        let (mut run, mut enc) = battle(10);
        stack(&mut enc, &[Rank::Ten, Rank::Two, Rank::Nine, Rank::Three]);
        assert!(start_hand(&mut run, &mut enc).is_none());
        let res = stand(&mut run, &mut enc).unwrap().unwrap();
        if res.signal == FinalizeSignal::NextDeal {
            assert_eq!(
                advance_to_next_deal(&mut run, &mut enc).unwrap_err(),
                ActionError::ResolvePending
            );
            enc.resolve_timer = 0.0;
            stack(&mut enc, &[Rank::Four, Rank::Ten, Rank::Five, Rank::Nine]);
            advance_to_next_deal(&mut run, &mut enc).unwrap();
            assert_eq!(enc.hand_index, 1);
            assert_eq!(enc.phase, Phase::Player);
        }
    }

    #[test]
    fn actions_rejected_while_intro_is_running() {
        let mut run = Run::default().with_seed(11);
        let mut enc = create_encounter(&mut run, None);
        assert!(enc.intro.active);
        assert_eq!(hit(&mut run, &mut enc).unwrap_err(), ActionError::NotPlayerTurn);
    }
}
