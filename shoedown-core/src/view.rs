//! Read-only projections of the session for the presentation layer.
//!
//! The view is rebuilt from scratch on request; it owns its data so the
//! renderer can hold it across frames without borrowing the session.
//! The dealer's hole card is masked while the player is still acting.

use crate::cards::{Card, can_double_down, can_split_hand, hand_total};
use crate::encounter::{Encounter, Phase};
use crate::session::GameSession;
use crate::showdown::ResultTone;
use crate::state::Mode;

/// An input the player may legally issue right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Hit,
    Stand,
    Double,
    Split,
    Deal,
    ConfirmIntro,
    Claim,
    Buy,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandView {
    /// Cards face up for the viewer.
    pub cards: Vec<Card>,
    /// Total of the visible cards only.
    pub total: i32,
    /// True when one dealer card is still face down.
    pub hole_hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyView {
    pub name: String,
    pub kind: String,
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub avatar: String,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub mode: Mode,
    pub floor: u32,
    pub room: u32,
    pub rooms_per_floor: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub gold: i32,
    pub streak: i32,
    pub bust_guards_left: i32,
    pub enemy: Option<EnemyView>,
    pub player_hand: Option<HandView>,
    pub dealer_hand: Option<HandView>,
    pub phase: Option<Phase>,
    pub result_text: String,
    pub result_tone: ResultTone,
    /// `(resolved, total)` once a split is in play.
    pub split_progress: Option<(u32, u32)>,
    pub intro_active: bool,
    pub intro_text: String,
    pub intro_ready: bool,
    pub deal_ready: bool,
    pub legal_actions: Vec<ActionKind>,
    pub announcement: String,
    pub log_lines: Vec<String>,
    pub reward_option_ids: Vec<String>,
    pub shop_stock_len: usize,
    pub selection_index: usize,
}

fn player_hand_view(enc: &Encounter) -> HandView {
    HandView {
        cards: enc.player_hand.to_vec(),
        total: enc.player_total(),
        hole_hidden: false,
    }
}

fn dealer_hand_view(enc: &Encounter) -> HandView {
    let masked = enc.phase == Phase::Player && !enc.dealer_hand.is_empty();
    if masked {
        let up_cards: Vec<Card> = enc.dealer_hand.iter().skip(1).copied().collect();
        HandView {
            total: hand_total(&up_cards),
            cards: up_cards,
            hole_hidden: true,
        }
    } else {
        HandView {
            cards: enc.dealer_hand.to_vec(),
            total: enc.dealer_total(),
            hole_hidden: false,
        }
    }
}

fn legal_actions(session: &GameSession) -> Vec<ActionKind> {
    let mut actions = Vec::new();
    match session.mode {
        Mode::Playing => {
            let Some(enc) = &session.encounter else {
                return actions;
            };
            if session.is_transition_pending() {
                return actions;
            }
            if enc.intro.active {
                actions.push(ActionKind::ConfirmIntro);
                return actions;
            }
            match enc.phase {
                Phase::Player => {
                    actions.push(ActionKind::Hit);
                    actions.push(ActionKind::Stand);
                    if can_double_down(&enc.player_hand, enc.doubled, enc.is_split_hand) {
                        actions.push(ActionKind::Double);
                    }
                    if can_split_hand(&enc.player_hand, enc.doubled, enc.split_hands_total) {
                        actions.push(ActionKind::Split);
                    }
                }
                Phase::Resolve if enc.resolve_timer <= 0.0 => {
                    actions.push(ActionKind::Deal);
                }
                _ => {}
            }
        }
        Mode::Reward => {
            actions.push(ActionKind::Claim);
            actions.push(ActionKind::Buy);
            actions.push(ActionKind::Continue);
        }
        Mode::Shop => {
            actions.push(ActionKind::Buy);
            actions.push(ActionKind::Continue);
        }
        Mode::GameOver | Mode::Victory => {}
    }
    actions
}

impl GameSession {
    /// Project the current state into an owned, render-ready view.
    #[must_use]
    pub fn view(&self) -> SessionView {
        let enc = self.encounter.as_ref();
        SessionView {
            mode: self.mode,
            floor: self.run.floor,
            room: self.run.room,
            rooms_per_floor: self.run.rooms_per_floor,
            hp: self.run.player.hp,
            max_hp: self.run.player.effective_max_hp(),
            gold: self.run.player.gold,
            streak: self.run.player.streak,
            bust_guards_left: self.run.player.bust_guards_left,
            enemy: enc.map(|e| EnemyView {
                name: e.enemy.name.clone(),
                kind: e.enemy.kind.as_str().to_string(),
                hp: e.enemy.hp,
                max_hp: e.enemy.max_hp,
                attack: e.enemy.attack,
                avatar: e.enemy.avatar.clone(),
            }),
            player_hand: enc.map(player_hand_view),
            dealer_hand: enc.map(dealer_hand_view),
            phase: enc.map(|e| e.phase),
            result_text: enc.map(|e| e.result_text.clone()).unwrap_or_default(),
            result_tone: enc.map(|e| e.result_tone).unwrap_or_default(),
            split_progress: enc.filter(|e| e.split_used).map(|e| {
                (e.split_hands_resolved, e.split_hands_total)
            }),
            intro_active: enc.is_some_and(|e| e.intro.active),
            intro_text: enc
                .filter(|e| e.intro.active)
                .map(|e| e.intro.visible_text())
                .unwrap_or_default(),
            intro_ready: enc.is_some_and(|e| e.intro.active && e.intro.fully_revealed()),
            deal_ready: enc.is_some_and(|e| {
                e.phase == Phase::Resolve && e.resolve_timer <= 0.0
            }) && !self.is_transition_pending(),
            legal_actions: legal_actions(self),
            announcement: self.announcement.clone(),
            log_lines: self.run.log.iter().map(|line| line.text.clone()).collect(),
            reward_option_ids: self.reward_option_ids.clone(),
            shop_stock_len: self.shop_stock.len(),
            selection_index: self.selection_index,
        }
    }
}
