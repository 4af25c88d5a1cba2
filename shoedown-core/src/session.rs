//! The owning game session: one run, at most one live encounter, and
//! the camp/meta screens around them. All mutation funnels through the
//! action methods here plus the per-frame [`GameSession::update`]; the
//! presentation layer reads views and drains cues, nothing more.

use crate::camp::{self, CampError, ShopItem};
use crate::constants::{
    ANNOUNCEMENT_SECS, BOSS_CLEAR_HEAL, PENDING_TRANSITION_SECS, SNAPSHOT_VERSION, STREAK_CHIP_CAP,
};
use crate::encounter::{Encounter, Phase, create_encounter};
use crate::numbers::round_f64_to_i32;
use crate::profile::{Profile, RunResult};
use crate::progression::{CampKind, EnemyKind, camp_kind_for_room};
use crate::resolve::{FinalizeSignal, HandResolution};
use crate::save::SavedSnapshot;
use crate::showdown::Outcome;
use crate::state::{Mode, Run};
use crate::turn::{self, ActionError};

/// Fire-and-forget presentation hooks, drained by the host each frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    Outcome(Outcome),
    DamageDealt(i32),
    DamageTaken(i32),
    Crit,
    BustGuardUsed,
    Healed(i32),
    ChipsGained(i32),
    RelicGained(String),
    EnemyDefeated,
    PlayerDefeated,
    FloorAdvanced(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionKind {
    EnemyDefeated,
    PlayerDefeated,
}

/// Countdown between a hand's numeric resolution and the state change
/// it triggers, so the host can play the beat out.
#[derive(Debug, Clone, Copy)]
struct PendingTransition {
    kind: TransitionKind,
    timer: f32,
}

pub struct GameSession {
    pub mode: Mode,
    pub run: Run,
    pub encounter: Option<Encounter>,
    pub reward_option_ids: Vec<String>,
    pub shop_stock: Vec<ShopItem>,
    pub selection_index: usize,
    pub announcement: String,
    pub announcement_timer: f32,
    pub profile: Profile,
    pending: Option<PendingTransition>,
    cues: Vec<Cue>,
    result_recorded: bool,
    last_intro_line: Option<String>,
}

impl GameSession {
    /// Start a fresh run from a seed and the player's meta profile.
    #[must_use]
    pub fn new(seed: u64, profile: Profile) -> Self {
        let mut run = Run::default().with_seed(seed);
        let encounter = create_encounter(&mut run, None);
        let mut session = Self {
            mode: Mode::Playing,
            run,
            encounter: Some(encounter),
            reward_option_ids: Vec::new(),
            shop_stock: Vec::new(),
            selection_index: 0,
            announcement: String::new(),
            announcement_timer: 0.0,
            profile,
            pending: None,
            cues: Vec::new(),
            result_recorded: false,
            last_intro_line: None,
        };
        session.announce(format!("Floor {} - Room {}", session.run.floor, session.run.room));
        session
    }

    /// Resume from a sanitized snapshot. A playing snapshot that lost
    /// its encounter gets a fresh one rather than a stuck screen, and a
    /// snapshot taken mid defeat beat gets its transition re-armed so
    /// the tick loop can finish what the hand started.
    #[must_use]
    pub fn from_snapshot(snapshot: SavedSnapshot, profile: Profile) -> Self {
        let mut run = snapshot.run;
        let mut encounter = snapshot.encounter;
        if snapshot.mode == Mode::Playing && encounter.is_none() {
            encounter = Some(create_encounter(&mut run, None));
        }
        let mut pending = None;
        if snapshot.mode == Mode::Playing {
            if let Some(enc) = &mut encounter {
                if enc.phase == Phase::Done {
                    if run.player.hp <= 0 {
                        pending = Some(PendingTransition {
                            kind: TransitionKind::PlayerDefeated,
                            timer: PENDING_TRANSITION_SECS,
                        });
                    } else if enc.enemy.hp <= 0 {
                        pending = Some(PendingTransition {
                            kind: TransitionKind::EnemyDefeated,
                            timer: PENDING_TRANSITION_SECS,
                        });
                    } else {
                        // A done hand with both sides alive has no
                        // transition to wait on; reopen the deal.
                        enc.phase = Phase::Resolve;
                        enc.resolve_timer = 0.0;
                    }
                }
            }
        }
        Self {
            mode: snapshot.mode,
            run,
            encounter,
            reward_option_ids: snapshot.reward_option_ids,
            shop_stock: snapshot.shop_stock,
            selection_index: snapshot.selection_index,
            announcement: snapshot.announcement,
            announcement_timer: snapshot.announcement_timer,
            profile,
            pending,
            cues: Vec::new(),
            result_recorded: matches!(snapshot.mode, Mode::GameOver | Mode::Victory),
            last_intro_line: None,
        }
    }

    /// Snapshot the live state for persistence. The wall clock comes
    /// from the host; the core never reads time itself.
    #[must_use]
    pub fn to_snapshot(&self, saved_at: i64) -> SavedSnapshot {
        SavedSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at,
            mode: self.mode,
            run: self.run.clone(),
            encounter: self.encounter.clone(),
            reward_option_ids: self.reward_option_ids.clone(),
            shop_stock: self.shop_stock.clone(),
            selection_index: self.selection_index,
            announcement: self.announcement.clone(),
            announcement_timer: self.announcement_timer,
        }
    }

    /// Take the cues queued since the last drain.
    pub fn drain_cues(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }

    /// True while a defeat beat is playing out and input is ignored.
    #[must_use]
    pub fn is_transition_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Advance every countdown one frame. This is the only place time
    /// passes; nothing here blocks or suspends.
    pub fn update(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.run.tick_logs(dt);
        if self.announcement_timer > 0.0 {
            self.announcement_timer = (self.announcement_timer - dt).max(0.0);
            if self.announcement_timer <= 0.0 {
                self.announcement.clear();
            }
        }
        if let Some(enc) = &mut self.encounter {
            if enc.intro.active {
                enc.intro.tick(dt);
            }
            if enc.phase == Phase::Resolve && enc.resolve_timer > 0.0 {
                enc.resolve_timer = (enc.resolve_timer - dt).max(0.0);
            }
        }
        if let Some(pending) = &mut self.pending {
            pending.timer -= dt;
            if pending.timer <= 0.0 {
                let kind = pending.kind;
                self.pending = None;
                self.apply_transition(kind);
            }
        }
    }

    fn announce(&mut self, text: String) {
        self.announcement = text;
        self.announcement_timer = ANNOUNCEMENT_SECS;
    }

    fn act_guard(&mut self) -> Result<(&mut Run, &mut Encounter), ActionError> {
        if self.mode != Mode::Playing || self.pending.is_some() {
            return Err(ActionError::NotPlayerTurn);
        }
        let enc = self.encounter.as_mut().ok_or(ActionError::NotPlayerTurn)?;
        Ok((&mut self.run, enc))
    }

    pub fn hit(&mut self) -> Result<(), ActionError> {
        let (run, enc) = self.act_guard()?;
        let res = turn::hit(run, enc)?;
        self.absorb(res);
        Ok(())
    }

    pub fn stand(&mut self) -> Result<(), ActionError> {
        let (run, enc) = self.act_guard()?;
        let res = turn::stand(run, enc)?;
        self.absorb(res);
        Ok(())
    }

    pub fn double_down(&mut self) -> Result<(), ActionError> {
        let (run, enc) = self.act_guard()?;
        let res = turn::double_down(run, enc)?;
        self.absorb(res);
        Ok(())
    }

    pub fn split(&mut self) -> Result<(), ActionError> {
        let (run, enc) = self.act_guard()?;
        let res = turn::split(run, enc)?;
        self.absorb(res);
        Ok(())
    }

    /// Advance to the next hand once the resolve delay has elapsed.
    pub fn deal(&mut self) -> Result<(), ActionError> {
        let (run, enc) = self.act_guard()?;
        let res = turn::advance_to_next_deal(run, enc)?;
        self.absorb(res);
        Ok(())
    }

    /// First press reveals the whole intro line; second press starts
    /// the opening hand.
    pub fn confirm_intro(&mut self) -> Result<(), ActionError> {
        let (run, enc) = self.act_guard()?;
        if !enc.intro.active {
            return Err(ActionError::NotPlayerTurn);
        }
        if enc.intro.fully_revealed() {
            enc.intro.finish();
            let res = turn::start_hand(run, enc);
            self.absorb(res);
        } else {
            enc.intro.reveal_all();
        }
        Ok(())
    }

    /// Claim the drafted relic and move on to the shop.
    pub fn claim(&mut self, relic_id: &str) -> Result<(), CampError> {
        if self.mode != Mode::Reward {
            return Err(CampError::NotOnOffer);
        }
        camp::claim_reward(&mut self.run, &self.reward_option_ids, relic_id)?;
        self.profile.note_relic(relic_id);
        self.cues.push(Cue::RelicGained(relic_id.to_string()));
        self.reward_option_ids.clear();
        self.selection_index = 0;
        self.mode = Mode::Shop;
        Ok(())
    }

    pub fn buy(&mut self, index: usize) -> Result<(), CampError> {
        if !matches!(self.mode, Mode::Shop | Mode::Reward) {
            return Err(CampError::NoSuchItem);
        }
        camp::buy(&mut self.run, &self.shop_stock, index)
    }

    /// Leave the camp and head into the next room.
    pub fn continue_run(&mut self) -> Result<(), ActionError> {
        if !matches!(self.mode, Mode::Shop | Mode::Reward) {
            return Err(ActionError::NotPlayerTurn);
        }
        self.reward_option_ids.clear();
        self.shop_stock.clear();
        self.selection_index = 0;
        self.mode = Mode::Playing;
        let encounter = create_encounter(&mut self.run, self.last_intro_line.as_deref());
        self.last_intro_line = Some(encounter.intro.text.clone());
        self.encounter = Some(encounter);
        self.announce(format!("Floor {} - Room {}", self.run.floor, self.run.room));
        Ok(())
    }

    /// Record the finished run into the meta profile, once. The ending
    /// timestamp comes from the host clock.
    pub fn record_result(&mut self, ended_at: i64) {
        if self.result_recorded {
            return;
        }
        let result = match self.mode {
            Mode::Victory => RunResult::Victory,
            Mode::GameOver => RunResult::Defeat,
            _ => return,
        };
        self.profile.record_run(&self.run, result, ended_at);
        self.result_recorded = true;
    }

    fn absorb(&mut self, res: Option<HandResolution>) {
        let Some(res) = res else { return };
        self.cues.push(Cue::Outcome(res.outcome));
        if let Some(enc) = &self.encounter {
            if enc.bust_guard_triggered {
                self.cues.push(Cue::BustGuardUsed);
            }
        }
        if res.crit {
            self.cues.push(Cue::Crit);
        }
        if res.outgoing > 0 {
            self.cues.push(Cue::DamageDealt(res.outgoing));
        }
        if res.incoming > 0 {
            self.cues.push(Cue::DamageTaken(res.incoming));
        }
        if res.healed > 0 {
            self.cues.push(Cue::Healed(res.healed));
        }
        if res.chips > 0 {
            self.cues.push(Cue::ChipsGained(res.chips));
        }
        match res.signal {
            FinalizeSignal::NextDeal => {}
            FinalizeSignal::EnemyDefeated => {
                self.pending = Some(PendingTransition {
                    kind: TransitionKind::EnemyDefeated,
                    timer: PENDING_TRANSITION_SECS,
                });
            }
            FinalizeSignal::PlayerDefeated => {
                self.pending = Some(PendingTransition {
                    kind: TransitionKind::PlayerDefeated,
                    timer: PENDING_TRANSITION_SECS,
                });
            }
        }
    }

    fn apply_transition(&mut self, kind: TransitionKind) {
        match kind {
            TransitionKind::PlayerDefeated => {
                self.cues.push(Cue::PlayerDefeated);
                self.encounter = None;
                self.mode = Mode::GameOver;
                self.announce("The house wins.".to_string());
            }
            TransitionKind::EnemyDefeated => self.handle_enemy_defeated(),
        }
    }

    fn handle_enemy_defeated(&mut self) {
        let Some(enc) = self.encounter.take() else {
            return;
        };
        self.cues.push(Cue::EnemyDefeated);
        self.run.enemies_defeated += 1;
        self.last_intro_line = Some(enc.intro.text.clone());

        let payout = round_f64_to_i32(
            f64::from(enc.enemy.gold_drop) * f64::from(self.run.player.stats.gold_mult),
        ) + self.run.player.streak.min(STREAK_CHIP_CAP);
        self.run.gain_chips(payout);
        if payout > 0 {
            self.cues.push(Cue::ChipsGained(payout));
        }
        self.run
            .push_log(format!("{} busts out. +{payout} chips.", enc.enemy.name));

        let cleared_room = self.run.room;
        match enc.enemy.kind {
            EnemyKind::Boss if self.run.floor >= self.run.max_floor => {
                self.mode = Mode::Victory;
                self.announce("The pit is yours.".to_string());
                return;
            }
            EnemyKind::Boss => {
                self.run.floor += 1;
                self.run.room = 1;
                self.run.player.heal(BOSS_CLEAR_HEAL);
                self.cues.push(Cue::Healed(BOSS_CLEAR_HEAL));
                self.cues.push(Cue::FloorAdvanced(self.run.floor));
                self.run
                    .push_log(format!("Floor {} opens up.", self.run.floor));
                self.open_camp(CampKind::RewardAndShop);
            }
            EnemyKind::Normal | EnemyKind::Elite => {
                self.run.room += 1;
                self.open_camp(camp_kind_for_room(cleared_room));
            }
        }
    }

    fn open_camp(&mut self, kind: CampKind) {
        camp::enter_camp(&mut self.run);
        self.reward_option_ids = match kind {
            CampKind::RewardAndShop => camp::roll_reward_options(&mut self.run, &self.profile),
            CampKind::ShopOnly => Vec::new(),
        };
        self.shop_stock = camp::build_shop_stock(&self.run, &self.reward_option_ids);
        self.selection_index = 0;
        self.mode = if self.reward_option_ids.is_empty() {
            Mode::Shop
        } else {
            Mode::Reward
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, Rank, Suit};

    fn ready_session(seed: u64) -> GameSession {
        let mut session = GameSession::new(seed, Profile::default());
        if let Some(enc) = &mut session.encounter {
            enc.intro.reveal_all();
        }
        session.confirm_intro().expect("intro confirm starts the hand");
        session
    }

    #[test]
    fn new_session_opens_with_an_intro() {
        let session = GameSession::new(3, Profile::default());
        let enc = session.encounter.as_ref().unwrap();
        assert!(enc.intro.active);
        assert!(enc.player_hand.is_empty());
        assert_eq!(session.mode, Mode::Playing);
        assert!(session.announcement.contains("Floor 1"));
    }

    #[test]
    fn confirm_intro_reveals_then_deals() {
        let mut session = GameSession::new(4, Profile::default());
        session.confirm_intro().unwrap();
        let enc = session.encounter.as_ref().unwrap();
        assert!(enc.intro.fully_revealed());
        assert!(enc.intro.active);

        session.confirm_intro().unwrap();
        let enc = session.encounter.as_ref().unwrap();
        assert!(!enc.intro.active);
        assert!(enc.player_hand.len() >= 2);
    }

    #[test]
    fn actions_blocked_outside_playing_mode() {
        let mut session = ready_session(5);
        session.mode = Mode::Shop;
        assert_eq!(session.hit().unwrap_err(), ActionError::NotPlayerTurn);
        assert_eq!(session.stand().unwrap_err(), ActionError::NotPlayerTurn);
    }

    #[test]
    fn enemy_defeat_waits_out_the_pending_transition() {
        let mut session = ready_session(6);
        session.encounter.as_mut().unwrap().enemy.hp = 1;
        force_win(&mut session);
        assert!(session.encounter.is_some(), "encounter lingers during the beat");
        assert_eq!(session.mode, Mode::Playing);

        session.update(PENDING_TRANSITION_SECS + 0.1);
        assert!(session.encounter.is_none());
        assert!(matches!(session.mode, Mode::Reward | Mode::Shop));
        assert_eq!(session.run.enemies_defeated, 1);
        assert_eq!(session.run.room, 2);
        let cues = session.drain_cues();
        assert!(cues.contains(&Cue::EnemyDefeated));
    }

    #[test]
    fn odd_room_camp_offers_no_draft() {
        // Room 1 cleared: odd parity means a chip-only shop.
        let mut session = ready_session(7);
        session.encounter.as_mut().unwrap().enemy.hp = 1;
        force_win(&mut session);
        session.update(PENDING_TRANSITION_SECS + 0.1);
        assert_eq!(session.mode, Mode::Shop);
        assert!(session.reward_option_ids.is_empty());
        assert!(!session.shop_stock.is_empty());
    }

    #[test]
    fn claim_moves_reward_to_shop() {
        let mut session = ready_session(8);
        session.run.room = 2;
        session.encounter.as_mut().unwrap().enemy.hp = 1;
        force_win(&mut session);
        session.update(PENDING_TRANSITION_SECS + 0.1);
        assert_eq!(session.mode, Mode::Reward);
        let pick = session.reward_option_ids[0].clone();

        session.claim(&pick).unwrap();
        assert_eq!(session.mode, Mode::Shop);
        assert_eq!(session.run.player.relics.get(&pick), Some(&1));
        assert_eq!(session.profile.relic_collected(&pick), 1);
        assert!(session.drain_cues().contains(&Cue::RelicGained(pick)));
    }

    #[test]
    fn continue_run_starts_the_next_encounter() {
        let mut session = ready_session(9);
        session.encounter.as_mut().unwrap().enemy.hp = 1;
        force_win(&mut session);
        session.update(PENDING_TRANSITION_SECS + 0.1);
        session.continue_run().unwrap();
        assert_eq!(session.mode, Mode::Playing);
        let enc = session.encounter.as_ref().unwrap();
        assert!(enc.intro.active);
        assert_eq!(session.run.room, 2);
    }

    #[test]
    fn player_defeat_ends_the_run_and_records_once() {
        let mut session = ready_session(10);
        session.run.player.hp = 1;
        session.run.player.bust_guards_left = 0;
        {
            let enc = session.encounter.as_mut().unwrap();
            enc.player_hand.clear();
            enc.dealer_hand.clear();
            for rank in [Rank::Ten, Rank::King, Rank::Five] {
                enc.player_hand.push(Card::new(rank, Suit::Clubs));
            }
            enc.dealer_hand.push(Card::new(Rank::Ten, Suit::Hearts));
            enc.dealer_hand.push(Card::new(Rank::Nine, Suit::Hearts));
            enc.last_player_action = crate::encounter::PlayerAction::Hit;
        }
        let enc = session.encounter.as_mut().unwrap();
        let res = turn::resolve_dealer_then_showdown(&mut session.run, enc, false);
        assert_eq!(res.signal, FinalizeSignal::PlayerDefeated);
        session.absorb(Some(res));
        session.update(PENDING_TRANSITION_SECS + 0.1);
        assert_eq!(session.mode, Mode::GameOver);
        assert!(session.encounter.is_none());

        session.record_result(1_700_000_123);
        session.record_result(1_700_000_999);
        assert_eq!(session.profile.runs_played, 1);
        assert_eq!(session.profile.victories, 0);
    }

    #[test]
    fn boss_kill_on_final_floor_wins_the_run() {
        let mut session = ready_session(11);
        session.run.floor = session.run.max_floor;
        session.run.room = session.run.rooms_per_floor;
        {
            let enc = session.encounter.as_mut().unwrap();
            enc.enemy.kind = EnemyKind::Boss;
            enc.enemy.hp = 1;
        }
        force_win(&mut session);
        session.update(PENDING_TRANSITION_SECS + 0.1);
        assert_eq!(session.mode, Mode::Victory);
        session.record_result(7);
        assert_eq!(session.profile.victories, 1);
    }

    #[test]
    fn boss_kill_mid_run_advances_the_floor_and_heals() {
        let mut session = ready_session(12);
        session.run.room = session.run.rooms_per_floor;
        session.run.player.hp = 10;
        {
            let enc = session.encounter.as_mut().unwrap();
            enc.enemy.kind = EnemyKind::Boss;
            enc.enemy.hp = 1;
        }
        force_win(&mut session);
        session.update(PENDING_TRANSITION_SECS + 0.1);
        assert_eq!(session.run.floor, 2);
        assert_eq!(session.run.room, 1);
        assert_eq!(session.run.player.hp, 10 + BOSS_CLEAR_HEAL);
        assert_eq!(session.mode, Mode::Reward);
    }

    #[test]
    fn snapshot_round_trips_through_the_session() {
        let mut session = ready_session(13);
        session.run.player.gold = 123;
        let snapshot = session.to_snapshot(42);
        let raw = crate::save::encode_snapshot(&snapshot).unwrap();
        let loaded = crate::save::decode_snapshot(&raw).unwrap();
        let restored = GameSession::from_snapshot(loaded, Profile::default());
        assert_eq!(restored.mode, Mode::Playing);
        assert_eq!(restored.run.player.gold, 123);
        let a = session.encounter.as_ref().unwrap();
        let b = restored.encounter.as_ref().unwrap();
        assert_eq!(a.player_hand, b.player_hand);
        assert_eq!(a.enemy, b.enemy);
    }

    #[test]
    fn resume_during_the_defeat_beat_re_arms_the_transition() {
        let mut session = ready_session(14);
        session.encounter.as_mut().unwrap().enemy.hp = 1;
        force_win(&mut session);
        assert!(session.is_transition_pending());

        // Save fired mid-beat: the pending countdown is not serialized.
        let raw = crate::save::encode_snapshot(&session.to_snapshot(1)).unwrap();
        let loaded = crate::save::decode_snapshot(&raw).unwrap();
        let mut resumed = GameSession::from_snapshot(loaded, Profile::default());
        assert!(resumed.is_transition_pending());

        resumed.update(PENDING_TRANSITION_SECS + 0.1);
        assert!(matches!(resumed.mode, Mode::Reward | Mode::Shop));
        assert!(resumed.encounter.is_none());
        assert_eq!(resumed.run.enemies_defeated, 1);
    }

    #[test]
    fn resume_with_a_dead_player_still_reaches_game_over() {
        let mut session = ready_session(15);
        session.pending = None;
        session.run.player.hp = 0;
        {
            let enc = session.encounter.as_mut().unwrap();
            enc.phase = Phase::Done;
        }
        let raw = crate::save::encode_snapshot(&session.to_snapshot(2)).unwrap();
        let loaded = crate::save::decode_snapshot(&raw).unwrap();
        let mut resumed = GameSession::from_snapshot(loaded, Profile::default());

        resumed.update(PENDING_TRANSITION_SECS + 0.1);
        assert_eq!(resumed.mode, Mode::GameOver);
        assert!(resumed.encounter.is_none());
    }

    #[test]
    fn resume_of_a_done_hand_with_both_alive_reopens_the_deal() {
        let mut session = ready_session(16);
        session.pending = None;
        session.encounter.as_mut().unwrap().phase = Phase::Done;
        let raw = crate::save::encode_snapshot(&session.to_snapshot(3)).unwrap();
        let loaded = crate::save::decode_snapshot(&raw).unwrap();
        let mut resumed = GameSession::from_snapshot(loaded, Profile::default());

        let enc = resumed.encounter.as_ref().unwrap();
        assert_eq!(enc.phase, Phase::Resolve);
        assert!(resumed.view().legal_actions.contains(&crate::view::ActionKind::Deal));
    }

    /// Rig the current hand so a stand wins outright. The opening deal
    /// may have auto-resolved a natural, so the phase is reset too.
    fn force_win(session: &mut GameSession) {
        session.pending = None;
        let enc = session.encounter.as_mut().unwrap();
        enc.phase = Phase::Player;
        enc.player_hand.clear();
        enc.dealer_hand.clear();
        enc.player_hand.push(Card::new(Rank::Ten, Suit::Clubs));
        enc.player_hand.push(Card::new(Rank::Nine, Suit::Clubs));
        enc.dealer_hand.push(Card::new(Rank::Ten, Suit::Hearts));
        enc.dealer_hand.push(Card::new(Rank::Eight, Suit::Hearts));
        session.stand().unwrap();
    }
}
