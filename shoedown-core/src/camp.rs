//! The camp interstitial between encounters: a free relic draft and a
//! chip shop limited to one purchase per visit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    MAX_RELIC_STACKS, REWARD_DRAFT_SIZE, SHOP_GUARD_COST, SHOP_HEAL_AMOUNT, SHOP_HEAL_COST,
    SHOP_MAXHP_AMOUNT, SHOP_MAXHP_COST, SHOP_PRICE_PER_FLOOR,
};
use crate::profile::Profile;
use crate::relics::{RELICS, RelicDef, find_relic, grant_relic, is_unlocked};
use crate::state::Run;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CampError {
    #[error("only one purchase is allowed per camp visit")]
    PurchaseAlreadyMade,
    #[error("not enough chips")]
    NotEnoughChips,
    #[error("no such shop item")]
    NoSuchItem,
    #[error("that relic is not on offer")]
    NotOnOffer,
}

/// What a shop slot sells. Relic slots reference the static catalog by
/// id so the stock survives serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShopItemKind {
    Relic { id: String },
    Heal { amount: i32 },
    BustGuard,
    MaxHp { amount: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopItem {
    pub kind: ShopItemKind,
    pub name: String,
    pub desc: String,
    pub cost: i32,
}

/// Relics the draft and shop may offer: unlocked for this profile and
/// not already at the stack cap in this run.
fn eligible_relics(run: &Run, profile: &Profile) -> Vec<&'static RelicDef> {
    RELICS
        .iter()
        .filter(|def| is_unlocked(def, profile))
        .filter(|def| run.player.relics.get(def.id).copied().unwrap_or(0) < MAX_RELIC_STACKS)
        .collect()
}

/// Draw up to three distinct relic ids, weighted by rarity.
pub fn roll_reward_options(run: &mut Run, profile: &Profile) -> Vec<String> {
    use rand::Rng;

    let mut pool = eligible_relics(run, profile);
    let mut picks = Vec::with_capacity(REWARD_DRAFT_SIZE);
    while picks.len() < REWARD_DRAFT_SIZE && !pool.is_empty() {
        let total: u32 = pool.iter().map(|def| def.rarity.weight()).sum();
        let mut roll = run.rng_mut().random_range(0..total);
        let mut chosen = pool.len() - 1;
        for (i, def) in pool.iter().enumerate() {
            let weight = def.rarity.weight();
            if roll < weight {
                chosen = i;
                break;
            }
            roll -= weight;
        }
        picks.push(pool.remove(chosen).id.to_string());
    }
    picks
}

fn floor_markup(run: &Run) -> i32 {
    SHOP_PRICE_PER_FLOOR * run.floor.saturating_sub(1) as i32
}

/// Build the purchasable stock for this visit: the drafted relics at
/// catalog price plus three consumables, all marked up per floor.
pub fn build_shop_stock(run: &Run, reward_ids: &[String]) -> Vec<ShopItem> {
    let markup = floor_markup(run);
    let mut stock: Vec<ShopItem> = reward_ids
        .iter()
        .filter_map(|id| find_relic(id))
        .map(|def| ShopItem {
            kind: ShopItemKind::Relic {
                id: def.id.to_string(),
            },
            name: def.name.to_string(),
            desc: def.desc.to_string(),
            cost: def.cost + markup,
        })
        .collect();
    stock.push(ShopItem {
        kind: ShopItemKind::Heal {
            amount: SHOP_HEAL_AMOUNT,
        },
        name: "Stiff Drink".to_string(),
        desc: format!("Restore {SHOP_HEAL_AMOUNT} HP."),
        cost: SHOP_HEAL_COST + markup,
    });
    stock.push(ShopItem {
        kind: ShopItemKind::BustGuard,
        name: "Insurance Slip".to_string(),
        desc: "Gain a bust guard for the next encounter.".to_string(),
        cost: SHOP_GUARD_COST + markup,
    });
    stock.push(ShopItem {
        kind: ShopItemKind::MaxHp {
            amount: SHOP_MAXHP_AMOUNT,
        },
        name: "Marked Flask".to_string(),
        desc: format!("Gain {SHOP_MAXHP_AMOUNT} max HP."),
        cost: SHOP_MAXHP_COST + markup,
    });
    stock
}

/// Reset the one-purchase gate on entering a camp.
pub fn enter_camp(run: &mut Run) {
    run.shop_purchase_made = false;
}

/// Take the drafted relic. The draft is free; claiming an id that was
/// not offered is rejected without mutation.
pub fn claim_reward(run: &mut Run, options: &[String], relic_id: &str) -> Result<(), CampError> {
    if !options.iter().any(|id| id == relic_id) {
        return Err(CampError::NotOnOffer);
    }
    if !grant_relic(run, relic_id) {
        return Err(CampError::NotOnOffer);
    }
    Ok(())
}

/// Buy one shop slot, enforcing chips and the per-visit purchase gate.
pub fn buy(run: &mut Run, stock: &[ShopItem], index: usize) -> Result<(), CampError> {
    if run.shop_purchase_made {
        return Err(CampError::PurchaseAlreadyMade);
    }
    let item = stock.get(index).ok_or(CampError::NoSuchItem)?;
    if matches!(&item.kind, ShopItemKind::Relic { id } if find_relic(id).is_none()) {
        return Err(CampError::NoSuchItem);
    }
    if !run.spend_chips(item.cost) {
        return Err(CampError::NotEnoughChips);
    }
    match &item.kind {
        ShopItemKind::Relic { id } => {
            // Grant failure refunds: the stack cap may have been hit by
            // a claim after the stock was rolled.
            if !grant_relic(run, id) {
                run.player.gold += item.cost;
                run.chips_spent_run = run.chips_spent_run.saturating_sub(item.cost.max(0) as u32);
                return Err(CampError::NoSuchItem);
            }
        }
        ShopItemKind::Heal { amount } => {
            run.player.heal(*amount);
            run.push_log(format!("{} restores {amount} HP.", item.name));
        }
        ShopItemKind::BustGuard => {
            run.player.bust_guards_left += 1;
            run.push_log(format!("{} adds a bust guard.", item.name));
        }
        ShopItemKind::MaxHp { amount } => {
            run.player.stats.max_hp_bonus += amount;
            run.player.heal(*amount);
            run.push_log(format!("{} grants {amount} max HP.", item.name));
        }
    }
    run.shop_purchase_made = true;
    Ok(())
}
