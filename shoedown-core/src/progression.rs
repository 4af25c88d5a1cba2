//! Room pacing and floor progression primitives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::ELITE_ROOM;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    #[default]
    Normal,
    Elite,
    Boss,
}

impl EnemyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Elite => "elite",
            Self::Boss => "boss",
        }
    }
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnemyKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "elite" => Ok(Self::Elite),
            "boss" => Ok(Self::Boss),
            _ => Err(()),
        }
    }
}

/// Fixed per-floor pacing template: the last room is always the boss,
/// room 3 is always the elite, everything else is a normal fight.
#[must_use]
pub fn resolve_room_type(room: u32, rooms_per_floor: u32) -> EnemyKind {
    if room >= rooms_per_floor {
        EnemyKind::Boss
    } else if room == ELITE_ROOM {
        EnemyKind::Elite
    } else {
        EnemyKind::Normal
    }
}

/// Post-fight interstitial flavor. Even rooms earn the full camp with a
/// relic draft; odd rooms only open the chip shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampKind {
    RewardAndShop,
    ShopOnly,
}

#[must_use]
pub const fn camp_kind_for_room(room: u32) -> CampKind {
    if room % 2 == 0 {
        CampKind::RewardAndShop
    } else {
        CampKind::ShopOnly
    }
}
