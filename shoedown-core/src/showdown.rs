//! Showdown classification for a finished hand.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Terminal classification of one hand exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    PlayerBust,
    DealerBust,
    Blackjack,
    DealerBlackjack,
    PlayerWin,
    DealerWin,
    Push,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlayerBust => "player_bust",
            Self::DealerBust => "dealer_bust",
            Self::Blackjack => "blackjack",
            Self::DealerBlackjack => "dealer_blackjack",
            Self::PlayerWin => "player_win",
            Self::DealerWin => "dealer_win",
            Self::Push => "push",
        }
    }

    /// Outcomes that score as a player win for streaks and side effects.
    #[must_use]
    pub const fn is_player_win(self) -> bool {
        matches!(self, Self::DealerBust | Self::Blackjack | Self::PlayerWin)
    }

    /// Outcomes that score as a player loss.
    #[must_use]
    pub const fn is_player_loss(self) -> bool {
        matches!(self, Self::PlayerBust | Self::DealerBlackjack | Self::DealerWin)
    }

    #[must_use]
    pub const fn tone(self) -> ResultTone {
        match self {
            Self::DealerBust | Self::Blackjack | Self::PlayerWin => ResultTone::Win,
            Self::PlayerBust | Self::DealerBlackjack | Self::DealerWin => ResultTone::Loss,
            Self::Push => ResultTone::Push,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player_bust" => Ok(Self::PlayerBust),
            "dealer_bust" => Ok(Self::DealerBust),
            "blackjack" => Ok(Self::Blackjack),
            "dealer_blackjack" => Ok(Self::DealerBlackjack),
            "player_win" => Ok(Self::PlayerWin),
            "dealer_win" => Ok(Self::DealerWin),
            "push" => Ok(Self::Push),
            _ => Err(()),
        }
    }
}

/// Presentation tone attached to a result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultTone {
    Win,
    Loss,
    Push,
    #[default]
    Info,
}

impl ResultTone {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Push => "push",
            Self::Info => "info",
        }
    }
}

impl FromStr for ResultTone {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            "push" => Ok(Self::Push),
            "info" => Ok(Self::Info),
            _ => Err(()),
        }
    }
}

/// Classify a finished hand. Priority order is part of the balance
/// contract: player bust first, then dealer bust, then natural
/// mismatch, then the numeric comparison, else push.
#[must_use]
pub fn resolve_showdown_outcome(
    player_total: i32,
    dealer_total: i32,
    player_natural: bool,
    dealer_natural: bool,
) -> Outcome {
    if player_total > 21 {
        return Outcome::PlayerBust;
    }
    if dealer_total > 21 {
        return Outcome::DealerBust;
    }
    if player_natural && !dealer_natural {
        return Outcome::Blackjack;
    }
    if dealer_natural && !player_natural {
        return Outcome::DealerBlackjack;
    }
    if player_total > dealer_total {
        return Outcome::PlayerWin;
    }
    if dealer_total > player_total {
        return Outcome::DealerWin;
    }
    Outcome::Push
}
