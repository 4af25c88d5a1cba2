//! Card primitives, hand totals, and the multi-deck shoe.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

use crate::constants::{DECKS_PER_SHOE, MAX_SPLIT_HANDS, SHOE_RESHUFFLE_MIN};

/// Cards held by one participant. Inline capacity covers every
/// realistic blackjack hand without heap allocation.
pub type Hand = SmallVec<[Card; 8]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

impl Rank {
    pub const ALL: [Self; 13] = [
        Self::Ace,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Ten,
        Self::Jack,
        Self::Queen,
        Self::King,
    ];

    /// Blackjack value before soft-ace reduction. Aces count high here.
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::Ace => 11,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten | Self::Jack | Self::Queen | Self::King => 10,
        }
    }

    #[must_use]
    pub const fn is_ace(self) -> bool {
        matches!(self, Self::Ace)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ace => "A",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::Ace),
            "2" => Ok(Self::Two),
            "3" => Ok(Self::Three),
            "4" => Ok(Self::Four),
            "5" => Ok(Self::Five),
            "6" => Ok(Self::Six),
            "7" => Ok(Self::Seven),
            "8" => Ok(Self::Eight),
            "9" => Ok(Self::Nine),
            "10" => Ok(Self::Ten),
            "J" => Ok(Self::Jack),
            "Q" => Ok(Self::Queen),
            "K" => Ok(Self::King),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Hearts, Self::Diamonds, Self::Clubs, Self::Spades];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hearts => "hearts",
            Self::Diamonds => "diamonds",
            Self::Clubs => "clubs",
            Self::Spades => "spades",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Suit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hearts" => Ok(Self::Hearts),
            "diamonds" => Ok(Self::Diamonds),
            "clubs" => Ok(Self::Clubs),
            "spades" => Ok(Self::Spades),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    #[must_use]
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

/// Best blackjack total for a hand: aces count 11, then drop to 1 one
/// at a time while the hand is busted.
#[must_use]
pub fn hand_total(cards: &[Card]) -> i32 {
    let mut total: i32 = cards.iter().map(|c| c.rank.value()).sum();
    let mut soft_aces = cards.iter().filter(|c| c.rank.is_ace()).count();
    while total > 21 && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }
    total
}

/// A natural: exactly two cards totaling 21.
#[must_use]
pub fn is_blackjack(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_total(cards) == 21
}

/// Double requires an untouched 2-card hand that is neither a split
/// seed nor already doubled.
#[must_use]
pub fn can_double_down(hand: &[Card], doubled: bool, is_split_hand: bool) -> bool {
    hand.len() == 2 && !doubled && !is_split_hand
}

/// Split requires a 2-card pair, no pending double, and room below the
/// split-hand cap for the encounter.
#[must_use]
pub fn can_split_hand(hand: &[Card], doubled: bool, split_hands_total: u32) -> bool {
    hand.len() == 2
        && hand[0].rank == hand[1].rank
        && !doubled
        && split_hands_total < MAX_SPLIT_HANDS
}

/// The multi-deck draw pile for a single encounter. The discard pile is
/// folded back in when the shoe runs low, so draws never fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Shoe {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub discard: Vec<Card>,
}

impl Shoe {
    /// Build and shuffle a fresh multi-deck shoe.
    #[must_use]
    pub fn fresh<R: Rng>(rng: &mut R) -> Self {
        let mut cards = Vec::with_capacity(52 * DECKS_PER_SHOE);
        for _ in 0..DECKS_PER_SHOE {
            for suit in Suit::ALL {
                for rank in Rank::ALL {
                    cards.push(Card::new(rank, suit));
                }
            }
        }
        cards.shuffle(rng);
        Self {
            cards,
            discard: Vec::new(),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Draw the next card, reshuffling the discard pile into the shoe
    /// when it runs low. An exhausted shoe (possible only after a
    /// hostile snapshot stripped both piles) rebuilds itself.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Card {
        if self.cards.len() < SHOE_RESHUFFLE_MIN && !self.discard.is_empty() {
            self.reshuffle(rng);
        }
        if let Some(card) = self.cards.pop() {
            return card;
        }
        *self = Self::fresh(rng);
        self.cards.pop().unwrap_or(Card::new(Rank::Ace, Suit::Spades))
    }

    fn reshuffle<R: Rng>(&mut self, rng: &mut R) {
        self.cards.append(&mut self.discard);
        self.cards.shuffle(rng);
    }

    /// Fold a finished hand back into the discard pile.
    pub fn muck(&mut self, hand: &mut Hand) {
        self.discard.extend(hand.drain(..));
    }
}
