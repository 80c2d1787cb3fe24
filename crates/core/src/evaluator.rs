//! Hand evaluation for 5-7 card hold'em hands.
//!
//! [`evaluate`] maps a hand to a [`HandRank`], a packed integer that is
//! totally ordered by hand strength: higher is stronger, equal means the
//! hands chop at showdown. Evaluation is by rank histogram and per-suit
//! bitmasks with a precomputed straight table, so it is allocation-free
//! and safe to call from any thread.

use std::sync::LazyLock;

use crate::cards::Card;

/// Hand category, weakest to strongest. The ace-high straight flush
/// (royal) is the top of [`Category::StraightFlush`], not its own tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Category {
    HighCard = 0,
    Pair = 1,
    TwoPair = 2,
    Trips = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    Quads = 7,
    StraightFlush = 8,
}

/// A totally ordered hand strength.
///
/// Layout: `category << 20 | tiebreak values in descending nibbles`,
/// where each tiebreak value is a card rank as 2..=14.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandRank(u32);

impl HandRank {
    /// The category encoded in this rank.
    #[must_use]
    pub fn category(self) -> Category {
        match self.0 >> 20 {
            0 => Category::HighCard,
            1 => Category::Pair,
            2 => Category::TwoPair,
            3 => Category::Trips,
            4 => Category::Straight,
            5 => Category::Flush,
            6 => Category::FullHouse,
            7 => Category::Quads,
            _ => Category::StraightFlush,
        }
    }

    /// Raw packed value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Highest straight in a 13-bit rank mask, as a card value 5..=14, or 0.
///
/// Bit `i` of the mask is rank value `i + 2`; the wheel (A-2-3-4-5)
/// counts as a 5-high straight.
static STRAIGHT_HIGH: LazyLock<[u8; 8192]> = LazyLock::new(|| {
    let mut table = [0u8; 8192];
    let wheel: u16 = (1 << 12) | 0b1111;
    for (mask, slot) in table.iter_mut().enumerate() {
        let mask = mask as u16;
        for high_bit in (4..=12u8).rev() {
            let run = 0x1F << (high_bit - 4);
            if mask & run == run {
                *slot = high_bit + 2;
                break;
            }
        }
        if *slot == 0 && mask & wheel == wheel {
            *slot = 5;
        }
    }
    table
});

/// Pack a category and up to five tiebreak values (each 2..=14, high first).
fn pack(category: Category, values: &[u8]) -> HandRank {
    let mut packed = (category as u32) << 20;
    for (i, &v) in values.iter().take(5).enumerate() {
        packed |= u32::from(v) << (16 - 4 * i);
    }
    HandRank(packed)
}

/// Push the highest set ranks of `mask` into `out` as card values, skipping
/// any rank already present, until `out` holds `want` values.
fn fill_kickers(mask: u16, out: &mut Vec<u8>, want: usize) {
    for bit in (0..13u8).rev() {
        if out.len() >= want {
            return;
        }
        let value = bit + 2;
        if mask & (1 << bit) != 0 && !out.contains(&value) {
            out.push(value);
        }
    }
}

/// Evaluate the best 5-card poker hand contained in `cards`.
///
/// Accepts 5 to 7 cards. Deterministic and commutative in card order:
/// the result depends only on the card multiset.
///
/// Callers deal without replacement; duplicate cards are not checked.
///
/// # Panics
///
/// Debug builds panic if `cards.len()` is outside 5..=7.
#[must_use]
pub fn evaluate(cards: &[Card]) -> HandRank {
    debug_assert!((5..=7).contains(&cards.len()), "need 5-7 cards");

    let mut rank_counts = [0u8; 13];
    let mut suit_masks = [0u16; 4];
    let mut rank_mask = 0u16;

    for &card in cards {
        rank_counts[card.rank() as usize] += 1;
        suit_masks[card.suit() as usize] |= 1 << card.rank();
        rank_mask |= 1 << card.rank();
    }

    // Flush suit, if any. With at most 7 cards a flush cannot coexist with
    // quads or a full house (that would take at least 8 cards), so the
    // flush path only needs to check for a straight flush above it.
    if let Some(flush_mask) = suit_masks
        .iter()
        .find(|&&m| m.count_ones() >= 5)
        .copied()
    {
        let high = STRAIGHT_HIGH[flush_mask as usize];
        if high > 0 {
            return pack(Category::StraightFlush, &[high]);
        }
        let mut values = Vec::with_capacity(5);
        fill_kickers(flush_mask, &mut values, 5);
        return pack(Category::Flush, &values);
    }

    // Rank multiplicities, highest rank first within each multiplicity.
    let mut quads = Vec::new();
    let mut trips = Vec::new();
    let mut pairs = Vec::new();
    for bit in (0..13u8).rev() {
        match rank_counts[bit as usize] {
            4 => quads.push(bit + 2),
            3 => trips.push(bit + 2),
            2 => pairs.push(bit + 2),
            _ => {}
        }
    }

    if let Some(&quad) = quads.first() {
        let mut values = vec![quad];
        fill_kickers(rank_mask, &mut values, 2);
        return pack(Category::Quads, &values);
    }

    // Two sets of trips also make a full house (7-card hands only).
    if let Some(&three) = trips.first() {
        let pair_under = pairs.first().copied().or_else(|| trips.get(1).copied());
        if let Some(two) = pair_under {
            return pack(Category::FullHouse, &[three, two]);
        }
    }

    let straight_high = STRAIGHT_HIGH[rank_mask as usize];
    if straight_high > 0 {
        return pack(Category::Straight, &[straight_high]);
    }

    if let Some(&three) = trips.first() {
        let mut values = vec![three];
        fill_kickers(rank_mask, &mut values, 3);
        return pack(Category::Trips, &values);
    }

    if pairs.len() >= 2 {
        let mut values = vec![pairs[0], pairs[1]];
        fill_kickers(rank_mask, &mut values, 3);
        return pack(Category::TwoPair, &values);
    }

    if let Some(&two) = pairs.first() {
        let mut values = vec![two];
        fill_kickers(rank_mask, &mut values, 4);
        return pack(Category::Pair, &values);
    }

    let mut values = Vec::with_capacity(5);
    fill_kickers(rank_mask, &mut values, 5);
    pack(Category::HighCard, &values)
}
