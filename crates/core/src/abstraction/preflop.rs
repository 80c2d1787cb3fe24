//! Lossless preflop abstraction: the 169 canonical hand classes.
//!
//! A hole pair is identified by its two ranks and a suitedness flag
//! (pairs have none): 13 pairs + 78 suited + 78 offsuit = 169 classes.
//! Index layout: pairs first (AA = 0 .. 22 = 12), then suited combos,
//! then offsuit combos, each in high-card-major triangle order.

use std::sync::LazyLock;

use crate::cards::{Card, ACE};

/// Number of canonical preflop hand classes.
pub const PREFLOP_BUCKETS: usize = 169;

/// Rank characters in canonical (descending) order.
const RANKS_DESC: [char; 13] = [
    'A', 'K', 'Q', 'J', 'T', '9', '8', '7', '6', '5', '4', '3', '2',
];

/// Canonical ordinal of a numeric rank: A = 0, K = 1, ..., 2 = 12.
const fn ordinal(rank: u8) -> u8 {
    ACE - rank
}

/// Upper-triangle offset for two distinct ordinals with `weak > strong`.
fn triangle(weak: u8, strong: u8) -> u16 {
    debug_assert!(weak > strong);
    u16::from(weak) * (u16::from(weak) - 1) / 2 + u16::from(strong)
}

/// The canonical class index of a hole pair, in `[0, 169)`.
///
/// Commutative in card order; suits only matter through suitedness.
#[must_use]
pub fn preflop_bucket(hole: [Card; 2]) -> u16 {
    let a = ordinal(hole[0].rank());
    let b = ordinal(hole[1].rank());
    let (strong, weak) = if a <= b { (a, b) } else { (b, a) };

    if strong == weak {
        u16::from(strong)
    } else if hole[0].suit() == hole[1].suit() {
        13 + triangle(weak, strong)
    } else {
        91 + triangle(weak, strong)
    }
}

/// All 169 class names, indexed by bucket: `"AA"`, `"AKs"`, `"72o"`, ...
static CLASS_NAMES: LazyLock<[String; PREFLOP_BUCKETS]> = LazyLock::new(|| {
    let mut names: [String; PREFLOP_BUCKETS] = std::array::from_fn(|_| String::new());
    let mut idx = 0;

    for rank in RANKS_DESC {
        names[idx] = format!("{rank}{rank}");
        idx += 1;
    }
    for suffix in ['s', 'o'] {
        for (weak, &w) in RANKS_DESC.iter().enumerate().skip(1) {
            for &s in &RANKS_DESC[..weak] {
                names[idx] = format!("{s}{w}{suffix}");
                idx += 1;
            }
        }
    }

    names
});

/// The display name of a canonical class (`"AKs"`, `"QQ"`, `"72o"`).
///
/// # Panics
///
/// Panics if `bucket >= 169`.
#[must_use]
pub fn bucket_name(bucket: u16) -> &'static str {
    &CLASS_NAMES[bucket as usize]
}

/// Parse a canonical class name back to its bucket index.
#[must_use]
pub fn bucket_from_name(name: &str) -> Option<u16> {
    let mut chars = name.chars();
    let first = chars.next()?;
    let second = chars.next()?;
    let suffix = chars.next();
    if chars.next().is_some() {
        return None;
    }

    #[allow(clippy::cast_possible_truncation)]
    let ord = |c: char| {
        RANKS_DESC
            .iter()
            .position(|&r| r == c.to_ascii_uppercase())
            .map(|p| p as u8)
    };
    let a = ord(first)?;
    let b = ord(second)?;
    let (strong, weak) = if a <= b { (a, b) } else { (b, a) };

    match (strong == weak, suffix) {
        (true, None) => Some(u16::from(strong)),
        (false, Some('s')) => Some(13 + triangle(weak, strong)),
        (false, Some('o')) => Some(91 + triangle(weak, strong)),
        _ => None,
    }
}

/// Representative concrete cards for a class: hearts-first, with the
/// second card in diamonds for offsuit classes and pairs.
///
/// # Panics
///
/// Panics if `bucket >= 169`.
#[must_use]
pub fn representative_cards(bucket: u16) -> [Card; 2] {
    let name = bucket_name(bucket);
    let bytes = name.as_bytes();

    #[allow(clippy::cast_possible_truncation)]
    let rank_of = |c: u8| {
        ACE - RANKS_DESC
            .iter()
            .position(|&r| r == c as char)
            .expect("class names use canonical ranks") as u8
    };

    let suited = bytes.get(2) == Some(&b's');
    let second_suit = if suited { 0 } else { 1 };
    [
        Card::from_rank_suit(rank_of(bytes[0]), 0),
        Card::from_rank_suit(rank_of(bytes[1]), second_suit),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_cards;
    use std::collections::HashSet;
    use test_macros::timed_test;

    fn hole(s: &str) -> [Card; 2] {
        let cards = parse_cards(s).unwrap();
        [cards[0], cards[1]]
    }

    #[timed_test]
    fn all_1326_hole_pairs_land_in_exactly_169_buckets() {
        let mut seen = HashSet::new();
        for a in 0..52u8 {
            for b in (a + 1)..52 {
                let pair = [Card::from_index(a).unwrap(), Card::from_index(b).unwrap()];
                let bucket = preflop_bucket(pair);
                assert!(bucket < 169, "bucket {bucket} out of range");
                seen.insert(bucket);
            }
        }
        assert_eq!(seen.len(), PREFLOP_BUCKETS);
    }

    #[timed_test]
    fn pairs_precede_suited_precede_offsuit() {
        assert_eq!(preflop_bucket(hole("AhAd")), 0);
        assert_eq!(preflop_bucket(hole("KhKd")), 1);
        assert_eq!(preflop_bucket(hole("2h2d")), 12);
        assert_eq!(preflop_bucket(hole("AhKh")), 13);
        assert_eq!(preflop_bucket(hole("AhKd")), 91);
    }

    #[timed_test]
    fn suited_and_offsuit_are_distinct() {
        assert_ne!(preflop_bucket(hole("AhKh")), preflop_bucket(hole("AsKd")));
    }

    #[timed_test]
    fn suit_permutations_share_a_bucket() {
        assert_eq!(preflop_bucket(hole("AhKd")), preflop_bucket(hole("AcKs")));
        assert_eq!(preflop_bucket(hole("AhKh")), preflop_bucket(hole("AsKs")));
    }

    #[timed_test]
    fn card_order_is_irrelevant() {
        assert_eq!(preflop_bucket(hole("KdAh")), preflop_bucket(hole("AhKd")));
    }

    #[timed_test]
    fn names_roundtrip_through_parsing() {
        for bucket in 0..PREFLOP_BUCKETS as u16 {
            let name = bucket_name(bucket);
            assert_eq!(bucket_from_name(name), Some(bucket), "{name}");
        }
    }

    #[timed_test]
    fn known_names() {
        assert_eq!(bucket_name(0), "AA");
        assert_eq!(bucket_name(12), "22");
        assert_eq!(bucket_name(13), "AKs");
        assert_eq!(bucket_name(91), "AKo");
    }

    #[timed_test]
    fn bad_names_rejected()  {
        assert_eq!(bucket_from_name("AK"), None, "non-pair needs a suffix");
        assert_eq!(bucket_from_name("AAs"), None, "pairs have no suitedness");
        assert_eq!(bucket_from_name("AKx"), None);
        assert_eq!(bucket_from_name("A"), None);
    }

    #[timed_test]
    fn representative_cards_map_back_to_their_class() {
        for bucket in 0..PREFLOP_BUCKETS as u16 {
            let cards = representative_cards(bucket);
            assert_eq!(preflop_bucket(cards), bucket, "{}", bucket_name(bucket));
        }
    }
}
