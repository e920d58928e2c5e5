//! Read path: which cards a request gets to see.
//!
//! The listing rules are deliberate product behavior, not incidental:
//! a named user who holds nothing sees nothing for *any* color; a user
//! re-querying a color they hold gets the same card back rather than a
//! new draw; a user at the reservation limit sees their full held set
//! regardless of the requested color.

use std::collections::HashSet;

use rand::seq::SliceRandom;

use crate::card::{CardRecord, Color};

/// Maximum number of cards offered in a single draw.
pub const SAMPLE_SIZE: usize = 3;

/// Returns the records held by `user` and the set of colors they cover.
///
/// Holder comparison is case-insensitive; colors are lowercased for set
/// membership checks against [`Color::as_str`].
#[must_use]
pub fn user_holdings(records: &[CardRecord], user: &str) -> (Vec<CardRecord>, HashSet<String>) {
    let held: Vec<CardRecord> = records
        .iter()
        .filter(|record| record.is_held_by(user))
        .cloned()
        .collect();
    let colors = held
        .iter()
        .map(|record| record.color.trim().to_ascii_lowercase())
        .filter(|color| !color.is_empty())
        .collect();
    (held, colors)
}

/// Lists the cards to offer for `color`, honoring the requesting user's
/// holdings and the per-user reservation limit.
///
/// Falls through to a uniform random sample (without replacement) of at
/// most [`SAMPLE_SIZE`] available records; output order is the sampling
/// order, with no stable total order guaranteed.
#[must_use]
pub fn pick_cards(
    records: &[CardRecord],
    color: Color,
    user: Option<&str>,
    max_reservations: usize,
) -> Vec<CardRecord> {
    if let Some(user) = user.map(str::trim).filter(|u| !u.is_empty()) {
        let (held, colors) = user_holdings(records, user);

        if held.is_empty() {
            tracing::info!(user, "user holds no cards, returning empty listing");
            return Vec::new();
        }

        if colors.contains(color.as_str()) {
            // Idempotent re-query: the existing card, not a new draw.
            return held
                .iter()
                .find(|record| record.color_matches(color))
                .cloned()
                .into_iter()
                .collect();
        }

        if colors.len() >= max_reservations {
            tracing::info!(
                user,
                max_reservations,
                "user at reservation limit, returning full held set"
            );
            return held;
        }
    }

    let available: Vec<&CardRecord> = records
        .iter()
        .filter(|record| record.color_matches(color) && !record.is_reserved())
        .collect();

    let mut rng = rand::thread_rng();
    available
        .choose_multiple(&mut rng, SAMPLE_SIZE)
        .map(|record| CardRecord::clone(record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, color: &str, reserved: &str) -> CardRecord {
        CardRecord {
            name: name.to_string(),
            color: color.to_string(),
            reserved_by: if reserved.is_empty() {
                None
            } else {
                Some(reserved.to_string())
            },
        }
    }

    fn pool() -> Vec<CardRecord> {
        vec![
            record("Lightning Bolt", "Red", ""),
            record("Shock", "Red", ""),
            record("Fireball", "Red", ""),
            record("Pyroblast", "Red", ""),
            record("Counterspell", "Blue", "alice"),
            record("Swords to Plowshares", "White", "bob"),
        ]
    }

    #[test]
    fn anonymous_draw_is_bounded_by_sample_size() {
        let records = pool();
        for _ in 0..20 {
            let picks = pick_cards(&records, Color::Red, None, 5);
            assert_eq!(picks.len(), SAMPLE_SIZE);
            for pick in &picks {
                assert!(pick.color_matches(Color::Red));
                assert!(!pick.is_reserved());
            }
        }
    }

    #[test]
    fn draw_returns_min_of_sample_size_and_available() {
        let records = vec![record("Shock", "Red", ""), record("Bolt", "Red", "carol")];
        let picks = pick_cards(&records, Color::Red, None, 5);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].name, "Shock");

        assert!(pick_cards(&records, Color::Green, None, 5).is_empty());
    }

    #[test]
    fn user_with_no_holdings_sees_nothing_for_any_color() {
        let records = pool();
        assert!(pick_cards(&records, Color::Red, Some("mallory"), 5).is_empty());
        assert!(pick_cards(&records, Color::Blue, Some("mallory"), 5).is_empty());
    }

    #[test]
    fn blank_user_falls_through_to_the_general_draw() {
        let records = pool();
        assert_eq!(pick_cards(&records, Color::Red, Some("  "), 5).len(), 3);
    }

    #[test]
    fn held_color_requery_is_idempotent() {
        let records = pool();
        let first = pick_cards(&records, Color::Blue, Some("alice"), 5);
        let second = pick_cards(&records, Color::Blue, Some("ALICE"), 5);
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "Counterspell");
    }

    #[test]
    fn user_at_limit_sees_full_held_set_for_any_color() {
        let records = pool();
        // max 1: alice already holds blue, so a red request returns her
        // holdings, not a fresh draw.
        let picks = pick_cards(&records, Color::Red, Some("alice"), 1);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].name, "Counterspell");
    }

    #[test]
    fn below_limit_user_draws_in_a_new_color() {
        let records = pool();
        let picks = pick_cards(&records, Color::Red, Some("alice"), 5);
        assert_eq!(picks.len(), 3);
        assert!(picks.iter().all(|p| p.color_matches(Color::Red)));
    }

    #[test]
    fn holdings_are_matched_case_insensitively() {
        let records = vec![record("Counterspell", "Blue", "Alice")];
        let (held, colors) = user_holdings(&records, "  alice ");
        assert_eq!(held.len(), 1);
        assert!(colors.contains("blue"));
    }
}
