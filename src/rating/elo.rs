//! Elo rating functions over integer ratings
//!
//! Both functions are pure: the same inputs always give the same outputs.
//! Deltas are rounded half away from zero before being added to the base
//! rating, and results never drop below [`RATING_FLOOR`] where a floor applies.

use skillratings::elo::{expected_score, EloRating};

/// K factor applied to every rating change
pub const K_FACTOR: f64 = 32.0;

/// Lowest rating a model can be pushed down to
pub const RATING_FLOOR: i32 = 100;

/// Expected score of `rating` against `opponent` on the logistic curve
pub fn expected(rating: i32, opponent: i32) -> f64 {
    let (expected_one, _) = expected_score(
        &EloRating {
            rating: f64::from(rating),
        },
        &EloRating {
            rating: f64::from(opponent),
        },
    );
    expected_one
}

fn delta(rating: i32, opponent: i32, actual: f64) -> i32 {
    (K_FACTOR * (actual - expected(rating, opponent))).round() as i32
}

/// New ratings after `winner` beat `loser`, as `(winner, loser)`.
///
/// The loser is floored at [`RATING_FLOOR`]; the winner saturates at `i32::MAX`.
pub fn win_loss(winner: i32, loser: i32) -> (i32, i32) {
    let new_winner = winner.saturating_add(delta(winner, loser, 1.0));
    let new_loser = loser
        .saturating_add(delta(loser, winner, 0.0))
        .max(RATING_FLOOR);
    (new_winner, new_loser)
}

/// New ratings after a draw, as `(a, b)`. Both are floored.
pub fn draw(a: i32, b: i32) -> (i32, i32) {
    let new_a = a.saturating_add(delta(a, b, 0.5)).max(RATING_FLOOR);
    let new_b = b.saturating_add(delta(b, a, 0.5)).max(RATING_FLOOR);
    (new_a, new_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_expected_score_equal_ratings() {
        assert!((expected(1200, 1200) - 0.5).abs() < 1e-12);
        assert!(expected(1600, 1200) > 0.9);
        assert!((expected(1600, 1200) + expected(1200, 1600) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_win_loss_equal_ratings() {
        assert_eq!(win_loss(1200, 1200), (1216, 1184));
    }

    #[test]
    fn test_win_loss_upset_moves_more() {
        let (favourite_win, _) = win_loss(1600, 1200);
        let (underdog_win, _) = win_loss(1200, 1600);

        assert_eq!(favourite_win, 1603);
        assert_eq!(underdog_win, 1229);
    }

    #[test]
    fn test_ratings_saturate_at_upper_bound() {
        assert_eq!(win_loss(i32::MAX - 1, i32::MAX - 1), (i32::MAX, i32::MAX - 17));
        assert_eq!(win_loss(i32::MAX, 1200), (i32::MAX, 1200));
        assert_eq!(draw(1200, i32::MAX), (1216, i32::MAX - 16));
    }

    #[test]
    fn test_loser_floor() {
        assert_eq!(win_loss(1200, 100), (1200, 100));
        assert_eq!(win_loss(100, 105).1, RATING_FLOOR);
        let (_, loser) = win_loss(300, 110);
        assert!(loser >= RATING_FLOOR);
    }

    #[test]
    fn test_draw_between_unequal_ratings() {
        assert_eq!(draw(1400, 1000), (1387, 1013));
    }

    #[test]
    fn test_draw_equal_ratings_unchanged() {
        for r in [100, 1000, 1200, 2400] {
            assert_eq!(draw(r, r), (r, r));
        }
    }

    #[test]
    fn test_draw_floor_applies_to_both() {
        assert_eq!(draw(100, 900), (116, 884));
        assert_eq!(draw(900, 100), (884, 116));

        let (a, _) = draw(105, 95);
        assert!(a >= RATING_FLOOR);
    }

    proptest! {
        #[test]
        fn prop_winner_never_loses_points(winner in 100i32..3000, loser in 100i32..3000) {
            let (new_winner, new_loser) = win_loss(winner, loser);
            prop_assert!(new_winner >= winner);
            prop_assert!(new_loser <= loser.max(RATING_FLOOR));
            prop_assert!(new_loser >= RATING_FLOOR);
        }

        #[test]
        fn prop_changes_bounded_by_k(a in 100i32..3000, b in 100i32..3000) {
            let (w, l) = win_loss(a, b);
            prop_assert!((w - a).abs() <= K_FACTOR as i32);
            prop_assert!((l - b).abs() <= K_FACTOR as i32);

            let (da, db) = draw(a, b);
            prop_assert!((da - a).abs() <= K_FACTOR as i32 / 2);
            prop_assert!((db - b).abs() <= K_FACTOR as i32 / 2);
        }

        #[test]
        fn prop_draw_is_symmetric(a in 100i32..3000, b in 100i32..3000) {
            let (ab_a, ab_b) = draw(a, b);
            let (ba_b, ba_a) = draw(b, a);
            prop_assert_eq!(ab_a, ba_a);
            prop_assert_eq!(ab_b, ba_b);
        }

        #[test]
        fn prop_draw_moves_towards_each_other(a in 100i32..3000, b in 100i32..3000) {
            let (new_a, new_b) = draw(a, b);
            if a > b {
                prop_assert!(new_a <= a);
                prop_assert!(new_b >= b);
            } else if a < b {
                prop_assert!(new_a >= a);
                prop_assert!(new_b <= b);
            } else {
                prop_assert_eq!((new_a, new_b), (a, b));
            }
        }
    }
}
