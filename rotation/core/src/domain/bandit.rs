// Copyright (c) 2026 Banner Rotation Contributors
// SPDX-License-Identifier: AGPL-3.0

//! # Banner Selection (UCB1 multi-armed bandit)
//!
//! Pure function from per-banner statistics to the banner to show next.
//!
//! Each candidate gets an *effective impression count* of `max(impressions, 1)`.
//! The exploration term uses the sum of those effective counts, not of the raw
//! counts:
//!
//! ```text
//! rating = clicks / effective + sqrt(2 * ln(total_effective) / effective)
//! ```
//!
//! Candidates are scanned in the order given and the current best is only
//! replaced by a strictly greater rating, so the first candidate wins ties.

use crate::domain::banner::{BannerId, BannerStatistic};

/// Select the banner to show from `candidates`.
///
/// Returns `None` only for an empty candidate set. Because every effective
/// impression count is at least one, `ln` is always taken of a value `>= 1`
/// and the division is never by zero.
pub fn pick(candidates: &[BannerStatistic]) -> Option<BannerId> {
    let total_effective: f64 = candidates.iter().map(effective_impressions).sum();

    let mut best: Option<(BannerId, f64)> = None;
    for candidate in candidates {
        let rating = rating(candidate, total_effective);
        match best {
            Some((_, best_rating)) if rating <= best_rating => {}
            _ => best = Some((candidate.banner_id, rating)),
        }
    }

    best.map(|(banner_id, _)| banner_id)
}

fn effective_impressions(stat: &BannerStatistic) -> f64 {
    stat.impressions.max(1) as f64
}

fn rating(stat: &BannerStatistic, total_effective: f64) -> f64 {
    let impressions = effective_impressions(stat);
    stat.clicks as f64 / impressions + (2.0 * total_effective.ln() / impressions).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(rows: &[(i64, u64, u64)]) -> Vec<BannerStatistic> {
        rows.iter()
            .map(|&(id, impressions, clicks)| BannerStatistic::new(BannerId(id), impressions, clicks))
            .collect()
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(pick(&[]), None);
    }

    #[test]
    fn test_single_candidate_always_selected() {
        assert_eq!(pick(&stats(&[(7, 1000, 0)])), Some(BannerId(7)));
        assert_eq!(pick(&stats(&[(7, 0, 0)])), Some(BannerId(7)));
    }

    #[test]
    fn test_all_zero_picks_first() {
        let candidates = stats(&[(1, 0, 0), (2, 0, 0), (3, 0, 0)]);
        assert_eq!(pick(&candidates), Some(BannerId(1)));
    }

    #[test]
    fn test_untried_banner_preferred_over_shown_without_clicks() {
        let candidates = stats(&[(1, 2, 0), (2, 0, 0), (3, 0, 0)]);
        assert_eq!(pick(&candidates), Some(BannerId(2)));

        let candidates = stats(&[(1, 2, 0), (2, 2, 0), (3, 0, 0)]);
        assert_eq!(pick(&candidates), Some(BannerId(3)));
    }

    #[test]
    fn test_least_shown_wins_without_clicks() {
        let candidates = stats(&[(1, 3, 0), (2, 4, 0), (3, 2, 0)]);
        assert_eq!(pick(&candidates), Some(BannerId(3)));
    }

    #[test]
    fn test_clicked_banner_wins() {
        let candidates = stats(&[(1, 5, 1), (2, 4, 0), (3, 4, 0)]);
        assert_eq!(pick(&candidates), Some(BannerId(1)));
    }

    #[test]
    fn test_extra_impressions_flip_to_exploration() {
        let candidates = stats(&[(1, 6, 1), (2, 4, 0), (3, 4, 0)]);
        assert_eq!(pick(&candidates), Some(BannerId(2)));
    }

    #[test]
    fn test_tie_break_follows_input_order() {
        let candidates = stats(&[(9, 4, 1), (3, 4, 1), (5, 4, 1)]);
        assert_eq!(pick(&candidates), Some(BannerId(9)));

        let reversed: Vec<_> = candidates.into_iter().rev().collect();
        assert_eq!(pick(&reversed), Some(BannerId(5)));
    }

    #[test]
    fn test_total_uses_effective_counts() {
        // Raw total would be 1 (ln 1 = 0, no exploration at all); the effective
        // total is 2, which gives the untried banner an exploration bonus.
        let candidates = stats(&[(1, 1, 0), (2, 0, 0)]);
        let total: f64 = candidates.iter().map(effective_impressions).sum();
        assert_eq!(total, 2.0);
        assert!(rating(&candidates[1], total) > 0.0);
        assert_eq!(pick(&candidates), Some(BannerId(1)));
    }

    #[test]
    fn test_pick_returns_member_of_input() {
        let candidates = stats(&[
            (11, 120, 14),
            (12, 80, 9),
            (13, 3, 0),
            (14, 0, 0),
            (15, 510, 60),
        ]);
        let picked = pick(&candidates).unwrap();
        assert!(candidates.iter().any(|c| c.banner_id == picked));
    }
}
