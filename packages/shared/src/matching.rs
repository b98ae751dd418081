//! Opponent selection shared by every queue backend. Runs inside the queue's
//! atomic step so the chosen entry cannot be taken by a concurrent submission.

use std::cmp::Ordering;

use crate::models::candidate::{GameOutcome, PlayerCandidate, MAX_RECENT_RESULTS};
use crate::models::queue::{MatchCriteria, QueueEntry};
use crate::models::room::Color;

/// Picks the best waiting entry for `arriving`, widening the rating tolerance round by round.
/// The arriving user's own entries are never candidates.
pub fn select_opponent<'a>(
    arriving: &QueueEntry,
    waiting: &'a [QueueEntry],
    criteria: &MatchCriteria,
) -> Option<&'a QueueEntry> {
    let others: Vec<&QueueEntry> = waiting
        .iter()
        .filter(|entry| entry.user_id() != arriving.user_id())
        .collect();
    if others.is_empty() {
        return None;
    }

    if criteria.allow_extended_search {
        return best_ranked(&arriving.candidate, others);
    }

    let rating = arriving.candidate.rating;
    let mut tolerance = criteria.tolerance_start;
    for _ in 0..criteria.max_iterations {
        let hits: Vec<&QueueEntry> = others
            .iter()
            .copied()
            .filter(|entry| (entry.candidate.rating - rating).abs() <= tolerance)
            .collect();
        if !hits.is_empty() {
            return best_ranked(&arriving.candidate, hits);
        }
        tolerance += criteria.tolerance_step;
    }
    None
}

fn best_ranked<'a>(
    arriving: &PlayerCandidate,
    mut hits: Vec<&'a QueueEntry>,
) -> Option<&'a QueueEntry> {
    hits.sort_by(|a, b| compare(arriving, a, b));
    hits.into_iter().next()
}

fn compare(arriving: &PlayerCandidate, a: &QueueEntry, b: &QueueEntry) -> Ordering {
    let games_a = a.candidate.games_played.abs_diff(arriving.games_played);
    let games_b = b.candidate.games_played.abs_diff(arriving.games_played);

    let win_a = (a.candidate.win_percentage - arriving.win_percentage).abs();
    let win_b = (b.candidate.win_percentage - arriving.win_percentage).abs();

    let streak_a = streak_similarity(&arriving.last_ten_results, &a.candidate.last_ten_results);
    let streak_b = streak_similarity(&arriving.last_ten_results, &b.candidate.last_ten_results);

    games_a
        .cmp(&games_b)
        .then_with(|| win_a.total_cmp(&win_b))
        .then_with(|| streak_b.cmp(&streak_a))
        .then_with(|| a.enqueued_at.cmp(&b.enqueued_at))
}

/// Number of positions at which two recent-result lists agree.
pub fn streak_similarity(a: &[GameOutcome], b: &[GameOutcome]) -> usize {
    a.iter()
        .zip(b.iter())
        .take(MAX_RECENT_RESULTS)
        .filter(|(x, y)| x == y)
        .count()
}

/// Color for the arriving player, balancing the waiting opponent's color history.
pub fn assign_color(arriving: &PlayerCandidate, opponent: &PlayerCandidate) -> Color {
    if opponent.games_as_white > arriving.games_as_white {
        Color::White
    } else if opponent.games_as_black > arriving.games_as_black {
        Color::Black
    } else {
        Color::White
    }
}
