//! Score and leaderboard computation for answer reveals.
//!
//! Everything here is pure: callers pass player snapshots and timestamps, and apply the
//! resulting deltas themselves.

use crate::{
    dto::ws::{LeaderboardEntry, ScoreUpdate},
    state::{
        game::{Door, Millis},
        player::Player,
    },
};

/// Points awarded for any correct answer.
pub const BASE_SCORE: u32 = 100;
/// Largest speed bonus on top of [`BASE_SCORE`].
pub const SPEED_BONUS_MAX: u32 = 50;
/// Answers faster than this earn the full bonus.
pub const INSTANT_ANSWER_MS: Millis = 1000;

/// Score for a single answer.
///
/// Incorrect answers earn nothing. Correct answers earn [`BASE_SCORE`] plus a bonus that is
/// maximal up to [`INSTANT_ANSWER_MS`] and then decays linearly to zero at
/// `round_duration_ms`. An answer recorded before the round start counts as instant.
pub fn calculate_score(
    is_correct: bool,
    answered_at: Millis,
    round_started_at: Millis,
    round_duration_ms: Millis,
) -> u32 {
    if !is_correct {
        return 0;
    }

    let elapsed = answered_at.saturating_sub(round_started_at);
    BASE_SCORE + speed_bonus(elapsed, round_duration_ms)
}

fn speed_bonus(elapsed: Millis, round_duration_ms: Millis) -> u32 {
    if elapsed <= INSTANT_ANSWER_MS {
        return SPEED_BONUS_MAX;
    }
    if elapsed >= round_duration_ms {
        return 0;
    }

    // floor(max * (1 - elapsed / duration)) in integer arithmetic
    let remaining = round_duration_ms - elapsed;
    let bonus =
        u128::from(SPEED_BONUS_MAX) * u128::from(remaining) / u128::from(round_duration_ms);
    u32::try_from(bonus).unwrap_or(SPEED_BONUS_MAX)
}

/// Score changes for every player at the end of an answer window.
///
/// Correctness compares the player's recorded door selection with `correct_door`; a player
/// without an answer timestamp is timed at `now`.
pub fn generate_score_updates(
    players: &[Player],
    correct_door: Door,
    round_started_at: Millis,
    now: Millis,
    round_duration_ms: Millis,
) -> Vec<ScoreUpdate> {
    players
        .iter()
        .map(|player| {
            let is_correct = player.current_door == Some(correct_door);
            let answered_at = player.last_answer_at.unwrap_or(now);
            let score_gained =
                calculate_score(is_correct, answered_at, round_started_at, round_duration_ms);

            ScoreUpdate {
                player_id: player.id,
                username: player.username.clone(),
                score_gained,
                total_score: player.score.saturating_add(score_gained),
                is_correct,
            }
        })
        .collect()
}

/// Rank players by score, then correct answers, keeping input order for ties.
pub fn generate_leaderboard(players: &[Player]) -> Vec<LeaderboardEntry> {
    let mut ranked = players.iter().collect::<Vec<_>>();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.correct_answers.cmp(&a.correct_answers))
    });

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, player)| LeaderboardEntry {
            player_id: player.id,
            username: player.username.clone(),
            character: player.character.clone(),
            score: player.score,
            correct_answers: player.correct_answers,
            rank: index + 1,
        })
        .collect()
}

/// Top entry of a leaderboard.
pub fn winner(leaderboard: &[LeaderboardEntry]) -> Option<&LeaderboardEntry> {
    leaderboard.first()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::player::PlayerRegistry;

    const ROUND: Millis = 15_000;

    fn players(count: usize) -> (PlayerRegistry, Vec<Player>) {
        let registry = PlayerRegistry::new(&["Genie".to_string()]);
        let room = Uuid::new_v4();
        let players = (0..count)
            .map(|_| registry.create_player(Uuid::new_v4(), room))
            .collect();
        (registry, players)
    }

    #[test]
    fn speed_bonus_edges() {
        assert_eq!(calculate_score(true, 0, 0, ROUND), 150);
        assert_eq!(calculate_score(true, 1_000, 0, ROUND), 150);
        assert_eq!(calculate_score(true, ROUND, 0, ROUND), 100);
        assert_eq!(calculate_score(true, ROUND * 2, 0, ROUND), 100);
        assert_eq!(calculate_score(false, 0, 0, ROUND), 0);
    }

    #[test]
    fn bonus_decays_linearly_and_floors() {
        // 50 * (1 - 7500 / 15000) = 25
        assert_eq!(calculate_score(true, 7_500, 0, ROUND), 125);
        // 50 * (1 - 3000 / 15000) = 40
        assert_eq!(calculate_score(true, 10_000 + 3_000, 10_000, ROUND), 140);
        // 50 * (1 - 14999 / 15000) = 0.003 -> 0
        assert_eq!(calculate_score(true, 14_999, 0, ROUND), 100);
    }

    #[test]
    fn answer_before_round_start_counts_as_instant() {
        assert_eq!(calculate_score(true, 500, 2_000, ROUND), 150);
    }

    #[test]
    fn score_updates_follow_door_selection() {
        let (_, mut players) = players(3);
        players[0].current_door = Some(Door::B);
        players[0].last_answer_at = Some(500);
        players[0].score = 40;
        players[1].current_door = Some(Door::A);
        players[1].last_answer_at = Some(500);

        let updates = generate_score_updates(&players, Door::B, 0, 9_000, ROUND);

        assert_eq!(updates.len(), 3);
        assert!(updates[0].is_correct);
        assert_eq!(updates[0].score_gained, 150);
        assert_eq!(updates[0].total_score, 190);
        assert!(!updates[1].is_correct);
        assert_eq!(updates[1].score_gained, 0);
        assert!(!updates[2].is_correct);
        assert_eq!(updates[2].total_score, 0);
    }

    #[test]
    fn missing_answer_time_is_timed_at_now() {
        let (_, mut players) = players(1);
        players[0].current_door = Some(Door::C);

        let updates = generate_score_updates(&players, Door::C, 0, 7_500, ROUND);
        assert_eq!(updates[0].score_gained, 125);
    }

    #[test]
    fn leaderboard_orders_by_score_then_correct_answers_then_input() {
        let (_, mut players) = players(4);
        players[0].score = 100;
        players[0].correct_answers = 1;
        players[1].score = 300;
        players[1].correct_answers = 2;
        players[2].score = 100;
        players[2].correct_answers = 1;
        players[3].score = 100;
        players[3].correct_answers = 2;

        let leaderboard = generate_leaderboard(&players);

        let order = leaderboard.iter().map(|e| e.player_id).collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![players[1].id, players[3].id, players[0].id, players[2].id]
        );
        assert_eq!(
            leaderboard.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(generate_leaderboard(&players), leaderboard);
    }

    #[test]
    fn winner_is_the_top_entry() {
        let (_, mut players) = players(3);
        players[2].score = 500;
        let leaderboard = generate_leaderboard(&players);

        assert_eq!(winner(&leaderboard).map(|e| e.player_id), Some(players[2].id));
        assert_eq!(leaderboard[0].rank, 1);
        assert!(winner(&[]).is_none());
    }
}
