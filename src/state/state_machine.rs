//! Per-match lifecycle operations: round progression, answer collection,
//! resolution, and forfeit.
//!
//! Every operation here is synchronous and never blocks; the registry
//! serializes calls per match, so these methods can assume exclusive access.

use thiserror::Error;

use crate::state::{
    game::{EndReason, GameResult, MatchOutcome, MatchPhase, MatchState, RoundResult, RoundStart},
    scoring,
};

/// Reserved identity used for synthetic timeout submissions.
///
/// Never matches a participant, so a submission under this name takes the
/// forced-resolution path without recording an answer or granting points.
pub const TIMEOUT_SUBMITTER: &str = "#timeout";

/// Answer string carried by synthetic timeout submissions. Unmatchable by
/// construction: catalog validation rejects empty options.
const TIMEOUT_ANSWER: &str = "";

/// Error returned when an operation cannot be applied in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: cannot {action} while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the match was in when the operation was attempted.
    pub from: MatchPhase,
    /// Human-readable name of the rejected operation.
    pub action: &'static str,
}

impl MatchState {
    /// Open the next round: `Waiting → Playing` on the first call, then one
    /// round forward per call once the previous round has resolved.
    ///
    /// The pending-answer map is cleared and the round-start anchor set to
    /// `now_ms`. Fails with [`InvalidTransition`] on a finished match or
    /// while a round is still in flight (anchor set).
    pub fn start_next_round(&mut self, now_ms: u64) -> Result<RoundStart, InvalidTransition> {
        match self.phase {
            MatchPhase::Waiting if !self.rounds.is_empty() => {
                self.phase = MatchPhase::Playing;
                self.current_round = 1;
            }
            MatchPhase::Playing if self.round_started_at.is_some() => {
                return Err(InvalidTransition {
                    from: self.phase,
                    action: "start a round before the current one resolved",
                });
            }
            MatchPhase::Playing if self.current_round < self.rounds.len() => {
                self.current_round += 1;
            }
            _ => {
                return Err(InvalidTransition {
                    from: self.phase,
                    action: "start a round",
                });
            }
        }

        self.pending_answers.clear();
        self.round_started_at = Some(now_ms);
        self.last_activity_at = Some(now_ms);

        let round = &self.rounds[self.current_round - 1];
        Ok(RoundStart {
            round_number: self.current_round,
            media_url: round.media_url.clone(),
            options: round.options.clone(),
            time_limit_secs: self.time_limit_secs,
        })
    }

    /// Record a player's answer for the current round, scoring it if correct,
    /// and resolve the round once both players have answered.
    ///
    /// Quietly returns `None` (no state change) unless the match is playing
    /// and `round_number` names the current round exactly; a delayed signal
    /// for an already-advanced round is thereby ignored. A repeated
    /// submission overwrites the recorded answer (last write wins) but a
    /// round is scored at most once per player.
    ///
    /// Submissions from identities that are neither participant nor the
    /// reserved [`TIMEOUT_SUBMITTER`] are ignored.
    pub fn submit_answer(
        &mut self,
        submitter: &str,
        round_number: usize,
        answer: &str,
        answered_at_ms: u64,
    ) -> Option<RoundResult> {
        if self.phase != MatchPhase::Playing || round_number != self.current_round {
            return None;
        }
        let anchor = self.round_started_at?;

        let participant = self.is_participant(submitter);
        if participant {
            let correct_answer = self.rounds[self.current_round - 1].answer.clone();
            let already_scored = self
                .pending_answers
                .get(submitter)
                .is_some_and(|prev| *prev == correct_answer);
            self.pending_answers
                .insert(submitter.to_string(), answer.to_string());
            if answer == correct_answer && !already_scored {
                let points = scoring::score(answered_at_ms, anchor, self.time_limit_secs);
                if let Some(total) = self.scores.get_mut(submitter) {
                    *total += points;
                }
            }
        } else if submitter != TIMEOUT_SUBMITTER {
            return None;
        }

        let both_answered = self.pending_answers.contains_key(&self.player_a)
            && self.pending_answers.contains_key(&self.player_b);
        if both_answered || !participant {
            Some(self.resolve_round())
        } else {
            None
        }
    }

    /// Resolve the current round without waiting for both answers, as a
    /// synthetic submission from [`TIMEOUT_SUBMITTER`].
    ///
    /// The caller schedules this no earlier than the round time limit; the
    /// round-number and phase guards of [`MatchState::submit_answer`] make a
    /// late or duplicate invocation a safe no-op, so timers never need to be
    /// cancelled when a round resolves early.
    pub fn force_timeout(&mut self, round_number: usize, now_ms: u64) -> Option<RoundResult> {
        self.submit_answer(TIMEOUT_SUBMITTER, round_number, TIMEOUT_ANSWER, now_ms)
    }

    /// Snapshot the round outcome and advance the lifecycle.
    ///
    /// Leaves `current_round` in place for the next `start_next_round` call,
    /// or freezes the match when the final round just resolved. The pending
    /// map is empty when this returns.
    fn resolve_round(&mut self) -> RoundResult {
        let correct_answer = self.rounds[self.current_round - 1].answer.clone();
        let answers = std::mem::take(&mut self.pending_answers);
        self.round_started_at = None;

        let last_round = self.current_round == self.rounds.len();
        if last_round {
            self.phase = MatchPhase::Finished;
            self.end_reason = Some(EndReason::Completed);
        }

        RoundResult {
            round_number: self.current_round,
            correct_answer,
            scores: self.scores.clone(),
            answers,
            match_finished: last_round,
        }
    }

    /// Freeze the match as finished because `player_id` left.
    ///
    /// Remaining rounds are skipped and scores stay as they were; the
    /// recorded end reason lets consumers tell a forfeit from a completed
    /// game. No-op on an already finished match.
    pub fn forfeit(&mut self, player_id: &str) {
        if self.phase == MatchPhase::Finished {
            return;
        }
        self.phase = MatchPhase::Finished;
        self.end_reason = Some(EndReason::Forfeit {
            by: player_id.to_string(),
        });
        self.pending_answers.clear();
        self.round_started_at = None;
    }

    /// Final result of a finished match; `None` while still in progress.
    ///
    /// The winner is the player with the strictly higher score; equal scores
    /// yield [`MatchOutcome::Tie`].
    pub fn game_result(&self) -> Option<GameResult> {
        if self.phase != MatchPhase::Finished {
            return None;
        }

        let score_a = self.scores.get(&self.player_a).copied().unwrap_or(0);
        let score_b = self.scores.get(&self.player_b).copied().unwrap_or(0);
        let outcome = match score_a.cmp(&score_b) {
            std::cmp::Ordering::Greater => MatchOutcome::Winner(self.player_a.clone()),
            std::cmp::Ordering::Less => MatchOutcome::Winner(self.player_b.clone()),
            std::cmp::Ordering::Equal => MatchOutcome::Tie,
        };

        Some(GameResult {
            match_id: self.id,
            scores: self.scores.clone(),
            outcome,
            reason: self.end_reason.clone().unwrap_or(EndReason::Completed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::Round;

    const LIMIT: u32 = 15;
    const T0: u64 = 1_700_000_000_000;

    fn rounds(count: usize) -> Vec<Round> {
        (0..count)
            .map(|i| Round {
                media_url: format!("https://cdn.test/clip-{i}.ogg"),
                options: vec![
                    format!("title-{i}"),
                    "decoy one".into(),
                    "decoy two".into(),
                ],
                answer: format!("title-{i}"),
            })
            .collect()
    }

    fn duel(round_count: usize) -> MatchState {
        MatchState::new("alice", "bob", rounds(round_count), LIMIT)
    }

    /// Start the next round, panicking on an invalid transition.
    fn start(m: &mut MatchState, now: u64) -> RoundStart {
        m.start_next_round(now).unwrap()
    }

    #[test]
    fn fresh_match_is_waiting_at_round_zero() {
        let m = duel(3);
        assert_eq!(m.phase, MatchPhase::Waiting);
        assert_eq!(m.current_round, 0);
        assert!(m.round_started_at.is_none());
        assert_eq!(m.scores()["alice"], 0);
        assert_eq!(m.scores()["bob"], 0);
    }

    #[test]
    fn first_start_moves_to_playing_round_one() {
        let mut m = duel(3);
        let opened = start(&mut m, T0);
        assert_eq!(m.phase, MatchPhase::Playing);
        assert_eq!(m.current_round, 1);
        assert_eq!(m.round_started_at, Some(T0));
        assert_eq!(opened.round_number, 1);
        assert_eq!(opened.media_url, "https://cdn.test/clip-0.ogg");
        assert_eq!(opened.time_limit_secs, LIMIT);
    }

    #[test]
    fn starting_while_a_round_is_open_is_rejected() {
        let mut m = duel(3);
        start(&mut m, T0);
        let err = m.start_next_round(T0 + 1_000).unwrap_err();
        assert_eq!(err.from, MatchPhase::Playing);
    }

    #[test]
    fn both_answers_resolve_the_round_with_speed_scores() {
        let mut m = duel(3);
        start(&mut m, T0);

        // Alice nails it instantly, Bob takes ten seconds.
        assert!(m.submit_answer("alice", 1, "title-0", T0).is_none());
        let result = m
            .submit_answer("bob", 1, "title-0", T0 + 10_000)
            .expect("second answer resolves the round");

        assert_eq!(result.round_number, 1);
        assert_eq!(result.correct_answer, "title-0");
        assert_eq!(result.scores["alice"], 250);
        assert_eq!(result.scores["bob"], 150);
        assert_eq!(result.answers.len(), 2);
        assert!(!result.match_finished);

        // Round transition leaves the scratch space empty and the clock unset.
        assert!(m.pending_answers.is_empty());
        assert!(m.round_started_at.is_none());
        assert_eq!(m.current_round, 1);

        // The next start call is what advances the index.
        start(&mut m, T0 + 20_000);
        assert_eq!(m.current_round, 2);
    }

    #[test]
    fn wrong_answers_score_nothing() {
        let mut m = duel(1);
        start(&mut m, T0);
        m.submit_answer("alice", 1, "decoy one", T0 + 1_000);
        let result = m.submit_answer("bob", 1, "decoy two", T0 + 2_000).unwrap();
        assert_eq!(result.scores["alice"], 0);
        assert_eq!(result.scores["bob"], 0);
        assert!(result.match_finished);
    }

    #[test]
    fn stale_and_future_round_numbers_are_ignored() {
        let mut m = duel(3);
        start(&mut m, T0);
        m.submit_answer("alice", 1, "title-0", T0);
        m.submit_answer("bob", 1, "title-0", T0);
        start(&mut m, T0 + 20_000);

        // A delayed signal for round 1 must not disturb round 2.
        assert!(m.submit_answer("alice", 1, "title-0", T0 + 21_000).is_none());
        assert!(m.submit_answer("alice", 9, "title-1", T0 + 21_000).is_none());
        assert_eq!(m.current_round, 2);
        assert!(m.pending_answers.is_empty());
    }

    #[test]
    fn answer_overwrite_is_last_write_wins_but_scores_once() {
        let mut m = duel(1);
        start(&mut m, T0);

        m.submit_answer("alice", 1, "decoy one", T0 + 1_000);
        m.submit_answer("alice", 1, "title-0", T0 + 2_000);
        // A repeated correct submission must not double the award.
        m.submit_answer("alice", 1, "title-0", T0 + 3_000);

        let result = m.submit_answer("bob", 1, "decoy two", T0 + 4_000).unwrap();
        assert_eq!(result.answers["alice"], "title-0");
        assert_eq!(result.scores["alice"], 230);
    }

    #[test]
    fn unknown_submitters_are_ignored() {
        let mut m = duel(1);
        start(&mut m, T0);
        assert!(m.submit_answer("mallory", 1, "title-0", T0).is_none());
        assert!(m.pending_answers.is_empty());
        assert_eq!(m.phase, MatchPhase::Playing);
    }

    #[test]
    fn forced_timeout_resolves_an_unanswered_round() {
        let mut m = duel(2);
        start(&mut m, T0);

        let result = m
            .force_timeout(1, T0 + u64::from(LIMIT) * 1_000)
            .expect("timeout resolves the round");
        assert!(result.answers.is_empty());
        assert_eq!(result.scores["alice"], 0);
        assert_eq!(result.scores["bob"], 0);
        assert!(!result.match_finished);

        // The stale timer firing again is a harmless no-op.
        assert!(m.force_timeout(1, T0 + 60_000).is_none());
        assert_eq!(m.phase, MatchPhase::Playing);
    }

    #[test]
    fn forced_timeout_on_the_final_round_finishes_the_match() {
        let mut m = duel(1);
        start(&mut m, T0);
        m.submit_answer("alice", 1, "title-0", T0);
        let result = m.force_timeout(1, T0 + 16_000).unwrap();
        assert!(result.match_finished);
        assert_eq!(result.scores["alice"], 250);
        assert_eq!(m.phase, MatchPhase::Finished);
        assert!(m.start_next_round(T0 + 17_000).is_err());
    }

    #[test]
    fn five_round_match_reports_the_higher_score_as_winner() {
        let mut m = duel(5);
        let second = |secs: u64| T0 + secs * 1_000;

        // Alice: 250 + 150 + 130 = 530. Bob: 250 + 230 = 480.
        let plays: [(&str, u64, &str, u64); 5] = [
            ("title-0", 0, "title-0", 0),
            ("title-1", 10, "decoy one", 5),
            ("title-2", 12, "decoy two", 3),
            ("decoy one", 2, "decoy two", 2),
            ("decoy two", 1, "title-4", 2),
        ];

        let mut final_result = None;
        for (round, (alice, at_a, bob, at_b)) in plays.iter().enumerate() {
            let number = round + 1;
            start(&mut m, T0);
            m.submit_answer("alice", number, alice, second(*at_a));
            final_result = m.submit_answer("bob", number, bob, second(*at_b));
            assert!(m.pending_answers.is_empty());
        }

        assert!(final_result.expect("final round resolves").match_finished);
        let result = m.game_result().expect("finished match has a result");
        assert_eq!(result.scores["alice"], 530);
        assert_eq!(result.scores["bob"], 480);
        assert_eq!(result.outcome, MatchOutcome::Winner("alice".into()));
        assert_eq!(result.reason, EndReason::Completed);
    }

    #[test]
    fn equal_scores_report_a_tie() {
        let mut m = duel(1);
        start(&mut m, T0);
        m.submit_answer("alice", 1, "title-0", T0 + 5_000);
        m.submit_answer("bob", 1, "title-0", T0 + 5_000);
        let result = m.game_result().unwrap();
        assert_eq!(result.outcome, MatchOutcome::Tie);
    }

    #[test]
    fn game_result_is_absent_until_finished() {
        let mut m = duel(2);
        assert!(m.game_result().is_none());
        start(&mut m, T0);
        assert!(m.game_result().is_none());
    }

    #[test]
    fn forfeit_freezes_scores_and_records_the_leaver() {
        let mut m = duel(5);
        start(&mut m, T0);
        m.submit_answer("alice", 1, "title-0", T0);
        m.submit_answer("bob", 1, "decoy one", T0);
        start(&mut m, T0 + 20_000);

        m.forfeit("bob");
        assert_eq!(m.phase, MatchPhase::Finished);
        assert!(m.pending_answers.is_empty());

        let result = m.game_result().expect("forfeited match still resolves");
        assert_eq!(result.scores["alice"], 250);
        assert_eq!(result.outcome, MatchOutcome::Winner("alice".into()));
        assert_eq!(result.reason, EndReason::Forfeit { by: "bob".into() });

        // Terminal: nothing moves a finished match.
        assert!(m.start_next_round(T0 + 30_000).is_err());
        assert!(m.submit_answer("alice", 2, "title-1", T0 + 30_000).is_none());
        m.forfeit("alice");
        assert_eq!(result.reason, EndReason::Forfeit { by: "bob".into() });
    }
}
