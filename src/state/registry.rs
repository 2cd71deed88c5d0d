//! Match registry: matchmaking queue, match table, player index, and
//! retention.
//!
//! Shared mutable structures and their locking granularity (one global lock
//! for the pairing step, one mutex per match) live here; everything else in
//! the crate goes through the operations on [`MatchRegistry`].

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use dashmap::DashMap;
use indexmap::IndexSet;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    catalog::Catalog,
    state::game::{GameResult, MatchPhase, MatchState},
};

/// A registered match behind its per-match lock.
pub type MatchHandle = Arc<Mutex<MatchState>>;

/// Errors raised while constructing a match.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CreateMatchError {
    /// One of the players already maps to a non-finished match.
    #[error("player `{0}` is already in an active match")]
    AlreadyMatched(String),
    /// Both identifiers name the same player.
    #[error("cannot pair a player with themselves")]
    SelfMatch,
}

/// Result of an enqueue call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Two waiters were available; a match was created.
    Paired(Uuid),
    /// The player is now (still) waiting for an opponent.
    Waiting,
    /// Rejected without any state change: the player is in an active match.
    AlreadyMatched,
}

/// Read-only monitoring snapshot of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Matches currently in the `Playing` phase.
    pub active_matches: usize,
    /// Players waiting to be paired.
    pub waiting_players: usize,
    /// Tracked matches in any phase.
    pub total_matches: usize,
}

/// What happened when a player forfeited an active match.
#[derive(Debug, Clone)]
pub struct ForfeitOutcome {
    /// The match that was force-finished.
    pub match_id: Uuid,
    /// The player left behind, to be notified by the transport.
    pub opponent: String,
    /// Result with the scores frozen at the moment of the forfeit.
    pub result: GameResult,
}

/// Process-wide index of matches and waiting players.
///
/// Constructed once at startup and torn down at shutdown. The waiting list
/// doubles as the global pairing lock: every operation that pairs players or
/// registers mappings holds it, so no player can be paired twice.
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
    players: DashMap<String, Uuid>,
    waiting: Mutex<IndexSet<String>>,
    catalog: Arc<Catalog>,
    rounds_per_match: usize,
    round_time_limit_secs: u32,
}

impl MatchRegistry {
    /// Build an empty registry drawing rounds from `catalog` with the given
    /// match policy values.
    pub fn new(catalog: Arc<Catalog>, rounds_per_match: usize, round_time_limit_secs: u32) -> Self {
        Self {
            matches: DashMap::new(),
            players: DashMap::new(),
            waiting: Mutex::new(IndexSet::new()),
            catalog,
            rounds_per_match,
            round_time_limit_secs,
        }
    }

    /// Add `player_id` to the waiting list and pair the two longest-waiting
    /// players if that makes two.
    ///
    /// Re-enqueueing a waiting player is idempotent (their spot is refreshed
    /// at the back, FIFO order of the others untouched); enqueueing a player
    /// with an active match is rejected without touching the list.
    pub fn enqueue(&self, player_id: &str) -> EnqueueOutcome {
        let mut waiting = self.waiting_list();

        if self.in_active_match(player_id) {
            debug!(player = %player_id, "enqueue rejected: already in an active match");
            return EnqueueOutcome::AlreadyMatched;
        }

        waiting.shift_remove(player_id);
        waiting.insert(player_id.to_string());
        debug!(player = %player_id, waiting = waiting.len(), "player queued");

        if waiting.len() < 2 {
            return EnqueueOutcome::Waiting;
        }

        // Strict FIFO: dequeue the two longest-waiting entries, which are
        // not necessarily the player who just enqueued.
        let (Some(first), Some(second)) = (
            waiting.shift_remove_index(0),
            waiting.shift_remove_index(0),
        ) else {
            return EnqueueOutcome::Waiting;
        };

        match self.register_match(&first, &second, self.rounds_per_match) {
            Ok(match_id) => EnqueueOutcome::Paired(match_id),
            Err(err) => {
                // Give both players their spots back rather than dropping them.
                warn!(error = %err, "pairing failed; returning players to the queue");
                waiting.shift_insert(0, second);
                waiting.shift_insert(0, first);
                EnqueueOutcome::Waiting
            }
        }
    }

    /// Construct and register a match for two distinct players.
    ///
    /// Draws `round_count` rounds without replacement from the catalog (the
    /// whole pool when it is smaller) and registers both player mappings.
    /// The queue normally guarantees the preconditions; they are re-validated
    /// here regardless.
    pub fn create_match(
        &self,
        player_a: &str,
        player_b: &str,
        round_count: usize,
    ) -> Result<Uuid, CreateMatchError> {
        let _pairing = self.waiting_list();
        self.register_match(player_a, player_b, round_count)
    }

    /// Pairing-lock-held body of [`MatchRegistry::create_match`].
    fn register_match(
        &self,
        player_a: &str,
        player_b: &str,
        round_count: usize,
    ) -> Result<Uuid, CreateMatchError> {
        if player_a == player_b {
            return Err(CreateMatchError::SelfMatch);
        }
        for player in [player_a, player_b] {
            if self.in_active_match(player) {
                return Err(CreateMatchError::AlreadyMatched(player.to_string()));
            }
        }

        let rounds = self.catalog.draw(round_count, &mut rand::rng());
        let m = MatchState::new(player_a, player_b, rounds, self.round_time_limit_secs);
        let match_id = m.id;
        info!(
            match_id = %match_id,
            player_a = %player_a,
            player_b = %player_b,
            rounds = m.round_count(),
            "match created"
        );

        self.matches.insert(match_id, Arc::new(Mutex::new(m)));
        self.players.insert(player_a.to_string(), match_id);
        self.players.insert(player_b.to_string(), match_id);
        Ok(match_id)
    }

    /// Run `f` against the match, serialized by the per-match lock.
    ///
    /// Returns `None` when the identifier is unknown. This is the only way
    /// the rest of the crate reaches match state.
    pub fn with_match<T>(&self, match_id: Uuid, f: impl FnOnce(&mut MatchState) -> T) -> Option<T> {
        let handle = self.matches.get(&match_id).map(|entry| entry.value().clone())?;
        let mut m = lock_match(&handle);
        Some(f(&mut m))
    }

    /// Identifier of the match `player_id` maps to, finished or not.
    pub fn player_match(&self, player_id: &str) -> Option<Uuid> {
        self.players.get(player_id).map(|entry| *entry.value())
    }

    /// Drop the player from the waiting list and force-finish their active
    /// match, if any.
    ///
    /// The forfeiting player's mapping is removed; the opponent's mapping
    /// intentionally keeps pointing at the finished match until the sweep,
    /// so a late lookup by the remaining player still resolves.
    pub fn forfeit(&self, player_id: &str) -> Option<ForfeitOutcome> {
        {
            let mut waiting = self.waiting_list();
            if waiting.shift_remove(player_id) {
                debug!(player = %player_id, "removed from the waiting list");
            }
        }

        let match_id = self.player_match(player_id)?;
        let handle = self.matches.get(&match_id).map(|entry| entry.value().clone())?;
        let (opponent, result) = {
            let mut m = lock_match(&handle);
            if m.phase == MatchPhase::Finished {
                return None;
            }
            m.forfeit(player_id);
            let opponent = m.opponent_of(player_id)?.to_string();
            (opponent, m.game_result()?)
        };

        self.players.remove(player_id);
        info!(match_id = %match_id, player = %player_id, "match forfeited");
        Some(ForfeitOutcome {
            match_id,
            opponent,
            result,
        })
    }

    /// Delete finished matches whose last round-start anchor is older than
    /// `retention_window`, along with both player mappings.
    ///
    /// Finished matches that never started a round have no anchor and are
    /// immediately eligible. Returns the number of matches removed.
    pub fn sweep(&self, retention_window: Duration, now_ms: u64) -> usize {
        let window_ms = retention_window.as_millis() as u64;
        let expired: Vec<(Uuid, String, String)> = self
            .matches
            .iter()
            .filter_map(|entry| {
                let m = lock_match(entry.value());
                let aged_out = m
                    .last_activity_at
                    .is_none_or(|at| now_ms.saturating_sub(at) > window_ms);
                (m.phase == MatchPhase::Finished && aged_out)
                    .then(|| (m.id, m.player_a.clone(), m.player_b.clone()))
            })
            .collect();

        let removed = expired.len();
        for (match_id, player_a, player_b) in expired {
            self.matches.remove(&match_id);
            // A player may already map to a newer match; only clear mappings
            // that still point at the swept one.
            self.players
                .remove_if(&player_a, |_, mapped| *mapped == match_id);
            self.players
                .remove_if(&player_b, |_, mapped| *mapped == match_id);
        }

        if removed > 0 {
            info!(removed, "swept finished matches");
        }
        removed
    }

    /// Read-only snapshot for the monitoring surface.
    pub fn stats(&self) -> RegistryStats {
        let active_matches = self
            .matches
            .iter()
            .filter(|entry| lock_match(entry.value()).phase == MatchPhase::Playing)
            .count();
        RegistryStats {
            active_matches,
            waiting_players: self.waiting_list().len(),
            total_matches: self.matches.len(),
        }
    }

    /// Whether the player maps to a match that is not finished yet.
    fn in_active_match(&self, player_id: &str) -> bool {
        let Some(match_id) = self.player_match(player_id) else {
            return false;
        };
        let Some(handle) = self.matches.get(&match_id).map(|entry| entry.value().clone()) else {
            return false;
        };
        lock_match(&handle).phase != MatchPhase::Finished
    }

    fn waiting_list(&self) -> MutexGuard<'_, IndexSet<String>> {
        self.waiting.lock().expect("waiting list mutex poisoned")
    }
}

fn lock_match(handle: &MatchHandle) -> MutexGuard<'_, MatchState> {
    handle.lock().expect("match mutex poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::{EndReason, Round};

    const T0: u64 = 1_700_000_000_000;
    const HOUR: Duration = Duration::from_secs(3_600);

    fn catalog() -> Arc<Catalog> {
        let rounds = (0..6).map(|i| Round {
            media_url: format!("https://cdn.test/clip-{i}.ogg"),
            options: vec![format!("title-{i}"), "decoy".into()],
            answer: format!("title-{i}"),
        });
        Arc::new(Catalog::from_rounds(rounds).unwrap())
    }

    fn registry() -> MatchRegistry {
        MatchRegistry::new(catalog(), 5, 15)
    }

    fn paired(registry: &MatchRegistry, a: &str, b: &str) -> Uuid {
        assert_eq!(registry.enqueue(a), EnqueueOutcome::Waiting);
        match registry.enqueue(b) {
            EnqueueOutcome::Paired(id) => id,
            other => panic!("expected a pairing, got {other:?}"),
        }
    }

    #[test]
    fn second_enqueue_pairs_and_third_waits() {
        let registry = registry();
        let match_id = paired(&registry, "alice", "bob");

        assert_eq!(registry.player_match("alice"), Some(match_id));
        assert_eq!(registry.player_match("bob"), Some(match_id));
        registry
            .with_match(match_id, |m| {
                assert_ne!(m.player_a, m.player_b);
                assert_eq!(m.round_count(), 5);
            })
            .unwrap();

        assert_eq!(registry.enqueue("carol"), EnqueueOutcome::Waiting);
        assert_eq!(registry.stats().waiting_players, 1);
    }

    #[test]
    fn re_enqueue_while_waiting_is_idempotent() {
        let registry = registry();
        assert_eq!(registry.enqueue("alice"), EnqueueOutcome::Waiting);
        assert_eq!(registry.enqueue("alice"), EnqueueOutcome::Waiting);
        assert_eq!(registry.stats().waiting_players, 1);

        // The refreshed entry still pairs normally.
        assert!(matches!(
            registry.enqueue("bob"),
            EnqueueOutcome::Paired(_)
        ));
    }

    #[test]
    fn enqueue_is_rejected_while_in_an_active_match() {
        let registry = registry();
        paired(&registry, "alice", "bob");

        assert_eq!(registry.enqueue("alice"), EnqueueOutcome::AlreadyMatched);
        assert_eq!(registry.stats().waiting_players, 0);
    }

    #[test]
    fn create_match_validates_its_preconditions() {
        let registry = registry();
        assert_eq!(
            registry.create_match("alice", "alice", 5),
            Err(CreateMatchError::SelfMatch)
        );

        paired(&registry, "alice", "bob");
        assert_eq!(
            registry.create_match("alice", "carol", 5),
            Err(CreateMatchError::AlreadyMatched("alice".into()))
        );
    }

    #[test]
    fn short_catalog_yields_a_shorter_match() {
        let registry = MatchRegistry::new(catalog(), 50, 15);
        let match_id = paired(&registry, "alice", "bob");
        let count = registry.with_match(match_id, |m| m.round_count()).unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn forfeit_of_a_waiting_player_just_dequeues() {
        let registry = registry();
        assert_eq!(registry.enqueue("alice"), EnqueueOutcome::Waiting);
        assert!(registry.forfeit("alice").is_none());
        assert_eq!(registry.stats().waiting_players, 0);

        // Alice is gone, so Bob has no one to pair with.
        assert_eq!(registry.enqueue("bob"), EnqueueOutcome::Waiting);
    }

    #[test]
    fn forfeit_freezes_the_match_and_keeps_the_opponent_mapping() {
        let registry = registry();
        let match_id = paired(&registry, "alice", "bob");
        registry
            .with_match(match_id, |m| m.start_next_round(T0).unwrap())
            .unwrap();

        let outcome = registry.forfeit("alice").expect("active match forfeited");
        assert_eq!(outcome.match_id, match_id);
        assert_eq!(outcome.opponent, "bob");
        assert_eq!(outcome.result.reason, EndReason::Forfeit { by: "alice".into() });

        // Bob's late lookup still resolves; Alice's mapping is gone.
        assert_eq!(registry.player_match("bob"), Some(match_id));
        assert_eq!(registry.player_match("alice"), None);
        let result = registry.with_match(match_id, |m| m.game_result()).unwrap();
        assert!(result.is_some());

        // A second forfeit against the finished match is a no-op.
        assert!(registry.forfeit("bob").is_none());

        // Both players are free to queue again.
        assert_eq!(registry.enqueue("alice"), EnqueueOutcome::Waiting);
        assert!(matches!(registry.enqueue("bob"), EnqueueOutcome::Paired(_)));
    }

    #[test]
    fn sweep_honors_the_retention_window() {
        let registry = registry();
        let match_id = paired(&registry, "alice", "bob");
        registry
            .with_match(match_id, |m| m.start_next_round(T0).unwrap())
            .unwrap();
        registry.forfeit("alice");

        // Right after finishing the match is retained.
        assert_eq!(registry.sweep(HOUR, T0 + 1_000), 0);
        assert_eq!(registry.player_match("bob"), Some(match_id));

        // An hour plus later it is purged together with the mappings.
        assert_eq!(registry.sweep(HOUR, T0 + HOUR.as_millis() as u64 + 1), 1);
        assert_eq!(registry.player_match("bob"), None);
        assert!(registry.with_match(match_id, |_| ()).is_none());
        assert_eq!(registry.stats().total_matches, 0);
    }

    #[test]
    fn sweep_takes_anchorless_finished_matches_immediately() {
        let registry = registry();
        paired(&registry, "alice", "bob");
        // Forfeit before any round started: no anchor was ever recorded.
        registry.forfeit("alice");
        assert_eq!(registry.sweep(HOUR, T0), 1);
    }

    #[test]
    fn sweep_leaves_unfinished_matches_alone() {
        let registry = registry();
        let match_id = paired(&registry, "alice", "bob");
        assert_eq!(registry.sweep(Duration::ZERO, T0), 0);
        registry
            .with_match(match_id, |m| m.start_next_round(T0).unwrap())
            .unwrap();
        assert_eq!(registry.sweep(Duration::ZERO, T0 + HOUR.as_millis() as u64), 0);
    }

    #[test]
    fn sweep_spares_a_remapped_player() {
        let registry = registry();
        let old_match = paired(&registry, "alice", "bob");
        registry
            .with_match(old_match, |m| m.start_next_round(T0).unwrap())
            .unwrap();
        registry.forfeit("alice");

        // Bob moves on to a fresh match before the old one is swept.
        let new_match = paired(&registry, "bob", "carol");
        assert_eq!(registry.sweep(HOUR, T0 + 2 * HOUR.as_millis() as u64), 1);
        assert_eq!(registry.player_match("bob"), Some(new_match));
    }

    #[test]
    fn stats_reflect_the_registry() {
        let registry = registry();
        let match_id = paired(&registry, "alice", "bob");
        assert_eq!(registry.enqueue("carol"), EnqueueOutcome::Waiting);

        let idle = registry.stats();
        assert_eq!(idle.active_matches, 0);
        assert_eq!(idle.waiting_players, 1);
        assert_eq!(idle.total_matches, 1);

        registry
            .with_match(match_id, |m| m.start_next_round(T0).unwrap())
            .unwrap();
        assert_eq!(registry.stats().active_matches, 1);
    }
}
