//! Round catalog: the pool of questions matches draw from.
//!
//! Loaded once at startup from a JSON file, with a baked-in demo pool as the
//! fallback so the server always comes up playable.

use std::{collections::HashSet, fs, io::ErrorKind, path::Path};

use rand::{Rng, seq::SliceRandom};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::state::game::Round;

/// Problems detected while validating a catalog file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The file parsed but contains no rounds at all.
    #[error("catalog contains no rounds")]
    EmptyPool,
    /// A round has a blank media locator.
    #[error("round {0}: media url must not be empty")]
    EmptyMediaUrl(usize),
    /// A round offers fewer than two options.
    #[error("round {0}: at least two answer options are required")]
    TooFewOptions(usize),
    /// A round has a blank or repeated option.
    #[error("round {0}: options must be non-empty and unique")]
    BadOptions(usize),
    /// A round's correct answer is not among its options.
    #[error("round {0}: correct answer is not one of the options")]
    AnswerNotAnOption(usize),
}

/// Immutable pool of rounds shared by every match.
#[derive(Debug, Clone)]
pub struct Catalog {
    rounds: Vec<Round>,
}

impl Catalog {
    /// Load the catalog from disk, falling back to the built-in demo pool
    /// when the file is missing or invalid.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawCatalog>(&contents) {
                Ok(raw) => match Self::from_rounds(raw.rounds.into_iter().map(Into::into)) {
                    Ok(catalog) => {
                        info!(
                            path = %path.display(),
                            rounds = catalog.len(),
                            "loaded round catalog"
                        );
                        catalog
                    }
                    Err(err) => {
                        warn!(
                            path = %path.display(),
                            error = %err,
                            "invalid catalog; falling back to demo rounds"
                        );
                        Self::default()
                    }
                },
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse catalog; falling back to demo rounds"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "catalog file not found; using built-in demo rounds"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read catalog; falling back to demo rounds"
                );
                Self::default()
            }
        }
    }

    /// Validate and assemble a catalog from raw rounds.
    pub fn from_rounds(rounds: impl IntoIterator<Item = Round>) -> Result<Self, CatalogError> {
        let rounds: Vec<Round> = rounds.into_iter().collect();
        if rounds.is_empty() {
            return Err(CatalogError::EmptyPool);
        }

        for (index, round) in rounds.iter().enumerate() {
            if round.media_url.trim().is_empty() {
                return Err(CatalogError::EmptyMediaUrl(index));
            }
            if round.options.len() < 2 {
                return Err(CatalogError::TooFewOptions(index));
            }
            let mut seen = HashSet::new();
            for option in &round.options {
                if option.trim().is_empty() || !seen.insert(option.as_str()) {
                    return Err(CatalogError::BadOptions(index));
                }
            }
            if !round.options.contains(&round.answer) {
                return Err(CatalogError::AnswerNotAnOption(index));
            }
        }

        Ok(Self { rounds })
    }

    /// Number of rounds in the pool.
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Whether the pool is empty. Never true for a validated catalog.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Draw up to `count` rounds without replacement, in random order.
    ///
    /// A pool smaller than `count` yields the whole pool (a shorter match,
    /// not an error). Generic over the rng so tests can seed it.
    pub fn draw<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Round> {
        let mut indices: Vec<usize> = (0..self.rounds.len()).collect();
        indices.shuffle(rng);
        indices.truncate(count.min(self.rounds.len()));
        indices.into_iter().map(|i| self.rounds[i].clone()).collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            rounds: demo_rounds(),
        }
    }
}

/// JSON representation of the catalog file.
#[derive(Debug, Deserialize)]
struct RawCatalog {
    rounds: Vec<RawRound>,
}

/// JSON representation of a single round entry.
#[derive(Debug, Deserialize)]
struct RawRound {
    media_url: String,
    options: Vec<String>,
    answer: String,
}

impl From<RawRound> for Round {
    fn from(value: RawRound) -> Self {
        Self {
            media_url: value.media_url,
            options: value.options,
            answer: value.answer,
        }
    }
}

/// Built-in demo pool shipped with the binary.
fn demo_rounds() -> Vec<Round> {
    let entries: [(&str, [&str; 4], &str); 6] = [
        (
            "https://cdn.quiz-clash.dev/demo/clip-01.ogg",
            ["Seven Nation Army", "Black Dog", "Back in Black", "Kashmir"],
            "Seven Nation Army",
        ),
        (
            "https://cdn.quiz-clash.dev/demo/clip-02.ogg",
            ["Blue Monday", "Enjoy the Silence", "Just Can't Get Enough", "Fade to Grey"],
            "Blue Monday",
        ),
        (
            "https://cdn.quiz-clash.dev/demo/clip-03.ogg",
            ["Clair de Lune", "Gymnopédie No. 1", "Nocturne Op. 9 No. 2", "Arabesque No. 1"],
            "Gymnopédie No. 1",
        ),
        (
            "https://cdn.quiz-clash.dev/demo/clip-04.ogg",
            ["Superstition", "Sir Duke", "Isn't She Lovely", "Master Blaster"],
            "Superstition",
        ),
        (
            "https://cdn.quiz-clash.dev/demo/clip-05.ogg",
            ["Take Five", "So What", "Blue in Green", "My Favorite Things"],
            "Take Five",
        ),
        (
            "https://cdn.quiz-clash.dev/demo/clip-06.ogg",
            ["One More Time", "Around the World", "Da Funk", "Harder Better Faster Stronger"],
            "Around the World",
        ),
    ];

    entries
        .into_iter()
        .map(|(media_url, options, answer)| Round {
            media_url: media_url.to_string(),
            options: options.into_iter().map(str::to_string).collect(),
            answer: answer.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn round(n: usize) -> Round {
        Round {
            media_url: format!("https://cdn.test/clip-{n}.ogg"),
            options: vec![format!("title-{n}"), "decoy".into()],
            answer: format!("title-{n}"),
        }
    }

    #[test]
    fn demo_pool_passes_its_own_validation() {
        assert!(Catalog::from_rounds(demo_rounds()).is_ok());
    }

    #[test]
    fn rejects_an_empty_pool() {
        let err = Catalog::from_rounds(Vec::new()).unwrap_err();
        assert_eq!(err, CatalogError::EmptyPool);
    }

    #[test]
    fn rejects_an_answer_that_is_no_option() {
        let mut bad = round(0);
        bad.answer = "something else".into();
        let err = Catalog::from_rounds([bad]).unwrap_err();
        assert_eq!(err, CatalogError::AnswerNotAnOption(0));
    }

    #[test]
    fn rejects_duplicate_options() {
        let mut bad = round(0);
        bad.options = vec!["same".into(), "same".into()];
        bad.answer = "same".into();
        let err = Catalog::from_rounds([bad]).unwrap_err();
        assert_eq!(err, CatalogError::BadOptions(0));
    }

    #[test]
    fn draw_never_repeats_a_round() {
        let catalog = Catalog::from_rounds((0..10).map(round)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let drawn = catalog.draw(5, &mut rng);
        assert_eq!(drawn.len(), 5);
        let urls: HashSet<_> = drawn.iter().map(|r| r.media_url.as_str()).collect();
        assert_eq!(urls.len(), 5);
    }

    #[test]
    fn short_pool_yields_a_shorter_match() {
        let catalog = Catalog::from_rounds((0..3).map(round)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(catalog.draw(5, &mut rng).len(), 3);
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let catalog = Catalog::from_rounds((0..8).map(round)).unwrap();
        let first = catalog.draw(4, &mut StdRng::seed_from_u64(42));
        let second = catalog.draw(4, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }
}
