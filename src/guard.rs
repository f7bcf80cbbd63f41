use crate::history::{content_hash, History};
use crate::similarity::similarity;
use tracing::debug;

/// Default near-duplicate threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.80;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Unique,
    ExactMatch,
    NearDuplicate { score: f64 },
}

impl Verdict {
    pub fn is_duplicate(&self) -> bool {
        *self != Verdict::Unique
    }
}

/// Predicate deciding whether a candidate may join the history.
pub trait DuplicatePolicy: Send + Sync {
    fn check(&self, candidate: &str, history: &History) -> Verdict;
}

/// Exact-hash short circuit first, then a Jaccard scan against every record.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateGuard {
    threshold: f64,
}

impl DuplicateGuard {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for DuplicateGuard {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl DuplicatePolicy for DuplicateGuard {
    fn check(&self, candidate: &str, history: &History) -> Verdict {
        if history.contains_hash(&content_hash(candidate)) {
            return Verdict::ExactMatch;
        }

        for record in history.iter() {
            let score = similarity(candidate, &record.content);
            if score > self.threshold {
                debug!(
                    "Guard: candidate scores {:.2} against post from {}",
                    score, record.timestamp
                );
                return Verdict::NearDuplicate { score };
            }
        }

        Verdict::Unique
    }
}

pub fn is_duplicate(candidate: &str, history: &History, threshold: f64) -> bool {
    DuplicateGuard::new(threshold)
        .check(candidate, history)
        .is_duplicate()
}
