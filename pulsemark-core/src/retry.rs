//! Bounded retry of a random draw until it satisfies a constraint.

use tracing::warn;

/// Outcome of a budgeted search.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    /// A draw satisfied the constraint.
    Accepted { value: T, attempts: usize },
    /// The budget ran out; `best` is the highest-quality draw seen.
    Exhausted { best: T, attempts: usize },
}

impl<T> Attempt<T> {
    pub fn attempts(&self) -> usize {
        match self {
            Attempt::Accepted { attempts, .. } | Attempt::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Attempt::Exhausted { .. })
    }

    pub fn into_inner(self) -> T {
        match self {
            Attempt::Accepted { value, .. } => value,
            Attempt::Exhausted { best, .. } => best,
        }
    }
}

/// Retry budget: at most `max_attempts` draws (at least one is always made).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_attempts: usize,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self { max_attempts: 500 }
    }
}

impl RetryBudget {
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    /// Draw until `accept` passes or the budget runs out.
    ///
    /// `quality` ranks rejected draws; on exhaustion the best-ranked one is
    /// returned (earliest wins ties).
    pub fn run<T, Q: PartialOrd>(
        &self,
        mut draw: impl FnMut() -> T,
        mut accept: impl FnMut(&T) -> bool,
        mut quality: impl FnMut(&T) -> Q,
    ) -> Attempt<T> {
        let max_attempts = self.max_attempts.max(1);

        let first = draw();
        if accept(&first) {
            return Attempt::Accepted {
                value: first,
                attempts: 1,
            };
        }
        let mut best_quality = quality(&first);
        let mut best = first;

        for attempt in 2..=max_attempts {
            let candidate = draw();
            if accept(&candidate) {
                return Attempt::Accepted {
                    value: candidate,
                    attempts: attempt,
                };
            }
            let q = quality(&candidate);
            if q > best_quality {
                best_quality = q;
                best = candidate;
            }
        }

        warn!(max_attempts, "retry budget exhausted, keeping best draw");
        Attempt::Exhausted {
            best,
            attempts: max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_first_passing_draw() {
        let mut n = 0;
        let outcome = RetryBudget::new(10).run(
            || {
                n += 1;
                n
            },
            |&v| v == 3,
            |&v| v,
        );
        assert_eq!(
            outcome,
            Attempt::Accepted {
                value: 3,
                attempts: 3
            }
        );
    }

    #[test]
    fn exhaustion_returns_best() {
        let values = [4, 9, 2, 9, 1];
        let mut i = 0;
        let outcome = RetryBudget::new(5).run(
            || {
                let v = values[i];
                i += 1;
                (v, i)
            },
            |_| false,
            |&(v, _)| v,
        );
        assert!(outcome.is_exhausted());
        assert_eq!(outcome.attempts(), 5);
        // First of the tied maxima
        assert_eq!(outcome.into_inner(), (9, 2));
    }

    #[test]
    fn zero_budget_still_draws_once() {
        let mut calls = 0;
        let outcome = RetryBudget::new(0).run(
            || {
                calls += 1;
            },
            |_| false,
            |_| 0,
        );
        assert_eq!(calls, 1);
        assert_eq!(outcome.attempts(), 1);
    }
}
